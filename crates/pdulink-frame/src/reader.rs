use std::io::{ErrorKind, Read};

use bytes::{Bytes, BytesMut};
use pdulink_transport::SerialStream;
use tracing::{trace, warn};

use crate::codec::{decode, FrameConfig, TERMINATOR};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 2 * 1024;
const READ_CHUNK_SIZE: usize = 512;

/// Reads terminator-delimited frames from any `Read` stream.
///
/// Handles partial reads internally; callers always get complete frames.
/// Bytes that arrive after a terminator stay buffered for the next call, and
/// a read that fails (including a timeout) never discards buffered bytes.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
    /// Prefix of `buf` already known to contain no terminator.
    scanned: usize,
    /// Set after an over-long frame; input is dropped until the next terminator.
    discarding: bool,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
            scanned: 0,
            discarding: false,
        }
    }

    /// Read the next complete frame (blocking) and return its stuffed body,
    /// terminator excluded.
    ///
    /// Zero-length frames (back-to-back terminators) are skipped.
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached.
    pub fn read_frame(&mut self) -> Result<Bytes> {
        loop {
            if let Some(frame) = self.take_buffered()? {
                return Ok(frame);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Read the next frame and un-stuff it.
    pub fn read_message(&mut self) -> Result<Bytes> {
        let stuffed = self.read_frame()?;
        decode(&stuffed)
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Number of bytes received but not yet returned as a frame.
    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    fn take_buffered(&mut self) -> Result<Option<Bytes>> {
        loop {
            let Some(rel) = self.buf[self.scanned..]
                .iter()
                .position(|&b| b == TERMINATOR)
            else {
                return self.hold_partial();
            };

            let end = self.scanned + rel;
            let mut frame = self.buf.split_to(end + 1);
            frame.truncate(end);
            self.scanned = 0;

            if self.discarding {
                self.discarding = false;
                trace!(dropped = frame.len(), "resynchronised after oversized frame");
                continue;
            }
            if frame.is_empty() {
                trace!("skipping empty frame");
                continue;
            }
            if frame.len() > self.config.max_frame_size {
                warn!(
                    size = frame.len(),
                    max = self.config.max_frame_size,
                    "dropping oversized frame"
                );
                return Err(FrameError::FrameTooLarge {
                    size: frame.len(),
                    max: self.config.max_frame_size,
                });
            }

            return Ok(Some(frame.freeze()));
        }
    }

    fn hold_partial(&mut self) -> Result<Option<Bytes>> {
        if self.discarding {
            self.buf.clear();
            self.scanned = 0;
            return Ok(None);
        }

        self.scanned = self.buf.len();
        if self.buf.len() > self.config.max_frame_size {
            let size = self.buf.len();
            self.buf.clear();
            self.scanned = 0;
            self.discarding = true;
            warn!(
                size,
                max = self.config.max_frame_size,
                "no terminator within frame limit; discarding until next terminator"
            );
            return Err(FrameError::FrameTooLarge {
                size,
                max: self.config.max_frame_size,
            });
        }
        Ok(None)
    }
}

impl FrameReader<SerialStream> {
    /// Create a frame reader for a serial port and apply read timeout from config.
    pub fn with_config_serial(mut inner: SerialStream, config: FrameConfig) -> Result<Self> {
        if let Some(timeout) = config.read_timeout {
            inner
                .set_read_timeout(timeout)
                .map_err(transport_to_frame_error)?;
        }
        Ok(Self::with_config(inner, config))
    }
}

pub(crate) fn transport_to_frame_error(err: pdulink_transport::TransportError) -> FrameError {
    match err {
        pdulink_transport::TransportError::Io(io) => FrameError::Io(io),
        other => FrameError::Io(std::io::Error::other(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::codec::{encode, encode_frame};
    use crate::error::Corruption;

    fn wire(bodies: &[&[u8]]) -> Vec<u8> {
        let mut out = BytesMut::new();
        for body in bodies {
            encode_frame(body, &mut out);
        }
        out.to_vec()
    }

    #[test]
    fn read_single_frame() {
        let mut reader = FrameReader::new(Cursor::new(wire(&[b"hello"])));
        let frame = reader.read_frame().unwrap();

        assert_eq!(frame.as_ref(), &[0x06, b'h', b'e', b'l', b'l', b'o']);
        assert_eq!(decode(&frame).unwrap().as_ref(), b"hello");
    }

    #[test]
    fn read_multiple_frames() {
        let mut reader = FrameReader::new(Cursor::new(wire(&[b"one", b"\x00two", b"three\x00"])));

        assert_eq!(reader.read_message().unwrap().as_ref(), b"one");
        assert_eq!(reader.read_message().unwrap().as_ref(), b"\x00two");
        assert_eq!(reader.read_message().unwrap().as_ref(), b"three\x00");
    }

    #[test]
    fn empty_body_roundtrips_as_frame() {
        let mut reader = FrameReader::new(Cursor::new(wire(&[b""])));
        assert_eq!(reader.read_frame().unwrap().as_ref(), &[0x01]);
    }

    #[test]
    fn partial_read_handling() {
        let bytes = wire(&[b"slow", b"\x00\x01\x00"]);

        let mut whole = FrameReader::new(Cursor::new(bytes.clone()));
        let mut trickle = FrameReader::new(ByteByByteReader { bytes, pos: 0 });

        for _ in 0..2 {
            let a = whole.read_frame().unwrap();
            let b = trickle.read_frame().unwrap();
            assert_eq!(a, b);
        }
        assert!(matches!(
            trickle.read_frame().unwrap_err(),
            FrameError::ConnectionClosed
        ));
    }

    #[test]
    fn leading_and_repeated_terminators_are_skipped() {
        let mut bytes = vec![0x00, 0x00];
        bytes.extend(wire(&[b"a"]));
        bytes.extend([0x00, 0x00, 0x00]);
        bytes.extend(wire(&[b"b"]));

        let mut reader = FrameReader::new(Cursor::new(bytes));
        assert_eq!(reader.read_message().unwrap().as_ref(), b"a");
        assert_eq!(reader.read_message().unwrap().as_ref(), b"b");
    }

    #[test]
    fn connection_closed_cleanly() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn connection_closed_mid_frame() {
        let mut bytes = wire(&[b"only-part"]);
        bytes.pop();

        let mut reader = FrameReader::new(Cursor::new(bytes));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
        assert_eq!(reader.buffered_len(), 10);
    }

    #[test]
    fn corrupt_frame_does_not_disturb_neighbours() {
        let mut bytes = wire(&[b"first"]);
        bytes.extend([0x09, 0x41, 0x42, 0x00]);
        bytes.extend(wire(&[b"second"]));

        let mut reader = FrameReader::new(Cursor::new(bytes));
        assert_eq!(reader.read_message().unwrap().as_ref(), b"first");
        assert!(matches!(
            reader.read_message().unwrap_err(),
            FrameError::Corrupt(Corruption::Overrun { .. })
        ));
        assert_eq!(reader.read_message().unwrap().as_ref(), b"second");
    }

    #[test]
    fn oversized_frame_in_stream_resyncs() {
        let mut bytes = vec![0x42; 40];
        bytes.push(0x00);
        bytes.extend(wire(&[b"ok"]));

        let cfg = FrameConfig {
            max_frame_size: 16,
            ..FrameConfig::default()
        };
        let mut reader = FrameReader::with_config(Cursor::new(bytes), cfg);
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::FrameTooLarge { size: 40, max: 16 }));
        assert_eq!(reader.read_message().unwrap().as_ref(), b"ok");
    }

    #[test]
    fn oversized_trickle_discards_until_terminator() {
        let mut bytes = vec![0x42; 40];
        bytes.push(0x00);
        bytes.extend(wire(&[b"ok"]));

        let cfg = FrameConfig {
            max_frame_size: 16,
            ..FrameConfig::default()
        };
        let mut reader = FrameReader::with_config(ByteByByteReader { bytes, pos: 0 }, cfg);
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::FrameTooLarge { size: 17, max: 16 }));
        assert_eq!(reader.read_message().unwrap().as_ref(), b"ok");
    }

    #[derive(Debug)]
    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() {
                return Ok(0);
            }
            if buf.is_empty() {
                return Ok(0);
            }

            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    #[test]
    fn roundtrip_over_pipe() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = crate::writer::FrameWriter::new(left);
        let mut reader = FrameReader::new(right);

        writer.write_frame(b"ping").unwrap();
        assert_eq!(reader.read_message().unwrap().as_ref(), b"ping");
    }

    #[test]
    fn concurrent_reader_writer_threads() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = crate::writer::FrameWriter::new(left);
        let reader = Arc::new(Mutex::new(FrameReader::new(right)));

        let reader_thread = {
            let reader = Arc::clone(&reader);
            std::thread::spawn(move || {
                for expected in 0..64u32 {
                    let body = reader.lock().unwrap().read_message().unwrap();
                    let mut want = format!("msg-{expected}").into_bytes();
                    want.push(0);
                    assert_eq!(body.as_ref(), want.as_slice());
                }
            })
        };

        for i in 0..64u32 {
            let mut payload = format!("msg-{i}").into_bytes();
            payload.push(0);
            writer.write_frame(&payload).unwrap();
        }

        reader_thread.join().unwrap();
    }

    #[test]
    fn accessors_and_into_inner() {
        let cursor = Cursor::new(Vec::<u8>::new());
        let mut reader = FrameReader::new(cursor);

        let _ = reader.get_ref();
        let _ = reader.get_mut();
        assert_eq!(reader.config().max_frame_size, crate::DEFAULT_MAX_FRAME_SIZE);
        let _inner = reader.into_inner();
    }

    #[test]
    fn timeout_keeps_partial_frame() {
        let bytes = encode(b"split").to_vec();
        let (head, tail) = bytes.split_at(3);

        let reader = ScriptedReader {
            steps: vec![
                Step::Data(head.to_vec()),
                Step::Fail(ErrorKind::TimedOut),
                Step::Data(tail.to_vec()),
            ],
        };
        let mut framed = FrameReader::new(reader);

        let err = framed.read_frame().unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(framed.buffered_len(), 3);
        assert_eq!(framed.read_message().unwrap().as_ref(), b"split");
    }

    #[test]
    fn interrupted_read_retries() {
        let reader = ScriptedReader {
            steps: vec![
                Step::Fail(ErrorKind::Interrupted),
                Step::Data(encode(b"ok").to_vec()),
            ],
        };
        let mut framed = FrameReader::new(reader);
        assert_eq!(framed.read_message().unwrap().as_ref(), b"ok");
    }

    enum Step {
        Data(Vec<u8>),
        Fail(ErrorKind),
    }

    struct ScriptedReader {
        steps: Vec<Step>,
    }

    impl Read for ScriptedReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.steps.is_empty() {
                return Ok(0);
            }
            match self.steps.remove(0) {
                Step::Fail(kind) => Err(std::io::Error::from(kind)),
                Step::Data(data) => {
                    let n = data.len().min(buf.len());
                    buf[..n].copy_from_slice(&data[..n]);
                    if n < data.len() {
                        self.steps.insert(0, Step::Data(data[n..].to_vec()));
                    }
                    Ok(n)
                }
            }
        }
    }
}
