//! `tokio_util::codec` adapter for async serial stacks.

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

use crate::codec::{encode_frame, FrameConfig, TERMINATOR};
use crate::error::FrameError;

/// Splits a byte stream into stuffed frame bodies and stuffs outgoing bodies.
///
/// Yields the stuffed body, terminator excluded, just like
/// [`crate::FrameReader::read_frame`]; un-stuff with [`crate::decode`].
/// A decoder error ends a `FramedRead`, so over-long runs are logged and
/// dropped here instead of being returned as errors.
#[derive(Debug, Clone)]
pub struct CobsCodec {
    max_frame_size: usize,
    discarding: bool,
}

impl CobsCodec {
    pub fn new(config: &FrameConfig) -> Self {
        Self {
            max_frame_size: config.max_frame_size,
            discarding: false,
        }
    }
}

impl Default for CobsCodec {
    fn default() -> Self {
        Self::new(&FrameConfig::default())
    }
}

impl Decoder for CobsCodec {
    type Item = Bytes;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let Some(end) = src.iter().position(|&b| b == TERMINATOR) else {
                if self.discarding {
                    src.clear();
                } else if src.len() > self.max_frame_size {
                    warn!(size = src.len(), max = self.max_frame_size, "dropping oversized frame");
                    src.clear();
                    self.discarding = true;
                }
                return Ok(None);
            };

            let mut frame = src.split_to(end + 1);
            frame.truncate(end);

            if std::mem::take(&mut self.discarding) || frame.is_empty() {
                continue;
            }
            if frame.len() > self.max_frame_size {
                warn!(size = frame.len(), max = self.max_frame_size, "dropping oversized frame");
                continue;
            }
            return Ok(Some(frame.freeze()));
        }
    }
}

impl Encoder<&[u8]> for CobsCodec {
    type Error = FrameError;

    fn encode(&mut self, body: &[u8], dst: &mut BytesMut) -> Result<(), Self::Error> {
        let start = dst.len();
        let stuffed = encode_frame(body, dst);
        if stuffed > self.max_frame_size {
            dst.truncate(start);
            return Err(FrameError::FrameTooLarge {
                size: stuffed,
                max: self.max_frame_size,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use futures_util::{SinkExt, StreamExt};
    use tokio_util::codec::{FramedRead, FramedWrite};

    use super::*;
    use crate::codec::{decode, encode};

    #[tokio::test]
    async fn framed_read_yields_stuffed_bodies() {
        let mut wire = encode(b"alpha").to_vec();
        wire.extend([0x00, 0x00]);
        wire.extend(encode(b"\x00beta"));

        let mut frames = FramedRead::new(wire.as_slice(), CobsCodec::default());
        let first = frames.next().await.unwrap().unwrap();
        let second = frames.next().await.unwrap().unwrap();
        assert!(frames.next().await.is_none());

        assert_eq!(decode(&first).unwrap().as_ref(), b"alpha");
        assert_eq!(decode(&second).unwrap().as_ref(), b"\x00beta");
    }

    #[tokio::test]
    async fn framed_write_emits_terminated_frames() {
        let mut out = Vec::new();
        {
            let mut sink = FramedWrite::new(&mut out, CobsCodec::default());
            sink.send(&b"hi"[..]).await.unwrap();
            sink.send(&b""[..]).await.unwrap();
        }
        assert_eq!(out, vec![0x03, b'h', b'i', 0x00, 0x01, 0x00]);
    }

    #[test]
    fn encoder_limit_uses_stuffed_length() {
        let mut codec = CobsCodec::new(&FrameConfig {
            max_frame_size: 6,
            ..FrameConfig::default()
        });
        let mut dst = BytesMut::from(&b"prior"[..]);

        Encoder::<&[u8]>::encode(&mut codec, &b"\x00abcd"[..], &mut dst).unwrap();
        assert_eq!(&dst[5..], &[0x01, 0x05, b'a', b'b', b'c', b'd', 0x00]);

        let err = Encoder::<&[u8]>::encode(&mut codec, &b"abcdefg"[..], &mut dst).unwrap_err();
        assert!(matches!(err, FrameError::FrameTooLarge { size: 8, max: 6 }));
        assert_eq!(dst.len(), 12);
    }

    #[test]
    fn oversized_run_is_dropped_and_stream_resyncs() {
        let mut codec = CobsCodec::new(&FrameConfig {
            max_frame_size: 8,
            ..FrameConfig::default()
        });
        let mut src = BytesMut::from(&[0x55u8; 12][..]);
        assert!(codec.decode(&mut src).unwrap().is_none());
        assert!(src.is_empty());

        src.extend_from_slice(&[0x55, 0x55, 0x00]);
        src.extend_from_slice(&encode(b"ok"));
        let frame = codec.decode(&mut src).unwrap().unwrap();
        assert_eq!(decode(&frame).unwrap().as_ref(), b"ok");
    }

    #[test]
    fn partial_input_waits_for_terminator() {
        let mut codec = CobsCodec::default();
        let wire = encode(b"partial");
        let mut src = BytesMut::from(&wire[..4]);
        assert!(codec.decode(&mut src).unwrap().is_none());
        src.extend_from_slice(&wire[4..]);
        let frame = codec.decode(&mut src).unwrap().unwrap();
        assert_eq!(decode(&frame).unwrap().as_ref(), b"partial");
    }
}
