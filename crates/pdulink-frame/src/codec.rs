use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Corruption, Result};

/// The reserved frame terminator.
pub const TERMINATOR: u8 = 0x00;

/// Default maximum stuffed body size: 1 KiB.
///
/// The largest report the PDU emits (eight rails, environment and a
/// diagnostic string) is well under this.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1024;

/// Longest run of non-zero bytes a single COBS block can carry.
const MAX_BLOCK_DATA: usize = 254;

/// Upper bound on the stuffed size of an `n` byte body (terminator excluded).
pub const fn max_encoded_len(n: usize) -> usize {
    n + n / MAX_BLOCK_DATA + 1
}

/// Stuff `body` into a fresh buffer and append the terminator.
pub fn encode(body: &[u8]) -> Bytes {
    let mut dst = BytesMut::with_capacity(max_encoded_len(body.len()) + 1);
    encode_frame(body, &mut dst);
    dst.freeze()
}

/// Encode a frame into the wire format, appending to `dst`.
///
/// Wire format:
/// ```text
/// ┌──────┬────────────┬──────┬────────────┬─────┬──────┐
/// │ code │ code-1 data│ code │ code-1 data│ ... │ 0x00 │
/// └──────┴────────────┴──────┴────────────┴─────┴──────┘
/// ```
/// Each code byte gives the distance to the next code byte; a block shorter
/// than 0xFF implies a zero byte in the original body at its end.
///
/// Returns the stuffed length, terminator excluded.
pub fn encode_frame(body: &[u8], dst: &mut BytesMut) -> usize {
    let start = dst.len();
    dst.resize(start + max_encoded_len(body.len()), 0);
    let stuffed = cobs::encode(body, &mut dst[start..]);
    dst.truncate(start + stuffed);
    dst.put_u8(TERMINATOR);
    stuffed
}

/// Un-stuff a body read off the wire (terminator already removed).
pub fn decode(stuffed: &[u8]) -> Result<Bytes> {
    check_blocks(stuffed)?;

    let mut out = BytesMut::zeroed(stuffed.len());
    let len = cobs::decode(stuffed, &mut out).map_err(|_| Corruption::Rejected {
        len: stuffed.len(),
    })?;
    out.truncate(len.frame_size());
    Ok(out.freeze())
}

/// Walk the code bytes so malformed bodies get a precise error and never
/// reach the decoder with a stray terminator.
fn check_blocks(stuffed: &[u8]) -> Result<()> {
    if stuffed.is_empty() {
        return Err(Corruption::Empty.into());
    }
    if let Some(offset) = stuffed.iter().position(|&b| b == TERMINATOR) {
        return Err(Corruption::UnexpectedTerminator { offset }.into());
    }

    let mut at = 0usize;
    while at < stuffed.len() {
        let code = stuffed[at];
        if at + code as usize > stuffed.len() {
            return Err(Corruption::Overrun {
                offset: at,
                code,
                len: stuffed.len(),
            }
            .into());
        }
        at += code as usize;
    }
    Ok(())
}

/// Configuration for frame readers and writers.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum stuffed body size in bytes. Default: 1 KiB.
    pub max_frame_size: usize,
    /// Read timeout applied to serial streams. `None` leaves the port as opened.
    pub read_timeout: Option<std::time::Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            read_timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::error::FrameError;

    fn stuffed_body(body: &[u8]) -> Vec<u8> {
        let wire = encode(body);
        assert_eq!(wire.last(), Some(&TERMINATOR));
        wire[..wire.len() - 1].to_vec()
    }

    #[test]
    fn test_known_vectors() {
        assert_eq!(encode(b"").as_ref(), &[0x01, 0x00]);
        assert_eq!(encode(&[0x00]).as_ref(), &[0x01, 0x01, 0x00]);
        assert_eq!(encode(&[0x00, 0x00]).as_ref(), &[0x01, 0x01, 0x01, 0x00]);
        assert_eq!(
            encode(&[0x11, 0x22, 0x00, 0x33]).as_ref(),
            &[0x03, 0x11, 0x22, 0x02, 0x33, 0x00]
        );
        assert_eq!(
            encode(&[0x11, 0x00, 0x00, 0x00]).as_ref(),
            &[0x02, 0x11, 0x01, 0x01, 0x01, 0x00]
        );
    }

    #[test]
    fn test_long_run_splits_blocks() {
        let body: Vec<u8> = (1..=254u8).collect();
        let stuffed = stuffed_body(&body);
        assert_eq!(stuffed[0], 0xFF);
        assert_eq!(&stuffed[1..255], body.as_slice());
        assert_eq!(decode(&stuffed).unwrap().as_ref(), body.as_slice());

        let mut with_zero = body.clone();
        with_zero.push(0);
        let stuffed = stuffed_body(&with_zero);
        assert_eq!(decode(&stuffed).unwrap().as_ref(), with_zero.as_slice());
    }

    #[test]
    fn test_stuffed_body_never_contains_terminator() {
        let body = [0x00, 0x01, 0x00, 0xFF, 0x00, 0x00];
        let stuffed = stuffed_body(&body);
        assert!(!stuffed.contains(&TERMINATOR));
    }

    #[test]
    fn test_encode_appends_to_existing_buffer() {
        let mut buf = BytesMut::new();
        assert_eq!(encode_frame(b"ab", &mut buf), 3);
        assert_eq!(encode_frame(b"", &mut buf), 1);
        assert_eq!(buf.as_ref(), &[0x03, b'a', b'b', 0x00, 0x01, 0x00]);
    }

    #[test]
    fn test_command_wire_vector() {
        // Command { powerRail: 3, enable: true }
        let body = [0x0a, 0x04, 0x08, 0x03, 0x10, 0x01];
        assert_eq!(
            encode(&body).as_ref(),
            &[0x07, 0x0a, 0x04, 0x08, 0x03, 0x10, 0x01, 0x00]
        );
    }

    #[test]
    fn test_encode_reports_actual_stuffed_length() {
        let mut body = vec![0x5A; 299];
        for i in (0..299).step_by(50) {
            body[i] = 0x00;
        }
        let mut buf = BytesMut::new();
        let stuffed = encode_frame(&body, &mut buf);
        assert_eq!(stuffed, 300);
        assert_eq!(buf.len(), 301);
        assert!(max_encoded_len(body.len()) > stuffed);
    }

    #[test]
    fn test_decode_empty_body_rejected() {
        let err = decode(&[]).unwrap_err();
        assert!(matches!(err, FrameError::Corrupt(Corruption::Empty)));
    }

    #[test]
    fn test_decode_terminator_inside_body() {
        let err = decode(&[0x03, 0x11, 0x00]).unwrap_err();
        assert!(matches!(
            err,
            FrameError::Corrupt(Corruption::UnexpectedTerminator { offset: 2 })
        ));

        let err = decode(&[0x00, 0x11]).unwrap_err();
        assert!(matches!(
            err,
            FrameError::Corrupt(Corruption::UnexpectedTerminator { offset: 0 })
        ));
    }

    #[test]
    fn test_decode_overrun() {
        let err = decode(&[0x05, 0x11, 0x22]).unwrap_err();
        assert!(matches!(
            err,
            FrameError::Corrupt(Corruption::Overrun {
                offset: 0,
                code: 0x05,
                len: 3
            })
        ));
    }

    #[test]
    fn test_max_encoded_len_bounds_output() {
        for n in [0usize, 1, 253, 254, 255, 508, 1000] {
            let body = vec![0xAA; n];
            assert!(stuffed_body(&body).len() <= max_encoded_len(n));
        }
    }

    proptest! {
        #[test]
        fn roundtrip_any_body(body in proptest::collection::vec(any::<u8>(), 0..2048)) {
            let stuffed = stuffed_body(&body);
            prop_assert!(!stuffed.contains(&TERMINATOR));
            let decoded = decode(&stuffed).unwrap();
            prop_assert_eq!(decoded.as_ref(), body.as_slice());
        }

        #[test]
        fn roundtrip_zero_heavy_body(body in proptest::collection::vec(prop_oneof![Just(0u8), any::<u8>()], 0..600)) {
            let stuffed = stuffed_body(&body);
            let decoded = decode(&stuffed).unwrap();
            prop_assert_eq!(decoded.as_ref(), body.as_slice());
        }
    }
}
