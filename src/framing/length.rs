//! Length-prefixed framing
//!
//! Each frame is preceded by an unsigned 32-bit big-endian byte count. The
//! header is consumed as soon as four bytes are available; the declared
//! length is then held until the whole body has been buffered.

use bytes::{Buf, Bytes, BytesMut};

use super::{ExtractorLimits, LENGTH_HEADER_SIZE};
use crate::error::ExtractError;

/// Length-prefixed extraction state
#[derive(Debug, Clone, Default)]
pub struct LengthPrefixed {
    /// Declared length of the frame being buffered, once its header is read
    pending_length: Option<u32>,
}

impl LengthPrefixed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declared length still waiting for its body
    pub fn pending_length(&self) -> Option<u32> {
        self.pending_length
    }

    /// Remove the next length-prefixed frame from `buf`
    pub fn next_frame(
        &mut self,
        buf: &mut BytesMut,
        limits: &ExtractorLimits,
    ) -> Result<Option<Bytes>, ExtractError> {
        let declared = match self.pending_length {
            Some(len) => len as usize,
            None => {
                if buf.len() < LENGTH_HEADER_SIZE {
                    return Ok(None);
                }

                let len = buf.get_u32();
                if let Some(max) = limits.max_frame_bytes {
                    if len as usize > max {
                        return Err(ExtractError::FrameTooLarge {
                            declared: len as usize,
                            max,
                        });
                    }
                }

                self.pending_length = Some(len);
                len as usize
            }
        };

        if buf.len() < declared {
            return Ok(None);
        }

        self.pending_length = None;
        Ok(Some(buf.split_to(declared).freeze()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> ExtractorLimits {
        ExtractorLimits {
            min_frame_bytes: 0,
            ..Default::default()
        }
    }

    #[test]
    fn test_single_frame() {
        let mut l = LengthPrefixed::new();
        let mut buf = BytesMut::from(&[0, 0, 0, 5, b'A', b'B', b'C', b'D', b'E'][..]);

        let frame = l.next_frame(&mut buf, &limits()).unwrap().unwrap();
        assert_eq!(&frame[..], b"ABCDE");
        assert!(buf.is_empty());
        assert!(l.next_frame(&mut buf, &limits()).unwrap().is_none());
    }

    #[test]
    fn test_partial_body_waits() {
        let mut l = LengthPrefixed::new();
        let mut buf = BytesMut::from(&[0, 0, 0, 5, b'A', b'B'][..]);

        assert!(l.next_frame(&mut buf, &limits()).unwrap().is_none());
        // Header is consumed immediately
        assert_eq!(l.pending_length(), Some(5));
        assert_eq!(&buf[..], b"AB");

        buf.extend_from_slice(b"CD");
        assert!(l.next_frame(&mut buf, &limits()).unwrap().is_none());

        buf.extend_from_slice(b"E");
        let frame = l.next_frame(&mut buf, &limits()).unwrap().unwrap();
        assert_eq!(&frame[..], b"ABCDE");
        assert_eq!(l.pending_length(), None);
    }

    #[test]
    fn test_partial_header_waits() {
        let mut l = LengthPrefixed::new();
        let mut buf = BytesMut::from(&[0, 0, 1][..]);

        assert!(l.next_frame(&mut buf, &limits()).unwrap().is_none());
        assert_eq!(buf.len(), 3);
        assert_eq!(l.pending_length(), None);
    }

    #[test]
    fn test_big_endian_length() {
        let mut l = LengthPrefixed::new();
        let mut buf = BytesMut::from(&[0x00, 0x00, 0x01, 0x02][..]);
        buf.extend_from_slice(&[7u8; 258]);

        let frame = l.next_frame(&mut buf, &limits()).unwrap().unwrap();
        assert_eq!(frame.len(), 258);
    }

    #[test]
    fn test_unbounded_by_default() {
        let mut l = LengthPrefixed::new();
        let mut buf = BytesMut::from(&u32::MAX.to_be_bytes()[..]);

        assert!(l.next_frame(&mut buf, &limits()).unwrap().is_none());
        assert_eq!(l.pending_length(), Some(u32::MAX));
    }

    #[test]
    fn test_cap_rejects_declared_length() {
        let mut l = LengthPrefixed::new();
        let capped = ExtractorLimits {
            max_frame_bytes: Some(1024),
            ..limits()
        };
        let mut buf = BytesMut::from(&2048u32.to_be_bytes()[..]);

        let err = l.next_frame(&mut buf, &capped).unwrap_err();
        assert_eq!(
            err,
            ExtractError::FrameTooLarge {
                declared: 2048,
                max: 1024
            }
        );
    }
}
