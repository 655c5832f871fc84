//! Marker-delimited framing
//!
//! A frame is every byte from a JPEG SOI marker (`FF D8`) through the next
//! EOI marker (`FF D9`), inclusive. Bytes before the SOI are discarded along
//! with the frame.
//!
//! When no SOI is buffered and the buffer passes the high-water mark, only
//! the last `trim_tail_bytes` are kept; anything older is lost. A pending
//! SOI without a matching EOI is never trimmed.

use bytes::{Buf, Bytes, BytesMut};

use super::{ExtractorLimits, JPEG_EOI, JPEG_SOI};
use crate::error::ExtractError;

/// Marker-delimited extraction state (stateless beyond the buffer)
#[derive(Debug, Clone, Default)]
pub struct MarkerDelimited;

impl MarkerDelimited {
    pub fn new() -> Self {
        Self
    }

    /// Remove the next marker-delimited frame from `buf`
    pub fn next_frame(
        &mut self,
        buf: &mut BytesMut,
        limits: &ExtractorLimits,
    ) -> Result<Option<Bytes>, ExtractError> {
        let Some(start) = find_marker(buf, &JPEG_SOI, 0) else {
            if buf.len() > limits.max_buffer_bytes {
                let discard = buf.len().saturating_sub(limits.trim_tail_bytes);
                buf.advance(discard);
                tracing::debug!(
                    discarded = discard,
                    kept = buf.len(),
                    "No start marker before high-water mark, trimmed buffer"
                );
            }
            return Ok(None);
        };

        let Some(end) = find_marker(buf, &JPEG_EOI, start + 2) else {
            if let Some(max) = limits.max_pending_bytes {
                let buffered = buf.len() - start;
                if buffered > max {
                    return Err(ExtractError::PendingTooLarge { buffered, max });
                }
            }
            return Ok(None);
        };

        buf.advance(start);
        let frame = buf.split_to(end + JPEG_EOI.len() - start).freeze();
        Ok(Some(frame))
    }
}

/// Position of the first `marker` at or after `from`
fn find_marker(buf: &[u8], marker: &[u8; 2], from: usize) -> Option<usize> {
    buf.get(from..)?
        .windows(marker.len())
        .position(|w| w == marker)
        .map(|pos| pos + from)
}

#[cfg(test)]
mod tests {
    use super::super::test_util::jpeg;
    use super::*;

    fn small_limits() -> ExtractorLimits {
        ExtractorLimits {
            min_frame_bytes: 0,
            max_buffer_bytes: 1000,
            trim_tail_bytes: 100,
            ..Default::default()
        }
    }

    #[test]
    fn test_extracts_single_frame() {
        let mut m = MarkerDelimited::new();
        let frame = jpeg(200, 0x01);
        let mut buf = BytesMut::from(&b"header"[..]);
        buf.extend_from_slice(&frame);
        buf.extend_from_slice(b"tail");

        let out = m
            .next_frame(&mut buf, &ExtractorLimits::default())
            .unwrap()
            .expect("frame should be found");
        assert_eq!(&out[..], &frame[..]);
        assert_eq!(&buf[..], b"tail");
    }

    #[test]
    fn test_waits_for_end_marker() {
        let mut m = MarkerDelimited::new();
        let frame = jpeg(200, 0x01);
        let mut buf = BytesMut::from(&frame[..150]);

        assert!(m
            .next_frame(&mut buf, &ExtractorLimits::default())
            .unwrap()
            .is_none());
        assert_eq!(buf.len(), 150);

        buf.extend_from_slice(&frame[150..]);
        let out = m
            .next_frame(&mut buf, &ExtractorLimits::default())
            .unwrap()
            .expect("frame should complete");
        assert_eq!(out.len(), frame.len());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_adjacent_markers_form_minimal_frame() {
        let mut m = MarkerDelimited::new();
        let mut buf = BytesMut::from(&[0xFF, 0xD8, 0xFF][..]);

        assert!(m.next_frame(&mut buf, &small_limits()).unwrap().is_none());

        buf.extend_from_slice(&[0xD9, 0x00]);
        let out = m.next_frame(&mut buf, &small_limits()).unwrap().unwrap();
        assert_eq!(&out[..], &[0xFF, 0xD8, 0xFF, 0xD9]);
        assert_eq!(&buf[..], &[0x00]);
    }

    #[test]
    fn test_garbage_trimmed_to_tail() {
        let mut m = MarkerDelimited::new();
        let mut buf = BytesMut::from(&vec![0x55u8; 1500][..]);

        assert!(m.next_frame(&mut buf, &small_limits()).unwrap().is_none());
        assert_eq!(buf.len(), 100);

        // A frame arriving after the trim is still extracted intact
        let frame = jpeg(100, 0x01);
        buf.extend_from_slice(&frame);
        let out = m.next_frame(&mut buf, &small_limits()).unwrap().unwrap();
        assert_eq!(&out[..], &frame[..]);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_trim_respects_default_sizes() {
        let mut m = MarkerDelimited::new();
        let limits = ExtractorLimits::default();
        let mut buf = BytesMut::from(&vec![0u8; limits.max_buffer_bytes + 1][..]);

        m.next_frame(&mut buf, &limits).unwrap();
        assert_eq!(buf.len(), limits.trim_tail_bytes);
    }

    #[test]
    fn test_no_trim_below_high_water_mark() {
        let mut m = MarkerDelimited::new();
        let mut buf = BytesMut::from(&vec![0x55u8; 1000][..]);

        assert!(m.next_frame(&mut buf, &small_limits()).unwrap().is_none());
        assert_eq!(buf.len(), 1000);
    }

    #[test]
    fn test_pending_start_not_trimmed() {
        let mut m = MarkerDelimited::new();
        let mut buf = BytesMut::from(&[0xFF, 0xD8][..]);
        buf.extend_from_slice(&vec![0x55u8; 5000]);

        assert!(m.next_frame(&mut buf, &small_limits()).unwrap().is_none());
        assert_eq!(buf.len(), 5002);
    }

    #[test]
    fn test_pending_cap_rejects() {
        let mut m = MarkerDelimited::new();
        let limits = ExtractorLimits {
            max_pending_bytes: Some(64),
            ..small_limits()
        };
        let mut buf = BytesMut::from(&[0xFF, 0xD8][..]);
        buf.extend_from_slice(&[0x55u8; 100]);

        let err = m.next_frame(&mut buf, &limits).unwrap_err();
        assert_eq!(
            err,
            ExtractError::PendingTooLarge {
                buffered: 102,
                max: 64
            }
        );
    }

    #[test]
    fn test_find_marker() {
        let data = [0x00, 0xFF, 0xD8, 0xFF, 0xD8];
        assert_eq!(find_marker(&data, &JPEG_SOI, 0), Some(1));
        assert_eq!(find_marker(&data, &JPEG_SOI, 2), Some(3));
        assert_eq!(find_marker(&data, &JPEG_SOI, 4), None);
        assert_eq!(find_marker(&data, &JPEG_SOI, 10), None);
    }
}
