//! Frame extraction from producer byte streams
//!
//! Producers push an unstructured byte stream over TCP. Each connection owns
//! one [`FrameExtractor`] and one accumulation buffer; every time bytes
//! arrive they are appended to the buffer and [`FrameExtractor::frames`] is
//! drained until no complete frame remains.
//!
//! Two framing disciplines are supported, chosen once at start-up:
//!
//! ```text
//! jpeg-markers:   ..garbage.. FF D8 <image bytes> FF D9 ..next..
//!                             └──────── frame ────────┘
//!
//! len-prefix:     [u32 BE length][length bytes][u32 BE length]...
//!                                └── frame ──┘
//! ```
//!
//! Frames shorter than [`ExtractorLimits::min_frame_bytes`] are dropped, but
//! their bytes are still consumed so the stream stays aligned.

pub mod length;
pub mod marker;

use std::fmt;
use std::str::FromStr;

use bytes::{Bytes, BytesMut};

use crate::error::{ConfigError, ExtractError};

pub use length::LengthPrefixed;
pub use marker::MarkerDelimited;

/// JPEG start-of-image marker
pub const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];

/// JPEG end-of-image marker
pub const JPEG_EOI: [u8; 2] = [0xFF, 0xD9];

/// Size of the length-prefix header
pub const LENGTH_HEADER_SIZE: usize = 4;

/// Smallest frame forwarded to the cache
pub const DEFAULT_MIN_FRAME_BYTES: usize = 128;

/// Marker-mode high-water mark while no start marker is buffered
pub const DEFAULT_MAX_BUFFER_BYTES: usize = 5 * 1024 * 1024;

/// Bytes kept after a high-water trim
pub const DEFAULT_TRIM_TAIL_BYTES: usize = 1024 * 1024;

/// Framing discipline used on producer connections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FramingMode {
    /// Frames delimited by JPEG SOI/EOI markers
    #[default]
    JpegMarkers,
    /// Frames preceded by a 4-byte big-endian length
    LengthPrefix,
}

impl FramingMode {
    /// Configuration name of the mode
    pub fn as_str(&self) -> &'static str {
        match self {
            FramingMode::JpegMarkers => "jpeg-markers",
            FramingMode::LengthPrefix => "len-prefix",
        }
    }
}

impl fmt::Display for FramingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FramingMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jpeg-markers" => Ok(FramingMode::JpegMarkers),
            "len-prefix" => Ok(FramingMode::LengthPrefix),
            _ => Err(ConfigError::InvalidFramingMode(s.to_string())),
        }
    }
}

/// Size limits applied during extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractorLimits {
    /// Frames shorter than this are dropped
    pub min_frame_bytes: usize,

    /// Marker mode: trim threshold when no start marker is buffered
    pub max_buffer_bytes: usize,

    /// Marker mode: bytes kept after trimming
    pub trim_tail_bytes: usize,

    /// Length mode: reject headers declaring more than this (None = unbounded)
    pub max_frame_bytes: Option<usize>,

    /// Marker mode: reject a pending frame buffered past this (None = unbounded)
    pub max_pending_bytes: Option<usize>,
}

impl Default for ExtractorLimits {
    fn default() -> Self {
        Self {
            min_frame_bytes: DEFAULT_MIN_FRAME_BYTES,
            max_buffer_bytes: DEFAULT_MAX_BUFFER_BYTES,
            trim_tail_bytes: DEFAULT_TRIM_TAIL_BYTES,
            max_frame_bytes: None,
            max_pending_bytes: None,
        }
    }
}

/// Per-mode extraction state
#[derive(Debug, Clone)]
pub enum Framing {
    MarkerDelimited(MarkerDelimited),
    LengthPrefixed(LengthPrefixed),
}

/// Per-connection frame extractor
#[derive(Debug, Clone)]
pub struct FrameExtractor {
    framing: Framing,
    limits: ExtractorLimits,
}

impl FrameExtractor {
    /// Create an extractor for the given mode
    pub fn new(mode: FramingMode, limits: ExtractorLimits) -> Self {
        let framing = match mode {
            FramingMode::JpegMarkers => Framing::MarkerDelimited(MarkerDelimited::new()),
            FramingMode::LengthPrefix => Framing::LengthPrefixed(LengthPrefixed::new()),
        };

        Self { framing, limits }
    }

    /// Framing mode of this extractor
    pub fn mode(&self) -> FramingMode {
        match self.framing {
            Framing::MarkerDelimited(_) => FramingMode::JpegMarkers,
            Framing::LengthPrefixed(_) => FramingMode::LengthPrefix,
        }
    }

    /// Limits in effect
    pub fn limits(&self) -> &ExtractorLimits {
        &self.limits
    }

    /// Remove the next complete frame from the front of `buf`
    ///
    /// Returns `Ok(None)` when more input is needed. The returned frame has
    /// not been size-checked; use [`frames`](Self::frames) for that.
    pub fn next_frame(&mut self, buf: &mut BytesMut) -> Result<Option<Bytes>, ExtractError> {
        match self.framing {
            Framing::MarkerDelimited(ref mut m) => m.next_frame(buf, &self.limits),
            Framing::LengthPrefixed(ref mut l) => l.next_frame(buf, &self.limits),
        }
    }

    /// Iterate over the valid frames currently in `buf`
    pub fn frames<'a>(&'a mut self, buf: &'a mut BytesMut) -> Frames<'a> {
        Frames {
            extractor: self,
            buf,
            dropped: 0,
            failed: false,
        }
    }
}

/// Lazy iterator over the complete, valid frames in a buffer
///
/// Ends when the buffer holds no further complete frame. Calling
/// [`FrameExtractor::frames`] again after more bytes arrive resumes where
/// this one stopped. After yielding an error the iterator is fused.
pub struct Frames<'a> {
    extractor: &'a mut FrameExtractor,
    buf: &'a mut BytesMut,
    dropped: u64,
    failed: bool,
}

impl Frames<'_> {
    /// Number of undersized frames skipped so far
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl Iterator for Frames<'_> {
    type Item = Result<Bytes, ExtractError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        loop {
            match self.extractor.next_frame(self.buf) {
                Ok(Some(frame)) if frame.len() < self.extractor.limits.min_frame_bytes => {
                    self.dropped += 1;
                    tracing::trace!(size = frame.len(), "Dropping undersized frame");
                }
                Ok(Some(frame)) => return Some(Ok(frame)),
                Ok(None) => return None,
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_util::{jpeg, prefixed};
    use super::*;

    fn collect_chunked(mode: FramingMode, stream: &[u8], chunk: usize) -> Vec<Bytes> {
        let mut extractor = FrameExtractor::new(mode, ExtractorLimits::default());
        let mut buf = BytesMut::new();
        let mut out = Vec::new();

        for piece in stream.chunks(chunk) {
            buf.extend_from_slice(piece);
            for frame in extractor.frames(&mut buf) {
                out.push(frame.unwrap());
            }
        }
        out
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!(
            "jpeg-markers".parse::<FramingMode>().unwrap(),
            FramingMode::JpegMarkers
        );
        assert_eq!(
            "LEN-PREFIX".parse::<FramingMode>().unwrap(),
            FramingMode::LengthPrefix
        );
        assert!(matches!(
            "h264".parse::<FramingMode>(),
            Err(ConfigError::InvalidFramingMode(_))
        ));
        assert_eq!(FramingMode::LengthPrefix.to_string(), "len-prefix");
    }

    #[test]
    fn test_marker_chunking_invariance() {
        let mut stream = b"noise before".to_vec();
        stream.extend(jpeg(200, 0x11));
        stream.extend(b"between");
        stream.extend(jpeg(50, 0x22)); // undersized
        stream.extend(jpeg(500, 0x33));
        stream.extend(jpeg(300, 0x44));

        let whole = collect_chunked(FramingMode::JpegMarkers, &stream, stream.len());
        assert_eq!(whole.len(), 3);
        assert_eq!(whole[0].len(), 204);
        assert_eq!(whole[1].len(), 504);
        assert_eq!(whole[2].len(), 304);

        for chunk in [1, 2, 3, 7, 64, 333] {
            let chunked = collect_chunked(FramingMode::JpegMarkers, &stream, chunk);
            assert_eq!(chunked, whole, "chunk size {}", chunk);
        }
    }

    #[test]
    fn test_length_chunking_invariance() {
        let mut stream = prefixed(&[1u8; 128]);
        stream.extend(prefixed(&[2u8; 10])); // undersized
        stream.extend(prefixed(&[3u8; 1000]));
        stream.extend(prefixed(&[]));
        stream.extend(prefixed(&[4u8; 129]));

        let whole = collect_chunked(FramingMode::LengthPrefix, &stream, stream.len());
        assert_eq!(whole.len(), 3);
        assert_eq!(&whole[0][..], &[1u8; 128][..]);
        assert_eq!(&whole[1][..], &[3u8; 1000][..]);
        assert_eq!(&whole[2][..], &[4u8; 129][..]);

        for chunk in [1, 3, 4, 5, 17, 256] {
            let chunked = collect_chunked(FramingMode::LengthPrefix, &stream, chunk);
            assert_eq!(chunked, whole, "chunk size {}", chunk);
        }
    }

    #[test]
    fn test_undersized_dropped_but_consumed() {
        let mut extractor =
            FrameExtractor::new(FramingMode::JpegMarkers, ExtractorLimits::default());
        let mut buf = BytesMut::from(&jpeg(10, 0xAA)[..]);

        let mut frames = extractor.frames(&mut buf);
        assert!(frames.next().is_none());
        assert_eq!(frames.dropped(), 1);
        drop(frames);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_frames_resumes_after_more_input() {
        let mut extractor =
            FrameExtractor::new(FramingMode::LengthPrefix, ExtractorLimits::default());
        let frame = prefixed(&[9u8; 200]);
        let mut buf = BytesMut::from(&frame[..100]);

        assert_eq!(extractor.frames(&mut buf).count(), 0);

        buf.extend_from_slice(&frame[100..]);
        let out: Vec<_> = extractor.frames(&mut buf).collect();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].as_ref().unwrap().len(), 200);
    }

    #[test]
    fn test_frames_fused_after_error() {
        let limits = ExtractorLimits {
            max_frame_bytes: Some(256),
            ..Default::default()
        };
        let mut extractor = FrameExtractor::new(FramingMode::LengthPrefix, limits);
        let mut buf = BytesMut::from(&prefixed(&[0u8; 300])[..]);

        let mut frames = extractor.frames(&mut buf);
        assert!(matches!(
            frames.next(),
            Some(Err(ExtractError::FrameTooLarge {
                declared: 300,
                max: 256
            }))
        ));
        assert!(frames.next().is_none());
    }
}
