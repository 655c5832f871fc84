//! Frame type shared between ingest and fan-out

use std::time::{Duration, Instant};

use bytes::Bytes;

/// One complete image extracted from a producer stream
///
/// Cheap to clone: the payload is reference-counted, so the cache, the
/// scheduler and the snapshot handler all share the same allocation.
/// Frames carry no producer identity.
#[derive(Debug, Clone)]
pub struct Frame {
    data: Bytes,
    received_at: Instant,
}

impl Frame {
    /// Wrap extracted bytes, stamping the discovery time
    pub fn new(data: Bytes) -> Self {
        Self {
            data,
            received_at: Instant::now(),
        }
    }

    /// Frame payload
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Payload length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// When the frame was extracted
    pub fn received_at(&self) -> Instant {
        self.received_at
    }

    /// Time since the frame was extracted
    pub fn age(&self) -> Duration {
        self.received_at.elapsed()
    }
}

impl From<Bytes> for Frame {
    fn from(data: Bytes) -> Self {
        Self::new(data)
    }
}

impl PartialEq for Frame {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl Eq for Frame {}
