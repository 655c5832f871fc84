//! Latest-frame cache
//!
//! A single slot holding the most recently extracted valid frame. Every
//! producer connection writes into the same slot (last write wins) and the
//! broadcast scheduler reads it once per tick.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use super::frame::Frame;

/// Single-slot store for the latest frame plus running counters
#[derive(Debug, Default)]
pub struct FrameCache {
    slot: RwLock<Option<Frame>>,
    frames_received: AtomicU64,
    bytes_last_frame: AtomicU64,
    frames_dropped: AtomicU64,
}

impl FrameCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cached frame
    pub fn update(&self, frame: Frame) {
        let len = frame.len() as u64;

        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Some(frame);

        self.frames_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_last_frame.store(len, Ordering::Relaxed);
    }

    /// Current frame, if any has arrived yet
    pub fn read(&self) -> Option<Frame> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Count frames discarded by the size filter
    pub fn record_dropped(&self, count: u64) {
        if count > 0 {
            self.frames_dropped.fetch_add(count, Ordering::Relaxed);
        }
    }

    /// Total frames accepted since start-up
    pub fn frames_received(&self) -> u64 {
        self.frames_received.load(Ordering::Relaxed)
    }

    /// Size of the most recently accepted frame
    pub fn bytes_last_frame(&self) -> u64 {
        self.bytes_last_frame.load(Ordering::Relaxed)
    }

    /// Total undersized frames discarded since start-up
    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped.load(Ordering::Relaxed)
    }
}
