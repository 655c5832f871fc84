//! Producer connection handler
//!
//! Owns one accumulation buffer and one [`FrameExtractor`]. Every read is
//! appended to the buffer and all complete frames are handed to the cache
//! in stream order. Nothing survives the connection: a reconnecting
//! producer starts extraction from scratch.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::watch;

use crate::error::{ExtractError, Result};
use crate::framing::FrameExtractor;
use crate::registry::{Frame, FrameCache};

/// Why a producer connection ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Peer closed the stream
    Eof,
    /// Relay is shutting down
    Shutdown,
}

/// A single producer connection
pub struct ProducerConnection<S> {
    session_id: u64,
    peer_addr: SocketAddr,
    stream: S,
    buffer: BytesMut,
    extractor: FrameExtractor,
    cache: Arc<FrameCache>,
    read_buffer_size: usize,
    shutdown: watch::Receiver<bool>,
    bytes_received: u64,
    frames_extracted: u64,
}

impl<S> ProducerConnection<S>
where
    S: AsyncRead + Unpin,
{
    /// Create a new connection handler
    pub fn new(
        session_id: u64,
        peer_addr: SocketAddr,
        stream: S,
        extractor: FrameExtractor,
        cache: Arc<FrameCache>,
        read_buffer_size: usize,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            session_id,
            peer_addr,
            stream,
            buffer: BytesMut::with_capacity(read_buffer_size),
            extractor,
            cache,
            read_buffer_size: read_buffer_size.max(1),
            shutdown,
            bytes_received: 0,
            frames_extracted: 0,
        }
    }

    /// Read and extract until EOF, I/O error, rejection or shutdown
    pub async fn run(&mut self) -> Result<CloseReason> {
        tracing::info!(
            session_id = self.session_id,
            peer = %self.peer_addr,
            mode = %self.extractor.mode(),
            "Producer connected"
        );

        loop {
            self.buffer.reserve(self.read_buffer_size);

            let n = tokio::select! {
                _ = self.shutdown.wait_for(|stop| *stop) => {
                    return Ok(CloseReason::Shutdown);
                }
                read = self.stream.read_buf(&mut self.buffer) => read?,
            };

            if n == 0 {
                tracing::debug!(
                    session_id = self.session_id,
                    buffered = self.buffer.len(),
                    "Producer closed stream"
                );
                return Ok(CloseReason::Eof);
            }

            self.bytes_received += n as u64;
            self.drain_frames()?;
        }
    }

    /// Hand every complete frame in the buffer to the cache
    fn drain_frames(&mut self) -> std::result::Result<(), ExtractError> {
        let mut frames = self.extractor.frames(&mut self.buffer);

        for frame in frames.by_ref() {
            let frame = frame?;
            tracing::trace!(
                session_id = self.session_id,
                size = frame.len(),
                "Frame extracted"
            );
            self.frames_extracted += 1;
            self.cache.update(Frame::new(frame));
        }

        self.cache.record_dropped(frames.dropped());
        Ok(())
    }

    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    /// Total bytes read from the producer
    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }

    /// Valid frames handed to the cache
    pub fn frames_extracted(&self) -> u64 {
        self.frames_extracted
    }

    /// Bytes currently buffered
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}
