//! Broadcast scheduler
//!
//! A single repeating task that pushes the cached latest frame to every
//! streaming client once per tick. Clients never queue frames across ticks:
//! a client still holding the previous part is skipped, and a client whose
//! receiving side is gone is removed without affecting anyone else.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::http::multipart::encode_part;
use crate::registry::{ClientRegistry, FrameCache, SinkError};
use crate::server::config::emit_interval;

/// Outcome of one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Clients that were handed the frame
    pub delivered: usize,
    /// Clients still busy with the previous part
    pub skipped: usize,
    /// Clients removed because their sink was closed
    pub removed: usize,
}

/// Periodic fan-out of the latest frame
pub struct BroadcastScheduler {
    cache: Arc<FrameCache>,
    clients: Arc<ClientRegistry>,
    period: Duration,
}

impl BroadcastScheduler {
    /// Create a scheduler ticking every `max(1, 1000 / emit_fps)` ms
    pub fn new(cache: Arc<FrameCache>, clients: Arc<ClientRegistry>, emit_fps: u32) -> Self {
        Self {
            cache,
            clients,
            period: emit_interval(emit_fps),
        }
    }

    /// Tick period
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Run one fan-out pass
    pub fn tick(&self) -> TickReport {
        let mut report = TickReport::default();

        let Some(frame) = self.cache.read() else {
            return report;
        };
        let part = encode_part(frame.data());

        self.clients
            .retain(|client_id, sink| match sink.try_write(part.clone()) {
                Ok(()) => {
                    report.delivered += 1;
                    true
                }
                Err(SinkError::Busy) => {
                    report.skipped += 1;
                    tracing::trace!(client_id = client_id, "Client busy, skipping tick");
                    true
                }
                Err(SinkError::Closed) => {
                    report.removed += 1;
                    tracing::debug!(client_id = client_id, "Client write failed, removing");
                    false
                }
            });

        if report.removed > 0 {
            tracing::info!(
                removed = report.removed,
                clients = self.clients.len(),
                "Dropped disconnected streaming clients"
            );
        }

        report
    }

    /// Tick until the task is aborted
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::debug!(period_ms = self.period.as_millis() as u64, "Broadcast scheduler started");

        loop {
            ticker.tick().await;
            self.tick();
        }
    }

    /// Spawn the repeating task
    ///
    /// Returns a handle that can be used to abort the task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
