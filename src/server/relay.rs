//! Relay orchestration
//!
//! Wires the ingest listener, the broadcast scheduler and the HTTP server
//! around one [`RelayState`], and tears all of them down together.

use std::future::{Future, IntoFuture};
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::error::Result;
use crate::http;
use crate::server::config::RelayConfig;
use crate::server::listener::IngestListener;
use crate::server::scheduler::BroadcastScheduler;
use crate::state::RelayState;

/// Frame relay server
pub struct Relay {
    state: Arc<RelayState>,
    shutdown: watch::Sender<bool>,
}

impl Relay {
    /// Create a relay with empty state
    pub fn new(config: RelayConfig) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            state: Arc::new(RelayState::new(config)),
            shutdown,
        }
    }

    /// Shared state
    pub fn state(&self) -> &Arc<RelayState> {
        &self.state
    }

    /// Bind the configured ports and serve until `signal` resolves
    ///
    /// Failing to bind either port is the only fatal error.
    pub async fn run_until<F>(&self, signal: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let ingest = IngestListener::new(Arc::clone(&self.state), self.shutdown.subscribe())
            .bind()
            .await?;

        let http_listener = TcpListener::bind(self.state.config.http_addr).await?;
        tracing::info!(addr = %http_listener.local_addr()?, "HTTP server bound");

        self.serve(ingest, http_listener, signal).await
    }

    /// Serve on already-bound listeners until `signal` resolves or
    /// [`shutdown`](Self::shutdown) is called
    pub async fn serve<F>(
        &self,
        ingest: TcpListener,
        http_listener: TcpListener,
        signal: F,
    ) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let config = &self.state.config;
        let scheduler = BroadcastScheduler::new(
            Arc::clone(&self.state.cache),
            Arc::clone(&self.state.clients),
            config.emit_fps,
        );
        tracing::info!(
            emit_fps = config.emit_fps,
            period_ms = scheduler.period().as_millis() as u64,
            mode = %config.framing_mode,
            "Relay started"
        );
        let scheduler_handle = scheduler.spawn();

        let listener = IngestListener::new(Arc::clone(&self.state), self.shutdown.subscribe());
        let app = http::routes::build_router(Arc::clone(&self.state));
        let mut stop = self.shutdown.subscribe();

        let result = tokio::select! {
            _ = signal => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            _ = stop.wait_for(|stop| *stop) => Ok(()),
            result = listener.run(ingest) => result,
            result = axum::serve(http_listener, app).into_future() => result.map_err(Into::into),
        };

        self.shutdown();
        scheduler_handle.abort();

        result
    }

    /// Stop accepting, close every producer and every streaming client
    ///
    /// There is no drain period for in-flight writes.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
        self.state.clients.clear();
    }
}
