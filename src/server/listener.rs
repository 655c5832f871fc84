//! Producer ingest listener
//!
//! Handles the TCP accept loop and spawns one [`ProducerConnection`] per
//! producer. All producers feed the same cache.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, Semaphore};

use crate::error::Result;
use crate::framing::FrameExtractor;
use crate::server::connection::{CloseReason, ProducerConnection};
use crate::state::RelayState;

/// TCP listener accepting producer connections
pub struct IngestListener {
    state: Arc<RelayState>,
    connection_semaphore: Option<Arc<Semaphore>>,
    shutdown: watch::Receiver<bool>,
}

impl IngestListener {
    /// Create a listener over shared relay state
    pub fn new(state: Arc<RelayState>, shutdown: watch::Receiver<bool>) -> Self {
        let connection_semaphore = if state.config.max_producers > 0 {
            Some(Arc::new(Semaphore::new(state.config.max_producers)))
        } else {
            None
        };

        Self {
            state,
            connection_semaphore,
            shutdown,
        }
    }

    /// Bind the configured ingest address
    pub async fn bind(&self) -> Result<TcpListener> {
        let listener = TcpListener::bind(self.state.config.ingest_addr).await?;
        tracing::info!(
            addr = %listener.local_addr()?,
            mode = %self.state.config.framing_mode,
            "Ingest listener bound"
        );
        Ok(listener)
    }

    /// Accept producers until shutdown
    pub async fn run(&self, listener: TcpListener) -> Result<()> {
        let mut shutdown = self.shutdown.clone();

        loop {
            tokio::select! {
                _ = shutdown.wait_for(|stop| *stop) => {
                    tracing::debug!("Ingest listener stopping");
                    return Ok(());
                }
                accepted = listener.accept() => match accepted {
                    Ok((socket, peer_addr)) => self.handle_connection(socket, peer_addr),
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to accept connection");
                    }
                },
            }
        }
    }

    fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        // Check connection limit
        let permit = if let Some(ref sem) = self.connection_semaphore {
            match sem.clone().try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    tracing::warn!(peer = %peer_addr, "Producer rejected: limit reached");
                    return;
                }
            }
        } else {
            None
        };

        if let Err(e) = self.configure_socket(&socket) {
            tracing::error!(peer = %peer_addr, error = %e, "Failed to configure socket");
            return;
        }

        let connections = Arc::clone(&self.state.connections);
        let session_id = connections.register(peer_addr);
        let config = &self.state.config;

        let mut connection = ProducerConnection::new(
            session_id,
            peer_addr,
            socket,
            FrameExtractor::new(config.framing_mode, config.limits.clone()),
            Arc::clone(&self.state.cache),
            config.read_buffer_size,
            self.shutdown.clone(),
        );

        tokio::spawn(async move {
            let _permit = permit;

            match connection.run().await {
                Ok(CloseReason::Eof) => {}
                Ok(CloseReason::Shutdown) => {
                    tracing::debug!(session_id = session_id, "Producer closed for shutdown");
                }
                Err(e) => {
                    tracing::warn!(
                        session_id = session_id,
                        peer = %peer_addr,
                        error = %e,
                        "Producer connection error"
                    );
                }
            }

            connections.unregister(session_id);
            tracing::info!(
                session_id = session_id,
                frames = connection.frames_extracted(),
                bytes = connection.bytes_received(),
                producers = connections.len(),
                "Producer disconnected"
            );
        });
    }

    fn configure_socket(&self, socket: &TcpStream) -> std::io::Result<()> {
        if self.state.config.tcp_nodelay {
            socket.set_nodelay(true)?;
        }
        Ok(())
    }
}
