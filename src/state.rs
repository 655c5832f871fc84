//! Process-wide relay state

use std::sync::Arc;
use std::time::Instant;

use crate::registry::{ClientRegistry, ConnectionRegistry, FrameCache};
use crate::server::config::RelayConfig;

/// State shared by the ingest listener, the scheduler and the HTTP layer
///
/// Created empty at start-up and kept for the life of the process. The
/// containers are only reachable through their own operations.
#[derive(Debug)]
pub struct RelayState {
    pub config: RelayConfig,
    pub cache: Arc<FrameCache>,
    pub clients: Arc<ClientRegistry>,
    pub connections: Arc<ConnectionRegistry>,
    pub started_at: Instant,
}

impl RelayState {
    pub fn new(config: RelayConfig) -> Self {
        let clients = ClientRegistry::with_buffer(config.client_buffer);
        Self {
            config,
            cache: Arc::new(FrameCache::new()),
            clients: Arc::new(clients),
            connections: Arc::new(ConnectionRegistry::new()),
            started_at: Instant::now(),
        }
    }
}
