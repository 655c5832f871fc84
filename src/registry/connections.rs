//! Producer connection registry
//!
//! Tracks open producer TCP connections for reporting. Producers are not
//! routed by identity; every connection feeds the same cache.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

/// Information about one open producer connection
#[derive(Debug, Clone)]
pub struct ProducerInfo {
    /// Session ID assigned at accept time
    pub id: u64,
    /// Remote peer address
    pub peer_addr: SocketAddr,
    /// When the connection was accepted
    pub connected_at: Instant,
}

/// Set of currently open producer connections
#[derive(Debug)]
pub struct ConnectionRegistry {
    connections: Mutex<HashMap<u64, ProducerInfo>>,
    next_id: AtomicU64,
    total: AtomicU64,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            total: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u64, ProducerInfo>> {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a new connection, returning its session ID
    pub fn register(&self, peer_addr: SocketAddr) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.total.fetch_add(1, Ordering::Relaxed);

        self.lock().insert(
            id,
            ProducerInfo {
                id,
                peer_addr,
                connected_at: Instant::now(),
            },
        );
        id
    }

    /// Forget a connection; absent IDs are ignored
    pub fn unregister(&self, id: u64) -> Option<ProducerInfo> {
        self.lock().remove(&id)
    }

    /// Number of open connections
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Connections accepted since start-up
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// Snapshot of open connections
    pub fn list(&self) -> Vec<ProducerInfo> {
        let mut list: Vec<_> = self.lock().values().cloned().collect();
        list.sort_by_key(|info| info.id);
        list
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
