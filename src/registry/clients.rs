//! Streaming client registry
//!
//! Each subscribed HTTP response is backed by a bounded channel. The
//! registry holds the sending half; the response body owns the receiving
//! half wrapped in a [`ClientStream`].
//!
//! A client leaves the registry along one of two paths, which converge on
//! [`ClientRegistry::unregister`]:
//!
//! ```text
//!   scheduler tick ── try_write() == Closed ──┐
//!                                             ├──► unregister(id)  (idempotent)
//!   HTTP body dropped ── ClientGuard::drop ───┘
//! ```

use std::collections::HashMap;
use std::convert::Infallible;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::Stream;

/// Identifier assigned to each streaming client
pub type ClientId = u64;

/// Default number of chunks buffered per client
///
/// Kept at one so a slow client never accumulates a backlog of stale frames.
pub const DEFAULT_CLIENT_BUFFER: usize = 1;

/// Why a write to a client did not go through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkError {
    /// The previous chunk has not been consumed yet
    Busy,
    /// The client is gone
    Closed,
}

/// Sending half of a streaming client
#[derive(Debug, Clone)]
pub struct ClientSink {
    tx: mpsc::Sender<Bytes>,
}

impl ClientSink {
    /// Queue a chunk without waiting
    pub fn try_write(&self, chunk: Bytes) -> Result<(), SinkError> {
        self.tx.try_send(chunk).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SinkError::Busy,
            mpsc::error::TrySendError::Closed(_) => SinkError::Closed,
        })
    }

    /// Whether the receiving side has been dropped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Set of currently subscribed streaming clients
#[derive(Debug)]
pub struct ClientRegistry {
    clients: Mutex<HashMap<ClientId, ClientSink>>,
    next_id: AtomicU64,
    buffer: usize,
}

impl ClientRegistry {
    /// Create a registry with the default per-client buffer
    pub fn new() -> Self {
        Self::with_buffer(DEFAULT_CLIENT_BUFFER)
    }

    /// Create a registry buffering `buffer` chunks per client
    pub fn with_buffer(buffer: usize) -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            buffer: buffer.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ClientId, ClientSink>> {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a client, returning its id and the receiving half of its sink
    pub fn register(&self) -> (ClientId, mpsc::Receiver<Bytes>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.buffer);

        let count = {
            let mut clients = self.lock();
            clients.insert(id, ClientSink { tx });
            clients.len()
        };

        tracing::info!(client_id = id, clients = count, "Streaming client added");
        (id, rx)
    }

    /// Add a client and wrap its receiver in a self-unregistering stream
    pub fn subscribe(self: &Arc<Self>) -> ClientStream {
        let (id, rx) = self.register();
        ClientStream {
            inner: ReceiverStream::new(rx),
            guard: ClientGuard {
                id,
                registry: Arc::clone(self),
            },
        }
    }

    /// Remove a client
    ///
    /// Removing an absent client is a no-op. Returns whether it was present.
    pub fn unregister(&self, id: ClientId) -> bool {
        let (removed, count) = {
            let mut clients = self.lock();
            let removed = clients.remove(&id).is_some();
            (removed, clients.len())
        };

        if removed {
            tracing::info!(client_id = id, clients = count, "Streaming client removed");
        }
        removed
    }

    /// Visit every registered client
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(ClientId, &ClientSink),
    {
        for (id, sink) in self.lock().iter() {
            f(*id, sink);
        }
    }

    /// Visit every registered client, dropping those for which `f` returns false
    ///
    /// Dropping a client drops its sender, which ends its response body.
    pub fn retain<F>(&self, mut f: F)
    where
        F: FnMut(ClientId, &ClientSink) -> bool,
    {
        self.lock().retain(|id, sink| f(*id, sink));
    }

    /// Whether a client is registered
    pub fn contains(&self, id: ClientId) -> bool {
        self.lock().contains_key(&id)
    }

    /// Number of registered clients
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop every client, ending all response bodies
    pub fn clear(&self) -> usize {
        let drained = {
            let mut clients = self.lock();
            let n = clients.len();
            clients.clear();
            n
        };

        if drained > 0 {
            tracing::info!(clients = drained, "Closed all streaming clients");
        }
        drained
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Unregisters its client when dropped
#[derive(Debug)]
pub struct ClientGuard {
    id: ClientId,
    registry: Arc<ClientRegistry>,
}

impl ClientGuard {
    pub fn id(&self) -> ClientId {
        self.id
    }
}

impl Drop for ClientGuard {
    fn drop(&mut self) {
        self.registry.unregister(self.id);
    }
}

/// Response body stream for one client
///
/// Yields every chunk the scheduler pushes. When the HTTP layer drops the
/// body (the consumer disconnected) the client is unregistered.
#[derive(Debug)]
pub struct ClientStream {
    inner: ReceiverStream<Bytes>,
    guard: ClientGuard,
}

impl ClientStream {
    pub fn id(&self) -> ClientId {
        self.guard.id()
    }
}

impl Stream for ClientStream {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner)
            .poll_next(cx)
            .map(|chunk| chunk.map(Ok))
    }
}
