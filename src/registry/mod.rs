//! Shared state between ingest and fan-out
//!
//! ```text
//!   [Producer conn] ──┐
//!   [Producer conn] ──┼──► FrameCache::update()      (last write wins)
//!   [Producer conn] ──┘            │
//!                                  ▼
//!                      BroadcastScheduler tick ──► ClientRegistry ──► [HTTP client]
//!                                                                 ──► [HTTP client]
//! ```
//!
//! The cache and the client registry are the only mutable state shared
//! across tasks. Both guard their contents internally with short critical
//! sections that are never held across an `.await`.

pub mod cache;
pub mod clients;
pub mod connections;
pub mod frame;

pub use cache::FrameCache;
pub use clients::{ClientGuard, ClientId, ClientRegistry, ClientSink, ClientStream, SinkError};
pub use connections::{ConnectionRegistry, ProducerInfo};
pub use frame::Frame;
