//! Relay server
//!
//! - `listener`: producer accept loop
//! - `connection`: per-producer read and extraction
//! - `scheduler`: periodic fan-out of the latest frame
//! - `relay`: start-up and shutdown of all of the above

pub mod config;
pub mod connection;
pub mod listener;
pub mod relay;
pub mod scheduler;

pub use config::RelayConfig;
pub use connection::{CloseReason, ProducerConnection};
pub use listener::IngestListener;
pub use relay::Relay;
pub use scheduler::{BroadcastScheduler, TickReport};
