//! TCP camera ingest with latest-frame MJPEG fan-out
//!
//! Producers push a raw byte stream over TCP. Each connection extracts
//! frames with one of two framing disciplines (JPEG markers or a 4-byte
//! length prefix) and overwrites a single shared latest-frame slot. A
//! periodic scheduler pushes that frame to every subscribed HTTP client as
//! a `multipart/x-mixed-replace` part.
//!
//! ```text
//!  producer ─► ProducerConnection ─► FrameExtractor ─┐
//!  producer ─► ProducerConnection ─► FrameExtractor ─┼─► FrameCache
//!                                                    ┘      │
//!                              BroadcastScheduler (every 1000/fps ms)
//!                                         │
//!                       ┌─────────────────┼─────────────────┐
//!                       ▼                 ▼                 ▼
//!                  /stream.mjpg      /stream.mjpg      /stream.mjpg
//! ```
//!
//! # Example
//!
//! ```no_run
//! use frame_relay::{Relay, RelayConfig};
//!
//! # async fn run() -> frame_relay::Result<()> {
//! let relay = Relay::new(RelayConfig::from_env());
//! relay.run_until(async {
//!     let _ = tokio::signal::ctrl_c().await;
//! }).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod framing;
pub mod http;
pub mod registry;
pub mod server;
pub mod state;
pub mod stats;

pub use error::{Error, Result};
pub use framing::{FrameExtractor, FramingMode};
pub use registry::{ClientRegistry, Frame, FrameCache};
pub use server::{Relay, RelayConfig};
pub use state::RelayState;
