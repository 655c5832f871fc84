//! HTTP surface
//!
//! - `GET /stream.mjpg`: multipart MJPEG stream of the latest frame
//! - `GET /snapshot.jpg`: latest frame as a single image
//! - `GET /stats`: JSON statistics
//! - `GET /health`: liveness

pub mod handlers;
pub mod multipart;
pub mod routes;

pub use routes::build_router;
