//! Relay configuration
//!
//! Read once at start-up from environment variables (see
//! [`RelayConfig::from_env`]) or built programmatically with the builder
//! methods. Values that fail to parse fall back to their defaults with a
//! warning; only binding the listeners can fail start-up.

use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::framing::{ExtractorLimits, FramingMode};
use crate::registry::clients::DEFAULT_CLIENT_BUFFER;

/// Default HTTP listen port
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Default TCP ingest port
pub const DEFAULT_TCP_PORT: u16 = 9000;

/// Default broadcast rate
pub const DEFAULT_EMIT_FPS: u32 = 15;

/// CORS origin value meaning "any origin"
pub const ANY_ORIGIN: &str = "*";

/// Relay configuration options
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address the HTTP server binds to
    pub http_addr: SocketAddr,

    /// Address the producer ingest listener binds to
    pub ingest_addr: SocketAddr,

    /// Framing discipline for every producer connection
    pub framing_mode: FramingMode,

    /// Target broadcast rate in frames per second
    pub emit_fps: u32,

    /// Permitted cross-origin request source (`*` = any)
    pub cors_origin: String,

    /// Maximum concurrent producer connections (0 = unlimited)
    pub max_producers: usize,

    /// Enable TCP_NODELAY on producer sockets
    pub tcp_nodelay: bool,

    /// Bytes reserved per socket read
    pub read_buffer_size: usize,

    /// Chunks buffered per streaming client
    pub client_buffer: usize,

    /// Extraction size limits
    pub limits: ExtractorLimits,
}

impl Default for RelayConfig {
    fn default() -> Self {
        let any = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
        Self {
            http_addr: SocketAddr::new(any, DEFAULT_HTTP_PORT),
            ingest_addr: SocketAddr::new(any, DEFAULT_TCP_PORT),
            framing_mode: FramingMode::JpegMarkers,
            emit_fps: DEFAULT_EMIT_FPS,
            cors_origin: ANY_ORIGIN.to_string(),
            max_producers: 0, // Unlimited
            tcp_nodelay: true,
            read_buffer_size: 64 * 1024,
            client_buffer: DEFAULT_CLIENT_BUFFER,
            limits: ExtractorLimits::default(),
        }
    }
}

impl RelayConfig {
    /// Build configuration from the process environment
    ///
    /// | Variable           | Default        |
    /// |--------------------|----------------|
    /// | `BIND_HOST`        | `0.0.0.0`      |
    /// | `HTTP_PORT`        | `8080`         |
    /// | `TCP_PORT`         | `9000`         |
    /// | `FRAMING_MODE`     | `jpeg-markers` |
    /// | `EMIT_FPS`         | `15`           |
    /// | `CORS_ORIGIN`      | `*`            |
    /// | `MAX_PRODUCERS`    | `0`            |
    /// | `MAX_BUFFER_BYTES` | 5 MiB          |
    /// | `TRIM_TAIL_BYTES`  | 1 MiB          |
    /// | `MIN_FRAME_BYTES`  | `128`          |
    /// | `MAX_FRAME_BYTES`  | unset          |
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &'static str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = setting(get("BIND_HOST"), "BIND_HOST", defaults.http_addr.ip());
        let http_port = setting(get("HTTP_PORT"), "HTTP_PORT", DEFAULT_HTTP_PORT);
        let tcp_port = setting(get("TCP_PORT"), "TCP_PORT", DEFAULT_TCP_PORT);

        let mut limits = defaults.limits.clone();
        limits.max_buffer_bytes = setting(
            get("MAX_BUFFER_BYTES"),
            "MAX_BUFFER_BYTES",
            limits.max_buffer_bytes,
        );
        limits.trim_tail_bytes = setting(
            get("TRIM_TAIL_BYTES"),
            "TRIM_TAIL_BYTES",
            limits.trim_tail_bytes,
        );
        limits.min_frame_bytes = setting(
            get("MIN_FRAME_BYTES"),
            "MIN_FRAME_BYTES",
            limits.min_frame_bytes,
        );
        limits.max_frame_bytes = get("MAX_FRAME_BYTES")
            .and_then(|v| parse_setting(&v, "MAX_FRAME_BYTES").map_err(warn_default).ok());

        Self {
            http_addr: SocketAddr::new(host, http_port),
            ingest_addr: SocketAddr::new(host, tcp_port),
            framing_mode: setting(get("FRAMING_MODE"), "FRAMING_MODE", defaults.framing_mode),
            emit_fps: setting(get("EMIT_FPS"), "EMIT_FPS", defaults.emit_fps).max(1),
            cors_origin: get("CORS_ORIGIN").unwrap_or(defaults.cors_origin),
            max_producers: setting(get("MAX_PRODUCERS"), "MAX_PRODUCERS", 0),
            ..defaults
        }
        .limits(limits)
    }

    /// Interval between broadcast ticks: `max(1, floor(1000 / emit_fps))` ms
    pub fn emit_interval(&self) -> Duration {
        emit_interval(self.emit_fps)
    }

    /// Set the HTTP bind address
    pub fn http_addr(mut self, addr: SocketAddr) -> Self {
        self.http_addr = addr;
        self
    }

    /// Set the ingest bind address
    pub fn ingest_addr(mut self, addr: SocketAddr) -> Self {
        self.ingest_addr = addr;
        self
    }

    /// Set the framing mode
    pub fn framing_mode(mut self, mode: FramingMode) -> Self {
        self.framing_mode = mode;
        self
    }

    /// Set the broadcast rate (0 is treated as 1)
    pub fn emit_fps(mut self, fps: u32) -> Self {
        self.emit_fps = fps.max(1);
        self
    }

    /// Set the permitted CORS origin
    pub fn cors_origin(mut self, origin: impl Into<String>) -> Self {
        self.cors_origin = origin.into();
        self
    }

    /// Set maximum producer connections
    pub fn max_producers(mut self, max: usize) -> Self {
        self.max_producers = max;
        self
    }

    /// Set extraction limits
    ///
    /// The trim tail is clamped to the high-water mark.
    pub fn limits(mut self, mut limits: ExtractorLimits) -> Self {
        limits.trim_tail_bytes = limits.trim_tail_bytes.min(limits.max_buffer_bytes);
        self.limits = limits;
        self
    }
}

/// Broadcast period for a frame rate: `max(1, floor(1000 / fps))` ms
pub fn emit_interval(emit_fps: u32) -> Duration {
    let millis = 1000 / u64::from(emit_fps.max(1));
    Duration::from_millis(millis.max(1))
}

fn parse_setting<T: FromStr>(value: &str, key: &'static str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

fn setting<T: FromStr>(value: Option<String>, key: &'static str, default: T) -> T {
    match value {
        Some(v) => parse_setting(&v, key).unwrap_or_else(|e| {
            warn_default(e);
            default
        }),
        None => default,
    }
}

fn warn_default(e: ConfigError) {
    tracing::warn!(error = %e, "Ignoring invalid setting, using default");
}
