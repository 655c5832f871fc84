//! Read-only statistics snapshot served at `/stats`

use serde::Serialize;

use crate::state::RelayState;

/// Point-in-time view of relay activity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayStats {
    /// Open producer connections
    pub tcp_connections: usize,
    /// Producer connections accepted since start-up
    pub tcp_connections_total: u64,
    /// Subscribed streaming clients
    pub stream_clients: usize,
    /// Valid frames cached since start-up
    pub frames_received: u64,
    /// Undersized frames discarded since start-up
    pub frames_dropped: u64,
    /// Size of the latest frame in bytes
    pub last_frame_bytes: u64,
    /// Age of the latest frame, if any
    pub last_frame_age_ms: Option<u64>,
    /// Framing mode name
    pub mode: &'static str,
    /// Configured broadcast rate
    pub emit_fps: u32,
    /// Seconds since start-up
    pub uptime_secs: u64,
}

impl RelayStats {
    /// Collect a snapshot from shared state
    pub fn collect(state: &RelayState) -> Self {
        Self {
            tcp_connections: state.connections.len(),
            tcp_connections_total: state.connections.total(),
            stream_clients: state.clients.len(),
            frames_received: state.cache.frames_received(),
            frames_dropped: state.cache.frames_dropped(),
            last_frame_bytes: state.cache.bytes_last_frame(),
            last_frame_age_ms: state
                .cache
                .read()
                .map(|frame| frame.age().as_millis() as u64),
            mode: state.config.framing_mode.as_str(),
            emit_fps: state.config.emit_fps,
            uptime_secs: state.started_at.elapsed().as_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};

    use bytes::Bytes;

    use super::*;
    use crate::framing::FramingMode;
    use crate::registry::Frame;
    use crate::server::RelayConfig;

    #[test]
    fn test_collect_empty() {
        let state = RelayState::new(RelayConfig::default());
        let stats = RelayStats::collect(&state);

        assert_eq!(stats.tcp_connections, 0);
        assert_eq!(stats.stream_clients, 0);
        assert_eq!(stats.frames_received, 0);
        assert_eq!(stats.last_frame_bytes, 0);
        assert!(stats.last_frame_age_ms.is_none());
        assert_eq!(stats.mode, "jpeg-markers");
        assert_eq!(stats.emit_fps, 15);
    }

    #[test]
    fn test_collect_activity() {
        let config = RelayConfig::default()
            .framing_mode(FramingMode::LengthPrefix)
            .emit_fps(10);
        let state = RelayState::new(config);

        state
            .connections
            .register(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 4000));
        let (_id, _rx) = state.clients.register();
        state.cache.update(Frame::new(Bytes::from(vec![0u8; 4096])));
        state.cache.record_dropped(2);

        let stats = RelayStats::collect(&state);
        assert_eq!(stats.tcp_connections, 1);
        assert_eq!(stats.tcp_connections_total, 1);
        assert_eq!(stats.stream_clients, 1);
        assert_eq!(stats.frames_received, 1);
        assert_eq!(stats.frames_dropped, 2);
        assert_eq!(stats.last_frame_bytes, 4096);
        assert!(stats.last_frame_age_ms.is_some());
        assert_eq!(stats.mode, "len-prefix");
        assert_eq!(stats.emit_fps, 10);
    }

    #[test]
    fn test_json_keys() {
        let state = RelayState::new(RelayConfig::default());
        let json = serde_json::to_value(RelayStats::collect(&state)).unwrap();

        for key in [
            "tcpConnections",
            "streamClients",
            "framesReceived",
            "lastFrameBytes",
            "mode",
            "emitFps",
        ] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
    }
}
