use std::sync::Arc;

use axum::{
    http::{HeaderValue, Method},
    routing::get,
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use super::handlers;
use crate::server::config::ANY_ORIGIN;
use crate::state::RelayState;

pub fn build_router(state: Arc<RelayState>) -> Router {
    let cors = cors_layer(&state.config.cors_origin);

    Router::new()
        .route("/stream.mjpg", get(handlers::stream))
        .route("/snapshot.jpg", get(handlers::snapshot))
        .route("/stats", get(handlers::stats))
        .route("/health", get(handlers::health))
        .layer(cors)
        .with_state(state)
}

/// CORS policy for the configured origin (`*` allows any)
pub fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods([Method::GET]);

    if origin.trim() == ANY_ORIGIN {
        return layer.allow_origin(Any);
    }

    match HeaderValue::from_str(origin.trim()) {
        Ok(value) => layer.allow_origin(AllowOrigin::exact(value)),
        Err(e) => {
            tracing::warn!(origin = origin, error = %e, "Invalid CORS origin, allowing any");
            layer.allow_origin(Any)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_router_for_any_origin() {
        let state = Arc::new(RelayState::new(Default::default()));
        let _router = build_router(state);
    }

    #[test]
    fn accepts_exact_and_invalid_origins() {
        let _exact = cors_layer("http://localhost:5173");
        let _fallback = cors_layer("bad\norigin");
    }
}
