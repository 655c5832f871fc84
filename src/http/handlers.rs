use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{
        header::{CACHE_CONTROL, CONNECTION, CONTENT_LENGTH, CONTENT_TYPE, EXPIRES, PRAGMA},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use super::multipart::{PART_CONTENT_TYPE, STREAM_CONTENT_TYPE};
use crate::state::RelayState;
use crate::stats::RelayStats;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
}

fn no_cache_headers(headers: &mut HeaderMap) {
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate"),
    );
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(EXPIRES, HeaderValue::from_static("0"));
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn stats(State(state): State<Arc<RelayState>>) -> Json<RelayStats> {
    Json(RelayStats::collect(&state))
}

/// Subscribe to the MJPEG stream
///
/// Nothing is written until the scheduler's next tick with a cached frame.
/// The client unregisters itself when the body is dropped.
pub async fn stream(State(state): State<Arc<RelayState>>) -> Response {
    let body = state.clients.subscribe();

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(STREAM_CONTENT_TYPE));
    no_cache_headers(&mut headers);
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));

    (StatusCode::OK, headers, Body::from_stream(body)).into_response()
}

/// Latest frame as a single image
pub async fn snapshot(State(state): State<Arc<RelayState>>) -> Response {
    let Some(frame) = state.cache.read() else {
        return (StatusCode::NOT_FOUND, "no frame received yet").into_response();
    };

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(PART_CONTENT_TYPE));
    headers.insert(CONTENT_LENGTH, HeaderValue::from(frame.len()));
    no_cache_headers(&mut headers);

    (StatusCode::OK, headers, Body::from(frame.data().clone())).into_response()
}
