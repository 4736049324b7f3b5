use axum::http::{header, HeaderMap};

/// True for WebSocket handshakes. Those connections leave the HTTP
/// request/response cycle, so the pipeline passes them through untouched.
pub fn is_websocket_upgrade(headers: &HeaderMap) -> bool {
    headers
        .get(header::UPGRADE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.eq_ignore_ascii_case("websocket"))
        .unwrap_or(false)
}
