use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use futures::FutureExt;
use tracing::{error, info};
use uuid::Uuid;

use performance_cell::PerformanceMonitor;

use crate::transport::is_websocket_upgrade;

const FAILURE_STATUS: u16 = 500;

/// Outermost layer: times the whole inner chain and reports every request to
/// the monitor. A panic from an inner layer is recorded as a 500 and then
/// resumed with its original payload.
pub async fn request_logging_middleware(
    State(monitor): State<Arc<PerformanceMonitor>>,
    request: Request,
    next: Next,
) -> Response {
    if is_websocket_upgrade(request.headers()) {
        return next.run(request).await;
    }

    let method = request.method().to_string();
    let path = request.uri().path().to_owned();
    let request_id = short_request_id();
    let started_at = chrono::Utc::now();
    let start = Instant::now();

    match AssertUnwindSafe(next.run(request)).catch_unwind().await {
        Ok(response) => {
            let duration = start.elapsed().as_secs_f64();
            let status = response.status().as_u16();

            monitor.record_request(&path, &method, duration, status).await;
            info!(
                request_id = %request_id,
                started_at = %started_at.to_rfc3339(),
                status,
                "{} {} completed in {:.2}ms",
                method,
                path,
                duration * 1000.0
            );

            response
        }
        Err(panic) => {
            let duration = start.elapsed().as_secs_f64();

            monitor
                .record_request(&path, &method, duration, FAILURE_STATUS)
                .await;
            error!(
                request_id = %request_id,
                started_at = %started_at.to_rfc3339(),
                "{} {} failed after {:.2}ms: {}",
                method,
                path,
                duration * 1000.0,
                panic_message(panic.as_ref())
            );

            std::panic::resume_unwind(panic)
        }
    }
}

fn short_request_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_request_id_is_eight_hex_chars() {
        let id = short_request_id();
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_panic_message_extraction() {
        let static_payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(static_payload.as_ref()), "boom");

        let owned_payload: Box<dyn Any + Send> = Box::new(String::from("bust"));
        assert_eq!(panic_message(owned_payload.as_ref()), "bust");

        let other_payload: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(other_payload.as_ref()), "non-string panic payload");
    }
}
