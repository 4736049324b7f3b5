use axum::{middleware, Router};
use std::sync::Arc;
use tower::ServiceBuilder;

use performance_cell::PerformanceMonitor;

use crate::cache_control::cache_control_middleware;
use crate::request_id::request_id_middleware;
use crate::request_logging::request_logging_middleware;
use crate::security_headers::security_headers_middleware;

/// Wraps every route of `router` in the request pipeline.
///
/// `ServiceBuilder` runs layers top to bottom, so the order below is the
/// order a request travels:
///
/// ```text
/// logging -> request id -> security headers -> cache control -> handler
/// ```
///
/// Logging is outermost so its timing covers the whole chain and it sees
/// failures raised by any inner layer. Register routes and fallback before
/// calling this.
pub fn apply_middleware_stack(router: Router, monitor: Arc<PerformanceMonitor>) -> Router {
    router.layer(
        ServiceBuilder::new()
            .layer(middleware::from_fn_with_state(
                monitor,
                request_logging_middleware,
            ))
            .layer(middleware::from_fn(request_id_middleware))
            .layer(middleware::from_fn(security_headers_middleware))
            .layer(middleware::from_fn(cache_control_middleware)),
    )
}
