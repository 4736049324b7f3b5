// =====================================================================================
// MIDDLEWARE CELL - REQUEST PIPELINE
// =====================================================================================
//
// Request/response middleware shared by every route:
// - Request logging and timing, feeding the performance monitor
// - Correlation id propagation via x-request-id
// - Defense-in-depth security headers
// - Path-based Cache-Control classification
//
// Every layer only adds headers that are not already present, so handlers
// can override any of them.
//
// =====================================================================================

pub mod cache_control;
pub mod chain;
pub mod request_id;
pub mod request_logging;
pub mod security_headers;
pub mod transport;

pub use cache_control::{cache_control_middleware, CacheTier};
pub use chain::apply_middleware_stack;
pub use request_id::{request_id_middleware, CorrelationId, X_REQUEST_ID};
pub use request_logging::request_logging_middleware;
pub use security_headers::{apply_security_headers, security_headers_middleware, API_PREFIX};
pub use transport::is_websocket_upgrade;
