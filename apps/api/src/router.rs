use std::sync::Arc;

use axum::{
    extract::{self, State},
    http::Uri,
    middleware::{self, Next},
    response::Response,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tracing::warn;

use middleware_cell::apply_middleware_stack;
use performance_cell::{create_performance_router, PerformanceHandlers, PerformanceMonitor, QueryCache};
use shared_config::AppConfig;
use shared_models::AppError;

pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

pub fn create_router(
    config: Arc<AppConfig>,
    monitor: Arc<PerformanceMonitor>,
    cache: Arc<QueryCache>,
) -> Router {
    let handlers = Arc::new(PerformanceHandlers::new(monitor.clone(), cache));

    let admin_routes = create_performance_router(handlers)
        .layer(middleware::from_fn_with_state(config, require_admin));

    let router = Router::new()
        .route("/", get(|| async { "Board game catalog API is running!" }))
        .route("/api/health", get(health_check))
        .nest("/api/admin", admin_routes)
        .fallback(not_found);

    apply_middleware_stack(router, monitor)
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now()
    }))
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {}", uri.path()))
}

async fn require_admin(
    State(config): State<Arc<AppConfig>>,
    request: extract::Request,
    next: Next,
) -> Result<Response, AppError> {
    let authorized = config.is_admin_configured()
        && request
            .headers()
            .get(ADMIN_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            == Some(config.admin_token.as_str());

    if !authorized {
        warn!("Rejected admin request to {}", request.uri().path());
        return Err(AppError::Unauthorized("Valid admin token required".to_string()));
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    fn setup_app(admin_token: &str) -> (Router, Arc<PerformanceMonitor>) {
        let config = Arc::new(AppConfig {
            admin_token: admin_token.to_string(),
            ..AppConfig::default()
        });
        let monitor = Arc::new(PerformanceMonitor::default());
        let cache = Arc::new(QueryCache::default());
        (create_router(config, monitor.clone(), cache), monitor)
    }

    async fn body_json(response: Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (app, _) = setup_app("secret");

        let request = Request::builder()
            .uri("/api/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["cache-control"],
            "public, max-age=60, s-maxage=60"
        );

        let json = body_json(response).await;
        assert_eq!(json["status"], "healthy");
    }

    #[tokio::test]
    async fn test_admin_requires_token() {
        let (app, _) = setup_app("secret");

        let request = Request::builder()
            .uri("/api/admin/performance")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_admin_rejects_everything_when_unconfigured() {
        let (app, _) = setup_app("");

        let request = Request::builder()
            .uri("/api/admin/cache")
            .header(ADMIN_TOKEN_HEADER, "")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_admin_stats_reflect_earlier_requests() {
        let (app, monitor) = setup_app("secret");

        let request = Request::builder()
            .uri("/api/health")
            .body(Body::empty())
            .unwrap();
        app.clone().oneshot(request).await.unwrap();

        let request = Request::builder()
            .uri("/api/admin/performance")
            .header(ADMIN_TOKEN_HEADER, "secret")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["cache-control"],
            "private, no-cache, no-store, must-revalidate"
        );

        let json = body_json(response).await;
        assert_eq!(json["total_requests"], 1);
        assert_eq!(json["slowest_endpoints"][0]["endpoint"], "GET /api/health");

        // The admin request itself is recorded once it completes.
        assert_eq!(monitor.sample_count().await, 2);
    }

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let (app, monitor) = setup_app("secret");

        let request = Request::builder()
            .uri("/api/public/nothing-here")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let json = body_json(response).await;
        assert_eq!(json["error"], "No route for /api/public/nothing-here");
        assert_eq!(monitor.sample_count().await, 1);
    }
}
