use axum::{routing::get, Router};
use std::sync::Arc;

use crate::handlers::{
    clear_cache, get_cache_stats, get_performance_stats, reset_performance_stats,
    PerformanceHandlers,
};

pub fn create_performance_router(handlers: Arc<PerformanceHandlers>) -> Router {
    Router::new()
        .route(
            "/performance",
            get(get_performance_stats).delete(reset_performance_stats),
        )
        .route("/cache", get(get_cache_stats).delete(clear_cache))
        .with_state(handlers)
}
