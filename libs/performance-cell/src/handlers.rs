use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::models::{CacheClearResponse, CacheStats, PerformanceStats};
use crate::services::{PerformanceMonitor, QueryCache};

pub struct PerformanceHandlers {
    pub monitor: Arc<PerformanceMonitor>,
    pub cache: Arc<QueryCache>,
}

impl PerformanceHandlers {
    pub fn new(monitor: Arc<PerformanceMonitor>, cache: Arc<QueryCache>) -> Self {
        Self { monitor, cache }
    }
}

pub async fn get_performance_stats(
    State(handlers): State<Arc<PerformanceHandlers>>,
) -> Json<PerformanceStats> {
    Json(handlers.monitor.get_stats().await)
}

#[instrument(skip(handlers))]
pub async fn reset_performance_stats(
    State(handlers): State<Arc<PerformanceHandlers>>,
) -> StatusCode {
    handlers.monitor.reset().await;
    info!("Performance stats reset by admin");
    StatusCode::NO_CONTENT
}

pub async fn get_cache_stats(
    State(handlers): State<Arc<PerformanceHandlers>>,
) -> Json<CacheStats> {
    Json(handlers.cache.get_cache_stats().await)
}

#[instrument(skip(handlers))]
pub async fn clear_cache(
    State(handlers): State<Arc<PerformanceHandlers>>,
) -> Json<CacheClearResponse> {
    let cleared_entries = handlers.cache.clear_cache().await;
    Json(CacheClearResponse { cleared_entries })
}
