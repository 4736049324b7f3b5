// =====================================================================================
// PERFORMANCE CELL - REQUEST TIMING & QUERY CACHING
// =====================================================================================
//
// This cell provides the in-process performance utilities:
// - Bounded-memory request timing monitor with per-endpoint LRU stats
// - TTL query cache with amortized eviction sweeps
// - Admin router exposing monitor and cache snapshots
//
// =====================================================================================

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::*;
pub use router::create_performance_router;
pub use services::{
    CacheConfig, CacheKey, CachedQuery, Clock, PerformanceMonitor, QueryCache, SystemClock,
};
#[cfg(any(test, feature = "test-util"))]
pub use services::ManualClock;
pub use handlers::PerformanceHandlers;
