// =====================================================================================
// PERFORMANCE MONITOR SERVICE - BOUNDED REQUEST TIMING
// =====================================================================================

use std::cmp::Ordering;
use std::collections::VecDeque;
use std::num::NonZeroUsize;

use lru::LruCache;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use crate::models::{
    EndpointStats, EndpointSummary, PerformanceSample, PerformanceStats, PerformanceSummary,
    SlowQueryRecord,
};

pub const DEFAULT_MAX_ENDPOINTS: usize = 100;
pub const MAX_RECENT_SAMPLES: usize = 1000;
pub const MAX_SLOW_QUERIES: usize = 100;
pub const SLOW_REQUEST_THRESHOLD_SECS: f64 = 2.0;
pub const NO_REQUESTS_MESSAGE: &str = "No requests recorded yet";

const TOP_ENDPOINTS: usize = 10;
const RECENT_SLOW_QUERIES: usize = 10;

struct MonitorState {
    samples: VecDeque<PerformanceSample>,
    // Iteration runs most-recently-updated first; `push` evicts the tail.
    endpoints: LruCache<String, EndpointStats>,
    slow_queries: VecDeque<SlowQueryRecord>,
}

impl MonitorState {
    fn new(max_endpoints: NonZeroUsize) -> Self {
        Self {
            samples: VecDeque::with_capacity(MAX_RECENT_SAMPLES),
            endpoints: LruCache::new(max_endpoints),
            slow_queries: VecDeque::with_capacity(MAX_SLOW_QUERIES),
        }
    }
}

pub struct PerformanceMonitor {
    max_endpoints: NonZeroUsize,
    state: RwLock<MonitorState>,
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENDPOINTS)
    }
}

impl PerformanceMonitor {
    pub fn new(max_endpoints: usize) -> Self {
        let max_endpoints = NonZeroUsize::new(max_endpoints).unwrap_or_else(|| {
            warn!("max_endpoints must be positive, tracking a single endpoint");
            NonZeroUsize::MIN
        });

        Self {
            max_endpoints,
            state: RwLock::new(MonitorState::new(max_endpoints)),
        }
    }

    pub fn max_endpoints(&self) -> usize {
        self.max_endpoints.get()
    }

    #[instrument(skip(self))]
    pub async fn record_request(&self, path: &str, method: &str, duration: f64, status_code: u16) {
        let timestamp = chrono::Utc::now();
        let mut state = self.state.write().await;

        if state.samples.len() == MAX_RECENT_SAMPLES {
            state.samples.pop_front();
        }
        state.samples.push_back(PerformanceSample {
            duration,
            path: path.to_string(),
            method: method.to_string(),
            status_code,
            timestamp,
        });

        let key = format!("{} {}", method, path);
        if !state.endpoints.contains(&key) {
            if let Some((evicted, _)) = state.endpoints.push(key.clone(), EndpointStats::default()) {
                debug!("Evicted least recently used endpoint stats: {}", evicted);
            }
        }

        // `get_mut` promotes the entry to most-recently-used.
        if let Some(stats) = state.endpoints.get_mut(&key) {
            stats.count += 1;
            stats.total_time += duration;
            if status_code >= 400 {
                stats.errors += 1;
            }
        }

        if duration > SLOW_REQUEST_THRESHOLD_SECS {
            if state.slow_queries.len() == MAX_SLOW_QUERIES {
                state.slow_queries.pop_front();
            }
            state.slow_queries.push_back(SlowQueryRecord {
                path: path.to_string(),
                method: method.to_string(),
                duration,
                timestamp,
            });
            warn!("Slow request: {} {} took {:.3}s", method, path, duration);
        }
    }

    pub async fn get_stats(&self) -> PerformanceStats {
        let state = self.state.read().await;

        if state.samples.is_empty() {
            return PerformanceStats::NoData {
                message: NO_REQUESTS_MESSAGE.to_string(),
            };
        }

        let total_duration: f64 = state.samples.iter().map(|s| s.duration).sum();
        let avg_response_time_ms = round_ms(total_duration / state.samples.len() as f64);

        let mut ranked: Vec<(&String, &EndpointStats)> = state.endpoints.iter().collect();
        // Stable sort: equal averages keep traversal order.
        ranked.sort_by(|a, b| {
            b.1.average_time()
                .partial_cmp(&a.1.average_time())
                .unwrap_or(Ordering::Equal)
        });

        let slowest_endpoints = ranked
            .into_iter()
            .take(TOP_ENDPOINTS)
            .map(|(endpoint, stats)| EndpointSummary {
                endpoint: endpoint.clone(),
                avg_time_ms: round_ms(stats.average_time()),
                requests: stats.count,
                errors: stats.errors,
            })
            .collect();

        let skip = state.slow_queries.len().saturating_sub(RECENT_SLOW_QUERIES);
        let recent_slow_queries = state.slow_queries.iter().skip(skip).cloned().collect();

        PerformanceStats::Summary(PerformanceSummary {
            total_requests: state.samples.len(),
            avg_response_time_ms,
            slowest_endpoints,
            recent_slow_queries,
        })
    }

    pub async fn endpoint_stats(&self, method: &str, path: &str) -> Option<EndpointStats> {
        let state = self.state.read().await;
        state.endpoints.peek(&format!("{} {}", method, path)).cloned()
    }

    pub async fn endpoint_count(&self) -> usize {
        self.state.read().await.endpoints.len()
    }

    pub async fn sample_count(&self) -> usize {
        self.state.read().await.samples.len()
    }

    pub async fn slow_query_count(&self) -> usize {
        self.state.read().await.slow_queries.len()
    }

    pub async fn reset(&self) {
        let mut state = self.state.write().await;
        *state = MonitorState::new(self.max_endpoints);
        debug!("Performance monitor reset");
    }
}

/// Seconds to milliseconds, rounded to two decimals.
fn round_ms(seconds: f64) -> f64 {
    (seconds * 1000.0 * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn test_fresh_monitor_reports_no_data() {
        let monitor = PerformanceMonitor::default();
        assert_matches!(
            monitor.get_stats().await,
            PerformanceStats::NoData { message } if message == NO_REQUESTS_MESSAGE
        );
    }

    #[tokio::test]
    async fn test_sample_buffer_is_bounded() {
        let monitor = PerformanceMonitor::new(5);
        for i in 0..(MAX_RECENT_SAMPLES + 250) {
            monitor
                .record_request(&format!("/api/games/{}", i % 7), "GET", 0.01, 200)
                .await;
        }
        assert_eq!(monitor.sample_count().await, MAX_RECENT_SAMPLES);
        assert!(monitor.endpoint_count().await <= 5);
    }

    #[tokio::test]
    async fn test_slow_query_buffer_is_bounded_and_fifo() {
        let monitor = PerformanceMonitor::default();
        for i in 0..(MAX_SLOW_QUERIES + 5) {
            monitor.record_request(&format!("/slow/{}", i), "GET", 2.5, 200).await;
        }
        assert_eq!(monitor.slow_query_count().await, MAX_SLOW_QUERIES);

        let stats = monitor.get_stats().await;
        let summary = stats.summary().unwrap();
        assert_eq!(summary.recent_slow_queries.len(), RECENT_SLOW_QUERIES);
        // Chronological: the newest record is last.
        let last = summary.recent_slow_queries.last().unwrap();
        assert_eq!(last.path, format!("/slow/{}", MAX_SLOW_QUERIES + 4));
        let first = summary.recent_slow_queries.first().unwrap();
        assert_eq!(first.path, format!("/slow/{}", MAX_SLOW_QUERIES - 5));
    }

    #[tokio::test]
    async fn test_threshold_is_strictly_greater_than_two_seconds() {
        let monitor = PerformanceMonitor::default();
        monitor.record_request("/api/edge", "GET", 2.0, 200).await;
        assert_eq!(monitor.slow_query_count().await, 0);

        monitor.record_request("/api/edge", "GET", 2.0001, 200).await;
        assert_eq!(monitor.slow_query_count().await, 1);
    }

    #[tokio::test]
    async fn test_error_counter_only_counts_4xx_and_5xx() {
        let monitor = PerformanceMonitor::default();
        monitor.record_request("/api/games", "GET", 0.1, 200).await;
        monitor.record_request("/api/games", "GET", 0.1, 399).await;
        monitor.record_request("/api/games", "GET", 0.1, 400).await;
        monitor.record_request("/api/games", "GET", 0.1, 503).await;
        monitor.record_request("/api/other", "GET", 0.1, 404).await;

        let games = monitor.endpoint_stats("GET", "/api/games").await.unwrap();
        assert_eq!(games.count, 4);
        assert_eq!(games.errors, 2);

        let other = monitor.endpoint_stats("GET", "/api/other").await.unwrap();
        assert_eq!(other.errors, 1);
    }

    #[tokio::test]
    async fn test_touching_an_endpoint_protects_it_from_eviction() {
        let monitor = PerformanceMonitor::new(3);
        monitor.record_request("/a", "GET", 0.1, 200).await;
        monitor.record_request("/b", "GET", 0.1, 200).await;
        monitor.record_request("/c", "GET", 0.1, 200).await;
        // `/a` becomes most recently updated, so `/b` is now the LRU key.
        monitor.record_request("/a", "GET", 0.1, 200).await;
        monitor.record_request("/d", "GET", 0.1, 200).await;

        assert!(monitor.endpoint_stats("GET", "/a").await.is_some());
        assert!(monitor.endpoint_stats("GET", "/b").await.is_none());
        assert!(monitor.endpoint_stats("GET", "/c").await.is_some());
        assert!(monitor.endpoint_stats("GET", "/d").await.is_some());
    }

    #[tokio::test]
    async fn test_method_is_part_of_endpoint_key() {
        let monitor = PerformanceMonitor::default();
        monitor.record_request("/api/games", "GET", 0.1, 200).await;
        monitor.record_request("/api/games", "POST", 0.2, 201).await;
        assert_eq!(monitor.endpoint_count().await, 2);
    }

    #[tokio::test]
    async fn test_stats_rank_endpoints_by_average_time() {
        let monitor = PerformanceMonitor::default();
        monitor.record_request("/fast", "GET", 0.010, 200).await;
        monitor.record_request("/slow", "GET", 0.500, 200).await;
        monitor.record_request("/medium", "GET", 0.100, 200).await;
        monitor.record_request("/medium", "GET", 0.300, 200).await;

        let stats = monitor.get_stats().await;
        let summary = stats.summary().unwrap();
        assert_eq!(summary.total_requests, 4);
        assert_eq!(summary.avg_response_time_ms, 227.5);

        let order: Vec<&str> = summary
            .slowest_endpoints
            .iter()
            .map(|e| e.endpoint.as_str())
            .collect();
        assert_eq!(order, vec!["GET /slow", "GET /medium", "GET /fast"]);
        assert_eq!(summary.slowest_endpoints[1].avg_time_ms, 200.0);
        assert_eq!(summary.slowest_endpoints[1].requests, 2);
    }

    #[tokio::test]
    async fn test_top_endpoints_capped_at_ten() {
        let monitor = PerformanceMonitor::default();
        for i in 0..15 {
            monitor.record_request(&format!("/e/{}", i), "GET", 0.01 * i as f64, 200).await;
        }
        let stats = monitor.get_stats().await;
        assert_eq!(stats.summary().unwrap().slowest_endpoints.len(), TOP_ENDPOINTS);
        assert_eq!(stats.summary().unwrap().slowest_endpoints[0].endpoint, "GET /e/14");
    }

    #[tokio::test]
    async fn test_reset_clears_everything() {
        let monitor = PerformanceMonitor::default();
        monitor.record_request("/api/slow", "GET", 3.0, 500).await;
        monitor.reset().await;
        assert_eq!(monitor.endpoint_count().await, 0);
        assert_eq!(monitor.slow_query_count().await, 0);
        assert_matches!(monitor.get_stats().await, PerformanceStats::NoData { .. });
    }

    #[test]
    fn test_zero_max_endpoints_is_clamped() {
        let monitor = PerformanceMonitor::new(0);
        assert_eq!(monitor.max_endpoints(), 1);
    }

    #[test]
    fn test_round_ms() {
        assert_eq!(round_ms(0.0123456), 12.35);
        assert_eq!(round_ms(3.0), 3000.0);
    }
}
