use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =====================================================================================
// MONITOR MODELS
// =====================================================================================

/// One completed request as seen by the monitor.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceSample {
    pub duration: f64,
    pub path: String,
    pub method: String,
    pub status_code: u16,
    pub timestamp: DateTime<Utc>,
}

/// Aggregate counters for a single `"METHOD path"` key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EndpointStats {
    pub count: u64,
    pub total_time: f64,
    pub errors: u64,
}

impl EndpointStats {
    pub fn average_time(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total_time / self.count as f64
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SlowQueryRecord {
    pub path: String,
    pub method: String,
    pub duration: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EndpointSummary {
    pub endpoint: String,
    pub avg_time_ms: f64,
    pub requests: u64,
    pub errors: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PerformanceSummary {
    pub total_requests: usize,
    pub avg_response_time_ms: f64,
    pub slowest_endpoints: Vec<EndpointSummary>,
    pub recent_slow_queries: Vec<SlowQueryRecord>,
}

/// Snapshot returned by the monitor; serializes either as the summary object
/// or as `{"message": ...}` before anything has been recorded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PerformanceStats {
    Summary(PerformanceSummary),
    NoData { message: String },
}

impl PerformanceStats {
    pub fn summary(&self) -> Option<&PerformanceSummary> {
        match self {
            PerformanceStats::Summary(summary) => Some(summary),
            PerformanceStats::NoData { .. } => None,
        }
    }
}

// =====================================================================================
// CACHE MODELS
// =====================================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheStats {
    pub total_entries: usize,
    pub oldest_entry_age_seconds: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheClearResponse {
    pub cleared_entries: usize,
}
