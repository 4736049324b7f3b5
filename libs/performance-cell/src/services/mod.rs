pub mod cache;
pub mod clock;
pub mod monitor;

pub use cache::{CacheConfig, CacheKey, CachedQuery, QueryCache};
pub use clock::{Clock, SystemClock};
#[cfg(any(test, feature = "test-util"))]
pub use clock::ManualClock;
pub use monitor::PerformanceMonitor;
