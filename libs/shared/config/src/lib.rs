use std::env;
use std::str::FromStr;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub admin_token: String,
    pub perf_max_endpoints: usize,
    pub cache_max_entries: usize,
    pub cache_cleanup_interval: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            admin_token: String::new(),
            perf_max_endpoints: 100,
            cache_max_entries: 10_000,
            cache_cleanup_interval: 100,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            port: parse_or("PORT", defaults.port),
            admin_token: env::var("ADMIN_TOKEN")
                .unwrap_or_else(|_| {
                    warn!("ADMIN_TOKEN not set, admin routes will reject every request");
                    String::new()
                }),
            perf_max_endpoints: parse_or("PERF_MAX_ENDPOINTS", defaults.perf_max_endpoints),
            cache_max_entries: parse_or("CACHE_MAX_ENTRIES", defaults.cache_max_entries),
            cache_cleanup_interval: parse_or("CACHE_CLEANUP_INTERVAL", defaults.cache_cleanup_interval),
        };

        if !config.is_admin_configured() {
            warn!("Admin access not configured - missing ADMIN_TOKEN");
        }

        config
    }

    pub fn is_admin_configured(&self) -> bool {
        !self.admin_token.is_empty()
    }
}

fn parse_or<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display + Copy,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = AppConfig::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.perf_max_endpoints, 100);
        assert_eq!(config.cache_max_entries, 10_000);
        assert_eq!(config.cache_cleanup_interval, 100);
        assert!(!config.is_admin_configured());
    }

    #[test]
    fn test_parse_or_falls_back_on_missing_key() {
        let value: usize = parse_or("BOARDGAME_TEST_UNSET_KEY_9f3a", 42);
        assert_eq!(value, 42);
    }
}
