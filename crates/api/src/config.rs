//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use slot_fill::FillConfig;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `json` for JSON lines, anything else for human output
/// - `DATABASE_URL`: PostgreSQL URL; the in-memory store is used when unset
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: `10`)
/// - `WAITLIST_*`: engine overrides, see [`Config::fill_from_env`]
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub fill: FillConfig,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parsed(&lookup, "PORT").unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: match lookup("LOG_FORMAT").as_deref() {
                Some(f) if f.eq_ignore_ascii_case("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            database_max_connections: parsed(&lookup, "DATABASE_MAX_CONNECTIONS")
                .unwrap_or(defaults.database_max_connections),
            fill: Self::fill_from_env(&lookup),
        }
    }

    /// Builds the engine configuration from `WAITLIST_*` variables.
    ///
    /// Unparseable values are ignored and the default kept.
    pub fn fill_from_env(lookup: &impl Fn(&str) -> Option<String>) -> FillConfig {
        let mut fill = FillConfig::default();
        if let Some(days) = parsed(lookup, "WAITLIST_MAX_DATE_SKEW_DAYS") {
            fill.max_date_skew_days = days;
        }
        if let Some(n) = parsed(lookup, "WAITLIST_MAX_CANDIDATES") {
            fill.max_candidates = n;
        }
        if let Some(minutes) = parsed::<u64>(lookup, "WAITLIST_MIN_RESPONSE_WINDOW_MINUTES") {
            fill.min_response_window = Duration::from_secs(minutes * 60);
        }
        if let Some(minutes) = parsed::<u64>(lookup, "WAITLIST_MAX_RESPONSE_WINDOW_MINUTES") {
            fill.max_response_window = Duration::from_secs(minutes * 60);
        }
        if let Some(secs) = parsed(lookup, "WAITLIST_SWEEP_INTERVAL_SECONDS") {
            fill.sweep_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = parsed(lookup, "WAITLIST_BOOKING_TIMEOUT_SECONDS") {
            fill.booking_timeout = Duration::from_secs(secs);
        }
        if let Some(honor) = parsed(lookup, "WAITLIST_HONOR_TIME_PREFERENCE") {
            fill.honor_time_preference = honor;
        }
        if let Some(code) = lookup("WAITLIST_DEFAULT_COUNTRY_CODE") {
            fill.default_country_code = code;
        }
        fill
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            database_url: None,
            database_max_connections: 10,
            fill: FillConfig::default(),
        }
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            eprintln!("ignoring invalid {key}={raw:?}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.database_url.is_none());
        assert_eq!(config.fill, FillConfig::default());
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_reads_server_variables() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "8081"),
            ("LOG_FORMAT", "JSON"),
            ("DATABASE_URL", "postgres://localhost/waitlist"),
            ("DATABASE_MAX_CONNECTIONS", "4"),
        ]));
        assert_eq!(config.port, 8081);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/waitlist")
        );
        assert_eq!(config.database_max_connections, 4);
    }

    #[test]
    fn test_reads_engine_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("WAITLIST_MAX_DATE_SKEW_DAYS", "5"),
            ("WAITLIST_MAX_CANDIDATES", "3"),
            ("WAITLIST_MIN_RESPONSE_WINDOW_MINUTES", "30"),
            ("WAITLIST_MAX_RESPONSE_WINDOW_MINUTES", "120"),
            ("WAITLIST_SWEEP_INTERVAL_SECONDS", "60"),
            ("WAITLIST_BOOKING_TIMEOUT_SECONDS", "3"),
            ("WAITLIST_HONOR_TIME_PREFERENCE", "true"),
            ("WAITLIST_DEFAULT_COUNTRY_CODE", "44"),
        ]));
        let fill = config.fill;
        assert_eq!(fill.max_date_skew_days, 5);
        assert_eq!(fill.max_candidates, 3);
        assert_eq!(fill.min_response_window, Duration::from_secs(30 * 60));
        assert_eq!(fill.max_response_window, Duration::from_secs(120 * 60));
        assert_eq!(fill.sweep_interval, Duration::from_secs(60));
        assert_eq!(fill.booking_timeout, Duration::from_secs(3));
        assert!(fill.honor_time_preference);
        assert_eq!(fill.default_country_code, "44");
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "not-a-port"),
            ("WAITLIST_MAX_CANDIDATES", "-1"),
            ("DATABASE_URL", ""),
        ]));
        assert_eq!(config.port, 3000);
        assert_eq!(config.fill.max_candidates, 10);
        assert!(config.database_url.is_none());
    }
}
