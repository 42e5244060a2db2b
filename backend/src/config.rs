//! Service configuration.
//!
//! Settings are read from a TOML file and then overridden by environment
//! variables. Every section and field has a default, so an empty file (or no
//! file at all) yields a runnable local configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "TRIP_QUALITY_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {message}")]
    Read { path: String, message: String },

    #[error("Failed to parse config file: {0}")]
    Parse(String),

    #[error("Invalid value for {key}: {message}")]
    Invalid { key: String, message: String },
}

impl ConfigError {
    fn invalid(key: &str, message: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub workers: WorkerSettings,
    pub source: SourceSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerSettings {
    /// Comparison jobs allowed to run at once. Later submissions queue.
    pub max_concurrent_jobs: usize,
    /// Parallel detail fetches inside one job's update step.
    pub detail_fetch_concurrency: usize,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 16,
            detail_fetch_concurrency: 8,
        }
    }
}

/// Connection settings for the export and the trip detail API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    pub api_base_url: String,
    pub api_token: Option<String>,
    pub api_email: Option<String>,
    pub api_password: Option<String>,
    pub export_url: String,
    pub export_secret: Option<String>,
    /// Only export events with this name are read.
    pub export_event: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            api_base_url: String::new(),
            api_token: None,
            api_email: None,
            api_password: None,
            export_url: "https://data.mixpanel.com/api/2.0/export".to_string(),
            export_secret: None,
            export_event: None,
            request_timeout_secs: 30,
        }
    }
}

fn parse_number<T: FromStr>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::invalid(key, format!("'{}': {}", raw, e)))
}

fn non_empty(raw: String) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load from the first config file found, or defaults when none exists.
    ///
    /// Searches, in order:
    /// 1. the path in `TRIP_QUALITY_CONFIG` (must exist when set)
    /// 2. `trip-quality.toml`
    /// 3. `backend/trip-quality.toml`
    /// 4. `../trip-quality.toml`
    pub fn from_default_location() -> Result<Self, ConfigError> {
        if let Some(explicit) = std::env::var(CONFIG_PATH_ENV).ok().and_then(non_empty) {
            return Self::from_file(explicit);
        }

        let search_paths = [
            PathBuf::from("trip-quality.toml"),
            PathBuf::from("backend/trip-quality.toml"),
            PathBuf::from("../trip-quality.toml"),
        ];
        for path in search_paths {
            if path.exists() {
                log::info!("Loading configuration from {}", path.display());
                return Self::from_file(&path);
            }
        }

        log::info!("No trip-quality.toml found, using defaults");
        Ok(Self::default())
    }

    /// File (or defaults), then process environment, then validation.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_default_location()?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup. Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).and_then(non_empty);

        if let Some(v) = get("HOST") {
            self.server.host = v;
        }
        if let Some(v) = get("PORT") {
            self.server.port = parse_number("PORT", &v)?;
        }
        if let Some(v) = get("MAX_CONCURRENT_JOBS") {
            self.workers.max_concurrent_jobs = parse_number("MAX_CONCURRENT_JOBS", &v)?;
        }
        if let Some(v) = get("DETAIL_FETCH_CONCURRENCY") {
            self.workers.detail_fetch_concurrency = parse_number("DETAIL_FETCH_CONCURRENCY", &v)?;
        }
        if let Some(v) = get("TRIP_API_BASE_URL") {
            self.source.api_base_url = v;
        }
        if let Some(v) = get("TRIP_API_TOKEN") {
            self.source.api_token = Some(v);
        }
        if let Some(v) = get("TRIP_API_EMAIL") {
            self.source.api_email = Some(v);
        }
        if let Some(v) = get("TRIP_API_PASSWORD") {
            self.source.api_password = Some(v);
        }
        if let Some(v) = get("EXPORT_URL") {
            self.source.export_url = v;
        }
        if let Some(v) = get("EXPORT_SECRET") {
            self.source.export_secret = Some(v);
        }
        if let Some(v) = get("EXPORT_EVENT") {
            self.source.export_event = Some(v);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers.max_concurrent_jobs == 0 {
            return Err(ConfigError::invalid(
                "workers.max_concurrent_jobs",
                "must be at least 1",
            ));
        }
        if self.workers.detail_fetch_concurrency == 0 {
            return Err(ConfigError::invalid(
                "workers.detail_fetch_concurrency",
                "must be at least 1",
            ));
        }
        if self.source.request_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "source.request_timeout_secs",
                "must be at least 1",
            ));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
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
    fn test_empty_file_gives_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.workers.max_concurrent_jobs, 16);
        assert_eq!(config.source.request_timeout_secs, 30);
    }

    #[test]
    fn test_partial_sections() {
        let toml = r#"
[workers]
detail_fetch_concurrency = 4

[source]
api_base_url = "https://api.example.test"
export_event = "trip_completed"
"#;
        let config = AppConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.workers.detail_fetch_concurrency, 4);
        assert_eq!(config.workers.max_concurrent_jobs, 16);
        assert_eq!(config.source.api_base_url, "https://api.example.test");
        assert_eq!(config.source.export_event.as_deref(), Some("trip_completed"));
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let err = AppConfig::from_toml_str("[server\nport = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_overrides_win_over_file() {
        let mut config = AppConfig::from_toml_str("[server]\nport = 9000").unwrap();
        config
            .apply_overrides(lookup(&[
                ("PORT", "7070"),
                ("HOST", "127.0.0.1"),
                ("EXPORT_SECRET", "s3cret"),
                ("TRIP_API_TOKEN", "  "),
            ]))
            .unwrap();
        assert_eq!(config.bind_address(), "127.0.0.1:7070");
        assert_eq!(config.source.export_secret.as_deref(), Some("s3cret"));
        assert_eq!(config.source.api_token, None);
    }

    #[test]
    fn test_bad_number_override_is_invalid() {
        let mut config = AppConfig::default();
        let err = config
            .apply_overrides(lookup(&[("MAX_CONCURRENT_JOBS", "lots")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "MAX_CONCURRENT_JOBS"));
    }

    #[test]
    fn test_zero_pool_is_invalid() {
        let mut config = AppConfig::default();
        config.workers.max_concurrent_jobs = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.workers.detail_fetch_concurrency = 0;
        assert!(config.validate().is_err());
    }
}
