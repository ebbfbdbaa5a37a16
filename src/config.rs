//! Configuration file parser for ~/.config/pixfeed/config.toml.
//!
//! The config file is optional. A missing file yields `Config::default()`.
//! Unknown keys are accepted by serde but logged, since they are usually typos.
use crate::feed::FeedSettings;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid value for '{key}': {reason}")]
    Invalid { key: &'static str, reason: String },
}

// ============================================================================
// Configuration
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the feed server (http or https).
    pub server_url: String,

    /// Path of the real-time WebSocket endpoint on the same host.
    pub ws_path: String,

    /// Posts requested per page. The server caps this at 50.
    pub page_size: u32,

    /// Quiet period before a search term is applied.
    pub debounce_ms: u64,

    /// Fixed delay between channel reconnect attempts.
    pub reconnect_delay_secs: u64,

    /// How long a transient notice stays on screen.
    pub notice_secs: u64,

    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8080".to_string(),
            ws_path: "/ws".to_string(),
            page_size: 10,
            debounce_ms: 300,
            reconnect_delay_secs: 3,
            notice_secs: 3,
            request_timeout_secs: 30,
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Largest page the server will serve.
    pub const MAX_PAGE_SIZE: u32 = 50;

    const KNOWN_KEYS: [&'static str; 7] = [
        "server_url",
        "ws_path",
        "page_size",
        "debounce_ms",
        "reconnect_delay_secs",
        "notice_secs",
        "request_timeout_secs",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing or empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Out-of-range values → `Err(ConfigError::Invalid)`
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        Self::parse(&content, path)
    }

    fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        config.validate()?;
        tracing::info!(
            path = %path.display(),
            server = %config.server_url,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Apply the server URL resolved from CLI flag or environment.
    pub fn with_server_override(mut self, server: Option<String>) -> Self {
        if let Some(server) = server.filter(|s| !s.trim().is_empty()) {
            tracing::debug!(server = %server, "Server URL overridden");
            self.server_url = server.trim().to_string();
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 || self.page_size > Self::MAX_PAGE_SIZE {
            return Err(ConfigError::Invalid {
                key: "page_size",
                reason: format!("must be between 1 and {}", Self::MAX_PAGE_SIZE),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "request_timeout_secs",
                reason: "must be greater than 0".to_string(),
            });
        }
        // Reconnects never back off, so a zero delay would spin against a dead server
        if self.reconnect_delay_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "reconnect_delay_secs",
                reason: "must be greater than 0".to_string(),
            });
        }
        if !self.ws_path.starts_with('/') {
            return Err(ConfigError::Invalid {
                key: "ws_path",
                reason: "must start with '/'".to_string(),
            });
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn feed_settings(&self) -> FeedSettings {
        FeedSettings {
            page_size: self.page_size,
            debounce: Duration::from_millis(self.debounce_ms),
            reconnect_delay: Duration::from_secs(self.reconnect_delay_secs),
            notice_ttl: Duration::from_secs(self.notice_secs),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(name: &str, content: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("pixfeed_config_test_{name}"));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    fn cleanup(path: &Path) {
        if let Some(dir) = path.parent() {
            std::fs::remove_dir_all(dir).ok();
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server_url, "http://localhost:8080");
        assert_eq!(config.ws_path, "/ws");
        assert_eq!(config.page_size, 10);
        assert_eq!(config.debounce_ms, 300);
        assert_eq!(config.reconnect_delay_secs, 3);
        assert_eq!(config.notice_secs, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/pixfeed_test_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_whitespace_only_file_returns_default() {
        let path = write_config("whitespace", "   \n  \n  ");
        let config = Config::load(&path).unwrap();
        assert_eq!(config, Config::default());
        cleanup(&path);
    }

    #[test]
    fn test_partial_config_uses_defaults_for_missing() {
        let path = write_config("partial", "server_url = \"https://photos.example\"\n");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.server_url, "https://photos.example");
        assert_eq!(config.page_size, 10);
        cleanup(&path);
    }

    #[test]
    fn test_full_config() {
        let path = write_config(
            "full",
            r#"
server_url = "https://photos.example"
ws_path = "/live"
page_size = 25
debounce_ms = 150
reconnect_delay_secs = 5
notice_secs = 4
request_timeout_secs = 10
"#,
        );
        let config = Config::load(&path).unwrap();
        assert_eq!(config.ws_path, "/live");
        assert_eq!(config.page_size, 25);

        let settings = config.feed_settings();
        assert_eq!(settings.page_size, 25);
        assert_eq!(settings.debounce, Duration::from_millis(150));
        assert_eq!(settings.reconnect_delay, Duration::from_secs(5));
        assert_eq!(settings.notice_ttl, Duration::from_secs(4));
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        cleanup(&path);
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let path = write_config("invalid", "this is not [valid toml");
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));
        cleanup(&path);
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let path = write_config("unknown", "page_size = 12\ntheme = \"dark\"\n");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.page_size, 12);
        cleanup(&path);
    }

    #[test]
    fn test_page_size_out_of_range_rejected() {
        let path = write_config("page_zero", "page_size = 0\n");
        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::Invalid { key: "page_size", .. })
        ));
        cleanup(&path);

        let path = write_config("page_big", "page_size = 51\n");
        assert!(Config::load(&path).is_err());
        cleanup(&path);
    }

    #[test]
    fn test_zero_reconnect_delay_rejected() {
        let path = write_config("reconnect_zero", "reconnect_delay_secs = 0\n");
        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::Invalid {
                key: "reconnect_delay_secs",
                ..
            })
        ));
        cleanup(&path);

        let path = write_config("reconnect_one", "reconnect_delay_secs = 1\n");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.feed_settings().reconnect_delay, Duration::from_secs(1));
        cleanup(&path);
    }

    #[test]
    fn test_ws_path_must_be_absolute() {
        let path = write_config("ws_path", "ws_path = \"ws\"\n");
        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::Invalid { key: "ws_path", .. })
        ));
        cleanup(&path);
    }

    #[test]
    fn test_too_large_file_rejected() {
        let path = write_config("too_large", &"a".repeat(1_048_577));
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));
        assert!(err.to_string().contains("too large"));
        cleanup(&path);
    }

    #[test]
    fn test_server_override_wins_over_file() {
        let config = Config::default().with_server_override(Some("http://other:9000".into()));
        assert_eq!(config.server_url, "http://other:9000");

        let config = Config::default().with_server_override(Some("  ".into()));
        assert_eq!(config.server_url, "http://localhost:8080");

        let config = Config::default().with_server_override(None);
        assert_eq!(config.server_url, "http://localhost:8080");
    }
}
