//! Configuration Module
//!
//! Handles loading and managing proxy configuration from environment variables.

use std::env;
use std::path::PathBuf;

use url::Url;

use crate::error::{ProxyError, Result};

/// Default upstream application origin
pub const DEFAULT_UPSTREAM_URL: &str = "http://127.0.0.1:8080/";

/// Default namespace prefix for cache generations
pub const DEFAULT_CACHE_PREFIX: &str = "product-manager-";

/// Default generation version, bumped by the operator on each deploy
pub const DEFAULT_CACHE_VERSION: &str = "v1";

/// Default plain-text body served when neither cache nor network can answer
pub const DEFAULT_OFFLINE_NOTICE: &str = "The application is running in offline mode";

/// Proxy configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Base location of the application; manifest entries resolve against it
    pub upstream_url: String,
    /// Namespace prefix shared by every generation of this application
    pub cache_prefix: String,
    /// Version suffix of the current generation
    pub cache_version: String,
    /// Optional JSON manifest file; the built-in list is used when unset
    pub manifest_path: Option<PathBuf>,
    /// Optional directory for persistent storage; in-memory when unset
    pub cache_dir: Option<PathBuf>,
    /// Body of the synthetic offline response
    pub offline_notice: String,
    /// Largest request body accepted for forwarding
    pub max_body_bytes: usize,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `UPSTREAM_URL` - Application base location (default: http://127.0.0.1:8080/)
    /// - `CACHE_PREFIX` - Generation namespace prefix (default: product-manager-)
    /// - `CACHE_VERSION` - Current generation version (default: v1)
    /// - `MANIFEST_PATH` - JSON array of resources to pre-cache (optional)
    /// - `CACHE_DIR` - Directory for persistent generations (optional)
    /// - `OFFLINE_NOTICE` - Offline fallback text
    /// - `MAX_BODY_BYTES` - Request body limit (default: 10 MiB)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.server_port),
            upstream_url: env::var("UPSTREAM_URL").unwrap_or(defaults.upstream_url),
            cache_prefix: env::var("CACHE_PREFIX").unwrap_or(defaults.cache_prefix),
            cache_version: env::var("CACHE_VERSION").unwrap_or(defaults.cache_version),
            manifest_path: env::var("MANIFEST_PATH").ok().map(PathBuf::from),
            cache_dir: env::var("CACHE_DIR").ok().map(PathBuf::from),
            offline_notice: env::var("OFFLINE_NOTICE").unwrap_or(defaults.offline_notice),
            max_body_bytes: env::var("MAX_BODY_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_body_bytes),
        }
    }

    /// Rejects settings that would break generation isolation.
    ///
    /// An empty prefix puts every cache in the storage area inside this
    /// application's namespace, so activation would delete all of them.
    pub fn validate(&self) -> Result<()> {
        if self.cache_prefix.trim().is_empty() {
            return Err(ProxyError::Config(
                "CACHE_PREFIX must not be empty".to_string(),
            ));
        }
        if self.cache_version.trim().is_empty() {
            return Err(ProxyError::Config(
                "CACHE_VERSION must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Parses the upstream location, forcing a trailing slash so that
    /// relative manifest entries resolve inside it rather than beside it.
    pub fn base_url(&self) -> Result<Url> {
        let mut raw = self.upstream_url.clone();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        Url::parse(&raw)
            .map_err(|e| ProxyError::Config(format!("invalid UPSTREAM_URL '{}': {}", raw, e)))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            upstream_url: DEFAULT_UPSTREAM_URL.to_string(),
            cache_prefix: DEFAULT_CACHE_PREFIX.to_string(),
            cache_version: DEFAULT_CACHE_VERSION.to_string(),
            manifest_path: None,
            cache_dir: None,
            offline_notice: DEFAULT_OFFLINE_NOTICE.to_string(),
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.cache_prefix, "product-manager-");
        assert_eq!(config.cache_version, "v1");
        assert!(config.manifest_path.is_none());
        assert!(config.cache_dir.is_none());
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("SERVER_PORT");
        env::remove_var("UPSTREAM_URL");
        env::remove_var("CACHE_PREFIX");
        env::remove_var("CACHE_VERSION");
        env::remove_var("MAX_BODY_BYTES");

        let config = Config::from_env();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.upstream_url, DEFAULT_UPSTREAM_URL);
        assert_eq!(config.cache_version, DEFAULT_CACHE_VERSION);
        assert_eq!(config.max_body_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_prefix() {
        for prefix in ["", "   "] {
            let config = Config {
                cache_prefix: prefix.to_string(),
                ..Config::default()
            };
            assert!(matches!(config.validate(), Err(ProxyError::Config(_))));
        }
    }

    #[test]
    fn test_validate_rejects_empty_version() {
        let config = Config {
            cache_version: String::new(),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ProxyError::Config(_))));
    }

    #[test]
    fn test_base_url_gains_trailing_slash() {
        let config = Config {
            upstream_url: "http://localhost:8080/app".to_string(),
            ..Config::default()
        };
        let base = config.base_url().unwrap();
        assert_eq!(base.as_str(), "http://localhost:8080/app/");
        assert_eq!(base.join("./manifest.json").unwrap().path(), "/app/manifest.json");
    }

    #[test]
    fn test_base_url_rejects_garbage() {
        let config = Config {
            upstream_url: "not a url".to_string(),
            ..Config::default()
        };
        assert!(matches!(config.base_url(), Err(ProxyError::Config(_))));
    }
}
