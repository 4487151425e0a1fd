//! Client configuration: where the classifier lives and how hard to hit it.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

/// Environment variable overriding [`ClientConfig::api_url`].
pub const API_URL_ENV: &str = "WASTEMON_API_URL";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the classification service; requests go to `<api_url>/classify`.
    pub api_url: String,
    /// Upper bound on simultaneous classification requests.
    pub max_concurrent_requests: usize,
    /// Per-request timeout. No timeout when unset.
    pub request_timeout_secs: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:8000".to_string(),
            max_concurrent_requests: 4,
            request_timeout_secs: None,
        }
    }
}

impl ClientConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, falling back to defaults when the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(raw) => Self::from_toml_str(&raw),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        self.validate()?;
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let raw = toml::to_string_pretty(self)?;
        fs::write(path, raw).map_err(io_err)
    }

    /// Apply `WASTEMON_API_URL` when it is set.
    pub fn with_env_overrides(self) -> Self {
        self.with_api_url_override(std::env::var(API_URL_ENV).ok())
    }

    pub fn with_api_url_override(mut self, api_url: Option<String>) -> Self {
        if let Some(url) = api_url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty()) {
            self.api_url = url;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.api_url.trim();
        if url.is_empty() {
            return Err(ConfigError::Invalid("api_url must not be empty".to_string()));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "api_url must start with http:// or https://, got {url}"
            )));
        }
        if self.max_concurrent_requests == 0 {
            return Err(ConfigError::Invalid(
                "max_concurrent_requests must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn classify_endpoint(&self) -> String {
        format!("{}/classify", self.api_url.trim().trim_end_matches('/'))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use rstest::rstest;
    use tempfile::tempdir;

    #[test]
    fn missing_keys_fall_back_to_defaults() -> Result<()> {
        let config = ClientConfig::from_toml_str(r#"api_url = "https://waste.example""#)?;
        assert_eq!(config.api_url, "https://waste.example");
        assert_eq!(config.max_concurrent_requests, 4);
        assert_eq!(config.request_timeout(), None);
        Ok(())
    }

    #[test]
    fn full_file_is_parsed() -> Result<()> {
        let config = ClientConfig::from_toml_str(
            "api_url = \"http://10.0.0.5:5000\"\nmax_concurrent_requests = 2\nrequest_timeout_secs = 30\n",
        )?;
        assert_eq!(config.max_concurrent_requests, 2);
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.classify_endpoint(), "http://10.0.0.5:5000/classify");
        Ok(())
    }

    #[rstest]
    #[case(r#"api_url = """#)]
    #[case(r#"api_url = "ftp://waste.example""#)]
    #[case("max_concurrent_requests = 0")]
    fn invalid_values_are_rejected(#[case] raw: &str) {
        assert!(matches!(
            ClientConfig::from_toml_str(raw),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn garbage_is_a_parse_error() {
        assert!(matches!(
            ClientConfig::from_toml_str("api_url = ["),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn override_replaces_url_unless_blank() {
        let config = ClientConfig::default().with_api_url_override(Some("  ".to_string()));
        assert_eq!(config.api_url, ClientConfig::default().api_url);
        let config = config.with_api_url_override(Some("https://override.example/".to_string()));
        assert_eq!(config.classify_endpoint(), "https://override.example/classify");
    }

    #[test]
    fn load_missing_file_gives_defaults() -> Result<()> {
        let dir = tempdir()?;
        let config = ClientConfig::load(dir.path().join("config.toml"))?;
        assert_eq!(config, ClientConfig::default());
        Ok(())
    }

    #[test]
    fn saved_config_loads_back() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join("config.toml");
        let config = ClientConfig {
            api_url: "https://waste.example".to_string(),
            max_concurrent_requests: 8,
            request_timeout_secs: Some(15),
        };
        config.save(&path)?;
        assert_eq!(ClientConfig::load(&path)?, config);
        Ok(())
    }
}
