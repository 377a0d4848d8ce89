/// Runtime configuration for the portal.
///
/// Settings come from `CAREBOOK_*` environment variables. Nothing here is
/// required: without an API URL the binary runs on the in-memory store.

use crate::error::PortalError;

/// Application-level constants
pub const APP_NAME: &str = "Carebook";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Request timeout for the REST store when none is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const ENV_API_URL: &str = "CAREBOOK_API_URL";
const ENV_TIMEOUT: &str = "CAREBOOK_TIMEOUT_SECS";
const ENV_LOG: &str = "CAREBOOK_LOG";

/// Default tracing filter when `RUST_LOG` is not set.
pub fn default_log_filter() -> String {
    std::env::var(ENV_LOG).unwrap_or_else(|_| "carebook=info".to_string())
}

/// Runtime settings for the portal binary.
#[derive(Debug, Clone, PartialEq)]
pub struct PortalConfig {
    /// Base URL of the portal backend. `None` runs against the in-memory store.
    pub api_url: Option<String>,
    pub timeout_secs: u64,
}

impl PortalConfig {
    pub fn from_env() -> Result<Self, PortalError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, PortalError> {
        let api_url = lookup(ENV_API_URL)
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());

        if let Some(url) = &api_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(PortalError::Config(format!("{ENV_API_URL} must be an http(s) URL, got '{url}'")));
            }
        }

        let timeout_secs = match lookup(ENV_TIMEOUT) {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(0) | Err(_) => {
                    return Err(PortalError::Config(format!(
                        "{ENV_TIMEOUT} must be a positive number of seconds, got '{raw}'"
                    )))
                }
                Ok(secs) => secs,
            },
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(PortalConfig { api_url, timeout_secs })
    }
}

impl Default for PortalConfig {
    fn default() -> Self {
        PortalConfig {
            api_url: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
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
    fn defaults_to_memory_store() {
        let config = PortalConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, PortalConfig::default());
    }

    #[test]
    fn api_url_trailing_slash_trimmed() {
        let config = PortalConfig::from_lookup(lookup(&[(ENV_API_URL, "http://localhost:5000/")])).unwrap();
        assert_eq!(config.api_url.as_deref(), Some("http://localhost:5000"));
    }

    #[test]
    fn blank_api_url_means_memory() {
        let config = PortalConfig::from_lookup(lookup(&[(ENV_API_URL, "  ")])).unwrap();
        assert_eq!(config.api_url, None);
    }

    #[test]
    fn rejects_non_http_url() {
        assert!(PortalConfig::from_lookup(lookup(&[(ENV_API_URL, "ftp://host")])).is_err());
    }

    #[test]
    fn rejects_bad_timeout() {
        assert!(PortalConfig::from_lookup(lookup(&[(ENV_TIMEOUT, "soon")])).is_err());
        assert!(PortalConfig::from_lookup(lookup(&[(ENV_TIMEOUT, "0")])).is_err());
        let config = PortalConfig::from_lookup(lookup(&[(ENV_TIMEOUT, "5")])).unwrap();
        assert_eq!(config.timeout_secs, 5);
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.1.0");
    }
}
