use std::time::Duration;

use crate::error::{TransferError, TransferResult};

/// Project whose BigQuery jobs are created.
pub const ENV_PROJECT: &str = "GOOGLE_CLOUD_PROJECT";
/// OAuth2 bearer token supplied by the ambient environment (e.g. `gcloud auth print-access-token`).
pub const ENV_ACCESS_TOKEN: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";
/// Base URL override for a storage emulator.
pub const ENV_STORAGE_ENDPOINT: &str = "STORAGE_EMULATOR_HOST";
/// Base URL override for a BigQuery emulator.
pub const ENV_BIGQUERY_ENDPOINT: &str = "BIGQUERY_EMULATOR_HOST";
/// Load-job polling interval in milliseconds.
pub const ENV_POLL_INTERVAL_MS: &str = "BIGQUERY_POLL_INTERVAL_MS";

pub const DEFAULT_STORAGE_ENDPOINT: &str = "https://storage.googleapis.com";
pub const DEFAULT_BIGQUERY_ENDPOINT: &str = "https://bigquery.googleapis.com";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Connection settings for [`super::GcsClient`] and [`super::BigQueryClient`].
#[derive(Clone, PartialEq, Eq)]
pub struct GcpConfig {
    pub project_id: String,
    pub access_token: String,
    pub storage_endpoint: String,
    pub bigquery_endpoint: String,
    pub poll_interval: Duration,
}

impl std::fmt::Debug for GcpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GcpConfig")
            .field("project_id", &self.project_id)
            .field("access_token", &"<redacted>")
            .field("storage_endpoint", &self.storage_endpoint)
            .field("bigquery_endpoint", &self.bigquery_endpoint)
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

impl GcpConfig {
    pub fn new(project_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            access_token: access_token.into(),
            storage_endpoint: DEFAULT_STORAGE_ENDPOINT.to_string(),
            bigquery_endpoint: DEFAULT_BIGQUERY_ENDPOINT.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Read settings from the process environment.
    pub fn from_env() -> TransferResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`, which returns the value of a variable if set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> TransferResult<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| TransferError::Config {
                    message: format!("{key} environment variable required"),
                })
        };

        let mut config = Self::new(required(ENV_PROJECT)?, required(ENV_ACCESS_TOKEN)?);
        if let Some(endpoint) = lookup(ENV_STORAGE_ENDPOINT) {
            config.storage_endpoint = with_scheme(&endpoint);
        }
        if let Some(endpoint) = lookup(ENV_BIGQUERY_ENDPOINT) {
            config.bigquery_endpoint = with_scheme(&endpoint);
        }
        if let Some(ms) = lookup(ENV_POLL_INTERVAL_MS) {
            let ms: u64 = ms.trim().parse().map_err(|_| TransferError::Config {
                message: format!("{ENV_POLL_INTERVAL_MS} must be an integer, got '{ms}'"),
            })?;
            config.poll_interval = Duration::from_millis(ms);
        }
        Ok(config)
    }
}

// Emulator hosts are often given as bare `host:port`.
fn with_scheme(endpoint: &str) -> String {
    let trimmed = endpoint.trim().trim_end_matches('/');
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn requires_project_and_token() {
        let err = GcpConfig::from_lookup(lookup(&[(ENV_PROJECT, "p")])).unwrap_err();
        assert!(err.to_string().contains(ENV_ACCESS_TOKEN));
    }

    #[test]
    fn applies_overrides() {
        let config = GcpConfig::from_lookup(lookup(&[
            (ENV_PROJECT, "p"),
            (ENV_ACCESS_TOKEN, "t"),
            (ENV_STORAGE_ENDPOINT, "localhost:4443"),
            (ENV_POLL_INTERVAL_MS, "250"),
        ]))
        .unwrap();
        assert_eq!(config.storage_endpoint, "http://localhost:4443");
        assert_eq!(config.bigquery_endpoint, DEFAULT_BIGQUERY_ENDPOINT);
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert!(!format!("{config:?}").contains("\"t\""));
    }
}
