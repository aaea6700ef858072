//! Package registry client.
//!
//! Queries an npm-compatible registry for a package's published metadata.
//! A missing package (HTTP 404) is the valid "never published" state; any
//! other failure is reported to the caller as an error.

use async_trait::async_trait;
use tracing::debug;

use crate::domain::error::{MonopubError, Result};
use crate::domain::package::RegistryInfo;

/// Capability: look up published metadata for a package by name.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// `Ok(None)` means the package has never been published.
    async fn package_info(&self, name: &str) -> Result<Option<RegistryInfo>>;
}

/// Registry client configuration.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Registry base URL.
    pub base_url: String,
    /// Bearer token for authenticated lookups (optional for public scopes).
    pub token: Option<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig {
            base_url: std::env::var("MONOPUB_REGISTRY")
                .unwrap_or_else(|_| "https://registry.npmjs.org".to_string()),
            token: std::env::var("NPM_TOKEN").ok(),
        }
    }
}

impl RegistryConfig {
    /// Create a config from environment variables.
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Create config for a specific registry.
    pub fn new(base_url: &str) -> Self {
        RegistryConfig {
            base_url: base_url.to_string(),
            token: None,
        }
    }

    /// Set the authentication token.
    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }
}

/// Production registry client over HTTP.
pub struct HttpRegistryClient {
    config: RegistryConfig,
    http_client: reqwest::Client,
}

impl HttpRegistryClient {
    pub fn new(config: RegistryConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("monopub/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(HttpRegistryClient {
            config,
            http_client,
        })
    }

    /// Create a client from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(RegistryConfig::from_env())
    }

    fn package_url(&self, name: &str) -> String {
        // Scoped names keep their '@' but the separating slash must be
        // encoded, per registry convention.
        let encoded = name.replace('/', "%2F");
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), encoded)
    }
}

#[async_trait]
impl RegistryClient for HttpRegistryClient {
    async fn package_info(&self, name: &str) -> Result<Option<RegistryInfo>> {
        let url = self.package_url(name);
        debug!(package = %name, url = %url, "registry lookup");

        let mut request = self.http_client.get(&url);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        match response.status() {
            status if status.is_success() => {
                let info: RegistryInfo = response.json().await?;
                Ok(Some(info))
            }
            reqwest::StatusCode::NOT_FOUND => Ok(None),
            status => Err(MonopubError::Registry(format!(
                "lookup of {name} returned status {status}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_url_plain() {
        let client = HttpRegistryClient::new(RegistryConfig::new("https://example.test")).unwrap();
        assert_eq!(client.package_url("pkg-a"), "https://example.test/pkg-a");
    }

    #[test]
    fn test_package_url_scoped() {
        let client = HttpRegistryClient::new(RegistryConfig::new("https://example.test/")).unwrap();
        assert_eq!(
            client.package_url("@scope/pkg-a"),
            "https://example.test/@scope%2Fpkg-a"
        );
    }

    #[test]
    fn test_config_with_token() {
        let config = RegistryConfig::new("https://example.test").with_token("secret");
        assert_eq!(config.token.as_deref(), Some("secret"));
    }
}
