//! Runtime configuration from flags and environment.

use crate::client::{ClientConfig, DEFAULT_API_URL, DEFAULT_TOKEN_URL};
use axum::http::HeaderValue;
use clap::Args;
use reqwest::Url;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_CORS_ORIGIN: &str = "*";
pub const DEFAULT_TOKEN_BUFFER_MINUTES: u64 = 5;
pub const DEFAULT_FLIGHTS_CACHE_MINUTES: u64 = 5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("OPENSKY_CLIENT_ID and OPENSKY_CLIENT_SECRET must be set (or pass --anonymous)")]
    MissingCredentials,
    #[error("Invalid CORS origin: {0}")]
    InvalidCorsOrigin(String),
    #[error("Invalid {name} URL '{value}': {reason}")]
    InvalidUrl {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Args)]
pub struct Config {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT, global = true)]
    pub port: u16,

    /// Allowed CORS origin ("*" for any)
    #[arg(long, env = "CORS_ORIGIN", default_value = DEFAULT_CORS_ORIGIN, global = true)]
    pub cors_origin: String,

    /// OpenSky OAuth2 token endpoint
    #[arg(long, env = "OPENSKY_TOKEN_URL", default_value = DEFAULT_TOKEN_URL, global = true)]
    pub token_url: String,

    /// OpenSky states endpoint
    #[arg(long, env = "OPENSKY_API_URL", default_value = DEFAULT_API_URL, global = true)]
    pub api_url: String,

    /// OAuth2 client id
    #[arg(long, env = "OPENSKY_CLIENT_ID", global = true)]
    pub client_id: Option<String>,

    /// OAuth2 client secret
    #[arg(long, env = "OPENSKY_CLIENT_SECRET", hide_env_values = true, global = true)]
    pub client_secret: Option<String>,

    /// Minutes before expiry at which a token is refreshed
    #[arg(
        long,
        env = "TOKEN_CACHE_BUFFER_MINUTES",
        default_value_t = DEFAULT_TOKEN_BUFFER_MINUTES,
        global = true
    )]
    pub token_buffer_minutes: u64,

    /// Minutes a fetched flight list is served from cache
    #[arg(
        long,
        env = "FLIGHTS_CACHE_MINUTES",
        default_value_t = DEFAULT_FLIGHTS_CACHE_MINUTES,
        global = true
    )]
    pub flights_cache_minutes: u64,

    /// Run without credentials, using unauthenticated requests only
    #[arg(long, env = "OPENSKY_ANONYMOUS", global = true)]
    pub anonymous: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            cors_origin: DEFAULT_CORS_ORIGIN.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            client_id: None,
            client_secret: None,
            token_buffer_minutes: DEFAULT_TOKEN_BUFFER_MINUTES,
            flights_cache_minutes: DEFAULT_FLIGHTS_CACHE_MINUTES,
            anonymous: false,
        }
    }
}

/// Subset of the configuration echoed by `/health`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicConfig {
    pub port: u16,
    pub cors_origin: String,
    pub token_cache_buffer: u64,
    pub flights_cache: u64,
    pub anonymous: bool,
}

impl Config {
    pub fn with_credentials(mut self, client_id: &str, client_secret: &str) -> Self {
        self.client_id = Some(client_id.to_string());
        self.client_secret = Some(client_secret.to_string());
        self
    }

    pub fn with_urls(mut self, token_url: &str, api_url: &str) -> Self {
        self.token_url = token_url.to_string();
        self.api_url = api_url.to_string();
        self
    }

    pub fn with_anonymous(mut self, anonymous: bool) -> Self {
        self.anonymous = anonymous;
        self
    }

    /// Id and secret, when both are present and non-empty.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.client_id.as_deref(), self.client_secret.as_deref()) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => {
                Some((id, secret))
            }
            _ => None,
        }
    }

    pub fn token_buffer(&self) -> Duration {
        Duration::from_secs(self.token_buffer_minutes.saturating_mul(60))
    }

    pub fn flights_ttl(&self) -> Duration {
        Duration::from_secs(self.flights_cache_minutes.saturating_mul(60))
    }

    /// Check the configuration before anything is started.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.anonymous && self.credentials().is_none() {
            return Err(ConfigError::MissingCredentials);
        }

        if self.cors_origin != "*" && HeaderValue::from_str(&self.cors_origin).is_err() {
            return Err(ConfigError::InvalidCorsOrigin(self.cors_origin.clone()));
        }

        check_url("token", &self.token_url)?;
        check_url("API", &self.api_url)?;

        Ok(())
    }

    /// Client settings. Credentials are dropped in anonymous mode.
    pub fn client_config(&self) -> ClientConfig {
        let config = ClientConfig::new(&self.token_url, &self.api_url)
            .with_token_buffer(self.token_buffer());

        match self.credentials() {
            Some((id, secret)) if !self.anonymous => {
                config.with_credentials(id.to_string(), secret.to_string())
            }
            _ => config,
        }
    }

    pub fn public(&self) -> PublicConfig {
        PublicConfig {
            port: self.port,
            cors_origin: self.cors_origin.clone(),
            token_cache_buffer: self.token_buffer_minutes,
            flights_cache: self.flights_cache_minutes,
            anonymous: self.anonymous,
        }
    }

    pub fn log_summary(&self) {
        tracing::info!("Configuration loaded:");
        tracing::info!("  Port: {}", self.port);
        tracing::info!("  CORS Origin: {}", self.cors_origin);
        tracing::info!(
            "  Client ID: {}",
            self.client_id.as_deref().unwrap_or("(none)")
        );
        tracing::info!("  Anonymous: {}", self.anonymous);
        tracing::info!("  Token Cache Buffer: {} minutes", self.token_buffer_minutes);
        tracing::info!("  Flights Cache: {} minutes", self.flights_cache_minutes);
    }
}

fn check_url(name: &'static str, value: &str) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidUrl {
        name,
        value: value.to_string(),
        reason,
    };

    let url = Url::parse(value).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(invalid(format!("unsupported scheme '{scheme}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_credentials_rejected() {
        let err = Config::default().validate().unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredentials));

        let blank = Config::default().with_credentials("", "secret");
        assert!(blank.validate().is_err());
    }

    #[test]
    fn test_anonymous_mode_needs_no_credentials() {
        let config = Config::default().with_anonymous(true);
        assert!(config.validate().is_ok());
        assert!(config.client_config().credentials.is_none());
    }

    #[test]
    fn test_anonymous_mode_ignores_credentials() {
        let config = Config::default()
            .with_credentials("id", "secret")
            .with_anonymous(true);
        assert!(config.client_config().credentials.is_none());
    }

    #[test]
    fn test_client_config_carries_buffer_and_credentials() {
        let mut config = Config::default().with_credentials("id", "secret");
        config.token_buffer_minutes = 2;

        let client = config.client_config();
        assert_eq!(client.token_buffer, Duration::from_secs(120));
        assert_eq!(client.credentials.unwrap().client_id, "id");
        assert_eq!(config.flights_ttl(), Duration::from_secs(300));
    }

    #[test]
    fn test_huge_minute_values_saturate() {
        let mut config = Config::default().with_credentials("id", "secret");
        config.token_buffer_minutes = u64::MAX / 10;
        config.flights_cache_minutes = u64::MAX;

        assert_eq!(config.token_buffer(), Duration::from_secs(u64::MAX));
        assert_eq!(config.flights_ttl(), Duration::from_secs(u64::MAX));
        assert_eq!(config.client_config().token_buffer, Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_bad_url_rejected() {
        let config = Config::default()
            .with_credentials("id", "secret")
            .with_urls("not a url", DEFAULT_API_URL);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidUrl { name: "token", .. })
        ));

        let config = Config::default()
            .with_credentials("id", "secret")
            .with_urls(DEFAULT_TOKEN_URL, "ftp://opensky-network.org/states");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidUrl { name: "API", .. })
        ));
    }

    #[test]
    fn test_bad_cors_origin_rejected() {
        let mut config = Config::default().with_credentials("id", "secret");
        config.cors_origin = "http://bad\norigin".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidCorsOrigin(_))
        ));
    }

    #[test]
    fn test_public_config_omits_secret() {
        let config = Config::default().with_credentials("id", "hunter2");
        let json = serde_json::to_string(&config.public()).unwrap();
        assert!(!json.contains("hunter2"));
        assert!(json.contains("\"tokenCacheBuffer\":5"));
        assert!(json.contains("\"flightsCache\":5"));
    }
}
