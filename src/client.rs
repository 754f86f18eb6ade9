//! HTTP client for the OpenSky Network API.

use crate::cache::{duration_ms, Clock, ExpiringCache, SystemClock};
use crate::protocol::{self, ParseError, TokenResponse};
use crate::retry::RetryPolicy;
use crate::types::Flight;
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT},
    Client, StatusCode,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

pub const DEFAULT_TOKEN_URL: &str =
    "https://auth.opensky-network.org/auth/realms/opensky-network/protocol/openid-connect/token";
pub const DEFAULT_API_URL: &str = "https://opensky-network.org/api/states/all";

const TOKEN_KEY: &str = "access_token";
const RATE_LIMIT_REMAINING: &str = "x-rate-limit-remaining";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Request timed out after {after:?}")]
    Timeout { after: Duration },
    #[error("Token request failed: {status}")]
    TokenRequest { status: StatusCode },
    #[error("Flights request failed: {status}")]
    FlightsRequest { status: StatusCode },
    #[error("Failed after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
    #[error("OpenSky client credentials are not configured")]
    MissingCredentials,
    #[error("Invalid response: {0}")]
    Parse(#[from] ParseError),
}

impl ClientError {
    /// Upstream refused our bearer token.
    pub fn is_auth_rejection(&self) -> bool {
        matches!(
            self,
            Self::FlightsRequest { status }
                if *status == StatusCode::UNAUTHORIZED || *status == StatusCode::FORBIDDEN
        )
    }
}

/// OAuth2 client-credentials pair.
#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Configuration for the OpenSky client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// OAuth2 token endpoint
    pub token_url: String,
    /// States endpoint
    pub api_url: String,
    /// `None` runs unauthenticated only
    pub credentials: Option<Credentials>,
    /// Subtracted from the token lifetime so it is refreshed early
    pub token_buffer: Duration,
    pub token_retry: RetryPolicy,
    pub flights_retry: RetryPolicy,
}

impl ClientConfig {
    pub fn new(token_url: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            token_url: token_url.into(),
            api_url: api_url.into(),
            credentials: None,
            token_buffer: Duration::from_secs(5 * 60),
            token_retry: RetryPolicy::token(),
            flights_retry: RetryPolicy::flights(),
        }
    }

    pub fn with_credentials(mut self, client_id: String, client_secret: String) -> Self {
        self.credentials = Some(Credentials {
            client_id,
            client_secret,
        });
        self
    }

    pub fn with_token_buffer(mut self, buffer: Duration) -> Self {
        self.token_buffer = buffer;
        self
    }

    pub fn with_token_retry(mut self, policy: RetryPolicy) -> Self {
        self.token_retry = policy;
        self
    }

    pub fn with_flights_retry(mut self, policy: RetryPolicy) -> Self {
        self.flights_retry = policy;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_URL, DEFAULT_API_URL)
    }
}

/// Flights from one upstream round trip.
#[derive(Debug)]
pub struct FetchedStates {
    pub flights: Vec<Flight>,
    /// False when the request went out without a bearer token.
    pub authenticated: bool,
}

/// Result of probing an upstream URL.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeResult {
    pub url: String,
    pub reachable: bool,
    pub status: Option<u16>,
    pub elapsed_ms: u64,
    pub error: Option<String>,
}

/// Client for the OpenSky token and states endpoints.
pub struct OpenSkyClient {
    client: Client,
    config: ClientConfig,
    token_cache: ExpiringCache<&'static str, String>,
}

impl OpenSkyClient {
    /// Create a new client using wall-clock time.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: ClientConfig, clock: Arc<dyn Clock>) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .user_agent(concat!("skytrack/", env!("CARGO_PKG_VERSION")))
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()?;

        Ok(Self {
            client,
            config,
            token_cache: ExpiringCache::new(clock),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn has_credentials(&self) -> bool {
        self.config.credentials.is_some()
    }

    /// Whether a token is held (it may be past its expiry).
    pub fn has_cached_token(&self) -> bool {
        self.token_cache.contains_key(&TOKEN_KEY)
    }

    /// Return a bearer token, requesting a new one when the cached one expired.
    ///
    /// Overlapping callers that miss the cache each issue their own request.
    pub async fn access_token(&self) -> Result<String, ClientError> {
        let credentials = self
            .config
            .credentials
            .as_ref()
            .ok_or(ClientError::MissingCredentials)?;

        if let Some(token) = self.token_cache.get(&TOKEN_KEY) {
            tracing::debug!("Using cached token");
            return Ok(token);
        }

        tracing::info!("Requesting new access token");

        let response = self
            .config
            .token_retry
            .run("Token request", |attempt| {
                self.request_token(credentials, attempt)
            })
            .await?;

        let lifetime_ms = response.expires_in.saturating_mul(1000);
        let buffer_ms = duration_ms(self.config.token_buffer);
        let expires_at = self
            .token_cache
            .now_ms()
            .saturating_add(lifetime_ms)
            .saturating_sub(buffer_ms);

        self.token_cache
            .insert_until(TOKEN_KEY, response.access_token.clone(), expires_at);

        tracing::info!(expires_in = response.expires_in, "Token received and cached");
        Ok(response.access_token)
    }

    async fn request_token(
        &self,
        credentials: &Credentials,
        attempt: u32,
    ) -> Result<TokenResponse, ClientError> {
        tracing::debug!(attempt, "POST {}", self.config.token_url);

        let response = self
            .client
            .post(&self.config.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::TokenRequest { status });
        }

        Ok(response.json::<TokenResponse>().await?)
    }

    /// Fetch all state vectors, authenticated when possible.
    ///
    /// A failed token acquisition or a 401/403 from the states endpoint falls
    /// back to one unauthenticated request against the same URL.
    pub async fn fetch_flights(&self) -> Result<FetchedStates, ClientError> {
        if !self.has_credentials() {
            return self.fetch_anonymous().await;
        }

        match self.access_token().await {
            Ok(token) => match self.fetch_states(Some(&token)).await {
                Ok(flights) => Ok(FetchedStates {
                    flights,
                    authenticated: true,
                }),
                Err(e) if e.is_auth_rejection() => {
                    tracing::warn!("Bearer token rejected ({}), retrying unauthenticated", e);
                    self.token_cache.remove(&TOKEN_KEY);
                    self.fetch_anonymous().await
                }
                Err(e) => Err(e),
            },
            Err(e) => {
                tracing::warn!("Authentication failed ({}), retrying unauthenticated", e);
                self.fetch_anonymous().await
            }
        }
    }

    async fn fetch_anonymous(&self) -> Result<FetchedStates, ClientError> {
        let flights = self.fetch_states(None).await?;
        Ok(FetchedStates {
            flights,
            authenticated: false,
        })
    }

    async fn fetch_states(&self, token: Option<&str>) -> Result<Vec<Flight>, ClientError> {
        self.config
            .flights_retry
            .run("Flights request", |attempt| self.request_states(token, attempt))
            .await
    }

    async fn request_states(
        &self,
        token: Option<&str>,
        attempt: u32,
    ) -> Result<Vec<Flight>, ClientError> {
        tracing::debug!(
            attempt,
            authenticated = token.is_some(),
            "GET {}",
            self.config.api_url
        );

        let mut request = self.client.get(&self.config.api_url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;

        if let Some(remaining) = response
            .headers()
            .get(RATE_LIMIT_REMAINING)
            .and_then(|v| v.to_str().ok())
        {
            tracing::debug!("Upstream rate limit remaining: {}", remaining);
        }

        match response.status() {
            status if status.is_success() => {
                let bytes = response.bytes().await?;
                Ok(protocol::parse_states(&bytes)?)
            }
            status => Err(ClientError::FlightsRequest { status }),
        }
    }

    /// Check that `url` answers at all. Any HTTP status counts as reachable.
    pub async fn probe(&self, url: &str, timeout: Duration) -> ProbeResult {
        let start = Instant::now();
        let result = self.client.get(url).timeout(timeout).send().await;
        let elapsed_ms = duration_ms(start.elapsed());

        match result {
            Ok(response) => ProbeResult {
                url: url.to_string(),
                reachable: true,
                status: Some(response.status().as_u16()),
                elapsed_ms,
                error: None,
            },
            Err(e) => ProbeResult {
                url: url.to_string(),
                reachable: false,
                status: None,
                elapsed_ms,
                error: Some(e.to_string()),
            },
        }
    }
}
