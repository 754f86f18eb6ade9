//! Flight list acquisition with a short-lived shared cache.

use crate::cache::{duration_ms, Clock, ExpiringCache, SystemClock};
use crate::client::{ClientConfig, ClientError, OpenSkyClient};
use crate::types::Flight;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const FLIGHTS_KEY: &str = "flights";

/// Counters for the collector.
#[derive(Debug, Default)]
pub struct CollectorStats {
    pub fetches: AtomicU64,
    pub cache_hits: AtomicU64,
    pub fallbacks: AtomicU64,
    pub errors: AtomicU64,
    pub flights_received: AtomicU64,
    pub last_fetch_ms: AtomicU64,
}

impl CollectorStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            fetches: self.fetches.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            flights_received: self.flights_received.load(Ordering::Relaxed),
            last_fetch_ms: self.last_fetch_ms.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub fetches: u64,
    pub cache_hits: u64,
    /// Fetches that went out unauthenticated although credentials are set.
    pub fallbacks: u64,
    pub errors: u64,
    pub flights_received: u64,
    /// Duration of the last upstream fetch.
    pub last_fetch_ms: u64,
}

/// Configuration for the collector.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// How long a fetched flight list is served before refetching
    pub flights_ttl: Duration,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            flights_ttl: Duration::from_secs(5 * 60),
        }
    }
}

/// Serves the full flight list, going upstream only when the cached list
/// has expired.
pub struct Collector {
    client: OpenSkyClient,
    config: CollectorConfig,
    flights: ExpiringCache<&'static str, Arc<Vec<Flight>>>,
    stats: Arc<CollectorStats>,
}

impl Collector {
    pub fn new(client: OpenSkyClient, config: CollectorConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            client,
            config,
            flights: ExpiringCache::new(clock),
            stats: Arc::new(CollectorStats::new()),
        }
    }

    pub fn client(&self) -> &OpenSkyClient {
        &self.client
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Get a reference to the collector stats.
    pub fn stats(&self) -> Arc<CollectorStats> {
        Arc::clone(&self.stats)
    }

    /// Whether a flight list is held (it may be past its expiry).
    pub fn is_cached(&self) -> bool {
        self.flights.contains_key(&FLIGHTS_KEY)
    }

    pub fn cached_len(&self) -> usize {
        self.flights
            .get(&FLIGHTS_KEY)
            .map_or(0, |flights| flights.len())
    }

    /// Drop the cached list so the next call goes upstream.
    pub fn invalidate(&self) {
        self.flights.remove(&FLIGHTS_KEY);
    }

    /// Full, unfiltered flight list.
    ///
    /// Errors are logged and returned; nothing is cached on failure.
    pub async fn flights(&self) -> Result<Arc<Vec<Flight>>, ClientError> {
        if let Some(flights) = self.flights.get(&FLIGHTS_KEY) {
            self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("Using cached flights data ({} flights)", flights.len());
            return Ok(flights);
        }

        tracing::info!("Fetching fresh flights data");
        let start = Instant::now();

        let fetched = match self.client.fetch_flights().await {
            Ok(fetched) => fetched,
            Err(e) => {
                tracing::error!("Error fetching flights data: {}", e);
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                return Err(e);
            }
        };

        let elapsed = start.elapsed();
        self.stats.fetches.fetch_add(1, Ordering::Relaxed);
        self.stats
            .flights_received
            .fetch_add(fetched.flights.len() as u64, Ordering::Relaxed);
        self.stats
            .last_fetch_ms
            .store(duration_ms(elapsed), Ordering::Relaxed);
        if !fetched.authenticated && self.client.has_credentials() {
            self.stats.fallbacks.fetch_add(1, Ordering::Relaxed);
        }

        tracing::info!(
            authenticated = fetched.authenticated,
            "Fetched {} flights in {:?}",
            fetched.flights.len(),
            elapsed
        );

        let flights = Arc::new(fetched.flights);
        self.flights
            .insert(FLIGHTS_KEY, Arc::clone(&flights), self.config.flights_ttl);

        Ok(flights)
    }
}

/// Builder for creating a Collector with custom configuration.
pub struct CollectorBuilder {
    client_config: ClientConfig,
    collector_config: CollectorConfig,
    clock: Arc<dyn Clock>,
}

impl CollectorBuilder {
    pub fn new() -> Self {
        Self {
            client_config: ClientConfig::default(),
            collector_config: CollectorConfig::default(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn client_config(mut self, config: ClientConfig) -> Self {
        self.client_config = config;
        self
    }

    pub fn flights_ttl(mut self, ttl: Duration) -> Self {
        self.collector_config.flights_ttl = ttl;
        self
    }

    /// Time source shared by the token and flights caches.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn build(self) -> Result<Collector, ClientError> {
        let client = OpenSkyClient::with_clock(self.client_config, Arc::clone(&self.clock))?;
        Ok(Collector::new(client, self.collector_config, self.clock))
    }
}

impl Default for CollectorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use httpmock::Method::{GET, POST};
    use httpmock::MockServer;
    use serde_json::json;

    fn states_body() -> serde_json::Value {
        json!({
            "time": 1_700_000_000,
            "states": [
                ["a1b2c3", "UAL12", "United States", null, 1_700_000_000,
                 -87.9, 41.97, 3000.0, false, 120.0, 270.0, null, null, 3050.0,
                 null, false, 0, 0],
                ["d4e5f6", "", "Canada", null, 1_700_000_000,
                 -79.6, 43.68, null, true, 0.0, null, null, null, null,
                 null, false, 0, 0]
            ]
        })
    }

    fn anonymous_collector(server: &MockServer, clock: Arc<ManualClock>) -> Collector {
        CollectorBuilder::new()
            .client_config(ClientConfig::new(
                server.url("/token"),
                server.url("/states/all"),
            ))
            .flights_ttl(Duration::from_secs(60))
            .clock(clock)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_flights_are_cached_until_ttl() {
        let server = MockServer::start_async().await;
        let states_mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/states/all");
                then.status(200).json_body(states_body());
            })
            .await;

        let clock = Arc::new(ManualClock::new(0));
        let collector = anonymous_collector(&server, clock.clone());
        assert!(!collector.is_cached());

        let first = collector.flights().await.unwrap();
        assert_eq!(first.len(), 2);
        assert!(collector.is_cached());

        clock.advance(Duration::from_secs(59));
        let second = collector.flights().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        states_mock.assert_hits_async(1).await;

        clock.advance(Duration::from_secs(1));
        collector.flights().await.unwrap();
        states_mock.assert_hits_async(2).await;

        let stats = collector.stats().snapshot();
        assert_eq!(stats.fetches, 2);
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.flights_received, 4);
        assert_eq!(stats.fallbacks, 0);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_not_cached() {
        let server = MockServer::start_async().await;
        let states_mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/states/all");
                then.status(500);
            })
            .await;

        let collector = anonymous_collector(&server, Arc::new(ManualClock::new(0)));

        assert!(collector.flights().await.is_err());
        assert!(collector.flights().await.is_err());
        assert!(!collector.is_cached());
        states_mock.assert_hits_async(2).await;
        assert_eq!(collector.stats().snapshot().errors, 2);
    }

    #[tokio::test]
    async fn test_fallback_is_counted() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/token");
                then.status(401);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/states/all").header_missing("authorization");
                then.status(200).json_body(states_body());
            })
            .await;

        let config = ClientConfig::new(server.url("/token"), server.url("/states/all"))
            .with_credentials("id".to_string(), "secret".to_string())
            .with_token_retry(crate::retry::RetryPolicy::token().with_max_attempts(1));
        let collector = CollectorBuilder::new().client_config(config).build().unwrap();

        let flights = collector.flights().await.unwrap();
        assert_eq!(flights.len(), 2);
        assert_eq!(collector.stats().snapshot().fallbacks, 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let server = MockServer::start_async().await;
        let states_mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/states/all");
                then.status(200).json_body(states_body());
            })
            .await;

        let collector = anonymous_collector(&server, Arc::new(ManualClock::new(0)));
        collector.flights().await.unwrap();
        assert_eq!(collector.cached_len(), 2);

        collector.invalidate();
        assert_eq!(collector.cached_len(), 0);
        collector.flights().await.unwrap();
        states_mock.assert_hits_async(2).await;
    }
}
