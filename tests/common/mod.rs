//! Shared helpers for router tests against a mocked OpenSky upstream.

use axum::body::Body;
use axum::response::Response;
use axum::http::{Request, StatusCode};
use httpmock::Method::{GET, POST};
use httpmock::{Mock, MockServer};
use serde_json::{json, Value};
use skytrack::api::{create_router, AppState};
use skytrack::collector::CollectorBuilder;
use skytrack::config::Config;
use tower::ServiceExt;

/// Router wired to a local mock of the token and states endpoints.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    pub upstream: MockServer,
}

#[allow(dead_code)]
impl TestServer {
    /// Authenticated configuration pointed at a fresh mock upstream.
    pub async fn new() -> Self {
        let upstream = MockServer::start_async().await;
        let config = Config::default()
            .with_urls(&upstream.url("/token"), &upstream.url("/states/all"))
            .with_credentials("test-client", "test-secret");
        Self::with_config(upstream, config)
    }

    pub async fn anonymous() -> Self {
        let upstream = MockServer::start_async().await;
        let config = Config::default()
            .with_urls(&upstream.url("/token"), &upstream.url("/states/all"))
            .with_anonymous(true);
        Self::with_config(upstream, config)
    }

    /// Authenticated server whose CORS layer only admits `origin`.
    pub async fn with_cors_origin(origin: &str) -> Self {
        let upstream = MockServer::start_async().await;
        let mut config = Config::default()
            .with_urls(&upstream.url("/token"), &upstream.url("/states/all"))
            .with_credentials("test-client", "test-secret");
        config.cors_origin = origin.to_string();
        Self::with_config(upstream, config)
    }

    fn with_config(upstream: MockServer, config: Config) -> Self {
        config.validate().expect("test config is valid");

        let collector = CollectorBuilder::new()
            .client_config(config.client_config())
            .flights_ttl(config.flights_ttl())
            .build()
            .expect("Failed to build collector");

        let state = AppState::new(collector, config);
        let router = create_router(state.clone());

        Self {
            router,
            state,
            upstream,
        }
    }

    pub async fn mock_token(&self) -> Mock<'_> {
        self.upstream
            .mock_async(|when, then| {
                when.method(POST).path("/token");
                then.status(200)
                    .json_body(json!({ "access_token": "test-token", "expires_in": 1800 }));
            })
            .await
    }

    pub async fn mock_states(&self, states: Value) -> Mock<'_> {
        self.upstream
            .mock_async(|when, then| {
                when.method(GET).path("/states/all");
                then.status(200)
                    .json_body(json!({ "time": 1_700_000_000, "states": states }));
            })
            .await
    }

    pub async fn mock_states_status(&self, status: u16) -> Mock<'_> {
        self.upstream
            .mock_async(|when, then| {
                when.method(GET).path("/states/all");
                then.status(status);
            })
            .await
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        json_request(&self.router, uri).await
    }

    /// Send a prepared request and return the raw response.
    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

/// Issue a GET and decode the JSON body.
pub async fn json_request(router: &axum::Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    let json: Value = if body_bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
    };

    (status, json)
}

/// An 18-field state vector.
#[allow(dead_code)]
pub fn state_vector(
    icao24: &str,
    callsign: &str,
    latitude: f64,
    longitude: f64,
    altitude: f64,
    on_ground: bool,
    velocity: f64,
    track: f64,
) -> Value {
    json!([
        icao24, callsign, "Testland", 1_700_000_000, 1_700_000_005,
        longitude, latitude, altitude, on_ground, velocity, track, 0.0,
        null, altitude, "7000", false, 0, 3
    ])
}
