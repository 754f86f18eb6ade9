//! Upstream connectivity diagnostics.

use super::state::AppState;
use super::timestamp;
use crate::client::ProbeResult;
use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::time::Duration;

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    pub credentials_configured: bool,
    pub token_cached: bool,
    pub token_endpoint: ProbeResult,
    pub states_endpoint: ProbeResult,
}

#[derive(Debug, Serialize)]
pub struct DiagnosticsResponse {
    pub success: bool,
    pub data: Diagnostics,
    pub timestamp: String,
}

/// GET /api/debug/opensky
pub async fn opensky(State(state): State<AppState>) -> Json<DiagnosticsResponse> {
    let client = state.collector.client();
    let config = client.config();

    let (token_endpoint, states_endpoint) = tokio::join!(
        client.probe(&config.token_url, PROBE_TIMEOUT),
        client.probe(&config.api_url, PROBE_TIMEOUT),
    );

    tracing::info!(
        token_reachable = token_endpoint.reachable,
        states_reachable = states_endpoint.reachable,
        "OpenSky connectivity probe"
    );

    Json(DiagnosticsResponse {
        success: true,
        data: Diagnostics {
            credentials_configured: client.has_credentials(),
            token_cached: client.has_cached_token(),
            token_endpoint,
            states_endpoint,
        },
        timestamp: timestamp(),
    })
}
