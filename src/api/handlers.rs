//! Route handlers.

use super::error::{ApiError, ApiResult};
use super::pagination::{paginate, parse_positive, Pagination, DEFAULT_LIMIT, DEFAULT_PAGE};
use super::state::AppState;
use super::timestamp;
use crate::collector::StatsSnapshot;
use crate::config::PublicConfig;
use crate::region::{self, ALL};
use crate::stats::{calculate_flight_statistics, FlightStatistics};
use crate::types::Flight;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

/// Raw query values. Parsed leniently so bad input falls back to defaults.
#[derive(Debug, Default, Deserialize)]
pub struct FlightsQuery {
    pub region: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatisticsQuery {
    pub region: Option<String>,
}

fn region_or_all(region: Option<String>) -> String {
    region
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| ALL.to_string())
}

#[derive(Debug, Serialize)]
pub struct Filters {
    pub region: String,
}

#[derive(Debug, Serialize)]
pub struct FlightsResponse {
    pub success: bool,
    pub data: Vec<Flight>,
    pub pagination: Pagination,
    pub filters: Filters,
    pub timestamp: String,
}

/// GET /api/flights
pub async fn list_flights(
    State(state): State<AppState>,
    Query(query): Query<FlightsQuery>,
) -> ApiResult<Json<FlightsResponse>> {
    let flights = state.collector.flights().await?;

    let region = region_or_all(query.region);
    let page = parse_positive(query.page.as_deref(), DEFAULT_PAGE);
    let limit = parse_positive(query.limit.as_deref(), DEFAULT_LIMIT);

    tracing::info!(region = %region, page, limit, "Flights request");

    let filtered = region::filter_flights(&flights, &region);
    if !region::is_all(&region) {
        tracing::debug!("Filtered to {} flights in {}", filtered.len(), region);
    }

    let (slice, pagination) = paginate(&filtered, page, limit);
    tracing::debug!(
        "Page {}/{} with {} flights",
        pagination.current_page,
        pagination.total_pages,
        slice.len()
    );

    Ok(Json(FlightsResponse {
        success: true,
        data: slice.iter().map(|&f| f.clone()).collect(),
        pagination,
        filters: Filters { region },
        timestamp: timestamp(),
    }))
}

#[derive(Debug, Serialize)]
pub struct FlightResponse {
    pub success: bool,
    pub data: Flight,
    pub timestamp: String,
}

/// GET /api/flights/{id}
pub async fn get_flight(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<FlightResponse>> {
    let flights = state.collector.flights().await?;

    let flight = flights
        .iter()
        .find(|f| f.id == id)
        .cloned()
        .ok_or_else(|| ApiError::NotFound("Flight not found".to_string()))?;

    Ok(Json(FlightResponse {
        success: true,
        data: flight,
        timestamp: timestamp(),
    }))
}

#[derive(Debug, Serialize)]
pub struct RegionsResponse {
    pub success: bool,
    pub data: Vec<&'static str>,
    pub timestamp: String,
}

/// GET /api/regions
pub async fn list_regions() -> Json<RegionsResponse> {
    Json(RegionsResponse {
        success: true,
        data: region::region_names(),
        timestamp: timestamp(),
    })
}

#[derive(Debug, Serialize)]
pub struct StatisticsResponse {
    pub success: bool,
    pub data: FlightStatistics,
    pub region: String,
    pub timestamp: String,
}

/// GET /api/statistics
pub async fn get_statistics(
    State(state): State<AppState>,
    Query(query): Query<StatisticsQuery>,
) -> ApiResult<Json<StatisticsResponse>> {
    let flights = state.collector.flights().await?;
    let region = region_or_all(query.region);

    tracing::info!(region = %region, "Statistics request");

    let filtered = region::filter_flights(&flights, &region);
    let stats = calculate_flight_statistics(&filtered, &region);

    tracing::info!(
        "Statistics calculated for {} flights in {}",
        stats.total_flights,
        region
    );

    Ok(Json(StatisticsResponse {
        success: true,
        data: stats,
        region,
        timestamp: timestamp(),
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub success: bool,
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: String,
    pub token_cached: bool,
    pub flights_cached: bool,
    pub config: PublicConfig,
    pub collector: StatsSnapshot,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        success: true,
        status: "OK",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: timestamp(),
        token_cached: state.collector.client().has_cached_token(),
        flights_cached: state.collector.is_cached(),
        config: state.config.public(),
        collector: state.collector.stats().snapshot(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_or_empty_region_means_all() {
        assert_eq!(region_or_all(None), "all");
        assert_eq!(region_or_all(Some(String::new())), "all");
        assert_eq!(region_or_all(Some("Asia".to_string())), "Asia");
    }
}
