//! Decoding of OpenSky payloads.
//!
//! The states endpoint returns each aircraft as a positional array with a
//! fixed 18-field layout:
//!
//! ```text
//!  0 icao24           6 latitude        12 sensors
//!  1 callsign         7 baro_altitude   13 geo_altitude
//!  2 origin_country   8 on_ground       14 squawk
//!  3 time_position    9 velocity        15 spi
//!  4 last_contact    10 true_track      16 position_source
//!  5 longitude       11 vertical_rate   17 category
//! ```
//!
//! Missing or null slots decode to `None`, `N/A` or `false` depending on the
//! field; short rows are accepted.

use crate::types::{Flight, PositionSource, NOT_AVAILABLE};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Server returned error: {0}")]
    ServerResponse(String),
}

/// Number of fields in a state vector.
pub const STATE_VECTOR_LEN: usize = 18;

const ICAO24: usize = 0;
const CALLSIGN: usize = 1;
const ORIGIN_COUNTRY: usize = 2;
const TIME_POSITION: usize = 3;
const LAST_CONTACT: usize = 4;
const LONGITUDE: usize = 5;
const LATITUDE: usize = 6;
const BARO_ALTITUDE: usize = 7;
const ON_GROUND: usize = 8;
const VELOCITY: usize = 9;
const TRUE_TRACK: usize = 10;
const VERTICAL_RATE: usize = 11;
const SENSORS: usize = 12;
const GEO_ALTITUDE: usize = 13;
const SQUAWK: usize = 14;
const SPI: usize = 15;
const POSITION_SOURCE: usize = 16;
const CATEGORY: usize = 17;

/// Body of `GET /states/all`.
#[derive(Debug, Deserialize)]
pub struct StatesResponse {
    pub time: Option<i64>,
    /// `null` when no aircraft match.
    #[serde(default)]
    pub states: Option<Vec<Vec<Value>>>,
}

/// Body of a successful client-credentials grant.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Lifetime in seconds.
    pub expires_in: u64,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Parse a states response body into flight records.
pub fn parse_states(data: &[u8]) -> Result<Vec<Flight>, ParseError> {
    if data.starts_with(b"<!") || data.starts_with(b"<html") {
        let text = String::from_utf8_lossy(&data[..data.len().min(500)]);
        return Err(ParseError::ServerResponse(text.to_string()));
    }

    let response: StatesResponse = serde_json::from_slice(data)?;

    Ok(response
        .states
        .unwrap_or_default()
        .iter()
        .map(|state| flight_from_state(state))
        .collect())
}

/// Map one state vector into a flight record.
pub fn flight_from_state(state: &[Value]) -> Flight {
    let callsign = str_at(state, CALLSIGN)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(NOT_AVAILABLE);

    let origin = str_at(state, ORIGIN_COUNTRY)
        .filter(|s| !s.is_empty())
        .unwrap_or(NOT_AVAILABLE);

    Flight {
        id: str_at(state, ICAO24).unwrap_or(NOT_AVAILABLE).to_string(),
        callsign: callsign.to_string(),
        origin: origin.to_string(),
        destination: NOT_AVAILABLE.to_string(),
        time_position: i64_at(state, TIME_POSITION),
        last_contact: i64_at(state, LAST_CONTACT),
        longitude: f64_at(state, LONGITUDE),
        latitude: f64_at(state, LATITUDE),
        baro_altitude: f64_at(state, BARO_ALTITUDE),
        on_ground: bool_at(state, ON_GROUND),
        velocity: f64_at(state, VELOCITY),
        true_track: f64_at(state, TRUE_TRACK),
        vertical_rate: f64_at(state, VERTICAL_RATE),
        sensors: state
            .get(SENSORS)
            .and_then(Value::as_array)
            .map(|ids| ids.iter().filter_map(Value::as_i64).collect()),
        altitude: f64_at(state, GEO_ALTITUDE),
        squawk: str_at(state, SQUAWK).map(str::to_string),
        spi: bool_at(state, SPI),
        position_source: u8_at(state, POSITION_SOURCE).and_then(PositionSource::from_code),
        category: i64_at(state, CATEGORY),
    }
}

fn str_at(state: &[Value], index: usize) -> Option<&str> {
    state.get(index).and_then(Value::as_str)
}

fn f64_at(state: &[Value], index: usize) -> Option<f64> {
    state.get(index).and_then(Value::as_f64)
}

fn i64_at(state: &[Value], index: usize) -> Option<i64> {
    state.get(index).and_then(Value::as_i64)
}

fn u8_at(state: &[Value], index: usize) -> Option<u8> {
    state
        .get(index)
        .and_then(Value::as_u64)
        .and_then(|v| u8::try_from(v).ok())
}

fn bool_at(state: &[Value], index: usize) -> bool {
    state.get(index).and_then(Value::as_bool).unwrap_or(false)
}
