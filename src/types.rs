//! Core data types for flight tracking.

use serde::{Serialize, Serializer};

/// Placeholder for text fields the upstream feed leaves empty.
pub const NOT_AVAILABLE: &str = "N/A";

/// Origin of a state vector's position report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PositionSource {
    Adsb = 0,
    Asterix = 1,
    Mlat = 2,
    Flarm = 3,
}

impl PositionSource {
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Adsb),
            1 => Some(Self::Asterix),
            2 => Some(Self::Mlat),
            3 => Some(Self::Flarm),
            _ => None,
        }
    }

    pub const fn code(self) -> u8 {
        self as u8
    }
}

// Serialized as the raw code so API consumers see the upstream value.
impl Serialize for PositionSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

/// One aircraft as served by the API.
///
/// Built from an upstream state vector on every cache-miss fetch and never
/// mutated afterwards. Field names are the wire names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Flight {
    /// ICAO24 transponder address (hex string).
    pub id: String,
    pub callsign: String,
    /// Country of origin as reported by the feed.
    pub origin: String,
    /// Not supplied upstream, always `N/A`.
    pub destination: String,
    pub time_position: Option<i64>,
    pub last_contact: Option<i64>,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub baro_altitude: Option<f64>,
    pub on_ground: bool,
    /// Ground speed in m/s.
    pub velocity: Option<f64>,
    /// Heading in degrees clockwise from north.
    pub true_track: Option<f64>,
    pub vertical_rate: Option<f64>,
    pub sensors: Option<Vec<i64>>,
    /// Geometric altitude in meters.
    pub altitude: Option<f64>,
    pub squawk: Option<String>,
    pub spi: bool,
    pub position_source: Option<PositionSource>,
    /// Emitter category, passed through unbounded.
    pub category: Option<i64>,
}

impl Flight {
    /// Latitude/longitude pair usable for region and statistics work.
    ///
    /// A coordinate of exactly `0.0` counts as missing, so positions on the
    /// equator or the prime meridian are rejected.
    pub fn position(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) if lat != 0.0 && lon != 0.0 => Some((lat, lon)),
            _ => None,
        }
    }

    pub fn has_position(&self) -> bool {
        self.position().is_some()
    }

    pub(crate) fn altitude_or_zero(&self) -> f64 {
        self.altitude.unwrap_or(0.0)
    }

    pub(crate) fn velocity_or_zero(&self) -> f64 {
        self.velocity.unwrap_or(0.0)
    }
}
