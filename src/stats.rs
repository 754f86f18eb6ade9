//! Aggregate statistics over a set of flights.

use crate::types::Flight;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Label/count pairs serialized as a JSON object in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Histogram(Vec<(&'static str, u64)>);

impl Histogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, label: &'static str, count: u64) {
        self.0.push((label, count));
    }

    pub fn get(&self, label: &str) -> Option<u64> {
        self.0
            .iter()
            .find(|(l, _)| *l == label)
            .map(|(_, count)| *count)
    }

    pub fn total(&self) -> u64 {
        self.0.iter().map(|(_, count)| count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Histogram {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (label, count) in &self.0 {
            map.serialize_entry(label, count)?;
        }
        map.end()
    }
}

/// Snapshot served by `/api/statistics`.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightStatistics {
    /// Flights with a usable position.
    pub total_flights: u64,
    pub flying_flights: u64,
    pub grounded_flights: u64,
    /// Mean geometric altitude of airborne flights, meters.
    pub average_altitude: i64,
    /// Mean ground speed, m/s.
    pub average_speed: i64,
    pub highest_altitude: f64,
    pub fastest_speed: f64,
    pub altitude_ranges: Histogram,
    pub speed_ranges: Histogram,
    pub aircraft_categories: Histogram,
    pub flight_directions: Histogram,
    pub region: String,
}

impl FlightStatistics {
    pub fn empty(region: &str) -> Self {
        Self {
            total_flights: 0,
            flying_flights: 0,
            grounded_flights: 0,
            average_altitude: 0,
            average_speed: 0,
            highest_altitude: 0.0,
            fastest_speed: 0.0,
            altitude_ranges: Histogram::new(),
            speed_ranges: Histogram::new(),
            aircraft_categories: Histogram::new(),
            flight_directions: Histogram::new(),
            region: region.to_string(),
        }
    }
}

/// Compass sectors as `(label, start, end)`. Checked in order, so a heading
/// on a shared edge goes to the first sector that claims it.
const DIRECTIONS: [(&str, f64, f64); 4] = [
    ("North (315-45°)", 315.0, 45.0),
    ("East (45-135°)", 45.0, 135.0),
    ("South (135-225°)", 135.0, 225.0),
    ("West (225-315°)", 225.0, 315.0),
];

const CATEGORIES: [&str; 6] = ["Unknown", "Light", "Small", "Large", "Heavy", "Military"];

/// Wrap-aware inclusive heading test. When `start > end` the range crosses
/// north, e.g. `(315, 45)`.
pub fn is_in_direction(track: f64, start: f64, end: f64) -> bool {
    if start > end {
        track >= start || track <= end
    } else {
        track >= start && track <= end
    }
}

fn direction_label(track: Option<f64>) -> &'static str {
    track
        .and_then(|track| {
            DIRECTIONS
                .iter()
                .find(|(_, start, end)| is_in_direction(track, *start, *end))
                .map(|(label, _, _)| *label)
        })
        .unwrap_or("Unknown")
}

fn category_label(category: Option<i64>) -> &'static str {
    category
        .map_or(Some("Unknown"), |c| {
            usize::try_from(c).ok().and_then(|i| CATEGORIES.get(i).copied())
        })
        .unwrap_or("Other")
}

fn mean(values: impl ExactSizeIterator<Item = f64>) -> f64 {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    values.sum::<f64>() / n as f64
}

fn max_or_zero(values: impl Iterator<Item = f64>) -> f64 {
    values
        .fold(None, |max: Option<f64>, v| Some(max.map_or(v, |m| m.max(v))))
        .unwrap_or(0.0)
}

fn count(flights: &[&Flight], predicate: impl Fn(&Flight) -> bool) -> u64 {
    flights.iter().filter(|f| predicate(f)).count() as u64
}

/// Compute the statistics snapshot for `flights`, labelled with `region`.
///
/// Only flights with a usable position are counted.
pub fn calculate_flight_statistics(flights: &[&Flight], region: &str) -> FlightStatistics {
    if flights.is_empty() {
        return FlightStatistics::empty(region);
    }

    let valid: Vec<&Flight> = flights.iter().copied().filter(|f| f.has_position()).collect();
    let (grounded, flying): (Vec<&Flight>, Vec<&Flight>) =
        valid.iter().copied().partition(|f| f.on_ground);

    let average_altitude = mean(flying.iter().map(|f| f.altitude_or_zero()));
    let average_speed = mean(valid.iter().map(|f| f.velocity_or_zero()));

    let mut altitude_ranges = Histogram::new();
    altitude_ranges.push("Ground (0m)", grounded.len() as u64);
    altitude_ranges.push(
        "Low (1-3000m)",
        count(&flying, |f| {
            let a = f.altitude_or_zero();
            a > 0.0 && a <= 3000.0
        }),
    );
    altitude_ranges.push(
        "Medium (3000-10000m)",
        count(&flying, |f| {
            let a = f.altitude_or_zero();
            a > 3000.0 && a <= 10000.0
        }),
    );
    altitude_ranges.push(
        "High (10000m+)",
        count(&flying, |f| f.altitude_or_zero() > 10000.0),
    );

    let mut speed_ranges = Histogram::new();
    speed_ranges.push(
        "Stationary (0 m/s)",
        count(&valid, |f| f.velocity_or_zero() == 0.0),
    );
    speed_ranges.push(
        "Slow (1-50 m/s)",
        count(&valid, |f| {
            let v = f.velocity_or_zero();
            v > 0.0 && v <= 50.0
        }),
    );
    speed_ranges.push(
        "Medium (50-150 m/s)",
        count(&valid, |f| {
            let v = f.velocity_or_zero();
            v > 50.0 && v <= 150.0
        }),
    );
    speed_ranges.push(
        "Fast (150+ m/s)",
        count(&valid, |f| f.velocity_or_zero() > 150.0),
    );

    let mut aircraft_categories = Histogram::new();
    for label in CATEGORIES.iter().copied().chain(std::iter::once("Other")) {
        aircraft_categories.push(label, count(&valid, |f| category_label(f.category) == label));
    }

    let mut flight_directions = Histogram::new();
    for label in DIRECTIONS
        .iter()
        .map(|(label, _, _)| *label)
        .chain(std::iter::once("Unknown"))
    {
        flight_directions.push(label, count(&valid, |f| direction_label(f.true_track) == label));
    }

    FlightStatistics {
        total_flights: valid.len() as u64,
        flying_flights: flying.len() as u64,
        grounded_flights: grounded.len() as u64,
        average_altitude: average_altitude.round() as i64,
        average_speed: average_speed.round() as i64,
        highest_altitude: max_or_zero(valid.iter().map(|f| f.altitude_or_zero())),
        fastest_speed: max_or_zero(valid.iter().map(|f| f.velocity_or_zero())),
        altitude_ranges,
        speed_ranges,
        aircraft_categories,
        flight_directions,
        region: region.to_string(),
    }
}
