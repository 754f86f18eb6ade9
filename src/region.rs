//! Named geographic regions and flight filtering.

use crate::types::Flight;

/// Region name that disables filtering.
pub const ALL: &str = "all";

/// A latitude/longitude rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub south: f64,
    pub north: f64,
    pub west: f64,
    pub east: f64,
    /// Whether points on the edges are inside.
    pub inclusive: bool,
}

impl BoundingBox {
    /// Box whose edges belong to it.
    pub const fn inclusive(south: f64, north: f64, west: f64, east: f64) -> Self {
        Self {
            south,
            north,
            west,
            east,
            inclusive: true,
        }
    }

    /// Box whose edges lie outside it.
    pub const fn exclusive(south: f64, north: f64, west: f64, east: f64) -> Self {
        Self {
            south,
            north,
            west,
            east,
            inclusive: false,
        }
    }

    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        if self.inclusive {
            (self.south..=self.north).contains(&latitude)
                && (self.west..=self.east).contains(&longitude)
        } else {
            latitude > self.south
                && latitude < self.north
                && longitude > self.west
                && longitude < self.east
        }
    }

    /// `(latitude, longitude)` of the middle of the box.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.south + self.north) / 2.0,
            (self.west + self.east) / 2.0,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub name: &'static str,
    pub bounds: BoundingBox,
}

/// Every filterable region. Adding a row here is enough to serve it.
pub const REGIONS: &[Region] = &[
    Region {
        name: "Saudi Arabia",
        bounds: BoundingBox::inclusive(16.0, 32.0, 34.0, 56.0),
    },
    Region {
        name: "Europe",
        bounds: BoundingBox::exclusive(35.0, 70.0, -25.0, 40.0),
    },
    Region {
        name: "North America",
        bounds: BoundingBox::exclusive(15.0, 70.0, -170.0, -50.0),
    },
    Region {
        name: "South America",
        bounds: BoundingBox::exclusive(-60.0, 15.0, -90.0, -30.0),
    },
    Region {
        name: "Asia",
        bounds: BoundingBox::exclusive(0.0, 70.0, 60.0, 180.0),
    },
    Region {
        name: "Africa",
        bounds: BoundingBox::exclusive(-40.0, 35.0, -20.0, 50.0),
    },
    Region {
        name: "Oceania",
        bounds: BoundingBox::exclusive(-50.0, 0.0, 110.0, 180.0),
    },
];

/// Names served by `/api/regions`, starting with `All`.
pub fn region_names() -> Vec<&'static str> {
    std::iter::once("All")
        .chain(REGIONS.iter().map(|region| region.name))
        .collect()
}

/// Look up a region by name, ignoring ASCII case.
pub fn find_region(name: &str) -> Option<&'static Region> {
    REGIONS
        .iter()
        .find(|region| region.name.eq_ignore_ascii_case(name))
}

pub fn is_all(name: &str) -> bool {
    name.eq_ignore_ascii_case(ALL)
}

/// Whether a flight's position falls in the named region.
///
/// Flights without a usable position are never in any region, `all`
/// included. Unknown names match nothing.
pub fn is_flight_in_region(flight: &Flight, region: &str) -> bool {
    let Some((latitude, longitude)) = flight.position() else {
        return false;
    };

    if is_all(region) {
        return true;
    }

    find_region(region).is_some_and(|r| r.bounds.contains(latitude, longitude))
}

/// Flights to serve for `region`. `all` returns every flight untouched,
/// including those without a position.
pub fn filter_flights<'a>(flights: &'a [Flight], region: &str) -> Vec<&'a Flight> {
    if is_all(region) {
        return flights.iter().collect();
    }

    flights
        .iter()
        .filter(|flight| is_flight_in_region(flight, region))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::tests::flight_at;

    #[test]
    fn test_region_centers_are_inside() {
        for region in REGIONS {
            let (lat, lon) = region.bounds.center();
            let flight = flight_at("abc123", lat, lon);
            assert!(
                is_flight_in_region(&flight, region.name),
                "{} center ({lat}, {lon})",
                region.name
            );
        }
    }

    #[test]
    fn test_all_matches_any_position() {
        let flight = flight_at("abc123", -89.0, -179.0);
        assert!(is_flight_in_region(&flight, "all"));
        assert!(is_flight_in_region(&flight, "All"));
    }

    #[test]
    fn test_unknown_region_matches_nothing() {
        let flight = flight_at("abc123", 50.0, 10.0);
        assert!(!is_flight_in_region(&flight, "Atlantis"));
        assert!(find_region("Atlantis").is_none());
    }

    #[test]
    fn test_lookup_ignores_case() {
        let flight = flight_at("abc123", 50.0, 10.0);
        assert!(is_flight_in_region(&flight, "EUROPE"));
        assert!(is_flight_in_region(&flight, "europe"));
        assert_eq!(find_region("saudi arabia").unwrap().name, "Saudi Arabia");
    }

    #[test]
    fn test_edge_inclusion() {
        // Saudi Arabia keeps its edges, Europe does not.
        assert!(is_flight_in_region(&flight_at("a", 16.0, 34.0), "Saudi Arabia"));
        assert!(is_flight_in_region(&flight_at("a", 32.0, 56.0), "Saudi Arabia"));
        assert!(!is_flight_in_region(&flight_at("a", 35.0, 10.0), "Europe"));
        assert!(!is_flight_in_region(&flight_at("a", 50.0, 40.0), "Europe"));
    }

    #[test]
    fn test_missing_or_zero_position_is_excluded() {
        let mut flight = flight_at("abc123", 50.0, 10.0);
        flight.longitude = None;
        assert!(!is_flight_in_region(&flight, "Europe"));
        assert!(!is_flight_in_region(&flight, "all"));

        // Equator positions are treated as missing.
        assert!(!is_flight_in_region(&flight_at("abc123", 0.0, 20.0), "Africa"));
    }

    #[test]
    fn test_filter_all_keeps_positionless_flights() {
        let mut no_position = flight_at("b", 1.0, 1.0);
        no_position.latitude = None;
        let flights = vec![flight_at("a", 50.0, 10.0), no_position, flight_at("c", 40.0, -100.0)];

        assert_eq!(filter_flights(&flights, "all").len(), 3);

        let europe = filter_flights(&flights, "Europe");
        assert_eq!(europe.len(), 1);
        assert_eq!(europe[0].id, "a");
    }

    #[test]
    fn test_region_names_list() {
        assert_eq!(
            region_names(),
            vec![
                "All",
                "Saudi Arabia",
                "Europe",
                "North America",
                "South America",
                "Asia",
                "Africa",
                "Oceania"
            ]
        );
    }
}
