//! Helsinki locations around Kamppi for planning fixtures.
//!
//! Distances between neighbouring entries are what the tests rely on, not
//! the exact buildings.

use gatesolve_planner::geometry::LatLng;

/// A named location with coordinates.
#[derive(Debug, Clone)]
pub struct Location {
    pub name: &'static str,
    pub lat: f64,
    pub lon: f64,
}

impl Location {
    pub const fn new(name: &'static str, lat: f64, lon: f64) -> Self {
        Self { name, lat, lon }
    }

    pub fn point(&self) -> LatLng {
        LatLng::new(self.lat, self.lon)
    }
}

/// Where the courier stands; roughly 60 m from [`CAFE_ENTRANCE`].
pub const COURIER: Location = Location::new("Kampintori", 60.1691, 24.9326);

pub const CAFE: Location = Location::new("Kahvila Kampissa", 60.1696, 24.9331);

pub const CAFE_ENTRANCE: Location = Location::new("Kahvila main door", 60.16962, 24.93345);

pub const CAFE_BACK_DOOR: Location = Location::new("Kahvila back door", 60.16975, 24.93290);

pub const LOADING_BAY: Location = Location::new("Fredrikinkatu loading bay", 60.16985, 24.93370);

pub const LOADING_BAY_ACCESS: &[Location] = &[
    Location::new("Fredrikinkatu north", 60.16998, 24.93385),
    Location::new("Fredrikinkatu south", 60.16970, 24.93395),
];

/// About 4 km east of [`CAFE`].
pub const KALASATAMA: Location = Location::new("Kalasatama", 60.1875, 24.9770);
