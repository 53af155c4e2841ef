//! Polyline representation for street and route geometries.
//!
//! Stores decoded coordinates. Conversion to and from GeoJSON `[lon, lat]`
//! arrays happens at the service boundaries, not within the planner core.

use serde::{Deserialize, Serialize};

use crate::geometry::{LatLng, distance_meters};

/// A line geometry as an ordered sequence of coordinates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    points: Vec<LatLng>,
}

impl Polyline {
    /// Creates a new Polyline from decoded coordinate points.
    pub fn new(points: Vec<LatLng>) -> Self {
        Self { points }
    }

    /// Builds a polyline from GeoJSON-ordered `[lon, lat]` pairs.
    pub fn from_lon_lat(coordinates: &[[f64; 2]]) -> Self {
        Self {
            points: coordinates.iter().map(|[lon, lat]| LatLng::new(*lat, *lon)).collect(),
        }
    }

    /// Returns a reference to the coordinate points.
    pub fn points(&self) -> &[LatLng] {
        &self.points
    }

    /// Consumes the polyline and returns the owned coordinate points.
    pub fn into_points(self) -> Vec<LatLng> {
        self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Total length along the line in meters.
    pub fn length_meters(&self) -> f64 {
        self.points
            .windows(2)
            .map(|pair| distance_meters(pair[0], pair[1]))
            .sum()
    }

    /// GeoJSON-ordered `[lon, lat]` pairs.
    pub fn to_lon_lat(&self) -> Vec<[f64; 2]> {
        self.points.iter().map(|p| [p.lon, p.lat]).collect()
    }
}

/// Street geometry as returned by the street matcher.
pub type MultiLineString = Vec<Polyline>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_and_points() {
        let points = vec![LatLng::new(60.17, 24.94), LatLng::new(60.18, 24.95)];
        let polyline = Polyline::new(points.clone());
        assert_eq!(polyline.points(), &points[..]);
        assert_eq!(polyline.into_points(), points);
    }

    #[test]
    fn test_lon_lat_order() {
        let polyline = Polyline::from_lon_lat(&[[24.94, 60.17], [24.95, 60.18]]);
        assert_eq!(polyline.points()[0], LatLng::new(60.17, 24.94));
        assert_eq!(polyline.to_lon_lat(), vec![[24.94, 60.17], [24.95, 60.18]]);
    }

    #[test]
    fn test_empty_polyline() {
        let polyline = Polyline::new(vec![]);
        assert!(polyline.is_empty());
        assert_eq!(polyline.length_meters(), 0.0);
    }

    #[test]
    fn test_length() {
        // ~111 m per 0.001 degrees of latitude
        let polyline = Polyline::new(vec![
            LatLng::new(60.170, 24.94),
            LatLng::new(60.171, 24.94),
            LatLng::new(60.172, 24.94),
        ]);
        let length = polyline.length_meters();
        assert!(length > 220.0 && length < 225.0, "got {}", length);
    }
}
