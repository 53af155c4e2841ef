//! Geometry helpers: coordinates, great-circle distance and snapping a
//! point onto line geometry.
//!
//! Distances are great-circle (haversine) distances in meters. Snapping works
//! in a local equirectangular projection around the query point, which is
//! accurate at the street-scale distances this crate deals with.

use serde::{Deserialize, Serialize};

use crate::polyline::Polyline;

/// Mean Earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// A WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lon: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Great-circle distance to `other` in meters.
    pub fn distance_to(&self, other: LatLng) -> f64 {
        distance_meters(*self, other)
    }

    /// Returns this coordinate shifted by `delta` degrees on both axes.
    pub fn nudged(&self, delta: f64) -> Self {
        Self::new(self.lat + delta, self.lon + delta)
    }
}

impl From<(f64, f64)> for LatLng {
    fn from((lat, lon): (f64, f64)) -> Self {
        Self::new(lat, lon)
    }
}

impl std::fmt::Display for LatLng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.lat, self.lon)
    }
}

/// Calculate haversine distance between two points in meters.
pub fn distance_meters(from: LatLng, to: LatLng) -> f64 {
    let lat1_rad = from.lat.to_radians();
    let lat2_rad = to.lat.to_radians();
    let delta_lat = (to.lat - from.lat).to_radians();
    let delta_lon = (to.lon - from.lon).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_M * c
}

/// Find the point on `lines` closest to `point`.
///
/// Returns `None` when the geometry holds no points at all. A line with a
/// single point is treated as that point.
pub fn nearest_point_on_lines(lines: &[Polyline], point: LatLng) -> Option<LatLng> {
    let projection = LocalProjection::around(point);
    let mut best: Option<(f64, LatLng)> = None;

    let mut consider = |candidate: LatLng| {
        let d = distance_meters(point, candidate);
        if best.is_none_or(|(best_d, _)| d < best_d) {
            best = Some((d, candidate));
        }
    };

    for line in lines {
        match line.points() {
            [] => {}
            [single] => consider(*single),
            points => {
                for pair in points.windows(2) {
                    consider(projection.nearest_on_segment(pair[0], pair[1]));
                }
            }
        }
    }

    best.map(|(_, p)| p)
}

/// Equirectangular projection centred on a reference point, in meters.
struct LocalProjection {
    origin: LatLng,
    meters_per_deg_lat: f64,
    meters_per_deg_lon: f64,
}

impl LocalProjection {
    fn around(origin: LatLng) -> Self {
        let meters_per_deg_lat = EARTH_RADIUS_M.to_radians();
        Self {
            origin,
            meters_per_deg_lat,
            meters_per_deg_lon: meters_per_deg_lat * origin.lat.to_radians().cos(),
        }
    }

    fn forward(&self, p: LatLng) -> (f64, f64) {
        (
            (p.lon - self.origin.lon) * self.meters_per_deg_lon,
            (p.lat - self.origin.lat) * self.meters_per_deg_lat,
        )
    }

    fn inverse(&self, (x, y): (f64, f64)) -> LatLng {
        let lon = if self.meters_per_deg_lon.abs() > f64::EPSILON {
            self.origin.lon + x / self.meters_per_deg_lon
        } else {
            self.origin.lon
        };
        LatLng::new(self.origin.lat + y / self.meters_per_deg_lat, lon)
    }

    /// Nearest point to the projection origin on segment `a`-`b`.
    fn nearest_on_segment(&self, a: LatLng, b: LatLng) -> LatLng {
        let (ax, ay) = self.forward(a);
        let (bx, by) = self.forward(b);
        let (dx, dy) = (bx - ax, by - ay);
        let len_sq = dx * dx + dy * dy;
        if len_sq == 0.0 {
            return a;
        }
        // Origin is (0, 0) in projected space.
        let t = (-(ax * dx + ay * dy) / len_sq).clamp(0.0, 1.0);
        if t == 0.0 {
            a
        } else if t == 1.0 {
            b
        } else {
            self.inverse((ax + t * dx, ay + t * dy))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_same_point() {
        let p = LatLng::new(60.17, 24.94);
        assert!(distance_meters(p, p) < 0.001, "Same point should have ~0 distance");
    }

    #[test]
    fn test_distance_known() {
        // Helsinki railway station to Tampere railway station, ~160 km
        let dist = distance_meters(LatLng::new(60.1719, 24.9414), LatLng::new(61.4981, 23.7734));
        assert!(dist > 155_000.0 && dist < 165_000.0, "got {}", dist);
    }

    #[test]
    fn test_short_distance() {
        let dist = LatLng::new(60.170, 24.940).distance_to(LatLng::new(60.1705, 24.9415));
        assert!(dist > 50.0 && dist < 70.0, "got {}", dist);
    }

    #[test]
    fn test_nearest_point_projects_onto_segment() {
        // East-west street just north of the point
        let street = Polyline::new(vec![LatLng::new(60.1710, 24.9400), LatLng::new(60.1710, 24.9420)]);
        let point = LatLng::new(60.1705, 24.9410);
        let nearest = nearest_point_on_lines(&[street], point).unwrap();
        assert!((nearest.lat - 60.1710).abs() < 1e-9);
        assert!((nearest.lon - 24.9410).abs() < 1e-6);
    }

    #[test]
    fn test_nearest_point_clamps_to_endpoint() {
        let street = Polyline::new(vec![LatLng::new(60.1710, 24.9400), LatLng::new(60.1710, 24.9405)]);
        let nearest = nearest_point_on_lines(&[street], LatLng::new(60.1705, 24.9420)).unwrap();
        assert_eq!(nearest, LatLng::new(60.1710, 24.9405));
    }

    #[test]
    fn test_nearest_point_picks_closest_line() {
        let far = Polyline::new(vec![LatLng::new(60.1800, 24.9400), LatLng::new(60.1800, 24.9420)]);
        let near = Polyline::new(vec![LatLng::new(60.1706, 24.9400), LatLng::new(60.1706, 24.9420)]);
        let nearest = nearest_point_on_lines(&[far, near], LatLng::new(60.1705, 24.9410)).unwrap();
        assert!((nearest.lat - 60.1706).abs() < 1e-9);
    }

    #[test]
    fn test_nearest_point_empty_geometry() {
        assert!(nearest_point_on_lines(&[], LatLng::new(60.0, 24.0)).is_none());
        assert!(nearest_point_on_lines(&[Polyline::new(vec![])], LatLng::new(60.0, 24.0)).is_none());
    }

    #[test]
    fn test_nudged() {
        let p = LatLng::new(60.0, 24.0).nudged(0.5);
        assert_eq!(p, LatLng::new(60.5, 24.5));
    }
}
