//! Shareable route paths and links to an external map service.

use crate::geometry::LatLng;

/// Path encoding origin and destination, e.g. `/route/60.17,24.94/60.18,24.95/`.
///
/// A missing end is written as `undefined` so that the path keeps both slots.
pub fn route_path(origin: Option<LatLng>, destination: Option<LatLng>) -> String {
    let slot = |p: Option<LatLng>| p.map_or_else(|| "undefined".to_string(), |p| p.to_string());
    format!("/route/{}/{}/", slot(origin), slot(destination))
}

/// Parse a `lat,lon` path segment.
pub fn parse_lat_lng(text: &str) -> Option<LatLng> {
    let (lat, lon) = text.split_once(',')?;
    if lat.is_empty() || lon.is_empty() || lon.contains(',') {
        return None;
    }
    let lat: f64 = lat.trim().parse().ok()?;
    let lon: f64 = lon.trim().parse().ok()?;
    let valid = (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon);
    valid.then(|| LatLng::new(lat, lon))
}

/// Parse both slots of a route path, ignoring a leading `/route`.
pub fn parse_route_path(path: &str) -> (Option<LatLng>, Option<LatLng>) {
    let mut parts = path
        .trim_matches('/')
        .split('/')
        .skip_while(|part| *part == "route");
    let origin = parts.next().and_then(parse_lat_lng);
    let destination = parts.next().and_then(parse_lat_lng);
    (origin, destination)
}

/// Driving directions in Google Maps, offered when the origin is too far.
pub fn external_directions_url(origin: LatLng, destination: LatLng) -> String {
    format!(
        "https://www.google.com/maps/dir/?api=1&origin={},{}&destination={},{}&travelmode=driving",
        origin.lat, origin.lon, destination.lat, destination.lon
    )
}
