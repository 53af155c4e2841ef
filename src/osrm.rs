//! OSRM HTTP adapter acting as the path planner.

use serde::Deserialize;

use crate::config::{OsrmConfig, blocking_client};
use crate::error::{CollaboratorError, Result};
use crate::geometry::LatLng;
use crate::model::RouteQuery;
use crate::polyline::Polyline;
use crate::traits::PathPlanner;

#[derive(Debug, Clone)]
pub struct OsrmClient {
    config: OsrmConfig,
    client: reqwest::blocking::Client,
}

impl OsrmClient {
    pub fn new(config: OsrmConfig) -> std::result::Result<Self, reqwest::Error> {
        let client = blocking_client(config.timeout_secs)?;
        Ok(Self { config, client })
    }

    pub fn route_url(&self, query: &RouteQuery) -> String {
        format!(
            "{}/route/v1/{}/{};{}?overview=full&geometries=geojson",
            self.config.base_url.trim_end_matches('/'),
            self.config.profile_for(query.mode),
            coordinate(query.origin),
            coordinate(query.target.location),
        )
    }
}

impl PathPlanner for OsrmClient {
    fn plan(&self, query: &RouteQuery, emit: &mut dyn FnMut(Polyline)) -> Result<()> {
        let body = self
            .client
            .get(self.route_url(query))
            .send()?
            .error_for_status()?
            .json::<OsrmRouteResponse>()?;
        for geometry in route_geometries(body)? {
            emit(geometry);
        }
        Ok(())
    }
}

fn coordinate(p: LatLng) -> String {
    format!("{:.6},{:.6}", p.lon, p.lat)
}

/// Geometry of the first, best-ranked route.
fn route_geometries(body: OsrmRouteResponse) -> Result<Vec<Polyline>> {
    if body.code != "Ok" {
        return Err(CollaboratorError::NoRoute(
            body.message.unwrap_or(body.code),
        ));
    }
    let route = body
        .routes
        .into_iter()
        .next()
        .ok_or_else(|| CollaboratorError::NoRoute("empty route list".to_string()))?;
    Ok(vec![Polyline::from_lon_lat(&route.geometry.coordinates)])
}

#[derive(Debug, Deserialize)]
struct OsrmRouteResponse {
    code: String,
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    geometry: OsrmGeometry,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    coordinates: Vec<[f64; 2]>,
}
