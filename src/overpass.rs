//! Overpass API adapter for entrance search, node lookup and street matching.

use serde::Deserialize;
use tracing::debug;

use crate::config::{OverpassConfig, blocking_client};
use crate::error::{CollaboratorError, Result};
use crate::geometry::LatLng;
use crate::model::{ElementKind, PointOfInterest, Tags};
use crate::polyline::{MultiLineString, Polyline};
use crate::traits::{EntranceSearch, NodeLookup, StreetMatcher};

const SERVICE: &str = "overpass";

#[derive(Debug, Clone)]
pub struct OverpassClient {
    config: OverpassConfig,
    client: reqwest::blocking::Client,
}

impl OverpassClient {
    pub fn new(config: OverpassConfig) -> std::result::Result<Self, reqwest::Error> {
        let client = blocking_client(config.timeout_secs)?;
        Ok(Self { config, client })
    }

    fn run(&self, query: &str) -> Result<OverpassResponse> {
        let response = self
            .client
            .get(self.config.interpreter())
            .query(&[("data", query)])
            .send()?
            .error_for_status()?
            .json::<OverpassResponse>()?;
        Ok(response)
    }
}

impl EntranceSearch for OverpassClient {
    fn entrances_near(&self, location: LatLng) -> Result<Vec<PointOfInterest>> {
        let body = self.run(&entrance_query(location))?;
        let entrances = entrances_from(body.elements);
        debug!(count = entrances.len(), "overpass entrance search");
        Ok(entrances)
    }
}

impl NodeLookup for OverpassClient {
    fn nodes_by_id(&self, ids: &[i64]) -> Result<Vec<PointOfInterest>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let body = self.run(&nodes_by_id_query(ids))?;
        Ok(body.elements.into_iter().filter_map(Element::into_poi).collect())
    }
}

impl StreetMatcher for OverpassClient {
    fn matching_street(&self, location: LatLng, street: &str) -> Result<MultiLineString> {
        let body = self.run(&matching_street_query(location, street))?;
        body.elements
            .into_iter()
            .map(|way| {
                way.geometry
                    .map(|points| Polyline::new(points.into_iter().map(|c| LatLng::new(c.lat, c.lon)).collect()))
                    .ok_or_else(|| CollaboratorError::invalid(SERVICE, format!("way {} lacks geometry", way.id)))
            })
            .collect()
    }
}

/// Entrance nodes of buildings (and their parts) within 10 m of `location`.
pub fn entrance_query(location: LatLng) -> String {
    let (lat, lon) = (location.lat, location.lon);
    format!(
        r#"[out:json][timeout:25];
(
  relation(around:10, {lat}, {lon})[building];
  way(r);
  way(around:10, {lat}, {lon})[building];
)->.b;
(
  relation(around.b:10)["building:part"];
  way(r);
  way(around.b:10)["building:part"];
)->.p;
(
  node(w.b)[entrance];
  node(w.p)[entrance];
);
out body;
>;
out skel qt;"#
    )
}

/// Highways named `street` within 100 m of `location`, with geometry.
pub fn matching_street_query(location: LatLng, street: &str) -> String {
    let escaped = street
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n");
    format!(
        r#"[out:json][timeout:25];
(
  way(around:100, {}, {})["highway"][name="{}"];
);
out ids geom qt;"#,
        location.lat, location.lon, escaped
    )
}

pub fn nodes_by_id_query(ids: &[i64]) -> String {
    let ids = ids.iter().map(i64::to_string).collect::<Vec<_>>().join(",");
    format!("[out:json][timeout:25];\nnode(id:{});\nout;", ids)
}

/// Keep tagged entrance nodes that carry coordinates.
fn entrances_from(elements: Vec<Element>) -> Vec<PointOfInterest> {
    elements
        .into_iter()
        .filter(|element| element.kind == "node")
        .filter(|element| element.tags.as_ref().is_some_and(|tags| tags.contains_key("entrance")))
        .filter_map(Element::into_poi)
        .collect()
}

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<Element>,
}

#[derive(Debug, Deserialize)]
struct Element {
    #[serde(rename = "type")]
    kind: String,
    id: i64,
    lat: Option<f64>,
    lon: Option<f64>,
    tags: Option<Tags>,
    geometry: Option<Vec<Coordinates>>,
}

#[derive(Debug, Deserialize)]
struct Coordinates {
    lat: f64,
    lon: f64,
}

impl Element {
    fn into_poi(self) -> Option<PointOfInterest> {
        let kind: ElementKind = self.kind.parse().ok()?;
        let location = LatLng::new(self.lat?, self.lon?);
        let poi = PointOfInterest::new(kind, self.id, location);
        Some(match self.tags {
            Some(tags) => poi.with_tags(tags),
            None => poi,
        })
    }
}
