//! OLMap venue-data adapter.
//!
//! The service annotates map features with photo notes and, for businesses,
//! a curated workplace record with entrances and unloading places.

use serde::{Deserialize, Deserializer};
use tracing::{debug, warn};

use crate::config::{OlmapConfig, blocking_client};
use crate::geometry::LatLng;
use crate::model::{
    DeliveryType, ImageNote, NetworkState, PointOfInterest, Tags, UnloadingPlace, Venue, WorkplaceEntrance,
};
use crate::traits::VenueDataSource;

/// Image note tag marking photos of the business itself.
const WORKPLACE_TAG: &str = "Workplace";

#[derive(Debug, Clone)]
pub struct OlmapClient {
    config: OlmapConfig,
    client: reqwest::blocking::Client,
}

impl OlmapClient {
    pub fn new(config: OlmapConfig) -> Result<Self, reqwest::Error> {
        let client = blocking_client(config.timeout_secs)?;
        Ok(Self { config, client })
    }

    pub fn feature_url(&self, osm_id: i64) -> String {
        format!("{}/rest/osm_features/{}/", self.config.base_url.trim_end_matches('/'), osm_id)
    }

    fn fetch(&self, osm_id: i64) -> Result<OlmapResponse, reqwest::Error> {
        self.client
            .get(self.feature_url(osm_id))
            .send()?
            .error_for_status()?
            .json::<OlmapResponse>()
    }
}

impl VenueDataSource for OlmapClient {
    fn venue_data(&self, poi: &PointOfInterest) -> NetworkState<Option<Venue>> {
        match self.fetch(poi.id) {
            Ok(response) => {
                let venue = response.into_venue(poi);
                debug!(osm_id = poi.id, has_venue = venue.is_some(), "fetched venue data");
                NetworkState::Success(venue)
            }
            Err(err) => {
                warn!(osm_id = poi.id, error = %err, "venue data request failed");
                NetworkState::Error
            }
        }
    }
}

/// Response body for a single map feature.
#[derive(Debug, Clone, Deserialize)]
pub struct OlmapResponse {
    #[serde(default)]
    pub image_notes: Vec<OlmapImageNote>,
    pub workplace: Option<OlmapWorkplace>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OlmapImageNote {
    pub id: i64,
    pub image: Option<String>,
    #[serde(default, deserialize_with = "coordinate")]
    pub lat: Option<f64>,
    #[serde(default, deserialize_with = "coordinate")]
    pub lon: Option<f64>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OlmapWorkplace {
    pub osm_feature: i64,
    #[serde(default)]
    pub workplace_entrances: Vec<OlmapWorkplaceEntrance>,
    pub delivery_instructions: Option<String>,
    pub delivery_hours: Option<String>,
    pub image_note: Option<OlmapImageNote>,
    #[serde(default)]
    pub as_osm_tags: Tags,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OlmapWorkplaceEntrance {
    pub id: i64,
    pub entrance_data: OlmapEntranceData,
    pub deliveries: Option<String>,
    #[serde(default)]
    pub delivery_types: Vec<String>,
    pub description: Option<String>,
    pub delivery_instructions: Option<String>,
    pub delivery_hours: Option<String>,
    #[serde(default)]
    pub unloading_places: Vec<OlmapUnloadingPlace>,
    pub image_note: Option<OlmapImageNote>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OlmapEntranceData {
    pub osm_feature: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OlmapUnloadingPlace {
    pub id: i64,
    pub image_note: OlmapImageNote,
    #[serde(default)]
    pub access_points: Vec<OlmapPoint>,
    pub osm_feature: Option<i64>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OlmapPoint {
    #[serde(deserialize_with = "required_coordinate")]
    pub lat: f64,
    #[serde(deserialize_with = "required_coordinate")]
    pub lon: f64,
}

impl OlmapResponse {
    /// Domain venue for `poi`, if the response carries a workplace for it.
    pub fn into_venue(self, poi: &PointOfInterest) -> Option<Venue> {
        let workplace = self.workplace?;
        if workplace.osm_feature != poi.id {
            warn!(
                expected = poi.id,
                got = workplace.osm_feature,
                "workplace belongs to another feature"
            );
            return None;
        }

        let profile_images = match workplace.image_note.filter(|note| note.image.is_some()) {
            Some(note) => vec![note.into_domain()],
            None => self
                .image_notes
                .into_iter()
                .filter(|note| note.image.is_some() && note.tags.iter().any(|t| t == WORKPLACE_TAG))
                .map(OlmapImageNote::into_domain)
                .collect(),
        };

        let entrances = workplace
            .workplace_entrances
            .into_iter()
            .map(OlmapWorkplaceEntrance::into_domain)
            .collect();

        Some(Venue {
            poi: poi.clone(),
            name: workplace.as_osm_tags.get("name").cloned(),
            entrances,
            delivery_instructions: workplace.delivery_instructions,
            delivery_hours: workplace.delivery_hours,
            profile_images,
        })
    }
}

impl OlmapImageNote {
    fn location(&self) -> Option<LatLng> {
        Some(LatLng::new(self.lat?, self.lon?))
    }

    fn into_domain(self) -> ImageNote {
        ImageNote {
            id: self.id,
            location: self.location(),
            image: self.image,
            tags: self.tags,
        }
    }
}

impl OlmapWorkplaceEntrance {
    fn into_domain(self) -> WorkplaceEntrance {
        WorkplaceEntrance {
            id: self.id,
            osm_entrance_id: self.entrance_data.osm_feature,
            delivery_type: DeliveryType::from_tag(self.deliveries.as_deref()),
            delivery_types: self.delivery_types,
            description: self.description,
            unloading_places: self
                .unloading_places
                .into_iter()
                .filter_map(OlmapUnloadingPlace::into_domain)
                .collect(),
            delivery_instructions: self.delivery_instructions,
            delivery_hours: self.delivery_hours,
            image: self.image_note.and_then(|note| note.image),
        }
    }
}

impl OlmapUnloadingPlace {
    /// Places without a located image note cannot be routed to and are dropped.
    fn into_domain(self) -> Option<UnloadingPlace> {
        let Some(location) = self.image_note.location() else {
            warn!(unloading_place = self.id, "unloading place has no location");
            return None;
        };
        Some(UnloadingPlace {
            id: self.id,
            location,
            access_points: self
                .access_points
                .into_iter()
                .map(|p| LatLng::new(p.lat, p.lon))
                .collect(),
            osm_feature_id: self.osm_feature,
            description: self.description,
            image: self.image_note.image,
        })
    }
}

/// Coordinates arrive either as JSON numbers or as decimal strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    String(String),
}

fn coordinate<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Number(n)) => Ok(Some(n)),
        Some(NumberOrString::String(s)) if s.trim().is_empty() => Ok(None),
        Some(NumberOrString::String(s)) => s.trim().parse().map(Some).map_err(serde::de::Error::custom),
    }
}

fn required_coordinate<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    coordinate(deserializer)?.ok_or_else(|| serde::de::Error::custom("missing coordinate"))
}
