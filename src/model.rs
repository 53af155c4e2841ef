//! Domain entities: map features, curated venues and routing queries.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::geometry::LatLng;

/// OSM-style key/value tags.
pub type Tags = BTreeMap<String, String>;

/// Id used for points that have no map identity (a raw click or drag).
pub const SYNTHETIC_ID: i64 = -1;

/// Tag holding the street name of an address.
pub const STREET_TAG: &str = "addr:street";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Node,
    Way,
    Relation,
}

impl FromStr for ElementKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "node" => Ok(Self::Node),
            "way" => Ok(Self::Way),
            "relation" => Ok(Self::Relation),
            other => Err(format!("unknown element kind: {}", other)),
        }
    }
}

/// Map identity of a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoiKey {
    pub kind: ElementKind,
    pub id: i64,
}

/// Any addressable map entity with coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointOfInterest {
    pub id: i64,
    pub kind: ElementKind,
    pub location: LatLng,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
}

impl PointOfInterest {
    pub fn new(kind: ElementKind, id: i64, location: LatLng) -> Self {
        Self {
            id,
            kind,
            location,
            tags: None,
        }
    }

    /// A point with no map identity, e.g. where the user clicked.
    pub fn synthetic(location: LatLng) -> Self {
        Self::new(ElementKind::Node, SYNTHETIC_ID, location)
    }

    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags = Some(tags);
        self
    }

    pub fn with_tag(mut self, key: &str, value: &str) -> Self {
        self.tags
            .get_or_insert_with(Tags::new)
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn is_synthetic(&self) -> bool {
        self.id == SYNTHETIC_ID
    }

    pub fn key(&self) -> PoiKey {
        PoiKey {
            kind: self.kind,
            id: self.id,
        }
    }

    /// Whether both values denote the same map feature.
    ///
    /// Synthetic points share an id, so they only match when they also sit at
    /// the same coordinates.
    pub fn same_identity(&self, other: &PointOfInterest) -> bool {
        self.key() == other.key() && (!self.is_synthetic() || self.location == other.location)
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.as_ref()?.get(key).map(String::as_str)
    }

    /// Street name from the address tags, if present and non-empty.
    pub fn street(&self) -> Option<&str> {
        self.tag(STREET_TAG).filter(|s| !s.is_empty())
    }

    /// Identity used for staleness checks.
    pub fn destination_key(&self) -> DestinationKey {
        DestinationKey {
            kind: self.kind,
            id: self.id,
            at: self
                .is_synthetic()
                .then(|| (self.location.lat.to_bits(), self.location.lon.to_bits())),
        }
    }
}

/// Field-comparable identity of a destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DestinationKey {
    pub kind: ElementKind,
    pub id: i64,
    /// Coordinate bits, only for synthetic destinations.
    at: Option<(u64, u64)>,
}

/// Suitability of a workplace entrance for deliveries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeliveryType {
    Main,
    Yes,
    #[default]
    Unset,
    No,
}

impl DeliveryType {
    /// Parses the curated `deliveries` tag. Missing, empty and unknown
    /// values are all `Unset`.
    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag.map(str::trim) {
            Some("main") => Self::Main,
            Some("yes") => Self::Yes,
            Some("no") => Self::No,
            _ => Self::Unset,
        }
    }

    /// Display priority; higher sorts first.
    pub fn priority(self) -> i8 {
        match self {
            Self::Main => 2,
            Self::Yes => 1,
            Self::Unset => 0,
            Self::No => -1,
        }
    }
}

pub type UnloadingPlaceId = i64;

/// A designated delivery/parking point.
#[derive(Debug, Clone, PartialEq)]
pub struct UnloadingPlace {
    pub id: UnloadingPlaceId,
    pub location: LatLng,
    /// Where a vehicle enters the unloading place from the street network.
    pub access_points: Vec<LatLng>,
    pub osm_feature_id: Option<i64>,
    pub description: Option<String>,
    pub image: Option<String>,
}

/// A photo note attached to a venue or one of its parts.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageNote {
    pub id: i64,
    pub image: Option<String>,
    pub location: Option<LatLng>,
    pub tags: Vec<String>,
}

/// A specific entrance of a venue.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkplaceEntrance {
    pub id: i64,
    /// Node id of the entrance in the open-map data.
    pub osm_entrance_id: i64,
    pub delivery_type: DeliveryType,
    pub delivery_types: Vec<String>,
    pub description: Option<String>,
    pub unloading_places: Vec<UnloadingPlace>,
    pub delivery_instructions: Option<String>,
    pub delivery_hours: Option<String>,
    pub image: Option<String>,
}

/// Curated business data overlaying a map feature.
#[derive(Debug, Clone, PartialEq)]
pub struct Venue {
    pub poi: PointOfInterest,
    pub name: Option<String>,
    pub entrances: Vec<WorkplaceEntrance>,
    pub delivery_instructions: Option<String>,
    pub delivery_hours: Option<String>,
    pub profile_images: Vec<ImageNote>,
}

impl Venue {
    pub fn key(&self) -> PoiKey {
        self.poi.key()
    }

    /// The workplace entrance referencing the given entrance node.
    pub fn entrance_for(&self, osm_entrance_id: i64) -> Option<&WorkplaceEntrance> {
        self.entrances
            .iter()
            .find(|entrance| entrance.osm_entrance_id == osm_entrance_id)
    }

    /// Delivery hours for an entrance, falling back to the venue's own.
    pub fn delivery_hours_for<'a>(&'a self, entrance: &'a WorkplaceEntrance) -> Option<&'a str> {
        entrance
            .delivery_hours
            .as_deref()
            .filter(|h| !h.is_empty())
            .or(self.delivery_hours.as_deref())
    }
}

/// Result of a request to a service that may still be in flight.
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkState<T> {
    /// Requested, with no answer yet.
    Loading,
    Success(T),
    Error,
}

impl<T> NetworkState<T> {
    pub fn success(&self) -> Option<&T> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn success_mut(&mut self) -> Option<&mut T> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }
}

/// How a route segment is to be travelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TravelMode {
    #[default]
    Default,
    DeliveryWalking,
    DeliveryCar,
}

/// The unit of work submitted to the path planner.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteQuery {
    pub origin: LatLng,
    pub target: PointOfInterest,
    pub mode: TravelMode,
}

impl RouteQuery {
    pub fn new(origin: LatLng, target: PointOfInterest, mode: TravelMode) -> Self {
        Self { origin, target, mode }
    }
}

/// Inputs captured when a planning cycle starts.
///
/// A cycle's results are only committed while the current state still
/// produces an equal snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanningInputSnapshot {
    pub origin: Option<LatLng>,
    pub destination: DestinationKey,
    pub entrance_set: u64,
    pub unloading_place: Option<UnloadingPlaceId>,
    /// Planning cycle the snapshot belongs to.
    pub cycle: u64,
}
