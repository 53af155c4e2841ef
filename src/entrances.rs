//! Entrance resolution for a destination.
//!
//! Curated venue entrances are preferred over generic map entrances; the
//! destination itself is the last resort, so a resolved set is never empty.
//! Resolution only reads shared state through its request; committing the
//! result is left to [`crate::state::PlanningState::commit_entrances`],
//! which drops it if the destination has changed in the meantime.

use tracing::{debug, warn};

use crate::model::{DestinationKey, ElementKind, NetworkState, PointOfInterest, Venue};
use crate::traits::{EntranceSearch, NodeLookup, VenueDataSource};
use crate::unloading::sort_by_delivery_priority;

/// Venue data as loaded for the selected venue.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedVenue {
    pub data: NetworkState<Option<Venue>>,
    /// Entrance nodes of the venue's workplace entrances, in the same order.
    pub entrance_nodes: Vec<PointOfInterest>,
}

impl LoadedVenue {
    pub fn venue(&self) -> Option<&Venue> {
        self.data.success()?.as_ref()
    }

    /// Whether this is successfully loaded data describing `poi`.
    pub fn describes(&self, poi: &PointOfInterest) -> bool {
        self.venue().is_some_and(|venue| venue.poi.same_identity(poi))
    }

    /// Entrance node referenced by a workplace entrance.
    pub fn entrance_node(&self, osm_entrance_id: i64) -> Option<&PointOfInterest> {
        self.entrance_nodes
            .iter()
            .find(|node| node.kind == ElementKind::Node && node.id == osm_entrance_id)
    }
}

/// Where a resolved entrance set came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntranceSource {
    /// The current set already contained the destination.
    Current,
    /// Entrances of venue data loaded earlier.
    CachedVenue,
    /// Freshly fetched venue data.
    Venue,
    /// Generic entrance search around the destination.
    AreaSearch,
    /// Nothing found; the destination stands in for its entrances.
    Destination,
}

#[derive(Debug, Clone)]
pub struct ResolveRequest<'a> {
    pub destination: &'a PointOfInterest,
    pub current_entrances: &'a [PointOfInterest],
    /// The venue selected by the user, if any.
    pub venue: Option<&'a PointOfInterest>,
    pub loaded_venue: Option<&'a LoadedVenue>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntranceResolution {
    /// Destination the resolution was computed for.
    pub destination: DestinationKey,
    pub entrances: Vec<PointOfInterest>,
    /// Replacement venue data, when it was fetched during resolution.
    pub venue: Option<LoadedVenue>,
    pub source: EntranceSource,
}

pub struct EntranceResolver<'a> {
    search: &'a dyn EntranceSearch,
    nodes: &'a dyn NodeLookup,
    venues: &'a dyn VenueDataSource,
}

impl<'a> EntranceResolver<'a> {
    pub fn new(search: &'a dyn EntranceSearch, nodes: &'a dyn NodeLookup, venues: &'a dyn VenueDataSource) -> Self {
        Self { search, nodes, venues }
    }

    pub fn resolve(&self, request: &ResolveRequest<'_>) -> EntranceResolution {
        let destination = request.destination;
        let mut resolution = EntranceResolution {
            destination: destination.destination_key(),
            entrances: Vec::new(),
            venue: None,
            source: EntranceSource::Destination,
        };

        if request
            .current_entrances
            .iter()
            .any(|entrance| entrance.same_identity(destination))
        {
            resolution.entrances = request.current_entrances.to_vec();
            resolution.source = EntranceSource::Current;
            return resolution;
        }

        if request.venue.is_some_and(|venue| venue.same_identity(destination)) {
            match request.loaded_venue.filter(|loaded| loaded.describes(destination)) {
                Some(loaded) => {
                    resolution.entrances = loaded.entrance_nodes.clone();
                    resolution.source = EntranceSource::CachedVenue;
                }
                None => {
                    let loaded = self.load_venue(destination);
                    resolution.entrances = loaded.entrance_nodes.clone();
                    resolution.source = EntranceSource::Venue;
                    resolution.venue = Some(loaded);
                }
            }
        }

        if resolution.entrances.is_empty() {
            resolution.entrances = match self.search.entrances_near(destination.location) {
                Ok(found) => found,
                Err(err) => {
                    warn!(destination = destination.id, error = %err, "entrance search failed");
                    Vec::new()
                }
            };
            resolution.source = EntranceSource::AreaSearch;
        }

        if resolution.entrances.is_empty() {
            resolution.entrances = vec![destination.clone()];
            resolution.source = EntranceSource::Destination;
        }

        debug!(
            destination = destination.id,
            entrances = resolution.entrances.len(),
            source = ?resolution.source,
            "resolved entrances"
        );
        resolution
    }

    /// Fetch venue data and keep only workplace entrances whose entrance
    /// node exists in the map data.
    pub fn load_venue(&self, poi: &PointOfInterest) -> LoadedVenue {
        let mut data = self.venues.venue_data(poi);
        let mut entrance_nodes = Vec::new();

        if let Some(Some(venue)) = data.success_mut() {
            sort_by_delivery_priority(&mut venue.entrances);
            let ids: Vec<i64> = venue.entrances.iter().map(|e| e.osm_entrance_id).collect();
            let nodes = match self.nodes.nodes_by_id(&ids) {
                Ok(nodes) => nodes,
                Err(err) => {
                    warn!(venue = poi.id, error = %err, "entrance node lookup failed");
                    Vec::new()
                }
            };

            venue.entrances.retain(|entrance| {
                match nodes
                    .iter()
                    .find(|node| node.kind == ElementKind::Node && node.id == entrance.osm_entrance_id)
                {
                    Some(node) => {
                        entrance_nodes.push(node.clone());
                        true
                    }
                    None => {
                        debug!(entrance = entrance.osm_entrance_id, "dropping unresolvable entrance");
                        false
                    }
                }
            });
        }

        LoadedVenue { data, entrance_nodes }
    }
}
