//! Contracts for the external services the planner consults.
//!
//! All calls are blocking and may be issued from worker threads, hence the
//! `Send + Sync` bounds. Concrete HTTP adapters live in [`crate::overpass`],
//! [`crate::olmap`] and [`crate::osrm`]; tests provide in-memory ones.

use crate::error::Result;
use crate::geometry::LatLng;
use crate::model::{NetworkState, PointOfInterest, RouteQuery, Venue};
use crate::polyline::{MultiLineString, Polyline};

/// Area search for building entrances around a coordinate.
pub trait EntranceSearch: Send + Sync {
    /// Entrance nodes within a small fixed radius. May be empty.
    fn entrances_near(&self, location: LatLng) -> Result<Vec<PointOfInterest>>;
}

/// Resolves node ids to map features.
pub trait NodeLookup: Send + Sync {
    /// Nodes for the ids that resolve; unknown ids are omitted.
    /// An empty `ids` must not reach the network.
    fn nodes_by_id(&self, ids: &[i64]) -> Result<Vec<PointOfInterest>>;
}

/// Finds highways with a given name near a coordinate.
pub trait StreetMatcher: Send + Sync {
    /// Geometry of same-named highways within 100 meters. May be empty.
    fn matching_street(&self, location: LatLng, street: &str) -> Result<MultiLineString>;
}

/// Curated venue data keyed by the map feature it annotates.
pub trait VenueDataSource: Send + Sync {
    /// `Success(None)` means the feature is known but carries no venue.
    fn venue_data(&self, poi: &PointOfInterest) -> NetworkState<Option<Venue>>;
}

/// External routing backend.
pub trait PathPlanner: Send + Sync {
    /// Computes a route for `query`, handing each geometry segment to `emit`
    /// as soon as it is known. Returns once the route is complete.
    fn plan(&self, query: &RouteQuery, emit: &mut dyn FnMut(Polyline)) -> Result<()>;
}

