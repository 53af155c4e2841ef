//! The planning state record and the session operating on it.
//!
//! All inputs and outputs of route planning live in one [`PlanningState`].
//! Slow work (fetches, path planning) runs without holding its lock; results
//! are written back only after re-checking, against the state as it is at
//! write time, that the inputs they were computed from are still current.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use crate::config::PlannerConfig;
use crate::entrances::{EntranceResolution, EntranceResolver, EntranceSource, LoadedVenue, ResolveRequest};
use crate::geometry::LatLng;
use crate::links::{external_directions_url, route_path};
use crate::model::{ElementKind, NetworkState, PlanningInputSnapshot, PointOfInterest, UnloadingPlace, UnloadingPlaceId, Venue};
use crate::olmap::OlmapClient;
use crate::osrm::OsrmClient;
use crate::overpass::OverpassClient;
use crate::planner::{MAX_ROUTING_DISTANCE_M, PlanInput, PlanOutcome, Unreachable, plan_queries};
use crate::reconciler::{Disposition, PlanSummary, Reconciler, RouteGeometry, RouteSegment};
use crate::traits::{EntranceSearch, NodeLookup, PathPlanner, StreetMatcher, VenueDataSource};
use crate::unloading::{select_unloading_places, venue_unloading_places};
use crate::viewport::{Viewport, fit};

/// Geolocation updates closer than this to the origin do not move it.
pub const GEOLOCATION_MOVE_THRESHOLD_M: f64 = 20.0;

/// Share of the map height covered by the venue panel.
pub const VENUE_PANEL_OCCLUSION: f64 = 0.5;

/// User-facing ways out of an unreachable destination.
#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryAction {
    /// Fall back from the explicit origin to the device position.
    UndoOrigin,
    UndoDestination,
    /// Hand the trip over to an external map service.
    ExternalDirections(String),
}

/// Why no route is shown, with what the user can do about it.
#[derive(Debug, Clone, PartialEq)]
pub struct UnreachableNotice {
    pub reason: Unreachable,
    pub message: &'static str,
    pub actions: Vec<RecoveryAction>,
}

impl UnreachableNotice {
    fn new(reason: Unreachable, origin: Option<LatLng>, origin_explicit: bool, destination: LatLng) -> Self {
        match (reason, origin) {
            (Unreachable::TooFar, Some(origin)) => {
                let mut actions = Vec::new();
                if origin_explicit {
                    actions.push(RecoveryAction::UndoOrigin);
                }
                actions.push(RecoveryAction::UndoDestination);
                actions.push(RecoveryAction::ExternalDirections(external_directions_url(origin, destination)));
                Self {
                    reason,
                    message: if origin_explicit {
                        "Origin is too far for showing routes."
                    } else {
                        "Routes show when distance is shorter."
                    },
                    actions,
                }
            }
            _ => Self {
                reason,
                message: "Routes show once an origin is known.",
                actions: vec![RecoveryAction::UndoDestination],
            },
        }
    }
}

/// Everything route planning reads and writes.
#[derive(Debug, Clone, Default)]
pub struct PlanningState {
    origin: Option<LatLng>,
    origin_explicit: bool,
    geolocation: Option<LatLng>,
    destination: Option<PointOfInterest>,
    venue: Option<PointOfInterest>,
    loaded_venue: Option<LoadedVenue>,
    entrances: Vec<PointOfInterest>,
    /// Bumped whenever `entrances` is replaced.
    entrance_set: u64,
    unloading_preference: Option<UnloadingPlaceId>,
    /// Bumped when a planning cycle starts or the venue is closed.
    cycle: u64,
    route: RouteGeometry,
    unreachable: Option<UnreachableNotice>,
}

impl PlanningState {
    pub fn origin(&self) -> Option<LatLng> {
        self.origin
    }

    pub fn origin_explicit(&self) -> bool {
        self.origin_explicit
    }

    pub fn geolocation(&self) -> Option<LatLng> {
        self.geolocation
    }

    pub fn destination(&self) -> Option<&PointOfInterest> {
        self.destination.as_ref()
    }

    pub fn venue(&self) -> Option<&PointOfInterest> {
        self.venue.as_ref()
    }

    pub fn loaded_venue(&self) -> Option<&LoadedVenue> {
        self.loaded_venue.as_ref()
    }

    pub fn entrances(&self) -> &[PointOfInterest] {
        &self.entrances
    }

    pub fn unloading_preference(&self) -> Option<UnloadingPlaceId> {
        self.unloading_preference
    }

    /// Number of planning cycles started, plus venue closes.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn route(&self) -> &RouteGeometry {
        &self.route
    }

    pub fn unreachable(&self) -> Option<&UnreachableNotice> {
        self.unreachable.as_ref()
    }

    /// Unloading places of the selected venue, for a selection list.
    pub fn unloading_candidates(&self) -> Vec<UnloadingPlace> {
        self.current_venue_data().map(venue_unloading_places).unwrap_or_default()
    }

    pub fn destination_is_venue(&self) -> bool {
        match (&self.destination, &self.venue) {
            (Some(destination), Some(venue)) => destination.same_identity(venue),
            _ => false,
        }
    }

    /// Loaded venue data, if it describes the selected venue.
    fn current_venue(&self) -> Option<&LoadedVenue> {
        let venue = self.venue.as_ref()?;
        self.loaded_venue.as_ref().filter(|loaded| loaded.describes(venue))
    }

    fn current_venue_data(&self) -> Option<&Venue> {
        self.current_venue()?.venue()
    }

    fn set_entrances(&mut self, entrances: Vec<PointOfInterest>) {
        self.entrances = entrances;
        self.entrance_set += 1;
    }

    fn clear_route(&mut self) {
        self.route = RouteGeometry::new();
        self.unreachable = None;
    }

    /// Start a planning cycle; results of every earlier cycle become stale.
    fn begin_cycle(&mut self) {
        self.cycle += 1;
        self.clear_route();
    }

    /// Inputs of a planning cycle started now; `None` without a destination.
    pub fn snapshot(&self) -> Option<PlanningInputSnapshot> {
        Some(PlanningInputSnapshot {
            origin: self.origin,
            destination: self.destination.as_ref()?.destination_key(),
            entrance_set: self.entrance_set,
            unloading_place: self.unloading_preference,
            cycle: self.cycle,
        })
    }

    pub fn is_current(&self, snapshot: &PlanningInputSnapshot) -> bool {
        self.snapshot().as_ref() == Some(snapshot)
    }

    /// Install resolved entrances unless the destination changed meanwhile.
    pub fn commit_entrances(&mut self, resolution: EntranceResolution) -> bool {
        let current = self.destination.as_ref().map(PointOfInterest::destination_key);
        if current != Some(resolution.destination) {
            return false;
        }
        if let Some(loaded) = resolution.venue {
            if self.destination_is_venue() {
                self.loaded_venue = Some(loaded);
            }
        }
        self.set_entrances(resolution.entrances);
        true
    }

    /// Add a segment to the route of the cycle identified by `snapshot`.
    pub fn commit_segment(&mut self, snapshot: &PlanningInputSnapshot, segment: RouteSegment) -> Disposition {
        if !self.is_current(snapshot) {
            return Disposition::Stale;
        }
        self.route.push(segment);
        Disposition::Accepted
    }
}

/// The external services a session talks to.
#[derive(Clone)]
pub struct Services {
    pub entrance_search: Arc<dyn EntranceSearch>,
    pub node_lookup: Arc<dyn NodeLookup>,
    pub street_matcher: Arc<dyn StreetMatcher>,
    pub venue_data: Arc<dyn VenueDataSource>,
    pub path_planner: Arc<dyn PathPlanner>,
}

impl Services {
    /// HTTP-backed services for the configured endpoints.
    pub fn from_config(config: &PlannerConfig) -> Result<Self, reqwest::Error> {
        let overpass = Arc::new(OverpassClient::new(config.overpass.clone())?);
        Ok(Self {
            entrance_search: overpass.clone(),
            node_lookup: overpass.clone(),
            street_matcher: overpass,
            venue_data: Arc::new(OlmapClient::new(config.olmap.clone())?),
            path_planner: Arc::new(OsrmClient::new(config.osrm.clone())?),
        })
    }
}

/// Result of [`Session::refresh_entrances`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    NoDestination,
    Applied(EntranceSource),
    /// The destination changed while resolving; nothing was written.
    Stale,
}

/// Result of [`Session::plan_route`].
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// No destination, or its entrances are not resolved yet.
    Idle,
    Unreachable(UnreachableNotice),
    Planned { queries: usize, summary: PlanSummary },
}

/// A user's route planning session.
pub struct Session {
    state: Mutex<PlanningState>,
    services: Services,
}

impl Session {
    pub fn new(services: Services) -> Self {
        Self {
            state: Mutex::new(PlanningState::default()),
            services,
        }
    }

    pub fn from_config(config: &PlannerConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::new(Services::from_config(config)?))
    }

    fn lock(&self) -> MutexGuard<'_, PlanningState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A copy of the current state.
    pub fn state(&self) -> PlanningState {
        self.lock().clone()
    }

    /// Path for the current origin and destination.
    pub fn route_path(&self) -> String {
        let state = self.lock();
        route_path(state.origin, state.destination.as_ref().map(|d| d.location))
    }

    /// A map feature or clicked point became the destination.
    pub fn select_destination(&self, destination: PointOfInterest) {
        let mut state = self.lock();
        debug!(destination = destination.id, "destination selected");
        state.destination = Some(destination);
        state.unloading_preference = None;
        state.set_entrances(Vec::new());
        state.clear_route();
    }

    /// A searched place became both destination and venue.
    pub fn select_venue(&self, venue: PointOfInterest) {
        let mut state = self.lock();
        debug!(venue = venue.id, "venue selected");
        state.destination = Some(venue.clone());
        state.venue = Some(venue);
        // Resolved by the next `refresh_entrances`.
        state.loaded_venue = Some(LoadedVenue {
            data: NetworkState::Loading,
            entrance_nodes: Vec::new(),
        });
        state.unloading_preference = None;
        state.set_entrances(Vec::new());
        state.clear_route();
    }

    /// Route to one entrance of the loaded venue. Returns `false` when the
    /// venue has no such entrance.
    pub fn select_entrance(&self, osm_entrance_id: i64) -> bool {
        let mut state = self.lock();
        let Some(loaded) = state.current_venue() else {
            return false;
        };
        let Some(entrance) = loaded.entrance_node(osm_entrance_id).cloned() else {
            return false;
        };
        let entrances = loaded.entrance_nodes.clone();
        state.destination = Some(entrance);
        state.unloading_preference = None;
        state.set_entrances(entrances);
        true
    }

    /// Deliver via one unloading place of the venue.
    pub fn select_unloading_place(&self, id: UnloadingPlaceId) -> bool {
        let mut state = self.lock();
        let Some(loaded) = state.current_venue() else {
            return false;
        };
        let entrances = loaded.entrance_nodes.clone();
        let venue = state.venue.clone();
        state.unloading_preference = Some(id);
        state.destination = venue;
        state.set_entrances(entrances);
        true
    }

    pub fn close_venue(&self) {
        let mut state = self.lock();
        state.venue = None;
        state.loaded_venue = None;
        // Unloading places of the venue no longer apply to running cycles.
        state.cycle += 1;
    }

    /// An explicitly placed origin.
    pub fn set_origin(&self, origin: LatLng) {
        let mut state = self.lock();
        state.origin = Some(origin);
        state.origin_explicit = true;
    }

    /// Record the device position. Moves an implicit origin when it is
    /// missing or has drifted; returns whether the origin changed.
    pub fn update_geolocation(&self, position: LatLng) -> bool {
        let mut state = self.lock();
        state.geolocation = Some(position);
        let moved = state
            .origin
            .is_none_or(|origin| origin.distance_to(position) > GEOLOCATION_MOVE_THRESHOLD_M);
        if state.origin_explicit || !moved {
            return false;
        }
        state.origin = Some(position);
        true
    }

    pub fn undo_origin(&self) {
        let mut state = self.lock();
        let geolocation = state.geolocation;
        state.origin = geolocation;
        state.origin_explicit = false;
    }

    pub fn undo_destination(&self) {
        let mut state = self.lock();
        state.destination = None;
        state.set_entrances(Vec::new());
        state.clear_route();
    }

    /// Resolve entrances for the current destination and store them if the
    /// destination is unchanged by the time they arrive.
    pub fn refresh_entrances(&self) -> RefreshOutcome {
        let (destination, current, venue, loaded) = {
            let state = self.lock();
            let Some(destination) = state.destination.clone() else {
                return RefreshOutcome::NoDestination;
            };
            (
                destination,
                state.entrances.clone(),
                state.venue.clone(),
                state.loaded_venue.clone(),
            )
        };

        let resolver = EntranceResolver::new(
            self.services.entrance_search.as_ref(),
            self.services.node_lookup.as_ref(),
            self.services.venue_data.as_ref(),
        );
        let resolution = resolver.resolve(&ResolveRequest {
            destination: &destination,
            current_entrances: &current,
            venue: venue.as_ref(),
            loaded_venue: loaded.as_ref(),
        });

        let source = resolution.source;
        if self.lock().commit_entrances(resolution) {
            RefreshOutcome::Applied(source)
        } else {
            info!(destination = destination.id, "destination changed, discarding entrances");
            RefreshOutcome::Stale
        }
    }

    /// Run one planning cycle for the current inputs.
    ///
    /// The displayed route is cleared first; segments then accumulate as
    /// they complete, until the inputs change or another cycle starts.
    pub fn plan_route(&self) -> CycleOutcome {
        let (snapshot, origin, origin_explicit, destination, entrances, unloading) = {
            let mut state = self.lock();
            if state.destination.is_none() || state.entrances.is_empty() {
                return CycleOutcome::Idle;
            }
            state.begin_cycle();
            let Some(snapshot) = state.snapshot() else {
                return CycleOutcome::Idle;
            };

            let Some(destination) = state.destination.clone() else {
                return CycleOutcome::Idle;
            };
            let explicit_entrance = if state.destination_is_venue() {
                None
            } else {
                (destination.kind == ElementKind::Node).then_some(destination.id)
            };
            let unloading = select_unloading_places(
                state.current_venue_data(),
                explicit_entrance,
                state.unloading_preference,
            );
            (
                snapshot,
                state.origin,
                state.origin_explicit,
                destination,
                state.entrances.clone(),
                unloading,
            )
        };

        let input = PlanInput {
            origin,
            destination: &destination,
            entrances: &entrances,
            unloading_places: &unloading,
        };
        let queries = match plan_queries(&input, self.services.street_matcher.as_ref()) {
            PlanOutcome::Queries(queries) => queries,
            PlanOutcome::Unreachable(reason) => {
                let notice = UnreachableNotice::new(reason, origin, origin_explicit, destination.location);
                let mut state = self.lock();
                if state.is_current(&snapshot) {
                    state.unreachable = Some(notice.clone());
                }
                info!(destination = destination.id, reason = %reason, "route not planned");
                return CycleOutcome::Unreachable(notice);
            }
        };

        info!(destination = destination.id, queries = queries.len(), "planning route");
        let summary = Reconciler::new(self.services.path_planner.as_ref())
            .run_plan(&queries, |segment| self.lock().commit_segment(&snapshot, segment));

        CycleOutcome::Planned {
            queries: queries.len(),
            summary,
        }
    }

    /// Camera for a fresh destination: origin and destination when they are
    /// close enough to route between, else the destination alone.
    pub fn fit_selection(&self, viewport: &Viewport) -> Viewport {
        let state = self.lock();
        fit(viewport, &state.routing_markers(), 0.0)
    }

    /// Camera for an open venue panel: routing markers plus every entrance,
    /// above the panel.
    pub fn fit_venue(&self, viewport: &Viewport) -> Viewport {
        let state = self.lock();
        let mut points = state.routing_markers();
        points.extend(state.entrances.iter().map(|entrance| Some(entrance.location)));
        fit(viewport, &points, VENUE_PANEL_OCCLUSION)
    }
}

impl PlanningState {
    fn routing_markers(&self) -> Vec<Option<LatLng>> {
        let destination = self.destination.as_ref().map(|d| d.location);
        match (self.origin, destination) {
            (Some(origin), Some(dest)) if origin.distance_to(dest) < MAX_ROUTING_DISTANCE_M => {
                vec![Some(origin), Some(dest)]
            }
            _ => vec![destination],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: i64, lat: f64, lon: f64) -> PointOfInterest {
        PointOfInterest::new(ElementKind::Node, id, LatLng::new(lat, lon))
    }

    fn resolution_for(destination: &PointOfInterest, entrances: Vec<PointOfInterest>) -> EntranceResolution {
        EntranceResolution {
            destination: destination.destination_key(),
            entrances,
            venue: None,
            source: EntranceSource::AreaSearch,
        }
    }

    #[test]
    fn test_stale_entrances_are_not_committed() {
        let d1 = node(1, 60.17, 24.94);
        let d2 = node(2, 60.18, 24.95);
        let mut state = PlanningState {
            destination: Some(d2.clone()),
            ..PlanningState::default()
        };
        state.set_entrances(vec![d2.clone()]);

        assert!(!state.commit_entrances(resolution_for(&d1, vec![node(10, 60.17, 24.94)])));
        assert_eq!(state.entrances(), &[d2]);
    }

    #[test]
    fn test_commit_replaces_entrance_set_identity() {
        let d = node(1, 60.17, 24.94);
        let mut state = PlanningState {
            destination: Some(d.clone()),
            ..PlanningState::default()
        };
        let before = state.snapshot().unwrap();
        assert!(state.commit_entrances(resolution_for(&d, vec![d.clone()])));
        assert!(!state.is_current(&before));
    }

    #[test]
    fn test_segment_for_old_snapshot_is_dropped() {
        let mut state = PlanningState {
            destination: Some(node(1, 60.17, 24.94)),
            ..PlanningState::default()
        };
        let snapshot = state.snapshot().unwrap();
        state.origin = Some(LatLng::new(60.1701, 24.9401));
        let segment = RouteSegment {
            query: 0,
            mode: crate::model::TravelMode::Default,
            line: crate::polyline::Polyline::new(vec![]),
        };
        assert_eq!(state.commit_segment(&snapshot, segment), Disposition::Stale);
        assert!(state.route().is_empty());
    }

    #[test]
    fn test_new_cycle_stales_earlier_cycle_with_equal_inputs() {
        let mut state = PlanningState {
            destination: Some(node(1, 60.17, 24.94)),
            ..PlanningState::default()
        };
        state.begin_cycle();
        let first = state.snapshot().unwrap();
        state.begin_cycle();
        let second = state.snapshot().unwrap();

        let segment = RouteSegment {
            query: 0,
            mode: crate::model::TravelMode::DeliveryCar,
            line: crate::polyline::Polyline::new(vec![]),
        };
        assert_eq!(state.commit_segment(&first, segment.clone()), Disposition::Stale);
        assert_eq!(state.commit_segment(&second, segment), Disposition::Accepted);
        assert_eq!(state.route().segments().len(), 1);
    }

    #[test]
    fn test_notice_actions_depend_on_explicit_origin() {
        let origin = Some(LatLng::new(60.10, 24.90));
        let destination = LatLng::new(60.20, 25.10);
        let explicit = UnreachableNotice::new(Unreachable::TooFar, origin, true, destination);
        assert_eq!(explicit.actions[0], RecoveryAction::UndoOrigin);
        assert_eq!(explicit.actions.len(), 3);

        let implicit = UnreachableNotice::new(Unreachable::TooFar, origin, false, destination);
        assert_eq!(implicit.actions[0], RecoveryAction::UndoDestination);
        assert_eq!(implicit.message, "Routes show when distance is shorter.");
    }

    #[test]
    fn test_routing_markers_skip_far_origin() {
        let state = PlanningState {
            origin: Some(LatLng::new(60.10, 24.90)),
            destination: Some(node(1, 60.20, 25.10)),
            ..PlanningState::default()
        };
        assert_eq!(state.routing_markers(), vec![Some(LatLng::new(60.20, 25.10))]);
    }
}
