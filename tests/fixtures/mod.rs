//! Test fixtures for gatesolve-planner.
//!
//! Provides:
//! - Helsinki locations with known relative distances
//! - An in-memory map standing in for every external service
//! - A gate for holding a service call open while the test changes state

#![allow(dead_code)]

pub mod helsinki_locations;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use gatesolve_planner::error::Result;
use gatesolve_planner::geometry::LatLng;
use gatesolve_planner::model::{
    DeliveryType, ElementKind, NetworkState, PointOfInterest, RouteQuery, UnloadingPlace, Venue, WorkplaceEntrance,
};
use gatesolve_planner::polyline::{MultiLineString, Polyline};
use gatesolve_planner::state::Services;
use gatesolve_planner::traits::{EntranceSearch, NodeLookup, PathPlanner, StreetMatcher, VenueDataSource};

pub use helsinki_locations::*;

/// Map data served from memory. Routes are straight lines.
#[derive(Default)]
pub struct MockMap {
    pub area_entrances: Vec<PointOfInterest>,
    pub nodes: Vec<PointOfInterest>,
    pub streets: MultiLineString,
    pub venue: Option<Venue>,
    pub route_calls: AtomicUsize,
}

impl EntranceSearch for MockMap {
    fn entrances_near(&self, _location: LatLng) -> Result<Vec<PointOfInterest>> {
        Ok(self.area_entrances.clone())
    }
}

impl NodeLookup for MockMap {
    fn nodes_by_id(&self, ids: &[i64]) -> Result<Vec<PointOfInterest>> {
        Ok(self.nodes.iter().filter(|node| ids.contains(&node.id)).cloned().collect())
    }
}

impl StreetMatcher for MockMap {
    fn matching_street(&self, _location: LatLng, _street: &str) -> Result<MultiLineString> {
        Ok(self.streets.clone())
    }
}

impl VenueDataSource for MockMap {
    fn venue_data(&self, poi: &PointOfInterest) -> NetworkState<Option<Venue>> {
        NetworkState::Success(self.venue.clone().filter(|venue| venue.poi.same_identity(poi)))
    }
}

impl PathPlanner for MockMap {
    fn plan(&self, query: &RouteQuery, emit: &mut dyn FnMut(Polyline)) -> Result<()> {
        self.route_calls.fetch_add(1, Ordering::SeqCst);
        emit(Polyline::new(vec![query.origin, query.target.location]));
        Ok(())
    }
}

impl MockMap {
    pub fn services(self: &Arc<Self>) -> Services {
        Services {
            entrance_search: self.clone(),
            node_lookup: self.clone(),
            street_matcher: self.clone(),
            venue_data: self.clone(),
            path_planner: self.clone(),
        }
    }
}

/// Holds the first call passing through it until released.
pub struct Gate {
    started: Mutex<Option<Sender<()>>>,
    release: Mutex<Option<Receiver<()>>>,
}

/// Test-side ends of a [`Gate`].
pub struct GateHandle {
    pub started: Receiver<()>,
    pub release: Sender<()>,
}

impl Gate {
    pub fn new() -> (Self, GateHandle) {
        let (started_tx, started_rx) = channel();
        let (release_tx, release_rx) = channel();
        let gate = Self {
            started: Mutex::new(Some(started_tx)),
            release: Mutex::new(Some(release_rx)),
        };
        (
            gate,
            GateHandle {
                started: started_rx,
                release: release_tx,
            },
        )
    }

    pub fn pass(&self) {
        let started = self.started.lock().unwrap().take();
        let release = self.release.lock().unwrap().take();
        if let (Some(started), Some(release)) = (started, release) {
            started.send(()).unwrap();
            release.recv().unwrap();
        }
    }
}

/// Entrance search that blocks on its first call.
pub struct GatedSearch {
    pub map: Arc<MockMap>,
    pub gate: Gate,
}

impl EntranceSearch for GatedSearch {
    fn entrances_near(&self, location: LatLng) -> Result<Vec<PointOfInterest>> {
        self.gate.pass();
        self.map.entrances_near(location)
    }
}

/// Path planner that blocks on its first call.
pub struct GatedPlanner {
    pub map: Arc<MockMap>,
    pub gate: Gate,
}

impl PathPlanner for GatedPlanner {
    fn plan(&self, query: &RouteQuery, emit: &mut dyn FnMut(Polyline)) -> Result<()> {
        self.gate.pass();
        self.map.plan(query, emit)
    }
}

/// Poll `condition` until it holds; panics after a few seconds.
pub fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        std::thread::sleep(Duration::from_millis(1));
    }
}

pub fn node(id: i64, location: &Location) -> PointOfInterest {
    PointOfInterest::new(ElementKind::Node, id, location.point())
}

pub fn cafe() -> PointOfInterest {
    PointOfInterest::new(ElementKind::Way, 4242, CAFE.point()).with_tag("name", CAFE.name)
}

pub fn loading_bay() -> UnloadingPlace {
    UnloadingPlace {
        id: 7,
        location: LOADING_BAY.point(),
        access_points: LOADING_BAY_ACCESS.iter().map(Location::point).collect(),
        osm_feature_id: None,
        description: Some("Loading bay behind the building".to_string()),
        image: None,
    }
}

pub fn workplace_entrance(osm_entrance_id: i64, delivery_type: DeliveryType) -> WorkplaceEntrance {
    WorkplaceEntrance {
        id: osm_entrance_id * 10,
        osm_entrance_id,
        delivery_type,
        delivery_types: Vec::new(),
        description: None,
        unloading_places: Vec::new(),
        delivery_instructions: None,
        delivery_hours: None,
        image: None,
    }
}

/// The cafe with a main entrance (node 11) that owns [`loading_bay`].
pub fn cafe_venue() -> Venue {
    let mut main = workplace_entrance(11, DeliveryType::Main);
    main.unloading_places.push(loading_bay());
    Venue {
        poi: cafe(),
        name: Some(CAFE.name.to_string()),
        entrances: vec![main],
        delivery_instructions: None,
        delivery_hours: Some("Mo-Fr 07:00-10:00".to_string()),
        profile_images: Vec::new(),
    }
}
