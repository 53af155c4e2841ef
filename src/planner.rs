//! Route query planning.
//!
//! Turns the current origin, destination, entrance set and unloading places
//! into the list of queries for the path planner, or explains why nothing
//! can be routed yet.

use std::borrow::Cow;

use tracing::{debug, warn};

use crate::geometry::{LatLng, nearest_point_on_lines};
use crate::model::{ElementKind, PointOfInterest, RouteQuery, TravelMode};
use crate::traits::StreetMatcher;
use crate::unloading::{SelectedUnloadingPlace, WalkTarget};

/// Routes are only planned when origin and destination are closer than this.
pub const MAX_ROUTING_DISTANCE_M: f64 = 200.0;

/// Offset, in degrees on both axes, between an unloading place and the
/// target of the car leg ending there. Keeps the planner from receiving a
/// target that coincides with the end of the walking leg.
pub const UNLOADING_TARGET_NUDGE_DEG: f64 = 0.000_001;

/// Why no queries were produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unreachable {
    /// There is no origin and none could be derived from the street.
    NoOrigin,
    /// The origin is too far from the destination for a useful route.
    TooFar,
}

impl Unreachable {
    pub fn code(self) -> &'static str {
        match self {
            Self::NoOrigin => "no-origin",
            Self::TooFar => "too-far",
        }
    }
}

impl std::fmt::Display for Unreachable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlanOutcome {
    Queries(Vec<RouteQuery>),
    Unreachable(Unreachable),
}

impl PlanOutcome {
    pub fn queries(&self) -> &[RouteQuery] {
        match self {
            Self::Queries(queries) => queries,
            Self::Unreachable(_) => &[],
        }
    }
}

/// Inputs of one planning decision.
#[derive(Debug, Clone)]
pub struct PlanInput<'a> {
    pub origin: Option<LatLng>,
    pub destination: &'a PointOfInterest,
    pub entrances: &'a [PointOfInterest],
    pub unloading_places: &'a [SelectedUnloadingPlace],
}

/// Decide which queries to send to the path planner.
///
/// Query order follows the order of `unloading_places` and `entrances`.
pub fn plan_queries(input: &PlanInput<'_>, streets: &dyn StreetMatcher) -> PlanOutcome {
    if !input.unloading_places.is_empty() {
        let queries = unloading_queries(input, input.unloading_places);
        debug!(queries = queries.len(), "planned unloading place queries");
        return PlanOutcome::Queries(queries);
    }

    let targets = targets(input.destination, input.entrances);

    let destination = input.destination.location;
    let mut origin = input.origin;
    let close_enough = origin.is_some_and(|o| o.distance_to(destination) < MAX_ROUTING_DISTANCE_M);
    if !close_enough {
        if let Some(snapped) = snap_to_street(input.destination, &targets, streets) {
            debug!(lat = snapped.lat, lon = snapped.lon, "origin snapped to street");
            origin = Some(snapped);
        }
    }

    let Some(origin) = origin else {
        return PlanOutcome::Unreachable(Unreachable::NoOrigin);
    };
    if origin.distance_to(destination) >= MAX_ROUTING_DISTANCE_M {
        return PlanOutcome::Unreachable(Unreachable::TooFar);
    }

    PlanOutcome::Queries(
        targets
            .iter()
            .map(|target| RouteQuery::new(origin, target.clone(), TravelMode::Default))
            .collect(),
    )
}

/// Entrances matching the destination, or all of them if none match.
fn targets<'a>(destination: &'a PointOfInterest, entrances: &'a [PointOfInterest]) -> Cow<'a, [PointOfInterest]> {
    if entrances.is_empty() {
        return Cow::Owned(vec![destination.clone()]);
    }
    let matching: Vec<PointOfInterest> = entrances
        .iter()
        .filter(|entrance| entrance.same_identity(destination))
        .cloned()
        .collect();
    if matching.is_empty() {
        Cow::Borrowed(entrances)
    } else {
        Cow::Owned(matching)
    }
}

fn unloading_queries(input: &PlanInput<'_>, places: &[SelectedUnloadingPlace]) -> Vec<RouteQuery> {
    let mut queries = Vec::new();
    for selected in places {
        let place = &selected.place;
        if place.access_points.is_empty() {
            for target in walk_targets(input, &selected.walk_to) {
                queries.push(RouteQuery::new(place.location, target, TravelMode::DeliveryWalking));
            }
            continue;
        }
        let parking = PointOfInterest::synthetic(place.location.nudged(UNLOADING_TARGET_NUDGE_DEG));
        for access_point in &place.access_points {
            queries.push(RouteQuery::new(*access_point, parking.clone(), TravelMode::DeliveryCar));
        }
    }
    queries
}

fn walk_targets(input: &PlanInput<'_>, walk_to: &WalkTarget) -> Vec<PointOfInterest> {
    match walk_to {
        WalkTarget::Destination => vec![input.destination.clone()],
        WalkTarget::Entrances(ids) => ids
            .iter()
            .filter_map(|id| {
                input
                    .entrances
                    .iter()
                    .find(|entrance| entrance.kind == ElementKind::Node && entrance.id == *id)
                    .cloned()
            })
            .collect(),
    }
}

/// Nearest point on the destination's street, if its name is known.
fn snap_to_street(
    destination: &PointOfInterest,
    targets: &[PointOfInterest],
    streets: &dyn StreetMatcher,
) -> Option<LatLng> {
    let (target, street) = match destination.street() {
        Some(street) => (destination, street),
        None => {
            let target = targets.first()?;
            (target, target.street()?)
        }
    };

    let geometry = match streets.matching_street(target.location, street) {
        Ok(geometry) => geometry,
        Err(err) => {
            warn!(street, error = %err, "street lookup failed");
            return None;
        }
    };
    nearest_point_on_lines(&geometry, target.location)
}
