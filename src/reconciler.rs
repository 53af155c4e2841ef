//! Dispatching route queries and folding their results into one route.
//!
//! Queries run in parallel on the rayon pool; segments are handed back to
//! the calling thread in completion order. The caller decides, per segment,
//! whether the cycle is still current. Once it is not, queries that have not
//! started yet are skipped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;

use rayon::prelude::*;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::error::CollaboratorError;
use crate::model::{RouteQuery, TravelMode};
use crate::polyline::Polyline;
use crate::traits::PathPlanner;

/// A piece of route geometry produced for one query.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteSegment {
    /// Index of the query in the submitted list.
    pub query: usize,
    pub mode: TravelMode,
    pub line: Polyline,
}

/// Route geometry accumulated during a planning cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteGeometry {
    segments: Vec<RouteSegment>,
}

impl RouteGeometry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> &[RouteSegment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn push(&mut self, segment: RouteSegment) {
        self.segments.push(segment);
    }

    /// GeoJSON `FeatureCollection` with one `LineString` per segment.
    pub fn to_geojson(&self) -> Value {
        let features: Vec<Value> = self
            .segments
            .iter()
            .map(|segment| {
                json!({
                    "type": "Feature",
                    "properties": { "mode": segment.mode, "query": segment.query },
                    "geometry": {
                        "type": "LineString",
                        "coordinates": segment.line.to_lon_lat(),
                    },
                })
            })
            .collect();
        json!({ "type": "FeatureCollection", "features": features })
    }
}

/// What the caller did with a delivered segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Accepted,
    /// The cycle was superseded; the segment was dropped.
    Stale,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanSummary {
    pub completed: usize,
    pub failed: usize,
    /// Queries never sent because the cycle went stale first.
    pub skipped: usize,
    pub accepted_segments: usize,
    pub stale: bool,
}

enum Message {
    Segment(RouteSegment),
    Finished { query: usize, error: Option<CollaboratorError> },
    Skipped,
}

pub struct Reconciler<'a> {
    planner: &'a dyn PathPlanner,
}

impl<'a> Reconciler<'a> {
    pub fn new(planner: &'a dyn PathPlanner) -> Self {
        Self { planner }
    }

    /// Run every query and feed each segment to `on_segment` as it arrives.
    ///
    /// A failed query is logged and does not affect the others.
    pub fn run_plan<F>(&self, queries: &[RouteQuery], mut on_segment: F) -> PlanSummary
    where
        F: FnMut(RouteSegment) -> Disposition,
    {
        let mut summary = PlanSummary::default();
        if queries.is_empty() {
            return summary;
        }

        let cancelled = AtomicBool::new(false);
        let (tx, rx) = mpsc::channel::<Message>();
        let planner = self.planner;

        std::thread::scope(|scope| {
            let cancelled = &cancelled;
            scope.spawn(move || {
                queries.par_iter().enumerate().for_each_with(tx, |tx, (index, query)| {
                    if cancelled.load(Ordering::Acquire) {
                        let _ = tx.send(Message::Skipped);
                        return;
                    }
                    let mut emit = |line: Polyline| {
                        let _ = tx.send(Message::Segment(RouteSegment {
                            query: index,
                            mode: query.mode,
                            line,
                        }));
                    };
                    let error = planner.plan(query, &mut emit).err();
                    let _ = tx.send(Message::Finished { query: index, error });
                });
            });

            // Ends once every worker has dropped its sender.
            for message in rx {
                match message {
                    Message::Segment(segment) => {
                        if summary.stale {
                            continue;
                        }
                        match on_segment(segment) {
                            Disposition::Accepted => summary.accepted_segments += 1,
                            Disposition::Stale => {
                                debug!("planning cycle superseded, dropping results");
                                summary.stale = true;
                                cancelled.store(true, Ordering::Release);
                            }
                        }
                    }
                    Message::Finished { query, error: None } => {
                        summary.completed += 1;
                        debug!(query, "route query completed");
                    }
                    Message::Finished { query, error: Some(err) } => {
                        summary.failed += 1;
                        warn!(query, error = %err, "route query failed");
                    }
                    Message::Skipped => summary.skipped += 1,
                }
            }
        });

        summary
    }
}
