//! gatesolve-planner
//!
//! Delivery route planning to building entrances: which entrances to route
//! to, which route queries to send, and how their results are folded into
//! one displayed route while the user keeps changing the inputs.

pub mod config;
pub mod entrances;
pub mod error;
pub mod geometry;
pub mod links;
pub mod model;
pub mod olmap;
pub mod osrm;
pub mod overpass;
pub mod planner;
pub mod polyline;
pub mod reconciler;
pub mod state;
pub mod traits;
pub mod unloading;
pub mod viewport;
