//! Multimodal routing engine.
//!
//! Computes shortest walking routes over a street graph built from
//! OpenStreetMap data (A* with a great-circle heuristic) and earliest-arrival
//! transit journeys over a GTFS timetable (round-based RAPTOR with footpath
//! transfers).

pub mod domain;
pub mod engine;
pub mod graph;
pub mod gtfs;
pub mod osm;
pub mod planner;
pub mod web;
