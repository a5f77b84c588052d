//! Route planners.
//!
//! [`astar`] finds shortest walking paths over the street graph;
//! [`raptor`] finds earliest-arrival transit journeys over the timetable
//! index. Both allocate per-search state and never mutate the structures
//! they search, so one graph or index can serve any number of concurrent
//! queries.

pub mod astar;
pub mod raptor;

pub use astar::{a_star, distance_heuristic, time_heuristic, RouteError, StreetPath};
pub use raptor::{
    FootpathTransfer, JourneyLeg, RaptorConfig, RaptorResult, RaptorRouter, TransferTable,
};
