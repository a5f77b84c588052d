//! RAPTOR-shaped timetable index.
//!
//! RAPTOR scans whole routes rather than individual connections, so the
//! index groups trips by route pattern: for every route it stores the
//! canonical stop order and a matrix of trip times aligned to that order,
//! sorted by departure at the first stop. Within a route trips must not
//! overtake (FIFO); that is what makes the earliest-catchable-trip lookup a
//! plain lower-bound binary search.

use std::collections::HashMap;

use itertools::Itertools;
use tracing::{debug, warn};

use crate::domain::{RouteId, StopId, TransitTime, TripId};

use super::{StopTimeRecord, TripToRoute};

/// One stop of a route pattern, with its GTFS stop_sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternStop {
    pub stop_id: StopId,
    pub sequence: u32,
}

/// The canonical ordered stop list of a route.
///
/// Every trip indexed under the route is assumed to visit exactly these
/// stops in this order. Feeds that publish divergent patterns under one
/// route id must split them beforehand; this is not enforced here, and the
/// last trip processed wins on conflicts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    pub route_id: RouteId,
    pub stops: Vec<PatternStop>,
}

/// Arrival and departure of one trip at one pattern position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TripStopTime {
    pub arrival: TransitTime,
    pub departure: TransitTime,
}

/// The times of one trip, aligned positionally with its route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripVector {
    pub trip_id: TripId,
    pub stop_times: Vec<TripStopTime>,
}

/// Timetable index supporting the RAPTOR route-scan primitives.
#[derive(Debug, Default)]
pub struct StopTimeIndex {
    /// Routes serving each stop, duplicate-free.
    stop_routes: HashMap<StopId, Vec<RouteId>>,
    /// Canonical pattern per route.
    route_patterns: HashMap<RouteId, RoutePattern>,
    /// Position of a stop within a route's pattern, 0-based.
    stop_positions: HashMap<StopId, HashMap<RouteId, usize>>,
    /// Trips per route, each aligned to the pattern, sorted by departure at
    /// the first stop.
    route_trips: HashMap<RouteId, Vec<TripVector>>,
}

impl StopTimeIndex {
    /// Routes that serve the given stop; empty for unknown stops.
    pub fn routes_at_stop(&self, stop: &StopId) -> &[RouteId] {
        self.stop_routes
            .get(stop)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The ordered stop pattern of a route.
    pub fn stops_on_route(&self, route: &RouteId) -> Option<&RoutePattern> {
        self.route_patterns.get(route)
    }

    /// 0-based position of a stop within a route's pattern.
    pub fn stop_position_in_route(&self, stop: &StopId, route: &RouteId) -> Option<usize> {
        self.stop_positions.get(stop)?.get(route).copied()
    }

    /// Trip matrix of a route, sorted by first-stop departure.
    pub fn route_trips(&self, route: &RouteId) -> &[TripVector] {
        self.route_trips
            .get(route)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Index of the earliest trip departing `stop_index` at or after
    /// `min_departure`, or `None` when no trip is catchable.
    ///
    /// Relies on the FIFO invariant: the trip matrix is sorted by first-stop
    /// departure, and non-overtaking trips keep that order at every stop.
    pub fn earliest_trip_index(
        &self,
        route: &RouteId,
        stop_index: usize,
        min_departure: TransitTime,
    ) -> Option<usize> {
        let trips = self.route_trips(route);

        let i = trips.partition_point(|trip| {
            trip.stop_times
                .get(stop_index)
                .is_some_and(|st| st.departure < min_departure)
        });

        trips
            .get(i)
            .and_then(|trip| trip.stop_times.get(stop_index))
            .map(|_| i)
    }

    /// Number of indexed routes.
    pub fn route_count(&self) -> usize {
        self.route_patterns.len()
    }

    /// Number of indexed stops.
    pub fn stop_count(&self) -> usize {
        self.stop_routes.len()
    }
}

/// Build the index from parsed stop times and the trip → route mapping.
///
/// Trips without a route mapping are skipped. A trip that is missing one of
/// its route's pattern stops cannot be aligned and is dropped from the trip
/// matrix. Trips are processed in trip-id order so pattern conflicts resolve
/// deterministically.
pub fn build_index(stop_times: &[StopTimeRecord], trip_to_route: &TripToRoute) -> StopTimeIndex {
    // Group by trip, ordered along the trip by stop_sequence.
    let mut by_trip: HashMap<&TripId, Vec<&StopTimeRecord>> = stop_times
        .iter()
        .map(|st| (&st.trip_id, st))
        .into_group_map();
    for stops in by_trip.values_mut() {
        stops.sort_by_key(|st| st.stop_sequence);
    }

    // Union each route's (sequence -> stop) pairs across its trips.
    let mut route_sequences: HashMap<&RouteId, std::collections::BTreeMap<u32, &StopId>> =
        HashMap::new();
    let mut trips_of_route: HashMap<&RouteId, Vec<&TripId>> = HashMap::new();

    for (&trip_id, stops) in by_trip.iter().sorted_by_key(|(trip_id, _)| *trip_id) {
        let Some(route_id) = trip_to_route.get(trip_id) else {
            continue;
        };

        let sequences = route_sequences.entry(route_id).or_default();
        for st in stops {
            sequences.insert(st.stop_sequence, &st.stop_id);
        }
        trips_of_route.entry(route_id).or_default().push(trip_id);
    }

    let mut index = StopTimeIndex::default();

    for (route_id, sequences) in &route_sequences {
        let pattern = RoutePattern {
            route_id: (*route_id).clone(),
            stops: sequences
                .iter()
                .map(|(&sequence, &stop_id)| PatternStop {
                    stop_id: stop_id.clone(),
                    sequence,
                })
                .collect(),
        };

        for (position, stop) in pattern.stops.iter().enumerate() {
            let routes = index.stop_routes.entry(stop.stop_id.clone()).or_default();
            if !routes.contains(*route_id) {
                routes.push((*route_id).clone());
            }

            index
                .stop_positions
                .entry(stop.stop_id.clone())
                .or_default()
                .insert((*route_id).clone(), position);
        }

        index
            .route_patterns
            .insert((*route_id).clone(), pattern);
    }

    // Materialize each trip as a vector aligned to its route's pattern.
    for (route_id, trip_ids) in &trips_of_route {
        let pattern = &index.route_patterns[*route_id];
        let mut vectors = Vec::with_capacity(trip_ids.len());

        'trips: for &trip_id in trip_ids {
            let mut by_sequence: HashMap<u32, TripStopTime> = HashMap::new();
            for st in &by_trip[trip_id] {
                by_sequence.insert(
                    st.stop_sequence,
                    TripStopTime {
                        arrival: st.arrival,
                        departure: st.departure,
                    },
                );
            }

            let mut stop_times = Vec::with_capacity(pattern.stops.len());
            for stop in &pattern.stops {
                match by_sequence.get(&stop.sequence) {
                    Some(&st) => stop_times.push(st),
                    None => {
                        warn!(
                            trip = %trip_id,
                            route = %route_id,
                            sequence = stop.sequence,
                            "trip does not cover its route pattern, dropping from trip matrix"
                        );
                        continue 'trips;
                    }
                }
            }

            vectors.push(TripVector {
                trip_id: trip_id.clone(),
                stop_times,
            });
        }

        vectors.sort_by_key(|v| v.stop_times.first().map(|st| st.departure));
        index.route_trips.insert((*route_id).clone(), vectors);
    }

    debug!(
        routes = index.route_count(),
        stops = index.stop_count(),
        "built timetable index"
    );
    index
}
