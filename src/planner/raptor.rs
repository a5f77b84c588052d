//! Round-based RAPTOR earliest-arrival search.
//!
//! Round k computes, for every stop, the earliest arrival reachable with at
//! most k trips; footpath transfers are applied once at the end of each
//! round and cost no trip. The search state lives entirely in the router
//! call; the timetable index and transfer table are only read.

use std::collections::{HashMap, HashSet};

use tracing::{debug, instrument};

use crate::domain::{RouteId, StopId, TransitTime, TripId};
use crate::gtfs::StopTimeIndex;

/// Outgoing footpath transfers per stop.
///
/// Transfers are directed; symmetric footpaths appear once per direction.
pub type TransferTable = HashMap<StopId, Vec<FootpathTransfer>>;

/// A directed footpath to another stop with a fixed walking duration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FootpathTransfer {
    pub to: StopId,
    pub duration_seconds: i32,
}

/// One leg of a reconstructed journey.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JourneyLeg {
    /// Ride a trip from the boarding stop to the alighting stop.
    Ride {
        from_stop: StopId,
        to_stop: StopId,
        trip_id: TripId,
    },
    /// Walk a footpath transfer between two stops.
    Transfer { from_stop: StopId, to_stop: StopId },
}

impl JourneyLeg {
    /// The stop this leg starts from.
    pub fn from_stop(&self) -> &StopId {
        match self {
            JourneyLeg::Ride { from_stop, .. } | JourneyLeg::Transfer { from_stop, .. } => {
                from_stop
            }
        }
    }

    /// The stop this leg ends at.
    pub fn to_stop(&self) -> &StopId {
        match self {
            JourneyLeg::Ride { to_stop, .. } | JourneyLeg::Transfer { to_stop, .. } => to_stop,
        }
    }
}

/// Search parameters.
#[derive(Debug, Clone)]
pub struct RaptorConfig {
    /// Maximum number of rounds, i.e. trips per journey.
    pub max_rounds: usize,
}

impl Default for RaptorConfig {
    fn default() -> Self {
        Self { max_rounds: 10 }
    }
}

/// Earliest-arrival router over a [`StopTimeIndex`].
///
/// Holds shared read-only references; construct once per index and reuse
/// across searches.
pub struct RaptorRouter<'a> {
    index: &'a StopTimeIndex,
    transfers: &'a TransferTable,
    config: RaptorConfig,
}

/// The full result of one search: per-round arrivals, parent pointers for
/// reconstruction, and the best arrival per stop over all rounds.
#[derive(Debug)]
pub struct RaptorResult {
    arrivals: Vec<HashMap<StopId, TransitTime>>,
    parents: Vec<HashMap<StopId, JourneyLeg>>,
    earliest: HashMap<StopId, TransitTime>,
}

impl RaptorResult {
    /// Best arrival time at a stop over all rounds.
    ///
    /// `None` means the stop is unreachable — that is an ordinary outcome,
    /// not an error.
    pub fn earliest_arrival(&self, stop: &StopId) -> Option<TransitTime> {
        self.earliest.get(stop).copied()
    }

    /// All reachable stops with their best arrival times.
    pub fn earliest_arrivals(&self) -> &HashMap<StopId, TransitTime> {
        &self.earliest
    }

    /// Arrival time at a stop using at most `round` trips.
    pub fn arrival_in_round(&self, round: usize, stop: &StopId) -> Option<TransitTime> {
        self.arrivals.get(round)?.get(stop).copied()
    }

    /// Number of rounds held in the result (including round 0).
    pub fn rounds(&self) -> usize {
        self.arrivals.len()
    }

    /// Reconstruct the journey to `target`, in source-to-target order.
    ///
    /// Picks the round with the best arrival and walks the parent pointers
    /// backwards: a transfer stays within its round, a ride consumes one.
    /// Returns `None` when the target was never reached.
    pub fn reconstruct(&self, target: &StopId) -> Option<Vec<JourneyLeg>> {
        let (mut round, _) = self
            .arrivals
            .iter()
            .enumerate()
            .filter_map(|(k, arrivals)| arrivals.get(target).map(|&t| (k, t)))
            .min_by_key(|&(k, t)| (t, k))?;

        let mut legs = Vec::new();
        let mut current = target;

        while round > 0 {
            let Some(leg) = self.parents[round].get(current) else {
                break;
            };
            legs.push(leg.clone());
            current = leg.from_stop();

            if matches!(leg, JourneyLeg::Ride { .. }) {
                round -= 1;
            }
        }

        legs.reverse();
        Some(legs)
    }
}

impl<'a> RaptorRouter<'a> {
    /// Create a router with the default configuration.
    pub fn new(index: &'a StopTimeIndex, transfers: &'a TransferTable) -> Self {
        Self::with_config(index, transfers, RaptorConfig::default())
    }

    /// Create a router with an explicit configuration.
    pub fn with_config(
        index: &'a StopTimeIndex,
        transfers: &'a TransferTable,
        config: RaptorConfig,
    ) -> Self {
        Self {
            index,
            transfers,
            config,
        }
    }

    /// Run the search from `source`, departing at `departure`.
    #[instrument(skip_all, fields(source = %source, departure = %departure))]
    pub fn search(&self, source: &StopId, departure: TransitTime) -> RaptorResult {
        let rounds = self.config.max_rounds;

        let mut arrivals: Vec<HashMap<StopId, TransitTime>> = vec![HashMap::new(); rounds + 1];
        let mut parents: Vec<HashMap<StopId, JourneyLeg>> = vec![HashMap::new(); rounds + 1];
        let mut earliest: HashMap<StopId, TransitTime> = HashMap::new();

        arrivals[0].insert(source.clone(), departure);
        earliest.insert(source.clone(), departure);

        let mut marked: HashSet<StopId> = HashSet::from([source.clone()]);

        for k in 1..=rounds {
            // Seed this round with the previous round's arrivals. The copy
            // also serves as the immutable round k-1 view the scan reads.
            let previous = arrivals[k - 1].clone();
            arrivals[k] = previous.clone();

            // Collect routes serving a marked stop, each with the earliest
            // pattern position at which it can be boarded this round.
            let mut active: HashMap<&RouteId, usize> = HashMap::new();
            for stop in &marked {
                for route in self.index.routes_at_stop(stop) {
                    if let Some(position) = self.index.stop_position_in_route(stop, route) {
                        active
                            .entry(route)
                            .and_modify(|p| *p = (*p).min(position))
                            .or_insert(position);
                    }
                }
            }

            marked.clear();

            // Scan each active route forward from its boarding position,
            // hopping to an earlier trip whenever round k-1 got us to a
            // stop in time to catch one.
            for (route, start_position) in active {
                let Some(pattern) = self.index.stops_on_route(route) else {
                    continue;
                };
                let trips = self.index.route_trips(route);

                let mut current_trip: Option<usize> = None;
                let mut boarding_stop: Option<&StopId> = None;

                for (position, pattern_stop) in
                    pattern.stops.iter().enumerate().skip(start_position)
                {
                    let stop = &pattern_stop.stop_id;

                    if let (Some(trip), Some(boarded_at)) = (current_trip, boarding_stop) {
                        let arrival = trips[trip].stop_times[position].arrival;
                        if earliest.get(stop).is_none_or(|&best| arrival < best) {
                            arrivals[k].insert(stop.clone(), arrival);
                            earliest.insert(stop.clone(), arrival);
                            marked.insert(stop.clone());
                            parents[k].insert(
                                stop.clone(),
                                JourneyLeg::Ride {
                                    from_stop: boarded_at.clone(),
                                    to_stop: stop.clone(),
                                    trip_id: trips[trip].trip_id.clone(),
                                },
                            );
                        }
                    }

                    // Could round k-1 catch an earlier trip at this stop?
                    if let Some(&reached_at) = previous.get(stop) {
                        if let Some(earlier) =
                            self.index.earliest_trip_index(route, position, reached_at)
                        {
                            if current_trip.is_none_or(|current| earlier < current) {
                                current_trip = Some(earlier);
                                boarding_stop = Some(stop);
                            }
                        }
                    }
                }
            }

            // Relax footpaths once, over the stops the scan just improved.
            // Chained footpaths need a later round by design of the
            // algorithm, so transfer targets are not re-expanded here.
            let improved: Vec<StopId> = marked.iter().cloned().collect();
            for stop in &improved {
                let Some(outgoing) = self.transfers.get(stop) else {
                    continue;
                };
                let reached_at = arrivals[k][stop];

                for transfer in outgoing {
                    let with_walk = reached_at + transfer.duration_seconds;
                    if earliest
                        .get(&transfer.to)
                        .is_none_or(|&best| with_walk < best)
                    {
                        arrivals[k].insert(transfer.to.clone(), with_walk);
                        earliest.insert(transfer.to.clone(), with_walk);
                        marked.insert(transfer.to.clone());
                        parents[k].insert(
                            transfer.to.clone(),
                            JourneyLeg::Transfer {
                                from_stop: stop.clone(),
                                to_stop: transfer.to.clone(),
                            },
                        );
                    }
                }
            }

            if marked.is_empty() {
                debug!(round = k, "no stops improved, terminating early");
                break;
            }
        }

        debug!(reachable = earliest.len(), "search complete");
        RaptorResult {
            arrivals,
            parents,
            earliest,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gtfs::{build_index, StopTimeRecord, TripToRoute};
    use crate::domain::TripId;

    fn st(trip: &str, stop: &str, arrival: i32, departure: i32, sequence: u32) -> StopTimeRecord {
        StopTimeRecord {
            trip_id: TripId::from(trip),
            stop_id: StopId::from(stop),
            arrival: TransitTime::from_seconds(arrival),
            departure: TransitTime::from_seconds(departure),
            stop_sequence: sequence,
        }
    }

    fn routes(pairs: &[(&str, &str)]) -> TripToRoute {
        pairs
            .iter()
            .map(|(trip, route)| (TripId::from(*trip), RouteId::from(*route)))
            .collect()
    }

    fn stop(s: &str) -> StopId {
        StopId::from(s)
    }

    fn t(seconds: i32) -> TransitTime {
        TransitTime::from_seconds(seconds)
    }

    #[test]
    fn single_trip_direct_ride() {
        let index = build_index(
            &[
                st("T1", "A", 100, 110, 1),
                st("T1", "B", 200, 210, 2),
                st("T1", "C", 300, 310, 3),
            ],
            &routes(&[("T1", "R1")]),
        );
        let transfers = TransferTable::new();
        let router = RaptorRouter::new(&index, &transfers);

        let result = router.search(&stop("A"), t(0));

        assert_eq!(result.earliest_arrival(&stop("A")), Some(t(0)));
        assert_eq!(result.earliest_arrival(&stop("B")), Some(t(200)));
        assert_eq!(result.earliest_arrival(&stop("C")), Some(t(300)));

        let legs = result.reconstruct(&stop("C")).unwrap();
        assert_eq!(
            legs,
            vec![JourneyLeg::Ride {
                from_stop: stop("A"),
                to_stop: stop("C"),
                trip_id: TripId::from("T1"),
            }]
        );
    }

    #[test]
    fn departure_after_trip_misses_it() {
        let index = build_index(
            &[st("T1", "A", 100, 110, 1), st("T1", "B", 200, 210, 2)],
            &routes(&[("T1", "R1")]),
        );
        let transfers = TransferTable::new();
        let router = RaptorRouter::new(&index, &transfers);

        let result = router.search(&stop("A"), t(111));
        assert_eq!(result.earliest_arrival(&stop("B")), None);
    }

    #[test]
    fn two_routes_with_interchange() {
        // R1: A -> B, R2: B -> C; the connection at B is feasible.
        let index = build_index(
            &[
                st("T1", "A", 100, 110, 1),
                st("T1", "B", 200, 210, 2),
                st("T2", "B", 250, 260, 1),
                st("T2", "C", 400, 410, 2),
            ],
            &routes(&[("T1", "R1"), ("T2", "R2")]),
        );
        let transfers = TransferTable::new();
        let router = RaptorRouter::new(&index, &transfers);

        let result = router.search(&stop("A"), t(0));

        assert_eq!(result.earliest_arrival(&stop("C")), Some(t(400)));
        // One trip reaches B, two reach C
        assert_eq!(result.arrival_in_round(1, &stop("B")), Some(t(200)));
        assert_eq!(result.arrival_in_round(1, &stop("C")), None);
        assert_eq!(result.arrival_in_round(2, &stop("C")), Some(t(400)));

        let legs = result.reconstruct(&stop("C")).unwrap();
        assert_eq!(legs.len(), 2);
        assert_eq!(legs[0].from_stop(), &stop("A"));
        assert_eq!(legs[0].to_stop(), &stop("B"));
        assert_eq!(legs[1].from_stop(), &stop("B"));
        assert_eq!(legs[1].to_stop(), &stop("C"));
    }

    #[test]
    fn footpath_beats_second_trip() {
        // Riding T1 to C then walking to D (300 + 50) beats changing at B
        // onto T2 (arrives D at 400).
        let index = build_index(
            &[
                st("T1", "A", 100, 110, 1),
                st("T1", "B", 200, 210, 2),
                st("T1", "C", 300, 310, 3),
                st("T2", "B", 250, 260, 1),
                st("T2", "D", 400, 410, 2),
            ],
            &routes(&[("T1", "R1"), ("T2", "R2")]),
        );

        let mut transfers = TransferTable::new();
        transfers.insert(
            stop("C"),
            vec![FootpathTransfer {
                to: stop("D"),
                duration_seconds: 50,
            }],
        );

        let router = RaptorRouter::new(&index, &transfers);
        let result = router.search(&stop("A"), t(0));

        assert_eq!(result.earliest_arrival(&stop("D")), Some(t(350)));

        let legs = result.reconstruct(&stop("D")).unwrap();
        assert_eq!(
            legs,
            vec![
                JourneyLeg::Ride {
                    from_stop: stop("A"),
                    to_stop: stop("C"),
                    trip_id: TripId::from("T1"),
                },
                JourneyLeg::Transfer {
                    from_stop: stop("C"),
                    to_stop: stop("D"),
                },
            ]
        );
    }

    #[test]
    fn chained_footpaths_need_an_extra_round() {
        // D is only reachable by walking C -> D after walking B -> C, and
        // footpaths do not chain within a round.
        let index = build_index(
            &[st("T1", "A", 100, 110, 1), st("T1", "B", 200, 210, 2)],
            &routes(&[("T1", "R1")]),
        );

        let mut transfers = TransferTable::new();
        transfers.insert(
            stop("B"),
            vec![FootpathTransfer {
                to: stop("C"),
                duration_seconds: 60,
            }],
        );
        transfers.insert(
            stop("C"),
            vec![FootpathTransfer {
                to: stop("D"),
                duration_seconds: 60,
            }],
        );

        let router = RaptorRouter::new(&index, &transfers);
        let result = router.search(&stop("A"), t(0));

        assert_eq!(result.earliest_arrival(&stop("C")), Some(t(260)));
        // No trip ever improves C in a later scan, so the C -> D footpath
        // is never relaxed: D stays unreachable.
        assert_eq!(result.earliest_arrival(&stop("D")), None);
        assert_eq!(result.arrival_in_round(1, &stop("C")), Some(t(260)));
    }

    #[test]
    fn later_round_catches_earlier_trip_via_upstream_boarding() {
        // R2 runs X -> B -> C twice. From A, round 1 reaches B at 200 and
        // can only catch the late second run; nothing catches the early run.
        let index = build_index(
            &[
                st("T1", "A", 100, 110, 1),
                st("T1", "B", 200, 210, 2),
                st("E1", "X", 50, 60, 1),
                st("E1", "B", 90, 95, 2),
                st("E1", "C", 150, 160, 3),
                st("E2", "X", 500, 510, 1),
                st("E2", "B", 550, 560, 2),
                st("E2", "C", 600, 610, 3),
            ],
            &routes(&[("T1", "R1"), ("E1", "R2"), ("E2", "R2")]),
        );
        let transfers = TransferTable::new();
        let router = RaptorRouter::new(&index, &transfers);

        let result = router.search(&stop("A"), t(0));

        // B reached at 200 via T1; the 95-departure already left, so the
        // 560 departure is the earliest catchable run of R2.
        assert_eq!(result.earliest_arrival(&stop("C")), Some(t(600)));
    }

    #[test]
    fn overnight_trip_times_compare_as_integers() {
        // 23:55 departure arriving 24:25, i.e. past midnight of the
        // service day; arrivals beyond 86,400 are ordinary values.
        let index = build_index(
            &[
                st("N1", "A", 86_100, 86_160, 1),
                st("N1", "B", 87_900, 87_960, 2),
            ],
            &routes(&[("N1", "R1")]),
        );
        let transfers = TransferTable::new();
        let router = RaptorRouter::new(&index, &transfers);

        let result = router.search(&stop("A"), t(86_000));
        assert_eq!(result.earliest_arrival(&stop("B")), Some(t(87_900)));
    }

    #[test]
    fn earliest_is_monotone_across_rounds() {
        let index = build_index(
            &[
                st("T1", "A", 100, 110, 1),
                st("T1", "B", 200, 210, 2),
                st("T2", "B", 250, 260, 1),
                st("T2", "C", 400, 410, 2),
                st("T3", "C", 450, 460, 1),
                st("T3", "D", 500, 510, 2),
            ],
            &routes(&[("T1", "R1"), ("T2", "R2"), ("T3", "R3")]),
        );
        let transfers = TransferTable::new();
        let router = RaptorRouter::new(&index, &transfers);

        let result = router.search(&stop("A"), t(0));

        for s in ["A", "B", "C", "D"] {
            let s = stop(s);
            let mut last: Option<TransitTime> = None;
            for round in 0..result.rounds() {
                if let Some(at) = result.arrival_in_round(round, &s) {
                    if let Some(prev) = last {
                        assert!(at <= prev, "arrival at {s} regressed in round {round}");
                    }
                    last = Some(at);
                }
            }
        }
    }

    #[test]
    fn unknown_source_yields_only_source_entry() {
        let index = build_index(
            &[st("T1", "A", 100, 110, 1), st("T1", "B", 200, 210, 2)],
            &routes(&[("T1", "R1")]),
        );
        let transfers = TransferTable::new();
        let router = RaptorRouter::new(&index, &transfers);

        let result = router.search(&stop("NOWHERE"), t(500));

        assert_eq!(result.earliest_arrival(&stop("NOWHERE")), Some(t(500)));
        assert_eq!(result.earliest_arrivals().len(), 1);
    }

    #[test]
    fn unreachable_target_reconstructs_to_none() {
        let index = build_index(
            &[st("T1", "A", 100, 110, 1), st("T1", "B", 200, 210, 2)],
            &routes(&[("T1", "R1")]),
        );
        let transfers = TransferTable::new();
        let router = RaptorRouter::new(&index, &transfers);

        let result = router.search(&stop("A"), t(0));
        assert_eq!(result.reconstruct(&stop("Z")), None);
    }

    #[test]
    fn source_reconstructs_to_empty_journey() {
        let index = build_index(
            &[st("T1", "A", 100, 110, 1), st("T1", "B", 200, 210, 2)],
            &routes(&[("T1", "R1")]),
        );
        let transfers = TransferTable::new();
        let router = RaptorRouter::new(&index, &transfers);

        let result = router.search(&stop("A"), t(0));
        assert_eq!(result.reconstruct(&stop("A")), Some(vec![]));
    }

    #[test]
    fn max_rounds_caps_trip_count() {
        // A chain needing three trips, searched with max_rounds = 2.
        let index = build_index(
            &[
                st("T1", "A", 100, 110, 1),
                st("T1", "B", 200, 210, 2),
                st("T2", "B", 250, 260, 1),
                st("T2", "C", 300, 310, 2),
                st("T3", "C", 350, 360, 1),
                st("T3", "D", 400, 410, 2),
            ],
            &routes(&[("T1", "R1"), ("T2", "R2"), ("T3", "R3")]),
        );
        let transfers = TransferTable::new();
        let router =
            RaptorRouter::with_config(&index, &transfers, RaptorConfig { max_rounds: 2 });

        let result = router.search(&stop("A"), t(0));

        assert_eq!(result.earliest_arrival(&stop("C")), Some(t(300)));
        assert_eq!(result.earliest_arrival(&stop("D")), None);
    }
}
