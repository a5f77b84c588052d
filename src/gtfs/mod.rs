//! GTFS ingest.
//!
//! Parses the three timetable files the transit core needs — `stop_times.txt`,
//! `trips.txt`, and `transfers.txt` — into flat records. Columns are resolved
//! by header name, field values are trimmed, unknown columns are ignored, and
//! row order is preserved.

mod index;

pub use index::{
    build_index, PatternStop, RoutePattern, StopTimeIndex, TripStopTime, TripVector,
};

use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::Path;

use tracing::debug;

use crate::domain::{RouteId, StopId, TransitTime, TripId};

/// Error raised while reading GTFS data.
#[derive(Debug, thiserror::Error)]
pub enum GtfsError {
    #[error("gtfs io: {0}")]
    Io(#[from] std::io::Error),

    #[error("gtfs csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required column {column:?}")]
    MissingColumn { column: &'static str },

    #[error("line {line}: {message}")]
    InvalidData { line: u64, message: String },
}

/// One row of `stop_times.txt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopTimeRecord {
    pub trip_id: TripId,
    pub stop_id: StopId,
    pub arrival: TransitTime,
    pub departure: TransitTime,
    pub stop_sequence: u32,
}

/// Mapping from trip to the route it belongs to, from `trips.txt`.
pub type TripToRoute = HashMap<TripId, RouteId>;

/// One row of `transfers.txt`: a directed footpath between two stops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRecord {
    pub from_stop_id: StopId,
    pub to_stop_id: StopId,
    pub transfer_type: u32,
    pub min_transfer_time: u32,
}

/// Column positions resolved from a header row.
struct Columns {
    by_name: HashMap<String, usize>,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Self {
        let by_name = headers
            .iter()
            .enumerate()
            .map(|(i, name)| (name.trim().to_owned(), i))
            .collect();
        Self { by_name }
    }

    fn required(&self, column: &'static str) -> Result<usize, GtfsError> {
        self.by_name
            .get(column)
            .copied()
            .ok_or(GtfsError::MissingColumn { column })
    }

    fn optional(&self, column: &str) -> Option<usize> {
        self.by_name.get(column).copied()
    }
}

fn field<'r>(
    record: &'r csv::StringRecord,
    idx: usize,
    column: &str,
    line: u64,
) -> Result<&'r str, GtfsError> {
    record.get(idx).ok_or_else(|| GtfsError::InvalidData {
        line,
        message: format!("missing value for {column}"),
    })
}

fn record_line(record: &csv::StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or(0)
}

/// Parse a `stop_times.txt` stream.
///
/// Requires the columns `trip_id`, `stop_id`, `arrival_time`,
/// `departure_time`, and `stop_sequence`. Any row whose times or sequence
/// fail to parse aborts the whole read with the offending line number.
pub fn parse_stop_times(reader: impl io::Read) -> Result<Vec<StopTimeRecord>, GtfsError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let columns = Columns::from_headers(csv_reader.headers()?);
    let trip_idx = columns.required("trip_id")?;
    let stop_idx = columns.required("stop_id")?;
    let arrival_idx = columns.required("arrival_time")?;
    let departure_idx = columns.required("departure_time")?;
    let seq_idx = columns.required("stop_sequence")?;

    let mut rows = Vec::new();

    for record in csv_reader.records() {
        let record = record?;
        let line = record_line(&record);

        let arrival = TransitTime::parse(field(&record, arrival_idx, "arrival_time", line)?)
            .map_err(|e| GtfsError::InvalidData {
                line,
                message: format!("invalid arrival_time: {e}"),
            })?;
        let departure = TransitTime::parse(field(&record, departure_idx, "departure_time", line)?)
            .map_err(|e| GtfsError::InvalidData {
                line,
                message: format!("invalid departure_time: {e}"),
            })?;
        let stop_sequence = field(&record, seq_idx, "stop_sequence", line)?
            .parse()
            .map_err(|_| GtfsError::InvalidData {
                line,
                message: "invalid stop_sequence".to_owned(),
            })?;

        rows.push(StopTimeRecord {
            trip_id: TripId::from(field(&record, trip_idx, "trip_id", line)?),
            stop_id: StopId::from(field(&record, stop_idx, "stop_id", line)?),
            arrival,
            departure,
            stop_sequence,
        });
    }

    debug!(rows = rows.len(), "parsed stop_times");
    Ok(rows)
}

/// Parse a `stop_times.txt` file.
pub fn parse_stop_times_file(path: &Path) -> Result<Vec<StopTimeRecord>, GtfsError> {
    parse_stop_times(File::open(path)?)
}

/// Parse a `trips.txt` stream into a trip → route mapping.
pub fn parse_trips(reader: impl io::Read) -> Result<TripToRoute, GtfsError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let columns = Columns::from_headers(csv_reader.headers()?);
    let trip_idx = columns.required("trip_id")?;
    let route_idx = columns.required("route_id")?;

    let mut trip_routes = TripToRoute::new();

    for record in csv_reader.records() {
        let record = record?;
        let line = record_line(&record);

        trip_routes.insert(
            TripId::from(field(&record, trip_idx, "trip_id", line)?),
            RouteId::from(field(&record, route_idx, "route_id", line)?),
        );
    }

    debug!(trips = trip_routes.len(), "parsed trips");
    Ok(trip_routes)
}

/// Parse a `trips.txt` file.
pub fn parse_trips_file(path: &Path) -> Result<TripToRoute, GtfsError> {
    parse_trips(File::open(path)?)
}

/// Parse a `transfers.txt` stream.
///
/// Only `from_stop_id` and `to_stop_id` are required; `transfer_type` and
/// `min_transfer_time` default to 0 when absent or unparseable.
pub fn parse_transfers(reader: impl io::Read) -> Result<Vec<TransferRecord>, GtfsError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let columns = Columns::from_headers(csv_reader.headers()?);
    let from_idx = columns.required("from_stop_id")?;
    let to_idx = columns.required("to_stop_id")?;
    let type_idx = columns.optional("transfer_type");
    let time_idx = columns.optional("min_transfer_time");

    let optional_u32 = |record: &csv::StringRecord, idx: Option<usize>| -> u32 {
        idx.and_then(|i| record.get(i))
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    };

    let mut transfers = Vec::new();

    for record in csv_reader.records() {
        let record = record?;
        let line = record_line(&record);

        transfers.push(TransferRecord {
            from_stop_id: StopId::from(field(&record, from_idx, "from_stop_id", line)?),
            to_stop_id: StopId::from(field(&record, to_idx, "to_stop_id", line)?),
            transfer_type: optional_u32(&record, type_idx),
            min_transfer_time: optional_u32(&record, time_idx),
        });
    }

    debug!(transfers = transfers.len(), "parsed transfers");
    Ok(transfers)
}

/// Parse a `transfers.txt` file.
pub fn parse_transfers_file(path: &Path) -> Result<Vec<TransferRecord>, GtfsError> {
    parse_transfers(File::open(path)?)
}
