//! Command-line entry point.
//!
//! Subcommands mirror the engine surface: `parse` builds and inspects a
//! street graph, `route` and `transit` run one-off queries, `serve` exposes
//! the HTTP API. Graph builds are cached in a sidecar file next to the OSM
//! input.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use wayfinder::domain::{MobilityProfile, StopId, TransitTime};
use wayfinder::engine::{Engine, RouteRequest, TransitRequest};
use wayfinder::graph::NodeId;
use wayfinder::planner::JourneyLeg;
use wayfinder::web::{create_router, AppState};

#[derive(Parser)]
#[command(name = "wayfinder", version, about = "Walking and transit routing engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse an OSM file and show graph statistics
    Parse {
        /// OSM file to parse (.osm or .osm.gz)
        #[arg(long)]
        file: PathBuf,
    },

    /// Find a walking route between two node ids
    Route {
        /// OSM file to parse (.osm or .osm.gz)
        #[arg(long)]
        file: PathBuf,

        /// Source node id
        #[arg(long)]
        from: i64,

        /// Target node id
        #[arg(long)]
        to: i64,

        /// Walking speed in m/s
        #[arg(long, default_value_t = wayfinder::domain::DEFAULT_WALKING_SPEED_MPS)]
        speed: f64,

        /// Print coordinates along the path
        #[arg(long)]
        coords: bool,
    },

    /// Find a transit journey using RAPTOR
    Transit {
        /// Directory containing stop_times.txt, trips.txt and optionally transfers.txt
        #[arg(long)]
        gtfs: PathBuf,

        /// Source stop id
        #[arg(long)]
        from: String,

        /// Target stop id
        #[arg(long)]
        to: String,

        /// Departure time (HH:MM:SS)
        #[arg(long, default_value = "08:00:00")]
        time: String,
    },

    /// Start the HTTP server
    Serve {
        /// OSM file to parse (.osm or .osm.gz)
        #[arg(long)]
        file: PathBuf,

        /// Optional GTFS directory for transit queries
        #[arg(long)]
        gtfs: Option<PathBuf>,

        /// Listen address
        #[arg(long, default_value = "127.0.0.1:8080")]
        addr: SocketAddr,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();
}

/// Load the street graph, consulting the sidecar cache first.
fn load_engine(file: &Path) -> anyhow::Result<Engine> {
    let mut cache_path = file.as_os_str().to_owned();
    cache_path.push(".cache");
    let cache_path = PathBuf::from(cache_path);

    let mut engine = Engine::new();

    if cache_path.exists() {
        match engine.load_graph(&cache_path) {
            Ok(()) => return Ok(engine),
            Err(err) => warn!(%err, "cache load failed, falling back to OSM parse"),
        }
    }

    engine
        .load_osm(file)
        .with_context(|| format!("parsing {}", file.display()))?;

    if let Err(err) = engine.save_graph(&cache_path) {
        warn!(%err, "failed to save graph cache");
    }

    Ok(engine)
}

fn cmd_parse(file: &Path) -> anyhow::Result<()> {
    let start = Instant::now();
    let engine = load_engine(file)?;
    let stats = engine.stats();

    println!("Graph: {} nodes, {} edges", stats.nodes, stats.edges);
    println!("Load & build took {:.2?}", start.elapsed());
    Ok(())
}

fn cmd_route(file: &Path, from: i64, to: i64, speed: f64, coords: bool) -> anyhow::Result<()> {
    let engine = load_engine(file)?;

    let start = Instant::now();
    let result = engine.route(&RouteRequest {
        from: NodeId(from),
        to: NodeId(to),
        profile: MobilityProfile::walking(speed),
        include_coordinates: coords,
    })?;
    info!(elapsed = ?start.elapsed(), "route query finished");

    println!(
        "Route: {} nodes, {:.0} m, {:.1} min at {speed} m/s",
        result.nodes.len(),
        result.distance_m,
        result.duration_seconds / 60.0
    );

    for (i, node) in result.nodes.iter().enumerate() {
        match result.coordinates.as_ref().and_then(|c| c.get(i)) {
            Some((lat, lon)) => println!("  {:>3}. {node} ({lat:.6}, {lon:.6})", i + 1),
            None => println!("  {:>3}. {node}", i + 1),
        }
    }
    Ok(())
}

fn cmd_transit(gtfs: &Path, from: &str, to: &str, time: &str) -> anyhow::Result<()> {
    let mut engine = Engine::new();
    engine
        .load_gtfs(gtfs)
        .with_context(|| format!("loading GTFS from {}", gtfs.display()))?;

    let departure: TransitTime = time.parse().context("invalid departure time")?;
    let request = TransitRequest {
        from_stop: StopId::from(from),
        departure,
    };

    let start = Instant::now();
    let journey = engine.transit_journey(&request, &StopId::from(to))?;
    info!(elapsed = ?start.elapsed(), "transit query finished");

    let Some((arrival, legs)) = journey else {
        println!("{to} is not reachable from {from} departing at {departure}");
        return Ok(());
    };

    println!("Earliest arrival at {to}: {arrival}");
    for leg in &legs {
        match leg {
            JourneyLeg::Ride {
                from_stop,
                to_stop,
                trip_id,
            } => println!("  ride  {from_stop} -> {to_stop} (trip {trip_id})"),
            JourneyLeg::Transfer { from_stop, to_stop } => {
                println!("  walk  {from_stop} -> {to_stop}")
            }
        }
    }
    Ok(())
}

async fn cmd_serve(file: &Path, gtfs: Option<&Path>, addr: SocketAddr) -> anyhow::Result<()> {
    let mut engine = load_engine(file)?;

    if let Some(dir) = gtfs {
        engine
            .load_gtfs(dir)
            .with_context(|| format!("loading GTFS from {}", dir.display()))?;
    }

    let app = create_router(AppState::new(engine));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    info!(%addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    match Cli::parse().command {
        Command::Parse { file } => cmd_parse(&file),
        Command::Route {
            file,
            from,
            to,
            speed,
            coords,
        } => cmd_route(&file, from, to, speed, coords),
        Command::Transit {
            gtfs,
            from,
            to,
            time,
        } => cmd_transit(&gtfs, &from, &to, &time),
        Command::Serve { file, gtfs, addr } => cmd_serve(&file, gtfs.as_deref(), addr).await,
    }
}
