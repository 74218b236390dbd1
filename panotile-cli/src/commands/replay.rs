//! `replay` command: feed a recorded head-movement trace through a session.
//!
//! Tiles are played by the simulated media backend, so a replay exercises
//! admission, eviction, prediction and metrics without any network access.
//! The trace file is a JSON array of orientation samples:
//!
//! ```json
//! [{"latitude": 90.0, "longitude": 0.0}, {"latitude": 92.5, "longitude": 4.0}]
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tracing::info;

use crate::error::CliError;
use crate::runner::CliRunner;
use panotile::manifest::Manifest;
use panotile::media::{SimulatedBaseStream, SimulatedMedia, TelemetrySink};
use panotile::metrics::{LatestSnapshot, MetricsSnapshot};
use panotile::pipeline::DrawRegion;
use panotile::scheduler::SchedulerStats;
use panotile::session::{Collaborators, PlaybackSession, SessionConfig, TileStatus};
use panotile::viewport::{PredictionStats, TraceEntry};

/// Arguments for `panotile replay`.
#[derive(Debug, Clone, Args)]
pub struct ReplayArgs {
    /// Manifest JSON naming the base stream and tile streams
    #[arg(long)]
    pub manifest: PathBuf,

    /// Viewport trace JSON (array of {latitude, longitude})
    #[arg(long)]
    pub trace: PathBuf,

    /// Delay between viewport samples in milliseconds
    #[arg(long, default_value = "100")]
    pub interval_ms: u64,

    /// Simulated time from fetch start to ready, in milliseconds
    #[arg(long, default_value = "50")]
    pub startup_latency_ms: u64,

    /// Wait this long after the last sample before reporting, in milliseconds
    #[arg(long, default_value = "500")]
    pub settle_ms: u64,

    /// Fail every tile fetch whose URL contains this text (repeatable)
    #[arg(long)]
    pub fail_url: Vec<String>,

    /// Admit tiles near the predicted viewport (overrides the config file)
    #[arg(long)]
    pub prediction: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Mirror log output to stdout
    #[arg(short, long)]
    pub verbose: bool,
}

/// One recorded orientation sample.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct TraceSample {
    #[serde(alias = "lat")]
    pub latitude: f64,
    #[serde(alias = "lon")]
    pub longitude: f64,
}

/// Outcome of a replay.
#[derive(Debug, Serialize)]
pub struct ReplayReport {
    pub samples: usize,
    pub tiles: Vec<TileStatus>,
    pub drawable: Vec<DrawRegion>,
    pub scheduler: SchedulerStats,
    pub prediction: PredictionStats,
    pub trace: Vec<TraceEntry>,
    pub metrics: MetricsSnapshot,
    pub snapshots_published: u64,
}

pub fn run(args: ReplayArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(args.verbose)?;
    runner.log_startup("replay");

    let manifest = Manifest::load(&args.manifest)?;
    let trace = load_trace(&args.trace)?;

    let mut config = SessionConfig::from(runner.config());
    if args.prediction {
        config.scheduler.use_prediction = true;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    let report = runtime.block_on(replay(manifest, &trace, config, &args))?;

    if args.json {
        println!("{}", render_json(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

/// Read a trace file.
pub fn load_trace(path: &Path) -> Result<Vec<TraceSample>, CliError> {
    let text = std::fs::read_to_string(path).map_err(|e| CliError::Trace {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    serde_json::from_str(&text).map_err(|e| CliError::Trace {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Drive a session with simulated media through `trace`.
///
/// Must run inside a tokio runtime.
pub async fn replay(
    manifest: Manifest,
    trace: &[TraceSample],
    config: SessionConfig,
    args: &ReplayArgs,
) -> Result<ReplayReport, CliError> {
    let handle = Handle::current();

    let media = args.fail_url.iter().fold(
        SimulatedMedia::new(handle.clone())
            .with_startup_latency(Duration::from_millis(args.startup_latency_ms)),
        |media, pattern| media.with_failing_url(pattern.clone()),
    );
    let sink = LatestSnapshot::new();
    let collaborators = Collaborators {
        media: Arc::new(media),
        base: Arc::new(SimulatedBaseStream::new(0.0)),
        telemetry: Some(Arc::clone(&sink) as Arc<dyn TelemetrySink>),
    };

    let session = PlaybackSession::start(manifest, config, collaborators, &handle)?;
    info!(samples = trace.len(), "Replaying viewport trace");

    let mut ticker = tokio::time::interval(Duration::from_millis(args.interval_ms.max(1)));
    for sample in trace {
        ticker.tick().await;
        session.push_viewport(sample.latitude, sample.longitude);
    }
    tokio::time::sleep(Duration::from_millis(args.settle_ms)).await;

    let status = session.scheduler_status();
    let report = ReplayReport {
        samples: trace.len(),
        tiles: session.tile_statuses(),
        drawable: session.drawable_tiles(),
        scheduler: status.stats,
        prediction: status.prediction,
        trace: status.trace,
        metrics: session.metrics(),
        snapshots_published: sink.published(),
    };

    session.shutdown().await;
    info!("Replay finished");
    Ok(report)
}

/// Encode a report as pretty-printed JSON.
pub fn render_json(report: &ReplayReport) -> Result<String, CliError> {
    serde_json::to_string_pretty(report).map_err(CliError::Report)
}

fn print_report(report: &ReplayReport) {
    println!("Replayed {} viewport samples", report.samples);
    println!();
    println!(
        "{:>5}  {:<9}  {:>6}  {:>7}  {:>10}  {:>14}  {:>8}",
        "tile", "state", "pinned", "quality", "buffer (s)", "kbit/s", "failures"
    );
    for tile in &report.tiles {
        let quality = tile
            .quality
            .map(|q| q.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>5}  {:<9}  {:>6}  {:>7}  {:>10.1}  {:>14.1}  {:>8}",
            tile.id,
            tile.state.as_str(),
            if tile.pinned { "yes" } else { "" },
            quality,
            tile.buffer_length,
            tile.throughput,
            tile.failures
        );
    }

    println!();
    println!(
        "Drawable tiles: {}",
        report
            .drawable
            .iter()
            .map(|r| r.tile.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!(
        "Base buffer: {:.1}s, total throughput: {:.1} kbit/s",
        report.metrics.base_buffer_length,
        report.metrics.total_throughput()
    );

    let stats = &report.scheduler;
    println!();
    println!("Scheduler");
    println!("  Updates:          {}", stats.updates);
    println!("  Activations:      {}", stats.activations);
    println!("  Deactivations:    {}", stats.deactivations);
    println!("  Fetch failures:   {}", stats.fetch_failures);
    println!("  Stale callbacks:  {}", stats.stale_callbacks);

    let prediction = &report.prediction;
    println!();
    println!("Prediction");
    println!("  Forecasts:        {}", prediction.forecasts);
    println!("  Compared samples: {}", prediction.compared);
    println!(
        "  MAE (x, y):       ({:.4}, {:.4})",
        prediction.mae_x, prediction.mae_y
    );
    println!();
    println!("Metrics snapshots published: {}", report.snapshots_published);
}
