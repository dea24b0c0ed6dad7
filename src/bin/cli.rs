//! tripmeter CLI - replay recorded tracks through the odometer engine
//!
//! Usage:
//!   tripmeter-cli replay <path>... [--max-speed <m/s>] [--state <file>]
//!   tripmeter-cli show <file>
//!   tripmeter-cli reset <file>
//!
//! `replay` reads GPX files (or folders of them), runs each track through a
//! fresh engine, and prints how much distance was accumulated and which
//! fixes were filtered. With `--state`, the tracks are also fed in order into
//! a persistent odometer stored at that path, as a device would over
//! several trips.

use clap::{Parser, Subcommand};
use gpx::{Gpx, read};
use std::fs::{self, File};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::OffsetDateTime;
use tripmeter::{
    FixSample, JsonFileStore, NoopProvider, OdometerConfig, OdometerEngine, OdometerStore,
    ReplaySummary, TrackingSessionController,
};

#[derive(Parser)]
#[command(name = "tripmeter-cli")]
#[command(about = "Replay GPS tracks through the trip odometer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose debug output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay GPX tracks and report accumulated distance
    Replay {
        /// GPX files or folders containing GPX files
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Implied speed ceiling in m/s for rejecting position spikes
        #[arg(long, default_value = "120")]
        max_speed: f64,

        /// Meters of horizontal accuracy per unit of HDOP
        #[arg(long, default_value = "5")]
        hdop_meters: f64,

        /// Horizontal accuracy in meters for points without HDOP
        #[arg(long, default_value = "10")]
        default_accuracy: f64,

        /// Persistent odometer state file to continue from and update
        #[arg(short, long)]
        state: Option<PathBuf>,
    },

    /// Print a stored odometer state
    Show {
        /// State file written by `replay --state`
        file: PathBuf,
    },

    /// Delete a stored odometer state
    Reset {
        /// State file written by `replay --state`
        file: PathBuf,
    },
}

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| writeln!(buf, "[{:5}] {}", record.level(), record.args()))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Replay {
            paths,
            max_speed,
            hdop_meters,
            default_accuracy,
            state,
        } => {
            let accuracy = AccuracyModel {
                hdop_meters,
                default_accuracy,
            };
            run_replay(
                &paths,
                OdometerConfig::with_max_speed(max_speed),
                &accuracy,
                state.as_deref(),
                cli.verbose,
            )
        }
        Commands::Show { file } => run_show(&file),
        Commands::Reset { file } => run_reset(&file),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// How GPX points without an accuracy field get one.
struct AccuracyModel {
    hdop_meters: f64,
    default_accuracy: f64,
}

impl AccuracyModel {
    fn accuracy(&self, hdop: Option<f64>) -> f64 {
        match hdop {
            Some(h) if h > 0.0 => h * self.hdop_meters,
            _ => self.default_accuracy,
        }
    }
}

/// Expand folders into the GPX files they contain, sorted by name.
fn collect_gpx_paths(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            match fs::read_dir(path) {
                Ok(entries) => {
                    let mut found: Vec<PathBuf> = entries
                        .flatten()
                        .map(|e| e.path())
                        .filter(|p| p.extension().is_some_and(|ext| ext == "gpx"))
                        .collect();
                    found.sort();
                    files.extend(found);
                }
                Err(e) => eprintln!("Error reading folder {}: {}", path.display(), e),
            }
        } else {
            files.push(path.clone());
        }
    }
    files
}

/// Parse a single GPX file into fixes, in file order.
fn parse_gpx_file(path: &Path, accuracy: &AccuracyModel) -> Result<Vec<FixSample>, String> {
    let file = File::open(path).map_err(|e| e.to_string())?;
    let reader = BufReader::new(file);
    let gpx: Gpx = read(reader).map_err(|e| e.to_string())?;

    let mut fixes = Vec::new();
    let mut missing_time = 0usize;
    for track in &gpx.tracks {
        for segment in &track.segments {
            for pt in &segment.points {
                let timestamp_ms = match pt.time.clone() {
                    Some(t) => (OffsetDateTime::from(t).unix_timestamp_nanos() / 1_000_000) as i64,
                    None => {
                        missing_time += 1;
                        // One second per point keeps ordering without inventing speed spikes
                        fixes.len() as i64 * 1_000
                    }
                };
                let point = pt.point();
                let mut fix = FixSample::new(
                    point.y(),
                    point.x(),
                    accuracy.accuracy(pt.hdop),
                    timestamp_ms,
                );
                if let Some(speed) = pt.speed {
                    fix = fix.with_speed(speed);
                }
                fixes.push(fix);
            }
        }
    }

    if fixes.is_empty() {
        return Err("No track points found".to_string());
    }
    if missing_time > 0 {
        log::warn!(
            "{}: {} points without <time>, using 1s spacing",
            path.display(),
            missing_time
        );
    }
    Ok(fixes)
}

fn load_tracks(
    paths: &[PathBuf],
    accuracy: &AccuracyModel,
    verbose: bool,
) -> Vec<(String, Vec<FixSample>)> {
    println!("\n{}", "=".repeat(60));
    println!("Loading GPX tracks");
    println!("{}", "=".repeat(60));

    let mut tracks = Vec::new();
    for path in collect_gpx_paths(paths) {
        match parse_gpx_file(&path, accuracy) {
            Ok(fixes) => {
                let id = path
                    .file_name()
                    .and_then(|s| s.to_str())
                    .unwrap_or("unknown")
                    .to_string();
                if verbose {
                    println!("  [OK] {} - {} points", id, fixes.len());
                }
                tracks.push((id, fixes));
            }
            Err(e) => eprintln!("  [ERR] Failed to parse {}: {}", path.display(), e),
        }
    }

    println!("Loaded {} tracks", tracks.len());
    tracks
}

fn replay_all(tracks: &[(String, Vec<FixSample>)], config: &OdometerConfig) -> Vec<ReplaySummary> {
    #[cfg(feature = "parallel")]
    {
        tripmeter::replay_tracks_parallel(tracks, config)
    }
    #[cfg(not(feature = "parallel"))]
    {
        tripmeter::replay_tracks(tracks, config)
    }
}

fn run_replay(
    paths: &[PathBuf],
    config: OdometerConfig,
    accuracy: &AccuracyModel,
    state_file: Option<&Path>,
    verbose: bool,
) -> tripmeter::Result<()> {
    config.validate()?;

    let tracks = load_tracks(paths, accuracy, verbose);
    if tracks.is_empty() {
        println!("No tracks to replay");
        return Ok(());
    }

    println!("\n{}", "=".repeat(60));
    println!("PER-TRACK REPLAY (max speed {:.0} m/s)", config.max_speed_mps);
    println!("{}", "=".repeat(60));

    let start = std::time::Instant::now();
    let summaries = replay_all(&tracks, &config);
    let elapsed = start.elapsed();

    for summary in &summaries {
        println!(
            "  {:<40} {:>12}  ({} accepted, {} rejected)",
            summary.track_id,
            summary.state.to_string(),
            summary.stats.accepted,
            summary.rejected()
        );
        if verbose {
            let s = &summary.stats;
            println!(
                "      unknown accuracy: {}, stale: {}, jumps: {}, invalid: {}",
                s.rejected_unknown_accuracy,
                s.rejected_stale,
                s.rejected_implausible_jump,
                s.invalid_coordinate
            );
        }
    }

    let total: f64 = summaries.iter().map(|s| s.state.total_distance).sum();
    println!(
        "\n  Total: {:.2} km across {} tracks in {:?}",
        total / 1000.0,
        summaries.len(),
        elapsed
    );

    if let Some(path) = state_file {
        run_persistent_replay(&tracks, config, path)?;
    }

    Ok(())
}

/// Feed all tracks, in order, into a persistent odometer.
fn run_persistent_replay(
    tracks: &[(String, Vec<FixSample>)],
    config: OdometerConfig,
    path: &Path,
) -> tripmeter::Result<()> {
    println!("\n{}", "=".repeat(60));
    println!("PERSISTENT ODOMETER: {}", path.display());
    println!("{}", "=".repeat(60));

    let controller = TrackingSessionController::new(
        Arc::new(OdometerEngine::with_config(config)),
        Arc::new(NoopProvider),
        Arc::new(JsonFileStore::new(path)),
    );

    match controller.rehydrate() {
        Ok(true) => println!("  Continuing from {}", controller.engine().snapshot()),
        Ok(false) => println!("  No stored state, starting at zero"),
        Err(e) => println!("  Stored state unusable ({}), starting at zero", e),
    }

    controller.set_tracking_enabled(true)?;
    for (id, fixes) in tracks {
        let before = controller.engine().snapshot().total_distance;
        for fix in fixes {
            if let Err(e) = controller.on_fix_received(*fix) {
                log::warn!("{}: {}", id, e);
            }
        }
        let after = controller.engine().snapshot().total_distance;
        println!("  {:<40} +{:.2} km", id, (after - before) / 1000.0);
    }
    controller.set_tracking_enabled(false)?;

    println!("  Odometer now: {}", controller.engine().snapshot());
    Ok(())
}

fn run_show(path: &Path) -> tripmeter::Result<()> {
    let store = JsonFileStore::new(path);
    match store.load()? {
        Some(state) => {
            if let Err(e) = state.validate() {
                println!("WARNING: {}", e);
            }
            println!("Odometer: {}", state);
            println!("Phase:    {:?}", state.phase());
            println!("Fixes:    {}", state.sample_count);
            if let Some(fix) = state.last_accepted_fix {
                println!(
                    "Last fix: {:.6}, {:.6} (±{:.1} m) at t={}ms",
                    fix.latitude, fix.longitude, fix.horizontal_accuracy, fix.timestamp_ms
                );
            }
        }
        None => println!("No odometer state at {}", path.display()),
    }
    Ok(())
}

fn run_reset(path: &Path) -> tripmeter::Result<()> {
    JsonFileStore::new(path).clear()?;
    println!("Odometer state at {} removed", path.display());
    Ok(())
}
