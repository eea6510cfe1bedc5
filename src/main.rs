use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sparkify_etl::batch::{load_log_data, load_song_data, BatchOptions, BatchReport};
use sparkify_etl::models::LoadStats;
use sparkify_etl::progress::{format_duration, set_log_only};
use sparkify_etl::storage::SqliteStorage;

#[derive(Parser)]
#[command(name = "sparkify-etl")]
#[command(about = "Load Sparkify song metadata and activity logs into a SQLite star schema")]
struct Args {
    /// SQLite database to load into (created if missing)
    #[arg(long, default_value = "sparkify.db")]
    db: PathBuf,

    /// Root directory of song metadata files
    #[arg(long, default_value = "data/song_data")]
    song_data: PathBuf,

    /// Root directory of activity log files
    #[arg(long, default_value = "data/log_data")]
    log_data: PathBuf,

    /// Extension of input files, without the dot
    #[arg(long, default_value = "json")]
    extension: String,

    /// Drop and recreate all tables before loading
    #[arg(long)]
    reset: bool,

    /// Keep going after a file fails instead of aborting the run
    #[arg(long)]
    continue_on_error: bool,

    /// Hide progress bars and log one line per processed file
    #[arg(long)]
    log_only: bool,

    /// Write run statistics as JSON to this path
    #[arg(long)]
    stats: Option<PathBuf>,
}

fn print_failures(report: &BatchReport) {
    for failure in &report.failures {
        eprintln!("  FAILED {}: {}", failure.path.display(), failure.error);
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    set_log_only(args.log_only);

    let start = Instant::now();

    info!("Opening database: {:?}", args.db);
    let mut storage = SqliteStorage::open(&args.db)
        .with_context(|| format!("Failed to open database {}", args.db.display()))?;

    if args.reset {
        storage.reset().context("Failed to reset tables")?;
    }

    let options = BatchOptions {
        extension: args.extension.clone(),
        continue_on_error: args.continue_on_error,
    };

    let songs = load_song_data(&mut storage, &args.song_data, &options)
        .context("Song data load failed")?;
    print_failures(&songs);

    let logs = load_log_data(&mut storage, &args.log_data, &options)
        .context("Log data load failed")?;
    print_failures(&logs);

    let mut stats = LoadStats::default();
    stats.absorb(&songs.stats);
    stats.absorb(&logs.stats);

    let counts = storage.counts().context("Failed to count rows")?;

    println!("\n{:=<60}", "");
    println!("Load complete!");
    println!("  Song files: {}/{} ({})", songs.processed, songs.found, format_duration(songs.elapsed));
    println!("  Log files:  {}/{} ({})", logs.processed, logs.found, format_duration(logs.elapsed));
    println!("  Events: {} ({} not NextSong, {} skipped)", stats.events, stats.discarded_events, stats.skipped_events);
    println!("  Songplays: {} ({:.1}% resolved)", stats.songplays, stats.resolve_rate());
    println!(
        "  Tables: songs={} artists={} users={} time={} songplays={}",
        counts.songs, counts.artists, counts.users, counts.time, counts.songplays
    );
    println!("  Elapsed: {:.2}s", start.elapsed().as_secs_f64());
    println!("{:=<60}", "");

    if let Some(path) = &args.stats {
        stats
            .write_to_file(path)
            .with_context(|| format!("Failed to write stats to {}", path.display()))?;
        stats.log_phase("run");
    }

    Ok(())
}
