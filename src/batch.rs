//! Batch driver: discover files under a root and load them one at a time.
//!
//! Each file is its own unit of work: loaded, then committed, before the next
//! file is opened. A failed file is rolled back. By default the batch then
//! stops, because rerunning a partially loaded batch duplicates songplays.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{error, info};

use crate::discover::find_files;
use crate::error::{BatchError, LoadError};
use crate::log_file::load_log_file;
use crate::models::LoadStats;
use crate::progress::{create_progress_bar, log_progress};
use crate::song_file::load_song_file;
use crate::storage::Storage;

#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// File extension to pick up, without the dot.
    pub extension: String,
    /// Log a failed file and keep going instead of aborting.
    pub continue_on_error: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            extension: "json".to_string(),
            continue_on_error: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: String,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub found: usize,
    pub processed: usize,
    pub failures: Vec<FileFailure>,
    pub stats: LoadStats,
    pub elapsed: Duration,
}

/// Run `loader` over every matching file under `root`, committing after each.
pub fn process_data<S, F>(
    storage: &mut S,
    root: &Path,
    label: &str,
    mut loader: F,
    options: &BatchOptions,
) -> Result<BatchReport, BatchError>
where
    S: Storage + ?Sized,
    F: FnMut(&mut S, &Path) -> Result<LoadStats, LoadError>,
{
    let start = Instant::now();
    let files = find_files(root, &options.extension)?;
    let total = files.len();
    info!("{} files found in {}", total, root.display());

    let mut report = BatchReport {
        found: total,
        ..Default::default()
    };
    let pb = create_progress_bar(total as u64, label);

    for (i, path) in files.iter().enumerate() {
        let index = i + 1;
        let outcome = loader(storage, path).and_then(|stats| {
            storage
                .commit()
                .map(|_| stats)
                .map_err(|source| LoadError::Storage {
                    path: path.clone(),
                    source,
                })
        });

        match outcome {
            Ok(stats) => {
                report.stats.absorb(&stats);
                report.processed += 1;
            }
            Err(err) => {
                storage.rollback().map_err(|source| BatchError::Rollback {
                    path: path.clone(),
                    source,
                })?;
                report.stats.failed_files += 1;
                if !options.continue_on_error {
                    pb.abandon();
                    return Err(BatchError::Aborted {
                        index,
                        total,
                        source: err,
                    });
                }
                error!("File {}/{} failed, continuing: {}", index, total, err);
                report.failures.push(FileFailure {
                    path: path.clone(),
                    error: err.to_string(),
                });
            }
        }

        pb.inc(1);
        log_progress(index, total);
    }

    report.elapsed = start.elapsed();
    pb.finish_with_message(format!("{}: {} files processed", label, report.processed));
    Ok(report)
}

/// Load every song metadata file under `root`.
pub fn load_song_data<S: Storage + ?Sized>(
    storage: &mut S,
    root: &Path,
    options: &BatchOptions,
) -> Result<BatchReport, BatchError> {
    process_data(storage, root, "Song files", load_song_file::<S>, options)
}

/// Load every activity log file under `root`.
pub fn load_log_data<S: Storage + ?Sized>(
    storage: &mut S,
    root: &Path,
    options: &BatchOptions,
) -> Result<BatchReport, BatchError> {
    process_data(storage, root, "Log files", load_log_file::<S>, options)
}
