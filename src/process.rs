//! Batch runner
//!
//! Handles the core loop of:
//! - Collecting WhatsApp media files from the input folders
//! - Deriving each file's timestamp from its name
//! - Inspecting and patching filesystem and embedded metadata
//! - Checking file sizes for signs of corruption
//! - Stopping cleanly between files when cancellation is requested
//!
//! Files are processed strictly one after the other. Each file is fully
//! settled (patched and size-checked) before the cancellation token is
//! looked at, so a stop request never interrupts a write.

use crate::cancel::CancellationToken;
use crate::collect::{MediaFile, collect_files};
use crate::config::Config;
use crate::error::Result;
use crate::inspect::inspect;
use crate::layout::expand_folders;
use crate::patch::{PatchReport, apply};
use crate::report::{Message, MessageSink};
use crate::time::{DerivedTimestamp, MAX_SEQUENCE, derive_timestamp};
use std::fs;
use std::path::PathBuf;
use tracing::{Level, debug, error, info, span, warn};

/// Status of a single file after processing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    /// At least one timestamp was changed
    Modified,
    /// Everything already matched
    Skipped,
    /// Dry run - would have been changed
    WouldModify,
    /// Processing failed, the file was left as it was found
    Failed,
}

impl FileStatus {
    pub fn label(&self) -> &'static str {
        match self {
            FileStatus::Modified => "Modified",
            FileStatus::Skipped => "Skipped",
            FileStatus::WouldModify => "Would modify",
            FileStatus::Failed => "Failed",
        }
    }
}

/// Result of processing a single file
#[derive(Debug, Clone)]
pub struct FileResult {
    /// Full path of the file
    pub path: PathBuf,
    /// Timestamp derived from the file name
    pub target: DerivedTimestamp,
    /// Processing status
    pub status: FileStatus,
    /// Updates applied
    pub patch: PatchReport,
    /// Size change in bytes when it fell outside the tolerance
    pub suspect_delta: Option<i64>,
    /// Error message (if failed)
    pub error: Option<String>,
}

/// Counters for one invocation of [`BatchRunner::run`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStatistics {
    pub total_files: usize,
    /// 1-based position of the last file handled
    pub index: usize,
    pub modified: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Files whose size changed suspiciously
    pub suspect: usize,
}

impl RunStatistics {
    pub fn summary(&self) -> String {
        format!(
            "Total: {}, Modified: {}, Skipped: {}, Failed: {}, Possibly corrupted: {}",
            self.total_files, self.modified, self.skipped, self.failed, self.suspect
        )
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every collected file was handled
    Completed,
    /// Cancellation was requested, the remaining files were not touched
    Interrupted,
}

/// Everything a run produced
#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub stats: RunStatistics,
    pub results: Vec<FileResult>,
}

/// Size change outside the accepted window, as a signed delta
///
/// Metadata rewrites may grow a file by a few bytes. Any shrinkage, or
/// growth beyond `tolerance`, points at a damaged file.
pub fn suspicious_size_change(initial: u64, final_size: u64, tolerance: u64) -> Option<i64> {
    let delta = final_size as i64 - initial as i64;
    if delta < 0 || delta > tolerance as i64 {
        Some(delta)
    } else {
        None
    }
}

/// Sequential retimestamping of a batch of WhatsApp media files
pub struct BatchRunner {
    config: Config,
    cancel: CancellationToken,
}

impl BatchRunner {
    /// Create a runner; `cancel` is observed between files for the whole run
    pub fn new(config: Config, cancel: CancellationToken) -> Self {
        Self { config, cancel }
    }

    /// Folders that will be scanned, after layout probing
    pub fn folders(&self) -> Vec<PathBuf> {
        expand_folders(&self.config.folders, self.config.probe_layout)
    }

    /// Collect the files a run would process
    pub fn collect(&self, sink: &mut dyn MessageSink) -> Vec<MediaFile> {
        collect_files(&self.folders(), &self.config, sink)
    }

    /// Run the batch
    pub fn run(&self, sink: &mut dyn MessageSink) -> RunReport {
        let _span = span!(Level::INFO, "batch_run").entered();

        info!("Scanning input folders...");
        let files = self.collect(sink);
        let total = files.len();
        info!(count = total, "Found WhatsApp media files");
        sink.emit(Message::info(format!("Number of files: {total}")));

        let mut stats = RunStatistics {
            total_files: total,
            ..RunStatistics::default()
        };
        let mut results = Vec::with_capacity(total);
        let mut outcome = RunOutcome::Completed;
        let width = total.to_string().len();

        for (i, file) in files.iter().enumerate() {
            // Checked before every file, so a stop requested while scanning
            // or during the previous file leaves this one untouched
            if self.cancel.is_cancelled() {
                outcome = RunOutcome::Interrupted;
                warn!(processed = i, total, "Cancellation requested");
                sink.emit(Message::warning(format!(
                    "Interrupted, stopping after {i} of {total} files"
                )));
                break;
            }

            stats.index = i + 1;
            let position = format!("{:>width$}/{}", stats.index, total);
            let result = self.process_file(file, &position, sink);

            match result.status {
                FileStatus::Modified | FileStatus::WouldModify => stats.modified += 1,
                FileStatus::Skipped => stats.skipped += 1,
                FileStatus::Failed => stats.failed += 1,
            }
            if result.suspect_delta.is_some() {
                stats.suspect += 1;
            }

            let line = format!(
                "{position} {} {}",
                result.status.label(),
                result.path.display()
            );
            match result.status {
                FileStatus::Failed => sink.emit(Message::error(format!(
                    "{line}: {}",
                    result.error.as_deref().unwrap_or("unknown error")
                ))),
                _ => sink.emit(Message::info(line)),
            }
            results.push(result);
        }

        info!("{}", stats.summary());
        sink.emit(Message::info(stats.summary()));
        if outcome == RunOutcome::Completed {
            sink.emit(Message::info("Finished!"));
        }

        RunReport {
            outcome,
            stats,
            results,
        }
    }

    /// Process a single file; failures are captured in the result
    ///
    /// `position` (`i/total`) prefixes every warning and error about the file.
    fn process_file(
        &self,
        file: &MediaFile,
        position: &str,
        sink: &mut dyn MessageSink,
    ) -> FileResult {
        let path = file.path();
        let _file_span = span!(Level::DEBUG, "process_file", file = %file.name).entered();

        if file.parsed.is_clamped() {
            warn!(
                file = %file.name,
                sequence = file.parsed.raw_sequence,
                "Sequence number clamped"
            );
            sink.emit(Message::warning(format!(
                "{position} Time order won't be preserved for {}: sequence number {} is above {}",
                file.name, file.parsed.raw_sequence, MAX_SEQUENCE
            )));
        }

        let target = derive_timestamp(&file.parsed);
        debug!(kind = file.kind.label(), %target, "Derived timestamp");

        let mut result = FileResult {
            path: path.clone(),
            target,
            status: FileStatus::Skipped,
            patch: PatchReport::default(),
            suspect_delta: None,
            error: None,
        };

        match self.fix_file(file, &target) {
            Ok(FixOutcome::DryRun { would_modify }) => {
                result.status = if would_modify {
                    FileStatus::WouldModify
                } else {
                    FileStatus::Skipped
                };
            }
            Ok(FixOutcome::Patched {
                patch,
                initial_size,
                final_size,
            }) => {
                result.patch = patch;
                result.status = if patch.any() {
                    FileStatus::Modified
                } else {
                    FileStatus::Skipped
                };

                if let Some(delta) =
                    suspicious_size_change(initial_size, final_size, self.config.size_tolerance)
                {
                    error!(?path, initial_size, final_size, delta, "Possible corruption");
                    sink.emit(Message::error(format!(
                        "{position} File {} may be corrupted: size went from {} to {} bytes \
                         ({:+} bytes). Open it to check that it is fine, especially its EXIF \
                         metadata.",
                        path.display(),
                        initial_size,
                        final_size,
                        delta
                    )));
                    result.suspect_delta = Some(delta);
                }
            }
            Err(e) => {
                error!(?path, error = %e, "Failed to fix file");
                result.status = FileStatus::Failed;
                result.error = Some(e.to_string());
            }
        }

        result
    }

    fn fix_file(&self, file: &MediaFile, target: &DerivedTimestamp) -> Result<FixOutcome> {
        let path = file.path();
        let initial_size = fs::metadata(&path)?.len();

        let (_, inspection) = inspect(file, target, self.config.embedded_policy)?;
        if self.config.dry_run {
            return Ok(FixOutcome::DryRun {
                would_modify: inspection.any(),
            });
        }

        let patch = apply(file, target, &inspection)?;
        let final_size = fs::metadata(&path)?.len();

        Ok(FixOutcome::Patched {
            patch,
            initial_size,
            final_size,
        })
    }
}

enum FixOutcome {
    DryRun {
        would_modify: bool,
    },
    Patched {
        patch: PatchReport,
        initial_size: u64,
        final_size: u64,
    },
}
