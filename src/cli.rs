//! CLI argument parsing with clap

use crate::config::{Config, EmbeddedPolicy};
use crate::layout::DEFAULT_MEDIA_ROOT;
use clap::Parser;
use std::path::PathBuf;

/// WhatsApp Date Fixer - restore capture dates of WhatsApp media
///
/// Rebuilds the date and an estimated time of day of every
/// `IMG-YYYYMMDD-WA####` / `VID-YYYYMMDD-WA####` file from its name, and
/// writes it to the file's modification time and, for JPEG images, to the
/// EXIF capture date. Running it again on fixed files changes nothing.
#[derive(Parser, Debug)]
#[command(name = "wa-date-fixer")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Folders holding WhatsApp media (default: ./WhatsApp/Media, probed)
    pub folders: Vec<PathBuf>,

    /// Path to configuration file (TOML format)
    ///
    /// When specified, settings from the config file are used as defaults.
    /// CLI arguments will override config file settings.
    #[arg(short = 'C', long)]
    pub config: Option<PathBuf>,

    /// Treat each folder as a WhatsApp "Media" root and also scan its
    /// "WhatsApp Images" / "WhatsApp Video" (and "Sent") subfolders
    #[arg(short, long)]
    pub probe: bool,

    /// Policy for images that already carry a capture date
    #[arg(short = 'P', long, value_enum)]
    pub policy: Option<EmbeddedPolicy>,

    /// Largest growth in bytes accepted after a patch
    #[arg(long)]
    pub size_tolerance: Option<u64>,

    /// Only count matching files per folder, change nothing
    #[arg(long)]
    pub count_only: bool,

    /// Save the effective configuration to this file and exit
    #[arg(long)]
    pub write_config: Option<PathBuf>,

    /// Dry run mode - show what would be done without doing it
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Directory for log files (default: Log/ next to the executable)
    #[arg(long, env = "WA_DATE_FIXER_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Output log format as JSON
    #[arg(long)]
    pub json_log: bool,
}

impl Cli {
    /// Merge CLI arguments with config from file
    /// CLI arguments take precedence over config file settings
    pub fn merge_with_config(&self, mut config: Config) -> Config {
        if !self.folders.is_empty() {
            config.folders = self.folders.clone();
        }
        if self.probe {
            config.probe_layout = true;
        }
        if let Some(policy) = self.policy {
            config.embedded_policy = policy;
        }
        if let Some(tolerance) = self.size_tolerance {
            config.size_tolerance = tolerance;
        }
        if self.dry_run {
            config.dry_run = true;
        }
        if self.verbose {
            config.verbose = true;
        }

        config
    }

    /// Convert CLI arguments to Config (when no config file is used)
    ///
    /// Without folders, the default WhatsApp media root is probed.
    pub fn to_config(&self) -> Config {
        let mut config = self.merge_with_config(Config::default());
        if self.folders.is_empty() {
            config.folders = vec![PathBuf::from(DEFAULT_MEDIA_ROOT)];
            config.probe_layout = true;
        }
        config
    }
}
