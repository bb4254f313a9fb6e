//! WhatsApp Date Fixer - restore capture timestamps of WhatsApp media
//!
//! WhatsApp renames media to `IMG-YYYYMMDD-WA####.jpg` style names and may
//! strip the original EXIF data. This library rebuilds a plausible full
//! timestamp from the name alone and applies it with support for:
//! - Deterministic date and time-of-day derivation from the filename
//! - Filesystem modification/access time patching
//! - EXIF `DateTimeOriginal` patching through an atomic file replace
//! - Idempotent runs (already fixed files are skipped)
//! - Size-based corruption detection and clean cancellation between files

pub mod cancel;
pub mod cli;
pub mod collect;
pub mod config;
pub mod error;
pub mod inspect;
pub mod layout;
pub mod patch;
pub mod process;
pub mod report;
pub mod time;

pub use cancel::CancellationToken;
pub use cli::Cli;
pub use collect::{MediaFile, collect_files, count_matching};
pub use config::{Config, ConfigError, EmbeddedPolicy, MediaKind};
pub use error::{Error, Result};
pub use process::{BatchRunner, FileResult, FileStatus, RunOutcome, RunReport, RunStatistics};
pub use report::{Level, MemorySink, Message, MessageSink, TracingSink};
pub use time::{DerivedTimestamp, ParsedName, derive_timestamp, parse_whatsapp_name};
