//! Metadata inspection
//!
//! Reads the current timestamps of a file and decides, independently for
//! the filesystem and the embedded capture date, whether a patch is needed.
//! Nothing here writes.

use crate::collect::MediaFile;
use crate::config::EmbeddedPolicy;
use crate::error::Result;
use crate::time::DerivedTimestamp;
use crate::time::exif::read_capture_date;
use chrono::{DateTime, Local, NaiveDateTime};
use std::fs;
use std::path::Path;
use tracing::trace;

/// Timestamps of a file read right before deciding what to patch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataState {
    /// Last modification time
    pub modified: DateTime<Local>,
    /// Last access time
    pub accessed: DateTime<Local>,
    /// Creation time, where the platform reports one
    pub created: Option<DateTime<Local>>,
    /// Embedded capture date (images with embedded support only)
    pub embedded: Option<NaiveDateTime>,
}

/// Which updates a file needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Inspection {
    /// Modification/access times are not on the derived day
    pub filesystem: bool,
    /// Embedded capture date is missing or differs under the active policy
    pub embedded: bool,
}

impl Inspection {
    /// Whether anything needs to change
    pub fn any(&self) -> bool {
        self.filesystem || self.embedded
    }
}

/// Read the filesystem part of the metadata state
pub fn read_file_times(
    path: &Path,
) -> Result<(DateTime<Local>, DateTime<Local>, Option<DateTime<Local>>)> {
    let metadata = fs::metadata(path)?;
    let modified = DateTime::<Local>::from(metadata.modified()?);
    let accessed = DateTime::<Local>::from(metadata.accessed()?);
    let created = metadata.created().ok().map(DateTime::<Local>::from);
    Ok((modified, accessed, created))
}

/// Snapshot the current metadata of a file
pub fn read_state(file: &MediaFile) -> Result<MetadataState> {
    let path = file.path();
    let (modified, accessed, created) = read_file_times(&path)?;
    let embedded = if file.embedded_supported {
        read_capture_date(&path)?
    } else {
        None
    };

    Ok(MetadataState {
        modified,
        accessed,
        created,
        embedded,
    })
}

/// Whether the filesystem timestamps need to move to `target`
///
/// Compared by calendar day on the modification time: filesystems round
/// timestamps differently, and the access time moves whenever the file is
/// read (including by this inspection), so neither exact seconds nor the
/// access time can tell whether an earlier run already fixed the file.
pub fn filesystem_needs_update(state: &MetadataState, target: &DerivedTimestamp) -> bool {
    state.modified.date_naive() != target.date()
}

/// Whether the embedded capture date needs to move to `target`
pub fn embedded_needs_update(
    embedded: Option<NaiveDateTime>,
    target: &DerivedTimestamp,
    policy: EmbeddedPolicy,
) -> bool {
    match (embedded, policy) {
        (None, _) => true,
        (Some(current), EmbeddedPolicy::SameDay) => current.date() != target.date(),
        (Some(current), EmbeddedPolicy::Exact) => current != target.datetime(),
    }
}

/// Inspect a file against its derived timestamp
pub fn inspect(
    file: &MediaFile,
    target: &DerivedTimestamp,
    policy: EmbeddedPolicy,
) -> Result<(MetadataState, Inspection)> {
    let state = read_state(file)?;
    let inspection = Inspection {
        filesystem: filesystem_needs_update(&state, target),
        embedded: file.embedded_supported && embedded_needs_update(state.embedded, target, policy),
    };

    trace!(
        file = %file.name,
        modified = %state.modified,
        embedded = ?state.embedded,
        ?inspection,
        "Inspected metadata"
    );

    Ok((state, inspection))
}
