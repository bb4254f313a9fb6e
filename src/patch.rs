//! Metadata patching
//!
//! Applies the updates an [`Inspection`] asked for and nothing else.
//!
//! The embedded capture date is written into a temporary copy next to the
//! original, which then replaces the original with a single rename. An
//! interruption at any point leaves either the untouched original or the
//! fully patched file, never a file stripped of its metadata.

use crate::collect::MediaFile;
use crate::config::MediaKind;
use crate::error::{Error, Result};
use crate::inspect::Inspection;
use crate::time::DerivedTimestamp;
use crate::time::exif::has_exif_block;
use little_exif::exif_tag::ExifTag;
use little_exif::metadata::Metadata;
use std::fs::{self, File};
use std::io;
use std::path::Path;
use tracing::debug;

/// Updates actually applied to a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PatchReport {
    /// Modification/access times were set
    pub filesystem: bool,
    /// Embedded capture date was written
    pub embedded: bool,
}

impl PatchReport {
    /// Whether the file changed at all
    pub fn any(&self) -> bool {
        self.filesystem || self.embedded
    }
}

/// Apply the updates flagged by `inspection`
///
/// The embedded date goes first: replacing the file gives it a fresh
/// modification time, so the filesystem timestamps are always set after an
/// embedded write even if they looked right before.
pub fn apply(
    file: &MediaFile,
    target: &DerivedTimestamp,
    inspection: &Inspection,
) -> Result<PatchReport> {
    let path = file.path();
    let mut report = PatchReport::default();

    if inspection.embedded && file.kind == MediaKind::Image && file.embedded_supported {
        write_capture_date(&path, target)?;
        report.embedded = true;
    }

    if inspection.filesystem || report.embedded {
        set_file_times(&path, target)?;
        report.filesystem = true;
    }

    Ok(report)
}

/// Set both modification and access time to `target`
pub fn set_file_times(path: &Path, target: &DerivedTimestamp) -> Result<()> {
    let time = target.to_file_time();
    filetime::set_file_times(path, time, time).map_err(|e| Error::FileTimes {
        path: path.to_path_buf(),
        source: e,
    })?;
    debug!(?path, %target, "Set file times");
    Ok(())
}

/// Write `DateTimeOriginal` through a temporary copy and an atomic rename
pub fn write_capture_date(path: &Path, target: &DerivedTimestamp) -> Result<()> {
    let folder = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("jpg")
        .to_lowercase();

    // Also rejects files whose container is not an image at all
    let had_exif = has_exif_block(path)?;
    let mut metadata = match Metadata::new_from_path(path) {
        Ok(metadata) => metadata,
        Err(_) if !had_exif => Metadata::new(),
        // Starting from scratch would throw away every other tag
        Err(e) => {
            return Err(Error::ExifWrite {
                path: path.to_path_buf(),
                message: e.to_string(),
            });
        }
    };
    metadata.set_tag(ExifTag::DateTimeOriginal(target.exif_string()));

    let temp = tempfile::Builder::new()
        .prefix(".wa-date-fixer-")
        .suffix(&format!(".{ext}"))
        .tempfile_in(folder)?;

    {
        let mut source = File::open(path)?;
        let mut dest = temp.as_file();
        io::copy(&mut source, &mut dest)?;
        dest.sync_all()?;
    }
    fs::set_permissions(temp.path(), fs::metadata(path)?.permissions())?;

    metadata
        .write_to_file(temp.path())
        .map_err(|e| Error::ExifWrite {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    File::open(temp.path())?.sync_all()?;

    temp.persist(path).map_err(|e| Error::Replace {
        path: path.to_path_buf(),
        source: e.error,
    })?;

    debug!(?path, date = %target.exif_string(), "Wrote DateTimeOriginal");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, EmbeddedPolicy};
    use crate::inspect::inspect;
    use crate::time::derive_timestamp;
    use crate::time::exif::read_capture_date;
    use crate::time::exif::tests::minimal_jpeg;
    use tempfile::tempdir;

    fn media(dir: &Path, name: &str, contents: &[u8]) -> MediaFile {
        fs::write(dir.join(name), contents).unwrap();
        MediaFile::from_name(dir, name, &Config::default()).unwrap()
    }

    #[test]
    fn test_image_patch_is_idempotent() {
        let dir = tempdir().unwrap();
        let file = media(dir.path(), "IMG-20201018-WA0018.jpg", &minimal_jpeg());
        let target = derive_timestamp(&file.parsed);

        let (_, first) = inspect(&file, &target, EmbeddedPolicy::SameDay).unwrap();
        assert!(first.filesystem && first.embedded);
        let report = apply(&file, &target, &first).unwrap();
        assert_eq!(
            report,
            PatchReport {
                filesystem: true,
                embedded: true
            }
        );

        assert_eq!(
            read_capture_date(&file.path()).unwrap(),
            Some(target.datetime())
        );

        let (state, second) = inspect(&file, &target, EmbeddedPolicy::SameDay).unwrap();
        assert_eq!(state.modified.date_naive(), target.date());
        assert!(!second.any());
        assert!(!apply(&file, &target, &second).unwrap().any());
    }

    #[test]
    fn test_video_gets_file_times_only() {
        let dir = tempdir().unwrap();
        let file = media(dir.path(), "VID-20201018-WA0003.mp4", b"not a real video");
        let target = derive_timestamp(&file.parsed);

        let (_, inspection) = inspect(&file, &target, EmbeddedPolicy::SameDay).unwrap();
        let report = apply(&file, &target, &inspection).unwrap();
        assert_eq!(
            report,
            PatchReport {
                filesystem: true,
                embedded: false
            }
        );
        assert_eq!(fs::read(file.path()).unwrap(), b"not a real video");

        let (_, again) = inspect(&file, &target, EmbeddedPolicy::SameDay).unwrap();
        assert!(!again.any());
    }

    #[test]
    fn test_embedded_write_forces_file_times() {
        let dir = tempdir().unwrap();
        let file = media(dir.path(), "IMG-20201018-WA0001.jpg", &minimal_jpeg());
        let target = derive_timestamp(&file.parsed);

        let only_embedded = Inspection {
            filesystem: false,
            embedded: true,
        };
        let report = apply(&file, &target, &only_embedded).unwrap();
        assert!(report.filesystem && report.embedded);

        let modified = fs::metadata(file.path()).unwrap().modified().unwrap();
        assert_eq!(
            chrono::DateTime::<chrono::Local>::from(modified).date_naive(),
            target.date()
        );
    }

    #[test]
    fn test_failed_write_leaves_original() {
        let dir = tempdir().unwrap();
        let garbage = b"definitely not a jpeg".to_vec();
        let file = media(dir.path(), "IMG-20201018-WA0002.jpg", &garbage);
        let target = derive_timestamp(&file.parsed);

        assert!(write_capture_date(&file.path(), &target).is_err());
        assert_eq!(fs::read(file.path()).unwrap(), garbage);

        // No temporary copies left behind
        let leftovers = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }
}
