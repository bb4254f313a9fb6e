//! Candidate file collection
//!
//! Lists the files directly inside each configured folder and keeps the ones
//! whose name follows the WhatsApp convention with an accepted extension.

use crate::config::{Config, MediaKind};
use crate::report::{Message, MessageSink};
use crate::time::{ParsedName, parse_whatsapp_name};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// A WhatsApp media file selected for processing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    /// Folder holding the file
    pub folder: PathBuf,
    /// File name inside `folder`
    pub name: String,
    /// Image or video, from the extension
    pub kind: MediaKind,
    /// Date and sequence recovered from `name`
    pub parsed: ParsedName,
    /// Whether the embedded capture date can be read and rewritten
    pub embedded_supported: bool,
}

impl MediaFile {
    /// Classify a file name, or `None` if it is not a WhatsApp media file
    pub fn from_name(folder: &Path, name: &str, config: &Config) -> Option<Self> {
        let parsed = parse_whatsapp_name(name)?;
        let kind = config.media_kind(&parsed.extension)?;
        let embedded_supported =
            kind == MediaKind::Image && config.supports_embedded(&parsed.extension);

        Some(Self {
            folder: folder.to_path_buf(),
            name: name.to_string(),
            kind,
            parsed,
            embedded_supported,
        })
    }

    /// Full path, the identity of the file
    pub fn path(&self) -> PathBuf {
        self.folder.join(&self.name)
    }
}

/// Collect all matching files from the given folders
///
/// Folders are scanned in order, files within a folder by name. A folder
/// listed twice is scanned once. Missing folders are reported through the
/// sink and skipped.
pub fn collect_files(
    folders: &[PathBuf],
    config: &Config,
    sink: &mut dyn MessageSink,
) -> Vec<MediaFile> {
    let mut files = Vec::new();
    let mut seen_folders = HashSet::new();

    for folder in folders {
        if !seen_folders.insert(folder.clone()) {
            debug!(?folder, "Folder listed twice, skipping");
            continue;
        }

        if !folder.is_dir() {
            warn!(?folder, "Input folder does not exist, skipping");
            sink.emit(Message::warning(format!(
                "Folder {} does not exist, skipping",
                folder.display()
            )));
            continue;
        }

        let before = files.len();
        for entry in WalkDir::new(folder)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(?folder, error = %e, "Failed to read folder entry");
                    sink.emit(Message::warning(format!(
                        "Cannot read an entry of {}: {}",
                        folder.display(),
                        e
                    )));
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let Some(name) = entry.file_name().to_str() else {
                continue;
            };

            if let Some(file) = MediaFile::from_name(folder, name, config) {
                files.push(file);
            }
        }

        debug!(?folder, count = files.len() - before, "Scanned folder");
    }

    files
}

/// Count matching files in a single folder without touching them
pub fn count_matching(folder: &Path, config: &Config) -> crate::Result<usize> {
    let mut count = 0;
    for entry in WalkDir::new(folder).min_depth(1).max_depth(1).follow_links(true) {
        let entry = entry?;
        if entry.file_type().is_file()
            && let Some(name) = entry.file_name().to_str()
            && MediaFile::from_name(folder, name, config).is_some()
        {
            count += 1;
        }
    }
    Ok(count)
}
