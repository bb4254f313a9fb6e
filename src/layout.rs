//! WhatsApp media folder layout
//!
//! On a phone, WhatsApp keeps received media under
//! `WhatsApp/Media/WhatsApp Images` and `WhatsApp/Media/WhatsApp Video`,
//! each with a `Sent` subfolder for media the user sent.

use std::path::{Path, PathBuf};
use tracing::debug;

/// Media root used when no folder is given
pub const DEFAULT_MEDIA_ROOT: &str = "WhatsApp/Media";

/// Subfolders of the media root holding images and videos
const MEDIA_SUBFOLDERS: &[&str] = &["WhatsApp Images", "WhatsApp Video"];

/// Subfolder of each media folder holding sent media
const SENT_SUBFOLDER: &str = "Sent";

/// List the root and every conventional media subfolder that exists
pub fn probe_whatsapp_layout(root: &Path) -> Vec<PathBuf> {
    let mut folders = vec![root.to_path_buf()];

    for sub in MEDIA_SUBFOLDERS {
        let media = root.join(sub);
        if media.is_dir() {
            folders.push(media.clone());
        }
        let sent = media.join(SENT_SUBFOLDER);
        if sent.is_dir() {
            folders.push(sent);
        }
    }

    debug!(?root, found = folders.len() - 1, "Probed WhatsApp layout");
    folders
}

/// Expand each folder through [`probe_whatsapp_layout`] when `probe` is set
pub fn expand_folders(folders: &[PathBuf], probe: bool) -> Vec<PathBuf> {
    if !probe {
        return folders.to_vec();
    }
    folders
        .iter()
        .flat_map(|folder| probe_whatsapp_layout(folder))
        .collect()
}
