//! Configuration types for the date fixer

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// What to do when an image already carries a capture date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum EmbeddedPolicy {
    /// Keep an existing capture date that falls on the derived day
    /// (it is likely more precise than the reconstructed time)
    #[default]
    SameDay,
    /// Rewrite unless the existing capture date equals the derived timestamp
    Exact,
}

/// Kind of media, decided once from the extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// Still images (jpg, png, ...)
    Image,
    /// Videos (mp4, 3gp, ...)
    Video,
}

impl MediaKind {
    /// Label used in reports
    pub fn label(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }
}

/// Configuration for the date fixer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Folders to scan (not recursive)
    pub folders: Vec<PathBuf>,

    /// Treat each folder as a WhatsApp `Media` root and add the
    /// `WhatsApp Images` / `WhatsApp Video` (and `Sent`) subfolders
    #[serde(default)]
    pub probe_layout: bool,

    /// Policy for images that already carry a capture date
    #[serde(default)]
    pub embedded_policy: EmbeddedPolicy,

    /// Largest file growth in bytes accepted after a patch before the file
    /// is reported as possibly corrupted
    pub size_tolerance: u64,

    /// Dry run mode - inspect only, change nothing
    pub dry_run: bool,

    /// Verbose output
    pub verbose: bool,

    /// Image extensions accepted by the collector
    pub image_extensions: Vec<String>,

    /// Video extensions accepted by the collector
    pub video_extensions: Vec<String>,

    /// Image extensions whose embedded capture date is read and written
    pub embedded_extensions: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            folders: vec![],
            probe_layout: false,
            embedded_policy: EmbeddedPolicy::default(),
            size_tolerance: 128,
            dry_run: false,
            verbose: false,
            image_extensions: vec!["jpg".into(), "jpeg".into(), "png".into()],
            video_extensions: vec![
                "mp4".into(),
                "avi".into(),
                "mkv".into(),
                "mov".into(),
                "flv".into(),
                "3gp".into(),
            ],
            embedded_extensions: vec!["jpg".into(), "jpeg".into()],
        }
    }
}

impl Config {
    /// Check if a file extension is an accepted image format
    pub fn is_image(&self, ext: &str) -> bool {
        let ext_lower = ext.to_lowercase();
        self.image_extensions.iter().any(|e| e == &ext_lower)
    }

    /// Check if a file extension is an accepted video format
    pub fn is_video(&self, ext: &str) -> bool {
        let ext_lower = ext.to_lowercase();
        self.video_extensions.iter().any(|e| e == &ext_lower)
    }

    /// Check if the embedded capture date of this format can be patched
    pub fn supports_embedded(&self, ext: &str) -> bool {
        let ext_lower = ext.to_lowercase();
        self.is_image(&ext_lower) && self.embedded_extensions.iter().any(|e| e == &ext_lower)
    }

    /// Default log level: DEBUG when verbose
    pub fn log_level(&self) -> tracing::Level {
        if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Get the media kind for a given extension
    pub fn media_kind(&self, ext: &str) -> Option<MediaKind> {
        if self.is_image(ext) {
            Some(MediaKind::Image)
        } else if self.is_video(ext) {
            Some(MediaKind::Video)
        } else {
            None
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.normalize_extensions();

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError {
            source: e,
        })?;

        fs::write(path, content).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(())
    }

    /// Lowercase and strip leading dots so lookups stay cheap
    fn normalize_extensions(&mut self) {
        for list in [
            &mut self.image_extensions,
            &mut self.video_extensions,
            &mut self.embedded_extensions,
        ] {
            for ext in list.iter_mut() {
                *ext = ext.trim_start_matches('.').to_lowercase();
            }
        }
    }

    /// Generate a sample configuration file content
    pub fn sample_config() -> String {
        r#"# WhatsApp Date Fixer Configuration File
# This file uses TOML format (https://toml.io)

# Folders holding WhatsApp media (only the folder itself is scanned,
# not its subfolders)
folders = [
    "/sdcard/WhatsApp/Media/WhatsApp Images",
    "/sdcard/WhatsApp/Media/WhatsApp Video",
]

# Treat each folder as a WhatsApp "Media" root and also scan
# "WhatsApp Images", "WhatsApp Video" and their "Sent" subfolders
probe_layout = false

# Existing capture dates in images: "same-day" or "exact"
# - same-day: keep a capture date that falls on the day in the filename
# - exact: overwrite unless it already equals the reconstructed time
embedded_policy = "same-day"

# Largest growth in bytes accepted after a patch; shrinking files or
# larger growth are reported as possibly corrupted
size_tolerance = 128

# Dry run mode - show what would be done without doing it
dry_run = false

# Verbose output
verbose = false

# Accepted extensions
image_extensions = ["jpg", "jpeg", "png"]
video_extensions = ["mp4", "avi", "mkv", "mov", "flv", "3gp"]

# Image formats whose EXIF capture date is rewritten
embedded_extensions = ["jpg", "jpeg"]
"#
        .to_string()
    }
}

/// Errors that can occur when loading or saving configuration
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read configuration file
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to parse configuration file
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    /// Failed to write configuration file
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to serialize configuration
    SerializeError {
        source: toml::ser::Error,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError { path, source } => {
                write!(f, "Failed to read config file '{}': {}", path.display(), source)
            }
            ConfigError::ParseError { path, source } => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), source)
            }
            ConfigError::WriteError { path, source } => {
                write!(f, "Failed to write config file '{}': {}", path.display(), source)
            }
            ConfigError::SerializeError { source } => {
                write!(f, "Failed to serialize config: {}", source)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::ReadError { source, .. } => Some(source),
            ConfigError::ParseError { source, .. } => Some(source),
            ConfigError::WriteError { source, .. } => Some(source),
            ConfigError::SerializeError { source } => Some(source),
        }
    }
}
