//! Site configuration module.
//!
//! Handles loading and validating `swege.toml`. Every struct is
//! `#[serde(default)]`, so a config file only needs the keys it wants to
//! change. A missing file means stock defaults.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! site_title = "My Site"        # Appended to every page title
//! src_dir = "content"           # Tree to mirror
//! dst_dir = "dist"              # Where the mirror is written
//! header_file = "header.html"   # Raw bytes prepended to every page
//! footer_file = "footer.html"   # Raw bytes appended to every page
//!
//! [render]
//! title_max_chars = 50          # Cap on titles taken from the first line
//!
//! [processing]
//! max_workers = 30              # Omit for a single-threaded walk
//! ```
//!
//! Relative paths resolve against the working directory of the process, not
//! against the config file.
//!
//! Unknown keys are rejected to catch typos early.

use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default name of the config file, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "swege.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("Cannot access {what} '{}': {source}", path.display())]
    Inaccessible {
        what: &'static str,
        path: PathBuf,
        source: io::Error,
    },
}

impl ConfigError {
    /// OS error code behind this failure, if there is one.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            ConfigError::Io(e) => e.raw_os_error(),
            ConfigError::Inaccessible { source, .. } => source.raw_os_error(),
            _ => None,
        }
    }
}

/// Site configuration loaded from `swege.toml`.
///
/// Immutable for the duration of a build.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Site name, shown in every `<title>`.
    pub site_title: String,
    /// Root of the tree to mirror.
    pub src_dir: PathBuf,
    /// Root of the generated tree.
    pub dst_dir: PathBuf,
    /// File whose bytes open every rendered page.
    pub header_file: PathBuf,
    /// File whose bytes close every rendered page.
    pub footer_file: PathBuf,
    /// Page rendering settings.
    pub render: RenderConfig,
    /// Parallel walk settings.
    pub processing: ProcessingConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            site_title: "My Site".to_string(),
            src_dir: PathBuf::from("content"),
            dst_dir: PathBuf::from("dist"),
            header_file: PathBuf::from("header.html"),
            footer_file: PathBuf::from("footer.html"),
            render: RenderConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.site_title.trim().is_empty() {
            return Err(ConfigError::Validation(
                "site_title must not be empty".into(),
            ));
        }
        if self.render.title_max_chars == 0 {
            return Err(ConfigError::Validation(
                "render.title_max_chars must be at least 1".into(),
            ));
        }
        if self.processing.max_workers == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_workers must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Check that every configured path is usable before a build starts.
    ///
    /// The source directory, header and footer must exist and be readable.
    /// The destination may be absent (the first build creates it) but must
    /// not be a plain file.
    pub fn verify_paths(&self) -> Result<(), ConfigError> {
        fs::read_dir(&self.src_dir).map_err(|source| ConfigError::Inaccessible {
            what: "source directory",
            path: self.src_dir.clone(),
            source,
        })?;

        for (what, path) in [
            ("header file", &self.header_file),
            ("footer file", &self.footer_file),
        ] {
            fs::File::open(path).map_err(|source| ConfigError::Inaccessible {
                what,
                path: path.clone(),
                source,
            })?;
        }

        match fs::metadata(&self.dst_dir) {
            Ok(meta) if !meta.is_dir() => Err(ConfigError::Validation(format!(
                "dst_dir '{}' exists and is not a directory",
                self.dst_dir.display()
            ))),
            Ok(_) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(ConfigError::Inaccessible {
                what: "destination directory",
                path: self.dst_dir.clone(),
                source,
            }),
        }
    }
}

/// Page rendering settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// Titles derived from a page's first line are cut to this many characters.
    pub title_max_chars: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            title_max_chars: 50,
        }
    }
}

/// Parallel walk settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Size of the worker pool for directory visits.
    /// When absent, the tree is walked on the calling thread.
    pub max_workers: Option<usize>,
}

/// Resolve the worker pool size from config.
///
/// - `None` or `Some(1)` → `None` (synchronous walk)
/// - `Some(n)` → `Some(n)`
pub fn effective_workers(config: &ProcessingConfig) -> Option<usize> {
    config.max_workers.filter(|&n| n > 1)
}

// =============================================================================
// Config loading
// =============================================================================

/// Load config from the given file, falling back to stock defaults when the
/// file does not exist. Keys the file leaves out keep their defaults.
///
/// Only value ranges are checked here; [`SiteConfig::verify_paths`] checks
/// the filesystem.
pub fn load_config(path: &Path) -> Result<SiteConfig, ConfigError> {
    let config: SiteConfig = match fs::read_to_string(path) {
        Ok(content) => toml::from_str(&content)?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => SiteConfig::default(),
        Err(e) => return Err(e.into()),
    };
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `swege.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# swege configuration
# ===================
# All settings are optional. Values shown below are the defaults.
# Relative paths are resolved against the directory swege runs in.
# Unknown keys will cause an error.
#
# Editing this file forces every page to be re-rendered on the next build.

# Site name. Pages render as "<page title> - <site_title>", or just the
# site title when a page has none.
site_title = "My Site"

# Tree to mirror. Markdown files are rendered, everything else is copied.
src_dir = "content"

# Where the mirrored tree is written.
dst_dir = "dist"

# Raw HTML written before and after every rendered page. Changing either
# one forces every page to be re-rendered on the next build.
header_file = "header.html"
footer_file = "footer.html"

# ---------------------------------------------------------------------------
# Rendering
# ---------------------------------------------------------------------------
[render]
# Titles taken from a "title:" line or a leading "# heading" are cut to this
# many characters.
title_max_chars = 50

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Number of workers visiting directories in parallel.
# Omit or comment out to walk the tree on a single thread.
# max_workers = 30
"##
}
