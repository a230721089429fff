//! One incremental build, start to finish.
//!
//! ```text
//! verify config paths
//!   → open manifest (capture reference time)
//!   → compare header/footer/config against it (forced-rebuild flag)
//!   → ensure dst_dir exists
//!   → walk src_dir
//!   → close manifest (stamp) or abort (restore)
//! ```
//!
//! Any error stops the run. Work already done stays on disk; the manifest
//! keeps the entries it logged but gets its old timestamp back, so the next
//! run re-examines everything that changed since the last good build.

use crate::config::{self, ConfigError, SiteConfig};
use crate::manifest::{self, FileManifest, ManifestError};
use crate::output;
use crate::render::{CommonMark, MarkupEngine};
use crate::staleness::{self, Staleness, TimestampError};
use crate::walk::{BuildContext, BuildEvent, BuildSummary};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error(transparent)]
    Timestamp(#[from] TimestampError),
    #[error("Cannot open directory '{}': {source}", path.display())]
    Directory { path: PathBuf, source: io::Error },
    #[error("Cannot access file '{}': {source}", path.display())]
    FileAccess { path: PathBuf, source: io::Error },
    #[error("Cannot copy '{}' to '{}': {source}", src.display(), dst.display())]
    Copy {
        src: PathBuf,
        dst: PathBuf,
        source: io::Error,
    },
    #[error("'{}' is not under source directory '{}'", path.display(), src_dir.display())]
    OutsideSource { path: PathBuf, src_dir: PathBuf },
    #[error("Cannot start worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

impl BuildError {
    /// OS error code behind this failure, if there is one.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            BuildError::Config(e) => e.raw_os_error(),
            BuildError::Manifest(e) => e.raw_os_error(),
            BuildError::Timestamp(e) => e.source.raw_os_error(),
            BuildError::Directory { source, .. }
            | BuildError::FileAccess { source, .. }
            | BuildError::Copy { source, .. } => source.raw_os_error(),
            BuildError::OutsideSource { .. } | BuildError::WorkerPool(_) => None,
        }
    }
}

/// Where the run's bookkeeping lives.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Config file watched for the forced-rebuild flag. Not watched when it
    /// does not exist.
    pub config_path: PathBuf,
    pub manifest_path: PathBuf,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(config::DEFAULT_CONFIG_FILE),
            manifest_path: PathBuf::from(manifest::DEFAULT_MANIFEST_FILE),
        }
    }
}

/// Run one build with the stock CommonMark engine.
pub fn build(
    config: &SiteConfig,
    options: &BuildOptions,
    events: Option<Sender<BuildEvent>>,
) -> Result<BuildSummary, BuildError> {
    build_with_engine(config, options, &CommonMark::default(), events)
}

/// Run one build, rendering pages with `engine`.
pub fn build_with_engine(
    config: &SiteConfig,
    options: &BuildOptions,
    engine: &dyn MarkupEngine,
    events: Option<Sender<BuildEvent>>,
) -> Result<BuildSummary, BuildError> {
    config.verify_paths()?;

    let (store, snapshot) = FileManifest::open(&options.manifest_path)?;
    match run(config, options, engine, &store, snapshot.reference_time, events) {
        Ok(summary) => {
            store.close(summary.touched() > 0)?;
            Ok(summary)
        }
        Err(e) => {
            // The walk error is the one returned; a failed restore is only
            // worth a warning.
            if let Err(restore) = store.abort() {
                output::print_restore_warning(&restore);
            }
            Err(e)
        }
    }
}

fn run(
    config: &SiteConfig,
    options: &BuildOptions,
    engine: &dyn MarkupEngine,
    store: &FileManifest,
    reference: Option<std::time::SystemTime>,
    events: Option<Sender<BuildEvent>>,
) -> Result<BuildSummary, BuildError> {
    let mut watched = vec![config.header_file.as_path(), config.footer_file.as_path()];
    if options.config_path.is_file() {
        watched.push(options.config_path.as_path());
    }
    let forced = staleness::watched_changed(reference, watched)?;

    fs::create_dir_all(&config.dst_dir).map_err(|source| BuildError::Directory {
        path: config.dst_dir.clone(),
        source,
    })?;

    let mut ctx = BuildContext::new(config, store, Staleness::new(reference, forced), engine)?;
    if let Some(tx) = events {
        ctx = ctx.with_events(tx);
    }
    ctx.walk_tree(config::effective_workers(&config.processing))?;
    Ok(ctx.summary())
}

/// Delete the manifest so the next build treats every path as new.
///
/// Returns whether a manifest was present.
pub fn force_rebuild(manifest_path: &Path) -> Result<bool, BuildError> {
    Ok(manifest::remove_manifest(manifest_path)?)
}
