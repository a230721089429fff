//! Decides whether a source path needs work in this run.
//!
//! Every comparison uses the file's **modification time**. Status-change time
//! also moves on `chmod`/`chown` and would trigger rebuilds for metadata-only
//! edits.
//!
//! Two inputs come from the manifest snapshot:
//!
//! - the reference time (manifest mtime before the run), and
//! - the forced-rebuild flag, set when the header, footer or config file is
//!   newer than the reference.
//!
//! The flag applies to markup pages only: they embed the header and footer,
//! copied files do not.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;

#[derive(Error, Debug)]
#[error("Cannot access file '{}': {source}", path.display())]
pub struct TimestampError {
    pub path: PathBuf,
    pub source: io::Error,
}

/// Modification time of `path`, following symlinks.
pub fn modified_time(path: &Path) -> Result<SystemTime, TimestampError> {
    fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map_err(|source| TimestampError {
            path: path.to_path_buf(),
            source,
        })
}

/// Whether `path` was modified after `reference`. Everything is newer than a
/// missing reference.
pub fn is_newer(path: &Path, reference: Option<SystemTime>) -> Result<bool, TimestampError> {
    match reference {
        None => Ok(true),
        Some(reference) => Ok(modified_time(path)? > reference),
    }
}

/// Whether any of the shared inputs changed since `reference`.
///
/// Pass only files that exist; a missing config file is simply not watched.
pub fn watched_changed<'a, I>(reference: Option<SystemTime>, watched: I) -> Result<bool, TimestampError>
where
    I: IntoIterator<Item = &'a Path>,
{
    for path in watched {
        if is_newer(path, reference)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Which rule a path is judged by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Own timestamp, or the forced-rebuild flag.
    Page,
    /// Own timestamp only.
    File,
}

/// Per-run staleness oracle.
#[derive(Debug, Clone, Copy)]
pub struct Staleness {
    reference_time: Option<SystemTime>,
    forced_rebuild: bool,
}

impl Staleness {
    /// Build the oracle for a run.
    ///
    /// A missing reference (no manifest before this run) always forces.
    pub fn new(reference_time: Option<SystemTime>, watched_changed: bool) -> Self {
        Self {
            reference_time,
            forced_rebuild: watched_changed || reference_time.is_none(),
        }
    }

    pub fn reference_time(&self) -> Option<SystemTime> {
        self.reference_time
    }

    pub fn forced_rebuild(&self) -> bool {
        self.forced_rebuild
    }

    /// Whether `path` should be rendered or copied now.
    pub fn should_process(&self, path: &Path, rule: Rule) -> Result<bool, TimestampError> {
        if self.reference_time.is_none() {
            return Ok(true);
        }
        if rule == Rule::Page && self.forced_rebuild {
            return Ok(true);
        }
        is_newer(path, self.reference_time)
    }
}
