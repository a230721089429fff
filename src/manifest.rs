//! Persistent record of every source path the builder has seen.
//!
//! The manifest is a flat, append-only text file (`.manifest` in the working
//! directory by default): one source path per line, insertion ordered, no
//! header and no checksum. It answers a single question, "has this path been
//! built before?", and its own modification time is the reference instant
//! that every source timestamp is compared against.
//!
//! ## Reference time
//!
//! The store's modification time is captured in [`FileManifest::open`]
//! *before* the file is opened for append. Opening with `create` would
//! otherwise move the timestamp and every file would look up to date.
//!
//! When a run appended entries or touched the destination tree,
//! [`FileManifest::close`] stamps the store with the instant the run began.
//! Sources edited mid-run are therefore newer than the stamp and are picked
//! up by the following build. If the run fails, [`FileManifest::abort`] puts
//! the previous timestamp back (or removes a store this run created).
//!
//! ## Lookups
//!
//! [`ManifestStore::contains`] re-reads the file from the start on every
//! call. Sites are small enough that a linear scan is cheaper than keeping an
//! index in sync with concurrent appenders.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;
use thiserror::Error;

/// Default manifest location, relative to the working directory.
pub const DEFAULT_MANIFEST_FILE: &str = ".manifest";

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Cannot open manifest '{}': {source}", path.display())]
    Open { path: PathBuf, source: io::Error },
    #[error("Cannot read manifest '{}': {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("Cannot write manifest '{}': {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("Cannot remove manifest '{}': {source}", path.display())]
    Remove { path: PathBuf, source: io::Error },
}

impl ManifestError {
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            ManifestError::Open { source, .. }
            | ManifestError::Read { source, .. }
            | ManifestError::Write { source, .. }
            | ManifestError::Remove { source, .. } => source.raw_os_error(),
        }
    }
}

/// State of the store as found at the start of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManifestSnapshot {
    /// Modification time before this run touched the store.
    /// `None` when the store did not exist, which means nothing was built yet.
    pub reference_time: Option<SystemTime>,
}

impl ManifestSnapshot {
    pub fn existed_before(&self) -> bool {
        self.reference_time.is_some()
    }
}

/// Set of source paths seen by earlier runs.
///
/// Implementations must accept `record` calls from several workers at once
/// without interleaving lines. A `contains` racing a `record` of the same
/// path may miss it.
pub trait ManifestStore: Send + Sync {
    /// Whether `path` was recorded. Always false when the store did not
    /// exist before this run.
    fn contains(&self, path: &str) -> Result<bool, ManifestError>;

    /// Append `path`. Callers check [`contains`](Self::contains) first; a
    /// duplicate line is harmless.
    fn record(&self, path: &str) -> Result<(), ManifestError>;
}

// =============================================================================
// File-backed store
// =============================================================================

/// The on-disk manifest.
#[derive(Debug)]
pub struct FileManifest {
    path: PathBuf,
    file: Mutex<File>,
    snapshot: ManifestSnapshot,
    opened_at: SystemTime,
    appended: AtomicBool,
}

impl FileManifest {
    /// Open the store for append, creating it if absent.
    ///
    /// The returned snapshot carries the pre-run modification time.
    pub fn open(path: &Path) -> Result<(Self, ManifestSnapshot), ManifestError> {
        let opened_at = SystemTime::now();
        let open_err = |source| ManifestError::Open {
            path: path.to_path_buf(),
            source,
        };

        let reference_time = match fs::metadata(path) {
            Ok(meta) => Some(meta.modified().map_err(open_err)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(open_err(e)),
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(open_err)?;

        let snapshot = ManifestSnapshot { reference_time };
        let store = Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
            snapshot,
            opened_at,
            appended: AtomicBool::new(false),
        };
        Ok((store, snapshot))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> ManifestSnapshot {
        self.snapshot
    }

    /// Flush and release the store after a successful run.
    ///
    /// When the run appended entries or `touched` is set, the modification
    /// time is set to the instant [`open`](Self::open) was called.
    pub fn close(self, touched: bool) -> Result<(), ManifestError> {
        let write_err = |source| ManifestError::Write {
            path: self.path.clone(),
            source,
        };
        let mut file = self
            .file
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        file.flush().map_err(write_err)?;

        if touched || self.appended.load(Ordering::Acquire) {
            file.set_modified(self.opened_at).map_err(write_err)?;
        }
        Ok(())
    }

    /// Release the store after a failed run.
    ///
    /// A store created by this run is removed so the next run starts from
    /// scratch. An existing store gets its pre-run modification time back.
    pub fn abort(self) -> Result<(), ManifestError> {
        let file = self
            .file
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        match self.snapshot.reference_time {
            None => {
                drop(file);
                remove_manifest(&self.path).map(|_| ())
            }
            Some(reference) => file
                .set_modified(reference)
                .map_err(|source| ManifestError::Write {
                    path: self.path.clone(),
                    source,
                }),
        }
    }
}

impl ManifestStore for FileManifest {
    fn contains(&self, path: &str) -> Result<bool, ManifestError> {
        if !self.snapshot.existed_before() {
            return Ok(false);
        }
        let read_err = |source| ManifestError::Read {
            path: self.path.clone(),
            source,
        };

        let reader = BufReader::new(File::open(&self.path).map_err(read_err)?);
        for line in reader.lines() {
            if line.map_err(read_err)? == path {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn record(&self, path: &str) -> Result<(), ManifestError> {
        // One write per line; the file is in append mode.
        let line = format!("{path}\n");
        let mut file = self.file.lock().unwrap_or_else(|p| p.into_inner());
        file.write_all(line.as_bytes())
            .map_err(|source| ManifestError::Write {
                path: self.path.clone(),
                source,
            })?;
        self.appended.store(true, Ordering::Release);
        Ok(())
    }
}

/// Delete the manifest, forcing the next run to rebuild everything.
///
/// Returns whether a file was actually removed.
pub fn remove_manifest(path: &Path) -> Result<bool, ManifestError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(ManifestError::Remove {
            path: path.to_path_buf(),
            source,
        }),
    }
}

// =============================================================================
// In-memory store
// =============================================================================

/// A manifest that never touches the disk. Used to drive the walker in tests
/// and in dry runs.
#[derive(Debug, Default)]
pub struct MemoryManifest {
    entries: Mutex<Vec<String>>,
    existed_before: bool,
}

impl MemoryManifest {
    /// A store that did not exist before this run.
    pub fn fresh() -> Self {
        Self::default()
    }

    /// A store left behind by an earlier run.
    pub fn with_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: Mutex::new(entries.into_iter().map(Into::into).collect()),
            existed_before: true,
        }
    }

    /// Every recorded line, in insertion order.
    pub fn entries(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }
}

impl ManifestStore for MemoryManifest {
    fn contains(&self, path: &str) -> Result<bool, ManifestError> {
        if !self.existed_before {
            return Ok(false);
        }
        let entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        Ok(entries.iter().any(|e| e == path))
    }

    fn record(&self, path: &str) -> Result<(), ManifestError> {
        self.entries
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(path.to_string());
        Ok(())
    }
}
