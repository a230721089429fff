//! Source tree traversal.
//!
//! The walker visits `src_dir` depth-first and decides, per entry, whether
//! to create a directory, render a page, copy a file or do nothing:
//!
//! | Entry | Not in manifest | Then |
//! |-------|-----------------|------|
//! | Directory | create mapped dir, record | always descend |
//! | MarkupPage | record | render if stale or forced |
//! | PlainFile | record | copy if stale (forced flag ignored) |
//! | Ignored | - | - |
//!
//! Sibling order is whatever the filesystem yields. Symbolic links to
//! directories are skipped, so a link cycle cannot make the walk recurse.
//!
//! ## Shared state
//!
//! Everything a visit needs lives in [`BuildContext`]: the path mapper, the
//! classifier, the staleness oracle, the manifest, the renderer, the
//! counters and the optional progress channel. The context is `Sync`, so the
//! same walk code runs on one thread or on many.
//!
//! ## Worker pool
//!
//! [`walk_parallel`] visits subdirectories on a rayon pool of fixed size.
//! Each subdirectory becomes one task while fewer than `workers` tasks are in
//! flight. Once the budget is used up the current thread recurses into the
//! subdirectory itself instead of waiting. The rayon scope is the join
//! barrier: the call returns only after every task finished.
//!
//! The first error stops new directory visits and is returned after the
//! join.

use crate::build::BuildError;
use crate::config::SiteConfig;
use crate::copy::copy_file;
use crate::manifest::ManifestStore;
use crate::paths::{Classifier, FileClass, PathMapper, manifest_key};
use crate::render::{MarkupEngine, Renderer};
use crate::staleness::{Rule, Staleness};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::Sender;

/// Progress reported while walking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildEvent {
    DirectoryCreated {
        src: PathBuf,
        dst: PathBuf,
    },
    PageRendered {
        src: PathBuf,
        dst: PathBuf,
        title: Option<String>,
    },
    FileCopied {
        src: PathBuf,
        dst: PathBuf,
        bytes: u64,
    },
    /// Known and up to date.
    Skipped {
        src: PathBuf,
    },
}

/// What a build did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BuildSummary {
    pub directories: usize,
    pub rendered: usize,
    pub copied: usize,
    pub skipped: usize,
}

impl BuildSummary {
    /// Directories created plus pages rendered plus files copied.
    pub fn touched(&self) -> usize {
        self.directories + self.rendered + self.copied
    }
}

impl fmt::Display for BuildSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}, {} {}, {} {}",
            self.directories,
            plural(self.directories, "directory", "directories"),
            self.rendered,
            plural(self.rendered, "page", "pages"),
            self.copied,
            plural(self.copied, "file", "files"),
        )?;
        if self.skipped > 0 {
            write!(f, " ({} unchanged)", self.skipped)?;
        }
        Ok(())
    }
}

fn plural<'s>(n: usize, one: &'s str, many: &'s str) -> &'s str {
    if n == 1 { one } else { many }
}

#[derive(Debug, Default)]
struct Counters {
    directories: AtomicUsize,
    rendered: AtomicUsize,
    copied: AtomicUsize,
    skipped: AtomicUsize,
}

/// Per-run state threaded through every visit.
pub struct BuildContext<'a> {
    mapper: PathMapper,
    classifier: Classifier,
    staleness: Staleness,
    manifest: &'a dyn ManifestStore,
    renderer: Renderer<'a>,
    counters: Counters,
    events: Option<Sender<BuildEvent>>,
}

impl<'a> BuildContext<'a> {
    /// Assemble a context from a config.
    ///
    /// Loads the header and footer, and reserves them and the destination
    /// tree so the walker never treats them as content. Call after the
    /// destination root exists.
    pub fn new(
        config: &SiteConfig,
        manifest: &'a dyn ManifestStore,
        staleness: Staleness,
        engine: &'a dyn MarkupEngine,
    ) -> Result<Self, BuildError> {
        let renderer = Renderer::load(
            &config.header_file,
            &config.footer_file,
            &config.site_title,
            config.render.title_max_chars,
            engine,
        )?;
        let classifier = Classifier::new([
            config.header_file.as_path(),
            config.footer_file.as_path(),
            config.dst_dir.as_path(),
        ]);
        Ok(Self::from_parts(
            PathMapper::new(&config.src_dir, &config.dst_dir),
            classifier,
            staleness,
            manifest,
            renderer,
        ))
    }

    pub fn from_parts(
        mapper: PathMapper,
        classifier: Classifier,
        staleness: Staleness,
        manifest: &'a dyn ManifestStore,
        renderer: Renderer<'a>,
    ) -> Self {
        Self {
            mapper,
            classifier,
            staleness,
            manifest,
            renderer,
            counters: Counters::default(),
            events: None,
        }
    }

    /// Report progress on `tx`.
    pub fn with_events(mut self, tx: Sender<BuildEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn staleness(&self) -> &Staleness {
        &self.staleness
    }

    pub fn summary(&self) -> BuildSummary {
        BuildSummary {
            directories: self.counters.directories.load(Ordering::Relaxed),
            rendered: self.counters.rendered.load(Ordering::Relaxed),
            copied: self.counters.copied.load(Ordering::Relaxed),
            skipped: self.counters.skipped.load(Ordering::Relaxed),
        }
    }

    /// Walk the whole source tree, on a pool of `workers` when given.
    pub fn walk_tree(&self, workers: Option<usize>) -> Result<(), BuildError> {
        let root = self.mapper.src_dir();
        match workers {
            Some(n) => walk_parallel(self, root, n),
            None => walk(self, root),
        }
    }

    fn emit(&self, event: BuildEvent) {
        if let Some(tx) = &self.events {
            // A closed receiver only means nobody is listening.
            let _ = tx.send(event);
        }
    }

    fn outside(&self, path: &Path) -> BuildError {
        BuildError::OutsideSource {
            path: path.to_path_buf(),
            src_dir: self.mapper.src_dir().to_path_buf(),
        }
    }

    /// Record `path` unless it is already known. Returns whether it was new.
    fn record_if_new(&self, path: &Path) -> Result<bool, BuildError> {
        let key = manifest_key(path);
        if self.manifest.contains(&key)? {
            return Ok(false);
        }
        self.manifest.record(&key)?;
        Ok(true)
    }

    fn skip(&self, path: &Path) {
        self.counters.skipped.fetch_add(1, Ordering::Relaxed);
        self.emit(BuildEvent::Skipped {
            src: path.to_path_buf(),
        });
    }

    fn visit_directory(&self, path: &Path) -> Result<(), BuildError> {
        let key = manifest_key(path);
        if self.manifest.contains(&key)? {
            return Ok(());
        }
        let dst = self.mapper.map_path(path).ok_or_else(|| self.outside(path))?;
        fs::create_dir_all(&dst).map_err(|source| BuildError::Directory {
            path: dst.clone(),
            source,
        })?;
        // Logged only once the directory exists.
        self.manifest.record(&key)?;

        self.counters.directories.fetch_add(1, Ordering::Relaxed);
        self.emit(BuildEvent::DirectoryCreated {
            src: path.to_path_buf(),
            dst,
        });
        Ok(())
    }

    fn visit_page(&self, path: &Path) -> Result<(), BuildError> {
        self.record_if_new(path)?;
        if !self.staleness.should_process(path, Rule::Page)? {
            self.skip(path);
            return Ok(());
        }

        let dst = self.mapper.map_page(path).ok_or_else(|| self.outside(path))?;
        let title = self.renderer.render(path, &dst)?;

        self.counters.rendered.fetch_add(1, Ordering::Relaxed);
        self.emit(BuildEvent::PageRendered {
            src: path.to_path_buf(),
            dst,
            title,
        });
        Ok(())
    }

    fn visit_file(&self, path: &Path) -> Result<(), BuildError> {
        self.record_if_new(path)?;
        if !self.staleness.should_process(path, Rule::File)? {
            self.skip(path);
            return Ok(());
        }

        let dst = self.mapper.map_path(path).ok_or_else(|| self.outside(path))?;
        let bytes = copy_file(path, &dst)?;

        self.counters.copied.fetch_add(1, Ordering::Relaxed);
        self.emit(BuildEvent::FileCopied {
            src: path.to_path_buf(),
            dst,
            bytes,
        });
        Ok(())
    }
}

// ============================================================================
// Traversal
// ============================================================================

/// Visit every entry of `dir`, handing subdirectories to `descend` after
/// their destination exists.
fn visit_entries(
    ctx: &BuildContext<'_>,
    dir: &Path,
    descend: &mut dyn FnMut(PathBuf) -> Result<(), BuildError>,
) -> Result<(), BuildError> {
    let dir_err = |source| BuildError::Directory {
        path: dir.to_path_buf(),
        source,
    };

    for entry in fs::read_dir(dir).map_err(dir_err)? {
        let entry = entry.map_err(dir_err)?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(dir_err)?;
        // Links to directories are never followed; links to files are.
        if file_type.is_symlink() && fs::metadata(&path).is_ok_and(|m| m.is_dir()) {
            continue;
        }

        match ctx.classifier.classify(&path, file_type.is_dir()) {
            FileClass::Ignored => {}
            FileClass::Directory => {
                ctx.visit_directory(&path)?;
                descend(path)?;
            }
            FileClass::MarkupPage => ctx.visit_page(&path)?,
            FileClass::PlainFile => ctx.visit_file(&path)?,
        }
    }
    Ok(())
}

/// Walk `dir` on the calling thread.
pub fn walk(ctx: &BuildContext<'_>, dir: &Path) -> Result<(), BuildError> {
    visit_entries(ctx, dir, &mut |sub| walk(ctx, &sub))
}

/// Walk `root` with up to `workers` directory visits in flight.
pub fn walk_parallel(ctx: &BuildContext<'_>, root: &Path, workers: usize) -> Result<(), BuildError> {
    let workers = workers.max(1);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("swege-walk-{i}"))
        .build()?;

    let tasks = TaskBudget::new(workers);
    pool.scope(|scope| {
        if let Err(e) = visit_pooled(ctx, &tasks, scope, root.to_path_buf()) {
            tasks.fail(e);
        }
    });
    tasks.into_result()
}

fn visit_pooled<'scope, 'a: 'scope>(
    ctx: &'scope BuildContext<'a>,
    tasks: &'scope TaskBudget,
    scope: &rayon::Scope<'scope>,
    dir: PathBuf,
) -> Result<(), BuildError> {
    if tasks.failed() {
        return Ok(());
    }
    visit_entries(ctx, &dir, &mut |sub| {
        if tasks.try_acquire() {
            scope.spawn(move |scope| {
                let result = visit_pooled(ctx, tasks, scope, sub);
                tasks.release();
                if let Err(e) = result {
                    tasks.fail(e);
                }
            });
            Ok(())
        } else {
            visit_pooled(ctx, tasks, scope, sub)
        }
    })
}

/// Bounded count of in-flight directory tasks plus the first failure.
#[derive(Debug)]
struct TaskBudget {
    limit: usize,
    in_flight: AtomicUsize,
    failed: AtomicBool,
    failure: Mutex<Option<BuildError>>,
}

impl TaskBudget {
    fn new(limit: usize) -> Self {
        Self {
            limit,
            in_flight: AtomicUsize::new(0),
            failed: AtomicBool::new(false),
            failure: Mutex::new(None),
        }
    }

    fn try_acquire(&self) -> bool {
        self.in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.limit).then_some(n + 1)
            })
            .is_ok()
    }

    fn release(&self) {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
    }

    fn failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    /// Keep the first error; later ones are dropped.
    fn fail(&self, error: BuildError) {
        let mut slot = self.failure.lock().unwrap_or_else(|p| p.into_inner());
        if slot.is_none() {
            *slot = Some(error);
        }
        self.failed.store(true, Ordering::Release);
    }

    fn into_result(self) -> Result<(), BuildError> {
        match self.failure.into_inner().unwrap_or_else(|p| p.into_inner()) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
