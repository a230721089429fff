//! Source-to-destination path mapping and entry classification.
//!
//! ## Mapping
//!
//! A destination path is the source path with the `src_dir` prefix replaced
//! by `dst_dir`:
//!
//! ```text
//! src_dir = /a/src      dst_dir = /a/out
//! /a/src/posts/x.md  →  /a/out/posts/x.md   (then x.html for pages)
//! ```
//!
//! No normalization happens: `..`, symlinks and case are taken literally.
//! The walker builds every path by joining onto `src_dir`, so the prefix
//! always holds.
//!
//! ## Classification
//!
//! | Entry | Class |
//! |-------|-------|
//! | name starts with `~` or `#` (editor backups, autosaves) | Ignored |
//! | the header or footer file, or the destination tree | Ignored |
//! | directory | Directory |
//! | `*.md`, `*.markdown` (any case) | MarkupPage |
//! | anything else | PlainFile |

use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

const MARKUP_EXTENSIONS: &[&str] = &["md", "markdown"];

/// Maps paths under `src_dir` to the matching paths under `dst_dir`.
#[derive(Debug, Clone)]
pub struct PathMapper {
    src_dir: PathBuf,
    dst_dir: PathBuf,
}

impl PathMapper {
    pub fn new(src_dir: impl Into<PathBuf>, dst_dir: impl Into<PathBuf>) -> Self {
        Self {
            src_dir: src_dir.into(),
            dst_dir: dst_dir.into(),
        }
    }

    pub fn src_dir(&self) -> &Path {
        &self.src_dir
    }

    pub fn dst_dir(&self) -> &Path {
        &self.dst_dir
    }

    /// Destination path for `src_path`, or `None` when it does not start
    /// with `src_dir`.
    pub fn map_path(&self, src_path: &Path) -> Option<PathBuf> {
        let rel = src_path.strip_prefix(&self.src_dir).ok()?;
        if rel.as_os_str().is_empty() {
            Some(self.dst_dir.clone())
        } else {
            Some(self.dst_dir.join(rel))
        }
    }

    /// Destination of a rendered page: the mapped path with an `.html`
    /// extension.
    pub fn map_page(&self, src_path: &Path) -> Option<PathBuf> {
        self.map_path(src_path).map(|p| p.with_extension("html"))
    }
}

/// The key a path is recorded under in the manifest.
pub fn manifest_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// What the walker does with a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileClass {
    MarkupPage,
    Directory,
    PlainFile,
    Ignored,
}

/// Whether `name` looks like an editor backup or autosave file.
pub fn is_scratch_name(name: &str) -> bool {
    name.starts_with('~') || name.starts_with('#')
}

/// Whether `path` has a markup extension.
pub fn is_markup(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            MARKUP_EXTENSIONS
                .iter()
                .any(|m| ext.eq_ignore_ascii_case(m))
        })
        .unwrap_or(false)
}

/// Classifies walker entries.
///
/// Holds the canonical form of paths that must never be treated as content.
/// Canonicalization only runs for entries whose file name matches one of
/// them.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    reserved: Vec<PathBuf>,
    reserved_names: HashSet<OsString>,
}

impl Classifier {
    /// `reserved` paths that do not exist are skipped.
    pub fn new<'a, I>(reserved: I) -> Self
    where
        I: IntoIterator<Item = &'a Path>,
    {
        let mut classifier = Self::default();
        for path in reserved {
            if let Ok(canonical) = fs::canonicalize(path)
                && let Some(name) = canonical.file_name()
            {
                classifier.reserved_names.insert(name.to_os_string());
                classifier.reserved.push(canonical);
            }
        }
        classifier
    }

    pub fn classify(&self, path: &Path, is_dir: bool) -> FileClass {
        let Some(name) = path.file_name() else {
            return FileClass::Ignored;
        };
        if is_scratch_name(&name.to_string_lossy()) || self.is_reserved(path, name) {
            return FileClass::Ignored;
        }
        if is_dir {
            FileClass::Directory
        } else if is_markup(path) {
            FileClass::MarkupPage
        } else {
            FileClass::PlainFile
        }
    }

    fn is_reserved(&self, path: &Path, name: &std::ffi::OsStr) -> bool {
        if !self.reserved_names.contains(name) {
            return false;
        }
        fs::canonicalize(path)
            .map(|canonical| self.reserved.contains(&canonical))
            .unwrap_or(false)
    }
}
