//! Shared test utilities for the swege test suite.
//!
//! Builds throwaway sites in a temp directory and gives tests precise control
//! over modification times, so staleness checks never depend on how fast the
//! clock ticks between two writes.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let site = SiteFixture::blog();
//! site.set_all_mtimes(OLD);
//! site.set_mtime("posts/first.md", NEW);
//!
//! build(&site.config, &site.options(), None).unwrap();
//! assert!(site.dst("posts/first.html").exists());
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;
use walkdir::WalkDir;

use crate::build::BuildOptions;
use crate::config::SiteConfig;
use crate::paths::{is_scratch_name, manifest_key};

// =========================================================================
// Timestamps
// =========================================================================

/// Well before the reference time.
pub const OLD: i64 = 1_000_000_000;
/// Stands in for the manifest timestamp of an earlier run.
pub const REFERENCE: i64 = 1_500_000_000;
/// After the reference time, still in the past.
pub const NEW: i64 = 1_600_000_000;

pub fn at(secs: i64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs as u64)
}

pub fn set_mtime(path: &Path, secs: i64) {
    filetime::set_file_mtime(path, filetime::FileTime::from_unix_time(secs, 0))
        .unwrap_or_else(|e| panic!("cannot set mtime of {}: {e}", path.display()));
}

pub fn mtime_secs(path: &Path) -> i64 {
    let meta = fs::metadata(path)
        .unwrap_or_else(|e| panic!("cannot stat {}: {e}", path.display()));
    filetime::FileTime::from_last_modification_time(&meta).unix_seconds()
}

/// Lines of a text file, e.g. the manifest.
pub fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()))
        .lines()
        .map(str::to_string)
        .collect()
}

/// Every entry below `root` as `(relative path, content)`, sorted.
/// Directories end in `/` and have empty content.
pub fn tree_snapshot(root: &Path) -> Vec<(String, Vec<u8>)> {
    let mut entries: Vec<(String, Vec<u8>)> = WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .map(|entry| {
            let entry = entry.unwrap();
            let rel = entry
                .path()
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .into_owned();
            if entry.file_type().is_dir() {
                (format!("{rel}/"), Vec::new())
            } else {
                (rel, fs::read(entry.path()).unwrap())
            }
        })
        .collect();
    entries.sort();
    entries
}

// =========================================================================
// Site fixtures
// =========================================================================

/// A site laid out in its own temp directory:
///
/// ```text
/// <tmp>/
/// ├── header.html
/// ├── footer.html
/// ├── content/      src_dir
/// └── dist/         dst_dir
/// ```
///
/// All config paths are absolute. The config file is not written.
pub struct SiteFixture {
    pub tmp: TempDir,
    pub config: SiteConfig,
}

impl SiteFixture {
    /// Header, footer and an empty source directory.
    pub fn empty() -> Self {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        let config = SiteConfig {
            site_title: "Test Site".to_string(),
            src_dir: root.join("content"),
            dst_dir: root.join("dist"),
            header_file: root.join("header.html"),
            footer_file: root.join("footer.html"),
            ..SiteConfig::default()
        };
        fs::create_dir_all(&config.src_dir).unwrap();
        fs::write(&config.header_file, "<header>\n").unwrap();
        fs::write(&config.footer_file, "</footer>\n").unwrap();
        Self { tmp, config }
    }

    /// ```text
    /// content/
    /// ├── index.md            title: Home
    /// ├── robots.txt
    /// ├── img/logo.png
    /// └── posts/
    ///     ├── first.md        # First Post
    ///     └── drafts/wip.md
    /// ```
    pub fn blog() -> Self {
        let site = Self::empty();
        site.write("index.md", "title: Home\nWelcome to the blog.\n");
        site.write("robots.txt", "User-agent: *\n");
        site.write("img/logo.png", "PNG-bytes");
        site.write("posts/first.md", "# First Post\n\nHello, *world*.\n");
        site.write("posts/drafts/wip.md", "Work in progress\n");
        site
    }

    /// A blog whose header and footer sit inside the source tree.
    pub fn with_parts_inside_source() -> Self {
        let mut site = Self::blog();
        site.config.header_file = site.config.src_dir.join("header.html");
        site.config.footer_file = site.config.src_dir.join("footer.html");
        site.write("header.html", "<header>\n");
        site.write("footer.html", "</footer>\n");
        site
    }

    /// One page, with the destination nested in the source tree.
    pub fn with_dst_inside_source() -> Self {
        let mut site = Self::empty();
        site.config.src_dir = site.root().join("site");
        site.config.dst_dir = site.config.src_dir.join("public");
        site.write("index.md", "# Home\n");
        site
    }

    /// `dirs` directories of `pages` pages each.
    pub fn wide(dirs: usize, pages: usize) -> Self {
        let site = Self::empty();
        for d in 0..dirs {
            for p in 0..pages {
                site.write(&format!("dir-{d}/page-{p}.md"), &format!("# Page {d}.{p}\n"));
            }
        }
        site
    }

    pub fn root(&self) -> &Path {
        self.tmp.path()
    }

    pub fn src(&self, rel: &str) -> PathBuf {
        self.config.src_dir.join(rel)
    }

    pub fn dst(&self, rel: &str) -> PathBuf {
        self.config.dst_dir.join(rel)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root().join(".manifest")
    }

    pub fn config_path(&self) -> PathBuf {
        self.root().join("swege.toml")
    }

    pub fn options(&self) -> BuildOptions {
        BuildOptions {
            config_path: self.config_path(),
            manifest_path: self.manifest_path(),
        }
    }

    /// Write a source file, creating parent directories.
    pub fn write(&self, rel: &str, content: &str) {
        let path = self.src(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
    }

    pub fn set_mtime(&self, rel: &str, secs: i64) {
        set_mtime(&self.src(rel), secs);
    }

    /// Backdate everything in the fixture, header, footer and manifest
    /// included.
    pub fn set_all_mtimes(&self, secs: i64) {
        for entry in WalkDir::new(self.root()) {
            set_mtime(entry.unwrap().path(), secs);
        }
    }

    pub fn read_dst(&self, rel: &str) -> Vec<u8> {
        let path = self.dst(rel);
        fs::read(&path).unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()))
    }

    pub fn read_dst_string(&self, rel: &str) -> String {
        String::from_utf8(self.read_dst(rel)).unwrap()
    }

    /// Manifest key of a source path.
    pub fn key(&self, rel: &str) -> String {
        manifest_key(&self.src(rel))
    }

    /// A manifest key with the source root stripped.
    pub fn relative_key(&self, key: &str) -> String {
        Path::new(key)
            .strip_prefix(&self.config.src_dir)
            .unwrap_or_else(|_| panic!("'{key}' is not under the source root"))
            .to_string_lossy()
            .into_owned()
    }

    /// Keys of every path a build should record.
    pub fn content_keys(&self) -> Vec<String> {
        let reserved = [
            self.config.dst_dir.as_path(),
            self.config.header_file.as_path(),
            self.config.footer_file.as_path(),
        ];
        WalkDir::new(&self.config.src_dir)
            .min_depth(1)
            .into_iter()
            .filter_entry(|e| {
                !reserved.contains(&e.path())
                    && !is_scratch_name(&e.file_name().to_string_lossy())
            })
            .map(|e| manifest_key(e.unwrap().path()))
            .collect()
    }
}
