#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use swege::build::BuildOptions;
use swege::config::SiteConfig;
use tempfile::TempDir;
use walkdir::WalkDir;

pub const OLD: i64 = 1_000_000_000;
pub const REFERENCE: i64 = 1_500_000_000;
pub const NEW: i64 = 1_600_000_000;

/// A site in its own temp directory with absolute paths everywhere.
pub struct Site {
    pub temp_dir: TempDir,
    pub config: SiteConfig,
}

impl Site {
    /// Header, footer and a small content tree:
    /// two pages, a nested page, an image and a text file.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir.path();
        let config = SiteConfig {
            site_title: "Test Site".to_string(),
            src_dir: root.join("content"),
            dst_dir: root.join("dist"),
            header_file: root.join("header.html"),
            footer_file: root.join("footer.html"),
            ..SiteConfig::default()
        };
        fs::create_dir_all(&config.src_dir).unwrap();
        fs::write(&config.header_file, "<html><body>\n").unwrap();
        fs::write(&config.footer_file, "</body></html>\n").unwrap();

        let site = Self { temp_dir, config };
        site.write("index.md", "title: Home\nWelcome.\n");
        site.write("about.md", "# About us\n\nWe write things.\n");
        site.write("posts/2024/hello.md", "Hello, world.\n");
        site.write("img/logo.png", "\u{89}PNG fake");
        site.write("robots.txt", "User-agent: *\n");
        site
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn src(&self, rel: &str) -> PathBuf {
        self.config.src_dir.join(rel)
    }

    pub fn dst(&self, rel: &str) -> PathBuf {
        self.config.dst_dir.join(rel)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.path().join(".manifest")
    }

    pub fn config_path(&self) -> PathBuf {
        self.path().join("swege.toml")
    }

    pub fn options(&self) -> BuildOptions {
        BuildOptions {
            config_path: self.config_path(),
            manifest_path: self.manifest_path(),
        }
    }

    pub fn write(&self, rel: &str, content: &str) {
        let path = self.src(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    pub fn read_dst(&self, rel: &str) -> String {
        fs::read_to_string(self.dst(rel))
            .unwrap_or_else(|e| panic!("cannot read dist/{rel}: {e}"))
    }

    /// Pretend the last build happened at `REFERENCE` and every input is
    /// older than that.
    pub fn settle(&self) {
        for entry in WalkDir::new(self.path()) {
            set_mtime(entry.unwrap().path(), OLD);
        }
        if self.manifest_path().exists() {
            set_mtime(&self.manifest_path(), REFERENCE);
        }
    }

    pub fn manifest_lines(&self) -> Vec<String> {
        fs::read_to_string(self.manifest_path())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn dst_snapshot(&self) -> Vec<(String, Vec<u8>)> {
        tree_snapshot(&self.config.dst_dir)
    }
}

pub fn set_mtime(path: &Path, secs: i64) {
    filetime::set_file_mtime(path, filetime::FileTime::from_unix_time(secs, 0)).unwrap();
}

pub fn mtime_secs(path: &Path) -> i64 {
    let meta = fs::metadata(path).unwrap();
    filetime::FileTime::from_last_modification_time(&meta).unix_seconds()
}

/// Relative paths and contents of everything below `root`, sorted.
pub fn tree_snapshot(root: &Path) -> Vec<(String, Vec<u8>)> {
    let mut entries: Vec<(String, Vec<u8>)> = WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .map(|e| {
            let e = e.unwrap();
            let rel = e.path().strip_prefix(root).unwrap().to_string_lossy().into_owned();
            if e.file_type().is_dir() {
                (format!("{rel}/"), Vec::new())
            } else {
                (rel, fs::read(e.path()).unwrap())
            }
        })
        .collect();
    entries.sort();
    entries
}
