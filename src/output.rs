//! CLI output formatting for build progress.
//!
//! # Output Format
//!
//! Every line leads with what happened, then the destination path relative
//! to `dst_dir`:
//!
//! ```text
//! mkdir   posts/
//! render  posts/first.html  "First Post"
//! render  posts/notes.html
//! copy    img/logo.png  (14.2 KiB)
//! ```
//!
//! Skipped entries are only shown with `--verbose`:
//!
//! ```text
//! skip    content/about.md
//! ```
//!
//! A failed build that cannot restore the manifest warns on stderr:
//!
//! ```text
//! warning: Cannot write manifest '.manifest': Read-only file system (os error 30)
//!     the next build may miss changes; run 'swege force' to rebuild everything
//! ```
//!
//! A build ends with a one-line summary:
//!
//! ```text
//! Built 1 directory, 2 pages, 1 file (12 unchanged)
//! No changes detected (15 unchanged)
//! ```
//!
//! # Architecture
//!
//! Each event has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout (stderr for
//! warnings). Format functions
//! are pure: no I/O, no side effects.

use crate::manifest::ManifestError;
use crate::walk::{BuildEvent, BuildSummary};
use std::path::Path;

/// Path of `path` relative to `root`, or the whole path when it is elsewhere.
fn relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}

/// Human-readable byte count.
fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["KiB", "MiB", "GiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

/// Format a single progress event as display lines.
///
/// `dst_root` is stripped from destination paths. Returns no lines for
/// skipped entries unless `verbose` is set.
pub fn format_build_event(event: &BuildEvent, dst_root: &Path, verbose: bool) -> Vec<String> {
    match event {
        BuildEvent::DirectoryCreated { dst, .. } => {
            vec![format!("mkdir   {}/", relative(dst, dst_root))]
        }
        BuildEvent::PageRendered { dst, title, .. } => {
            let dst = relative(dst, dst_root);
            match title {
                Some(t) => vec![format!("render  {dst}  \"{t}\"")],
                None => vec![format!("render  {dst}")],
            }
        }
        BuildEvent::FileCopied { dst, bytes, .. } => {
            vec![format!(
                "copy    {}  ({})",
                relative(dst, dst_root),
                format_size(*bytes)
            )]
        }
        BuildEvent::Skipped { src } if verbose => {
            vec![format!("skip    {}", src.display())]
        }
        BuildEvent::Skipped { .. } => Vec::new(),
    }
}

pub fn print_build_event(event: &BuildEvent, dst_root: &Path, verbose: bool) {
    for line in format_build_event(event, dst_root, verbose) {
        println!("{}", line);
    }
}

/// Format the closing summary of a build.
pub fn format_summary(summary: &BuildSummary) -> Vec<String> {
    if summary.touched() == 0 {
        vec![format!("No changes detected ({} unchanged)", summary.skipped)]
    } else {
        vec![format!("Built {}", summary)]
    }
}

pub fn print_summary(summary: &BuildSummary) {
    for line in format_summary(summary) {
        println!("{}", line);
    }
}

/// Format the warning shown when a failed build could not put the manifest
/// back the way it found it.
pub fn format_restore_warning(error: &ManifestError) -> Vec<String> {
    vec![
        format!("warning: {}", error),
        "    the next build may miss changes; run 'swege force' to rebuild everything".to_string(),
    ]
}

/// Print the restore warning to stderr.
pub fn print_restore_warning(error: &ManifestError) {
    for line in format_restore_warning(error) {
        eprintln!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn dist() -> PathBuf {
        PathBuf::from("/site/dist")
    }

    // =========================================================================
    // Helper tests
    // =========================================================================

    #[test]
    fn format_size_bytes() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
    }

    #[test]
    fn format_size_kib() {
        assert_eq!(format_size(1024), "1.0 KiB");
        assert_eq!(format_size(14_540), "14.2 KiB");
    }

    #[test]
    fn format_size_mib() {
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MiB");
    }

    #[test]
    fn relative_outside_root_keeps_full_path() {
        assert_eq!(
            relative(Path::new("/elsewhere/a.html"), &dist()),
            "/elsewhere/a.html"
        );
    }

    // =========================================================================
    // Event tests
    // =========================================================================

    #[test]
    fn directory_event() {
        let event = BuildEvent::DirectoryCreated {
            src: "/site/content/posts".into(),
            dst: "/site/dist/posts".into(),
        };
        assert_eq!(format_build_event(&event, &dist(), false), vec!["mkdir   posts/"]);
    }

    #[test]
    fn page_event_with_title() {
        let event = BuildEvent::PageRendered {
            src: "/site/content/posts/first.md".into(),
            dst: "/site/dist/posts/first.html".into(),
            title: Some("First Post".into()),
        };
        assert_eq!(
            format_build_event(&event, &dist(), false),
            vec!["render  posts/first.html  \"First Post\""]
        );
    }

    #[test]
    fn page_event_without_title() {
        let event = BuildEvent::PageRendered {
            src: "/site/content/notes.md".into(),
            dst: "/site/dist/notes.html".into(),
            title: None,
        };
        assert_eq!(
            format_build_event(&event, &dist(), false),
            vec!["render  notes.html"]
        );
    }

    #[test]
    fn copy_event_shows_size() {
        let event = BuildEvent::FileCopied {
            src: "/site/content/img/logo.png".into(),
            dst: "/site/dist/img/logo.png".into(),
            bytes: 14_540,
        };
        assert_eq!(
            format_build_event(&event, &dist(), false),
            vec!["copy    img/logo.png  (14.2 KiB)"]
        );
    }

    #[test]
    fn skip_hidden_unless_verbose() {
        let event = BuildEvent::Skipped {
            src: "content/about.md".into(),
        };
        assert!(format_build_event(&event, &dist(), false).is_empty());
        assert_eq!(
            format_build_event(&event, &dist(), true),
            vec!["skip    content/about.md"]
        );
    }

    // =========================================================================
    // Summary tests
    // =========================================================================

    #[test]
    fn summary_with_work() {
        let summary = BuildSummary {
            directories: 1,
            rendered: 2,
            copied: 1,
            skipped: 12,
        };
        assert_eq!(
            format_summary(&summary),
            vec!["Built 1 directory, 2 pages, 1 file (12 unchanged)"]
        );
    }

    #[test]
    fn restore_warning_names_manifest_and_remedy() {
        let error = ManifestError::Write {
            path: ".manifest".into(),
            source: std::io::Error::from_raw_os_error(30),
        };
        let lines = format_restore_warning(&error);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("warning: Cannot write manifest '.manifest': "));
        assert!(lines[1].contains("swege force"));
    }

    #[test]
    fn summary_without_changes() {
        let summary = BuildSummary {
            skipped: 15,
            ..BuildSummary::default()
        };
        assert_eq!(
            format_summary(&summary),
            vec!["No changes detected (15 unchanged)"]
        );
    }
}
