//! # swege
//!
//! A small incremental static site builder. A source tree of markdown pages
//! and assets is mirrored into a destination tree: pages are rendered to HTML
//! between a shared header and footer, everything else is copied verbatim.
//!
//! # Incremental Builds
//!
//! A plain-text manifest lists every source path the builder has seen. Its
//! modification time is the reference instant for the next run:
//!
//! ```text
//! 1. Open      .manifest      →  reference time + known paths
//! 2. Walk      content/       →  dist/   (only what is new or newer)
//! 3. Close     .manifest      →  stamped with the run's start time
//! ```
//!
//! When the header, footer or config file is newer than the reference, every
//! page is re-rendered (copied files are not, they do not embed either).
//! Deleting the manifest (`swege force`) rebuilds everything.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`build`] | One run end to end: verify, open manifest, walk, close |
//! | [`walk`] | Tree traversal, per-entry decisions, bounded worker pool |
//! | [`manifest`] | Append-only record of seen paths; its mtime is the reference |
//! | [`staleness`] | Timestamp comparisons and the forced-rebuild flag |
//! | [`paths`] | Source → destination mapping, entry classification |
//! | [`render`] | Title extraction and page assembly around a markup engine |
//! | [`copy`] | Byte-for-byte copies of non-page files |
//! | [`config`] | `swege.toml` loading, merging over stock defaults, validation |
//! | [`output`] | CLI formatting of progress events and the build summary |
//!
//! # Design Decisions
//!
//! ## Manifest Over Content Hashes
//!
//! Staleness is decided by modification time alone. The manifest never holds
//! hashes or per-file timestamps, so it stays a list of paths a human can
//! read and edit. The cost: a file restored with an old mtime is not picked
//! up until the next forced rebuild.
//!
//! ## Maud for the Title Element
//!
//! The header and footer are raw bytes chosen by the site author and are
//! written untouched. The one piece of markup the builder produces itself,
//! `<title>`, goes through [Maud](https://maud.lambda.xyz/) so a page title
//! containing `<` or `&` cannot break the document.
//!
//! ## Pluggable Markup Engine
//!
//! [`render::MarkupEngine`] is the seam between the builder and
//! `pulldown-cmark`. Tests drive the walker with trivial engines and never
//! depend on CommonMark output details.

pub mod build;
pub mod config;
pub mod copy;
pub mod manifest;
pub mod output;
pub mod paths;
pub mod render;
pub mod staleness;
pub mod walk;

#[cfg(test)]
pub(crate) mod test_helpers;
