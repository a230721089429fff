//! Markdown page rendering.
//!
//! Every page is written as, in order:
//!
//! ```text
//! <header bytes>
//! <title>{page title} - {site title}</title>
//! <markdown body as HTML>
//! <footer bytes>
//! ```
//!
//! ## Page titles
//!
//! Only the first line of the source is inspected:
//!
//! | First line | Title | Line in body? |
//! |------------|-------|---------------|
//! | `title: My  Page` | `My Page` (tokens joined by one space) | yes |
//! | `# Hello World` | `Hello World` | yes, rendered as a heading |
//! | anything else | none, `<title>` is just the site title | yes |
//!
//! Titles are trimmed and cut to `render.title_max_chars` characters. The
//! engine always receives the whole source, first line included.
//!
//! ## Output
//!
//! The source and shared parts are fully read before the destination is
//! created, so a missing input never leaves a half-written page. The
//! destination is truncated once and written through a single handle.
//!
//! Conversion is delegated to a [`MarkupEngine`]; the production engine is
//! [`CommonMark`] (pulldown-cmark).

use crate::build::BuildError;
use maud::html;
use pulldown_cmark::{Options, Parser, html as md_html};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Text-to-HTML conversion. Must be total: any UTF-8 input yields output.
pub trait MarkupEngine: Send + Sync {
    fn to_html(&self, markup: &str) -> String;
}

/// CommonMark with the common GitHub extensions.
#[derive(Debug, Clone, Copy)]
pub struct CommonMark {
    options: Options,
}

impl Default for CommonMark {
    fn default() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        Self { options }
    }
}

impl MarkupEngine for CommonMark {
    fn to_html(&self, markup: &str) -> String {
        let parser = Parser::new_ext(markup, self.options);
        let mut out = String::with_capacity(markup.len() * 3 / 2);
        md_html::push_html(&mut out, parser);
        out
    }
}

// ============================================================================
// Title extraction
// ============================================================================

/// A page's title and the part of the source handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSource<'a> {
    pub title: Option<String>,
    pub body: &'a str,
}

/// Split a page's source into its title and body.
pub fn split_title(source: &str, max_chars: usize) -> PageSource<'_> {
    let first_line = source.split('\n').next().unwrap_or(source);
    let first_line = first_line.strip_suffix('\r').unwrap_or(first_line);

    let title = if let Some(directive) = first_line.strip_prefix("title:") {
        let joined = directive.split_whitespace().collect::<Vec<_>>().join(" ");
        cap_title(&joined, max_chars)
    } else if let Some(heading) = first_line.strip_prefix("# ") {
        cap_title(heading, max_chars)
    } else {
        None
    };

    PageSource {
        title,
        body: source,
    }
}

/// Trim and cut to `max_chars` characters. Empty titles become `None`.
fn cap_title(raw: &str, max_chars: usize) -> Option<String> {
    let capped: String = raw.trim().chars().take(max_chars).collect();
    let capped = capped.trim_end();
    if capped.is_empty() {
        None
    } else {
        Some(capped.to_string())
    }
}

/// The `<title>` element for a page, HTML-escaped.
pub fn title_element(page_title: Option<&str>, site_title: &str) -> String {
    let text = match page_title {
        Some(title) => format!("{title} - {site_title}"),
        None => site_title.to_string(),
    };
    html! { title { (text) } }.into_string()
}

// ============================================================================
// Renderer
// ============================================================================

/// Renders markdown sources into complete pages.
///
/// Header and footer bytes are loaded once per run.
pub struct Renderer<'a> {
    header: Vec<u8>,
    footer: Vec<u8>,
    site_title: String,
    title_max_chars: usize,
    engine: &'a dyn MarkupEngine,
}

impl<'a> Renderer<'a> {
    /// Load the shared header and footer.
    pub fn load(
        header_file: &Path,
        footer_file: &Path,
        site_title: &str,
        title_max_chars: usize,
        engine: &'a dyn MarkupEngine,
    ) -> Result<Self, BuildError> {
        Ok(Self::new(
            read_part(header_file)?,
            read_part(footer_file)?,
            site_title,
            title_max_chars,
            engine,
        ))
    }

    pub fn new(
        header: Vec<u8>,
        footer: Vec<u8>,
        site_title: &str,
        title_max_chars: usize,
        engine: &'a dyn MarkupEngine,
    ) -> Self {
        Self {
            header,
            footer,
            site_title: site_title.to_string(),
            title_max_chars,
            engine,
        }
    }

    /// Render `src` into `dst`, replacing any previous content.
    ///
    /// Returns the page title, if one was found.
    pub fn render(&self, src: &Path, dst: &Path) -> Result<Option<String>, BuildError> {
        let raw = fs::read(src).map_err(|source| BuildError::FileAccess {
            path: src.to_path_buf(),
            source,
        })?;
        let text = String::from_utf8_lossy(&raw);
        let page = split_title(&text, self.title_max_chars);
        let body = self.engine.to_html(page.body);

        let write_err = |source| BuildError::FileAccess {
            path: dst.to_path_buf(),
            source,
        };
        let file = File::create(dst).map_err(write_err)?;
        let mut out = BufWriter::new(file);

        out.write_all(&self.header).map_err(write_err)?;
        let title = title_element(page.title.as_deref(), &self.site_title);
        writeln!(out, "{title}").map_err(write_err)?;
        out.write_all(body.as_bytes()).map_err(write_err)?;
        out.write_all(&self.footer).map_err(write_err)?;
        out.flush().map_err(write_err)?;

        Ok(page.title)
    }
}

fn read_part(path: &Path) -> Result<Vec<u8>, BuildError> {
    fs::read(path).map_err(|source| BuildError::FileAccess {
        path: PathBuf::from(path),
        source,
    })
}
