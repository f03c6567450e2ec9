//! Markdown preview.
//!
//! The editor's plain text is rendered with comrak and written to a
//! [`PreviewSurface`], replacing whatever it showed before.

use comrak::{Options, markdown_to_html};

/// Output surface for rendered preview HTML.
pub trait PreviewSurface {
    /// Replace the rendered content.
    fn set_html(&mut self, html: String);
}

/// Markdown-to-HTML converter with GFM extensions.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkdownPreview;

impl MarkdownPreview {
    pub const fn new() -> Self {
        Self
    }

    pub fn render(&self, markdown: &str) -> String {
        markdown_to_html(markdown, &create_options())
    }
}

fn create_options() -> Options {
    let mut options = Options::default();

    // Enable GFM extensions
    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;
    options.extension.footnotes = true;

    options
}

/// In-memory surface keeping the latest HTML.
#[derive(Debug, Default, Clone)]
pub struct HtmlSurface {
    html: String,
    renders: usize,
}

impl HtmlSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    /// How many times the content has been replaced.
    pub const fn render_count(&self) -> usize {
        self.renders
    }
}

impl PreviewSurface for HtmlSurface {
    fn set_html(&mut self, html: String) {
        self.html = html;
        self.renders += 1;
    }
}
