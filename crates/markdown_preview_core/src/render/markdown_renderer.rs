//! Markdown renderer implementation backed by pulldown-cmark.

use super::traits::{HighlightCallback, MarkdownRenderer, RenderError};
use super::{to_html, RenderOptions};

/// Markdown renderer converting GitHub Flavored Markdown to HTML.
#[derive(Debug, Clone)]
pub struct PulldownRenderer {
    options: RenderOptions,
}

impl PulldownRenderer {
    /// Create a new markdown renderer with the given options.
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }
}

impl Default for PulldownRenderer {
    fn default() -> Self {
        Self::new(RenderOptions::gfm())
    }
}

impl MarkdownRenderer for PulldownRenderer {
    fn parse(&self, markdown: &str, highlight: HighlightCallback) -> Result<String, RenderError> {
        Ok(to_html(markdown, &self.options, highlight))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_renderer() {
        let renderer = PulldownRenderer::default();
        let html = renderer.parse("~~gone~~ - [x] done", &|_, _| None).unwrap();
        assert!(html.contains("<del>gone</del>"));
    }

    #[test]
    fn test_strict_commonmark_options() {
        let renderer = PulldownRenderer::new(RenderOptions::default());
        let html = renderer.parse("~~kept~~", &|_, _| None).unwrap();
        assert!(!html.contains("<del>"));
    }
}
