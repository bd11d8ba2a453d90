//! Renderer trait for markdown engines.

/// Highlight callback invoked for every fenced code block with
/// `(code, language_hint)`.
///
/// Returns the highlighted HTML, or `None` to emit the escaped plain code.
pub type HighlightCallback<'a> = &'a (dyn Fn(&str, Option<&str>) -> Option<String> + Sync);

/// Error type for rendering operations.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// General rendering error.
    #[error("Render error: {0}")]
    Other(String),
}

/// Converts markdown text into an HTML fragment.
pub trait MarkdownRenderer: Send + Sync {
    /// Render `markdown` to HTML, routing code blocks through `highlight`.
    fn parse(&self, markdown: &str, highlight: HighlightCallback) -> Result<String, RenderError>;
}
