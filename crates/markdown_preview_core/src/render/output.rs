//! Rendered preview type.
//!
//! [`RenderedPreview`] is what the preview pane holds and what gets pushed to
//! connected clients. It is fully replaced on every render, never diffed.

use serde::{Deserialize, Serialize};

/// An HTML fragment together with the render generation that produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedPreview {
    /// Monotonically increasing render cycle number; `0` is the initial
    /// empty preview.
    pub generation: u64,
    /// The rendered HTML content, ready for innerHTML injection.
    pub html: String,
}

impl RenderedPreview {
    pub fn new(generation: u64, html: String) -> Self {
        Self { generation, html }
    }

    /// Returns `true` if nothing visible was rendered.
    pub fn is_empty(&self) -> bool {
        self.html.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_empty() {
        let preview = RenderedPreview::default();
        assert_eq!(preview.generation, 0);
        assert!(preview.is_empty());
        assert!(RenderedPreview::new(1, "\n".to_string()).is_empty());
    }

    #[test]
    fn test_serde() {
        let preview = RenderedPreview::new(3, "<p>test</p>".to_string());
        let json = serde_json::to_string(&preview).unwrap();
        assert_eq!(json, r#"{"generation":3,"html":"<p>test</p>"}"#);
    }
}
