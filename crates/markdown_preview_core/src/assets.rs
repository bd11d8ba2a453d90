//! Embedded web assets for the preview page.
//!
//! The page is self-contained: styles, the highlight theme and the client
//! script are inlined into the HTML template.

use crate::html::escape_html;

/// Live preview page with placeholders for CSS and JS.
pub const HTML_TEMPLATE: &str = include_str!("../js/index.html");

/// Standalone page for exported previews.
pub const EXPORT_TEMPLATE: &str = include_str!("../js/export.html");

pub const STYLES_CSS: &str = include_str!("../js/styles.css");

/// Print media rules, shared by the live page and exported pages.
pub const PRINT_CSS: &str = include_str!("../js/print.css");

/// Client script: websocket connection, input forwarding, print and clear.
pub const APP_JS: &str = include_str!("../js/app.js");

/// Provides access to embedded assets.
pub struct Assets;

impl Assets {
    /// Build the live preview page.
    ///
    /// `theme_css` colors the highlighted code, see
    /// [`theme_css`](crate::highlight::theme_css).
    pub fn build_html(theme_css: &str) -> String {
        HTML_TEMPLATE
            .replace("/*__STYLES_CSS__*/", STYLES_CSS)
            .replace("/*__THEME_CSS__*/", theme_css)
            .replace("/*__PRINT_CSS__*/", PRINT_CSS)
            .replace("/*__APP_JS__*/", APP_JS)
    }

    /// Build a standalone, print-ready page around already rendered `body`.
    pub fn build_export_html(title: &str, body: &str, theme_css: &str) -> String {
        // The body goes last so placeholder-like text in the document is kept.
        EXPORT_TEMPLATE
            .replace("/*__TITLE__*/", &escape_html(title))
            .replace("/*__STYLES_CSS__*/", STYLES_CSS)
            .replace("/*__THEME_CSS__*/", theme_css)
            .replace("/*__PRINT_CSS__*/", PRINT_CSS)
            .replace("/*__BODY__*/", body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_template_exists() {
        assert!(HTML_TEMPLATE.contains("<!DOCTYPE html>"));
        assert!(EXPORT_TEMPLATE.contains("<!DOCTYPE html>"));
    }

    #[test]
    fn test_app_js_speaks_the_socket_protocol() {
        assert!(APP_JS.contains("new WebSocket"));
        for message_type in ["update_content", "set_input", "clear_input", "'input'", "'clear'"] {
            assert!(APP_JS.contains(message_type), "missing {message_type}");
        }
        assert!(APP_JS.contains("beforeprint"));
        assert!(APP_JS.contains("afterprint"));
    }

    #[test]
    fn test_build_html() {
        let html = Assets::build_html(".hl-keyword { color: red; }");

        assert!(!html.contains("/*__"));
        assert!(html.contains(".hl-keyword { color: red; }"));
        assert!(html.contains("@media print"));
        assert!(html.contains("id=\"clear-button\""));
        assert!(html.contains("id=\"print-button\""));
    }

    #[test]
    fn test_build_export_html() {
        let html = Assets::build_export_html("a <b>", "<h1>Title</h1>\n/*__TITLE__*/", "");

        assert!(html.contains("<title>a &lt;b&gt;</title>"));
        assert!(html.contains("<h1>Title</h1>\n/*__TITLE__*/"));
        assert!(html.contains("@media print"));
        assert!(!html.contains("new WebSocket"));
    }
}
