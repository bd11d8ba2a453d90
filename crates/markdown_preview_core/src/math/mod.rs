//! Math support: delimiter normalization and the typesetter abstraction.
//!
//! Authors frequently paste content using `\( ... \)` for inline math while
//! the typesetter only recognizes dollar delimiters, so the raw input is
//! normalized before it reaches the markdown renderer.

mod mathml;

use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

pub use mathml::MathmlTypesetter;

static INLINE_PAREN_MATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\\((.*?)\\\)").unwrap());

/// Rewrite `\(expr\)` into `$expr$`, leaving all other content untouched.
///
/// Matching is non-greedy and does not cross line breaks; an unbalanced `\(`
/// stays literal text.
///
/// ```
/// use markdown_preview_core::math::normalize_math_delimiters;
///
/// assert_eq!(normalize_math_delimiters(r"Euler: \(e^{i\pi}+1=0\)"), r"Euler: $e^{i\pi}+1=0$");
/// assert_eq!(normalize_math_delimiters(r"open \( only"), r"open \( only");
/// ```
pub fn normalize_math_delimiters(text: &str) -> Cow<'_, str> {
    INLINE_PAREN_MATH.replace_all(text, "$$${1}$$")
}

/// Error type for typesetting passes.
#[derive(Debug, thiserror::Error)]
pub enum TypesetError {
    /// The background typesetting task panicked or was cancelled.
    #[error("typesetting task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// General typesetting error.
    #[error("typesetter error: {0}")]
    Other(String),
}

/// Replaces delimited math in a rendered preview with typeset output.
///
/// Implementations must leave the content of `<pre>` and `<code>` elements
/// alone; the highlight sweep runs on the typeset markup afterwards.
#[async_trait::async_trait]
pub trait MathTypesetter: Send + Sync {
    /// Typeset every math expression in `html`, returning the new markup.
    async fn typeset(&self, html: &str) -> Result<String, TypesetError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_converts_inline_parens() {
        assert_eq!(
            normalize_math_delimiters(r"a \(x^2\) b \(y\) c"),
            "a $x^2$ b $y$ c"
        );
    }

    #[test]
    fn test_shortest_match_wins() {
        assert_eq!(
            normalize_math_delimiters(r"\(a\) and \) then \(b\)"),
            r"$a$ and \) then $b$"
        );
    }

    #[test]
    fn test_does_not_cross_lines() {
        let input = "\\(a\nb\\)";
        assert_eq!(normalize_math_delimiters(input), input);
    }

    #[test]
    fn test_unbalanced_is_left_alone() {
        assert!(matches!(
            normalize_math_delimiters(r"price \( 5"),
            Cow::Borrowed(_)
        ));
        assert_eq!(normalize_math_delimiters(""), "");
    }

    #[test]
    fn test_keeps_position() {
        let out = normalize_math_delimiters(r"# Title \(t\)");
        assert_eq!(out.find("$t$"), Some(8));
    }
}
