use super::{MathTypesetter, TypesetError};
use crate::html::{decode_entities, escape_html};
use latex2mathml::{latex_to_mathml, DisplayStyle};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// `$$...$$` may span lines, `$...$` may not.
static MATH_SPAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\$\$(.+?)\$\$|\$([^$\n]+?)\$").unwrap());

/// Elements whose content is never typeset.
const SKIPPED_ELEMENTS: &[(&str, &str)] = &[
    ("<pre", "</pre>"),
    ("<code", "</code>"),
    ("<script", "</script>"),
    ("<style", "</style>"),
];

/// Typesets dollar-delimited math into native MathML.
///
/// An expression that fails to parse is kept as its source text wrapped in a
/// `math-error` span; the pass as a whole only fails when the background task
/// does.
#[derive(Debug, Clone, Copy, Default)]
pub struct MathmlTypesetter;

impl MathmlTypesetter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl MathTypesetter for MathmlTypesetter {
    async fn typeset(&self, html: &str) -> Result<String, TypesetError> {
        let html = html.to_owned();
        let typeset = tokio::task::spawn_blocking(move || typeset_html(&html)).await?;
        Ok(typeset)
    }
}

fn typeset_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;

    while let Some((start, close_tag)) = next_skipped_element(rest) {
        out.push_str(&typeset_text_nodes(&rest[..start]));
        let element = &rest[start..];
        let end = element
            .find(close_tag)
            .map(|index| index + close_tag.len())
            .unwrap_or(element.len());
        out.push_str(&element[..end]);
        rest = &element[end..];
    }

    out.push_str(&typeset_text_nodes(rest));
    out
}

/// Typesets the text between tags; tags and their attribute values are
/// copied through.
fn typeset_text_nodes(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(start) = rest.find('<') {
        out.push_str(&typeset_text(&rest[..start]));
        let tag = &rest[start..];
        let end = tag_len(tag).unwrap_or(tag.len());
        out.push_str(&tag[..end]);
        rest = &tag[end..];
    }

    out.push_str(&typeset_text(rest));
    out
}

/// Length of the tag opening `html`, a `>` inside a quoted value not ending it.
fn tag_len(html: &str) -> Option<usize> {
    let mut quote = None;
    for (index, c) in html.char_indices().skip(1) {
        match (quote, c) {
            (None, '"' | '\'') => quote = Some(c),
            (Some(open), c) if c == open => quote = None,
            (None, '>') => return Some(index + 1),
            _ => {}
        }
    }
    None
}

fn next_skipped_element(html: &str) -> Option<(usize, &'static str)> {
    SKIPPED_ELEMENTS
        .iter()
        .filter_map(|(open, close)| find_open_tag(html, open).map(|index| (index, *close)))
        .min_by_key(|(index, _)| *index)
}

/// Finds `<name>` or `<name ...>`, skipping tags that merely share the prefix.
fn find_open_tag(html: &str, open: &str) -> Option<usize> {
    let mut offset = 0;
    while let Some(index) = html[offset..].find(open) {
        let start = offset + index;
        match html[start + open.len()..].chars().next() {
            Some('>') | Some(' ') | Some('\t') | Some('\n') => return Some(start),
            _ => offset = start + open.len(),
        }
    }
    None
}

fn typeset_text(text: &str) -> String {
    if !text.contains('$') {
        return text.to_string();
    }

    MATH_SPAN
        .replace_all(text, |caps: &Captures| {
            let source = &caps[0];
            let (expression, style) = match (caps.get(1), caps.get(2)) {
                (Some(display), _) => (display.as_str(), DisplayStyle::Block),
                (None, Some(inline)) => (inline.as_str(), DisplayStyle::Inline),
                (None, None) => return source.to_string(),
            };

            if expression.trim().is_empty() {
                return source.to_string();
            }

            let latex = decode_entities(expression.trim());
            match latex_to_mathml(&latex, style) {
                Ok(mathml) => match style {
                    DisplayStyle::Block => {
                        format!(r#"<span class="math math-display">{mathml}</span>"#)
                    }
                    DisplayStyle::Inline => {
                        format!(r#"<span class="math math-inline">{mathml}</span>"#)
                    }
                },
                Err(err) => {
                    tracing::debug!(%latex, %err, "Failed to typeset math expression");
                    format!(
                        r#"<span class="math-error" title="{}">{source}</span>"#,
                        escape_html(&err.to_string())
                    )
                }
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_math_becomes_mathml() {
        let html = typeset_html("<p>Euler: $e^{i\\pi}+1=0$</p>");
        assert!(html.contains(r#"<span class="math math-inline"><math"#));
        assert!(!html.contains("$e^"));
    }

    #[test]
    fn test_display_math_spans_lines() {
        let html = typeset_html("<p>$$\nx^2\n$$</p>");
        assert!(html.contains("math-display"));
        assert!(html.contains("display=\"block\""));
    }

    #[test]
    fn test_code_is_never_typeset() {
        let input = "<pre><code>echo $HOME $PATH</code></pre>\n<p>inline <code>$a$</code></p>";
        assert_eq!(typeset_html(input), input);
    }

    #[test]
    fn test_prefix_tags_are_not_skipped() {
        let input = "<preview>$x$</preview>";
        assert!(typeset_html(input).contains("math-inline"));
    }

    #[test]
    fn test_text_without_dollars_is_untouched() {
        let input = "<h1>Title</h1>\n<p>plain</p>";
        assert_eq!(typeset_html(input), input);
    }

    #[test]
    fn test_math_broken_by_markup_is_left_alone() {
        let input = "<p>$a<em>b</em>c$</p>";
        assert_eq!(typeset_html(input), input);
    }

    #[test]
    fn test_attribute_values_are_never_typeset() {
        let html = typeset_html(
            r#"<p><img src="x.png" alt="costs $5 and $6" title='a > $b$' /> and $z$</p>"#,
        );
        assert!(html.starts_with(
            r#"<p><img src="x.png" alt="costs $5 and $6" title='a > $b$' /> and <span class="math math-inline"><math"#
        ));
        assert_eq!(html.matches("<math").count(), 1);
    }

    #[test]
    fn test_tag_len() {
        assert_eq!(tag_len("<p>x"), Some(3));
        assert_eq!(tag_len(r#"<a title="1 > 0">x"#), Some(17));
        assert_eq!(tag_len("<a"), None);
    }

    #[tokio::test]
    async fn test_async_typeset() {
        let typeset = MathmlTypesetter::new()
            .typeset("<p>$a+b$</p>")
            .await
            .unwrap();
        assert!(typeset.contains("<math"));
    }
}
