//! Post-render pass over every code block of a preview.
//!
//! For each `<pre><code>` block: highlight it with its explicit language
//! (loading the grammar first if needed) or detect one, then append a label
//! naming the language to the `<pre>` container. A language no grammar
//! source knows keeps its name on the label; a grammar that failed to load
//! is labeled `AUTO`.

use super::{GrammarError, LanguageLoader, SyntaxHighlighter};
use crate::html::{escape_html, extract_attr, text_content};
use crate::render::LANGUAGE_CLASS_PREFIX;
use std::sync::Arc;

/// Language name used when detection yields nothing.
pub const AUTO_LANGUAGE: &str = "auto";

/// Class of the label element appended to each code block.
pub const LABEL_CLASS: &str = "language-label";

/// Extra label class for blocks whose language was not given by the author.
pub const AUTO_MARKER_CLASS: &str = "auto-detected";

/// Languages considered by auto-detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidates {
    /// Every language registered with the highlighter.
    Registered,
    /// Only these languages, and only once they are registered.
    Only(Vec<String>),
}

/// A code block found in rendered markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlockDescriptor {
    /// Raw attribute text of the `<pre>` tag, kept as is.
    pre_attrs: String,
    /// Classes of the `<code>` element.
    pub classes: Vec<String>,
    /// Text content of the block, tags stripped and entities decoded.
    pub text: String,
    /// Language given by a `language-` class.
    pub explicit_language: Option<String>,
}

impl CodeBlockDescriptor {
    /// Parse a `<pre ...><code ...>...</code></pre>` element.
    ///
    /// Returns `None` for `<pre>` elements not wrapping a `<code>` element.
    pub fn parse(element: &str) -> Option<Self> {
        let body = element.strip_prefix("<pre")?.strip_suffix("</pre>")?;
        let pre_tag_end = body.find('>')?;
        let pre_attrs = &body[..pre_tag_end];
        let inner = body[pre_tag_end + 1..].trim();

        let after_code = inner.strip_prefix("<code")?;
        if !after_code.starts_with(['>', ' ']) {
            return None;
        }
        let code_tag_end = inner.find('>')?;
        let code_tag = &inner[..code_tag_end];
        let code_close = inner.rfind("</code>")?;
        if code_close < code_tag_end {
            return None;
        }

        let classes = extract_attr(code_tag, "class")
            .map(|classes| classes.split_whitespace().map(ToOwned::to_owned).collect())
            .unwrap_or_else(Vec::new);
        let explicit_language = classes
            .iter()
            .find_map(|class: &String| class.strip_prefix(LANGUAGE_CLASS_PREFIX))
            .filter(|language| !language.is_empty())
            .map(ToOwned::to_owned);

        Some(Self {
            pre_attrs: pre_attrs.to_string(),
            classes,
            text: text_content(&inner[code_tag_end + 1..code_close]),
            explicit_language,
        })
    }

    fn to_html(&self, body: &str, language: &str, auto_detected: bool) -> String {
        let code_open = if self.classes.is_empty() {
            "<code>".to_string()
        } else {
            format!("<code class=\"{}\">", self.classes.join(" "))
        };
        let label_class = if auto_detected {
            format!("{LABEL_CLASS} {AUTO_MARKER_CLASS}")
        } else {
            LABEL_CLASS.to_string()
        };
        format!(
            "<pre{}>{code_open}{body}</code><span class=\"{label_class}\">{}</span></pre>",
            self.pre_attrs,
            escape_html(&language.to_uppercase()),
        )
    }
}

/// Applies highlighting and language labels to every code block.
#[derive(Debug)]
pub struct HighlightSweep {
    highlighter: Arc<dyn SyntaxHighlighter>,
    loader: Arc<LanguageLoader>,
    candidates: Candidates,
}

impl HighlightSweep {
    pub fn new(
        highlighter: Arc<dyn SyntaxHighlighter>,
        loader: Arc<LanguageLoader>,
        candidates: Candidates,
    ) -> Self {
        Self {
            highlighter,
            loader,
            candidates,
        }
    }

    fn candidate_names(&self) -> Vec<String> {
        match &self.candidates {
            Candidates::Registered => self.highlighter.languages(),
            Candidates::Only(names) => names
                .iter()
                .filter(|name| self.highlighter.has_language(name))
                .cloned()
                .collect(),
        }
    }

    /// Rewrite every code block in `html`. Markup outside code blocks is
    /// copied through unchanged.
    pub async fn run(&self, html: &str) -> String {
        let candidates = self.candidate_names();
        let mut out = String::with_capacity(html.len() * 2);
        let mut rest = html;
        let mut blocks = 0usize;

        while let Some(start) = rest.find("<pre") {
            out.push_str(&rest[..start]);
            let element = &rest[start..];

            if !element["<pre".len()..].starts_with(['>', ' ']) {
                out.push_str("<pre");
                rest = &element["<pre".len()..];
                continue;
            }

            let Some(end) = element.find("</pre>").map(|index| index + "</pre>".len()) else {
                out.push_str(element);
                rest = "";
                break;
            };

            match CodeBlockDescriptor::parse(&element[..end]) {
                Some(block) => {
                    out.push_str(&self.process(&block, &candidates).await);
                    blocks += 1;
                }
                None => out.push_str(&element[..end]),
            }
            rest = &element[end..];
        }
        out.push_str(rest);

        tracing::debug!(blocks, candidates = candidates.len(), "Highlight sweep done");
        out
    }

    async fn process(&self, block: &CodeBlockDescriptor, candidates: &[String]) -> String {
        if let Some(language) = &block.explicit_language {
            match self.loader.ensure(language).await {
                Ok(()) | Err(GrammarError::Unsupported(_)) => {}
                Err(err) => {
                    tracing::warn!(%language, %err, "Failed to load grammar");
                    return block.to_html(&escape_html(&block.text), AUTO_LANGUAGE, true);
                }
            }

            return match self.highlighter.highlight_explicit(&block.text, language) {
                Ok(body) => block.to_html(&body, language, false),
                Err(err) => {
                    tracing::debug!(%language, %err, "Leaving code block unhighlighted");
                    block.to_html(&escape_html(&block.text), language, false)
                }
            };
        }

        match self.highlighter.highlight_auto(&block.text, candidates) {
            Ok(auto) => {
                let language = auto.language.as_deref().unwrap_or(AUTO_LANGUAGE);
                let mut tagged = block.clone();
                if let Some(detected) = &auto.language {
                    tagged
                        .classes
                        .push(format!("{LANGUAGE_CLASS_PREFIX}{detected}"));
                }
                tagged.to_html(&auto.html, language, true)
            }
            Err(err) => {
                tracing::warn!(%err, "Language detection failed");
                block.to_html(&escape_html(&block.text), AUTO_LANGUAGE, true)
            }
        }
    }
}
