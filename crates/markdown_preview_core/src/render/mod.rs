//! Markdown to HTML rendering.
//!
//! This module provides markdown-to-HTML conversion with support for:
//! - GitHub Flavored Markdown (tables, strikethrough, task lists, footnotes)
//! - Fenced code blocks routed through an injected highlight callback
//! - The `language-<name>` class convention the highlight sweep relies on

mod markdown_renderer;
mod output;
mod traits;

use crate::html::escape_html;
use pulldown_cmark::{CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};

pub use markdown_renderer::PulldownRenderer;
pub use output::RenderedPreview;
pub use traits::{HighlightCallback, MarkdownRenderer, RenderError};

/// Class prefix marking an explicit language on a `<code>` element.
pub const LANGUAGE_CLASS_PREFIX: &str = "language-";

/// Options for rendering markdown to HTML.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Enable GitHub Flavored Markdown tables
    pub enable_tables: bool,
    /// Enable strikethrough syntax (~~text~~)
    pub enable_strikethrough: bool,
    /// Enable task list items ([x] and [ ])
    pub enable_tasklists: bool,
    /// Enable footnotes ([^1])
    pub enable_footnotes: bool,
    /// Enable heading attributes ({#id .class})
    pub enable_heading_attributes: bool,
}

impl RenderOptions {
    /// Options matching what GitHub renders.
    pub fn gfm() -> Self {
        Self {
            enable_tables: true,
            enable_strikethrough: true,
            enable_tasklists: true,
            enable_footnotes: true,
            enable_heading_attributes: true,
        }
    }

    fn to_pulldown_options(&self) -> Options {
        let mut options = Options::empty();
        if self.enable_tables {
            options.insert(Options::ENABLE_TABLES);
        }
        if self.enable_strikethrough {
            options.insert(Options::ENABLE_STRIKETHROUGH);
        }
        if self.enable_tasklists {
            options.insert(Options::ENABLE_TASKLISTS);
        }
        if self.enable_footnotes {
            options.insert(Options::ENABLE_FOOTNOTES);
        }
        if self.enable_heading_attributes {
            options.insert(Options::ENABLE_HEADING_ATTRIBUTES);
        }
        options
    }
}

/// The language hint of a fenced block is the first word of its info string.
fn language_hint(kind: &CodeBlockKind) -> Option<String> {
    match kind {
        CodeBlockKind::Fenced(info) => info
            .split_whitespace()
            .next()
            .filter(|lang| !lang.is_empty())
            .map(ToOwned::to_owned),
        CodeBlockKind::Indented => None,
    }
}

fn code_block_html(code: &str, language: Option<&str>, highlight: HighlightCallback) -> String {
    let body = highlight(code, language).unwrap_or_else(|| escape_html(code));
    match language {
        Some(language) => format!(
            "<pre><code class=\"{LANGUAGE_CLASS_PREFIX}{}\">{body}</code></pre>\n",
            escape_html(language)
        ),
        None => format!("<pre><code>{body}</code></pre>\n"),
    }
}

/// Render markdown content to HTML.
///
/// Every code block is passed to `highlight` together with its language
/// hint; a `None` result emits the escaped plain code instead.
///
/// # Example
///
/// ```
/// use markdown_preview_core::render::{to_html, RenderOptions};
///
/// let html = to_html("# Hello\n\nWorld", &RenderOptions::gfm(), &|_, _| None);
/// assert!(html.contains("<h1>Hello</h1>"));
/// ```
pub fn to_html(markdown_content: &str, options: &RenderOptions, highlight: HighlightCallback) -> String {
    let parser = Parser::new_ext(markdown_content, options.to_pulldown_options());

    let mut processed_events = Vec::new();
    // (language hint, collected code) of the block being read.
    let mut code_block: Option<(Option<String>, String)> = None;

    for event in parser {
        match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                code_block = Some((language_hint(&kind), String::new()));
            }
            Event::Text(text) if code_block.is_some() => {
                if let Some((_, code)) = code_block.as_mut() {
                    code.push_str(&text);
                }
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some((language, code)) = code_block.take() {
                    let html = code_block_html(&code, language.as_deref(), highlight);
                    processed_events.push(Event::Html(CowStr::from(html)));
                }
            }
            event => processed_events.push(event),
        }
    }

    let mut html_output = String::with_capacity(markdown_content.len() * 3 / 2);
    pulldown_cmark::html::push_html(&mut html_output, processed_events.into_iter());

    tracing::trace!(
        input_len = markdown_content.len(),
        output_len = html_output.len(),
        "Rendered markdown"
    );

    html_output
}
