//! Core library for live markdown preview.
//!
//! # Modules
//!
//! - [`render`] - Markdown to HTML conversion with an injected code highlighter
//! - [`math`] - Math delimiter normalization and typesetting
//! - [`highlight`] - Syntax highlighting, language detection and on-demand grammars
//! - [`pipeline`] - The render cycle and the preview it commits to
//! - [`session`] - Document state and debounced re-rendering
//! - [`watcher`] - File watching abstraction
//! - [`assets`] - Embedded web assets (HTML, CSS, JS)

pub mod assets;
pub mod debounce;
pub mod highlight;
pub mod html;
pub mod math;
pub mod pipeline;
pub mod render;
pub mod session;
pub mod watcher;

// Re-export commonly used types at crate root
pub use debounce::Debouncer;
pub use highlight::{LoadedLanguageSet, SyntaxHighlighter, SyntectHighlighter};
pub use math::{normalize_math_delimiters, MathTypesetter, MathmlTypesetter};
pub use pipeline::{LanguageLoading, PipelineBuilder, PreviewPane, PreviewPipeline};
pub use render::{to_html, MarkdownRenderer, PulldownRenderer, RenderOptions, RenderedPreview};
pub use session::{DocumentEvent, PreviewSession, DEFAULT_DEBOUNCE};
pub use watcher::{DocumentWatcher, WatchError, WatcherConfig};
