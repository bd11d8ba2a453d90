//! Syntax highlighting for code blocks in the preview.
//!
//! - [`SyntaxHighlighter`] is the seam the pipeline depends on;
//!   [`SyntectHighlighter`] is the implementation.
//! - [`LanguageLoader`] registers grammars on demand and maintains the
//!   [`LoadedLanguageSet`].
//! - [`HighlightSweep`] post-processes every code block of a rendered
//!   preview: highlight, detect, and label.

mod detect;
mod engine;
pub mod languages;
mod loader;
mod sweep;
mod theme;

pub use engine::{SyntectHighlighter, CLASS_STYLE};
pub use loader::{
    BundledGrammars, DirectoryGrammars, GrammarError, GrammarSource, LanguageLoader,
    LoadedLanguageSet,
};
pub use sweep::{
    Candidates, CodeBlockDescriptor, HighlightSweep, AUTO_LANGUAGE, AUTO_MARKER_CLASS, LABEL_CLASS,
};
pub use theme::theme_css;

/// A language grammar that can be registered with a highlighter.
#[derive(Debug, Clone)]
pub enum Grammar {
    /// A syntax of the bundled set, which is linked once and shared. Holds
    /// the syntax name, e.g. `"Python"`.
    Bundled(String),
    /// A standalone, not yet linked definition.
    Definition(syntect::parsing::SyntaxDefinition),
}

impl Grammar {
    /// Name of the syntax the grammar provides.
    pub fn name(&self) -> &str {
        match self {
            Self::Bundled(name) => name,
            Self::Definition(definition) => &definition.name,
        }
    }
}

/// Error type for highlighting operations.
#[derive(Debug, thiserror::Error)]
pub enum HighlightError {
    /// No grammar is registered for the requested language.
    #[error("unknown language: {0}")]
    UnknownLanguage(String),

    /// The highlighting engine failed on the given source.
    #[error("failed to highlight: {0}")]
    Syntect(#[from] syntect::Error),
}

/// Result of automatic language detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoHighlight {
    /// Highlighted HTML, or the escaped source when nothing was detected.
    pub html: String,
    /// Canonical name of the detected language.
    pub language: Option<String>,
}

/// Produces highlighted HTML for source text.
pub trait SyntaxHighlighter: Send + Sync {
    /// Highlight `code` as `language`.
    ///
    /// Fails with [`HighlightError::UnknownLanguage`] if no grammar is
    /// registered for it.
    fn highlight_explicit(&self, code: &str, language: &str) -> Result<String, HighlightError>;

    /// Detect the language of `code` among `candidates` and highlight it.
    fn highlight_auto(&self, code: &str, candidates: &[String])
        -> Result<AutoHighlight, HighlightError>;

    /// Register `grammar` under `name`. Registering a name twice is a no-op.
    fn register_language(&self, name: &str, grammar: Grammar) -> Result<(), HighlightError>;

    /// Register several grammars at once.
    fn register_languages(&self, grammars: Vec<(String, Grammar)>) -> Result<(), HighlightError> {
        for (name, grammar) in grammars {
            self.register_language(&name, grammar)?;
        }
        Ok(())
    }

    /// Whether a grammar is registered for `name`.
    fn has_language(&self, name: &str) -> bool;

    /// Names of all registered languages.
    fn languages(&self) -> Vec<String>;
}

impl std::fmt::Debug for dyn SyntaxHighlighter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyntaxHighlighter")
            .field("languages", &self.languages())
            .finish()
    }
}
