//! On-demand grammar loading.
//!
//! The [`LanguageLoader`] keeps the [`LoadedLanguageSet`] in sync with the
//! grammars registered in the highlighter. Names it fails to load are not
//! recorded, so the next request for them retries.

use super::languages::{self, SUPPORTED_LANGUAGES};
use super::{Grammar, HighlightError, SyntaxHighlighter};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use syntect::parsing::{SyntaxDefinition, SyntaxSet};

/// Error type for grammar loading.
#[derive(Debug, thiserror::Error)]
pub enum GrammarError {
    /// No source knows the language.
    #[error("unsupported language: {0}")]
    Unsupported(String),

    /// A single source does not provide the grammar.
    #[error("grammar not found: {0}")]
    NotFound(String),

    #[error("failed to read grammar {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid grammar {name}: {message}")]
    Parse { name: String, message: String },

    #[error(transparent)]
    Highlight(#[from] HighlightError),
}

/// Names of the languages registered so far.
///
/// Grows monotonically and is shared (cheap to clone) between the loader and
/// the highlight sweep.
#[derive(Debug, Clone, Default)]
pub struct LoadedLanguageSet {
    inner: Arc<RwLock<BTreeSet<String>>>,
}

impl LoadedLanguageSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.read().contains(name)
    }

    /// Returns `true` if the name was not present yet.
    pub(crate) fn insert(&self, name: impl Into<String>) -> bool {
        self.inner.write().insert(name.into())
    }

    /// Sorted snapshot of the loaded names.
    pub fn names(&self) -> Vec<String> {
        self.inner.read().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

/// Somewhere grammar definitions can be fetched from.
#[async_trait::async_trait]
pub trait GrammarSource: Send + Sync {
    /// Fetch the grammar named `name`.
    ///
    /// Returns [`GrammarError::NotFound`] when this source does not have it,
    /// letting the loader fall through to the next source.
    async fn fetch(&self, name: &str) -> Result<Grammar, GrammarError>;
}

static BUNDLED: Lazy<Arc<BundledGrammars>> = Lazy::new(|| Arc::new(BundledGrammars::load()));

/// Grammars shipped with syntect, keyed by syntax name (e.g. `"Python"`).
///
/// The set is linked once; highlighters share it and only choose which of
/// its syntaxes they expose.
pub struct BundledGrammars {
    syntax_set: SyntaxSet,
}

impl std::fmt::Debug for BundledGrammars {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BundledGrammars")
            .field("grammars", &self.syntax_set.syntaxes().len())
            .finish()
    }
}

impl BundledGrammars {
    /// The process-wide bundled grammars, deserialized on first use.
    pub fn shared() -> Arc<Self> {
        BUNDLED.clone()
    }

    fn load() -> Self {
        let syntax_set = SyntaxSet::load_defaults_newlines();
        tracing::debug!(grammars = syntax_set.syntaxes().len(), "Loaded bundled grammars");
        Self { syntax_set }
    }

    pub fn syntax_set(&self) -> &SyntaxSet {
        &self.syntax_set
    }

    pub fn get(&self, name: &str) -> Option<Grammar> {
        self.contains(name).then(|| Grammar::Bundled(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.syntax_set.find_syntax_by_name(name).is_some()
    }
}

#[async_trait::async_trait]
impl GrammarSource for BundledGrammars {
    async fn fetch(&self, name: &str) -> Result<Grammar, GrammarError> {
        self.get(name)
            .ok_or_else(|| GrammarError::NotFound(name.to_string()))
    }
}

/// User grammars stored as `<name>.sublime-syntax` files in a directory.
#[derive(Debug, Clone)]
pub struct DirectoryGrammars {
    dir: PathBuf,
}

impl DirectoryGrammars {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait::async_trait]
impl GrammarSource for DirectoryGrammars {
    async fn fetch(&self, name: &str) -> Result<Grammar, GrammarError> {
        let path = self.dir.join(format!("{name}.sublime-syntax"));
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(GrammarError::NotFound(name.to_string()));
            }
            Err(source) => return Err(GrammarError::Io { path, source }),
        };
        SyntaxDefinition::load_from_str(&contents, true, Some(name))
            .map(Grammar::Definition)
            .map_err(|err| GrammarError::Parse {
                name: name.to_string(),
                message: err.to_string(),
            })
    }
}

/// Loads grammars into a highlighter on demand.
pub struct LanguageLoader {
    highlighter: Arc<dyn SyntaxHighlighter>,
    loaded: LoadedLanguageSet,
    sources: Vec<Arc<dyn GrammarSource>>,
}

impl std::fmt::Debug for LanguageLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanguageLoader")
            .field("loaded", &self.loaded)
            .field("sources", &self.sources.len())
            .finish()
    }
}

impl LanguageLoader {
    /// Sources are tried in order.
    pub fn new(
        highlighter: Arc<dyn SyntaxHighlighter>,
        loaded: LoadedLanguageSet,
        sources: Vec<Arc<dyn GrammarSource>>,
    ) -> Self {
        Self {
            highlighter,
            loaded,
            sources,
        }
    }

    pub fn loaded(&self) -> &LoadedLanguageSet {
        &self.loaded
    }

    /// Make sure the grammar for `name` is registered.
    ///
    /// No-op for an empty or already loaded name. Known languages are fetched
    /// by their bundled grammar name, other names are looked up verbatim.
    pub async fn ensure(&self, name: &str) -> Result<(), GrammarError> {
        let requested = name.trim().to_ascii_lowercase();
        if requested.is_empty() || self.loaded.contains(&requested) {
            return Ok(());
        }

        let language = languages::lookup(&requested);
        let key = language.map_or_else(|| requested.clone(), |language| language.key.to_string());

        if !self.loaded.contains(&key) {
            let grammar_name = language.map_or(requested.as_str(), |language| language.grammar);
            let grammar = self.fetch(grammar_name, &requested).await?;
            self.highlighter.register_language(&key, grammar)?;
            self.loaded.insert(key.clone());
            tracing::debug!(language = %key, "Registered grammar");
        }

        self.loaded.insert(requested);
        Ok(())
    }

    async fn fetch(&self, grammar_name: &str, requested: &str) -> Result<Grammar, GrammarError> {
        for source in &self.sources {
            match source.fetch(grammar_name).await {
                Ok(grammar) => return Ok(grammar),
                Err(GrammarError::NotFound(_)) => continue,
                Err(err) => return Err(err),
            }
        }
        Err(GrammarError::Unsupported(requested.to_string()))
    }

    /// Load the given languages, logging the ones that fail.
    pub async fn bootstrap<S: AsRef<str>>(&self, names: &[S]) {
        for name in names {
            let name = name.as_ref();
            if let Err(err) = self.ensure(name).await {
                tracing::warn!(language = name, %err, "Failed to bootstrap language");
            }
        }
    }

    /// Register every supported language in one batch.
    pub async fn load_all(&self) -> Result<(), GrammarError> {
        let mut batch = Vec::with_capacity(SUPPORTED_LANGUAGES.len());
        for language in SUPPORTED_LANGUAGES {
            if self.loaded.contains(language.key) {
                continue;
            }
            match self.fetch(language.grammar, language.key).await {
                Ok(grammar) => batch.push((language.key.to_string(), grammar)),
                Err(err) => {
                    tracing::warn!(language = language.key, %err, "Failed to load language");
                }
            }
        }

        let keys = batch.iter().map(|(key, _)| key.clone()).collect::<Vec<_>>();
        let registered = self.highlighter.register_languages(batch);
        for key in keys {
            if self.highlighter.has_language(&key) {
                self.loaded.insert(key);
            }
        }

        tracing::info!(languages = self.loaded.len(), "Loaded all languages");
        Ok(registered?)
    }
}
