use super::detect::{detect_language, Candidate};
use super::languages::canonical_name;
use super::{AutoHighlight, BundledGrammars, Grammar, HighlightError, SyntaxHighlighter};
use crate::html::escape_html;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::{SyntaxDefinition, SyntaxReference, SyntaxSet, SyntaxSetBuilder};
use syntect::util::LinesWithEndings;

/// Classes emitted for highlighted tokens, e.g. `hl-keyword hl-control`.
pub const CLASS_STYLE: ClassStyle = ClassStyle::SpacedPrefixed { prefix: "hl-" };

/// Where the syntax of a registered language lives.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SyntaxLocation {
    Bundled(String),
    Standalone(String),
}

#[derive(Debug)]
struct Registry {
    bundled: Arc<BundledGrammars>,
    /// Standalone definitions, in registration order.
    definitions: Vec<SyntaxDefinition>,
    /// Linked set of `definitions`, rebuilt whenever one is added.
    standalone: SyntaxSet,
    /// Canonical language name to its syntax.
    languages: BTreeMap<String, SyntaxLocation>,
}

impl Registry {
    fn new(bundled: Arc<BundledGrammars>) -> Self {
        Self {
            bundled,
            definitions: Vec::new(),
            standalone: Self::link(&[]),
            languages: BTreeMap::new(),
        }
    }

    /// Only unlinked definitions may be linked here; the bundled syntaxes
    /// are already linked against their own set.
    fn link(definitions: &[SyntaxDefinition]) -> SyntaxSet {
        let mut builder = SyntaxSetBuilder::new();
        builder.add_plain_text_syntax();
        for definition in definitions {
            builder.add(definition.clone());
        }
        builder.build()
    }

    fn syntax(&self, name: &str) -> Option<(&SyntaxReference, &SyntaxSet)> {
        match self.languages.get(&canonical_name(name))? {
            SyntaxLocation::Bundled(syntax_name) => {
                let syntax_set = self.bundled.syntax_set();
                syntax_set
                    .find_syntax_by_name(syntax_name)
                    .map(|syntax| (syntax, syntax_set))
            }
            SyntaxLocation::Standalone(syntax_name) => self
                .standalone
                .find_syntax_by_name(syntax_name)
                .map(|syntax| (syntax, &self.standalone)),
        }
    }

    /// Returns `true` if the standalone set needs relinking.
    fn insert(&mut self, name: &str, grammar: Grammar) -> Result<bool, HighlightError> {
        let name = canonical_name(name);
        if name.is_empty() || self.languages.contains_key(&name) {
            return Ok(false);
        }

        match grammar {
            Grammar::Bundled(syntax_name) => {
                if !self.bundled.contains(&syntax_name) {
                    return Err(HighlightError::UnknownLanguage(syntax_name));
                }
                self.languages.insert(name, SyntaxLocation::Bundled(syntax_name));
                Ok(false)
            }
            Grammar::Definition(definition) => {
                let syntax_name = definition.name.clone();
                let is_new_grammar = !self.definitions.iter().any(|d| d.name == syntax_name);
                if is_new_grammar {
                    self.definitions.push(definition);
                }
                self.languages.insert(name, SyntaxLocation::Standalone(syntax_name));
                Ok(is_new_grammar)
            }
        }
    }
}

/// [`SyntaxHighlighter`] backed by syntect, emitting class-based markup.
///
/// Starts out with no language visible; grammars are added through
/// [`SyntaxHighlighter::register_language`].
#[derive(Debug)]
pub struct SyntectHighlighter {
    registry: RwLock<Registry>,
}

impl Default for SyntectHighlighter {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntectHighlighter {
    pub fn new() -> Self {
        Self::with_bundled(BundledGrammars::shared())
    }

    pub fn with_bundled(bundled: Arc<BundledGrammars>) -> Self {
        Self {
            registry: RwLock::new(Registry::new(bundled)),
        }
    }
}

pub(super) fn highlight_lines(
    code: &str,
    syntax: &SyntaxReference,
    syntax_set: &SyntaxSet,
) -> Result<String, syntect::Error> {
    let mut generator = ClassedHTMLGenerator::new_with_class_style(syntax, syntax_set, CLASS_STYLE);
    for line in LinesWithEndings::from(code) {
        generator.parse_html_for_line_which_includes_newline(line)?;
    }
    Ok(generator.finalize())
}

impl SyntaxHighlighter for SyntectHighlighter {
    fn highlight_explicit(&self, code: &str, language: &str) -> Result<String, HighlightError> {
        let registry = self.registry.read();
        let (syntax, syntax_set) = registry
            .syntax(language)
            .ok_or_else(|| HighlightError::UnknownLanguage(language.to_string()))?;
        Ok(highlight_lines(code, syntax, syntax_set)?)
    }

    fn highlight_auto(
        &self,
        code: &str,
        candidates: &[String],
    ) -> Result<AutoHighlight, HighlightError> {
        let registry = self.registry.read();
        let candidates = candidates
            .iter()
            .filter_map(|name| {
                registry.syntax(name).map(|(syntax, syntax_set)| Candidate {
                    language: canonical_name(name),
                    syntax,
                    syntax_set,
                })
            })
            .collect::<Vec<_>>();

        match detect_language(code, &candidates) {
            Some(candidate) => Ok(AutoHighlight {
                html: highlight_lines(code, candidate.syntax, candidate.syntax_set)?,
                language: Some(candidate.language.clone()),
            }),
            None => Ok(AutoHighlight {
                html: escape_html(code),
                language: None,
            }),
        }
    }

    fn register_language(&self, name: &str, grammar: Grammar) -> Result<(), HighlightError> {
        self.register_languages(vec![(name.to_string(), grammar)])
    }

    fn register_languages(&self, grammars: Vec<(String, Grammar)>) -> Result<(), HighlightError> {
        let mut registry = self.registry.write();
        let mut relink = false;
        let mut result = Ok(());
        for (name, grammar) in grammars {
            match registry.insert(&name, grammar) {
                Ok(needs_link) => relink |= needs_link,
                Err(err) => {
                    tracing::debug!(language = %name, %err, "Grammar not registered");
                    result = Err(err);
                }
            }
        }
        if relink {
            registry.standalone = Registry::link(&registry.definitions);
            tracing::debug!(
                grammars = registry.definitions.len(),
                languages = registry.languages.len(),
                "Relinked standalone syntax set"
            );
        }
        result
    }

    fn has_language(&self, name: &str) -> bool {
        self.registry.read().syntax(name).is_some()
    }

    fn languages(&self) -> Vec<String> {
        self.registry.read().languages.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn highlighter_with(names: &[&str]) -> SyntectHighlighter {
        let bundled = BundledGrammars::shared();
        let highlighter = SyntectHighlighter::new();
        let grammars = names
            .iter()
            .map(|name| {
                let language = crate::highlight::languages::lookup(name).unwrap();
                (language.key.to_string(), bundled.get(language.grammar).unwrap())
            })
            .collect();
        highlighter.register_languages(grammars).unwrap();
        highlighter
    }

    #[test]
    fn test_unknown_language_is_an_error() {
        let highlighter = SyntectHighlighter::new();
        assert!(matches!(
            highlighter.highlight_explicit("x", "python"),
            Err(HighlightError::UnknownLanguage(_))
        ));
        assert!(!highlighter.has_language("python"));
    }

    #[test]
    fn test_explicit_highlighting_emits_token_classes() {
        let highlighter = highlighter_with(&["python"]);
        let html = highlighter.highlight_explicit("print(1)\n", "python").unwrap();
        assert!(html.contains(r#"<span class="hl-source hl-python">"#));
        assert!(html.contains("hl-constant hl-numeric"));
        assert!(html.contains("print"));
    }

    #[test]
    fn test_aliases_resolve_to_registered_grammar() {
        let highlighter = highlighter_with(&["python"]);
        assert!(highlighter.has_language("py"));
        assert!(highlighter.highlight_explicit("x = 1\n", "PY").is_ok());
        assert_eq!(highlighter.languages(), vec!["python".to_string()]);
    }

    #[test]
    fn test_registration_is_idempotent() {
        let highlighter = highlighter_with(&["rust"]);
        let grammar = BundledGrammars::shared().get("Rust").unwrap();
        highlighter.register_language("rust", grammar.clone()).unwrap();
        highlighter.register_language("rs", grammar).unwrap();
        assert_eq!(highlighter.languages(), vec!["rust".to_string()]);
        assert!(highlighter.registry.read().definitions.is_empty());
    }

    #[test]
    fn test_registering_bundled_grammars_one_by_one() {
        let highlighter = SyntectHighlighter::new();
        let bundled = BundledGrammars::shared();
        for (name, grammar) in [("python", "Python"), ("rust", "Rust"), ("json", "JSON")] {
            highlighter
                .register_language(name, bundled.get(grammar).unwrap())
                .unwrap();
        }

        let html = highlighter.highlight_explicit("fn main() {}\n", "rust").unwrap();
        assert!(html.contains("hl-source hl-rust"));
        assert!(highlighter.highlight_explicit("{\"a\": 1}\n", "json").is_ok());
        assert!(!highlighter.has_language("bash"));
    }

    #[test]
    fn test_missing_bundled_grammar_is_rejected() {
        let highlighter = SyntectHighlighter::new();
        let err = highlighter
            .register_language("cobol", Grammar::Bundled("COBOL".to_string()))
            .unwrap_err();
        assert!(matches!(err, HighlightError::UnknownLanguage(name) if name == "COBOL"));
        assert!(!highlighter.has_language("cobol"));
    }

    #[test]
    fn test_standalone_grammar_next_to_bundled() {
        let highlighter = highlighter_with(&["python"]);
        let definition = SyntaxDefinition::load_from_str(
            r#"%YAML 1.2
---
name: INI
scope: source.ini
contexts:
  main:
    - match: '^\s*\[[^\]]*\]'
      scope: entity.name.section.ini
"#,
            true,
            None,
        )
        .unwrap();
        highlighter
            .register_language("ini", Grammar::Definition(definition))
            .unwrap();

        let html = highlighter.highlight_explicit("[core]\n", "ini").unwrap();
        assert!(html.contains("hl-entity hl-name hl-section"));
        let html = highlighter.highlight_explicit("print(1)\n", "python").unwrap();
        assert!(html.contains("hl-source hl-python"));
        assert_eq!(highlighter.registry.read().definitions.len(), 1);
    }

    #[test]
    fn test_auto_without_candidates() {
        let highlighter = highlighter_with(&["python"]);
        let result = highlighter.highlight_auto("a < b\n", &[]).unwrap();
        assert_eq!(result.language, None);
        assert_eq!(result.html, "a &lt; b\n");
    }

    #[test]
    fn test_auto_detects_among_candidates() {
        let highlighter = highlighter_with(&["javascript", "python", "bash"]);
        let code = r#"import os

def greet(name):
    """Say hello."""
    if name is None:
        return None
    return "hello " + name
"#;
        let candidates = vec![
            "javascript".to_string(),
            "python".to_string(),
            "bash".to_string(),
        ];
        let result = highlighter.highlight_auto(code, &candidates).unwrap();
        assert_eq!(result.language.as_deref(), Some("python"));
        assert!(result.html.contains("hl-python"));
    }
}
