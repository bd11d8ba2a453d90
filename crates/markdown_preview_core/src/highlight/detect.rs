//! Language auto-detection.
//!
//! Every candidate grammar parses the snippet and earns relevance for the
//! meaningful scopes it recognizes (keywords, storage, function names,
//! strings...) and loses relevance for scopes it flags as invalid. The
//! highest positive score wins; ties go to the earlier candidate.

use syntect::parsing::{ParseState, ParsingError, ScopeStackOp, SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

/// First matching prefix wins, so more specific scopes come first.
const SCOPE_WEIGHTS: &[(&str, i64)] = &[
    ("invalid", -10),
    ("keyword.control", 3),
    ("support.function", 3),
    ("keyword", 2),
    ("storage", 2),
    ("entity.name", 2),
    ("constant.language", 2),
    ("variable.language", 2),
    ("support", 1),
    ("constant.numeric", 1),
    ("string", 1),
    ("comment", 1),
];

fn scope_weight(scope: &str) -> i64 {
    SCOPE_WEIGHTS
        .iter()
        .find(|(prefix, _)| scope.starts_with(prefix))
        .map(|(_, weight)| *weight)
        .unwrap_or(0)
}

fn relevance(
    code: &str,
    syntax: &SyntaxReference,
    syntax_set: &SyntaxSet,
) -> Result<i64, ParsingError> {
    let mut parse_state = ParseState::new(syntax);
    let mut score = 0;
    for line in LinesWithEndings::from(code) {
        for (_, op) in parse_state.parse_line(line, syntax_set)? {
            if let ScopeStackOp::Push(scope) = op {
                score += scope_weight(&scope.build_string());
            }
        }
    }
    Ok(score)
}

/// A registered language considered by detection.
#[derive(Debug)]
pub(super) struct Candidate<'a> {
    /// Canonical language name.
    pub language: String,
    pub syntax: &'a SyntaxReference,
    /// The linked set `syntax` belongs to.
    pub syntax_set: &'a SyntaxSet,
}

impl Candidate<'_> {
    fn matches_first_line(&self, line: &str) -> bool {
        self.syntax_set
            .find_syntax_by_first_line(line)
            .is_some_and(|syntax| syntax.name == self.syntax.name)
    }
}

/// Pick the most relevant candidate for `code`, if any scores above zero.
///
/// A candidate recognizing the first line outright (a shebang, an XML
/// declaration) short-circuits the scoring.
pub(super) fn detect_language<'c, 'a>(
    code: &str,
    candidates: &'c [Candidate<'a>],
) -> Option<&'c Candidate<'a>> {
    if code.trim().is_empty() {
        return None;
    }

    if let Some(first_line) = code.lines().next() {
        if let Some(candidate) = candidates
            .iter()
            .find(|candidate| candidate.matches_first_line(first_line))
        {
            return Some(candidate);
        }
    }

    let mut best: Option<(i64, usize)> = None;
    for (index, candidate) in candidates.iter().enumerate() {
        let language = &candidate.language;
        match relevance(code, candidate.syntax, candidate.syntax_set) {
            Ok(score) => {
                tracing::trace!(%language, score, "Scored detection candidate");
                if score > 0 && best.map_or(true, |(best_score, _)| score > best_score) {
                    best = Some((score, index));
                }
            }
            Err(err) => {
                tracing::trace!(%language, ?err, "Skipping detection candidate");
            }
        }
    }

    best.map(|(_, index)| &candidates[index])
}
