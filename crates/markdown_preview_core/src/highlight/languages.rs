//! Static mapping of the languages that can be loaded on demand.

/// A loadable language: the canonical key used in labels and classes, the
/// name of the bundled grammar providing it, and accepted aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LanguageSpec {
    pub key: &'static str,
    pub grammar: &'static str,
    pub aliases: &'static [&'static str],
}

const fn spec(
    key: &'static str,
    grammar: &'static str,
    aliases: &'static [&'static str],
) -> LanguageSpec {
    LanguageSpec {
        key,
        grammar,
        aliases,
    }
}

pub const SUPPORTED_LANGUAGES: &[LanguageSpec] = &[
    spec("bash", "Bourne Again Shell (bash)", &["sh", "shell", "zsh", "console"]),
    spec("batch", "Batch File", &["bat", "cmd"]),
    spec("c", "C", &["h"]),
    spec("clojure", "Clojure", &["clj"]),
    spec("cpp", "C++", &["c++", "cc", "cxx", "hpp"]),
    spec("csharp", "C#", &["cs", "c#"]),
    spec("css", "CSS", &[]),
    spec("diff", "Diff", &["patch"]),
    spec("dot", "Graphviz (DOT)", &["graphviz"]),
    spec("erlang", "Erlang", &["erl"]),
    spec("go", "Go", &["golang"]),
    spec("groovy", "Groovy", &["gradle"]),
    spec("haskell", "Haskell", &["hs"]),
    spec("html", "HTML", &["htm", "xhtml"]),
    spec("java", "Java", &[]),
    spec("javascript", "JavaScript", &["js", "jsx", "mjs", "cjs"]),
    spec("json", "JSON", &["jsonc"]),
    spec("latex", "LaTeX", &["tex"]),
    spec("lisp", "Lisp", &["elisp", "emacs-lisp"]),
    spec("lua", "Lua", &[]),
    spec("makefile", "Makefile", &["make", "mk"]),
    spec("markdown", "Markdown", &["md"]),
    spec("matlab", "MATLAB", &[]),
    spec("objectivec", "Objective-C", &["objc", "obj-c"]),
    spec("ocaml", "OCaml", &["ml"]),
    spec("pascal", "Pascal", &["delphi"]),
    spec("perl", "Perl", &["pl"]),
    spec("php", "PHP", &[]),
    spec("python", "Python", &["py", "python3", "gyp"]),
    spec("r", "R", &[]),
    spec("ruby", "Ruby", &["rb"]),
    spec("rust", "Rust", &["rs"]),
    spec("scala", "Scala", &[]),
    spec("sql", "SQL", &[]),
    spec("tcl", "TCL", &["tk"]),
    spec("xml", "XML", &["svg", "xsd", "rss"]),
    spec("yaml", "YAML", &["yml"]),
];

/// Languages loaded before the first render when loading lazily.
pub const DEFAULT_BOOTSTRAP_LANGUAGES: &[&str] =
    &["javascript", "python", "bash", "json", "html", "css"];

/// Look up a language by key or alias, case-insensitively.
pub fn lookup(name: &str) -> Option<&'static LanguageSpec> {
    let name = name.trim();
    SUPPORTED_LANGUAGES.iter().find(|spec| {
        spec.key.eq_ignore_ascii_case(name)
            || spec.aliases.iter().any(|alias| alias.eq_ignore_ascii_case(name))
    })
}

/// The key a language name is registered under: the static key for known
/// names and aliases, the lowercased name otherwise.
pub fn canonical_name(name: &str) -> String {
    lookup(name)
        .map(|spec| spec.key.to_string())
        .unwrap_or_else(|| name.trim().to_ascii_lowercase())
}
