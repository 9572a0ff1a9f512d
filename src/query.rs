//! Identifier parsing: one user-typed test name becomes an ordered list of
//! [`Interpretation`]s.
//!
//! A name like `foo.bar` is inherently ambiguous — `bar` could be a module
//! inside package `foo`, or a method inside module `foo`. Rather than guess
//! once, the parser emits every plausible reading in priority order and lets
//! the loader falsify them one at a time against the filesystem.

use std::fmt;
use std::path::PathBuf;

/// A class/method/module name fragment, with an optional glob flag.
///
/// A leading `*` on a segment switches downstream matching from
/// anchored-prefix to substring; the star itself is stripped here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    text: String,
    glob: bool,
}

impl Pattern {
    pub fn parse(raw: &str) -> Self {
        let glob = raw.starts_with('*');
        Self {
            text: raw.trim_matches('*').to_string(),
            glob,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_glob(&self) -> bool {
        self.glob
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.glob {
            write!(f, "*{}", self.text)
        } else {
            f.write_str(&self.text)
        }
    }
}

/// One structured reading of an identifier.
///
/// Fields are optional; an all-empty interpretation means "everything under
/// the search root". When `filepath` is set it takes absolute precedence
/// over `prefix`/`module_name`-driven search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Interpretation {
    /// Directory-shaped fragment preceding the module name, `/`-joined.
    pub prefix: String,
    pub module_name: Option<Pattern>,
    pub class_name: Option<Pattern>,
    pub method_name: Option<Pattern>,
    /// Literal source file path, from the `path/to/file.py:Class.method` form.
    pub filepath: Option<PathBuf>,
}

impl Interpretation {
    pub fn has_module(&self) -> bool {
        self.module_name.is_some()
    }

    pub fn has_class(&self) -> bool {
        self.class_name.is_some()
    }

    pub fn has_method(&self) -> bool {
        self.method_name.is_some()
    }
}

impl fmt::Display for Interpretation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        if !self.prefix.is_empty() {
            parts.push(format!("prefix: {}", self.prefix));
        }
        if let Some(ref m) = self.module_name {
            parts.push(format!("module: {m}"));
        }
        if let Some(ref c) = self.class_name {
            parts.push(format!("class: {c}"));
        }
        if let Some(ref m) = self.method_name {
            parts.push(format!("method: {m}"));
        }
        if let Some(ref p) = self.filepath {
            parts.push(format!("filepath: {}", p.display()));
        }
        f.write_str(&parts.join(", "))
    }
}

/// True for segments matching `^\*?[A-Z]` — the PEP 8 class heuristic.
fn looks_like_class(segment: &str) -> bool {
    segment
        .strip_prefix('*')
        .unwrap_or(segment)
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_uppercase())
}

fn join_prefix(bits: &[&str]) -> String {
    bits.join("/")
}

/// Dotted class/method text after a `:` separator. The class heuristic
/// applies: a lowercase-only expression is a method pattern, not a class.
fn parse_member_bits(rest: &str) -> (Option<Pattern>, Option<Pattern>) {
    let bits: Vec<&str> = rest.split('.').filter(|b| !b.is_empty()).collect();
    let Some((&last, _)) = bits.split_last() else {
        return (None, None);
    };
    if looks_like_class(last) {
        (Some(Pattern::parse(last)), None)
    } else if bits.len() > 1 && looks_like_class(bits[bits.len() - 2]) {
        (
            Some(Pattern::parse(bits[bits.len() - 2])),
            Some(Pattern::parse(last)),
        )
    } else {
        (None, Some(Pattern::parse(bits[0])))
    }
}

/// Break an identifier into its ordered interpretations.
///
/// Never fails: an empty or unparseable name degrades to a single
/// match-everything interpretation. The module-vs-method ambiguity always
/// tries "module" first — a missing file is cheaper to falsify than a
/// missing method inside a found file.
pub fn parse_name(name: &str) -> Vec<Interpretation> {
    let name = name.trim();
    if name.is_empty() {
        return vec![Interpretation::default()];
    }

    let lower = name.to_ascii_lowercase();
    if lower.ends_with(".py") || lower.contains(".py:") {
        return parse_filepath_form(name);
    }
    if name.contains(':') {
        return parse_standard_form(name);
    }
    parse_dotted(name)
}

/// `path/to/file.py` or `path/to/file.py:Class.method`.
fn parse_filepath_form(name: &str) -> Vec<Interpretation> {
    let (filepath, rest) = match name.split_once(':') {
        Some((fp, rest)) => (fp, rest),
        None => (name, ""),
    };
    let filepath = Some(PathBuf::from(filepath));

    let (class_name, method_name) = parse_member_bits(rest.trim());
    vec![Interpretation {
        class_name,
        method_name,
        filepath,
        ..Interpretation::default()
    }]
}

/// `module.path:Class.method` — the standard-path form, where `:` separates
/// a dotted module path from a dotted class/method expression.
fn parse_standard_form(name: &str) -> Vec<Interpretation> {
    let (left, right) = name.split_once(':').unwrap_or((name, ""));

    let left_bits: Vec<&str> = left.split('.').filter(|b| !b.is_empty()).collect();
    let (module_name, prefix) = match left_bits.split_last() {
        Some((last, rest)) => (Some(Pattern::parse(last)), join_prefix(rest)),
        None => (None, String::new()),
    };

    let (class_name, method_name) = parse_member_bits(right.trim());

    vec![Interpretation {
        prefix,
        module_name,
        class_name,
        method_name,
        filepath: None,
    }]
}

/// Plain dotted form: `prefix.module`, `module.Class`, `module.Class.method`,
/// or the fully ambiguous `foo.bar`.
fn parse_dotted(name: &str) -> Vec<Interpretation> {
    let bits: Vec<&str> = name.split('.').collect();
    let n = bits.len();
    let last = bits[n - 1];

    if looks_like_class(last) {
        return vec![Interpretation {
            class_name: Some(Pattern::parse(last)),
            module_name: (n > 1).then(|| Pattern::parse(bits[n - 2])),
            prefix: join_prefix(&bits[..n.saturating_sub(2)]),
            ..Interpretation::default()
        }];
    }

    if n > 1 && looks_like_class(bits[n - 2]) {
        return vec![Interpretation {
            class_name: Some(Pattern::parse(bits[n - 2])),
            method_name: Some(Pattern::parse(last)),
            module_name: (n > 2).then(|| Pattern::parse(bits[n - 3])),
            prefix: join_prefix(&bits[..n.saturating_sub(3)]),
            ..Interpretation::default()
        }];
    }

    // Ambiguous: module first, then method. The pure-prefix reading is
    // handled inside the walker (module search falls back to directory
    // search), so it is not a separate interpretation here.
    vec![
        Interpretation {
            module_name: Some(Pattern::parse(last)),
            prefix: join_prefix(&bits[..n - 1]),
            ..Interpretation::default()
        },
        Interpretation {
            method_name: Some(Pattern::parse(last)),
            module_name: (n > 1).then(|| Pattern::parse(bits[n - 2])),
            prefix: join_prefix(&bits[..n.saturating_sub(2)]),
            ..Interpretation::default()
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pat(s: &str) -> Pattern {
        Pattern::parse(s)
    }

    #[test]
    fn empty_name_matches_everything() {
        let interps = parse_name("");
        assert_eq!(interps, vec![Interpretation::default()]);
    }

    #[test]
    fn whitespace_only_matches_everything() {
        assert_eq!(parse_name("   "), vec![Interpretation::default()]);
    }

    #[test]
    fn ambiguous_two_segments() {
        let interps = parse_name("foo.bar");
        assert_eq!(
            interps,
            vec![
                Interpretation {
                    module_name: Some(pat("bar")),
                    prefix: "foo".into(),
                    ..Interpretation::default()
                },
                Interpretation {
                    method_name: Some(pat("bar")),
                    module_name: Some(pat("foo")),
                    prefix: String::new(),
                    ..Interpretation::default()
                },
            ]
        );
    }

    #[test]
    fn single_lowercase_segment() {
        let interps = parse_name("foo");
        assert_eq!(interps.len(), 2);
        assert_eq!(interps[0].module_name, Some(pat("foo")));
        assert!(interps[0].prefix.is_empty());
        assert_eq!(interps[1].method_name, Some(pat("foo")));
        assert_eq!(interps[1].module_name, None);
    }

    #[test]
    fn trailing_class_segment() {
        let interps = parse_name("foo.bar.Baz");
        assert_eq!(interps.len(), 1);
        assert_eq!(interps[0].class_name, Some(pat("Baz")));
        assert_eq!(interps[0].module_name, Some(pat("bar")));
        assert_eq!(interps[0].prefix, "foo");
    }

    #[test]
    fn class_then_method() {
        let interps = parse_name("foo.bar.Baz.qux");
        assert_eq!(interps.len(), 1);
        assert_eq!(interps[0].class_name, Some(pat("Baz")));
        assert_eq!(interps[0].method_name, Some(pat("qux")));
        assert_eq!(interps[0].module_name, Some(pat("bar")));
        assert_eq!(interps[0].prefix, "foo");
    }

    #[test]
    fn bare_class() {
        let interps = parse_name("Bar");
        assert_eq!(interps.len(), 1);
        assert_eq!(interps[0].class_name, Some(pat("Bar")));
        assert_eq!(interps[0].module_name, None);
    }

    #[test]
    fn class_dot_method() {
        let interps = parse_name("Bar.baz");
        assert_eq!(interps.len(), 1);
        assert_eq!(interps[0].class_name, Some(pat("Bar")));
        assert_eq!(interps[0].method_name, Some(pat("baz")));
        assert_eq!(interps[0].module_name, None);
    }

    #[test]
    fn class_segment_never_doubles_as_module() {
        for name in ["Bar", "foo.Bar", "foo.Bar.baz"] {
            for interp in parse_name(name) {
                if let Some(ref m) = interp.module_name {
                    assert_ne!(m.as_str(), "Bar", "class token leaked into module for {name}");
                }
                if let Some(ref m) = interp.method_name {
                    assert_ne!(m.as_str(), "Bar", "class token leaked into method for {name}");
                }
            }
        }
    }

    #[test]
    fn glob_class_detected() {
        let interps = parse_name("*Bar");
        assert_eq!(interps.len(), 1);
        let class = interps[0].class_name.as_ref().unwrap();
        assert_eq!(class.as_str(), "Bar");
        assert!(class.is_glob());
    }

    #[test]
    fn literal_filepath() {
        let interps = parse_name("pkg/foo_test.py");
        assert_eq!(interps.len(), 1);
        assert_eq!(interps[0].filepath, Some(PathBuf::from("pkg/foo_test.py")));
        assert!(!interps[0].has_class());
    }

    #[test]
    fn filepath_with_class_and_method() {
        let interps = parse_name("pkg/foo_test.py:Bar.baz");
        assert_eq!(interps.len(), 1);
        assert_eq!(interps[0].filepath, Some(PathBuf::from("pkg/foo_test.py")));
        assert_eq!(interps[0].class_name, Some(pat("Bar")));
        assert_eq!(interps[0].method_name, Some(pat("baz")));
    }

    #[test]
    fn filepath_with_bare_method() {
        let interps = parse_name("pkg/foo_test.py:baz");
        assert_eq!(interps.len(), 1);
        assert_eq!(interps[0].method_name, Some(pat("baz")));
        assert!(!interps[0].has_class());
    }

    #[test]
    fn standard_form() {
        let interps = parse_name("pkg.foo_test:Bar.baz");
        assert_eq!(interps.len(), 1);
        assert_eq!(interps[0].module_name, Some(pat("foo_test")));
        assert_eq!(interps[0].prefix, "pkg");
        assert_eq!(interps[0].class_name, Some(pat("Bar")));
        assert_eq!(interps[0].method_name, Some(pat("baz")));
    }

    #[test]
    fn standard_form_bare_method() {
        let interps = parse_name("pkg.foo_test:baz");
        assert_eq!(interps.len(), 1);
        assert_eq!(interps[0].module_name, Some(pat("foo_test")));
        assert_eq!(interps[0].prefix, "pkg");
        assert!(!interps[0].has_class());
        assert_eq!(interps[0].method_name, Some(pat("baz")));
    }

    #[test]
    fn parse_is_deterministic() {
        for name in ["foo.bar", "foo.Bar.baz", "", "pkg/foo_test.py:Bar", "a.b.c.d"] {
            assert_eq!(parse_name(name), parse_name(name), "unstable parse for {name}");
        }
    }
}
