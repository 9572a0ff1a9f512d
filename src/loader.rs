//! Resolution orchestrator: drive one identifier through its ordered
//! interpretations until concrete test targets fall out.
//!
//! Interpretations are falsified in order; the first one that yields any
//! target is authoritative and later readings are never consulted. Load
//! failures along the way are captured, not raised — they only surface when
//! the whole identifier comes up empty.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::catalog::{self, TestCaseCatalog};
use crate::error::Error;
use crate::query::{self, Interpretation};
use crate::resolver::{self, CapturedError, ModuleIdentity, ResolvedModule, SearchPath};
use crate::walker;

/// One concrete runnable target: a module, a class, or a single method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestTarget {
    pub module: String,
    pub path: PathBuf,
    /// Directory the module is importable from; the runner's working dir.
    pub import_root: PathBuf,
    pub class_name: Option<String>,
    pub method_name: Option<String>,
}

impl TestTarget {
    /// Dotted id in the form `python -m unittest` accepts.
    pub fn id(&self) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(3);
        if !self.module.is_empty() {
            parts.push(&self.module);
        }
        if let Some(ref class) = self.class_name {
            parts.push(class);
        }
        if let Some(ref method) = self.method_name {
            parts.push(method);
        }
        parts.join(".")
    }
}

impl fmt::Display for TestTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id())
    }
}

/// Resolves identifiers against one search root at a time.
pub struct TestLoader<'a> {
    method_prefix: &'a str,
    debug: bool,
}

impl<'a> TestLoader<'a> {
    pub fn new(method_prefix: &'a str, debug: bool) -> Self {
        Self {
            method_prefix,
            debug,
        }
    }

    /// Resolve `name` under `root`.
    ///
    /// On exhaustion the first captured load error is surfaced; only when
    /// no candidate errored either does this report not-found.
    pub fn load(
        &self,
        search: &mut SearchPath,
        root: &Path,
        name: &str,
    ) -> Result<Vec<TestTarget>, Error> {
        let interps = query::parse_name(name);
        let scope = search.scope(root);
        let mut first_error: Option<CapturedError> = None;

        for (i, interp) in interps.iter().enumerate() {
            if self.debug {
                eprintln!("dowse: {}. searching for tests matching [{interp}]", i + 1);
            }

            let mut targets: Vec<TestTarget> = Vec::new();
            for path in walker::candidate_paths(scope.root(), interp) {
                let module = match resolver::load_module(&path) {
                    Ok(module) => module,
                    Err(err) => {
                        if self.debug {
                            eprintln!("dowse: {err}");
                        }
                        first_error.get_or_insert(err);
                        continue;
                    }
                };
                let identity = scope.identity(&path);
                self.collect(&module, &identity, interp, &mut targets);
            }

            if !targets.is_empty() {
                if self.debug {
                    for target in &targets {
                        eprintln!("dowse: found {target}");
                    }
                }
                return Ok(targets);
            }
        }

        match first_error {
            Some(err) => Err(Error::Resolution(err.path, err.message)),
            None => Err(Error::NoTestsFound(name.to_string())),
        }
    }

    /// Match one loaded module against an interpretation at the finest
    /// granularity the interpretation carries.
    fn collect(
        &self,
        module: &ResolvedModule,
        identity: &ModuleIdentity,
        interp: &Interpretation,
        out: &mut Vec<TestTarget>,
    ) {
        let target = |class: Option<String>, method: Option<String>| TestTarget {
            module: identity.name.clone(),
            path: module.path.clone(),
            import_root: identity.import_root.clone(),
            class_name: class,
            method_name: method,
        };

        if !interp.has_class() && !interp.has_method() {
            // Module granularity: a found module is authoritative even when
            // it holds no test cases yet.
            out.push(target(None, None));
            return;
        }

        let cases = TestCaseCatalog::build_under(&module.ast, &identity.import_root, &module.path);
        for class in cases.classes() {
            if let Some(ref class_pattern) = interp.class_name
                && !catalog::class_matches(class_pattern, class.name.as_str())
            {
                continue;
            }

            if let Some(ref method_pattern) = interp.method_name {
                for method in cases.methods(class, self.method_prefix) {
                    if catalog::method_matches(method_pattern, self.method_prefix, &method) {
                        out.push(target(Some(class.name.to_string()), Some(method)));
                    }
                }
            } else {
                out.push(target(Some(class.name.to_string()), None));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const FOO_TEST: &str = concat!(
        "import unittest\n\n",
        "class BarTest(unittest.TestCase):\n",
        "    def test_baz(self):\n        pass\n",
        "    def test_qux(self):\n        pass\n",
    );

    fn tree(spec: &[(&str, &str)]) -> tempfile::TempDir {
        let tmp = tempfile::tempdir().unwrap();
        for (path, contents) in spec {
            let full = tmp.path().join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, contents).unwrap();
        }
        tmp
    }

    fn load(tmp: &tempfile::TempDir, name: &str) -> Result<Vec<TestTarget>, Error> {
        let mut search = SearchPath::new();
        TestLoader::new("test", false).load(&mut search, tmp.path(), name)
    }

    #[test]
    fn resolves_method_through_fuzzy_module_name() {
        let tmp = tree(&[("pkg/__init__.py", ""), ("pkg/foo_test.py", FOO_TEST)]);
        let targets = load(&tmp, "foo.baz").unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].id(), "pkg.foo_test.BarTest.test_baz");
    }

    #[test]
    fn module_reading_beats_method_reading() {
        // "foo" could be module foo_test or a method; the module wins.
        let tmp = tree(&[("pkg/foo_test.py", FOO_TEST)]);
        let targets = load(&tmp, "foo").unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].class_name, None);
        assert_eq!(targets[0].method_name, None);
    }

    #[test]
    fn class_name_resolves_to_class_target() {
        let tmp = tree(&[("pkg/foo_test.py", FOO_TEST)]);
        let targets = load(&tmp, "Bar").unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].class_name.as_deref(), Some("BarTest"));
        assert_eq!(targets[0].method_name, None);
    }

    #[test]
    fn class_and_method_resolve_together() {
        let tmp = tree(&[("pkg/foo_test.py", FOO_TEST)]);
        let targets = load(&tmp, "foo.Bar.qux").unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].method_name.as_deref(), Some("test_qux"));
    }

    #[test]
    fn load_error_is_deferred_when_another_candidate_matches() {
        let tmp = tree(&[
            ("a_test.py", "def broken(:\n"),
            ("b_test.py", FOO_TEST),
        ]);
        let targets = load(&tmp, "").unwrap();
        assert!(targets.iter().any(|t| t.module == "b_test"));
    }

    #[test]
    fn first_load_error_surfaces_on_exhaustion() {
        let tmp = tree(&[
            ("a_test.py", "def broken(:\n"),
            ("b_test.py", "class also broken\n"),
        ]);
        let err = load(&tmp, "").unwrap_err();
        match err {
            Error::Resolution(path, _) => assert!(path.ends_with("a_test.py")),
            other => panic!("expected resolution error, got {other}"),
        }
    }

    #[test]
    fn nothing_found_reports_the_name() {
        let tmp = tree(&[("pkg/foo_test.py", FOO_TEST)]);
        let err = load(&tmp, "zzz").unwrap_err();
        assert!(matches!(err, Error::NoTestsFound(name) if name == "zzz"));
    }

    #[test]
    fn glob_method_matches_substring() {
        let tmp = tree(&[("pkg/foo_test.py", FOO_TEST)]);
        let targets = load(&tmp, "foo.Bar.*ux").unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].method_name.as_deref(), Some("test_qux"));
    }
}
