//! Module identity and source loading.
//!
//! A candidate path on disk becomes a dotted module name by walking back up
//! through its package ancestry (`__init__.py` markers), never escaping the
//! active search root. Loading never imports anything: the source is parsed
//! with ruff and the AST handed to the class/method filter.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use ruff_python_ast::{Mod, ModModule};
use ruff_python_parser::{Mode, ParseOptions, parse};

/// A dotted module name plus the directory it is importable from.
///
/// `import_root` is the first ancestor that is not itself a package; running
/// `python -m unittest <name>` from there makes `name` importable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleIdentity {
    pub name: String,
    pub import_root: PathBuf,
}

/// A source file parsed into its module AST.
#[derive(Debug)]
pub struct ResolvedModule {
    pub path: PathBuf,
    pub ast: ModModule,
}

/// A read or parse failure, captured per candidate.
///
/// Captured errors are deferred: a later candidate or interpretation may
/// still succeed, and only a fully empty resolution surfaces the first one.
#[derive(Debug, Clone)]
pub struct CapturedError {
    pub path: PathBuf,
    pub message: String,
}

impl fmt::Display for CapturedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot load '{}': {}", self.path.display(), self.message)
    }
}

/// Compute the dotted module name for `file`, relative to `root`.
///
/// Package directories (those carrying `__init__.py`) between the file and
/// the root become name segments; the walk stops at the first non-package
/// directory or at `root` itself, whichever comes first. A package's own
/// `__init__.py` names the package, not `pkg.__init__`.
pub fn module_identity(root: &Path, file: &Path) -> ModuleIdentity {
    let stem = file
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();

    let mut parts: Vec<String> = Vec::new();
    if !stem.is_empty() && stem != "__init__" {
        parts.push(stem.to_string());
    }

    let mut dir = file.parent();
    while let Some(d) = dir {
        if d == root || !d.join("__init__.py").is_file() {
            break;
        }
        if let Some(name) = d.file_name().and_then(|n| n.to_str()) {
            parts.push(name.to_string());
        }
        dir = d.parent();
    }

    parts.reverse();
    ModuleIdentity {
        name: parts.join("."),
        import_root: dir.map_or_else(|| root.to_path_buf(), Path::to_path_buf),
    }
}

/// Read and parse one source file.
pub fn load_module(path: &Path) -> Result<ResolvedModule, CapturedError> {
    let captured = |message: String| CapturedError {
        path: path.to_path_buf(),
        message,
    };

    let source = fs::read_to_string(path).map_err(|e| captured(e.to_string()))?;
    let parsed =
        parse(&source, ParseOptions::from(Mode::Module)).map_err(|e| captured(e.to_string()))?;
    match parsed.into_syntax() {
        Mod::Module(ast) => Ok(ResolvedModule {
            path: path.to_path_buf(),
            ast,
        }),
        Mod::Expression(_) => Err(captured("not a module".to_string())),
    }
}

/// Stack of active search roots.
///
/// Probing a directory scopes it as the innermost root for the duration of
/// that probe; module identities are always computed against the innermost
/// root, and the stack unwinds on every exit path through [`RootGuard`].
#[derive(Debug, Default)]
pub struct SearchPath {
    roots: Vec<PathBuf>,
}

impl SearchPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push `root`; it stays active until the returned guard drops.
    pub fn scope(&mut self, root: &Path) -> RootGuard<'_> {
        self.roots.push(root.to_path_buf());
        RootGuard { search: self }
    }

    pub fn depth(&self) -> usize {
        self.roots.len()
    }
}

/// Scoped handle to the innermost search root.
pub struct RootGuard<'a> {
    search: &'a mut SearchPath,
}

impl RootGuard<'_> {
    pub fn root(&self) -> &Path {
        // The guard exists only while its push is on the stack.
        self.search.roots.last().map_or(Path::new(""), PathBuf::as_path)
    }

    pub fn identity(&self, file: &Path) -> ModuleIdentity {
        module_identity(self.root(), file)
    }
}

impl Drop for RootGuard<'_> {
    fn drop(&mut self) {
        self.search.roots.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(spec: &[(&str, &str)]) -> tempfile::TempDir {
        let tmp = tempfile::tempdir().unwrap();
        for (path, contents) in spec {
            let full = tmp.path().join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, contents).unwrap();
        }
        tmp
    }

    #[test]
    fn identity_joins_package_segments() {
        let tmp = tree(&[("pkg/__init__.py", ""), ("pkg/foo_test.py", "")]);
        let id = module_identity(tmp.path(), &tmp.path().join("pkg/foo_test.py"));
        assert_eq!(id.name, "pkg.foo_test");
        assert_eq!(id.import_root, tmp.path());
    }

    #[test]
    fn identity_stops_at_first_non_package_dir() {
        let tmp = tree(&[("src/pkg/__init__.py", ""), ("src/pkg/mod_test.py", "")]);
        let id = module_identity(tmp.path(), &tmp.path().join("src/pkg/mod_test.py"));
        assert_eq!(id.name, "pkg.mod_test");
        assert_eq!(id.import_root, tmp.path().join("src"));
    }

    #[test]
    fn package_init_names_the_package() {
        let tmp = tree(&[("pkg/__init__.py", "")]);
        let id = module_identity(tmp.path(), &tmp.path().join("pkg/__init__.py"));
        assert_eq!(id.name, "pkg");
    }

    #[test]
    fn identity_never_escapes_the_search_root() {
        let tmp = tree(&[
            ("pkg/__init__.py", ""),
            ("pkg/sub/__init__.py", ""),
            ("pkg/sub/x_test.py", ""),
        ]);
        // pkg is itself a package, but the search is rooted inside it.
        let root = tmp.path().join("pkg");
        let id = module_identity(&root, &root.join("sub/x_test.py"));
        assert_eq!(id.name, "sub.x_test");
        assert_eq!(id.import_root, root);
    }

    #[test]
    fn load_parses_a_test_module() {
        let tmp = tree(&[(
            "foo_test.py",
            "import unittest\n\nclass FooTest(unittest.TestCase):\n    def test_a(self):\n        pass\n",
        )]);
        let module = load_module(&tmp.path().join("foo_test.py")).unwrap();
        assert_eq!(module.ast.body.len(), 2);
    }

    #[test]
    fn load_captures_syntax_errors() {
        let tmp = tree(&[("broken_test.py", "def broken(:\n")]);
        let err = load_module(&tmp.path().join("broken_test.py")).unwrap_err();
        assert!(err.path.ends_with("broken_test.py"));
        assert!(err.to_string().contains("cannot load"));
    }

    #[test]
    fn load_captures_missing_files() {
        let tmp = tree(&[]);
        assert!(load_module(&tmp.path().join("nope_test.py")).is_err());
    }

    #[test]
    fn root_guard_unwinds_on_drop() {
        let tmp = tree(&[]);
        let mut search = SearchPath::new();
        {
            let scope = search.scope(tmp.path());
            assert_eq!(scope.root(), tmp.path());
        }
        assert_eq!(search.depth(), 0);
    }
}
