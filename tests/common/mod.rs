use std::path::{Path, PathBuf};

/// A self-contained Python project for integration tests.
///
/// Structure:
///   pkg/__init__.py
///   pkg/foo_test.py  -> _RootTest (internal base, test_shared)
///                       BarTest (test_baz, test_qux)
///                       ConcreteTest(_RootTest) — inherits test_shared
///   pkg/che_test.py  -> CheTest (test_one), imported-name base form
///   helpers.py       -> not test-shaped, never a target
///
/// Properties:
///   - run-everything resolves exactly two modules (foo_test, che_test)
///   - _RootTest is never a target itself but test_shared resolves
///     through ConcreteTest
///   - both `unittest.TestCase` and `from unittest import TestCase`
///     base forms appear
pub struct TestProject {
    pub dir: tempfile::TempDir,
    pub root: PathBuf,
}

impl TestProject {
    /// Create the fixture. Caller must keep the returned value alive
    /// (dropping `TempDir` deletes the files).
    pub fn new() -> Self {
        let project = Self::empty();
        let root = &project.root;

        std::fs::create_dir_all(root.join("pkg")).unwrap();
        std::fs::write(root.join("pkg/__init__.py"), "").unwrap();

        std::fs::write(
            root.join("pkg/foo_test.py"),
            concat!(
                "import unittest\n",
                "\n",
                "\n",
                "class _RootTest(unittest.TestCase):\n",
                "    def test_shared(self):\n",
                "        pass\n",
                "\n",
                "\n",
                "class BarTest(unittest.TestCase):\n",
                "    def test_baz(self):\n",
                "        pass\n",
                "\n",
                "    def test_qux(self):\n",
                "        pass\n",
                "\n",
                "\n",
                "class ConcreteTest(_RootTest):\n",
                "    pass\n",
            ),
        )
        .unwrap();

        std::fs::write(
            root.join("pkg/che_test.py"),
            concat!(
                "from unittest import TestCase\n",
                "\n",
                "\n",
                "class CheTest(TestCase):\n",
                "    def test_one(self):\n",
                "        pass\n",
            ),
        )
        .unwrap();

        std::fs::write(root.join("helpers.py"), "VALUE = 1\n").unwrap();

        project
    }

    /// A project whose only test module has a syntax error.
    pub fn broken() -> Self {
        let project = Self::empty();
        std::fs::write(project.root.join("oops_test.py"), "def broken(:\n").unwrap();
        project
    }

    /// An empty project root (a `proj/` dir inside the temp dir, so extra
    /// search roots can live beside it without being swept up).
    pub fn empty() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap().join("proj");
        std::fs::create_dir_all(&root).unwrap();
        Self { dir, root }
    }

    /// Add a second search root beside the main one, holding one test
    /// module, and return its path.
    pub fn extra_root(&self) -> PathBuf {
        let extra = self.root.parent().unwrap().join("extra");
        std::fs::create_dir_all(&extra).unwrap();
        std::fs::write(
            extra.join("more_test.py"),
            concat!(
                "import unittest\n",
                "\n",
                "\n",
                "class MoreTest(unittest.TestCase):\n",
                "    def test_extra(self):\n",
                "        pass\n",
            ),
        )
        .unwrap();
        extra
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
