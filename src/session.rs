//! Session: owns the resolution configuration and exposes the outer API.
//!
//! A [`Session`] is the primary interface for the CLI: it holds the base
//! directory, any extra prefix roots, and the method prefix, and resolves
//! each identifier against every root, merging the results.

use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::loader::{TestLoader, TestTarget};
use crate::resolver::SearchPath;

/// How many targets were found, broken down by granularity.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Counts {
    pub modules: usize,
    pub classes: usize,
    pub methods: usize,
}

impl Counts {
    pub fn tally(targets: &[TestTarget]) -> Self {
        let mut counts = Self::default();
        for target in targets {
            if target.method_name.is_some() {
                counts.methods += 1;
            } else if target.class_name.is_some() {
                counts.classes += 1;
            } else {
                counts.modules += 1;
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.modules + self.classes + self.methods
    }
}

/// An open resolution session.
pub struct Session {
    basedir: PathBuf,
    prefix_roots: Vec<PathBuf>,
    method_prefix: String,
    debug: bool,
    search: SearchPath,
}

impl Session {
    /// Validate the base directory and normalize the extra prefix roots.
    ///
    /// Relative prefix roots are taken relative to the base directory;
    /// roots that do not exist are skipped with a warning rather than
    /// aborting the whole run.
    pub fn open(
        basedir: &Path,
        prefix_roots: &[PathBuf],
        method_prefix: &str,
        debug: bool,
    ) -> Result<Self, Error> {
        let basedir = basedir
            .canonicalize()
            .map_err(|e| Error::BaseDirNotFound(basedir.to_path_buf(), e))?;

        let mut roots: Vec<PathBuf> = Vec::new();
        for root in prefix_roots {
            let absolute = if root.is_absolute() {
                root.clone()
            } else {
                basedir.join(root)
            };
            match absolute.canonicalize() {
                Ok(canon) if canon != basedir => roots.push(canon),
                Ok(_) => {}
                Err(e) => eprintln!("dowse: skipping prefix '{}': {e}", root.display()),
            }
        }

        Ok(Self {
            basedir,
            prefix_roots: roots,
            method_prefix: method_prefix.to_string(),
            debug,
            search: SearchPath::new(),
        })
    }

    /// Resolve one identifier against the base dir and every prefix root.
    ///
    /// Each root is probed independently; targets merge in root order and
    /// duplicates collapse. A root that finds nothing is fine as long as
    /// some root succeeds; on total failure a captured load error beats a
    /// plain not-found.
    pub fn resolve(&mut self, name: &str) -> Result<Vec<TestTarget>, Error> {
        let loader = TestLoader::new(&self.method_prefix, self.debug);
        let mut targets: Vec<TestTarget> = Vec::new();
        let mut first_error: Option<Error> = None;

        let roots: Vec<PathBuf> = std::iter::once(self.basedir.clone())
            .chain(self.prefix_roots.iter().cloned())
            .collect();
        for root in &roots {
            match loader.load(&mut self.search, root, name) {
                Ok(found) => {
                    for target in found {
                        if !targets.contains(&target) {
                            targets.push(target);
                        }
                    }
                }
                Err(err) => {
                    let replace = match (&first_error, &err) {
                        (None, _) => true,
                        // A load error is more informative than not-found.
                        (Some(Error::NoTestsFound(_)), Error::Resolution(..)) => true,
                        _ => false,
                    };
                    if replace {
                        first_error = Some(err);
                    }
                }
            }
        }

        if targets.is_empty() {
            return Err(first_error.unwrap_or_else(|| Error::NoTestsFound(name.to_string())));
        }
        Ok(targets)
    }

    /// Resolve every identifier; no identifiers means "everything".
    pub fn resolve_all(&mut self, names: &[String]) -> Result<Vec<TestTarget>, Error> {
        let mut targets: Vec<TestTarget> = Vec::new();
        if names.is_empty() {
            return self.resolve("");
        }
        for name in names {
            for target in self.resolve(name)? {
                if !targets.contains(&target) {
                    targets.push(target);
                }
            }
        }
        Ok(targets)
    }

    pub fn basedir(&self) -> &Path {
        &self.basedir
    }

    pub fn method_prefix(&self) -> &str {
        &self.method_prefix
    }
}
