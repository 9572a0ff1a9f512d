//! Filesystem probe: evaluate one [`Interpretation`] against a directory
//! tree and produce the candidate source paths it could refer to.
//!
//! Matching is fuzzy on purpose. A module name matches an on-disk basename
//! after stripping the conventional test prefixes (`test_`, `test`) or
//! postfixes (`_test`, `test`, `_tests`, `tests`), case-insensitively, and a
//! glob-flagged pattern downgrades anchored-prefix matching to substring
//! matching. Prefix segments are resolved against directory names with the
//! same rules.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

use crate::query::{Interpretation, Pattern};

pub const MODULE_PREFIXES: &[&str] = &["test_", "test"];
pub const MODULE_POSTFIXES: &[&str] = &["_test", "test", "_tests", "tests"];

/// Directories never descended into: hidden and private directories are
/// handled by name shape, these are installed-package and tooling roots.
const SKIP_DIRS: &[&str] = &[
    "site-packages",
    "dist-packages",
    "venv",
    "__pycache__",
    "node_modules",
];

/// One visited directory with its immediate children, mirroring the shape
/// of an `os.walk` tuple. `dirs` and `files` are sorted basenames; only
/// `.py` files are module candidates.
#[derive(Debug)]
pub struct DirListing {
    pub root: PathBuf,
    pub dirs: Vec<String>,
    pub files: Vec<String>,
}

fn prune_dir(name: &str) -> bool {
    name.starts_with('.')
        || name.starts_with('_')
        || name.ends_with(".egg-info")
        || SKIP_DIRS.contains(&name)
}

/// Walk `base` top-down in sorted order, pruning hidden (`.`), private
/// (`_`) and installed-package directories.
pub fn walk(base: &Path) -> Vec<DirListing> {
    let mut listings: Vec<DirListing> = Vec::new();
    let mut index: HashMap<PathBuf, usize> = HashMap::new();

    let walker = WalkBuilder::new(base)
        .standard_filters(false)
        .sort_by_file_name(std::cmp::Ord::cmp)
        .filter_entry(|entry| {
            if entry.depth() == 0 {
                return true;
            }
            let Some(name) = entry.path().file_name().and_then(|n| n.to_str()) else {
                return false;
            };
            if entry.file_type().is_some_and(|t| t.is_dir()) {
                return !prune_dir(name);
            }
            true
        })
        .build();

    for entry in walker.flatten() {
        let path = entry.into_path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()).map(String::from) else {
            continue;
        };
        if path.is_dir() {
            if let Some(parent) = path.parent()
                && let Some(&i) = index.get(parent)
            {
                listings[i].dirs.push(name);
            }
            index.insert(path.clone(), listings.len());
            listings.push(DirListing {
                root: path,
                dirs: Vec::new(),
                files: Vec::new(),
            });
        } else if name.to_ascii_lowercase().ends_with(".py")
            && let Some(parent) = path.parent()
            && let Some(&i) = index.get(parent)
        {
            listings[i].files.push(name);
        }
    }

    listings
}

fn stem_of(basename: &str) -> &str {
    basename.rsplit_once('.').map_or(basename, |(stem, _)| stem)
}

/// True if a basename stem follows one of the test-module naming
/// conventions: begins with `test` or ends with `test`/`tests`.
pub fn is_test_shaped(stem: &str) -> bool {
    let stem = stem.to_ascii_lowercase();
    MODULE_POSTFIXES.iter().any(|pf| stem.ends_with(pf))
        || MODULE_PREFIXES.iter().any(|pf| stem.starts_with(pf))
}

/// Check whether `pattern`, combined with the test prefixes/postfixes, is
/// found in `basenames`. Returns the first matching basename in sorted
/// order.
///
/// With `is_prefix` the bare name may also match directly (the segment
/// being looked up is a parent directory, not the test module itself);
/// without it one of the test affixes must be present.
fn find_basename(pattern: &Pattern, basenames: &[String], is_prefix: bool) -> Option<String> {
    let name = pattern.as_str().to_ascii_lowercase();
    let glob = pattern.is_glob();
    if name.is_empty() {
        return None;
    }

    for basename in basenames {
        let fileroot = stem_of(basename).to_ascii_lowercase();
        if !fileroot.contains(&name) && !name.contains(&fileroot) {
            continue;
        }

        for pf in MODULE_POSTFIXES {
            let hit = if glob {
                fileroot.contains(&name) && fileroot.ends_with(pf)
            } else {
                fileroot.starts_with(&name) && fileroot.ends_with(pf)
            };
            if hit {
                return Some(basename.clone());
            }
        }

        for pf in MODULE_PREFIXES {
            let hit = if glob {
                fileroot.starts_with(pf) && fileroot.contains(&name)
            } else {
                fileroot.starts_with(&format!("{pf}{name}"))
            };
            if hit {
                return Some(basename.clone());
            }
        }

        if is_prefix {
            let base_l = basename.to_ascii_lowercase();
            if base_l.starts_with(&name) || (glob && base_l.contains(&name)) {
                return Some(basename.clone());
            }
            let shaped = is_test_shaped(&fileroot);
            let hit = if glob {
                base_l.contains(&name) && shaped
            } else {
                base_l.starts_with(&name) && shaped
            };
            if hit {
                return Some(basename.clone());
            }
        }
    }

    None
}

/// Resolve a dotted/slashed prefix to the concrete directories it matches.
///
/// Ambiguous prefixes may match several locations (e.g. a namespace split
/// across packages); all are returned in walk order, deduplicated. An
/// unmatchable prefix yields an empty vec, never an error.
pub fn find_prefix_paths(base: &Path, prefix: &str) -> Vec<PathBuf> {
    let segments: Vec<Pattern> = prefix
        .split(['.', '/', '\\'])
        .filter(|s| !s.is_empty())
        .map(Pattern::parse)
        .collect();
    find_prefix_paths_segments(base, &segments)
}

fn find_prefix_paths_segments(base: &Path, segments: &[Pattern]) -> Vec<PathBuf> {
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut out: Vec<PathBuf> = Vec::new();
    if segments.is_empty() {
        return out;
    }

    for listing in walk(base) {
        let mut current = Some(listing.root.clone());
        for segment in segments {
            let Some(dir) = current.take() else { break };
            for inner in walk(&dir) {
                if let Some(basename) = find_basename(segment, &inner.dirs, true) {
                    current = Some(inner.root.join(basename));
                    break;
                }
            }
            if current.is_none() {
                break;
            }
        }
        if let Some(found) = current
            && seen.insert(found.clone())
        {
            out.push(found);
        }
    }

    out
}

/// Find a file (or, failing that, a directory) matching `module` under
/// `base`. Returns the path, which may be a directory when the name only
/// resolves as a package/prefix.
pub fn find_module_path(base: &Path, module: &Pattern) -> Option<PathBuf> {
    let name = module.as_str().to_ascii_lowercase();

    for listing in walk(base) {
        if let Some(basename) = find_basename(module, &listing.files, false) {
            return Some(listing.root.join(basename));
        }

        // Second pass: the typed name may already carry the affix
        // (`foo_test` for file foo_test.py) or be an exact test-shaped stem.
        for basename in &listing.files {
            let fileroot = stem_of(basename).to_ascii_lowercase();
            if !fileroot.contains(&name) && !name.contains(&fileroot) {
                continue;
            }
            let postfixed = MODULE_POSTFIXES
                .iter()
                .any(|pf| fileroot.starts_with(&format!("{name}{pf}")));
            let prefixed = MODULE_PREFIXES
                .iter()
                .any(|pf| fileroot.starts_with(&format!("{pf}{name}")));
            let exact = fileroot == name && is_test_shaped(&fileroot);
            if postfixed || prefixed || exact {
                return Some(listing.root.join(basename));
            }
        }
    }

    // The name may be a directory (package) rather than a file.
    find_prefix_paths_segments(base, std::slice::from_ref(module))
        .into_iter()
        .next()
}

/// Every test-shaped source file under `dir`, recursively. A test-shaped
/// package directory contributes its `__init__.py` so the package itself
/// becomes a runnable module target.
fn test_files_under(dir: &Path) -> Vec<PathBuf> {
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut out: Vec<PathBuf> = Vec::new();

    for listing in walk(dir) {
        let dir_shaped = listing
            .root
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(is_test_shaped);
        for basename in &listing.files {
            let stem = stem_of(basename);
            let path = listing.root.join(basename);
            let test_shaped_file = stem == "__init__" && dir_shaped || is_test_shaped(stem);
            if test_shaped_file && seen.insert(path.clone()) {
                out.push(path);
            }
        }
    }

    out
}

/// Evaluate an interpretation against `base` and return its candidate
/// paths, most likely first.
///
/// A literal `filepath` bypasses all search. A prefix that resolves to
/// nothing yields an empty vec (the loader then moves to the next
/// interpretation).
pub fn candidate_paths(base: &Path, interp: &Interpretation) -> Vec<PathBuf> {
    if let Some(ref filepath) = interp.filepath {
        let resolved = if filepath.is_absolute() {
            filepath.clone()
        } else {
            base.join(filepath)
        };
        return vec![resolved];
    }

    let bases = if interp.prefix.is_empty() {
        vec![base.to_path_buf()]
    } else {
        find_prefix_paths(base, &interp.prefix)
    };

    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut out: Vec<PathBuf> = Vec::new();
    for basedir in bases {
        let path = match interp.module_name {
            Some(ref module) => match find_module_path(&basedir, module) {
                Some(p) => p,
                None => continue,
            },
            None => basedir,
        };

        if path.is_file() {
            if seen.insert(path.clone()) {
                out.push(path);
            }
        } else {
            for file in test_files_under(&path) {
                if seen.insert(file.clone()) {
                    out.push(file);
                }
            }
        }
    }

    out
}
