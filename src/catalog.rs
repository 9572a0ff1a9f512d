//! Test-case catalog: find the `unittest.TestCase` subclasses and
//! test-prefixed methods inside a parsed module.
//!
//! Detection is purely syntactic. A class is a test case when its base-class
//! closure reaches a recognized `unittest` base, through any mix of direct
//! bases, import aliases, locally-defined intermediate classes, and bases
//! imported from sibling project modules (resolved one import deep).

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use ruff_python_ast::{Expr, Mod, ModModule, Stmt, StmtClassDef};
use ruff_python_parser::{Mode, ParseOptions, parse};

use crate::query::Pattern;

/// Base classes in `unittest` that mark a subclass as runnable.
const CASE_BASES: &[&str] = &["TestCase", "IsolatedAsyncioTestCase", "FunctionTestCase"];

/// The test-case classes of one module, with base-class closure resolved.
pub struct TestCaseCatalog<'a> {
    order: Vec<&'a StmtClassDef>,
    by_name: HashMap<&'a str, &'a StmtClassDef>,
    cases: HashSet<&'a str>,
}

fn bases(class: &StmtClassDef) -> impl Iterator<Item = &Expr> {
    class.arguments.iter().flat_map(|args| args.args.iter())
}

impl<'a> TestCaseCatalog<'a> {
    /// Purely syntactic build; bases imported from other project modules
    /// stay unresolved.
    pub fn build(module: &'a ModModule) -> Self {
        Self::build_inner(module, None)
    }

    /// Build with sibling-import resolution: a base brought in with
    /// `from pkg.base import SharedBase` counts when `SharedBase` is a test
    /// case in the referenced module under `import_root`. Resolution goes
    /// one import deep.
    pub fn build_under(module: &'a ModModule, import_root: &Path, module_path: &Path) -> Self {
        Self::build_inner(module, Some((import_root, module_path)))
    }

    fn build_inner(module: &'a ModModule, location: Option<(&Path, &Path)>) -> Self {
        // Local names bound to the unittest module itself, local names bound
        // directly to one of its case base classes, and names imported from
        // project modules.
        let mut module_aliases: HashSet<&str> = HashSet::new();
        let mut base_aliases: HashSet<&str> = CASE_BASES.iter().copied().collect();
        let mut imported: HashMap<&str, (Option<&str>, u32, &str)> = HashMap::new();

        for stmt in &module.body {
            match stmt {
                Stmt::Import(import) => {
                    for alias in &import.names {
                        let target = alias.name.as_str();
                        if target == "unittest" || target.starts_with("unittest.") {
                            let local = alias.asname.as_ref().unwrap_or(&alias.name);
                            module_aliases.insert(local.as_str());
                        }
                    }
                }
                Stmt::ImportFrom(import_from) => {
                    let from_unittest = import_from
                        .module
                        .as_ref()
                        .is_some_and(|m| m.as_str() == "unittest" || m.starts_with("unittest."));
                    if from_unittest {
                        for alias in &import_from.names {
                            if CASE_BASES.contains(&alias.name.as_str()) {
                                let local = alias.asname.as_ref().unwrap_or(&alias.name);
                                base_aliases.insert(local.as_str());
                            }
                        }
                    } else {
                        for alias in &import_from.names {
                            let local = alias.asname.as_ref().unwrap_or(&alias.name);
                            imported.insert(
                                local.as_str(),
                                (
                                    import_from.module.as_ref().map(|m| m.as_str()),
                                    import_from.level,
                                    alias.name.as_str(),
                                ),
                            );
                        }
                    }
                }
                _ => {}
            }
        }

        let order: Vec<&StmtClassDef> = module
            .body
            .iter()
            .filter_map(|stmt| match stmt {
                Stmt::ClassDef(class) => Some(class),
                _ => None,
            })
            .collect();
        let by_name: HashMap<&str, &StmtClassDef> =
            order.iter().map(|c| (c.name.as_str(), *c)).collect();

        let names_external_base = |expr: &Expr| match expr {
            Expr::Name(name) => base_aliases.contains(name.id.as_str()),
            Expr::Attribute(attr) => {
                CASE_BASES.contains(&attr.attr.as_str())
                    && matches!(&*attr.value, Expr::Name(m) if module_aliases.contains(m.id.as_str()))
            }
            _ => false,
        };

        let mut cases: HashSet<&str> = order
            .iter()
            .filter(|class| bases(class).any(names_external_base))
            .map(|class| class.name.as_str())
            .collect();

        // Bases imported from sibling modules, parsed on demand.
        if let Some((import_root, module_path)) = location {
            let mut known: HashMap<&str, bool> = HashMap::new();
            for class in &order {
                if cases.contains(class.name.as_str()) {
                    continue;
                }
                let inherits_imported = bases(class).any(|base| {
                    let Expr::Name(name) = base else { return false };
                    let Some(&(from, level, original)) = imported.get(name.id.as_str()) else {
                        return false;
                    };
                    *known.entry(name.id.as_str()).or_insert_with(|| {
                        imported_base_is_case(import_root, module_path, from, level, original)
                    })
                });
                if inherits_imported {
                    cases.insert(class.name.as_str());
                }
            }
        }

        // Transitive closure over locally-defined bases.
        loop {
            let before = cases.len();
            for class in &order {
                if cases.contains(class.name.as_str()) {
                    continue;
                }
                let inherits_case = bases(class).any(|base| {
                    matches!(base, Expr::Name(name) if cases.contains(name.id.as_str()))
                });
                if inherits_case {
                    cases.insert(class.name.as_str());
                }
            }
            if cases.len() == before {
                break;
            }
        }

        Self {
            order,
            by_name,
            cases,
        }
    }

    /// Runnable test-case classes, in source order. Underscore-prefixed
    /// classes are internal bases and never yielded, though their methods
    /// still surface through subclasses.
    pub fn classes(&self) -> impl Iterator<Item = &'a StmtClassDef> {
        self.order.iter().copied().filter(move |class| {
            let name = class.name.as_str();
            self.cases.contains(name) && !name.starts_with('_')
        })
    }

    /// Method names of `class` starting with `prefix`, including those
    /// inherited from locally-defined base classes. Subclass definitions
    /// shadow base definitions of the same name.
    pub fn methods(&self, class: &'a StmtClassDef, prefix: &str) -> Vec<String> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut visited: HashSet<&str> = HashSet::new();
        let mut out: Vec<String> = Vec::new();
        visited.insert(class.name.as_str());
        self.collect_methods(class, prefix, &mut seen, &mut visited, &mut out);
        out
    }

    fn collect_methods(
        &self,
        class: &'a StmtClassDef,
        prefix: &str,
        seen: &mut HashSet<String>,
        visited: &mut HashSet<&'a str>,
        out: &mut Vec<String>,
    ) {
        for stmt in &class.body {
            if let Stmt::FunctionDef(func) = stmt {
                let name = func.name.as_str();
                if name.starts_with(prefix) && seen.insert(name.to_string()) {
                    out.push(name.to_string());
                }
            }
        }
        for base in bases(class) {
            if let Expr::Name(name) = base
                && let Some(base_class) = self.by_name.get(name.id.as_str())
                && visited.insert(base_class.name.as_str())
            {
                self.collect_methods(base_class, prefix, seen, visited, out);
            }
        }
    }
}

fn imported_base_is_case(
    import_root: &Path,
    module_path: &Path,
    from: Option<&str>,
    level: u32,
    class_name: &str,
) -> bool {
    let Some(path) = sibling_module_file(import_root, module_path, from, level) else {
        return false;
    };
    let Ok(source) = fs::read_to_string(&path) else {
        return false;
    };
    let Ok(parsed) = parse(&source, ParseOptions::from(Mode::Module)) else {
        return false;
    };
    match parsed.into_syntax() {
        Mod::Module(ast) => TestCaseCatalog::build(&ast).cases.contains(class_name),
        Mod::Expression(_) => false,
    }
}

/// Map an import statement back to a file. Absolute imports resolve from
/// `import_root`; relative ones climb from the importing module's directory.
fn sibling_module_file(
    import_root: &Path,
    module_path: &Path,
    from: Option<&str>,
    level: u32,
) -> Option<PathBuf> {
    let mut dir = if level == 0 {
        import_root.to_path_buf()
    } else {
        let mut dir = module_path.parent()?.to_path_buf();
        for _ in 1..level {
            dir = dir.parent()?.to_path_buf();
        }
        dir
    };
    for segment in from.iter().flat_map(|m| m.split('.')) {
        dir.push(segment);
    }
    let file = dir.with_extension("py");
    if file.is_file() {
        return Some(file);
    }
    let init = dir.join("__init__.py");
    init.is_file().then_some(init)
}

/// Class name matching: anchored case-insensitive prefix, or substring when
/// the pattern is glob-flagged. An empty pattern matches everything.
pub fn class_matches(pattern: &Pattern, class_name: &str) -> bool {
    let wanted = pattern.as_str().to_ascii_lowercase();
    if wanted.is_empty() {
        return true;
    }
    let have = class_name.to_ascii_lowercase();
    if pattern.is_glob() {
        have.contains(&wanted)
    } else {
        have.starts_with(&wanted)
    }
}

/// Method name matching. The method must carry the configured prefix; the
/// pattern then matches either the full name (when the user typed the prefix
/// themselves) or the part after `prefix` / `prefix_`.
pub fn method_matches(pattern: &Pattern, prefix: &str, method: &str) -> bool {
    let have = method.to_ascii_lowercase();
    let prefix = prefix.to_ascii_lowercase();
    if !have.starts_with(&prefix) {
        return false;
    }
    let wanted = pattern.as_str().to_ascii_lowercase();
    if wanted.is_empty() {
        return true;
    }
    if pattern.is_glob() {
        return have.contains(&wanted);
    }
    if have.starts_with(&wanted) {
        return true;
    }
    have.strip_prefix(&prefix)
        .map(|rest| rest.trim_start_matches('_'))
        .is_some_and(|rest| rest.starts_with(&wanted))
}
