//! Output formatting for `--list`: plain text and JSON target listings.

use std::path::Path;

use serde::Serialize;

use crate::loader::TestTarget;
use crate::session::Counts;

fn relative_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}

/// One target per line: the runnable id, then the source file. The count
/// summary goes to stderr so the id column stays pipeable.
pub fn print_targets(targets: &[TestTarget], root: &Path) {
    for target in targets {
        println!("{}  {}", target.id(), relative_path(&target.path, root));
    }
    let counts = Counts::tally(targets);
    eprintln!(
        "found {} targets ({} modules, {} classes, {} methods)",
        counts.total(),
        counts.modules,
        counts.classes,
        counts.methods
    );
}

#[derive(Serialize)]
struct JsonTarget<'a> {
    id: String,
    module: &'a str,
    class: Option<&'a str>,
    method: Option<&'a str>,
    path: String,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    targets: Vec<JsonTarget<'a>>,
    modules: usize,
    classes: usize,
    methods: usize,
}

pub fn print_targets_json(targets: &[TestTarget], root: &Path) {
    let counts = Counts::tally(targets);
    let json = JsonReport {
        targets: targets
            .iter()
            .map(|t| JsonTarget {
                id: t.id(),
                module: &t.module,
                class: t.class_name.as_deref(),
                method: t.method_name.as_deref(),
                path: relative_path(&t.path, root),
            })
            .collect(),
        modules: counts.modules,
        classes: counts.classes,
        methods: counts.methods,
    };
    println!("{}", serde_json::to_string_pretty(&json).unwrap());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn relative_path_strips_the_root() {
        let root = Path::new("/proj");
        assert_eq!(
            relative_path(Path::new("/proj/pkg/foo_test.py"), root),
            "pkg/foo_test.py"
        );
        assert_eq!(
            relative_path(Path::new("/elsewhere/x.py"), root),
            "/elsewhere/x.py"
        );
    }

    #[test]
    fn json_report_shape() {
        let target = TestTarget {
            module: "pkg.foo_test".to_string(),
            path: PathBuf::from("/proj/pkg/foo_test.py"),
            import_root: PathBuf::from("/proj"),
            class_name: Some("BarTest".to_string()),
            method_name: None,
        };
        let counts = Counts::tally(std::slice::from_ref(&target));
        let json = JsonReport {
            targets: vec![JsonTarget {
                id: target.id(),
                module: &target.module,
                class: target.class_name.as_deref(),
                method: None,
                path: relative_path(&target.path, Path::new("/proj")),
            }],
            modules: counts.modules,
            classes: counts.classes,
            methods: counts.methods,
        };
        let text = serde_json::to_string(&json).unwrap();
        assert!(text.contains("\"pkg.foo_test.BarTest\""));
        assert!(text.contains("\"classes\":1"));
    }
}
