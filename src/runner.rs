//! Execution glue: hand resolved targets to `python -m unittest`.
//!
//! dowse never imports or runs Python in-process. Each target becomes one
//! interpreter subprocess, launched from the target's import root so the
//! dotted id is importable, with the child inheriting our stdio.

use std::process::Command;

use crate::error::Error;
use crate::loader::TestTarget;
use crate::session::Counts;

/// Run options, straight from the CLI.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Interpreter binary to invoke.
    pub python: String,
    /// Pass `-v` through to unittest.
    pub verbose: bool,
    /// Pass `-b` through to unittest (buffer output of passing tests).
    pub buffer: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            python: "python3".to_string(),
            verbose: false,
            buffer: false,
        }
    }
}

/// Outcome of one run across all targets.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub ran: usize,
    /// Ids of targets whose subprocess exited non-zero.
    pub failed: Vec<String>,
}

impl RunSummary {
    pub fn all_passed(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Run every target in order, one subprocess each.
///
/// The aggregate counts ride along on the child environment so test code
/// can tell a focused run from a run-everything sweep.
pub fn run(targets: &[TestTarget], counts: Counts, opts: &RunOptions) -> Result<RunSummary, Error> {
    let mut summary = RunSummary::default();

    for target in targets {
        let mut cmd = Command::new(&opts.python);
        cmd.args(["-m", "unittest"]);
        if opts.verbose {
            cmd.arg("-v");
        }
        if opts.buffer {
            cmd.arg("-b");
        }
        cmd.arg(target.id())
            .current_dir(&target.import_root)
            .env("DOWSE_TEST_COUNT", counts.total().to_string())
            .env("DOWSE_TEST_MODULE_COUNT", counts.modules.to_string())
            .env("DOWSE_TEST_CLASS_COUNT", counts.classes.to_string())
            .env("DOWSE_TEST_METHOD_COUNT", counts.methods.to_string());

        let status = cmd
            .status()
            .map_err(|e| Error::Interpreter(opts.python.clone(), e))?;
        summary.ran += 1;
        if !status.success() {
            summary.failed.push(target.id());
        }
    }

    Ok(summary)
}
