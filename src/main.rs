use std::path::PathBuf;

use clap::Parser;

use dowse::error::Error;
use dowse::rerun::RerunFile;
use dowse::runner::{self, RunOptions};
use dowse::report;
use dowse::session::{Counts, Session};

#[derive(Parser)]
#[command(
    name = "dowse",
    version,
    about = "Run Python unittest tests from fuzzy, partially-typed names"
)]
struct Cli {
    /// Test names: fuzzy `prefix.module.Class.method` fragments, a
    /// `module.path:Class.method` pair, or a literal `file.py:Class.method`
    names: Vec<String>,

    /// Base directory to search from
    #[arg(short = 'd', long = "dir", default_value = ".")]
    dir: PathBuf,

    /// Extra search root, relative to the base dir (repeatable; the
    /// DOWSE_PREFIX env var adds colon-separated roots)
    #[arg(long = "prefix")]
    prefix: Vec<PathBuf>,

    /// Prefix test methods must carry
    #[arg(long, default_value = "test")]
    method_prefix: String,

    /// List the resolved targets without running anything
    #[arg(long)]
    list: bool,

    /// With --list, emit JSON
    #[arg(long)]
    json: bool,

    /// Replay the failures recorded by the previous run
    #[arg(long)]
    rerun: bool,

    /// Pass -b through to unittest (buffer output of passing tests)
    #[arg(long)]
    buffer: bool,

    /// Pass -v through to unittest
    #[arg(short, long)]
    verbose: bool,

    /// Python interpreter to run tests with
    #[arg(long, default_value = "python3")]
    python: String,

    /// Trace resolution steps on stderr
    #[arg(long)]
    debug: bool,
}

fn main() {
    let cli = Cli::parse();
    std::process::exit(run(cli));
}

fn run(cli: Cli) -> i32 {
    let mut prefixes = cli.prefix.clone();
    if let Ok(extra) = std::env::var("DOWSE_PREFIX") {
        prefixes.extend(extra.split(':').filter(|p| !p.is_empty()).map(PathBuf::from));
    }

    let mut session = match Session::open(&cli.dir, &prefixes, &cli.method_prefix, cli.debug) {
        Ok(session) => session,
        Err(err) => return fail(&err),
    };

    let rerun_file = RerunFile::new();
    let names: Vec<String> = if cli.rerun {
        match rerun_file.read() {
            Ok(ids) if ids.is_empty() => {
                eprintln!("nothing to rerun: the previous run had no failures");
                return 0;
            }
            Ok(ids) => ids,
            Err(err) => return fail(&err),
        }
    } else {
        cli.names.clone()
    };

    let targets = match session.resolve_all(&names) {
        Ok(targets) => targets,
        Err(err) => return fail(&err),
    };
    let counts = Counts::tally(&targets);
    if cli.debug {
        eprintln!(
            "dowse: resolved {} targets ({} modules, {} classes, {} methods)",
            counts.total(),
            counts.modules,
            counts.classes,
            counts.methods
        );
    }

    if cli.list {
        if cli.json {
            report::print_targets_json(&targets, session.basedir());
        } else {
            report::print_targets(&targets, session.basedir());
        }
        return 0;
    }

    let opts = RunOptions {
        python: cli.python,
        verbose: cli.verbose,
        buffer: cli.buffer,
    };
    let summary = match runner::run(&targets, counts, &opts) {
        Ok(summary) => summary,
        Err(err) => return fail(&err),
    };

    // Record failures even on a clean run so a stale list never replays.
    if let Err(err) = rerun_file.write(&summary.failed) {
        eprintln!("warning: {err}");
    }

    if summary.all_passed() { 0 } else { 1 }
}

fn fail(err: &Error) -> i32 {
    eprintln!("error: {err}");
    if let Some(hint) = err.hint() {
        eprintln!("hint: {hint}");
    }
    err.exit_code()
}
