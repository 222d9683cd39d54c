//! `gcov-diff` runs two tests over a gcov-instrumented build and reports which lines only one of them covers.
//!
//! Usage:
//!
//! ```sh
//! gcov-diff [options] <directory_path> <test1> <test2> <coverage_dest> <command> [command_arg]...
//! ```
//!
//! Each test is executed as `<command> <test> [command_arg]...` (or as `./<test>` when the command is `./`), the
//! `*.gcda` left behind are dumped through `gcov`, and the two coverage maps are compared. The report is written into
//! `<coverage_dest>/html/` and optionally `<coverage_dest>/json/`.

#![recursion_limit = "128"] // needed for error_chain.
#![allow(dangerous_implicit_autorefs)] // triggered inside clap 2.x `crate_authors!` expansion.

#[macro_use]
extern crate bitflags;
#[macro_use]
extern crate clap;
#[macro_use]
extern crate error_chain;
#[macro_use]
extern crate log;
extern crate covdiff;
extern crate env_logger;
extern crate open;
extern crate shell_escape;
extern crate termcolor;

#[macro_use]
mod ui;
mod argparse;
mod error;

use argparse::{DiffConfig, SummaryKinds, parse_args};
use error::{Result, ResultExt};

use covdiff::aggregate;
use covdiff::{GcovTool, Renderer, RunOutcome};
use shell_escape::escape;

use std::borrow::Cow;
use std::ffi::OsString;
use std::path::Path;
use std::process::exit;

/// Program entry. Calls [`run()`] and prints any error returned to `stderr`.
///
/// [`run()`]: ./fn.run.html
fn main() {
    if let Err(error) = run() {
        ui::print_error(&error).expect("error while printing error");
        exit(1);
    }
}

/// Runs the `gcov-diff` program.
fn run() -> Result<()> {
    let matches = parse_args();
    env_logger::init();
    debug!("matches = {:?}", matches);

    let config = DiffConfig::parse(&matches)?;
    let first = collect_run(&config, 1)?;
    let second = collect_run(&config, 2)?;

    if config.summaries.contains(SummaryKinds::CONSOLE) {
        ui::print_summary(&first)?;
        ui::print_summary(&second)?;
    }

    let renderer = Renderer::new(&config.dest) // @rustfmt-force-break
        .formats(config.formats)
        .jobs(config.jobs)
        .run_summaries(config.summaries.contains(SummaryKinds::MINI));
    let rendered = renderer.render(&first, &second)?;
    if let Some(ref index) = rendered.index {
        progress!("Rendered", "{} ({} pages)", index.display(), rendered.pages);
    }
    if let Some(ref json) = rendered.json {
        progress!("Rendered", "{}", json.display());
    }

    if config.open {
        open_report(rendered.index.as_ref().map(|p| &**p))?;
    }
    Ok(())
}

/// Executes test number `number` (1 or 2) and collects its coverage.
fn collect_run(config: &DiffConfig, number: usize) -> Result<RunOutcome> {
    let test = &config.tests[number - 1];
    progress!("Running", "{}", shell_line(&config.command.command_line(test)));

    let mut gcov = GcovTool::new(config.gcov.clone(), &config.dest);
    if config.keep_json {
        gcov = gcov.keep_json_in(config.dest.join("gcov-json").join(format!("run{}", number)));
    }

    let outcome = aggregate::run(&config.run, test, &config.command, &gcov).chain_err(|| format!("cannot collect the coverage of run {} (`{}`)", number, test))?;
    progress!(
        "Collected",
        "{} *.gcda, {} files covered by `{}`",
        outcome.summary.counter_files,
        outcome.summary.affected_files,
        test
    );
    Ok(outcome)
}

/// Joins a command line into something which can be pasted into a shell.
fn shell_line(args: &[OsString]) -> String {
    args.iter().map(|arg| escape(Cow::Owned(arg.to_string_lossy().into_owned())).into_owned()).collect::<Vec<_>>().join(" ")
}

fn open_report(index: Option<&Path>) -> Result<()> {
    if let Some(path) = index {
        progress!("Opening", "{}", path.display());
        let status = open::that(path)?;
        if !status.success() {
            warning!("failed to open report, result: {}", status);
        }
    } else {
        warning!("nothing to open");
    }
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_shell_line() {
    let args = vec![OsString::from("ctest"), "unit tests".into(), "-R".into()];
    assert_eq!(shell_line(&args), "ctest 'unit tests' -R");
}
