extern crate covdiff;
extern crate diff;
extern crate serde_json;
extern crate termcolor;

use covdiff::{Aggregator, GcovReport, ProjectDiff, Result, RunConfig, RunOutcome};
use covdiff::render::JsonReport;
use serde_json::{Value, from_reader, to_string_pretty, to_value};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use std::ffi::OsStr;
use std::fs::{File, read_dir};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::exit;

fn main() {
    run().expect("IO");
}

fn run() -> io::Result<()> {
    let mut failed_tests = 0;

    let stdout = StandardStream::stdout(ColorChoice::Auto);
    let mut lock = stdout.lock();

    let mut cases = Vec::new();
    for entry in read_dir("test-data")? {
        let entry = entry?;
        let path = entry.path();
        if path.extension() == Some(OsStr::new("diff")) && entry.file_type()?.is_dir() {
            cases.push(path);
        }
    }
    cases.sort();

    for path in cases {
        write!(lock, "test {} ... ", path.display())?;
        lock.flush()?;
        if !print_test_result(&mut lock, test(&path))? {
            failed_tests += 1;
        }
    }

    if failed_tests != 0 {
        writeln!(lock, "\ntest result: {} failed.\n", failed_tests)?;
        exit(101);
    } else {
        writeln!(lock, "\ntest result: ok.\n")?;
    }

    Ok(())
}

/// Merges every `*.json` report of `run_dir` as one run over the project `/project`.
fn collect_run(config: &RunConfig, run_dir: &Path) -> Result<RunOutcome> {
    let mut reports = read_dir(run_dir)?.map(|e| e.map(|e| e.path())).collect::<io::Result<Vec<PathBuf>>>()?;
    reports.retain(|p| p.extension() == Some(OsStr::new("json")));
    reports.sort();

    let mut aggregator = Aggregator::new(config);
    for path in &reports {
        aggregator.ingest(&GcovReport::from_reader(File::open(path)?, path)?);
    }
    let (coverage, summary) = aggregator.finish();
    let test = run_dir.file_name().map_or_else(String::new, |s| s.to_string_lossy().into_owned());
    Ok(RunOutcome { test, coverage, summary })
}

fn test(path: &Path) -> Result<(Value, Value)> {
    let config = RunConfig {
        project_dir: PathBuf::from("/project"),
        target: None,
    };
    let first = collect_run(&config, &path.join("run1"))?;
    let second = collect_run(&config, &path.join("run2"))?;

    let diff = ProjectDiff::new(&first.coverage, &second.coverage);
    let actual = to_value(JsonReport::new(&diff, &first, &second))?;
    let expected = from_reader(File::open(path.join("expected.json"))?)?;
    Ok((actual, expected))
}

fn print_test_result<W: Write + WriteColor>(mut lock: W, result: Result<(Value, Value)>) -> io::Result<bool> {
    Ok(match result {
        Ok((actual, expected)) => {
            let success = actual == expected;
            if success {
                lock.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
                writeln!(lock, "ok")?;
            } else {
                lock.set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
                writeln!(lock, "FAILED")?;
                let actual = to_string_pretty(&actual).expect("JSON");
                let expected = to_string_pretty(&expected).expect("JSON");
                for d in diff::lines(&actual, &expected) {
                    let (color, prefix, line) = match d {
                        diff::Result::Left(line) => (Color::Green, '+', line),
                        diff::Result::Both(line, _) => (Color::White, ' ', line),
                        diff::Result::Right(line) => (Color::Red, '-', line),
                    };
                    lock.set_color(ColorSpec::new().set_fg(Some(color)))?;
                    writeln!(lock, "{} {}", prefix, line)?;
                }
                writeln!(lock)?;
            }
            lock.reset()?;
            success
        },
        Err(e) => {
            lock.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)))?;
            writeln!(lock, "ERRORED")?;
            lock.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_intense(true).set_bold(true))?;
            write!(lock, "error: ")?;
            lock.reset()?;
            writeln!(lock, "{}\n", e)?;
            false
        },
    })
}
