//! Command line argument parsing.

use covdiff::{Formats, RunConfig, Target, TestCommand};
use error::{ErrorKind, Result};

use clap::{App, AppSettings, ArgMatches};

use std::env::var_os;
use std::ffi::OsString;
use std::path::PathBuf;
use std::str::FromStr;

/// Default number of page rendering workers.
pub const DEFAULT_JOBS: usize = 4;

bitflags! {
    /// Where the summary of each run is shown.
    pub struct SummaryKinds: u8 {
        /// The summary block at the top of the index page.
        const MINI = 1;
        /// Printed to the terminal after both runs are collected.
        const CONSOLE = 2;
    }
}

#[derive(Debug)]
pub struct UnsupportedSummaryName;

impl SummaryKinds {
    /// Parses a list of summary kinds, e.g. the comma-separated parts of `--summary mini,console`.
    pub fn from_multi_str<'a, I>(strings: I) -> ::std::result::Result<SummaryKinds, UnsupportedSummaryName>
    where
        I: Iterator<Item = &'a str>,
    {
        let mut res = SummaryKinds::empty();
        for s in strings {
            res |= s.parse()?;
        }
        Ok(res)
    }
}

impl FromStr for SummaryKinds {
    type Err = UnsupportedSummaryName;
    fn from_str(s: &str) -> ::std::result::Result<SummaryKinds, UnsupportedSummaryName> {
        Ok(match s {
            "mini" => SummaryKinds::MINI,
            "console" => SummaryKinds::CONSOLE,
            _ => return Err(UnsupportedSummaryName),
        })
    }
}

/// Everything `gcov-diff` needs to know to compare two tests.
#[derive(Clone, Debug)]
pub struct DiffConfig {
    pub run: RunConfig,
    pub tests: [String; 2],
    /// The coverage destination directory.
    pub dest: PathBuf,
    pub command: TestCommand,
    pub formats: Formats,
    pub summaries: SummaryKinds,
    pub jobs: usize,
    /// The `gcov` executable.
    pub gcov: OsString,
    pub keep_json: bool,
    pub open: bool,
}

impl DiffConfig {
    pub fn parse(matches: &ArgMatches) -> Result<DiffConfig> {
        let directory_path = matches.value_of_os("directory_path").unwrap_or_default();
        let mut run = RunConfig::new(directory_path)?;

        let source_file = matches.value_of_os("source_file").map(PathBuf::from);
        let object_path = matches.value_of_os("object_path").map(PathBuf::from);
        match (source_file, object_path) {
            (Some(source_file), object_path) => {
                run = run.with_target(Target { source_file, object_path });
            },
            (None, Some(_)) => bail!(ErrorKind::ObjectPathWithoutSourceFile),
            (None, None) => {},
        }

        let formats = match matches.values_of("format") {
            Some(values) => {
                let values = values.collect::<Vec<_>>();
                Formats::from_multi_str(values.iter().cloned()).map_err(|_| ErrorKind::UnsupportedName("--format", values.join(",")))?
            },
            None => Formats::HTML,
        };
        let summaries = match matches.values_of("summary") {
            Some(values) => {
                let values = values.collect::<Vec<_>>();
                SummaryKinds::from_multi_str(values.iter().cloned()).map_err(|_| ErrorKind::UnsupportedName("--summary", values.join(",")))?
            },
            None => SummaryKinds::MINI,
        };
        let jobs = match matches.value_of("jobs") {
            Some(jobs) => match jobs.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => bail!(ErrorKind::InvalidJobs(jobs.to_owned())),
            },
            None => DEFAULT_JOBS,
        };

        let gcov = matches
            .value_of_os("gcov")
            .map(OsString::from)
            .or_else(|| var_os("GCOV"))
            .unwrap_or_else(|| OsString::from("gcov"));

        // The first value is the program, anything after it (including flags) goes to the program.
        let mut command = matches.values_of_os("command").unwrap_or_default();
        let command_program = command.next().unwrap_or_default();

        Ok(DiffConfig {
            run,
            tests: [
                matches.value_of_lossy("test1").unwrap_or_default().into_owned(),
                matches.value_of_lossy("test2").unwrap_or_default().into_owned(),
            ],
            dest: matches.value_of_os("coverage_dest").map(PathBuf::from).unwrap_or_default(),
            command: TestCommand::new(command_program, command),
            formats,
            summaries,
            jobs,
            gcov,
            keep_json: matches.is_present("keep_json"),
            open: matches.is_present("open"),
        })
    }
}

/// Builds the `clap` application of `gcov-diff`.
pub fn app() -> App<'static, 'static> {
    clap_app!(("gcov-diff") =>
        (author: crate_authors!(", "))
        (about: crate_description!())
        (version: crate_version!())
        (@setting DeriveDisplayOrder)
        (@setting ArgRequiredElseHelp)
        (@setting TrailingVarArg)
        (@arg source_file: --("source-file") [PATH] "Restrict the report to one source file")
        (@arg object_path: --("object-path") [PATH] requires[source_file] "Directory holding the *.gcda and *.gcno of the source file")
        (@arg format: --format [FORMATS]... +use_delimiter +require_delimiter possible_values(&["html", "json", "all"]) "Report formats, default to 'html'")
        (@arg summary: --summary [TYPES]... +use_delimiter +require_delimiter possible_values(&["mini", "console"]) "Where to show the run summaries, default to 'mini'")
        (@arg jobs: --jobs -j [N] "Number of page rendering workers, default to 4")
        (@arg gcov: --gcov [PATH] "The gcov executable, default to $GCOV or 'gcov'")
        (@arg keep_json: --("keep-json") "Keep the uncompressed gcov JSON reports in <coverage_dest>/gcov-json/")
        (@arg open: --open "Open the report in browser after it is generated")
        (@arg directory_path: +required "The project directory containing the *.gcda and *.gcno files")
        (@arg test1: +required "The first test")
        (@arg test2: +required "The second test")
        (@arg coverage_dest: +required "The directory to store the generated report")
        (@arg command: +required ... +allow_hyphen_values "The command running a test followed by its arguments, or './' if the tests are executables")
    )
}

/// Parses the command line arguments using `clap`.
pub fn parse_args() -> ArgMatches<'static> {
    app().setting(AppSettings::ColoredHelp).get_matches()
}

#[cfg(test)]
fn parse_from(args: &[&str]) -> ::clap::Result<ArgMatches<'static>> {
    app().get_matches_from_safe(args.iter().cloned())
}

#[test]
fn test_parse_summary_kinds() {
    assert_eq!(SummaryKinds::from_multi_str("mini".split(',')).unwrap(), SummaryKinds::MINI);
    assert_eq!(SummaryKinds::from_multi_str("console,mini".split(',')).unwrap(), SummaryKinds::all());
    assert!(SummaryKinds::from_multi_str("mini,full".split(',')).is_err());
}

#[test]
fn test_parse_trailing_command_args() {
    let matches = parse_from(&["gcov-diff", "-j", "2", "--format", "html,json", "/", "t1", "t2", "out", "ctest", "-R", "--output-on-failure", "-j", "8"]).unwrap();
    let config = DiffConfig::parse(&matches).unwrap();
    assert_eq!(config.tests, ["t1".to_owned(), "t2".to_owned()]);
    assert_eq!(config.dest, PathBuf::from("out"));
    assert_eq!(config.jobs, 2);
    assert_eq!(config.formats, Formats::HTML | Formats::JSON);
    assert_eq!(config.summaries, SummaryKinds::MINI);
    assert_eq!(config.run.target, None);
    assert_eq!(config.command.command_line("t1"), vec![OsString::from("ctest"), "t1".into(), "-R".into(), "--output-on-failure".into(), "-j".into(), "8".into()]);
}

#[test]
fn test_parse_target() {
    use std::path::Path;

    let matches = parse_from(&["gcov-diff", "--source-file", "src/main.c", "--object-path", "/", "/", "t1", "t2", "out", "./"]).unwrap();
    let config = DiffConfig::parse(&matches).unwrap();
    assert_eq!(config.run.source_file(), Some(Path::new("src/main.c")));
    assert_eq!(config.run.object_path(), Some(Path::new("/")));
}

#[test]
fn test_reject_object_path_alone() {
    assert!(parse_from(&["gcov-diff", "--object-path", "/", "/", "t1", "t2", "out", "./"]).is_err());
}

#[test]
fn test_reject_zero_jobs() {
    let matches = parse_from(&["gcov-diff", "-j", "0", "/", "t1", "t2", "out", "./"]).unwrap();
    match *DiffConfig::parse(&matches).unwrap_err().kind() {
        ErrorKind::InvalidJobs(ref value) => assert_eq!(value, "0"),
        ref k => panic!("unexpected error kind {:?}", k),
    }
}
