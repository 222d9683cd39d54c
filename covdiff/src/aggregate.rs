//! Collection of the coverage of one test run over the whole project.
//!
//! A run goes through these steps:
//!
//! 1. Every stale `*.gcda` in the project is deleted, otherwise counters of an earlier execution would be counted
//!    again.
//! 2. The test is executed through a [`TestRunner`].
//! 3. All `*.gcda` are located and checked to have a `*.gcno` next to them. The check covers every artifact before the
//!    first one is dumped, so an inconsistent build tree aborts the run without merging anything.
//! 4. Each `*.gcda` is converted to JSON by a [`CounterDump`] and merged into a [`CoverageMap`].
//! 5. A [`RunSummary`] is computed from the final map.
//!
//! [`TestRunner`]: ../tool/trait.TestRunner.html
//! [`CounterDump`]: ../tool/trait.CounterDump.html
//! [`CoverageMap`]: ../record/struct.CoverageMap.html
//! [`RunSummary`]: ../summary/struct.RunSummary.html

use error::{ErrorKind, Result, ResultExt};
use gcov::{GcovReport, ParseOptions};
use record::CoverageMap;
use summary::RunSummary;
use tool::{CounterDump, TestRunner};
use utils::file_name_lossy;

use walkdir::WalkDir;

use std::ffi::OsStr;
use std::fs::{canonicalize, remove_file};
use std::path::{Path, PathBuf};

/// Restricts a run to a single source file.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Target {
    /// Only this source file is materialized in the coverage map.
    pub source_file: PathBuf,
    /// Directory containing the `*.gcda` of the source file. When given, the project is not scanned.
    pub object_path: Option<PathBuf>,
}

/// Where and what to collect.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct RunConfig {
    /// Canonical path to the project (build) directory.
    pub project_dir: PathBuf,
    pub target: Option<Target>,
}

impl RunConfig {
    /// Creates a configuration scanning the whole project directory.
    pub fn new<P: AsRef<Path>>(project_dir: P) -> Result<RunConfig> {
        let project_dir = project_dir.as_ref();
        let project_dir = canonicalize(project_dir).chain_err(|| format!("cannot find project directory `{}`", project_dir.display()))?;
        Ok(RunConfig {
            project_dir,
            target: None,
        })
    }

    pub fn with_target(mut self, target: Target) -> RunConfig {
        self.target = Some(target);
        self
    }

    pub fn source_file(&self) -> Option<&Path> {
        self.target.as_ref().map(|t| &*t.source_file)
    }

    /// The object directory, if only one `*.gcda` is to be inspected.
    pub fn object_path(&self) -> Option<&Path> {
        self.target.as_ref().and_then(|t| t.object_path.as_ref()).map(|p| &**p)
    }

    fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            project_dir: &self.project_dir,
            source_file: self.source_file(),
        }
    }
}

/// A `*.gcda` together with its `*.gcno`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Artifact {
    pub gcda: PathBuf,
    pub gcno: PathBuf,
}

impl Artifact {
    /// Pairs a `*.gcda` with its `*.gcno`, failing if the latter does not exist.
    pub fn locate(gcda: PathBuf) -> Result<Artifact> {
        let gcno = gcda.with_extension("gcno");
        ensure!(gcno.is_file(), ErrorKind::MissingCompanion(gcno, gcda));
        Ok(Artifact { gcda, gcno })
    }
}

fn is_gcda(path: &Path) -> bool {
    path.extension() == Some(OsStr::new("gcda"))
}

/// Deletes every `*.gcda` under the project directory. Returns the number of files removed.
pub fn clear_counter_data(project_dir: &Path) -> Result<usize> {
    let mut removed = 0;
    for entry in WalkDir::new(project_dir) {
        let entry = entry?;
        if entry.file_type().is_file() && is_gcda(entry.path()) {
            trace!("rm {:?}", entry.path());
            remove_file(entry.path()).chain_err(|| format!("cannot remove `{}`", entry.path().display()))?;
            removed += 1;
        }
    }
    debug!("removed {} stale *.gcda from {:?}", removed, project_dir);
    Ok(removed)
}

/// Finds the `*.gcda` files to inspect, paired with their `*.gcno`.
///
/// With an object path, only `«object path»/«stem».gcda` and `«object path»/«file name».gcda` are probed, in this
/// order. Otherwise the project directory is walked without following symlinks.
pub fn discover_artifacts(config: &RunConfig) -> Result<Vec<Artifact>> {
    if let (Some(source_file), Some(object_path)) = (config.source_file(), config.object_path()) {
        let file_name = file_name_lossy(source_file);
        let stem = source_file.file_stem().map_or_else(|| file_name.clone(), |s| s.to_string_lossy().into_owned());
        let candidates = [object_path.join(format!("{}.gcda", stem)), object_path.join(format!("{}.gcda", file_name))];
        let gcda = candidates.iter().find(|p| p.is_file()).ok_or_else(|| ErrorKind::MissingCounterData(object_path.to_owned(), source_file.to_owned()))?;
        debug!("found targeted {:?}", gcda);
        return Ok(vec![Artifact::locate(gcda.clone())?]);
    }

    let mut artifacts = Vec::new();
    let walker = WalkDir::new(&config.project_dir).follow_links(false).sort_by(|a, b| a.file_name().cmp(b.file_name()));
    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_file() && is_gcda(entry.path()) {
            debug!("found {:?}", entry.path());
            artifacts.push(Artifact::locate(entry.into_path())?);
        }
    }
    Ok(artifacts)
}

/// Merges the parsed reports of one run.
#[derive(Debug)]
pub struct Aggregator<'a> {
    options: ParseOptions<'a>,
    single_artifact: bool,
    coverage: CoverageMap,
    counter_files: usize,
    processed_names: Vec<String>,
}

impl<'a> Aggregator<'a> {
    pub fn new(config: &'a RunConfig) -> Aggregator<'a> {
        Aggregator {
            options: config.parse_options(),
            single_artifact: config.object_path().is_some(),
            coverage: CoverageMap::new(),
            counter_files: 0,
            processed_names: Vec::new(),
        }
    }

    /// Merges the report of one `*.gcda`.
    pub fn ingest(&mut self, report: &GcovReport) {
        let parsed = self.options.parse(report);
        for record in parsed.records {
            self.coverage.merge(record);
        }
        self.processed_names.extend(parsed.processed_names);
        self.counter_files += 1;
    }

    /// Drops the files which were never executed and summarizes the run.
    pub fn finish(mut self) -> (CoverageMap, RunSummary) {
        self.coverage.retain_covered();
        let summary = RunSummary::new(self.counter_files, &self.processed_names[..], &self.coverage, self.single_artifact);
        (self.coverage, summary)
    }
}

/// Dumps and merges every `*.gcda` currently in the project.
pub fn collect<D: CounterDump + ?Sized>(config: &RunConfig, dump: &D) -> Result<(CoverageMap, RunSummary)> {
    let artifacts = discover_artifacts(config)?;
    let mut aggregator = Aggregator::new(config);
    for artifact in &artifacts {
        let report = dump.dump(&artifact.gcda).chain_err(|| format!("cannot dump `{}`", artifact.gcda.display()))?;
        aggregator.ingest(&report);
    }
    Ok(aggregator.finish())
}

/// Coverage of one test.
#[derive(Clone, Debug)]
pub struct RunOutcome {
    pub test: String,
    pub coverage: CoverageMap,
    pub summary: RunSummary,
}

/// Clears stale counters, runs the test and collects its coverage.
pub fn run<R, D>(config: &RunConfig, test: &str, runner: &R, dump: &D) -> Result<RunOutcome>
where
    R: TestRunner + ?Sized,
    D: CounterDump + ?Sized,
{
    clear_counter_data(&config.project_dir)?;
    runner.run_test(test)?;
    let (coverage, summary) = collect(config, dump)?;
    Ok(RunOutcome {
        test: test.to_owned(),
        coverage,
        summary,
    })
}

#[cfg(test)]
fn report(json: &str) -> GcovReport {
    GcovReport::from_reader(json.as_bytes(), Path::new("test.json")).unwrap()
}

#[test]
fn test_ingest_same_report_twice_doubles_counts() {
    let config = RunConfig {
        project_dir: PathBuf::from("/w"),
        target: None,
    };
    let r = report(r#"{"files": [{"file": "a.c", "lines": [{"line_number": 1, "count": 3}, {"line_number": 2, "count": 0}], "functions": [{"name": "f", "execution_count": 2}]}]}"#);

    let mut aggregator = Aggregator::new(&config);
    aggregator.ingest(&r);
    aggregator.ingest(&r);
    let (map, summary) = aggregator.finish();

    let record = map.get(Path::new("/w/a.c")).unwrap();
    assert_eq!(record.line_hits(1), Some(6));
    assert_eq!(record.line_hits(2), Some(0));
    assert_eq!(record.function_hit_count()["f"], 4);
    assert_eq!(summary.counter_files, 2);
    assert_eq!(summary.processed_reports, 2);
    assert_eq!(summary.processed_unique_files, Some(1));
}

#[test]
fn test_uncovered_header_entries_still_contribute_lines_of_interest() {
    let config = RunConfig {
        project_dir: PathBuf::from("/w"),
        target: None,
    };
    let first = report(r#"{"files": [{"file": "u.h", "lines": [{"line_number": 4, "count": 0}, {"line_number": 9, "count": 0}], "functions": []}]}"#);
    let second = report(r#"{"files": [{"file": "u.h", "lines": [{"line_number": 4, "count": 1}], "functions": []}, {"file": "never.h", "lines": [{"line_number": 1, "count": 0}], "functions": []}]}"#);

    let mut aggregator = Aggregator::new(&config);
    aggregator.ingest(&first);
    aggregator.ingest(&second);
    let (map, summary) = aggregator.finish();

    assert_eq!(map.len(), 1);
    let header = map.get(Path::new("/w/u.h")).unwrap();
    assert_eq!(header.lines_of_interest().collect::<Vec<_>>(), vec![4, 9]);
    assert_eq!(header.percentage(), 50.0);
    assert_eq!(summary.affected_files, 1);
    assert_eq!(summary.processed_unique_files, Some(2));
}

#[test]
fn test_discover_requires_companion() {
    extern crate tempfile;
    use std::fs::{File, create_dir_all};

    let dir = tempfile::tempdir().unwrap();
    create_dir_all(dir.path().join("obj")).unwrap();
    File::create(dir.path().join("obj/a.gcda")).unwrap();
    File::create(dir.path().join("obj/a.gcno")).unwrap();
    File::create(dir.path().join("obj/b.gcda")).unwrap();

    let config = RunConfig::new(dir.path()).unwrap();
    let err = discover_artifacts(&config).unwrap_err();
    match *err.kind() {
        ErrorKind::MissingCompanion(ref gcno, ref gcda) => {
            assert_eq!(gcno, &config.project_dir.join("obj/b.gcno"));
            assert_eq!(gcda, &config.project_dir.join("obj/b.gcda"));
        },
        ref k => panic!("unexpected error kind {:?}", k),
    }

    File::create(dir.path().join("obj/b.gcno")).unwrap();
    let artifacts = discover_artifacts(&config).unwrap();
    assert_eq!(artifacts.len(), 2);
    assert_eq!(artifacts[0].gcda, config.project_dir.join("obj/a.gcda"));
    assert_eq!(artifacts[1].gcno, config.project_dir.join("obj/b.gcno"));

    assert_eq!(clear_counter_data(&config.project_dir).unwrap(), 2);
    assert!(discover_artifacts(&config).unwrap().is_empty());
}

#[test]
fn test_discover_targeted_probes_stem_then_file_name() {
    extern crate tempfile;
    use std::fs::File;

    let dir = tempfile::tempdir().unwrap();
    let obj = dir.path().join("obj");
    ::std::fs::create_dir(&obj).unwrap();

    let config = RunConfig::new(dir.path()).unwrap().with_target(Target {
        source_file: PathBuf::from("src/main.c"),
        object_path: Some(obj.clone()),
    });
    match *discover_artifacts(&config).unwrap_err().kind() {
        ErrorKind::MissingCounterData(ref o, ref s) => {
            assert_eq!(o, &obj);
            assert_eq!(s, Path::new("src/main.c"));
        },
        ref k => panic!("unexpected error kind {:?}", k),
    }

    File::create(obj.join("main.c.gcda")).unwrap();
    File::create(obj.join("main.c.gcno")).unwrap();
    assert_eq!(discover_artifacts(&config).unwrap()[0].gcda, obj.join("main.c.gcda"));

    File::create(obj.join("main.gcda")).unwrap();
    File::create(obj.join("main.gcno")).unwrap();
    assert_eq!(discover_artifacts(&config).unwrap(), vec![Artifact { gcda: obj.join("main.gcda"), gcno: obj.join("main.gcno") }]);
}
