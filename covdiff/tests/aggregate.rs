extern crate covdiff;
#[macro_use]
extern crate serde_json;
extern crate tempfile;

use covdiff::*;
use covdiff::aggregate::run;

use std::cell::Cell;
use std::collections::BTreeSet;
use std::fs::{File, create_dir_all, read_dir, read_to_string};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Pretends to be an instrumented test: writes the `*.gcda` of each test into the project. The content of a `*.gcda`
/// is the JSON report `gcov` would produce for it.
struct FakeTests {
    project_dir: PathBuf,
    runs: Vec<(&'static str, Vec<(&'static str, &'static str)>)>,
}

impl TestRunner for FakeTests {
    fn run_test(&self, test: &str) -> covdiff::Result<()> {
        let &(_, ref gcdas) = self.runs.iter().find(|r| r.0 == test).ok_or("unknown test")?;
        for &(gcda, json) in gcdas {
            let path = self.project_dir.join(gcda);
            File::create(path)?.write_all(json.as_bytes())?;
        }
        Ok(())
    }
}

/// Decodes the `*.gcda` written by `FakeTests`.
#[derive(Default)]
struct FakeDump {
    calls: Cell<usize>,
}

impl CounterDump for FakeDump {
    fn dump(&self, gcda: &Path) -> covdiff::Result<GcovReport> {
        self.calls.set(self.calls.get() + 1);
        GcovReport::from_reader(File::open(gcda)?, gcda)
    }
}

const MAIN_C: &str = "#include \"util.h\"
int main(void) {
    if (twice(1) < 0)
        return 1;
    return helper();
}
";

const T1_MAIN: &str = r#"{"files": [
    {"file": "src/main.c", "lines": [{"line_number": 2, "count": 1}, {"line_number": 3, "count": 1}, {"line_number": 5, "count": 0}],
     "functions": [{"name": "main", "execution_count": 1}]},
    {"file": "include/util.h", "lines": [{"line_number": 1, "count": 1}], "functions": []},
    {"file": "src/util.h", "lines": [{"line_number": 2, "count": 0}], "functions": []}
]}"#;

const T1_UTIL: &str = r#"{"files": [
    {"file": "src/util.h", "lines": [{"line_number": 2, "count": 2}], "functions": []},
    {"file": "gen/missing.c", "lines": [{"line_number": 1, "count": 1}], "functions": []}
]}"#;

const T2_MAIN: &str = r#"{"files": [
    {"file": "src/main.c", "lines": [{"line_number": 2, "count": 1}, {"line_number": 3, "count": 0}, {"line_number": 5, "count": 1}],
     "functions": [{"name": "main", "execution_count": 1}]},
    {"file": "include/util.h", "lines": [{"line_number": 1, "count": 0}], "functions": []},
    {"file": "src/util.h", "lines": [{"line_number": 2, "count": 1}], "functions": []}
]}"#;

fn setup_project(root: &Path) -> PathBuf {
    let project_dir = root.join("project");
    for dir in &["src", "include", "obj"] {
        create_dir_all(project_dir.join(dir)).unwrap();
    }
    File::create(project_dir.join("src/main.c")).unwrap().write_all(MAIN_C.as_bytes()).unwrap();
    File::create(project_dir.join("src/util.h")).unwrap().write_all(b"#pragma once\nstatic int helper(void) { return 0; }\n").unwrap();
    File::create(project_dir.join("include/util.h")).unwrap().write_all(b"static int twice(int x) { return x * 2; }\n").unwrap();
    File::create(project_dir.join("obj/main.gcno")).unwrap();
    File::create(project_dir.join("obj/util.gcno")).unwrap();
    project_dir
}

fn fake_tests(project_dir: &Path) -> FakeTests {
    FakeTests {
        project_dir: project_dir.to_owned(),
        runs: vec![
            ("t1", vec![("obj/main.gcda", T1_MAIN), ("obj/util.gcda", T1_UTIL)]),
            ("t2", vec![("obj/main.gcda", T2_MAIN)]),
        ],
    }
}

#[test]
fn test_full_report() {
    let root = tempfile::tempdir().unwrap();
    let project_dir = setup_project(root.path());
    let config = RunConfig::new(&project_dir).unwrap();
    let tests = fake_tests(&config.project_dir);
    let dump = FakeDump::default();

    let first = run(&config, "t1", &tests, &dump).unwrap();
    let second = run(&config, "t2", &tests, &dump).unwrap();
    assert_eq!(dump.calls.get(), 3);

    assert_eq!(first.summary.counter_files, 2);
    assert_eq!(first.summary.processed_reports, 5);
    assert_eq!(first.summary.affected_files, 4);
    assert_eq!(first.summary.processed_unique_files, Some(4));
    assert_eq!(second.summary.counter_files, 1);
    assert_eq!(second.summary.processed_reports, 3);
    assert_eq!(second.summary.affected_files, 2);
    assert_eq!(second.summary.processed_unique_files, Some(3));

    let main_c = config.project_dir.join("src/main.c");
    assert_eq!(first.coverage.get(&main_c).unwrap().covered_lines().iter().cloned().collect::<Vec<_>>(), vec![2, 3]);
    assert_eq!(second.coverage.get(&main_c).unwrap().covered_lines().iter().cloned().collect::<Vec<_>>(), vec![2, 5]);
    assert!(!second.coverage.contains(&config.project_dir.join("include/util.h")));

    let dest = root.path().join("coverage");
    let renderer = Renderer::new(&dest).formats(Formats::HTML | Formats::JSON).jobs(3);
    let rendered = renderer.render(&first, &second).unwrap();
    assert_eq!(rendered.pages, 4);
    assert_eq!(rendered.index, Some(dest.join("html/CodeCoverage.html")));
    assert_eq!(rendered.json, Some(dest.join("json/covdiff.json")));
    assert!(dest.join("html/Style/style.css").is_file());
    assert!(dest.join("html/Javascript/report.js").is_file());

    let pages = read_dir(dest.join("html/Pages"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect::<BTreeSet<_>>();
    let expected_pages = ["main.c.html", "missing.c.html", "util.h.html", "util.h_1.html"].iter().map(|s| s.to_string()).collect::<BTreeSet<_>>();
    assert_eq!(pages, expected_pages);

    let index = read_to_string(dest.join("html/CodeCoverage.html")).unwrap();
    for page in &expected_pages {
        assert!(index.contains(&format!("href=\"Pages/{}\"", page)), "index does not link to {}", page);
    }
    assert!(index.contains("0.000 %"));
    assert!(index.contains("66.667 %"));
    assert!(index.contains("Number of processed unique files (including files with 0% coverage): 4"));

    // `include/util.h` sorts before `src/util.h`, so it always owns the unsuffixed page.
    assert!(index.find("Pages/util.h.html").unwrap() < index.find("Pages/util.h_1.html").unwrap());
    assert!(read_to_string(dest.join("html/Pages/util.h.html")).unwrap().contains("static int twice(int x)"));
    assert!(read_to_string(dest.join("html/Pages/util.h_1.html")).unwrap().contains("static int helper(void)"));

    let missing = read_to_string(dest.join("html/Pages/missing.c.html")).unwrap();
    assert!(missing.contains("could not be read"));
    let main_page = read_to_string(dest.join("html/Pages/main.c.html")).unwrap();
    assert!(main_page.contains("if (twice(1) &lt; 0)"));
    assert!(main_page.contains("diffFirst"));
    assert!(main_page.contains("diffSecond"));

    let json: serde_json::Value = serde_json::from_reader(File::open(dest.join("json/covdiff.json")).unwrap()).unwrap();
    assert_eq!(json["tests"], json!(["t1", "t2"]));
    assert_eq!(json["files"].as_array().unwrap().len(), 4);

    match *renderer.render(&first, &second).unwrap_err().kind() {
        ErrorKind::OutputDirectoryExists(ref p) => assert_eq!(p, &dest.join("html")),
        ref k => panic!("unexpected error kind {:?}", k),
    }
}

#[test]
fn test_targeted_run() {
    let root = tempfile::tempdir().unwrap();
    let project_dir = setup_project(root.path());
    let config = RunConfig::new(&project_dir).unwrap();
    let config = config.clone().with_target(Target {
        source_file: PathBuf::from("src/main.c"),
        object_path: Some(config.project_dir.join("obj")),
    });
    let tests = fake_tests(&config.project_dir);
    let dump = FakeDump::default();

    let outcome = run(&config, "t1", &tests, &dump).unwrap();
    assert_eq!(dump.calls.get(), 1);
    assert_eq!(outcome.coverage.len(), 1);
    assert!(outcome.coverage.contains(&config.project_dir.join("src/main.c")));
    assert_eq!(outcome.summary.counter_files, 1);
    assert_eq!(outcome.summary.processed_reports, 3);
    assert_eq!(outcome.summary.processed_unique_files, None);
}

#[test]
fn test_missing_companion_aborts_before_merging() {
    let root = tempfile::tempdir().unwrap();
    let project_dir = setup_project(root.path());
    let config = RunConfig::new(&project_dir).unwrap();
    let mut tests = fake_tests(&config.project_dir);
    tests.runs.push(("t3", vec![("obj/main.gcda", T1_MAIN), ("obj/orphan.gcda", T1_UTIL)]));
    let dump = FakeDump::default();

    let err = run(&config, "t3", &tests, &dump).unwrap_err();
    match *err.kind() {
        ErrorKind::MissingCompanion(ref gcno, ref gcda) => {
            assert_eq!(gcno, &config.project_dir.join("obj/orphan.gcno"));
            assert_eq!(gcda, &config.project_dir.join("obj/orphan.gcda"));
        },
        ref k => panic!("unexpected error kind {:?}", k),
    }
    assert_eq!(dump.calls.get(), 0);
}

#[test]
fn test_stale_counters_are_cleared() {
    let root = tempfile::tempdir().unwrap();
    let project_dir = setup_project(root.path());
    let config = RunConfig::new(&project_dir).unwrap();
    let tests = fake_tests(&config.project_dir);
    let dump = FakeDump::default();

    run(&config, "t1", &tests, &dump).unwrap();
    assert!(config.project_dir.join("obj/util.gcda").is_file());
    let outcome = run(&config, "t2", &tests, &dump).unwrap();
    assert!(!config.project_dir.join("obj/util.gcda").exists());
    assert_eq!(outcome.summary.counter_files, 1);
    assert_eq!(outcome.coverage.get(&config.project_dir.join("src/util.h")).unwrap().line_hits(2), Some(1));
}
