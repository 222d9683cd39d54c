//! The gcov JSON intermediate format and its conversion into [`CoverageRecord`]s.
//!
//! `gcov --json-format` writes one document per `*.gcda`. A document lists every source file the compilation unit
//! touched, usually the primary source plus the headers it includes:
//!
//! ```json
//! {
//!     "format_version": "1",
//!     "gcc_version": "11.4.0",
//!     "files": [
//!         {
//!             "file": "src/main.c",
//!             "lines": [
//!                 { "line_number": 3, "count": 1, "unexecuted_block": false, "branches": [] },
//!                 ...
//!             ],
//!             "functions": [
//!                 { "name": "main", "demangled_name": "main", "execution_count": 1, ... },
//!                 ...
//!             ]
//!         },
//!         ...
//!     ]
//! }
//! ```
//!
//! Only the fields listed in the types below are read. They are required; anything else is ignored.
//!
//! [`CoverageRecord`]: ../record/struct.CoverageRecord.html

use error::{ErrorKind, Result, ResultExt};
use record::CoverageRecord;

use serde_json::from_reader;

use std::io::Read;
use std::path::{Path, PathBuf};

/// A complete JSON report produced from one `*.gcda`.
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct GcovReport {
    pub files: Vec<GcovFile>,
}

/// Coverage of one source file inside a [`GcovReport`].
///
/// [`GcovReport`]: ./struct.GcovReport.html
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct GcovFile {
    /// Path of the source, either absolute or relative to the build directory.
    pub file: String,
    pub lines: Vec<GcovLine>,
    pub functions: Vec<GcovFunction>,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct GcovLine {
    pub line_number: u32,
    pub count: u64,
}

#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct GcovFunction {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demangled_name: Option<String>,
    pub execution_count: u64,
}

impl GcovReport {
    /// Decodes a report, reporting `origin` as the offending path if the document does not follow the schema.
    pub fn from_reader<R: Read>(reader: R, origin: &Path) -> Result<GcovReport> {
        from_reader(reader).chain_err(|| ErrorKind::InvalidReport(origin.to_owned()))
    }
}

/// How file entries of a report are turned into records.
#[derive(Clone, Debug)]
pub struct ParseOptions<'a> {
    /// Relative source paths are resolved against this directory.
    pub project_dir: &'a Path,
    /// If set, only entries for this source file are materialized.
    pub source_file: Option<&'a Path>,
}

/// Result of parsing one report.
#[derive(Clone, Debug, Default)]
pub struct ParsedReport {
    /// Records of the entries which were materialized.
    pub records: Vec<CoverageRecord>,
    /// Source names of every entry, as reported, including the ones filtered out.
    pub processed_names: Vec<String>,
}

impl<'a> ParseOptions<'a> {
    /// Resolves a reported source path against the project directory.
    pub fn normalize<P: AsRef<Path>>(&self, reported: P) -> PathBuf {
        let path = reported.as_ref();
        if path.is_absolute() {
            path.to_owned()
        } else {
            self.project_dir.join(path)
        }
    }

    /// Checks whether an entry passes the `--source-file` restriction.
    fn is_selected(&self, reported: &str, normalized: &Path) -> bool {
        match self.source_file {
            None => true,
            Some(target) => target == Path::new(reported) || self.normalize(target) == normalized,
        }
    }

    /// Converts every file entry of the report into a partial record.
    ///
    /// Entries rejected by the `--source-file` restriction are counted in [`ParsedReport::processed_names`] but produce
    /// no record. Entries without any covered line are kept, so that their lines of interest still reach the map; the
    /// aggregator drops files which end up uncovered once the whole run has been merged.
    ///
    /// [`ParsedReport::processed_names`]: ./struct.ParsedReport.html#structfield.processed_names
    pub fn parse(&self, report: &GcovReport) -> ParsedReport {
        let mut parsed = ParsedReport::default();
        for entry in &report.files {
            parsed.processed_names.push(entry.file.clone());

            let path = self.normalize(&entry.file);
            if !self.is_selected(&entry.file, &path) {
                trace!("skipping {:?}, not the target source file", path);
                continue;
            }

            let mut record = CoverageRecord::new(path);
            for line in &entry.lines {
                record.add_line(line.line_number, line.count);
            }
            for function in &entry.functions {
                record.add_function(&function.name, function.execution_count);
                if let Some(ref demangled) = function.demangled_name {
                    record.set_demangled_name(&function.name, demangled);
                }
            }
            parsed.records.push(record);
        }
        parsed
    }
}

#[cfg(test)]
const SAMPLE_REPORT: &str = r#"{
    "format_version": "1",
    "gcc_version": "11.4.0",
    "current_working_directory": "/work/build",
    "data_file": "main.gcda",
    "files": [
        {
            "file": "src/main.c",
            "lines": [
                { "line_number": 3, "count": 1, "unexecuted_block": false, "branches": [], "function_name": "main" },
                { "line_number": 4, "count": 0, "unexecuted_block": true, "branches": [], "function_name": "main" },
                { "line_number": 6, "count": 2, "unexecuted_block": false, "branches": [], "function_name": "main" }
            ],
            "functions": [
                { "name": "main", "demangled_name": "main", "start_line": 2, "end_line": 7, "execution_count": 1, "blocks": 4, "blocks_executed": 3 },
                { "name": "_Z6helperv", "demangled_name": "helper()", "start_line": 9, "end_line": 11, "execution_count": 0, "blocks": 2, "blocks_executed": 0 }
            ]
        },
        {
            "file": "/usr/include/stdio.h",
            "lines": [ { "line_number": 10, "count": 0 } ],
            "functions": []
        },
        {
            "file": "/work/include/util.h",
            "lines": [ { "line_number": 5, "count": 4 } ],
            "functions": [ { "name": "twice", "execution_count": 4 } ]
        }
    ]
}"#;

#[cfg(test)]
fn sample() -> GcovReport {
    GcovReport::from_reader(SAMPLE_REPORT.as_bytes(), Path::new("main.gcov.json")).unwrap()
}

#[test]
fn test_parse_sample_report() {
    let options = ParseOptions {
        project_dir: Path::new("/work/build"),
        source_file: None,
    };
    let parsed = options.parse(&sample());

    assert_eq!(parsed.processed_names, vec!["src/main.c", "/usr/include/stdio.h", "/work/include/util.h"]);
    assert_eq!(parsed.records.len(), 3);

    let main = &parsed.records[0];
    assert_eq!(main.path(), Path::new("/work/build/src/main.c"));
    assert_eq!(main.lines_of_interest().collect::<Vec<_>>(), vec![3, 4, 6]);
    assert_eq!(main.covered_lines().iter().cloned().collect::<Vec<_>>(), vec![3, 6]);
    assert_eq!(main.line_hits(6), Some(2));
    assert_eq!(main.function_hit_count()["_Z6helperv"], 0);
    assert!(main.covered_functions().contains("main"));
    assert_eq!(main.display_name("_Z6helperv"), "helper()");

    let stdio = &parsed.records[1];
    assert_eq!(stdio.path(), Path::new("/usr/include/stdio.h"));
    assert!(stdio.covered_lines().is_empty());
    assert!(stdio.is_line_of_interest(10));

    assert_eq!(parsed.records[2].path(), Path::new("/work/include/util.h"));
}

#[test]
fn test_parse_with_source_file_restriction() {
    let target = Path::new("src/main.c");
    let options = ParseOptions {
        project_dir: Path::new("/work/build"),
        source_file: Some(target),
    };
    let parsed = options.parse(&sample());
    assert_eq!(parsed.processed_names.len(), 3);
    assert_eq!(parsed.records.len(), 1);
    assert_eq!(parsed.records[0].path(), Path::new("/work/build/src/main.c"));

    let absolute = Path::new("/work/include/util.h");
    let options = ParseOptions {
        project_dir: Path::new("/work/build"),
        source_file: Some(absolute),
    };
    let parsed = options.parse(&sample());
    assert_eq!(parsed.records.len(), 1);
    assert_eq!(parsed.records[0].path(), absolute);
}

#[test]
fn test_reject_malformed_report() {
    let cases = [
        r#"{}"#,
        r#"{"files": {}}"#,
        r#"{"files": [{"file": "a.c", "lines": [{"line_number": "3", "count": 1}], "functions": []}]}"#,
        r#"{"files": [{"file": "a.c", "lines": [{"line_number": 3}], "functions": []}]}"#,
        r#"{"files": [{"file": "a.c", "lines": [], "functions": [{"name": "f"}]}]}"#,
        r#"{"files": [{"lines": [], "functions": []}]}"#,
    ];
    for case in &cases {
        let err = GcovReport::from_reader(case.as_bytes(), Path::new("bad.json")).unwrap_err();
        match *err.kind() {
            ErrorKind::InvalidReport(ref p) => assert_eq!(p, Path::new("bad.json")),
            ref k => panic!("unexpected error kind {:?} for {}", k, case),
        }
    }
}
