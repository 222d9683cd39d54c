//! Machine-readable form of the report.
//!
//! The report is written to `json/covdiff.json`:
//!
//! ```json
//! {
//!     "tests": ["test1", "test2"],
//!     "summaries": [
//!         {
//!             "counter_files": 12,
//!             "processed_reports": 40,
//!             "affected_files": 9,
//!             "processed_unique_files": 21,
//!             "extensions": ["", ".c", ".h"],
//!             "extension_counts": { "": 3, ".c": 12, ".h": 6 }
//!         },
//!         ...
//!     ],
//!     "files": [
//!         {
//!             "path": "/path/to/project/src/main.c",
//!             "percentages": [75.0, 50.0],
//!             "only_in_first": [10],
//!             "only_in_second": [16]
//!         },
//!         ...
//!     ]
//! }
//! ```
//!
//! `processed_unique_files` is `null` when only a targeted `*.gcda` was inspected.

use aggregate::RunOutcome;
use diff::{FileDiff, ProjectDiff, percentage};
use summary::RunSummary;

#[derive(Clone, Debug, Serialize)]
pub struct JsonReport<'a> {
    pub tests: [&'a str; 2],
    pub summaries: [&'a RunSummary; 2],
    pub files: Vec<JsonFile>,
}

#[derive(Clone, Debug, Serialize)]
pub struct JsonFile {
    pub path: String,
    pub percentages: [f64; 2],
    #[serde(flatten)]
    pub diff: FileDiff,
}

impl<'a> JsonReport<'a> {
    pub fn new(diff: &ProjectDiff<'a>, first: &'a RunOutcome, second: &'a RunOutcome) -> JsonReport<'a> {
        let files = diff.affected_files()
            .iter()
            .map(|path| {
                let (r1, r2) = diff.records(path);
                JsonFile {
                    path: path.to_string_lossy().into_owned(),
                    percentages: [percentage(r1), percentage(r2)],
                    diff: FileDiff::new(r1, r2),
                }
            })
            .collect();
        JsonReport {
            tests: [first.test.as_str(), second.test.as_str()],
            summaries: [&first.summary, &second.summary],
            files,
        }
    }
}
