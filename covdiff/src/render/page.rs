//! Views of a single source file, rendered into its detail page.
//!
//! Each line of the source produces one [`LineView`] which carries what all four tables of the page need:
//!
//! * the summary table (hits of both runs added, which tests cover the line),
//! * the diff table (whether only the first or only the second run covers the line),
//! * the side-by-side table (per run covered flag and hit count).
//!
//! The function table is built from [`FunctionView`]s.
//!
//! [`LineView`]: ./struct.LineView.html
//! [`FunctionView`]: ./struct.FunctionView.html

use diff::{FileDiff, HitCell, percentage};
use record::CoverageRecord;

use std::collections::BTreeMap;
use std::fmt;
use std::fs::read;
use std::io;
use std::path::Path;

/// Shown in the summary table for lines which are not lines of interest in either run.
const NOT_OF_INTEREST: &str = "----";

impl fmt::Display for HitCell {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            HitCell::NotApplicable => f.write_str("---"),
            HitCell::Count(count) => write!(f, "{}", count),
        }
    }
}

/// Coverage of a line in one run, for the side-by-side table.
#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub struct SideView {
    pub covered: bool,
    pub hits: String,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub struct LineView<'a> {
    pub line: u32,
    /// The source text. Empty if the source could not be read or is shorter than the coverage data.
    pub source: &'a str,
    /// Hits of both runs added, or `----` if the line is not a line of interest.
    pub hits: String,
    /// `covered`, `uncovered`, or empty if the line is not a line of interest.
    pub status: &'static str,
    /// Names of the tests covering the line.
    pub tests: Vec<&'a str>,
    /// `first` or `second` if only that run covers the line, otherwise empty.
    pub diff: &'static str,
    pub first: SideView,
    pub second: SideView,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub struct FunctionView<'a> {
    pub name: &'a str,
    /// Calls in both runs added.
    pub hits: u64,
}

/// Everything known about one file in both runs.
#[derive(Clone, Copy, Debug)]
pub struct FileCoverage<'a> {
    pub tests: [&'a str; 2],
    pub first: Option<&'a CoverageRecord>,
    pub second: Option<&'a CoverageRecord>,
}

impl<'a> FileCoverage<'a> {
    pub fn percentages(&self) -> [f64; 2] {
        [percentage(self.first), percentage(self.second)]
    }

    fn records(&self) -> [Option<&'a CoverageRecord>; 2] {
        [self.first, self.second]
    }

    /// The last line of interest in either run.
    fn last_line_of_interest(&self) -> u32 {
        self.records().iter().filter_map(|r| r.and_then(|r| r.line_hit_count().keys().next_back().cloned())).max().unwrap_or(0)
    }

    fn line_view(&self, diff: &FileDiff, line: u32, source: &'a str) -> LineView<'a> {
        let mut hits = None;
        let mut tests = Vec::new();
        for (record, &test) in self.records().iter().zip(&self.tests) {
            if let Some(record) = *record {
                if let Some(count) = record.line_hits(line) {
                    hits = Some(hits.unwrap_or(0u64).saturating_add(count));
                }
                if record.is_covered(line) {
                    tests.push(test);
                }
            }
        }

        let status = match hits {
            None => "",
            Some(_) if tests.is_empty() => "uncovered",
            Some(_) => "covered",
        };
        let diff = if diff.only_in_first.contains(&line) {
            "first"
        } else if diff.only_in_second.contains(&line) {
            "second"
        } else {
            ""
        };

        LineView {
            line,
            source,
            hits: hits.map_or_else(|| NOT_OF_INTEREST.to_owned(), |h| h.to_string()),
            status,
            tests,
            diff,
            first: side_view(self.first, self.second, line),
            second: side_view(self.second, self.first, line),
        }
    }

    /// Builds the line views from the source text.
    ///
    /// Lines of interest beyond the end of the source still get a row, without text.
    pub fn lines(&self, source: &'a [String]) -> Vec<LineView<'a>> {
        let diff = FileDiff::new(self.first, self.second);
        let mut views = source.iter().zip(1..).map(|(text, line)| self.line_view(&diff, line, text)).collect::<Vec<_>>();

        let source_len = source.len() as u32;
        let last = self.last_line_of_interest();
        if last > source_len {
            views.extend((source_len + 1..=last).filter(|&line| self.is_line_of_interest(line)).map(|line| self.line_view(&diff, line, "")));
        }
        views
    }

    fn is_line_of_interest(&self, line: u32) -> bool {
        self.records().iter().any(|r| r.map_or(false, |r| r.is_line_of_interest(line)))
    }

    /// Sums the call counts of both runs per function, sorted by displayed name.
    pub fn functions(&self) -> Vec<FunctionView<'a>> {
        let records = self.records();
        let mut merged = BTreeMap::<&'a str, u64>::new();
        for record in records.iter().filter_map(|r| *r) {
            for (name, &count) in record.function_hit_count() {
                let entry = merged.entry(name).or_insert(0);
                *entry = entry.saturating_add(count);
            }
        }

        let mut views = merged
            .into_iter()
            .map(|(name, hits)| {
                let name = records.iter().filter_map(|r| *r).map(|r| r.display_name(name)).find(|&d| d != name).unwrap_or(name);
                FunctionView { name, hits }
            })
            .collect::<Vec<_>>();
        views.sort_by(|a, b| a.name.cmp(b.name));
        views
    }
}

fn side_view(own: Option<&CoverageRecord>, other: Option<&CoverageRecord>, line: u32) -> SideView {
    SideView {
        covered: own.map_or(false, |r| r.is_covered(line)),
        hits: HitCell::new(own, other, line).to_string(),
    }
}

/// Reads the lines of a source file, replacing invalid UTF-8.
pub fn read_source(path: &Path) -> io::Result<Vec<String>> {
    let bytes = read(path)?;
    Ok(String::from_utf8_lossy(&bytes).lines().map(str::to_owned).collect())
}

#[cfg(test)]
fn rec(path: &str, lines: &[(u32, u64)], functions: &[(&str, u64)]) -> CoverageRecord {
    let mut record = CoverageRecord::new(path);
    for &(line, count) in lines {
        record.add_line(line, count);
    }
    for &(name, count) in functions {
        record.add_function(name, count);
    }
    record
}

#[test]
fn test_line_views() {
    let first = rec("/p/a.c", &[(1, 2), (2, 0), (3, 1)], &[]);
    let second = rec("/p/a.c", &[(1, 5), (2, 3)], &[]);
    let file = FileCoverage {
        tests: ["t1", "t2"],
        first: Some(&first),
        second: Some(&second),
    };
    let source = vec!["int a;".to_owned(), "int b;".to_owned(), "int c;".to_owned(), "// end".to_owned()];
    let views = file.lines(&source);
    assert_eq!(views.len(), 4);

    assert_eq!(views[0].hits, "7");
    assert_eq!(views[0].status, "covered");
    assert_eq!(views[0].tests, vec!["t1", "t2"]);
    assert_eq!(views[0].diff, "");

    assert_eq!(views[1].tests, vec!["t2"]);
    assert_eq!(views[1].diff, "second");
    assert_eq!(views[1].first, SideView { covered: false, hits: "0".to_owned() });

    assert_eq!(views[2].diff, "first");
    assert_eq!(views[2].second, SideView { covered: false, hits: "---".to_owned() });

    assert_eq!(views[3].hits, "----");
    assert_eq!(views[3].status, "");
    assert_eq!(views[3].source, "// end");
}

#[test]
fn test_line_views_of_file_in_one_run_without_source() {
    let first = rec("/p/gone.c", &[(2, 0), (5, 4)], &[]);
    let file = FileCoverage {
        tests: ["t1", "t2"],
        first: Some(&first),
        second: None,
    };
    let views = file.lines(&[]);
    assert_eq!(views.iter().map(|v| v.line).collect::<Vec<_>>(), vec![2, 5]);
    assert_eq!(views[0].status, "uncovered");
    assert_eq!(views[1].second, SideView { covered: false, hits: "0".to_owned() });
    assert_eq!(views[1].source, "");
    assert_eq!(file.percentages(), [50.0, 0.0]);
}

#[test]
fn test_function_views_add_both_runs() {
    let mut first = rec("/p/a.cc", &[], &[("_Z1fv", 2), ("main", 1)]);
    first.set_demangled_name("_Z1fv", "f()");
    let second = rec("/p/a.cc", &[], &[("_Z1fv", 3), ("_Z1gv", 0)]);
    let file = FileCoverage {
        tests: ["t1", "t2"],
        first: Some(&first),
        second: Some(&second),
    };
    let functions = file.functions();
    assert_eq!(functions, vec![
        FunctionView { name: "_Z1gv", hits: 0 },
        FunctionView { name: "f()", hits: 5 },
        FunctionView { name: "main", hits: 1 },
    ]);
}
