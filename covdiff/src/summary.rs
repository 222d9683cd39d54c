//! Descriptive statistics of one run.

use record::CoverageMap;
use utils::dotted_extension;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Snapshot of what one run processed, computed once the coverage map is final.
#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub struct RunSummary {
    /// Number of `*.gcda` files dumped.
    pub counter_files: usize,
    /// Number of per-file entries in all reports. A `*.gcda` usually describes several files (the source plus its
    /// headers), so this is at least `counter_files`.
    pub processed_reports: usize,
    /// Number of distinct files with nonzero coverage.
    pub affected_files: usize,
    /// Number of distinct file names in all reports, including the files without coverage. Unknown if only one
    /// targeted `*.gcda` was inspected.
    pub processed_unique_files: Option<usize>,
    /// Extensions (with the leading dot) of every processed file name. Files without extension contribute `""`.
    pub extensions: BTreeSet<String>,
    /// Number of distinct file names per extension.
    pub extension_counts: BTreeMap<String, usize>,
}

impl RunSummary {
    pub fn new<S: AsRef<str>>(counter_files: usize, processed_names: &[S], coverage: &CoverageMap, single_artifact: bool) -> RunSummary {
        let unique_names = processed_names.iter().map(|name| name.as_ref()).collect::<BTreeSet<&str>>();
        let extensions = processed_names.iter().map(|name| dotted_extension(name.as_ref())).collect();

        let mut extension_counts = BTreeMap::new();
        for name in &unique_names {
            *extension_counts.entry(dotted_extension(*name)).or_insert(0) += 1;
        }

        RunSummary {
            counter_files,
            processed_reports: processed_names.len(),
            affected_files: coverage.len(),
            processed_unique_files: if single_artifact { None } else { Some(unique_names.len()) },
            extensions,
            extension_counts,
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "*.gcda files: {}", self.counter_files)?;
        writeln!(f, "processed reports: {}", self.processed_reports)?;
        writeln!(f, "unique files affected by test: {}", self.affected_files)?;
        match self.processed_unique_files {
            Some(n) => writeln!(f, "processed unique files (including files with 0% coverage): {}", n)?,
            None => writeln!(f, "processed unique files (including files with 0% coverage): Unknown")?,
        }
        let extensions = self.extensions.iter().map(|e| format!("{:?}", e)).collect::<Vec<_>>();
        writeln!(f, "extensions: {{{}}}", extensions.join(", "))?;
        write!(f, "extension counts:")?;
        for (ext, count) in &self.extension_counts {
            write!(f, "\n    {:?}: {}", ext, count)?;
        }
        Ok(())
    }
}

#[cfg(test)]
fn covered_map(paths: &[&str]) -> CoverageMap {
    use record::CoverageRecord;
    let mut map = CoverageMap::new();
    for path in paths {
        let mut record = CoverageRecord::new(*path);
        record.add_line(1, 1);
        map.merge(record);
    }
    map
}

#[test]
fn test_summary_counts() {
    let names = ["src/a.c", "/usr/include/stdio.h", "include/u.h", "src/b.c", "/usr/include/stdio.h", "include/u.h", "/usr/include/c++/11/vector"];
    let map = covered_map(&["/w/src/a.c", "/w/src/b.c", "/w/include/u.h"]);
    let summary = RunSummary::new(2, &names, &map, false);

    assert_eq!(summary.counter_files, 2);
    assert_eq!(summary.processed_reports, 7);
    assert_eq!(summary.affected_files, 3);
    assert_eq!(summary.processed_unique_files, Some(5));
    assert_eq!(summary.extensions.iter().map(|s| &**s).collect::<Vec<_>>(), vec!["", ".c", ".h"]);
    assert_eq!(summary.extension_counts[".c"], 2);
    assert_eq!(summary.extension_counts[".h"], 2);
    assert_eq!(summary.extension_counts[""], 1);
}

#[test]
fn test_summary_single_artifact_is_unknown() {
    let map = covered_map(&["/w/a.c"]);
    let summary = RunSummary::new(1, &["a.c", "a.h"], &map, true);
    assert_eq!(summary.processed_unique_files, None);
    assert_eq!(summary.processed_reports, 2);
    assert!(summary.to_string().contains("(including files with 0% coverage): Unknown"));
}

#[test]
fn test_summary_empty_run() {
    let summary = RunSummary::new::<&str>(0, &[], &CoverageMap::new(), false);
    assert_eq!(summary.processed_unique_files, Some(0));
    assert!(summary.extensions.is_empty());
    assert!(summary.extension_counts.is_empty());
}
