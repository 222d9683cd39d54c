//! Comparison of the coverage of two runs.

use record::{CoverageMap, CoverageRecord};
use utils::compare_naturally;

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

/// Lines covered by one run but not the other, for a single file.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize)]
pub struct FileDiff {
    pub only_in_first: BTreeSet<u32>,
    pub only_in_second: BTreeSet<u32>,
}

impl FileDiff {
    /// Computes the difference between the records of a file. An absent record counts as covering nothing.
    pub fn new(first: Option<&CoverageRecord>, second: Option<&CoverageRecord>) -> FileDiff {
        let empty = BTreeSet::new();
        let first = first.map_or(&empty, CoverageRecord::covered_lines);
        let second = second.map_or(&empty, CoverageRecord::covered_lines);
        FileDiff {
            only_in_first: first.difference(second).cloned().collect(),
            only_in_second: second.difference(first).cloned().collect(),
        }
    }

    pub fn has_diff(&self) -> bool {
        !self.only_in_first.is_empty() || !self.only_in_second.is_empty()
    }
}

/// Comparison of two coverage maps of the same project.
#[derive(Clone, Debug)]
pub struct ProjectDiff<'a> {
    first: &'a CoverageMap,
    second: &'a CoverageMap,
    affected: Vec<PathBuf>,
}

impl<'a> ProjectDiff<'a> {
    /// Collects the files touched by either run, in natural order.
    pub fn new(first: &'a CoverageMap, second: &'a CoverageMap) -> ProjectDiff<'a> {
        let union = first.paths().chain(second.paths()).collect::<HashSet<_>>();
        let mut affected = union.into_iter().map(Path::to_owned).collect::<Vec<_>>();
        affected.sort_by(|a, b| compare_naturally(a, b));
        ProjectDiff { first, second, affected }
    }

    /// Union of the paths of both maps.
    pub fn affected_files(&self) -> &[PathBuf] {
        &self.affected
    }

    pub fn records(&self, path: &Path) -> (Option<&'a CoverageRecord>, Option<&'a CoverageRecord>) {
        (self.first.get(path), self.second.get(path))
    }

    pub fn file_diff(&self, path: &Path) -> FileDiff {
        let (first, second) = self.records(path);
        FileDiff::new(first, second)
    }
}

/// Coverage percentage of a file in one run, 0 if the run never touched it.
pub fn percentage(record: Option<&CoverageRecord>) -> f64 {
    record.map_or(0.0, CoverageRecord::percentage)
}

/// What a run reports for one source line.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum HitCell {
    /// The line is not a line of interest.
    NotApplicable,
    /// Number of times the line was executed.
    Count(u64),
}

impl HitCell {
    /// Hit count of a line in `own`.
    ///
    /// When the run has no record of the file, the `other` run decides whether the line is a line of interest (shown
    /// as 0) or not.
    pub fn new(own: Option<&CoverageRecord>, other: Option<&CoverageRecord>, line: u32) -> HitCell {
        let count = match (own, other) {
            (Some(own), _) => own.line_hits(line),
            (None, Some(other)) => other.line_hits(line).map(|_| 0),
            (None, None) => None,
        };
        count.map_or(HitCell::NotApplicable, HitCell::Count)
    }
}

#[cfg(test)]
fn rec(path: &str, lines: &[(u32, u64)]) -> CoverageRecord {
    let mut record = CoverageRecord::new(path);
    for &(line, count) in lines {
        record.add_line(line, count);
    }
    record
}

#[cfg(test)]
fn map_of(records: Vec<CoverageRecord>) -> CoverageMap {
    let mut map = CoverageMap::new();
    for record in records {
        map.merge(record);
    }
    map
}

#[test]
fn test_scenario_overlapping_lines() {
    let run1 = map_of(vec![rec("/p/a.c", &[(10, 1), (11, 0), (12, 2), (14, 1)])]);
    let run2 = map_of(vec![rec("/p/a.c", &[(12, 1), (14, 3), (16, 1), (17, 0), (18, 0), (19, 0)])]);
    let diff = ProjectDiff::new(&run1, &run2);
    assert_eq!(diff.affected_files(), &[PathBuf::from("/p/a.c")]);

    let file = diff.file_diff(Path::new("/p/a.c"));
    assert_eq!(file.only_in_first.iter().cloned().collect::<Vec<_>>(), vec![10]);
    assert_eq!(file.only_in_second.iter().cloned().collect::<Vec<_>>(), vec![16]);
    assert!(file.has_diff());

    let (first, second) = diff.records(Path::new("/p/a.c"));
    assert_eq!(percentage(first), 75.0);
    assert_eq!(percentage(second), 50.0);
}

#[test]
fn test_diff_is_symmetric() {
    let run1 = map_of(vec![rec("/p/a.c", &[(1, 1), (2, 1), (3, 0)]), rec("/p/b.c", &[(5, 2)])]);
    let run2 = map_of(vec![rec("/p/a.c", &[(2, 4), (3, 1)]), rec("/p/c.c", &[(7, 1)])]);
    let forward = ProjectDiff::new(&run1, &run2);
    let backward = ProjectDiff::new(&run2, &run1);
    assert_eq!(forward.affected_files(), backward.affected_files());
    for path in forward.affected_files() {
        let f = forward.file_diff(path);
        let b = backward.file_diff(path);
        assert_eq!(f.only_in_first, b.only_in_second);
        assert_eq!(f.only_in_second, b.only_in_first);
    }
}

#[test]
fn test_file_only_in_one_run() {
    let run1 = map_of(vec![rec("/p/only.c", &[(3, 1), (4, 0)])]);
    let run2 = CoverageMap::new();
    let diff = ProjectDiff::new(&run1, &run2);
    let path = Path::new("/p/only.c");
    let (first, second) = diff.records(path);

    assert_eq!(percentage(second), 0.0);
    assert_eq!(diff.file_diff(path).only_in_first.len(), 1);
    assert!(diff.file_diff(path).only_in_second.is_empty());

    assert_eq!(HitCell::new(second, first, 3), HitCell::Count(0));
    assert_eq!(HitCell::new(second, first, 4), HitCell::Count(0));
    assert_eq!(HitCell::new(second, first, 5), HitCell::NotApplicable);
    assert_eq!(HitCell::new(first, second, 3), HitCell::Count(1));
    assert_eq!(HitCell::new(first, second, 5), HitCell::NotApplicable);
}

#[test]
fn test_empty_lines_of_interest() {
    let record = CoverageRecord::new("/p/empty.h");
    assert_eq!(percentage(Some(&record)), 0.0);
    assert_eq!(percentage(None), 0.0);
    assert!(!FileDiff::new(Some(&record), None).has_diff());
}

#[test]
fn test_affected_files_are_in_natural_order() {
    let run1 = map_of(vec![rec("/p/f10.c", &[(1, 1)]), rec("/p/f2.c", &[(1, 1)])]);
    let run2 = map_of(vec![rec("/p/f1.c", &[(1, 1)]), rec("/p/f2.c", &[(1, 1)])]);
    let diff = ProjectDiff::new(&run1, &run2);
    assert_eq!(diff.affected_files(), &[PathBuf::from("/p/f1.c"), PathBuf::from("/p/f2.c"), PathBuf::from("/p/f10.c")]);
}
