//! Per-source-file coverage accumulated over one test run.
//!
//! A [`CoverageRecord`] only grows: merging another record unions the line and function sets and adds the hit
//! counts. Merging is therefore commutative and associative, and the order in which `*.gcda` files are discovered does
//! not influence the result.
//!
//! [`CoverageRecord`]: ./struct.CoverageRecord.html

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::collections::hash_map::Entry;
use std::path::{Path, PathBuf};

/// Coverage information about a source file in one run.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct CoverageRecord {
    path: PathBuf,
    line_hit_count: BTreeMap<u32, u64>,
    covered_lines: BTreeSet<u32>,
    function_hit_count: BTreeMap<String, u64>,
    covered_functions: BTreeSet<String>,
    demangled_names: BTreeMap<String, String>,
}

impl CoverageRecord {
    /// Creates an empty record for an absolute source path.
    pub fn new<P: Into<PathBuf>>(path: P) -> CoverageRecord {
        CoverageRecord {
            path: path.into(),
            line_hit_count: BTreeMap::new(),
            covered_lines: BTreeSet::new(),
            function_hit_count: BTreeMap::new(),
            covered_functions: BTreeSet::new(),
            demangled_names: BTreeMap::new(),
        }
    }

    /// The absolute source path, which identifies this record.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records that `line` is a line of interest executed `count` more times.
    pub fn add_line(&mut self, line: u32, count: u64) {
        let total = self.line_hit_count.entry(line).or_insert(0);
        *total = total.saturating_add(count);
        if *total > 0 {
            self.covered_lines.insert(line);
        }
    }

    /// Records that the function `name` has been called `count` more times.
    pub fn add_function(&mut self, name: &str, count: u64) {
        let total = self.function_hit_count.entry(name.to_owned()).or_insert(0);
        *total = total.saturating_add(count);
        if *total > 0 {
            self.covered_functions.insert(name.to_owned());
        }
    }

    /// Associates a human-readable name with the function identifier `name`.
    pub fn set_demangled_name(&mut self, name: &str, demangled: &str) {
        if name != demangled {
            self.demangled_names.entry(name.to_owned()).or_insert_with(|| demangled.to_owned());
        }
    }

    /// Merges another record of the same source file into this one.
    pub fn merge(&mut self, other: &CoverageRecord) {
        debug_assert_eq!(self.path, other.path);
        for (&line, &count) in &other.line_hit_count {
            self.add_line(line, count);
        }
        for (name, &count) in &other.function_hit_count {
            self.add_function(name, count);
        }
        for (name, demangled) in &other.demangled_names {
            self.demangled_names.entry(name.clone()).or_insert_with(|| demangled.clone());
        }
    }

    /// Checks whether the line appeared in any raw report of this file.
    pub fn is_line_of_interest(&self, line: u32) -> bool {
        self.line_hit_count.contains_key(&line)
    }

    /// Checks whether the line was executed at least once.
    pub fn is_covered(&self, line: u32) -> bool {
        self.covered_lines.contains(&line)
    }

    /// Number of times the line was executed, or `None` if it is not a line of interest.
    pub fn line_hits(&self, line: u32) -> Option<u64> {
        self.line_hit_count.get(&line).cloned()
    }

    /// All lines of interest, in ascending order.
    pub fn lines_of_interest<'a>(&'a self) -> impl Iterator<Item = u32> + 'a {
        self.line_hit_count.keys().cloned()
    }

    pub fn covered_lines(&self) -> &BTreeSet<u32> {
        &self.covered_lines
    }

    pub fn line_hit_count(&self) -> &BTreeMap<u32, u64> {
        &self.line_hit_count
    }

    pub fn covered_functions(&self) -> &BTreeSet<String> {
        &self.covered_functions
    }

    pub fn function_hit_count(&self) -> &BTreeMap<String, u64> {
        &self.function_hit_count
    }

    /// The demangled name of a function, falling back to the identifier itself.
    pub fn display_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.demangled_names.get(name).map_or(name, |s| &**s)
    }

    /// Percentage of lines of interest that are covered. Zero when there are no lines of interest.
    pub fn percentage(&self) -> f64 {
        if self.line_hit_count.is_empty() {
            0.0
        } else {
            100.0 * self.covered_lines.len() as f64 / self.line_hit_count.len() as f64
        }
    }
}

/// Coverage of a whole project in one run, keyed by absolute source path.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct CoverageMap {
    files: HashMap<PathBuf, CoverageRecord>,
}

impl CoverageMap {
    pub fn new() -> CoverageMap {
        CoverageMap::default()
    }

    /// Merges a partial record into the map, inserting it when its path is new.
    pub fn merge(&mut self, record: CoverageRecord) {
        match self.files.entry(record.path.clone()) {
            Entry::Occupied(mut entry) => {
                trace!("merging into existing record {:?}", record.path);
                entry.get_mut().merge(&record);
            },
            Entry::Vacant(entry) => {
                trace!("new record {:?}", record.path);
                entry.insert(record);
            },
        }
    }

    /// Drops every record without a covered line.
    pub fn retain_covered(&mut self) {
        self.files.retain(|_, record| !record.covered_lines.is_empty());
    }

    pub fn get(&self, path: &Path) -> Option<&CoverageRecord> {
        self.files.get(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    pub fn paths<'a>(&'a self) -> impl Iterator<Item = &'a Path> + 'a {
        self.files.keys().map(|p| &**p)
    }

    pub fn records<'a>(&'a self) -> impl Iterator<Item = &'a CoverageRecord> + 'a {
        self.files.values()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }
}

#[cfg(test)]
fn record(path: &str, lines: &[(u32, u64)], functions: &[(&str, u64)]) -> CoverageRecord {
    let mut record = CoverageRecord::new(path);
    for &(line, count) in lines {
        record.add_line(line, count);
    }
    for &(name, count) in functions {
        record.add_function(name, count);
    }
    record
}

#[cfg(test)]
fn assert_invariants(record: &CoverageRecord) {
    for line in record.covered_lines() {
        assert!(record.is_line_of_interest(*line), "covered line {} is not a line of interest", line);
        assert!(record.line_hits(*line).unwrap() > 0);
    }
    for (name, &count) in record.function_hit_count() {
        assert_eq!(record.covered_functions().contains(name), count > 0);
    }
}

#[test]
fn test_zero_count_line_is_of_interest_but_not_covered() {
    let r = record("/p/a.c", &[(3, 0), (4, 2)], &[("main", 1), ("unused", 0)]);
    assert!(r.is_line_of_interest(3));
    assert!(!r.is_covered(3));
    assert!(r.is_covered(4));
    assert_eq!(r.line_hits(5), None);
    assert_eq!(r.covered_functions().iter().collect::<Vec<_>>(), vec!["main"]);
    assert_invariants(&r);
}

#[test]
fn test_merge_adds_counts_and_unions_sets() {
    let mut a = record("/p/a.h", &[(1, 0), (2, 3)], &[("f", 0)]);
    let b = record("/p/a.h", &[(1, 5), (7, 0)], &[("f", 2), ("g", 0)]);
    a.merge(&b);
    assert_eq!(a.line_hits(1), Some(5));
    assert_eq!(a.line_hits(2), Some(3));
    assert_eq!(a.line_hits(7), Some(0));
    assert_eq!(a.lines_of_interest().collect::<Vec<_>>(), vec![1, 2, 7]);
    assert_eq!(a.covered_lines().iter().cloned().collect::<Vec<_>>(), vec![1, 2]);
    assert_eq!(a.function_hit_count()["f"], 2);
    assert_eq!(a.function_hit_count()["g"], 0);
    assert!(a.covered_functions().contains("f"));
    assert!(!a.covered_functions().contains("g"));
    assert_invariants(&a);
}

#[test]
fn test_merge_is_commutative_and_associative() {
    let parts = [
        record("/p/x.h", &[(1, 1), (2, 0)], &[("f", 1)]),
        record("/p/x.h", &[(2, 4), (3, 0)], &[("g", 0)]),
        record("/p/x.h", &[(1, 2), (9, 0)], &[("f", 3), ("g", 1)]),
    ];
    let orders: [[usize; 3]; 6] = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];

    let mut results = orders.iter().map(|order| {
        let mut map = CoverageMap::new();
        for &i in order {
            map.merge(parts[i].clone());
            assert_invariants(map.get(Path::new("/p/x.h")).unwrap());
        }
        map
    });
    let first = results.next().unwrap();
    for other in results {
        assert_eq!(first, other);
    }

    // (a + b) + c == a + (b + c)
    let mut bc = parts[1].clone();
    bc.merge(&parts[2]);
    let mut a_bc = parts[0].clone();
    a_bc.merge(&bc);
    assert_eq!(first.get(Path::new("/p/x.h")), Some(&a_bc));
}

#[test]
fn test_merge_saturates() {
    let mut a = record("/p/a.c", &[(1, u64::max_value() - 1)], &[]);
    a.merge(&record("/p/a.c", &[(1, 5)], &[]));
    assert_eq!(a.line_hits(1), Some(u64::max_value()));
}

#[test]
fn test_percentage() {
    assert_eq!(CoverageRecord::new("/p/empty.c").percentage(), 0.0);
    let r = record("/p/a.c", &[(1, 1), (2, 0), (3, 0), (4, 7)], &[]);
    assert_eq!(r.percentage(), 50.0);
}

#[test]
fn test_retain_covered() {
    let mut map = CoverageMap::new();
    map.merge(record("/p/a.c", &[(1, 1)], &[]));
    map.merge(record("/p/b.h", &[(1, 0)], &[("f", 0)]));
    map.retain_covered();
    assert_eq!(map.len(), 1);
    assert!(map.contains(Path::new("/p/a.c")));
    assert!(!map.contains(Path::new("/p/b.h")));
}

#[test]
fn test_display_name() {
    let mut r = record("/p/a.cc", &[], &[("_Z1fv", 1)]);
    r.set_demangled_name("_Z1fv", "f()");
    r.set_demangled_name("main", "main");
    assert_eq!(r.display_name("_Z1fv"), "f()");
    assert_eq!(r.display_name("main"), "main");
}
