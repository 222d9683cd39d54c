//! Output names of the detail pages.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Default)]
struct State {
    /// Last suffix handed out for each base name.
    suffixes: HashMap<String, usize>,
    used: HashSet<String>,
}

/// Registry assigning a distinct page name to each source file.
///
/// The first file with a given base name becomes `«base name».html`, the following ones `«base name»_1.html`,
/// `«base name»_2.html` and so on. Checking and reserving a name is a single step under the lock, so concurrent
/// workers never receive the same name.
#[derive(Debug, Default)]
pub struct PageNames {
    state: Mutex<State>,
}

impl PageNames {
    pub fn new() -> PageNames {
        PageNames::default()
    }

    /// Reserves a page name for a source file with the given base name.
    pub fn reserve(&self, base_name: &str) -> String {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let state = &mut *guard;

        let mut name = format!("{}.html", base_name);
        if state.used.contains(&name) {
            let suffix = state.suffixes.entry(base_name.to_owned()).or_insert(0);
            loop {
                *suffix += 1;
                name = format!("{}_{}.html", base_name, suffix);
                if !state.used.contains(&name) {
                    break;
                }
            }
        }
        state.used.insert(name.clone());
        name
    }
}

#[test]
fn test_sequential_names() {
    let names = PageNames::new();
    assert_eq!(names.reserve("util.h"), "util.h.html");
    assert_eq!(names.reserve("main.c"), "main.c.html");
    assert_eq!(names.reserve("util.h"), "util.h_1.html");
    assert_eq!(names.reserve("util.h"), "util.h_2.html");
}

#[test]
fn test_suffixed_name_taken_by_another_file() {
    let names = PageNames::new();
    assert_eq!(names.reserve("a.c_1"), "a.c_1.html");
    assert_eq!(names.reserve("a.c"), "a.c.html");
    assert_eq!(names.reserve("a.c"), "a.c_2.html");
}

#[test]
fn test_concurrent_names_are_distinct() {
    use std::thread;

    const WORKERS: usize = 8;
    const PER_WORKER: usize = 25;

    let names = PageNames::new();
    let mut all = thread::scope(|s| {
        let handles = (0..WORKERS).map(|_| s.spawn(|| (0..PER_WORKER).map(|_| names.reserve("common.h")).collect::<Vec<_>>())).collect::<Vec<_>>();
        handles.into_iter().flat_map(|h| h.join().unwrap()).collect::<Vec<_>>()
    });
    all.sort();

    let mut expected = vec!["common.h.html".to_owned()];
    expected.extend((1..WORKERS * PER_WORKER).map(|i| format!("common.h_{}.html", i)));
    expected.sort();
    assert_eq!(all, expected);
}
