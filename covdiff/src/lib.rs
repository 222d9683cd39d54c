//! `covdiff` merges the gcov JSON reports produced by two test runs over the same instrumented build, and renders the
//! lines and functions exercised by one run but not the other.
//!
//! The pipeline is:
//!
//! 1. [`aggregate::run()`] clears stale `*.gcda`, runs one test, dumps every `*.gcda` with `gcov` and merges the
//!    result into a [`CoverageMap`] plus a [`RunSummary`].
//! 2. [`diff::ProjectDiff`] compares two such maps.
//! 3. [`render::Renderer`] writes the HTML (and optionally JSON) report, rendering detail pages in parallel.
//!
//! [`aggregate::run()`]: ./aggregate/fn.run.html
//! [`CoverageMap`]: ./record/struct.CoverageMap.html
//! [`RunSummary`]: ./summary/struct.RunSummary.html
//! [`diff::ProjectDiff`]: ./diff/struct.ProjectDiff.html
//! [`render::Renderer`]: ./render/struct.Renderer.html

#![recursion_limit = "128"] // needed for error_chain.

#[macro_use]
extern crate bitflags;
#[macro_use]
extern crate error_chain;
#[macro_use]
extern crate log;
#[macro_use]
extern crate serde;
#[macro_use]
extern crate serde_json;
extern crate flate2;
extern crate natord;
extern crate tera;
extern crate walkdir;

mod utils;
pub mod error;
pub mod record;
pub mod gcov;
pub mod tool;
pub mod aggregate;
pub mod summary;
pub mod diff;
pub mod render;

pub use aggregate::{Aggregator, RunConfig, RunOutcome, Target};
pub use diff::{FileDiff, HitCell, ProjectDiff};
pub use error::{Error, ErrorKind, Result};
pub use gcov::GcovReport;
pub use record::{CoverageMap, CoverageRecord};
pub use render::{Formats, Renderer};
pub use summary::RunSummary;
pub use tool::{CounterDump, GcovTool, TestCommand, TestRunner};
