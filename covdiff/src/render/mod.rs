//! Report generation.
//!
//! # Output structure
//!
//! The report is written into the coverage destination directory:
//!
//! ```text
//! «dest»/
//!     html/
//!         CodeCoverage.html
//!         Pages/
//!             main.c.html
//!             util.h.html
//!             util.h_1.html
//!             ...
//!         Style/
//!             style.css
//!         Javascript/
//!             report.js
//!     json/
//!         covdiff.json
//! ```
//!
//! `html/` exists if the [`Formats::HTML`] format is requested, `json/` if [`Formats::JSON`] is requested. Neither
//! directory may exist beforehand.
//!
//! # Detail pages
//!
//! Every file touched by either run gets one page, rendered from `page.html`. Page names come from the [`PageNames`]
//! registry which gives files sharing a base name distinct names. They are reserved in the order of the affected
//! files before any page is written, so the file getting the unsuffixed name never depends on thread timing. Pages
//! are then rendered by a fixed number of worker threads pulling files from a shared cursor; the coverage maps are
//! only borrowed.
//!
//! A page whose source file cannot be read is still rendered from the coverage data, with the error shown at the top.
//!
//! # Index page
//!
//! `CodeCoverage.html` is rendered from `index.html`. It holds the summaries of both runs (unless turned off with
//! [`Renderer::run_summaries()`]), the list of every file with both percentages, and the list of files with a
//! difference.
//!
//! [`Renderer::run_summaries()`]: ./struct.Renderer.html#method.run_summaries
//! [`Formats::HTML`]: ./struct.Formats.html#associatedconstant.HTML
//! [`Formats::JSON`]: ./struct.Formats.html#associatedconstant.JSON
//! [`PageNames`]: ./struct.PageNames.html

mod names;
mod page;
mod template;
pub mod json;

pub use self::json::JsonReport;
pub use self::names::PageNames;
pub use self::page::{FileCoverage, FunctionView, LineView, SideView};

use aggregate::RunOutcome;
use diff::{FileDiff, ProjectDiff, percentage};
use error::{ErrorKind, Result, ResultExt};
use summary::RunSummary;
use utils::{create_fresh_dir, file_name_lossy};

use serde_json::to_writer_pretty;
use tera::{Context, Tera};

use std::fs::{File, create_dir_all};
use std::io::{BufWriter, Write};
use std::panic::resume_unwind;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

bitflags! {
    /// Set of report formats to produce.
    pub struct Formats: u8 {
        const HTML = 1;
        const JSON = 2;
    }
}

#[derive(Debug)]
pub struct UnsupportedFormatName;

impl Formats {
    /// Parses a list of format names, e.g. the comma-separated parts of `--format html,json`.
    pub fn from_multi_str<'a, I>(strings: I) -> ::std::result::Result<Formats, UnsupportedFormatName>
    where
        I: Iterator<Item = &'a str>,
    {
        let mut res = Formats::empty();
        for s in strings {
            res |= s.parse()?;
        }
        Ok(res)
    }
}

impl FromStr for Formats {
    type Err = UnsupportedFormatName;
    fn from_str(s: &str) -> ::std::result::Result<Formats, UnsupportedFormatName> {
        Ok(match s {
            "html" => Formats::HTML,
            "json" => Formats::JSON,
            "all" => Formats::all(),
            _ => return Err(UnsupportedFormatName),
        })
    }
}

/// Paths of the rendered report.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Rendered {
    /// `html/CodeCoverage.html`, if HTML was rendered.
    pub index: Option<PathBuf>,
    /// `json/covdiff.json`, if JSON was rendered.
    pub json: Option<PathBuf>,
    /// Number of detail pages.
    pub pages: usize,
}

/// Renders the comparison of two runs.
#[derive(Clone, Debug)]
pub struct Renderer {
    dest: PathBuf,
    formats: Formats,
    jobs: usize,
    run_summaries: bool,
}

impl Renderer {
    /// Creates a renderer writing HTML with 4 workers into `dest`.
    pub fn new<P: Into<PathBuf>>(dest: P) -> Renderer {
        Renderer {
            dest: dest.into(),
            formats: Formats::HTML,
            jobs: 4,
            run_summaries: true,
        }
    }

    pub fn formats(mut self, formats: Formats) -> Renderer {
        self.formats = formats;
        self
    }

    /// Sets the number of page rendering workers. At least one worker is always used.
    pub fn jobs(mut self, jobs: usize) -> Renderer {
        self.jobs = jobs.max(1);
        self
    }

    /// Whether the index page starts with the summary of each run.
    pub fn run_summaries(mut self, run_summaries: bool) -> Renderer {
        self.run_summaries = run_summaries;
        self
    }

    pub fn html_dir(&self) -> PathBuf {
        self.dest.join("html")
    }

    pub fn json_dir(&self) -> PathBuf {
        self.dest.join("json")
    }

    /// Writes the report comparing `first` with `second`.
    pub fn render(&self, first: &RunOutcome, second: &RunOutcome) -> Result<Rendered> {
        let html_dir = self.html_dir();
        let json_dir = self.json_dir();
        if self.formats.contains(Formats::HTML) {
            ensure!(!html_dir.exists(), ErrorKind::OutputDirectoryExists(html_dir));
        }
        if self.formats.contains(Formats::JSON) {
            ensure!(!json_dir.exists(), ErrorKind::OutputDirectoryExists(json_dir));
        }

        let diff = ProjectDiff::new(&first.coverage, &second.coverage);
        let mut rendered = Rendered::default();

        if self.formats.contains(Formats::HTML) {
            create_fresh_dir(&html_dir)?;
            let (index, pages) = self.render_html(&html_dir, &diff, first, second).chain_err(|| "cannot render HTML report")?;
            rendered.index = Some(index);
            rendered.pages = pages;
        }

        if self.formats.contains(Formats::JSON) {
            create_fresh_dir(&json_dir)?;
            let path = json_dir.join("covdiff.json");
            let report = JsonReport::new(&diff, first, second);
            let mut writer = BufWriter::new(File::create(&path)?);
            to_writer_pretty(&mut writer, &report)?;
            writer.flush()?;
            rendered.json = Some(path);
        }

        Ok(rendered)
    }

    fn render_html(&self, html_dir: &Path, diff: &ProjectDiff, first: &RunOutcome, second: &RunOutcome) -> Result<(PathBuf, usize)> {
        let pages_dir = html_dir.join("Pages");
        create_dir_all(&pages_dir)?;
        write_asset(&html_dir.join("Style"), "style.css", template::STYLE_CSS)?;
        write_asset(&html_dir.join("Javascript"), "report.js", template::REPORT_JS)?;

        let tera = template::new()?;
        let tests = [first.test.as_str(), second.test.as_str()];
        let pages = self.render_pages(&tera, diff, tests, &pages_dir)?;

        let index = html_dir.join("CodeCoverage.html");
        let summaries = if self.run_summaries {
            vec![summary_view(&first.test, &first.summary), summary_view(&second.test, &second.summary)]
        } else {
            Vec::new()
        };
        write_index(&tera, &index, diff, &pages, [first, second], &summaries)?;
        debug!("rendered {} pages and {:?}", pages.len(), index);
        Ok((index, pages.len()))
    }

    /// Renders one page per affected file. Returns the page names, in the order of the affected files.
    fn render_pages(&self, tera: &Tera, diff: &ProjectDiff, tests: [&str; 2], pages_dir: &Path) -> Result<Vec<String>> {
        let affected = diff.affected_files();
        let pages = page_names(affected);
        let cursor = AtomicUsize::new(0);
        let workers = self.jobs.min(affected.len()).max(1);

        let worker = || -> Result<()> {
            loop {
                let index = cursor.fetch_add(1, Ordering::Relaxed);
                let path = match affected.get(index) {
                    Some(path) => path,
                    None => return Ok(()),
                };
                let (first, second) = diff.records(path);
                let file = FileCoverage { tests, first, second };
                let output = pages_dir.join(&pages[index]);
                write_page(tera, path, &file, &output).chain_err(|| format!("cannot write `{}`", output.display()))?;
                trace!("rendered {:?} into {:?}", path, output);
            }
        };

        let results = thread::scope(|s| {
            let handles = (0..workers).map(|_| s.spawn(&worker)).collect::<Vec<_>>();
            handles.into_iter().map(|h| h.join().unwrap_or_else(|e| resume_unwind(e))).collect::<Vec<_>>()
        });
        for result in results {
            result?;
        }
        Ok(pages)
    }
}

/// Reserves the page names in the order of the affected files, so the same input always produces the same names.
fn page_names(affected: &[PathBuf]) -> Vec<String> {
    let names = PageNames::new();
    affected.iter().map(|path| names.reserve(&base_name(path))).collect()
}

/// Base name used for the page of a source file.
fn base_name(path: &Path) -> String {
    let name = file_name_lossy(path);
    if name.is_empty() {
        "source".to_owned()
    } else {
        name
    }
}

fn write_asset(dir: &Path, name: &str, content: &str) -> Result<()> {
    create_dir_all(dir)?;
    File::create(dir.join(name))?.write_all(content.as_bytes())?;
    Ok(())
}

fn write_page(tera: &Tera, path: &Path, file: &FileCoverage, output: &Path) -> Result<()> {
    let (source, source_error) = match page::read_source(path) {
        Ok(source) => (source, String::new()),
        Err(e) => {
            warn!("cannot read source file `{}`: {}", path.display(), e);
            (Vec::new(), e.to_string())
        },
    };

    let mut context = Context::new();
    context.insert("path", &path.to_string_lossy());
    context.insert("tests", &file.tests);
    context.insert("percentages", &file.percentages());
    context.insert("source_error", &source_error);
    context.insert("lines", &file.lines(&source));
    context.insert("functions", &file.functions());

    let rendered = tera.render(template::PAGE, &context)?;
    File::create(output)?.write_all(rendered.as_bytes())?;
    Ok(())
}

#[derive(Serialize)]
struct IndexRow<'a> {
    path: String,
    page: &'a str,
    runs: [IndexCell; 2],
    has_diff: bool,
}

#[derive(Serialize)]
struct IndexCell {
    percentage: f64,
    /// Whether the run covers lines the other one does not.
    diff: bool,
}

fn summary_view(test: &str, summary: &RunSummary) -> ::serde_json::Value {
    let extensions = summary.extensions.iter().map(|e| format!("\"{}\"", e)).collect::<Vec<_>>();
    json!({
        "test": test,
        "counter_files": summary.counter_files,
        "processed_reports": summary.processed_reports,
        "affected_files": summary.affected_files,
        "processed_unique_files": summary.processed_unique_files.map_or_else(|| "Unknown".to_owned(), |n| n.to_string()),
        "extensions": format!("{{{}}}", extensions.join(", ")),
        "extension_counts": summary.extension_counts,
    })
}

fn write_index(tera: &Tera, output: &Path, diff: &ProjectDiff, pages: &[String], runs: [&RunOutcome; 2], summaries: &[::serde_json::Value]) -> Result<()> {
    let files = diff.affected_files()
        .iter()
        .zip(pages)
        .map(|(path, page)| {
            let (first, second) = diff.records(path);
            let file_diff = FileDiff::new(first, second);
            IndexRow {
                path: path.to_string_lossy().into_owned(),
                page,
                runs: [
                    IndexCell {
                        percentage: percentage(first),
                        diff: !file_diff.only_in_first.is_empty(),
                    },
                    IndexCell {
                        percentage: percentage(second),
                        diff: !file_diff.only_in_second.is_empty(),
                    },
                ],
                has_diff: file_diff.has_diff(),
            }
        })
        .collect::<Vec<_>>();

    let mut context = Context::new();
    context.insert("tests", &[runs[0].test.as_str(), runs[1].test.as_str()]);
    context.insert("summaries", summaries);
    context.insert("files", &files);
    context.insert("diff_count", &files.iter().filter(|f| f.has_diff).count());

    let rendered = tera.render(template::INDEX, &context)?;
    File::create(output)?.write_all(rendered.as_bytes())?;
    Ok(())
}

#[test]
fn test_parse_formats() {
    assert_eq!(Formats::from_multi_str("html".split(',')).unwrap(), Formats::HTML);
    assert_eq!(Formats::from_multi_str("json,html".split(',')).unwrap(), Formats::HTML | Formats::JSON);
    assert_eq!(Formats::from_multi_str("all".split(',')).unwrap(), Formats::all());
    assert!(Formats::from_multi_str("html,pdf".split(',')).is_err());
}

#[test]
fn test_page_names_follow_affected_order() {
    let affected = vec![PathBuf::from("/w/include/util.h"), PathBuf::from("/w/src/main.c"), PathBuf::from("/w/src/util.h")];
    assert_eq!(page_names(&affected), vec!["util.h.html", "main.c.html", "util.h_1.html"]);
    assert_eq!(page_names(&affected), page_names(&affected));
}

#[test]
fn test_base_name() {
    assert_eq!(base_name(Path::new("/w/src/main.c")), "main.c");
    assert_eq!(base_name(Path::new("/")), "source");
}
