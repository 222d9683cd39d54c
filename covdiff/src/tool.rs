//! External programs the aggregator depends on.
//!
//! Both are hidden behind a trait, so that the aggregation logic can be exercised without spawning anything:
//!
//! * [`CounterDump`] turns a `*.gcda` into a [`GcovReport`]. The real implementation is [`GcovTool`].
//! * [`TestRunner`] runs a test which leaves `*.gcda` files behind. The real implementation is [`TestCommand`].
//!
//! [`CounterDump`]: ./trait.CounterDump.html
//! [`GcovReport`]: ../gcov/struct.GcovReport.html
//! [`GcovTool`]: ./struct.GcovTool.html
//! [`TestRunner`]: ./trait.TestRunner.html
//! [`TestCommand`]: ./struct.TestCommand.html

use error::{ErrorKind, Result, ResultExt};
use gcov::GcovReport;
use utils::{CommandExt, file_name_lossy, unique_path};

use flate2::read::GzDecoder;

use std::env::current_dir;
use std::ffi::{OsStr, OsString};
use std::fs::{File, create_dir_all, remove_file};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Produces the JSON coverage report of a `*.gcda`.
pub trait CounterDump {
    fn dump(&self, gcda: &Path) -> Result<GcovReport>;
}

/// Runs a test identified by name.
pub trait TestRunner {
    fn run_test(&self, test: &str) -> Result<()>;
}

/// Invokes `gcov --json-format` on a `*.gcda`.
///
/// `gcov` writes `«stem».gcov.json.gz` into its working directory, so the tool is run inside `output_dir`. The archive
/// is decoded and deleted right after.
#[derive(Clone, Debug)]
pub struct GcovTool {
    program: OsString,
    output_dir: PathBuf,
    keep_json_dir: Option<PathBuf>,
}

impl GcovTool {
    pub fn new<S: Into<OsString>, P: Into<PathBuf>>(program: S, output_dir: P) -> GcovTool {
        GcovTool {
            program: program.into(),
            output_dir: output_dir.into(),
            keep_json_dir: None,
        }
    }

    /// Keeps an uncompressed copy of every decoded report inside `dir`.
    pub fn keep_json_in<P: Into<PathBuf>>(mut self, dir: P) -> GcovTool {
        self.keep_json_dir = Some(dir.into());
        self
    }

    /// The archive `gcov` produces for a `*.gcda`.
    fn archive_path(&self, gcda: &Path) -> PathBuf {
        let mut name = gcda.file_stem().unwrap_or_else(|| OsStr::new("?")).to_owned();
        name.push(".gcov.json.gz");
        self.output_dir.join(name)
    }

    fn keep_json(&self, gcda: &Path, json: &[u8]) -> Result<()> {
        if let Some(ref dir) = self.keep_json_dir {
            create_dir_all(dir)?;
            let stem = gcda.file_stem().map_or_else(String::new, |s| s.to_string_lossy().into_owned());
            let path = unique_path(dir, &stem, "gcov.json");
            trace!("keeping {:?}", path);
            File::create(&path)?.write_all(json)?;
        }
        Ok(())
    }
}

impl CounterDump for GcovTool {
    fn dump(&self, gcda: &Path) -> Result<GcovReport> {
        let gcda = if gcda.is_absolute() {
            gcda.to_owned()
        } else {
            current_dir()?.join(gcda)
        };

        create_dir_all(&self.output_dir)?;
        Command::new(&self.program) // @rustfmt-force-break
            .current_dir(&self.output_dir)
            .stdout(Stdio::null())
            .args(&["--no-output", "--json-format", "--branch-probabilities", "--demangled-names"])
            .arg(&gcda)
            .ensure_success_quietly("gcov")?;

        let archive = self.archive_path(&gcda);
        ensure!(archive.is_file(), ErrorKind::MissingJsonReport(archive));

        let json = take_archive(&archive)?;
        self.keep_json(&gcda, &json)?;
        GcovReport::from_reader(&*json, &archive)
    }
}

/// Decompresses a `*.gcov.json.gz`. The archive is deleted even if it cannot be decoded.
fn take_archive(archive: &Path) -> Result<Vec<u8>> {
    let mut json = Vec::new();
    let decoded = File::open(archive).and_then(|f| GzDecoder::new(f).read_to_end(&mut json));
    remove_file(archive)?;
    decoded.chain_err(|| format!("cannot decompress `{}`", archive.display()))?;
    Ok(json)
}

/// Runs `«program» «test» «args»...`, or `«test» «args»...` when the program is `./`.
///
/// The test's stdout is discarded.
#[derive(Clone, Debug)]
pub struct TestCommand {
    program: OsString,
    args: Vec<OsString>,
}

impl TestCommand {
    pub fn new<S: Into<OsString>, I: IntoIterator<Item = S>>(program: S, args: I) -> TestCommand {
        TestCommand {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether the test itself is the executable.
    fn runs_test_directly(&self) -> bool {
        self.program == OsStr::new("./")
    }

    /// Splits the command line of a test into the program and its arguments.
    fn program_and_args(&self, test: &str) -> (OsString, Vec<OsString>) {
        let mut args = Vec::with_capacity(self.args.len() + 1);
        let program = if self.runs_test_directly() {
            let test_path = Path::new(test);
            if test_path.components().count() == 1 && !test_path.is_absolute() {
                Path::new(".").join(test_path).into_os_string()
            } else {
                test.into()
            }
        } else {
            args.push(test.into());
            self.program.clone()
        };
        args.extend(self.args.iter().cloned());
        (program, args)
    }

    /// The full command line which [`run_test()`] executes.
    ///
    /// [`run_test()`]: ./trait.TestRunner.html#tymethod.run_test
    pub fn command_line(&self, test: &str) -> Vec<OsString> {
        let (program, mut args) = self.program_and_args(test);
        args.insert(0, program);
        args
    }
}

impl TestRunner for TestCommand {
    fn run_test(&self, test: &str) -> Result<()> {
        let (program, args) = self.program_and_args(test);
        Command::new(&program) // @rustfmt-force-break
            .args(&args)
            .stdout(Stdio::null())
            .ensure_success(&format!("test `{}`", test))
            .chain_err(|| format!("running {} failed", file_name_lossy(Path::new(&program))))
    }
}

#[test]
fn test_command_line() {
    let cmd = TestCommand::new("ctest", vec!["-R", "--output-on-failure"]);
    assert_eq!(cmd.command_line("unit"), vec![OsString::from("ctest"), "unit".into(), "-R".into(), "--output-on-failure".into()]);

    let cmd = TestCommand::new("./", Vec::<&str>::new());
    assert_eq!(cmd.command_line("run_tests"), vec![OsString::from("./run_tests")]);
    assert_eq!(cmd.command_line("build/run_tests"), vec![OsString::from("build/run_tests")]);
    assert_eq!(cmd.command_line("/opt/t"), vec![OsString::from("/opt/t")]);
}

#[test]
fn test_archive_path() {
    let tool = GcovTool::new("gcov", "/tmp/out");
    assert_eq!(tool.archive_path(Path::new("/b/obj/main.c.gcda")), Path::new("/tmp/out/main.c.gcov.json.gz"));
    assert_eq!(tool.archive_path(Path::new("/b/obj/util.gcda")), Path::new("/tmp/out/util.gcov.json.gz"));
}

#[test]
fn test_take_archive_always_removes_it() {
    extern crate tempfile;
    use flate2::Compression;
    use flate2::write::GzEncoder;

    let dir = tempfile::tempdir().unwrap();

    let good = dir.path().join("good.gcov.json.gz");
    let mut encoder = GzEncoder::new(File::create(&good).unwrap(), Compression::default());
    encoder.write_all(b"{\"files\": []}").unwrap();
    encoder.finish().unwrap();
    assert_eq!(take_archive(&good).unwrap(), b"{\"files\": []}".to_vec());
    assert!(!good.exists());

    let corrupt = dir.path().join("corrupt.gcov.json.gz");
    File::create(&corrupt).unwrap().write_all(b"not a gzip stream").unwrap();
    assert!(take_archive(&corrupt).is_err());
    assert!(!corrupt.exists());
}
