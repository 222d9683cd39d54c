//! Additional methods for libstd and external crates.

use error::{ErrorKind, Result, ResultExt};

use natord::compare_iter;

use std::cmp::Ordering;
use std::ffi::OsStr;
use std::fs::create_dir_all;
#[cfg(unix)]
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

pub trait CommandExt {
    /// Runs the command with inherited stderr, failing if it does not exit successfully.
    fn ensure_success(&mut self, name: &str) -> Result<()>;

    /// Runs the command with captured output. The captured stderr is logged when the command fails.
    fn ensure_success_quietly(&mut self, name: &str) -> Result<()>;
}

impl CommandExt for Command {
    fn ensure_success(&mut self, name: &str) -> Result<()> {
        debug!("running {:?}", self);
        let status = self.status().chain_err(|| format!("cannot run {}", name))?;
        ensure!(status.success(), ErrorKind::CommandFailed(name.to_owned(), status));
        Ok(())
    }

    fn ensure_success_quietly(&mut self, name: &str) -> Result<()> {
        debug!("running {:?}", self);
        let output = self.stdin(Stdio::null()).output().chain_err(|| format!("cannot run {}", name))?;
        if !output.status.success() {
            warn!("{} failed:\n{}", name, String::from_utf8_lossy(&output.stderr));
            bail!(ErrorKind::CommandFailed(name.to_owned(), output.status));
        }
        Ok(())
    }
}

/// Creates a report directory, refusing to reuse one which already exists.
pub fn create_fresh_dir(path: &Path) -> Result<()> {
    ensure!(!path.exists(), ErrorKind::OutputDirectoryExists(path.to_owned()));
    create_dir_all(path).chain_err(|| format!("cannot create `{}`", path.display()))?;
    Ok(())
}

/// Finds `dir/«stem».«extension»`, or `dir/«stem»_1.«extension»`, `dir/«stem»_2.«extension»`... if it is taken.
pub fn unique_path(dir: &Path, stem: &str, extension: &str) -> PathBuf {
    let mut path = dir.join(format!("{}.{}", stem, extension));
    let mut suffix = 1;
    while path.exists() {
        path.set_file_name(format!("{}_{}.{}", stem, suffix, extension));
        suffix += 1;
    }
    path
}

/// The final component of a path as a string. Empty if the path terminates in `..`.
pub fn file_name_lossy(path: &Path) -> String {
    path.file_name().map_or_else(String::new, |s| s.to_string_lossy().into_owned())
}

/// The extension of a path including the leading dot, or the empty string if it has none.
pub fn dotted_extension<S: AsRef<OsStr> + ?Sized>(path: &S) -> String {
    match Path::new(path).extension() {
        Some(ext) => format!(".{}", ext.to_string_lossy()),
        None => String::new(),
    }
}

macro_rules! do_compare {
    ($lhs:expr, $rhs:expr, $digit:expr) => {
        compare_iter($lhs, $rhs, |_| false, |a, b| a.cmp(b), $digit)
    }
}

/// Compares two paths using natural sorting.
#[cfg(unix)]
pub fn compare_naturally(lhs: &Path, rhs: &Path) -> Ordering {
    let lhs = lhs.as_os_str().as_bytes().iter();
    let rhs = rhs.as_os_str().as_bytes().iter();
    do_compare!(lhs, rhs, |c: &&u8| match **c {
        b @ b'0'..=b'9' => Some((b - b'0') as isize),
        _ => None,
    })
}

/// Compares two paths using natural sorting.
#[cfg(not(unix))]
pub fn compare_naturally(lhs: &Path, rhs: &Path) -> Ordering {
    let lhs = lhs.to_string_lossy();
    let rhs = rhs.to_string_lossy();
    do_compare!(lhs.chars(), rhs.chars(), |c: &char| c.to_digit(10).map(|d| d as isize))
}

#[test]
fn test_compare_naturally() {
    let mut paths = vec![Path::new("/p/f10.c"), Path::new("/p/f2.c"), Path::new("/p/F1.c"), Path::new("/p/f1.c")];
    paths.sort_by(|a, b| compare_naturally(a, b));
    assert_eq!(paths, vec![Path::new("/p/F1.c"), Path::new("/p/f1.c"), Path::new("/p/f2.c"), Path::new("/p/f10.c")]);
}

#[test]
fn test_dotted_extension() {
    assert_eq!(dotted_extension("/p/a.c"), ".c");
    assert_eq!(dotted_extension("include/x.tar.h"), ".h");
    assert_eq!(dotted_extension("/usr/include/c++/11/vector"), "");
    assert_eq!(dotted_extension("/p/.hidden"), "");
}

#[test]
fn test_unique_path() {
    extern crate tempfile;
    use std::fs::File;

    let dir = tempfile::tempdir().unwrap();
    let first = unique_path(dir.path(), "a", "json");
    assert_eq!(first, dir.path().join("a.json"));
    File::create(&first).unwrap();
    let second = unique_path(dir.path(), "a", "json");
    assert_eq!(second, dir.path().join("a_1.json"));
}
