//! Errors related to the `covdiff` crate.
//!
//! Please see documentation of the [`error-chain` crate](https://docs.rs/error-chain/0.12.4/error_chain/) for detailed
//! usage.

use std::path::PathBuf;
use std::process::ExitStatus;

error_chain! {
    foreign_links {
        Io(::std::io::Error) /** Wrapper of standard I/O error. */;
        Json(::serde_json::Error) /** Wrapper of JSON error. */;
        Tera(::tera::Error) /** Wrapper of template rendering error. */;
        WalkDir(::walkdir::Error) /** Wrapper of directory traversal error. */;
    }

    errors {
        /// A `*.gcda` was found but the `*.gcno` produced by the same build is absent. The build tree is inconsistent
        /// (partially cleaned or rebuilt with different flags), so the run cannot continue.
        MissingCompanion(gcno: PathBuf, gcda: PathBuf) {
            description("missing *.gcno for a *.gcda")
            display("`{}` does not exist (the *.gcda was found at `{}`)", gcno.display(), gcda.display())
        }

        /// Neither `<stem>.gcda` nor `<file name>.gcda` exists in the object directory given for a targeted run.
        MissingCounterData(object_path: PathBuf, source_file: PathBuf) {
            description("no *.gcda for the target source file")
            display("no *.gcda corresponding to `{}` found in `{}`", source_file.display(), object_path.display())
        }

        /// `gcov` finished successfully but the `*.gcov.json.gz` it should have written is absent.
        MissingJsonReport(path: PathBuf) {
            description("gcov did not produce a JSON report")
            display("the JSON report `{}` does not exist", path.display())
        }

        /// An external program exited with a non-zero status.
        CommandFailed(name: String, status: ExitStatus) {
            description("command failed")
            display("{} exited with status {}", name, status)
        }

        /// The report directory already exists, typically from a previous invocation.
        OutputDirectoryExists(path: PathBuf) {
            description("report directory already exists")
            display("`{}` already exists, remove it or choose another destination", path.display())
        }

        /// A JSON report does not follow the gcov schema.
        InvalidReport(path: PathBuf) {
            description("invalid gcov JSON report")
            display("`{}` is not a valid gcov JSON report", path.display())
        }
    }
}
