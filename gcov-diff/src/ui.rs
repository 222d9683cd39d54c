//! Print colored text.
//!
//! Provides functions and macros that simulate the `cargo` output style.

use covdiff::RunOutcome;
use error::Error;

use termcolor::*;

use std::io::{Result, Write};

/// Prints a progress (green text), similar to the cargo output.
macro_rules! progress {
    ($tag:expr, $fmt:expr $(, $args:expr)*) => {{
        (|| -> ::std::io::Result<()> {
            use ::termcolor::*;
            use ::std::io::Write;
            let stream = StandardStream::stderr(ColorChoice::Auto);
            let mut lock = stream.lock();
            lock.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true))?;
            write!(lock, "{:>12} ", $tag)?;
            lock.reset()?;
            writeln!(lock, $fmt $(, $args)*)?;
            Ok(())
        })().unwrap_or(())
    }}
}

/// Prints a warning (yellow text), similar to cargo output.
macro_rules! warning {
    ($fmt:expr $(, $args:expr)*) => {{
        (|| -> ::std::io::Result<()> {
            use ::termcolor::*;
            use ::std::io::Write;
            let stream = StandardStream::stderr(ColorChoice::Auto);
            let mut lock = stream.lock();
            lock.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true))?;
            write!(lock, "warning: ")?;
            lock.reset()?;
            writeln!(lock, $fmt $(, $args)*)?;
            Ok(())
        })().unwrap_or(())
    }}
}

/// Prints an error and the causes.
pub fn print_error(error: &Error) -> Result<()> {
    let stream = StandardStream::stderr(ColorChoice::Auto);
    let mut lock = stream.lock();

    for (i, e) in error.iter().enumerate() {
        if i == 0 {
            lock.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_intense(true).set_bold(true))?;
            write!(lock, "error: ")?;
        } else {
            lock.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
            write!(lock, "caused by: ")?;
        }
        lock.reset()?;
        writeln!(lock, "{}", e)?;
    }
    if let Some(backtrace) = error.backtrace() {
        writeln!(lock, "\n{:?}", backtrace)?;
    }
    Ok(())
}

/// Prints the summary of a run to stdout, headed by the test name in bold.
pub fn print_summary(outcome: &RunOutcome) -> Result<()> {
    let stream = StandardStream::stdout(ColorChoice::Auto);
    let mut lock = stream.lock();

    lock.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true))?;
    write!(lock, "Summary of ")?;
    lock.set_color(ColorSpec::new().set_bold(true))?;
    writeln!(lock, "{}", outcome.test)?;
    lock.reset()?;
    writeln!(lock, "{}\n", outcome.summary)?;
    Ok(())
}

#[test]
fn test_print_error_chain() {
    use error::{ErrorKind, ResultExt};

    let result: ::std::result::Result<(), Error> = Err(ErrorKind::ObjectPathWithoutSourceFile.into());
    let error = result.chain_err(|| "cannot parse the command line").unwrap_err();
    assert_eq!(error.iter().count(), 2);
    print_error(&error).unwrap();
}
