//! Contains helpers and things that are used by all nagios2mantis executables.
mod logging;

pub use logging::{init_logging, LogArgs, LogFormat, LogLevel};

/// A return type indicating that a function cannot return.
pub enum Never {}

/// Executes the given `run_fn` and exits the process with its outcome.
/// This function will never return, so a typical `fn main` will have this as the last
/// line. Argument parsing and logging setup are left up to the caller.
/// Returning an `Err` will cause the error and its chain of causes to be logged, and the
/// application will exit with a code of `1`. A function may instead return `Success::Exit`
/// with a non-zero code, in cases where it wishes to opt out of the default error handling.
pub fn run_cli_main<A, S, F>(args: A, run_fn: F) -> Never
where
    F: FnOnce(A) -> Result<S, anyhow::Error>,
    S: Into<Success>,
{
    match run_fn(args).map(Into::<Success>::into) {
        Ok(Success::Exit(code)) => std::process::exit(code),
        Err(error) => {
            tracing::error!(error = ?error, "execution failed");
            std::process::exit(1);
        }
    }
}

/// Represents the successful execution of a program or subcommand.
#[derive(Debug, PartialEq)]
pub enum Success {
    /// Program should immediately exit with the given code.
    Exit(i32),
}

impl From<()> for Success {
    fn from(_: ()) -> Self {
        Success::Exit(0)
    }
}
