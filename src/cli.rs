// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::error::ErrorKind;
use clap::{Parser, ValueEnum};

/// One-line usage message printed next to any argument error.
pub const USAGE: &str = "USAGE: stalk dir1 [dir2...dirN] command";

/// Command-line arguments for `stalk`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "stalk",
    version,
    about = "Recursively watch directories and run a shell command on every change.",
    long_about = None
)]
pub struct CliArgs {
    /// Directories to watch recursively, followed by the command to run.
    ///
    /// The last value is the command; it is handed verbatim to the shell on
    /// every detected change.
    #[arg(
        required = true,
        num_args = 2..,
        value_name = "DIR... COMMAND"
    )]
    pub args: Vec<String>,

    /// Shell used to run the command (invoked as `<shell> -c <command>`).
    #[arg(long, value_name = "SHELL", env = "STALK_SHELL")]
    pub shell: Option<String>,

    /// Skip directories whose name or path matches this glob.
    ///
    /// May be given multiple times, e.g. `--ignore target --ignore '.git'`.
    #[arg(long, value_name = "GLOB")]
    pub ignore: Vec<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `STALK_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::try_parse()`.
pub fn try_parse() -> Result<CliArgs, clap::Error> {
    CliArgs::try_parse()
}

/// Whether a clap error is really a `--help` / `--version` request.
pub fn is_informational(err: &clap::Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_every_positional_in_order() {
        let args = CliArgs::try_parse_from(["stalk", "src", "tests", "cargo test"]).unwrap();
        assert_eq!(args.args, vec!["src", "tests", "cargo test"]);
        assert!(args.ignore.is_empty());
    }

    #[test]
    fn single_positional_is_rejected() {
        let err = CliArgs::try_parse_from(["stalk", "src"]).unwrap_err();
        assert!(!is_informational(&err));
    }

    #[test]
    fn no_positional_is_rejected() {
        let err = CliArgs::try_parse_from(["stalk"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn ignore_can_repeat() {
        let args = CliArgs::try_parse_from([
            "stalk", "--ignore", "target", "--ignore", ".git", "src", "make",
        ])
        .unwrap();
        assert_eq!(args.ignore, vec!["target", ".git"]);
    }
}
