// src/config.rs

//! Validated runtime configuration.
//!
//! The CLI hands us a flat list of positionals; here we split it into watch
//! roots and the command, and resolve the shell to run the command with.

use std::path::PathBuf;

use crate::cli::CliArgs;
use crate::errors::{Result, StalkError};

/// Shell used when neither `--shell` nor `STALK_SHELL` is given.
#[cfg(windows)]
pub const DEFAULT_SHELL: &str = "cmd";
#[cfg(not(windows))]
pub const DEFAULT_SHELL: &str = "sh";

/// Everything the dispatcher needs to start watching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StalkConfig {
    /// Watched roots, in command-line order.
    pub roots: Vec<PathBuf>,
    /// Literal command executed on every change.
    pub command: String,
    /// Shell program the command is passed to.
    pub shell: String,
    /// Globs pruning directories from enumeration.
    pub ignore: Vec<String>,
}

impl StalkConfig {
    /// Build a config from already-parsed CLI arguments.
    pub fn from_args(args: &CliArgs) -> Result<Self> {
        let shell = args
            .shell
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SHELL)
            .to_string();

        Self::new(args.args.clone(), shell, args.ignore.clone())
    }

    /// Split `positionals` into roots + command and validate them.
    pub fn new(mut positionals: Vec<String>, shell: String, ignore: Vec<String>) -> Result<Self> {
        if positionals.len() < 2 {
            return Err(StalkError::Usage(
                "Please specify at least one file or directory to watch followed by a command to execute"
                    .to_string(),
            ));
        }

        // len >= 2, so both the pop and the remaining roots are non-empty.
        let command = positionals.pop().unwrap_or_default();
        if command.trim().is_empty() {
            return Err(StalkError::Usage("the command to execute is empty".to_string()));
        }

        let roots = positionals.into_iter().map(PathBuf::from).collect();

        Ok(Self {
            roots,
            command,
            shell,
            ignore,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn last_positional_is_the_command() {
        let cfg = StalkConfig::new(strings(&["a", "b", "echo hi"]), "sh".into(), vec![]).unwrap();
        assert_eq!(cfg.roots, vec![PathBuf::from("a"), PathBuf::from("b")]);
        assert_eq!(cfg.command, "echo hi");
    }

    #[test]
    fn single_positional_is_a_usage_error() {
        let err = StalkConfig::new(strings(&["a"]), "sh".into(), vec![]).unwrap_err();
        assert!(matches!(err, StalkError::Usage(_)));
    }

    #[test]
    fn blank_command_is_a_usage_error() {
        let err = StalkConfig::new(strings(&["a", "  "]), "sh".into(), vec![]).unwrap_err();
        assert!(matches!(err, StalkError::Usage(msg) if msg.contains("empty")));
    }
}
