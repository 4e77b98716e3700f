// src/exec/runner.rs

//! Shell-backed command runner.

use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::process::{Child, Command};
use tracing::debug;

use super::CommandRunner;

/// Runs the command through `<shell> -c <command>` (`cmd /C` on Windows).
///
/// The child inherits stdout/stderr so its output shows up next to the
/// watcher's logs; stdin is closed. The child is never awaited and is left
/// running if the watcher exits first.
#[derive(Debug, Clone)]
pub struct ShellCommandRunner {
    shell: String,
}

impl ShellCommandRunner {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }

    /// Build the process invocation for `command`.
    pub fn command_for(&self, command: &str) -> Command {
        let flag = if cfg!(windows) && self.shell.eq_ignore_ascii_case("cmd") {
            "/C"
        } else {
            "-c"
        };

        let mut cmd = Command::new(&self.shell);
        cmd.arg(flag)
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(false);
        cmd
    }

    fn launch(&self, command: &str) -> Result<Child> {
        self.command_for(command)
            .spawn()
            .with_context(|| format!("spawning `{} -c {}`", self.shell, command))
    }
}

impl CommandRunner for ShellCommandRunner {
    fn spawn(&self, command: &str) {
        match self.launch(command) {
            // Dropping the handle detaches the child; tokio reaps it in the background.
            Ok(child) => debug!(pid = ?child.id(), "command launched"),
            Err(err) => debug!(error = %err, "command failed to launch"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn builds_shell_dash_c_invocation() {
        let runner = ShellCommandRunner::new("sh");
        let cmd = runner.command_for("echo hi");
        let std_cmd = cmd.as_std();

        assert_eq!(std_cmd.get_program(), "sh");
        let args: Vec<_> = std_cmd.get_args().collect();
        assert_eq!(args, vec!["-c", "echo hi"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn spawned_command_runs_without_being_awaited() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran");
        let runner = ShellCommandRunner::new("sh");

        runner.spawn(&format!("touch '{}'", marker.display()));

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while !marker.exists() && std::time::Instant::now() < deadline {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        assert!(marker.exists());
    }

    #[tokio::test]
    async fn missing_shell_does_not_panic() {
        let runner = ShellCommandRunner::new("/definitely/not/a/shell");
        runner.spawn("echo hi");
    }
}
