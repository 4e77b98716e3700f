// src/exec/mod.rs

//! Process execution layer.
//!
//! The dispatcher talks to a [`CommandRunner`] instead of spawning processes
//! itself, so tests can swap in a recording fake.
//!
//! - [`runner`] provides `ShellCommandRunner`, the production implementation
//!   that hands the command to a shell via `tokio::process::Command`.

pub mod runner;

pub use runner::ShellCommandRunner;

/// Trait abstracting how the configured command is launched.
///
/// Launching is fire-and-forget: implementations must not block on the
/// spawned process, and nothing about its outcome flows back.
pub trait CommandRunner: Send {
    fn spawn(&self, command: &str);
}
