// src/dispatch.rs

//! Watch dispatcher: registration + the change-to-command loop.
//!
//! Setup registers every directory of every watched root, one registration
//! per directory, and fails as a whole if any single registration fails.
//!
//! The run loop then alternates between two states:
//! - waiting: blocked on [`NotificationService::take_next_batch`] (or the
//!   shutdown future),
//! - dispatching: for each event of the batch, log it and launch the command
//!   once, then re-arm the batch's directory.
//!
//! A directory that cannot be re-armed is dropped and the loop carries on.
//! Any failure of the notification service itself ends the loop with an
//! error.

use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;

use tracing::{debug, error, info, warn};

use crate::config::StalkConfig;
use crate::errors::{Result, StalkError};
use crate::exec::CommandRunner;
use crate::fs::FileSystem;
use crate::tree::{enumerate, IgnoreSet};
use crate::watch::{ChangeEvent, EventBatch, NotificationService};

/// Human-readable description of a change, e.g. `CREATE src/main.rs`.
pub fn describe(event: &ChangeEvent) -> String {
    format!("{} {}", event.kind, event.path().display())
}

/// Owns the notification service and the command runner for the lifetime of
/// the watch.
pub struct Dispatcher<N: NotificationService, R: CommandRunner> {
    service: N,
    runner: R,
    command: String,
    watched: Vec<PathBuf>,
}

impl<N: NotificationService, R: CommandRunner> fmt::Debug for Dispatcher<N, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("command", &self.command)
            .field("watched", &self.watched)
            .finish_non_exhaustive()
    }
}

/// What woke the run loop up.
enum Wakeup {
    Shutdown,
    Next(Result<Option<EventBatch>>),
}

impl<N: NotificationService, R: CommandRunner> Dispatcher<N, R> {
    /// Enumerate every root in `config` and register each directory found.
    ///
    /// A directory reached from two overlapping roots is registered once.
    /// The first registration failure aborts setup with
    /// [`StalkError::Setup`] naming the offending path.
    pub fn setup(
        config: &StalkConfig,
        fs: &dyn FileSystem,
        mut service: N,
        runner: R,
    ) -> Result<Self> {
        let ignore = IgnoreSet::new(&config.ignore)?;

        let mut watched = Vec::new();
        let mut seen = HashSet::new();

        for root in &config.roots {
            for dir in enumerate(fs, root, &ignore) {
                if !seen.insert(dir.clone()) {
                    debug!(path = %dir.display(), "already registered via another root");
                    continue;
                }
                service.register(&dir).map_err(|err| StalkError::Setup {
                    path: dir.clone(),
                    source: Box::new(err),
                })?;
                watched.push(dir);
            }
        }

        for path in &watched {
            info!("Listening for changes to {}...", path.display());
        }
        info!(
            "Configured to execute '{}' whenever a change occurs",
            config.command
        );

        Ok(Self {
            service,
            runner,
            command: config.command.clone(),
            watched,
        })
    }

    /// Directories currently being watched, in registration order.
    pub fn watched(&self) -> &[PathBuf] {
        &self.watched
    }

    /// Run until `shutdown` resolves (`Ok`) or the notification service
    /// fails (`Err`).
    pub async fn run<F>(mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            let wakeup = tokio::select! {
                biased;
                _ = &mut shutdown => Wakeup::Shutdown,
                next = self.service.take_next_batch() => Wakeup::Next(next),
            };

            match wakeup {
                Wakeup::Shutdown => {
                    info!("shutdown requested; stopping watch");
                    self.service.close();
                    return Ok(());
                }
                Wakeup::Next(Ok(Some(batch))) => self.dispatch(batch),
                Wakeup::Next(Ok(None)) => {
                    error!("notification service closed unexpectedly");
                    self.service.close();
                    return Err(StalkError::Watch(
                        "notification service stopped producing events".to_string(),
                    ));
                }
                Wakeup::Next(Err(err)) => {
                    error!(error = %err, "notification service failed");
                    self.service.close();
                    return Err(err);
                }
            }
        }
    }

    /// Handle one batch: one command launch per event, then re-arm.
    fn dispatch(&mut self, batch: EventBatch) {
        for event in &batch.events {
            info!(
                kind = %event.kind,
                directory = %event.directory.display(),
                entry = %event.entry.to_string_lossy(),
                "Noticed the following change: {}",
                describe(event)
            );
            self.runner.spawn(&self.command);
        }

        if self.service.rearm(&batch.directory) {
            return;
        }

        warn!(
            path = %batch.directory.display(),
            "directory can no longer be watched; dropping it"
        );
        self.watched.retain(|p| p != &batch.directory);
        if self.watched.is_empty() {
            warn!("no directories left to watch");
        }
    }
}
