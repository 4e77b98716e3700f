// src/watch/mod.rs

//! Filesystem notification seam.
//!
//! The dispatcher talks to a [`NotificationService`] rather than to `notify`
//! directly, mirroring how the OS primitive is used: one registration per
//! directory, a blocking "take next batch", and an explicit re-arm after each
//! batch. [`NotifyService`] is the production implementation; tests provide
//! scripted fakes.

pub mod event;
pub mod notifier;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use crate::errors::Result;

pub use event::{ChangeEvent, ChangeKind, EventBatch};
pub use notifier::NotifyService;

/// Per-directory notification service for create/delete/modify events.
pub trait NotificationService: Send {
    /// Start watching the direct entries of `dir` (not its subtree).
    fn register(&mut self, dir: &Path) -> Result<()>;

    /// Wait (without timeout) for the next batch of events.
    ///
    /// - `Ok(Some(batch))`: events for one registered directory.
    /// - `Ok(None)`: the service is closed and will never produce more.
    /// - `Err(_)`: the service itself failed.
    ///
    /// Implementations must be cancellation safe: dropping the future before
    /// it resolves must not lose events.
    fn take_next_batch(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = Result<Option<EventBatch>>> + Send + '_>>;

    /// Re-enable `dir` after its batch was handled.
    ///
    /// Returns `false` when the directory can no longer be watched; it is
    /// then dropped from the service for good.
    fn rearm(&mut self, dir: &Path) -> bool;

    /// Release every registration.
    fn close(&mut self);

    /// Currently registered directories, in registration order.
    fn registered(&self) -> Vec<PathBuf>;
}
