// src/watch/event.rs

//! Change events as seen by the dispatcher.

use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;

/// Kind of change reported for an entry of a watched directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Create,
    Delete,
    Modify,
}

impl ChangeKind {
    pub fn label(self) -> &'static str {
        match self {
            ChangeKind::Create => "CREATE",
            ChangeKind::Delete => "DELETE",
            ChangeKind::Modify => "MODIFY",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One change to one entry inside a registered directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    /// The registered directory the change happened in.
    pub directory: PathBuf,
    /// Name of the affected entry within `directory`.
    pub entry: OsString,
}

impl ChangeEvent {
    pub fn new(kind: ChangeKind, directory: impl Into<PathBuf>, entry: impl Into<OsString>) -> Self {
        Self {
            kind,
            directory: directory.into(),
            entry: entry.into(),
        }
    }

    /// Full path of the affected entry.
    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.entry)
    }
}

/// Events delivered together for one registration.
///
/// `events` may be empty: that happens when the only news about a directory
/// is that it disappeared, so all that is left to do is a (failing) re-arm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventBatch {
    pub directory: PathBuf,
    pub events: Vec<ChangeEvent>,
}

impl EventBatch {
    pub fn new(directory: impl Into<PathBuf>, events: Vec<ChangeEvent>) -> Self {
        Self {
            directory: directory.into(),
            events,
        }
    }
}
