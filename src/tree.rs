// src/tree.rs

//! Directory tree enumeration.
//!
//! [`enumerate`] turns a watched root into the list of directories that need
//! their own registration: the root itself plus every nested directory.
//! Files are never returned; they are covered by watching their parent.
//!
//! Symbolic links to directories are skipped entirely (neither returned nor
//! descended into), which keeps the walk finite even when a link points back
//! up the tree.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{debug, trace};

use crate::errors::{Result, StalkError};
use crate::fs::FileSystem;

/// Compiled `--ignore` globs.
///
/// A directory is pruned (with its whole subtree) when either its final path
/// component or its full path matches one of the globs.
#[derive(Debug, Clone)]
pub struct IgnoreSet {
    set: Option<GlobSet>,
}

impl IgnoreSet {
    /// Compile `patterns`; an empty list ignores nothing.
    pub fn new(patterns: &[String]) -> Result<Self> {
        if patterns.is_empty() {
            return Ok(Self::empty());
        }

        let mut builder = GlobSetBuilder::new();
        for pat in patterns {
            let glob = Glob::new(pat)
                .map_err(|e| StalkError::InvalidPattern(format!("{pat}: {e}")))?;
            builder.add(glob);
        }
        let set = builder
            .build()
            .map_err(|e| StalkError::InvalidPattern(e.to_string()))?;

        Ok(Self { set: Some(set) })
    }

    pub fn empty() -> Self {
        Self { set: None }
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        let Some(set) = &self.set else {
            return false;
        };
        if path.file_name().is_some_and(|name| set.is_match(name)) {
            return true;
        }
        set.is_match(path)
    }
}

impl Default for IgnoreSet {
    fn default() -> Self {
        Self::empty()
    }
}

/// Enumerate `root` and every directory nested under it, parents first.
///
/// - The root is always the first element, even if it does not exist or is
///   not a directory; registering it is where such a root fails.
/// - Children follow the order of the underlying listing.
/// - A directory whose listing fails (e.g. permission denied) is still
///   returned, but contributes no children.
pub fn enumerate(fs: &dyn FileSystem, root: &Path, ignore: &IgnoreSet) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    // Explicit stack so arbitrarily deep trees cannot overflow the call stack.
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let children = subdirectories(fs, &dir, ignore);
        dirs.push(dir);
        // Reverse so the first listed child is visited next.
        stack.extend(children.into_iter().rev());
    }

    debug!(root = %root.display(), count = dirs.len(), "enumerated directory tree");
    dirs
}

/// Immediate child directories of `dir` that should be watched.
fn subdirectories(fs: &dyn FileSystem, dir: &Path, ignore: &IgnoreSet) -> Vec<PathBuf> {
    let entries = match fs.read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            debug!(path = %dir.display(), error = %err, "cannot list directory; treating it as a leaf");
            return Vec::new();
        }
    };

    entries
        .into_iter()
        .filter(|entry| {
            if fs.is_symlink(entry) {
                trace!(path = %entry.display(), "skipping symbolic link");
                return false;
            }
            if !fs.is_dir(entry) {
                return false;
            }
            if ignore.is_ignored(entry) {
                debug!(path = %entry.display(), "ignoring directory");
                return false;
            }
            true
        })
        .collect()
}
