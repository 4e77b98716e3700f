// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File,
    Dir(Vec<String>), // List of child names
    Symlink(PathBuf),
}

#[derive(Debug, Default)]
struct MockState {
    entries: HashMap<PathBuf, MockEntry>,
    unreadable: HashSet<PathBuf>,
}

/// In-memory directory tree for enumeration tests.
///
/// Parent directories are created implicitly. Child order is insertion order,
/// which stands in for the platform-defined listing order.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    state: Arc<Mutex<MockState>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let mut state = self.state.lock().unwrap();
        ensure_dir_entry(&mut state.entries, path.as_ref());
    }

    pub fn add_file(&self, path: impl AsRef<Path>) {
        self.insert_leaf(path.as_ref(), MockEntry::File);
    }

    /// Add a symbolic link at `path` pointing at `target`.
    pub fn add_symlink(&self, path: impl AsRef<Path>, target: impl Into<PathBuf>) {
        self.insert_leaf(path.as_ref(), MockEntry::Symlink(target.into()));
    }

    /// Make listing `path` fail, as with a permission-denied directory.
    pub fn deny(&self, path: impl AsRef<Path>) {
        let mut state = self.state.lock().unwrap();
        state.unreadable.insert(path.as_ref().to_path_buf());
    }

    fn insert_leaf(&self, path: &Path, entry: MockEntry) {
        let mut state = self.state.lock().unwrap();
        if let Some(parent) = non_empty_parent(path) {
            ensure_dir_entry(&mut state.entries, parent);
            link_child(&mut state.entries, parent, path);
        }
        state.entries.insert(path.to_path_buf(), entry);
    }

    /// Follow symlinks until a non-link entry (or a dangling/looping link).
    fn resolve(&self, path: &Path) -> Option<MockEntry> {
        let state = self.state.lock().unwrap();
        let mut current = path.to_path_buf();
        let mut seen = HashSet::new();
        loop {
            match state.entries.get(&current) {
                Some(MockEntry::Symlink(target)) => {
                    if !seen.insert(current.clone()) {
                        return None;
                    }
                    current = target.clone();
                }
                other => return other.cloned(),
            }
        }
    }
}

fn non_empty_parent(path: &Path) -> Option<&Path> {
    path.parent().filter(|p| !p.as_os_str().is_empty())
}

fn ensure_dir_entry(entries: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
    if entries.contains_key(path) {
        return;
    }
    entries.insert(path.to_path_buf(), MockEntry::Dir(Vec::new()));
    if let Some(parent) = non_empty_parent(path) {
        ensure_dir_entry(entries, parent);
        link_child(entries, parent, path);
    }
}

fn link_child(entries: &mut HashMap<PathBuf, MockEntry>, parent: &Path, child: &Path) {
    if let Some(MockEntry::Dir(children)) = entries.get_mut(parent) {
        if let Some(name) = child.file_name().and_then(|n| n.to_str()) {
            if !children.iter().any(|c| c == name) {
                children.push(name.to_string());
            }
        }
    }
}

impl FileSystem for MockFileSystem {
    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.resolve(path), Some(MockEntry::Dir(_)))
    }

    fn is_symlink(&self, path: &Path) -> bool {
        let state = self.state.lock().unwrap();
        matches!(state.entries.get(path), Some(MockEntry::Symlink(_)))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        {
            let state = self.state.lock().unwrap();
            if state.unreadable.contains(path) {
                return Err(anyhow!("Permission denied: {:?}", path));
            }
        }
        match self.resolve(path) {
            Some(MockEntry::Dir(children)) => {
                Ok(children.iter().map(|name| path.join(name)).collect())
            }
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }
}
