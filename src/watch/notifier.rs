// src/watch/notifier.rs

//! `notify`-backed [`NotificationService`].
//!
//! Every directory gets its own `RecursiveMode::NonRecursive` watch. Raw
//! `notify` events are forwarded from the (synchronous) notify callback into
//! a tokio channel, then routed to the registered directory they belong to
//! and grouped into per-directory batches.

use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::errors::{Result, StalkError};
use crate::watch::{ChangeEvent, ChangeKind, EventBatch, NotificationService};

/// One routed unit of work waiting to be handed out in a batch.
///
/// `event == None` means "re-arm `directory`" without an event attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Pending {
    pub directory: PathBuf,
    pub event: Option<ChangeEvent>,
}

/// Registered directories and the aliases they can be reported under.
///
/// Backends may report canonical paths (e.g. FSEvents resolves
/// `/var` to `/private/var`), so each registration is also reachable through
/// its canonical form.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    order: Vec<PathBuf>,
    aliases: HashMap<PathBuf, PathBuf>,
    /// Paths of registered directories whose deletion was already routed.
    /// The loss of a watched directory is reported twice (by its parent's
    /// watch and by its own); the second report is swallowed. Recreating the
    /// path clears the entry.
    vanished: HashSet<PathBuf>,
    /// Registered directories known to be gone. Their watch died with them,
    /// so they can never be re-armed, even if the path reappears.
    dead: HashSet<PathBuf>,
    /// Rename trackers already delivered as separate `From`/`To` halves.
    renames: VecDeque<usize>,
}

/// How many rename trackers to remember while waiting for a `Both` event.
const RENAME_TRACKER_WINDOW: usize = 64;

impl Registry {
    pub fn insert(&mut self, dir: &Path) {
        if self.aliases.contains_key(dir) {
            return;
        }
        self.order.push(dir.to_path_buf());
        self.aliases.insert(dir.to_path_buf(), dir.to_path_buf());
        if let Ok(canonical) = dir.canonicalize() {
            self.aliases.entry(canonical).or_insert_with(|| dir.to_path_buf());
        }
    }

    pub fn remove(&mut self, dir: &Path) {
        self.order.retain(|p| p != dir);
        self.aliases.retain(|_, registered| registered.as_path() != dir);
        self.dead.remove(dir);
    }

    pub fn contains(&self, dir: &Path) -> bool {
        self.order.iter().any(|p| p == dir)
    }

    /// Registered and not known to have been removed.
    pub fn is_live(&self, dir: &Path) -> bool {
        self.contains(dir) && !self.dead.contains(dir)
    }

    pub fn lookup(&self, path: &Path) -> Option<&PathBuf> {
        self.aliases.get(path)
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.order
    }

    /// Translate a raw `notify` event into routed units of work.
    ///
    /// Each path is attributed to its registered parent directory. A deleted
    /// path that is itself registered additionally queues a re-arm for that
    /// directory, which is how its loss gets noticed.
    pub fn route(&mut self, event: &Event) -> Vec<Pending> {
        let mut out = Vec::new();

        if self.is_repeated_rename(event) {
            trace!(?event, "rename already reported in halves");
            return out;
        }

        for (path, kind) in classify(event) {
            match kind {
                ChangeKind::Delete if self.vanished.remove(&path) => {
                    trace!(path = %path.display(), "duplicate removal report");
                    continue;
                }
                ChangeKind::Create => {
                    self.vanished.remove(&path);
                }
                _ => {}
            }

            if let Some(directory) = path.parent().and_then(|p| self.lookup(p)) {
                if let Some(name) = path.file_name() {
                    out.push(Pending {
                        directory: directory.clone(),
                        event: Some(ChangeEvent::new(kind, directory.clone(), name)),
                    });
                }
            }

            if kind == ChangeKind::Delete {
                if let Some(own) = self.lookup(&path).cloned() {
                    self.dead.insert(own.clone());
                    out.push(Pending {
                        directory: own,
                        event: None,
                    });
                    self.vanished.insert(path);
                }
            }
        }

        out
    }

    /// Some backends (inotify) report a rename as `From`, `To` and then a
    /// combined `Both` sharing one tracker. The `Both` repeats the halves.
    fn is_repeated_rename(&mut self, event: &Event) -> bool {
        let EventKind::Modify(ModifyKind::Name(mode)) = event.kind else {
            return false;
        };
        let Some(tracker) = event.tracker() else {
            return false;
        };

        match mode {
            RenameMode::From | RenameMode::To => {
                if !self.renames.contains(&tracker) {
                    if self.renames.len() == RENAME_TRACKER_WINDOW {
                        self.renames.pop_front();
                    }
                    self.renames.push_back(tracker);
                }
                false
            }
            RenameMode::Both => match self.renames.iter().position(|t| *t == tracker) {
                Some(idx) => {
                    self.renames.remove(idx);
                    true
                }
                None => false,
            },
            _ => false,
        }
    }
}

/// Map a `notify` event to `(path, kind)` pairs. Access and unknown events
/// yield nothing.
pub(crate) fn classify(event: &Event) -> Vec<(PathBuf, ChangeKind)> {
    let uniform = |kind: ChangeKind| -> Vec<(PathBuf, ChangeKind)> {
        event.paths.iter().map(|p| (p.clone(), kind)).collect()
    };

    match event.kind {
        EventKind::Create(_) => uniform(ChangeKind::Create),
        EventKind::Remove(_) => uniform(ChangeKind::Delete),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => uniform(ChangeKind::Delete),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => uniform(ChangeKind::Create),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut out = Vec::new();
            if let Some(from) = event.paths.first() {
                out.push((from.clone(), ChangeKind::Delete));
            }
            if let Some(to) = event.paths.get(1) {
                out.push((to.clone(), ChangeKind::Create));
            }
            out
        }
        // Backends that cannot tell the two rename halves apart.
        EventKind::Modify(ModifyKind::Name(_)) => event
            .paths
            .iter()
            .map(|p| {
                let kind = if p.exists() {
                    ChangeKind::Create
                } else {
                    ChangeKind::Delete
                };
                (p.clone(), kind)
            })
            .collect(),
        EventKind::Modify(_) => uniform(ChangeKind::Modify),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    }
}

/// Production notification service built on `notify::RecommendedWatcher`.
pub struct NotifyService {
    watcher: RecommendedWatcher,
    raw_rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
    registry: Registry,
    pending: VecDeque<Pending>,
}

impl std::fmt::Debug for NotifyService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyService")
            .field("registered", &self.registry.paths().len())
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl NotifyService {
    /// Create the underlying OS watcher. No directory is watched yet.
    pub fn new() -> Result<Self> {
        // Channel from the blocking notify callback into the async world.
        let (raw_tx, raw_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();

        let watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                if let Err(err) = raw_tx.send(res) {
                    // Receiver gone means the service was dropped; nothing to log through.
                    eprintln!("stalk: failed to forward notify event: {err}");
                }
            },
            Config::default(),
        )?;

        Ok(Self {
            watcher,
            raw_rx,
            registry: Registry::default(),
            pending: VecDeque::new(),
        })
    }

    fn absorb(&mut self, raw: notify::Result<Event>) -> Result<()> {
        let event = raw.map_err(|e| StalkError::Watch(e.to_string()))?;
        trace!(?event, "received notify event");
        self.pending.extend(self.registry.route(&event));
        Ok(())
    }

    /// Pop every pending unit for the oldest pending directory.
    fn pop_batch(&mut self) -> Option<EventBatch> {
        let directory = self.pending.front()?.directory.clone();
        let mut events = Vec::new();

        self.pending.retain(|p| {
            if p.directory != directory {
                return true;
            }
            if let Some(event) = &p.event {
                events.push(event.clone());
            }
            false
        });

        Some(EventBatch::new(directory, events))
    }

    async fn next_batch(&mut self) -> Result<Option<EventBatch>> {
        loop {
            if let Some(batch) = self.pop_batch() {
                return Ok(Some(batch));
            }

            let Some(first) = self.raw_rx.recv().await else {
                return Ok(None);
            };
            self.absorb(first)?;

            // Everything already delivered joins this round.
            while let Ok(raw) = self.raw_rx.try_recv() {
                self.absorb(raw)?;
            }
        }
    }
}

impl NotificationService for NotifyService {
    fn register(&mut self, dir: &Path) -> Result<()> {
        self.watcher.watch(dir, RecursiveMode::NonRecursive)?;
        self.registry.insert(dir);
        debug!(path = %dir.display(), "registered directory");
        Ok(())
    }

    fn take_next_batch(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = Result<Option<EventBatch>>> + Send + '_>> {
        Box::pin(self.next_batch())
    }

    fn rearm(&mut self, dir: &Path) -> bool {
        if self.registry.is_live(dir) && dir.is_dir() {
            return true;
        }

        if let Err(err) = self.watcher.unwatch(dir) {
            // The backend usually drops the watch of a deleted directory itself.
            debug!(path = %dir.display(), error = %err, "unwatch after failed re-arm");
        }
        self.registry.remove(dir);
        self.pending.retain(|p| p.directory != dir);
        false
    }

    fn close(&mut self) {
        for dir in self.registry.paths().to_vec() {
            if let Err(err) = self.watcher.unwatch(&dir) {
                warn!(path = %dir.display(), error = %err, "failed to unwatch directory");
            }
        }
        self.registry = Registry::default();
        self.pending.clear();
    }

    fn registered(&self) -> Vec<PathBuf> {
        self.registry.paths().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use notify::event::{CreateKind, DataChange, RemoveKind};

    use super::*;

    fn registry(dirs: &[&str]) -> Registry {
        let mut reg = Registry::default();
        for d in dirs {
            reg.insert(Path::new(d));
        }
        reg
    }

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        paths
            .iter()
            .fold(Event::new(kind), |ev, p| ev.add_path(PathBuf::from(p)))
    }

    #[test]
    fn create_is_attributed_to_parent() {
        let mut reg = registry(&["w", "w/sub"]);
        let routed = reg.route(&event(EventKind::Create(CreateKind::File), &["w/sub/a.rs"]));

        assert_eq!(
            routed,
            vec![Pending {
                directory: PathBuf::from("w/sub"),
                event: Some(ChangeEvent::new(ChangeKind::Create, "w/sub", "a.rs")),
            }]
        );
    }

    #[test]
    fn unregistered_parent_is_dropped() {
        let mut reg = registry(&["w"]);
        let routed = reg.route(&event(EventKind::Create(CreateKind::File), &["elsewhere/a.rs"]));
        assert!(routed.is_empty());
    }

    #[test]
    fn deleting_a_registered_directory_queues_its_rearm() {
        let mut reg = registry(&["w", "w/sub"]);
        let routed = reg.route(&event(EventKind::Remove(RemoveKind::Folder), &["w/sub"]));

        assert_eq!(routed.len(), 2);
        assert_eq!(routed[0].directory, PathBuf::from("w"));
        assert_eq!(
            routed[0].event,
            Some(ChangeEvent::new(ChangeKind::Delete, "w", "sub"))
        );
        assert_eq!(
            routed[1],
            Pending {
                directory: PathBuf::from("w/sub"),
                event: None,
            }
        );
    }

    #[test]
    fn second_report_of_a_directory_removal_is_swallowed() {
        let mut reg = registry(&["w", "w/sub"]);
        let removal = event(EventKind::Remove(RemoveKind::Folder), &["w/sub"]);

        assert_eq!(reg.route(&removal).len(), 2);
        assert!(reg.route(&removal).is_empty());
    }

    #[test]
    fn rename_both_splits_into_delete_and_create() {
        let ev = event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["w/old", "w/new"],
        );
        assert_eq!(
            classify(&ev),
            vec![
                (PathBuf::from("w/old"), ChangeKind::Delete),
                (PathBuf::from("w/new"), ChangeKind::Create),
            ]
        );
    }

    #[test]
    fn content_change_is_modify_and_access_is_ignored() {
        let write = event(EventKind::Modify(ModifyKind::Data(DataChange::Content)), &["w/a"]);
        assert_eq!(classify(&write), vec![(PathBuf::from("w/a"), ChangeKind::Modify)]);

        let access = event(EventKind::Access(notify::event::AccessKind::Read), &["w/a"]);
        assert!(classify(&access).is_empty());
    }

    #[test]
    fn rename_reported_in_halves_ignores_the_combined_event() {
        let mut reg = registry(&["w"]);
        let rename = |mode, paths: &[&str]| {
            event(EventKind::Modify(ModifyKind::Name(mode)), paths).set_tracker(7)
        };

        let mut routed = reg.route(&rename(RenameMode::From, &["w/old.txt"]));
        routed.extend(reg.route(&rename(RenameMode::To, &["w/new.txt"])));
        routed.extend(reg.route(&rename(RenameMode::Both, &["w/old.txt", "w/new.txt"])));

        let events: Vec<_> = routed.into_iter().filter_map(|p| p.event).collect();
        assert_eq!(
            events,
            vec![
                ChangeEvent::new(ChangeKind::Delete, "w", "old.txt"),
                ChangeEvent::new(ChangeKind::Create, "w", "new.txt"),
            ]
        );
    }

    #[test]
    fn removed_directory_is_not_live_even_if_recreated() {
        let mut reg = registry(&["w", "w/sub"]);
        reg.route(&event(EventKind::Remove(RemoveKind::Folder), &["w/sub"]));
        reg.route(&event(EventKind::Create(CreateKind::Folder), &["w/sub"]));

        assert!(reg.contains(Path::new("w/sub")));
        assert!(!reg.is_live(Path::new("w/sub")));
        assert!(reg.is_live(Path::new("w")));
    }

    #[test]
    fn removal_of_a_recreated_directory_is_reported() {
        let mut reg = registry(&["w", "w/sub"]);
        // Lost directory reported once, then dropped.
        reg.route(&event(EventKind::Remove(RemoveKind::Folder), &["w/sub"]));
        reg.remove(Path::new("w/sub"));

        let created = reg.route(&event(EventKind::Create(CreateKind::Folder), &["w/sub"]));
        assert_eq!(created.len(), 1);

        let removed = reg.route(&event(EventKind::Remove(RemoveKind::Folder), &["w/sub"]));
        assert_eq!(
            removed,
            vec![Pending {
                directory: PathBuf::from("w"),
                event: Some(ChangeEvent::new(ChangeKind::Delete, "w", "sub")),
            }]
        );
    }

    #[test]
    fn removed_registration_no_longer_routes() {
        let mut reg = registry(&["w", "w/sub"]);
        reg.remove(Path::new("w/sub"));

        assert!(!reg.contains(Path::new("w/sub")));
        let routed = reg.route(&event(EventKind::Create(CreateKind::File), &["w/sub/a"]));
        assert!(routed.is_empty());
        assert_eq!(reg.paths(), &[PathBuf::from("w")]);
    }
}
