use std::collections::HashSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use tokio::sync::mpsc;

use stalk::errors::{Result, StalkError};
use stalk::watch::{ChangeEvent, ChangeKind, EventBatch, NotificationService};

enum Scripted {
    Batch(EventBatch),
    Fail(String),
}

#[derive(Debug, Default)]
struct FakeState {
    registered: Vec<PathBuf>,
    rejected: HashSet<PathBuf>,
    gone: HashSet<PathBuf>,
    rearmed: Vec<PathBuf>,
    closed: bool,
}

/// Scripted notification service.
///
/// Batches are fed in through the paired [`FakeNotifierHandle`]. Once the
/// handle disconnects and the script is drained, `take_next_batch` reports
/// the service as closed.
pub struct FakeNotifier {
    rx: mpsc::UnboundedReceiver<Scripted>,
    state: Arc<Mutex<FakeState>>,
}

/// Test-side controls and observations for a [`FakeNotifier`].
pub struct FakeNotifierHandle {
    tx: Option<mpsc::UnboundedSender<Scripted>>,
    state: Arc<Mutex<FakeState>>,
}

pub fn fake_notifier() -> (FakeNotifier, FakeNotifierHandle) {
    let (tx, rx) = mpsc::unbounded_channel();
    let state = Arc::new(Mutex::new(FakeState::default()));
    (
        FakeNotifier {
            rx,
            state: Arc::clone(&state),
        },
        FakeNotifierHandle {
            tx: Some(tx),
            state,
        },
    )
}

impl FakeNotifierHandle {
    /// Make registering `path` fail.
    pub fn reject(&self, path: impl Into<PathBuf>) {
        self.state.lock().unwrap().rejected.insert(path.into());
    }

    /// Pretend `path` was deleted: its next re-arm fails.
    pub fn remove_dir(&self, path: impl Into<PathBuf>) {
        self.state.lock().unwrap().gone.insert(path.into());
    }

    /// Queue a batch of `(kind, entry)` events for `dir`.
    pub fn send_batch(&self, dir: impl AsRef<Path>, events: &[(ChangeKind, &str)]) {
        let dir = dir.as_ref();
        let events = events
            .iter()
            .map(|(kind, entry)| ChangeEvent::new(*kind, dir, *entry))
            .collect();
        self.send(Scripted::Batch(EventBatch::new(dir, events)));
    }

    /// Queue a service failure.
    pub fn fail(&self, message: &str) {
        self.send(Scripted::Fail(message.to_string()));
    }

    /// Stop feeding the service; it reports closed once drained.
    pub fn disconnect(&mut self) {
        self.tx = None;
    }

    pub fn registered(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().registered.clone()
    }

    pub fn rearmed(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().rearmed.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }

    fn send(&self, msg: Scripted) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(msg);
        }
    }
}

impl NotificationService for FakeNotifier {
    fn register(&mut self, dir: &Path) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.rejected.contains(dir) {
            return Err(anyhow!("no such directory: {}", dir.display()).into());
        }
        state.registered.push(dir.to_path_buf());
        Ok(())
    }

    fn take_next_batch(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = Result<Option<EventBatch>>> + Send + '_>> {
        Box::pin(async move {
            match self.rx.recv().await {
                Some(Scripted::Batch(batch)) => Ok(Some(batch)),
                Some(Scripted::Fail(msg)) => Err(StalkError::Watch(msg)),
                None => Ok(None),
            }
        })
    }

    fn rearm(&mut self, dir: &Path) -> bool {
        let mut state = self.state.lock().unwrap();
        state.rearmed.push(dir.to_path_buf());
        if state.gone.contains(dir) || !state.registered.iter().any(|p| p == dir) {
            state.registered.retain(|p| p != dir);
            return false;
        }
        true
    }

    fn close(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.closed = true;
    }

    fn registered(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().registered.clone()
    }
}
