use std::sync::{Arc, Mutex};

use stalk::exec::CommandRunner;

/// A fake runner that records every command it was asked to launch.
///
/// Clones share the same record, so a test can keep one clone and hand the
/// other to the dispatcher.
#[derive(Debug, Clone, Default)]
pub struct RecordingRunner {
    launched: Arc<Mutex<Vec<String>>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn launched(&self) -> Vec<String> {
        self.launched.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.launched.lock().unwrap().len()
    }
}

impl CommandRunner for RecordingRunner {
    fn spawn(&self, command: &str) {
        self.launched.lock().unwrap().push(command.to_string());
    }
}
