use crate::cli::{Progress, TileCounter};
use std::sync::Arc;
use std::thread::JoinHandle;

const PROGRESS_UPDATE_MILLIS: u64 = 500;

/// Shows a spinner counting written tiles until dropped.
pub struct Tracker {
    progress: Arc<Progress<TileCounter>>,
    handle: Option<JoinHandle<()>>,
}

impl Tracker {
    pub fn new(units: &'static str, len: usize) -> Self {
        let progress = Arc::new(Progress::new(TileCounter::new(units, len)));
        let handle = progress
            .clone()
            .spawn_auto_update_thread(std::time::Duration::from_millis(PROGRESS_UPDATE_MILLIS));
        Tracker {
            progress,
            handle: Some(handle),
        }
    }

    /// Count one tile of `bytes` bytes.
    pub fn increment(&self, bytes: u64) {
        self.progress.value.add(bytes);
    }

    pub fn written(&self) -> usize {
        self.progress.value.written()
    }

    pub fn bytes(&self) -> u64 {
        self.progress.value.bytes()
    }
}

impl Drop for Tracker {
    fn drop(&mut self) {
        self.progress.finish();
        if let Some(handle) = self.handle.take() {
            handle.thread().unpark();
            if handle.join().is_err() {
                tracing::warn!("progress thread panicked");
            }
        }
    }
}
