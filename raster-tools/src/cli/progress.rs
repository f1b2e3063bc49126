use indicatif::ProgressBar;
use std::fmt::{self, Display};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// A spinner showing a displayable value, typically a
/// counter updated from other threads.
pub struct Progress<T> {
    pub bar: ProgressBar,
    pub value: T,
    done: AtomicBool,
}

impl<T> Progress<T> {
    pub fn new(value: T) -> Self {
        let bar = {
            use indicatif::*;
            let progress = ProgressBar::new_spinner();
            progress.set_style(
                ProgressStyle::default_spinner().template("{spinner} [{elapsed_precise}] {msg}"),
            );
            progress
        };
        Progress {
            bar,
            value,
            done: AtomicBool::new(false),
        }
    }

    pub fn done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    pub fn finish(&self) {
        self.done.store(true, Ordering::Release);
    }
}

impl<T: Display> Progress<T> {
    pub fn update_progress(&self) {
        self.bar.set_message(&self.value.to_string());
    }

    /// Redraw at every `interval` until `finish` is called
    /// from another thread, then draw the final value.
    pub fn update_until_done(&self, interval: Duration) {
        while !self.done() {
            self.update_progress();
            std::thread::park_timeout(interval);
        }
        self.bar.finish_with_message(&self.value.to_string());
    }
}

impl<T: Send + Sync + Display + 'static> Progress<T> {
    pub fn spawn_auto_update_thread(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        std::thread::spawn(move || self.update_until_done(interval))
    }
}

/// Tiles written out of a known total, and bytes written.
#[derive(Debug)]
pub struct TileCounter {
    name: &'static str,
    total: AtomicUsize,
    written: AtomicUsize,
    bytes: AtomicU64,
}

impl TileCounter {
    pub fn new(name: &'static str, total: usize) -> Self {
        TileCounter {
            name,
            total: AtomicUsize::new(total),
            written: AtomicUsize::new(0),
            bytes: AtomicU64::new(0),
        }
    }

    pub fn add(&self, bytes: u64) {
        self.written.fetch_add(1, Ordering::AcqRel);
        self.bytes.fetch_add(bytes, Ordering::AcqRel);
    }

    pub fn written(&self) -> usize {
        self.written.load(Ordering::Acquire)
    }

    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::Acquire)
    }
}

impl Display for TileCounter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}: wrote {} of {} ({:.1} MiB)",
            self.name,
            self.written(),
            self.total.load(Ordering::Acquire),
            self.bytes() as f64 / (1 << 20) as f64
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_display() {
        let c = TileCounter::new("tiles", 4);
        c.add(1 << 20);
        c.add(1 << 19);
        assert_eq!(c.written(), 2);
        assert_eq!(c.to_string(), "tiles: wrote 2 of 4 (1.5 MiB)");
    }
}
