//! Background producers of a directory index
//!
//! A `notify` watcher reports changed files, a debouncer coalesces the notifications of
//! one write into a single batch for the index, and a ticker forces a full rescan in a
//! fixed interval to catch whatever the watcher missed.

use crate::error::PlaceError;
use crate::place::dir::index::DirIndex;
use crate::place::dir::{DirSettings, ThreadCounter};
use crate::place::Result;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Batches are flushed at the latest after this many debounce intervals.
const MAX_WAIT_FACTOR: u32 = 10;

/// Running watcher, debouncer and ticker of one directory
pub struct DirWatch {
    watcher: Option<RecommendedWatcher>,
    stopping: Arc<AtomicBool>,
    debouncer: Option<JoinHandle<()>>,
    ticker_stop: Sender<()>,
    ticker: JoinHandle<()>,
}

impl DirWatch {
    /// Start watching `dir` for `index`. Without a working OS watcher only the ticker runs.
    pub fn start(
        dir: &Path,
        index: DirIndex,
        settings: &DirSettings,
        threads: &ThreadCounter,
    ) -> Result<DirWatch> {
        let stopping = Arc::new(AtomicBool::new(false));
        let (ticker_stop, stop_rx) = mpsc::channel();
        let rescan = settings.rescan;
        let ticker_index = index.clone();
        let ticker = threads.spawn("zettelstore-rescan".to_string(), move || {
            tick(ticker_index, rescan, stop_rx)
        })?;

        let mut watch = DirWatch {
            watcher: None,
            stopping,
            debouncer: None,
            ticker_stop,
            ticker,
        };
        let (tx, rx) = mpsc::channel();
        match create_watcher(dir, tx) {
            Ok(watcher) => {
                let debounce = settings.debounce;
                let stopping = Arc::clone(&watch.stopping);
                let spawned = threads.spawn("zettelstore-debounce".to_string(), move || {
                    Debouncer::new(index, debounce, stopping).run(rx)
                });
                match spawned {
                    Ok(handle) => {
                        watch.watcher = Some(watcher);
                        watch.debouncer = Some(handle);
                        info!(dir = %dir.display(), "Watching directory");
                    }
                    Err(err) => {
                        watch.stop();
                        return Err(err.into());
                    }
                }
            }
            Err(err) => {
                warn!(
                    dir = %dir.display(),
                    error = %err,
                    "Cannot watch directory, relying on periodic rescan"
                );
            }
        }
        Ok(watch)
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.is_some()
    }

    /// Stop watcher, debouncer and ticker and wait for their threads.
    pub fn stop(mut self) {
        self.watcher.take();
        self.stopping.store(true, Ordering::SeqCst);
        if let Some(handle) = self.debouncer.take() {
            if handle.join().is_err() {
                error!("Debounce thread panicked");
            }
        }
        let _ = self.ticker_stop.send(());
        if self.ticker.join().is_err() {
            error!("Rescan thread panicked");
        }
    }
}

fn create_watcher(
    dir: &Path,
    tx: Sender<notify::Result<Event>>,
) -> notify::Result<RecommendedWatcher> {
    let mut watcher = notify::recommended_watcher(move |res| {
        // The debouncer is gone once the place stops.
        let _ = tx.send(res);
    })?;
    watcher.watch(dir, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}

fn tick(index: DirIndex, interval: Duration, stop: Receiver<()>) {
    loop {
        match stop.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {
                debug!("Periodic rescan");
                match index.rescan() {
                    Ok(()) => {}
                    Err(PlaceError::Stopped) => break,
                    Err(err) => warn!(error = %err, "Periodic rescan failed"),
                }
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

struct Debouncer {
    index: DirIndex,
    interval: Duration,
    max_wait: Duration,
    stopping: Arc<AtomicBool>,
    pending: HashSet<PathBuf>,
    first_pending: Option<Instant>,
}

impl Debouncer {
    fn new(index: DirIndex, interval: Duration, stopping: Arc<AtomicBool>) -> Self {
        Self {
            index,
            interval,
            max_wait: interval * MAX_WAIT_FACTOR,
            stopping,
            pending: HashSet::new(),
            first_pending: None,
        }
    }

    fn run(mut self, rx: Receiver<notify::Result<Event>>) {
        loop {
            if self.stopping.load(Ordering::SeqCst) {
                break;
            }
            match rx.recv_timeout(self.interval) {
                Ok(Ok(event)) => self.add(event),
                Ok(Err(e)) => {
                    warn!("Watch error: {}", e);
                }
                Err(RecvTimeoutError::Timeout) => {
                    if !self.flush() {
                        break;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
            let overdue = self
                .first_pending
                .is_some_and(|first| first.elapsed() >= self.max_wait);
            if overdue && !self.flush() {
                break;
            }
        }
        debug!("Debouncer stopped");
    }

    fn add(&mut self, event: Event) {
        match event.kind {
            EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => {
                self.pending.extend(event.paths);
                self.first_pending.get_or_insert_with(Instant::now);
            }
            _ => {}
        }
    }

    /// Hand the pending paths to the index. Returns false once the index is gone.
    fn flush(&mut self) -> bool {
        self.first_pending = None;
        if self.pending.is_empty() {
            return true;
        }
        let paths: Vec<PathBuf> = self.pending.drain().collect();
        debug!(count = paths.len(), "Forwarding file events");
        self.index.file_events(paths).is_ok()
    }
}
