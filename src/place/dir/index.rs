//! Directory index
//!
//! The map from identifier to [`Entry`] is owned by a single thread that processes
//! commands one at a time. [`DirIndex`] is the handle other threads use to talk to it;
//! every request blocks until the loop replies. Change notifications are delivered on the
//! thread that issued the request, never on the loop thread, so observers may call back
//! into the place.

use crate::error::PlaceError;
use crate::place::dir::entry::{scan_directory, zid_of_file_name, Entry, MetaSpec};
use crate::place::dir::ThreadCounter;
use crate::place::{ChangeInfo, ChangeObserver, ChangeReason, Observers, Result};
use crate::zettel::{id, Zid};
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, info, warn};

enum Command {
    GetEntries(Sender<Vec<Entry>>),
    GetEntry(Zid, Sender<Entry>),
    GetNew(Sender<Entry>),
    UpdateEntry(Entry, Sender<()>),
    RenameEntry {
        cur: Zid,
        new: Zid,
        reply: Sender<Result<(Entry, Entry)>>,
    },
    DeleteEntry(Zid, Sender<bool>),
    FileEvents(Vec<PathBuf>, Sender<Vec<ChangeInfo>>),
    Rescan(Sender<io::Result<()>>),
    Stop,
}

/// Handle of a running index. Clones talk to the same loop.
#[derive(Clone)]
pub struct DirIndex {
    sender: Sender<Command>,
    observers: Arc<Observers>,
}

/// The loop thread of an index
pub struct IndexThread {
    sender: Sender<Command>,
    handle: JoinHandle<()>,
}

impl DirIndex {
    /// Scan `dir` and start the command loop. A failing initial scan is returned as error.
    pub fn start(dir: &Path, threads: &ThreadCounter) -> Result<(DirIndex, IndexThread)> {
        let entries = scan_directory(dir)?;
        info!(dir = %dir.display(), count = entries.len(), "Directory scanned");
        let (sender, rx) = mpsc::channel();
        let state = IndexState {
            dir: dir.to_path_buf(),
            entries,
        };
        let handle = threads.spawn("zettelstore-index".to_string(), move || state.run(rx))?;
        let index = DirIndex {
            sender: sender.clone(),
            observers: Arc::new(Observers::new()),
        };
        Ok((index, IndexThread { sender, handle }))
    }

    /// Register an observer for every change of the index.
    pub fn subscribe(&self, observer: ChangeObserver) {
        self.observers.register(observer);
    }

    fn request<T>(&self, make: impl FnOnce(Sender<T>) -> Command) -> Result<T> {
        let (reply, rx) = mpsc::channel();
        self.sender.send(make(reply)).map_err(|_| PlaceError::Stopped)?;
        rx.recv().map_err(|_| PlaceError::Stopped)
    }

    fn notify(&self, reason: ChangeReason, zid: Zid) {
        self.observers.notify(ChangeInfo::new(reason, zid));
    }

    /// Snapshot of all entries, including reserved ones.
    pub fn entries(&self) -> Result<Vec<Entry>> {
        self.request(Command::GetEntries)
    }

    /// The entry of `zid`, or an invalid entry if there is none.
    pub fn entry(&self, zid: Zid) -> Result<Entry> {
        self.request(|reply| Command::GetEntry(zid, reply))
    }

    /// Reserve a fresh identifier. The reserved entry has no files yet.
    pub fn new_entry(&self) -> Result<Entry> {
        self.request(Command::GetNew)
    }

    pub fn update_entry(&self, entry: Entry) -> Result<()> {
        let zid = entry.zid;
        self.request(|reply| Command::UpdateEntry(entry, reply))?;
        self.notify(ChangeReason::Update, zid);
        Ok(())
    }

    /// Move the entry of `cur` to `new` and return the old and the new entry.
    pub fn rename_entry(&self, cur: Zid, new: Zid) -> Result<(Entry, Entry)> {
        let entries = self.request(|reply| Command::RenameEntry { cur, new, reply })??;
        self.notify(ChangeReason::Delete, cur);
        self.notify(ChangeReason::Update, new);
        Ok(entries)
    }

    /// Remove an entry. Releasing a reserved identifier is not reported as a change.
    pub fn delete_entry(&self, zid: Zid) -> Result<()> {
        if self.request(|reply| Command::DeleteEntry(zid, reply))? {
            self.notify(ChangeReason::Delete, zid);
        }
        Ok(())
    }

    /// Bring the entries of the given files up to date with the directory.
    pub fn file_events(&self, paths: Vec<PathBuf>) -> Result<()> {
        for info in self.request(|reply| Command::FileEvents(paths, reply))? {
            self.observers.notify(info);
        }
        Ok(())
    }

    /// Replace all entries with a fresh scan of the directory.
    pub fn rescan(&self) -> Result<()> {
        self.request(Command::Rescan)??;
        self.observers.notify(ChangeInfo::reload());
        Ok(())
    }
}

impl IndexThread {
    /// Stop the loop and wait for it. Requests still queued behind the stop fail.
    pub fn stop(self) {
        let _ = self.sender.send(Command::Stop);
        if self.handle.join().is_err() {
            warn!("Directory index thread panicked");
        }
    }
}

struct IndexState {
    dir: PathBuf,
    entries: BTreeMap<Zid, Entry>,
}

impl IndexState {
    fn run(mut self, rx: Receiver<Command>) {
        debug!(dir = %self.dir.display(), "Directory index started");
        while let Ok(cmd) = rx.recv() {
            if !self.handle(cmd) {
                break;
            }
        }
        debug!(dir = %self.dir.display(), "Directory index stopped");
    }

    /// Process one command. Returns false when the loop must end.
    fn handle(&mut self, cmd: Command) -> bool {
        // Send errors mean the requester is gone; there is nobody to tell.
        match cmd {
            Command::GetEntries(reply) => {
                let _ = reply.send(self.entries.values().cloned().collect());
            }
            Command::GetEntry(zid, reply) => {
                let entry = self.entries.get(&zid).cloned().unwrap_or_default();
                let _ = reply.send(entry);
            }
            Command::GetNew(reply) => {
                let zid = id::allocate(|z| self.entries.contains_key(&z));
                let entry = Entry::new(zid);
                self.entries.insert(zid, entry.clone());
                let _ = reply.send(entry);
            }
            Command::UpdateEntry(entry, reply) => {
                self.entries.insert(entry.zid, entry);
                let _ = reply.send(());
            }
            Command::RenameEntry { cur, new, reply } => {
                let _ = reply.send(self.rename(cur, new));
            }
            Command::DeleteEntry(zid, reply) => {
                let removed = self.entries.remove(&zid);
                let _ = reply.send(removed.is_some_and(|e| e.meta_spec != MetaSpec::Unknown));
            }
            Command::FileEvents(paths, reply) => {
                let _ = reply.send(self.apply_file_events(&paths));
            }
            Command::Rescan(reply) => {
                let _ = reply.send(self.rescan());
            }
            Command::Stop => return false,
        }
        true
    }

    fn rename(&mut self, cur: Zid, new: Zid) -> Result<(Entry, Entry)> {
        if self.entries.contains_key(&new) {
            return Err(PlaceError::InvalidId(new));
        }
        let old = self.entries.remove(&cur).ok_or(PlaceError::UnknownId(cur))?;
        let renamed = old.renamed(&self.dir, new);
        self.entries.insert(new, renamed.clone());
        Ok((old, renamed))
    }

    fn apply_file_events(&mut self, paths: &[PathBuf]) -> Vec<ChangeInfo> {
        let affected: BTreeSet<Zid> = paths
            .iter()
            .filter_map(|p| p.file_name()?.to_str().and_then(zid_of_file_name))
            .collect();
        if affected.is_empty() {
            return Vec::new();
        }
        let mut scanned = match scan_directory(&self.dir) {
            Ok(scanned) => scanned,
            Err(err) => {
                warn!(dir = %self.dir.display(), error = %err, "Directory scan failed");
                return Vec::new();
            }
        };
        let mut changes = Vec::with_capacity(affected.len());
        for zid in affected {
            match scanned.remove(&zid) {
                Some(entry) => {
                    self.entries.insert(zid, entry);
                    changes.push(ChangeInfo::new(ChangeReason::Update, zid));
                }
                None => {
                    let reserved = self
                        .entries
                        .get(&zid)
                        .is_some_and(|e| e.meta_spec == MetaSpec::Unknown);
                    if !reserved && self.entries.remove(&zid).is_some() {
                        changes.push(ChangeInfo::new(ChangeReason::Delete, zid));
                    }
                }
            }
        }
        debug!(count = changes.len(), "Applied file events");
        changes
    }

    fn rescan(&mut self) -> io::Result<()> {
        let mut scanned = scan_directory(&self.dir)?;
        for (zid, entry) in &self.entries {
            if entry.meta_spec == MetaSpec::Unknown && !scanned.contains_key(zid) {
                scanned.insert(*zid, entry.clone());
            }
        }
        debug!(dir = %self.dir.display(), count = scanned.len(), "Directory rescanned");
        self.entries = scanned;
        Ok(())
    }
}
