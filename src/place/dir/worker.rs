//! Sharded file I/O workers
//!
//! Every identifier is hashed onto one worker, so all operations on the same zettel run
//! in submission order on one thread while different zettel are handled in parallel.

use crate::error::PlaceError;
use crate::place::dir::entry::Entry;
use crate::place::dir::files;
use crate::place::dir::ThreadCounter;
use crate::place::Result;
use crate::zettel::{Content, Meta, Zettel, Zid};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, error};

const FNV_OFFSET: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a over the big-endian bytes of the identifier
pub fn shard_hash(zid: Zid) -> u32 {
    let mut hash = FNV_OFFSET;
    for byte in zid.as_u64().to_be_bytes() {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// A file operation together with the channel its result is sent to.
pub enum FileCmd {
    GetMeta {
        entry: Entry,
        reply: Sender<Result<Meta>>,
    },
    GetMetaContent {
        entry: Entry,
        reply: Sender<Result<(Meta, Content)>>,
    },
    SetZettel {
        entry: Entry,
        zettel: Zettel,
        obsolete: Vec<PathBuf>,
        reply: Sender<Result<()>>,
    },
    RenameZettel {
        cur: Entry,
        new: Entry,
        reply: Sender<Result<()>>,
    },
    DeleteZettel {
        entry: Entry,
        reply: Sender<Result<()>>,
    },
}

impl FileCmd {
    /// Identifier that selects the worker.
    fn zid(&self) -> Zid {
        match self {
            FileCmd::GetMeta { entry, .. }
            | FileCmd::GetMetaContent { entry, .. }
            | FileCmd::SetZettel { entry, .. }
            | FileCmd::DeleteZettel { entry, .. } => entry.zid,
            FileCmd::RenameZettel { cur, .. } => cur.zid,
        }
    }

    fn run(self) {
        // A dropped receiver means the caller gave up waiting; the result is discarded.
        match self {
            FileCmd::GetMeta { entry, reply } => {
                let _ = reply.send(files::read_meta(&entry));
            }
            FileCmd::GetMetaContent { entry, reply } => {
                let _ = reply.send(files::read_meta_content(&entry));
            }
            FileCmd::SetZettel {
                entry,
                zettel,
                obsolete,
                reply,
            } => {
                let _ = reply.send(files::write_zettel(&entry, &zettel, &obsolete));
            }
            FileCmd::RenameZettel { cur, new, reply } => {
                let _ = reply.send(rename_files(&cur, &new));
            }
            FileCmd::DeleteZettel { entry, reply } => {
                let _ = reply.send(files::delete_files(&entry));
            }
        }
    }
}

fn rename_files(cur: &Entry, new: &Entry) -> Result<()> {
    let (meta, content) = files::read_meta_content(cur)?;
    let zettel = Zettel::new(meta.with_zid(new.zid), content);
    files::write_zettel(new, &zettel, &[])?;
    files::delete_files(cur)
}

enum Message {
    Run(FileCmd),
    Stop,
}

/// Handle for submitting work to the pool. Clones share the same workers.
#[derive(Clone)]
pub struct WorkerPool {
    senders: Arc<Vec<Sender<Message>>>,
}

/// Threads of a running pool
pub struct PoolThreads {
    pool: WorkerPool,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Start `count` workers (at least one).
    pub fn start(count: usize, threads: &ThreadCounter) -> Result<(WorkerPool, PoolThreads)> {
        let count = count.max(1);
        let mut senders = Vec::with_capacity(count);
        let mut handles = Vec::with_capacity(count);
        for idx in 0..count {
            let (tx, rx) = mpsc::channel();
            match threads.spawn(format!("zettelstore-worker-{}", idx), move || work(idx, rx)) {
                Ok(handle) => {
                    senders.push(tx);
                    handles.push(handle);
                }
                Err(err) => {
                    error!(error = %err, "Failed to start file worker");
                    PoolThreads {
                        pool: WorkerPool {
                            senders: Arc::new(senders),
                        },
                        handles,
                    }
                    .stop();
                    return Err(err.into());
                }
            }
        }
        let pool = WorkerPool {
            senders: Arc::new(senders),
        };
        let threads = PoolThreads {
            pool: pool.clone(),
            handles,
        };
        Ok((pool, threads))
    }

    pub fn size(&self) -> usize {
        self.senders.len()
    }

    /// Worker index for an identifier.
    pub fn shard(&self, zid: Zid) -> usize {
        shard_hash(zid) as usize % self.senders.len()
    }

    /// Queue a command on the worker of its identifier.
    pub fn submit(&self, cmd: FileCmd) -> Result<()> {
        let idx = self.shard(cmd.zid());
        self.senders[idx]
            .send(Message::Run(cmd))
            .map_err(|_| PlaceError::Stopped)
    }

    /// Queue a metadata read and return the channel of its result.
    pub fn request_meta(&self, entry: Entry) -> Result<Receiver<Result<Meta>>> {
        let (reply, rx) = mpsc::channel();
        self.submit(FileCmd::GetMeta { entry, reply })?;
        Ok(rx)
    }

    pub fn get_meta(&self, entry: Entry) -> Result<Meta> {
        wait(self.request_meta(entry)?)
    }

    pub fn get_meta_content(&self, entry: Entry) -> Result<(Meta, Content)> {
        let (reply, rx) = mpsc::channel();
        self.submit(FileCmd::GetMetaContent { entry, reply })?;
        wait(rx)
    }

    pub fn set_zettel(&self, entry: Entry, zettel: Zettel, obsolete: Vec<PathBuf>) -> Result<()> {
        let (reply, rx) = mpsc::channel();
        self.submit(FileCmd::SetZettel {
            entry,
            zettel,
            obsolete,
            reply,
        })?;
        wait(rx)
    }

    pub fn rename_zettel(&self, cur: Entry, new: Entry) -> Result<()> {
        let (reply, rx) = mpsc::channel();
        self.submit(FileCmd::RenameZettel { cur, new, reply })?;
        wait(rx)
    }

    pub fn delete_zettel(&self, entry: Entry) -> Result<()> {
        let (reply, rx) = mpsc::channel();
        self.submit(FileCmd::DeleteZettel { entry, reply })?;
        wait(rx)
    }
}

/// Block until the worker replies. A worker that stopped before replying drops the sender.
pub fn wait<T>(rx: Receiver<Result<T>>) -> Result<T> {
    rx.recv().map_err(|_| PlaceError::Stopped)?
}

impl PoolThreads {
    /// Let every worker finish its queue, then join all of them.
    pub fn stop(self) {
        for sender in self.pool.senders.iter() {
            let _ = sender.send(Message::Stop);
        }
        for handle in self.handles {
            if handle.join().is_err() {
                error!("File worker panicked");
            }
        }
    }
}

fn work(idx: usize, rx: Receiver<Message>) {
    debug!(worker = idx, "File worker started");
    while let Ok(Message::Run(cmd)) = rx.recv() {
        cmd.run();
    }
    debug!(worker = idx, "File worker stopped");
}
