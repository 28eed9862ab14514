//! Shared test utilities for integration tests

use std::fs;
use std::path::Path;
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};
use zettelstore::zettel::keys::KEY_TITLE;
use zettelstore::zettel::{Meta, Zettel, Zid};

/// Serializes tests that change process environment variables.
pub static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Upper bound for anything driven by the watcher or the rescan ticker.
pub const LIVENESS_DEADLINE: Duration = Duration::from_secs(15);

pub fn zid(n: u64) -> Zid {
    Zid::new(n).unwrap()
}

pub fn note(title: &str) -> Zettel {
    Zettel::new(
        Meta::builder(Zid::INVALID).with(KEY_TITLE, title).build(),
        format!("Content of {}", title),
    )
}

/// Write a `.zettel` file the way an editor outside the store would.
pub fn write_zettel_file(dir: &Path, zid: u64, title: &str) {
    let text = format!("title: {}\nsyntax: zmk\n\nWritten outside the store\n", title);
    fs::write(dir.join(format!("{:014}.zettel", zid)), text).unwrap();
}

/// `dir:` URI for a directory, with optional query.
pub fn dir_uri(dir: &Path, query: &str) -> String {
    if query.is_empty() {
        format!("dir://{}", dir.display())
    } else {
        format!("dir://{}?{}", dir.display(), query)
    }
}

/// Poll `condition` until it holds or the deadline passes.
pub fn wait_until<F: FnMut() -> bool>(deadline: Duration, mut condition: F) -> bool {
    let end = Instant::now() + deadline;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= end {
            return false;
        }
        thread::sleep(Duration::from_millis(20));
    }
}

/// Environment variables restored when dropped.
pub struct EnvGuard {
    saved: Vec<(String, Option<String>)>,
}

impl EnvGuard {
    pub fn set(vars: &[(&str, Option<&str>)]) -> Self {
        let saved = vars
            .iter()
            .map(|(key, _)| (key.to_string(), std::env::var(key).ok()))
            .collect();
        for (key, value) in vars {
            match value {
                Some(value) => std::env::set_var(key, value),
                None => std::env::remove_var(key),
            }
        }
        Self { saved }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.saved {
            match value {
                Some(value) => std::env::set_var(key, value),
                None => std::env::remove_var(key),
            }
        }
    }
}
