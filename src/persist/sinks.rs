/*!
 * Persistence Sinks
 *
 * - `DirectorySink`: files under a root directory, trace writes as
 *   `tracing` events on the `fast_dump::trace` target
 * - `MemorySink`: in-memory recorder with a pause gate, for tests and demos
 */

use super::traits::PersistenceSink;
use crate::core::limits::{TRACE_CHUNK_BYTES, TRACE_TARGET};
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{info, trace};

/// Writes dumps below a root directory
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path for `name` below the root
    ///
    /// Only plain relative names are accepted: absolute paths, drive
    /// prefixes and `..` components are rejected with `InvalidInput`.
    pub fn path_for(&self, name: &str) -> io::Result<PathBuf> {
        let relative = Path::new(name);
        let plain = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !plain || relative.file_name().is_none() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("dump name {:?} escapes the output directory", name),
            ));
        }
        Ok(self.root.join(relative))
    }
}

impl PersistenceSink for DirectorySink {
    fn write_file(&self, name: &str, data: &[u8]) -> io::Result<()> {
        let path = self.path_for(name)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, data)
    }

    fn write_trace(&self, name: &str, data: &[u8]) -> io::Result<()> {
        let chunks = data.chunks(TRACE_CHUNK_BYTES).count();
        info!(target: TRACE_TARGET, name, len = data.len(), chunks, "data dump");

        let mut payload = String::with_capacity(TRACE_CHUNK_BYTES * 2);
        for (index, chunk) in data.chunks(TRACE_CHUNK_BYTES).enumerate() {
            payload.clear();
            for byte in chunk {
                // Writing to a String cannot fail
                let _ = write!(payload, "{:02x}", byte);
            }
            trace!(
                target: TRACE_TARGET,
                name,
                chunk = index,
                payload = %payload,
                "data dump chunk"
            );
        }
        Ok(())
    }
}

/// Which sink method produced a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkChannel {
    File,
    Trace,
}

/// One recorded write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkRecord {
    pub channel: SinkChannel,
    pub name: String,
    pub data: Vec<u8>,
}

#[derive(Default)]
struct MemorySinkState {
    records: Vec<SinkRecord>,
    paused: bool,
}

/// Records every write in memory
///
/// While paused, writers block inside the sink, which keeps the in-flight
/// dump (and its staging buffer) busy.
#[derive(Default)]
pub struct MemorySink {
    state: Mutex<MemorySinkState>,
    cond: Condvar,
    fail: AtomicBool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that starts out paused
    pub fn paused() -> Self {
        let sink = Self::new();
        sink.pause();
        sink
    }

    pub fn pause(&self) {
        self.state.lock().paused = true;
    }

    pub fn resume(&self) {
        self.state.lock().paused = false;
        self.cond.notify_all();
    }

    /// Make every write return an error
    pub fn fail_writes(&self, fail: bool) {
        self.fail.store(fail, Ordering::Release);
    }

    pub fn records(&self) -> Vec<SinkRecord> {
        self.state.lock().records.clone()
    }

    pub fn names(&self, channel: SinkChannel) -> Vec<String> {
        self.state
            .lock()
            .records
            .iter()
            .filter(|r| r.channel == channel)
            .map(|r| r.name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Block until at least `count` records exist, or the timeout elapses
    pub fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while state.records.len() < count {
            if self.cond.wait_until(&mut state, deadline).timed_out() {
                return state.records.len() >= count;
            }
        }
        true
    }

    fn record(&self, channel: SinkChannel, name: &str, data: &[u8]) -> io::Result<()> {
        let mut state = self.state.lock();
        self.cond.wait_while(&mut state, |s| s.paused);

        if self.fail.load(Ordering::Acquire) {
            return Err(io::Error::new(io::ErrorKind::Other, "sink failure injected"));
        }

        state.records.push(SinkRecord {
            channel,
            name: name.to_string(),
            data: data.to_vec(),
        });
        drop(state);
        self.cond.notify_all();
        Ok(())
    }
}

impl PersistenceSink for MemorySink {
    fn write_file(&self, name: &str, data: &[u8]) -> io::Result<()> {
        self.record(SinkChannel::File, name, data)
    }

    fn write_trace(&self, name: &str, data: &[u8]) -> io::Result<()> {
        self.record(SinkChannel::Trace, name, data)
    }
}
