/*!
 * Write Strategy
 *
 * Persistence mode is resolved once from the configuration. With both
 * targets enabled the file write runs on a scoped thread while the trace
 * write proceeds, and the dump only completes once both have finished.
 */

use super::traits::PersistenceSink;
use crate::core::config::DumpConfig;
use crate::core::limits::FILE_WRITER_THREAD_NAME;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::thread;
use tracing::{trace, warn};

/// Where dumped bytes go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    FileOnly,
    TraceOnly,
    Both,
    /// Only reachable with an invalid configuration
    Discard,
}

impl WriteMode {
    pub const fn from_targets(file: bool, trace: bool) -> Self {
        match (file, trace) {
            (true, false) => WriteMode::FileOnly,
            (false, true) => WriteMode::TraceOnly,
            (true, true) => WriteMode::Both,
            (false, false) => WriteMode::Discard,
        }
    }
}

/// Persistence behavior bound to a sink
#[derive(Clone)]
pub struct WriteStrategy {
    mode: WriteMode,
    sink: Arc<dyn PersistenceSink>,
}

impl WriteStrategy {
    pub fn new(mode: WriteMode, sink: Arc<dyn PersistenceSink>) -> Self {
        Self { mode, sink }
    }

    pub fn from_config(config: &DumpConfig, sink: Arc<dyn PersistenceSink>) -> Self {
        Self::new(
            WriteMode::from_targets(config.write_to_file, config.write_to_trace),
            sink,
        )
    }

    #[inline]
    pub fn mode(&self) -> WriteMode {
        self.mode
    }

    /// Persist `data` under `name`. Sink failures are logged, never returned.
    pub fn write(&self, name: &str, data: &[u8]) {
        match self.mode {
            WriteMode::FileOnly => self.write_file(name, data),
            WriteMode::TraceOnly => self.write_trace(name, data),
            WriteMode::Both => self.write_both(name, data),
            WriteMode::Discard => trace!(name, len = data.len(), "write discarded"),
        }
    }

    fn write_both(&self, name: &str, data: &[u8]) {
        thread::scope(|s| {
            let file = thread::Builder::new()
                .name(FILE_WRITER_THREAD_NAME.into())
                .spawn_scoped(s, || self.write_file(name, data));

            self.write_trace(name, data);

            match file {
                Ok(handle) => {
                    if handle.join().is_err() {
                        warn!(name, "file writer panicked");
                    }
                }
                Err(e) => {
                    warn!(name, error = %e, "could not spawn file writer, writing inline");
                    self.write_file(name, data);
                }
            }
        });
    }

    fn write_file(&self, name: &str, data: &[u8]) {
        if let Err(e) = self.sink.write_file(name, data) {
            warn!(name, error = %e, "file write failed");
        }
    }

    fn write_trace(&self, name: &str, data: &[u8]) {
        if let Err(e) = self.sink.write_trace(name, data) {
            warn!(name, error = %e, "trace write failed");
        }
    }
}

impl std::fmt::Debug for WriteStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteStrategy")
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}
