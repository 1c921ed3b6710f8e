/*!
 * Fast Dump Pipeline
 *
 * Producers hand over live resources with `submit`. The resource is copied
 * into a pooled staging buffer before `submit` returns; persisting the copy
 * happens later on the scheduler's worker, one dump at a time.
 *
 * ## Flow
 *
 * sampling gate → size/shape checks → buffer pool (reuse, allocate or block)
 * → synchronous copy → capture queue → scheduler → write strategy → buffer
 * released for reuse
 *
 * ## Failure handling
 *
 * Every per-request failure aborts only that request, gives back any
 * staging buffer it held and is routed through the error reporter. Nothing
 * is returned to `submit` callers; `try_submit` exposes the outcome for
 * callers that want it.
 *
 * ## Teardown
 *
 * Dropping the pipeline (or calling `shutdown`) stops the scheduler, waits
 * for the in-flight dump, dumps every queued job on the calling thread in
 * FIFO order, and then frees all staging buffers through the backend.
 */

mod builder;
pub mod queue;
pub(crate) mod shared;

pub use builder::FastDumpBuilder;
pub use queue::{CaptureQueue, DumpJob, JobId};

use crate::core::errors::DumpResult;
use crate::core::types::{ResourceHandle, Size};
use crate::memory::PoolStats;
use crate::monitoring::SamplingGate;
use crate::scheduler::{SchedulerPhase, SchedulerTask};
use serde::{Deserialize, Serialize};
use shared::{Counters, Shared};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, trace};

/// Outcome of an accepted request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Submission {
    /// Staged and queued for dumping
    Queued(JobId),
    /// Outside the sampling window, ignored
    SampledOut,
}

/// Pipeline statistics snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStats {
    pub submitted: u64,
    pub sampled_out: u64,
    pub queued: u64,
    pub dumped: u64,
    pub dropped: u64,
    pub blocked: u64,
    pub pending: usize,
    pub phase: SchedulerPhase,
    pub pool: PoolStats,
}

/// Asynchronous capture-and-dump pipeline
pub struct FastDump {
    shared: Arc<Shared>,
    gate: SamplingGate,
    scheduler: Option<SchedulerTask>,
}

impl FastDump {
    pub fn builder() -> FastDumpBuilder {
        FastDumpBuilder::new()
    }

    /// Request a snapshot of `resource`
    ///
    /// `dump_size == 0` dumps everything from `offset` to the end of the
    /// resource. Blocks only while staging memory is exhausted and data loss
    /// is disallowed.
    #[inline]
    pub fn submit(&self, resource: ResourceHandle, label: &str, dump_size: Size, offset: Size) {
        let _ = self.try_submit(resource, label, dump_size, offset);
    }

    /// `submit`, returning what happened to the request
    ///
    /// Failures have already been reported through the error reporter when
    /// this returns.
    #[instrument(level = "trace", skip(self, resource), fields(resource = %resource))]
    pub fn try_submit(
        &self,
        resource: ResourceHandle,
        label: &str,
        dump_size: Size,
        offset: Size,
    ) -> DumpResult<Submission> {
        let counters = &self.shared.counters;
        Counters::bump(&counters.submitted);

        if !self.gate.should_capture() {
            Counters::bump(&counters.sampled_out);
            trace!(label, "outside sampling window");
            return Ok(Submission::SampledOut);
        }

        match self.shared.capture(resource, label, dump_size, offset) {
            Ok(id) => Ok(Submission::Queued(id)),
            Err(e) => {
                Counters::bump(&counters.dropped);
                self.shared.reporter.report(label, &e);
                Err(e)
            }
        }
    }

    pub fn phase(&self) -> SchedulerPhase {
        self.shared.state.lock().phase
    }

    /// Jobs queued or in flight
    pub fn pending(&self) -> usize {
        self.shared.state.lock().queue.len()
    }

    pub fn stats(&self) -> PipelineStats {
        let (pending, phase, pool) = {
            let state = self.shared.state.lock();
            (state.queue.len(), state.phase, state.pool.stats())
        };
        let c = &self.shared.counters;

        PipelineStats {
            submitted: Counters::get(&c.submitted),
            sampled_out: Counters::get(&c.sampled_out),
            queued: Counters::get(&c.queued),
            dumped: Counters::get(&c.dumped),
            dropped: Counters::get(&c.dropped),
            blocked: Counters::get(&c.blocked),
            pending,
            phase,
            pool,
        }
    }

    /// Block until the queue is empty and no dump is in flight
    pub fn wait_idle(&self) {
        let mut state = self.shared.state.lock();
        self.shared.cond.wait_while(&mut state, |s| !s.is_idle());
    }

    /// `wait_idle` with an upper bound; returns whether the pipeline went idle
    pub fn wait_idle_timeout(&self, timeout: Duration) -> bool {
        let mut state = self.shared.state.lock();
        !self
            .shared
            .cond
            .wait_while_for(&mut state, |s| !s.is_idle(), timeout)
            .timed_out()
    }

    /// Drain all pending work, free staging memory and return final stats
    pub fn shutdown(mut self) -> PipelineStats {
        self.stop_and_drain();
        self.stats()
    }

    fn stop_and_drain(&mut self) {
        let Some(mut scheduler) = self.scheduler.take() else {
            return;
        };

        // Joins the in-flight dump, if any
        scheduler.stop();

        let mut drained = 0usize;
        loop {
            let job = {
                let state = self.shared.state.lock();
                match state.queue.front() {
                    Some(job) => job.clone(),
                    None => break,
                }
            };
            self.shared.dump(&job);
            self.shared.finish_front();
            drained += 1;
        }

        let buffers = {
            let mut state = self.shared.state.lock();
            state.phase = SchedulerPhase::Stopped;
            state.pool.take_all()
        };
        for buffer in &buffers {
            self.shared.backend.free(buffer.handle);
        }

        info!(
            drained,
            freed = buffers.len(),
            dumped = Counters::get(&self.shared.counters.dumped),
            "Fast dump pipeline stopped"
        );
    }
}

impl Drop for FastDump {
    fn drop(&mut self) {
        self.stop_and_drain();
    }
}
