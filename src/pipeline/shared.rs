/*!
 * Shared Pipeline State
 *
 * One mutex guards the buffer pool, the capture queue and the scheduler
 * flags; one condition variable serves every wait site (producers waiting
 * for a free buffer, the scheduler waiting for work, idle waiters). Each
 * wait site checks its own predicate. Backend calls are made with the lock
 * released.
 */

use super::queue::{CaptureQueue, DumpJob, JobId};
use crate::core::errors::{DumpError, DumpResult, ExhaustionOutcome};
use crate::core::types::{ResourceHandle, Size};
use crate::memory::{Acquire, BufferPool, BufferSlot, ResourceBackend, ResourceShapeKey};
use crate::persist::{ErrorReporter, WriteStrategy};
use crate::scheduler::SchedulerPhase;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Everything protected by the pipeline lock
#[derive(Debug)]
pub(crate) struct PipelineState {
    pub pool: BufferPool,
    pub queue: CaptureQueue,
    /// A worker owns the front job
    pub in_flight: bool,
    pub stop_requested: bool,
    pub phase: SchedulerPhase,
}

impl PipelineState {
    pub fn new(pool: BufferPool) -> Self {
        Self {
            pool,
            queue: CaptureQueue::new(),
            in_flight: false,
            stop_requested: false,
            phase: SchedulerPhase::Idle,
        }
    }

    #[inline]
    pub fn is_idle(&self) -> bool {
        !self.in_flight && self.queue.is_empty()
    }
}

/// Request counters
#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub submitted: AtomicU64,
    pub sampled_out: AtomicU64,
    pub queued: AtomicU64,
    pub dumped: AtomicU64,
    pub dropped: AtomicU64,
    pub blocked: AtomicU64,
}

impl Counters {
    #[inline]
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}

/// State shared by producers, the scheduler and its workers
pub(crate) struct Shared {
    pub state: Mutex<PipelineState>,
    pub cond: Condvar,
    pub backend: Arc<dyn ResourceBackend>,
    pub writer: WriteStrategy,
    pub reporter: ErrorReporter,
    pub allow_data_loss: bool,
    pub counters: Counters,
}

impl Shared {
    /// Validate, stage and enqueue one capture request
    ///
    /// Returns once the live resource has been copied into a staging buffer.
    pub fn capture(
        &self,
        resource: ResourceHandle,
        label: &str,
        dump_size: Size,
        offset: Size,
    ) -> DumpResult<JobId> {
        let resource_size =
            self.backend
                .query_size(resource)
                .map_err(|e| DumpError::SizeQueryFailed {
                    reason: e.to_string(),
                })?;

        let in_bounds = offset
            .checked_add(dump_size)
            .map(|end| end <= resource_size)
            .unwrap_or(false);
        if !in_bounds {
            return Err(DumpError::SizeOrOffsetInvalid {
                offset,
                dump_size,
                resource_size,
            });
        }

        let shape = self
            .backend
            .query_shape(resource)
            .map_err(|e| DumpError::ShapeQueryFailed {
                reason: e.to_string(),
            })?;

        let (slot, staging) = self.acquire(&shape, resource_size, label)?;

        if let Err(e) = self.backend.copy(resource, staging) {
            self.release(&slot);
            return Err(DumpError::CopyFailed {
                reason: e.to_string(),
            });
        }

        let size = if dump_size == 0 {
            resource_size - offset
        } else {
            dump_size
        };

        let id = {
            let mut state = self.state.lock();
            state.pool.mark_queued(&slot);
            state
                .queue
                .push(slot, staging, size, offset, label.to_string())
        };
        self.cond.notify_all();

        Counters::bump(&self.counters.queued);
        trace!(job = id, label, %shape, size, offset, "capture queued");
        Ok(id)
    }

    /// Claim a staging buffer for `shape`, allocating or blocking as the
    /// budget and data-loss policy dictate
    fn acquire(
        &self,
        shape: &ResourceShapeKey,
        size: Size,
        label: &str,
    ) -> DumpResult<(BufferSlot, ResourceHandle)> {
        let dropped = DumpError::AllocationExhausted {
            requested: size,
            outcome: ExhaustionOutcome::Dropped,
        };
        let mut state = self.state.lock();
        let mut reported_block = false;

        loop {
            let bucket_empty = match state.pool.try_acquire(shape, size) {
                Acquire::Reused(slot, handle) => return Ok((slot, handle)),
                Acquire::Reserved(tier) => {
                    let allocated = MutexGuard::unlocked(&mut state, || {
                        self.backend.allocate(shape, size, tier)
                    });
                    match allocated {
                        Ok(handle) => {
                            let slot = state.pool.insert(shape, handle, tier, size);
                            debug!(%shape, %tier, size, %handle, "staging buffer allocated");
                            return Ok((slot, handle));
                        }
                        Err(e) => {
                            state.pool.refund(tier, size);
                            warn!(%shape, %tier, size, error = %e, "staging allocation failed");
                            state.pool.bucket_len(shape) == 0
                        }
                    }
                }
                Acquire::Exhausted { bucket_empty } => bucket_empty,
            };

            // Nothing in an empty bucket can ever be released to wake us
            if self.allow_data_loss || bucket_empty {
                return Err(dropped);
            }

            if !reported_block {
                reported_block = true;
                Counters::bump(&self.counters.blocked);
                self.reporter.report(
                    label,
                    &DumpError::AllocationExhausted {
                        requested: size,
                        outcome: ExhaustionOutcome::Blocked,
                    },
                );
            }

            self.cond
                .wait_while(&mut state, |s| !s.pool.has_free(shape));
        }
    }

    /// Return an unused staging buffer to the pool
    fn release(&self, slot: &BufferSlot) {
        self.state.lock().pool.release(slot);
        self.cond.notify_all();
    }

    /// Persist one job's staging buffer
    pub fn dump(&self, job: &DumpJob) {
        let view = match self.backend.lock_for_read(job.staging) {
            Ok(view) => view,
            Err(e) => {
                Counters::bump(&self.counters.dropped);
                self.reporter.report(
                    &job.label,
                    &DumpError::LockFailed {
                        reason: e.to_string(),
                    },
                );
                return;
            }
        };

        match view.get(job.offset..job.offset + job.size) {
            Some(data) => {
                self.writer.write(&job.label, data);
                Counters::bump(&self.counters.dumped);
                trace!(job = job.id, label = %job.label, len = data.len(), "dump written");
            }
            None => {
                Counters::bump(&self.counters.dropped);
                self.reporter.report(
                    &job.label,
                    &DumpError::SizeOrOffsetInvalid {
                        offset: job.offset,
                        dump_size: job.size,
                        resource_size: view.len(),
                    },
                );
            }
        }

        self.backend.unlock(job.staging);
    }

    /// Pop the dumped front job and free its buffer, then wake waiters
    pub fn finish_front(&self) {
        {
            let mut state = self.state.lock();
            self.complete_front(&mut state);
        }
        self.cond.notify_all();
    }

    /// `finish_front` for callers already holding the lock. The caller must
    /// notify afterwards.
    pub fn complete_front(&self, state: &mut PipelineState) {
        if let Some(job) = state.queue.pop_front() {
            state.pool.release(&job.slot);
        }
        state.in_flight = false;
        if state.phase == SchedulerPhase::Dispatching {
            state.phase = SchedulerPhase::Idle;
        }
    }
}
