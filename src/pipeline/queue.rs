/*!
 * Capture Queue
 *
 * FIFO of dump jobs waiting for the scheduler. The queue itself is not
 * synchronized: it lives inside the pipeline state, behind the same lock
 * as the buffer pool. Only the scheduler side pops, and it only pops the
 * job it has finished dumping, so the front is always the in-flight job.
 */

use crate::core::types::{ResourceHandle, Size};
use crate::memory::BufferSlot;
use std::collections::VecDeque;

/// Job identifier, increasing in submission order
pub type JobId = u64;

/// A staged snapshot waiting to be persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpJob {
    pub id: JobId,
    /// Pool slot of the staging buffer bound to this job
    pub slot: BufferSlot,
    /// Backend handle of that staging buffer
    pub staging: ResourceHandle,
    pub size: Size,
    pub offset: Size,
    pub label: String,
}

/// Pending dump jobs in submission order
#[derive(Debug, Default)]
pub struct CaptureQueue {
    jobs: VecDeque<DumpJob>,
    next_id: JobId,
}

impl CaptureQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a job and return its id
    pub fn push(
        &mut self,
        slot: BufferSlot,
        staging: ResourceHandle,
        size: Size,
        offset: Size,
        label: String,
    ) -> JobId {
        let id = self.next_id;
        self.next_id += 1;
        self.jobs.push_back(DumpJob {
            id,
            slot,
            staging,
            size,
            offset,
            label,
        });
        id
    }

    #[inline]
    pub fn front(&self) -> Option<&DumpJob> {
        self.jobs.front()
    }

    #[inline]
    pub fn pop_front(&mut self) -> Option<DumpJob> {
        self.jobs.pop_front()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DumpJob> {
        self.jobs.iter()
    }
}
