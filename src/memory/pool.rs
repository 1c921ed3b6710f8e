/*!
 * Staging Buffer Pool
 *
 * Buffers are bucketed by resource shape and reused once their dump has
 * completed. Buffers are never returned to the backend before teardown, so
 * tier usage only grows while the pool is alive.
 *
 * The pool is a plain data structure: callers hold the pipeline lock while
 * using it and talk to the backend outside of that lock.
 */

use super::budget::TierBudget;
use super::types::{PoolStats, ResourceShapeKey};
use crate::core::types::{ResourceHandle, Size, TierId};
use std::collections::BTreeMap;

/// Lifecycle of a staging buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferState {
    /// Available for reuse
    Free,
    /// Claimed by a producer that is copying into it
    Staging,
    /// Bound to a queued or in-flight dump job
    Queued,
}

/// A reusable destination for resource snapshots
#[derive(Debug, Clone)]
pub struct StagingBuffer {
    pub handle: ResourceHandle,
    pub state: BufferState,
    pub tier: TierId,
    pub size_bytes: Size,
}

impl StagingBuffer {
    #[inline]
    pub fn is_occupied(&self) -> bool {
        self.state != BufferState::Free
    }
}

/// Stable reference to a pooled buffer. Buffers are never removed from a
/// bucket while the pool is alive, so the index stays valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferSlot {
    pub shape: ResourceShapeKey,
    pub index: usize,
}

/// Outcome of a non-blocking acquisition attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquire {
    /// A free buffer was claimed
    Reused(BufferSlot, ResourceHandle),
    /// Budget was charged; the caller must allocate and then `insert` or `refund`
    Reserved(TierId),
    /// No free buffer and no tier has room
    Exhausted { bucket_empty: bool },
}

/// Shape-bucketed pool of staging buffers
#[derive(Debug)]
pub struct BufferPool {
    buckets: BTreeMap<ResourceShapeKey, Vec<StagingBuffer>>,
    budget: TierBudget,
}

impl BufferPool {
    pub fn new(budget: TierBudget) -> Self {
        Self {
            buckets: BTreeMap::new(),
            budget,
        }
    }

    /// Claim a free buffer for `shape`, or charge the budget for a new one
    pub fn try_acquire(&mut self, shape: &ResourceShapeKey, size: Size) -> Acquire {
        if let Some(slot) = self.claim_free(shape) {
            let handle = self.buckets[shape][slot.index].handle;
            return Acquire::Reused(slot, handle);
        }

        match self.budget.reserve(size) {
            Some(tier) => Acquire::Reserved(tier),
            None => Acquire::Exhausted {
                bucket_empty: self.bucket_len(shape) == 0,
            },
        }
    }

    /// Mark the first free buffer of the bucket as staging
    pub fn claim_free(&mut self, shape: &ResourceShapeKey) -> Option<BufferSlot> {
        let bucket = self.buckets.entry(*shape).or_default();
        let index = bucket.iter().position(|b| !b.is_occupied())?;
        bucket[index].state = BufferState::Staging;
        Some(BufferSlot {
            shape: *shape,
            index,
        })
    }

    /// Add a freshly allocated buffer, already claimed by the caller
    pub fn insert(
        &mut self,
        shape: &ResourceShapeKey,
        handle: ResourceHandle,
        tier: TierId,
        size_bytes: Size,
    ) -> BufferSlot {
        let bucket = self.buckets.entry(*shape).or_default();
        bucket.push(StagingBuffer {
            handle,
            state: BufferState::Staging,
            tier,
            size_bytes,
        });
        BufferSlot {
            shape: *shape,
            index: bucket.len() - 1,
        }
    }

    /// Roll back a `Reserved` outcome whose allocation failed
    pub fn refund(&mut self, tier: TierId, size: Size) {
        self.budget.refund(tier, size);
    }

    /// Whether the bucket holds a buffer that `claim_free` would return
    pub fn has_free(&self, shape: &ResourceShapeKey) -> bool {
        self.buckets
            .get(shape)
            .map(|b| b.iter().any(|buf| !buf.is_occupied()))
            .unwrap_or(false)
    }

    pub fn bucket_len(&self, shape: &ResourceShapeKey) -> usize {
        self.buckets.get(shape).map(Vec::len).unwrap_or(0)
    }

    pub fn get(&self, slot: &BufferSlot) -> Option<&StagingBuffer> {
        self.buckets.get(&slot.shape)?.get(slot.index)
    }

    /// Bind a staging buffer to a dump job
    pub fn mark_queued(&mut self, slot: &BufferSlot) -> bool {
        self.set_state(slot, BufferState::Queued)
    }

    /// Return a buffer to the free list of its bucket
    pub fn release(&mut self, slot: &BufferSlot) -> bool {
        self.set_state(slot, BufferState::Free)
    }

    fn set_state(&mut self, slot: &BufferSlot, state: BufferState) -> bool {
        match self
            .buckets
            .get_mut(&slot.shape)
            .and_then(|b| b.get_mut(slot.index))
        {
            Some(buffer) => {
                buffer.state = state;
                true
            }
            None => false,
        }
    }

    pub fn budget(&self) -> &TierBudget {
        &self.budget
    }

    pub fn stats(&self) -> PoolStats {
        let buffers = self.buckets.values().map(Vec::len).sum();
        let occupied = self
            .buckets
            .values()
            .flat_map(|b| b.iter())
            .filter(|b| b.is_occupied())
            .count();

        PoolStats {
            tiers: self.budget.snapshot(),
            buckets: self.buckets.len(),
            buffers,
            occupied,
        }
    }

    /// Empty the pool for teardown, refunding every tier charge
    pub fn take_all(&mut self) -> Vec<StagingBuffer> {
        let buffers: Vec<StagingBuffer> = std::mem::take(&mut self.buckets)
            .into_values()
            .flatten()
            .collect();
        for buffer in &buffers {
            self.budget.refund(buffer.tier, buffer.size_bytes);
        }
        buffers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::types::{PixelFormat, ResourceKind};
    use pretty_assertions::assert_eq;

    fn shape() -> ResourceShapeKey {
        ResourceShapeKey::new(ResourceKind::Surface2D, 64, 32, PixelFormat(1))
    }

    fn stage_new(pool: &mut BufferPool, size: Size, raw: u64) -> BufferSlot {
        match pool.try_acquire(&shape(), size) {
            Acquire::Reserved(tier) => pool.insert(&shape(), ResourceHandle(raw), tier, size),
            other => panic!("expected reservation, got {:?}", other),
        }
    }

    #[test]
    fn test_first_acquire_reserves() {
        let mut pool = BufferPool::new(TierBudget::with_capacities(1024, 0));
        let slot = stage_new(&mut pool, 256, 1);

        let stats = pool.stats();
        assert_eq!(stats.buffers, 1);
        assert_eq!(stats.occupied, 1);
        assert_eq!(stats.tier(TierId::Shared).unwrap().used, 256);
        assert_eq!(pool.get(&slot).unwrap().state, BufferState::Staging);
    }

    #[test]
    fn test_released_buffer_is_reused() {
        let mut pool = BufferPool::new(TierBudget::with_capacities(1024, 0));
        let slot = stage_new(&mut pool, 256, 1);
        pool.mark_queued(&slot);
        assert!(pool.release(&slot));

        assert!(pool.has_free(&shape()));
        assert_eq!(
            pool.try_acquire(&shape(), 256),
            Acquire::Reused(slot, ResourceHandle(1))
        );
        assert!(!pool.has_free(&shape()));
        assert_eq!(pool.stats().tier(TierId::Shared).unwrap().used, 256);
        assert_eq!(pool.stats().buffers, 1);
    }

    #[test]
    fn test_occupied_buffers_never_alias() {
        let mut pool = BufferPool::new(TierBudget::with_capacities(1024, 0));
        let a = stage_new(&mut pool, 256, 1);
        let b = stage_new(&mut pool, 256, 2);
        assert_ne!(a, b);
        assert_ne!(pool.get(&a).unwrap().handle, pool.get(&b).unwrap().handle);
    }

    #[test]
    fn test_exhaustion_reports_bucket_state() {
        let mut pool = BufferPool::new(TierBudget::with_capacities(300, 0));
        assert_eq!(
            pool.try_acquire(&shape(), 400),
            Acquire::Exhausted { bucket_empty: true }
        );

        stage_new(&mut pool, 200, 1);
        assert_eq!(
            pool.try_acquire(&shape(), 200),
            Acquire::Exhausted {
                bucket_empty: false
            }
        );
    }

    #[test]
    fn test_refund_after_failed_allocation() {
        let mut pool = BufferPool::new(TierBudget::with_capacities(300, 0));
        let tier = match pool.try_acquire(&shape(), 200) {
            Acquire::Reserved(tier) => tier,
            other => panic!("unexpected {:?}", other),
        };
        pool.refund(tier, 200);
        assert_eq!(pool.stats().used_bytes(), 0);
    }

    #[test]
    fn test_take_all_returns_capacity() {
        let mut pool = BufferPool::new(TierBudget::with_capacities(1024, 0));
        stage_new(&mut pool, 100, 1);
        stage_new(&mut pool, 100, 2);

        let buffers = pool.take_all();
        assert_eq!(buffers.len(), 2);
        assert_eq!(pool.stats().used_bytes(), 0);
        assert_eq!(pool.stats().buffers, 0);
    }
}
