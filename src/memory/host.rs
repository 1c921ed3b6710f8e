/*!
 * Host Backend
 *
 * In-process resource backend whose "hardware" resources are plain byte
 * vectors. Used by the demo binary and the test suites. Every backend call
 * can be made to fail through [`HostFaults`].
 */

use super::traits::{MemoryBudgetProvider, ResourceBackend};
use super::types::ResourceShapeKey;
use crate::core::errors::{BackendError, BackendResult};
use crate::core::types::{ResourceHandle, Size, TierId};
use ahash::RandomState;
use bytes::Bytes;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use tracing::trace;

#[derive(Debug)]
struct HostResource {
    shape: ResourceShapeKey,
    data: Vec<u8>,
    tier: Option<TierId>,
}

/// Failure switches for each backend call
#[derive(Debug, Default)]
pub struct HostFaults {
    pub size_query: AtomicBool,
    pub shape_query: AtomicBool,
    pub allocate: AtomicBool,
    pub copy: AtomicBool,
    pub lock: AtomicBool,
}

impl HostFaults {
    #[inline]
    fn hit(flag: &AtomicBool) -> bool {
        flag.load(Ordering::Acquire)
    }

    pub fn clear(&self) {
        for flag in [
            &self.size_query,
            &self.shape_query,
            &self.allocate,
            &self.copy,
            &self.lock,
        ] {
            flag.store(false, Ordering::Release);
        }
    }
}

/// Call counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostStats {
    pub allocations: u64,
    pub frees: u64,
    pub copies: u64,
    pub locks: u64,
    pub unlocks: u64,
    pub max_concurrent_locks: usize,
}

/// Byte-vector resource backend
pub struct HostBackend {
    resources: DashMap<ResourceHandle, HostResource, RandomState>,
    next_handle: AtomicU64,
    faults: HostFaults,
    allocations: AtomicU64,
    frees: AtomicU64,
    copies: AtomicU64,
    locks: AtomicU64,
    unlocks: AtomicU64,
    active_locks: AtomicUsize,
    max_concurrent_locks: AtomicUsize,
}

impl HostBackend {
    pub fn new() -> Self {
        Self {
            resources: DashMap::with_hasher(RandomState::new()),
            next_handle: AtomicU64::new(1),
            faults: HostFaults::default(),
            allocations: AtomicU64::new(0),
            frees: AtomicU64::new(0),
            copies: AtomicU64::new(0),
            locks: AtomicU64::new(0),
            unlocks: AtomicU64::new(0),
            active_locks: AtomicUsize::new(0),
            max_concurrent_locks: AtomicUsize::new(0),
        }
    }

    fn insert(&self, shape: ResourceShapeKey, data: Vec<u8>, tier: Option<TierId>) -> ResourceHandle {
        let handle = ResourceHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        self.resources
            .insert(handle, HostResource { shape, data, tier });
        handle
    }

    /// Register a producer-side resource with initial contents
    pub fn create_resource(&self, shape: ResourceShapeKey, data: Vec<u8>) -> ResourceHandle {
        self.insert(shape, data, None)
    }

    /// Register a linear buffer resource
    pub fn create_buffer(&self, data: Vec<u8>) -> ResourceHandle {
        let shape = ResourceShapeKey::buffer(data.len() as u32);
        self.create_resource(shape, data)
    }

    /// Overwrite a resource's contents, as a producer reusing it would
    pub fn write(&self, handle: ResourceHandle, data: &[u8]) -> BackendResult<()> {
        let mut entry = self
            .resources
            .get_mut(&handle)
            .ok_or(BackendError::InvalidHandle(handle))?;
        entry.data.clear();
        entry.data.extend_from_slice(data);
        Ok(())
    }

    pub fn contents(&self, handle: ResourceHandle) -> Option<Vec<u8>> {
        self.resources.get(&handle).map(|r| r.data.clone())
    }

    /// Drop a producer-side resource
    pub fn destroy(&self, handle: ResourceHandle) {
        self.resources.remove(&handle);
    }

    /// Resources allocated through `allocate` and not yet freed
    pub fn staging_resources(&self) -> usize {
        self.resources.iter().filter(|r| r.tier.is_some()).count()
    }

    pub fn faults(&self) -> &HostFaults {
        &self.faults
    }

    pub fn stats(&self) -> HostStats {
        HostStats {
            allocations: self.allocations.load(Ordering::Relaxed),
            frees: self.frees.load(Ordering::Relaxed),
            copies: self.copies.load(Ordering::Relaxed),
            locks: self.locks.load(Ordering::Relaxed),
            unlocks: self.unlocks.load(Ordering::Relaxed),
            max_concurrent_locks: self.max_concurrent_locks.load(Ordering::Relaxed),
        }
    }
}

impl Default for HostBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceBackend for HostBackend {
    fn query_size(&self, handle: ResourceHandle) -> BackendResult<Size> {
        if HostFaults::hit(&self.faults.size_query) {
            return Err(BackendError::Failed("size query disabled".into()));
        }
        self.resources
            .get(&handle)
            .map(|r| r.data.len())
            .ok_or(BackendError::InvalidHandle(handle))
    }

    fn query_shape(&self, handle: ResourceHandle) -> BackendResult<ResourceShapeKey> {
        if HostFaults::hit(&self.faults.shape_query) {
            return Err(BackendError::Failed("shape query disabled".into()));
        }
        self.resources
            .get(&handle)
            .map(|r| r.shape)
            .ok_or(BackendError::InvalidHandle(handle))
    }

    fn allocate(
        &self,
        shape: &ResourceShapeKey,
        size: Size,
        tier: TierId,
    ) -> BackendResult<ResourceHandle> {
        if HostFaults::hit(&self.faults.allocate) {
            return Err(BackendError::OutOfMemory { requested: size });
        }
        self.allocations.fetch_add(1, Ordering::Relaxed);
        let handle = self.insert(*shape, vec![0; size], Some(tier));
        trace!(%handle, size, %tier, "host allocation");
        Ok(handle)
    }

    fn free(&self, handle: ResourceHandle) {
        if self.resources.remove(&handle).is_some() {
            self.frees.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn copy(&self, src: ResourceHandle, dst: ResourceHandle) -> BackendResult<()> {
        if HostFaults::hit(&self.faults.copy) {
            return Err(BackendError::Failed("copy engine disabled".into()));
        }

        // Separate lookups: both handles may live in the same shard
        let data = self
            .resources
            .get(&src)
            .map(|r| r.data.clone())
            .ok_or(BackendError::InvalidHandle(src))?;

        let mut dest = self
            .resources
            .get_mut(&dst)
            .ok_or(BackendError::InvalidHandle(dst))?;
        if dest.data.len() < data.len() {
            return Err(BackendError::SizeMismatch {
                source_size: data.len(),
                dest_size: dest.data.len(),
            });
        }
        dest.data[..data.len()].copy_from_slice(&data);
        drop(dest);

        self.copies.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn lock_for_read(&self, handle: ResourceHandle) -> BackendResult<Bytes> {
        if HostFaults::hit(&self.faults.lock) {
            return Err(BackendError::Failed("lock disabled".into()));
        }
        let bytes = self
            .resources
            .get(&handle)
            .map(|r| Bytes::copy_from_slice(&r.data))
            .ok_or(BackendError::InvalidHandle(handle))?;

        self.locks.fetch_add(1, Ordering::Relaxed);
        let active = self.active_locks.fetch_add(1, Ordering::AcqRel) + 1;
        self.max_concurrent_locks.fetch_max(active, Ordering::AcqRel);
        Ok(bytes)
    }

    fn unlock(&self, _handle: ResourceHandle) {
        self.unlocks.fetch_add(1, Ordering::Relaxed);
        self.active_locks.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Fixed memory sizes for both tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticBudget {
    pub shared: Size,
    pub local: Size,
}

impl StaticBudget {
    pub const fn new(shared: Size, local: Size) -> Self {
        Self { shared, local }
    }
}

impl MemoryBudgetProvider for StaticBudget {
    fn total_tier_capacity(&self, tier: TierId) -> Size {
        match tier {
            TierId::Shared => self.shared,
            TierId::Local => self.local,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_copy_and_lock() {
        let backend = HostBackend::new();
        let src = backend.create_buffer(vec![1, 2, 3, 4]);
        let shape = backend.query_shape(src).unwrap();
        let dst = backend.allocate(&shape, 4, TierId::Shared).unwrap();

        backend.copy(src, dst).unwrap();
        backend.write(src, &[9, 9, 9, 9]).unwrap();

        let view = backend.lock_for_read(dst).unwrap();
        assert_eq!(&view[..], &[1, 2, 3, 4]);
        backend.unlock(dst);

        let stats = backend.stats();
        assert_eq!(stats.copies, 1);
        assert_eq!(stats.locks, stats.unlocks);
        assert_eq!(backend.staging_resources(), 1);
    }

    #[test]
    fn test_copy_into_smaller_resource_fails() {
        let backend = HostBackend::new();
        let src = backend.create_buffer(vec![0; 16]);
        let dst = backend
            .allocate(&ResourceShapeKey::buffer(8), 8, TierId::Shared)
            .unwrap();

        assert_eq!(
            backend.copy(src, dst),
            Err(BackendError::SizeMismatch {
                source_size: 16,
                dest_size: 8
            })
        );
    }

    #[test]
    fn test_faults() {
        let backend = HostBackend::new();
        let res = backend.create_buffer(vec![0; 8]);

        backend.faults().size_query.store(true, Ordering::Release);
        assert!(backend.query_size(res).is_err());

        backend.faults().clear();
        assert_eq!(backend.query_size(res), Ok(8));
        assert_eq!(
            backend.query_size(ResourceHandle(999)),
            Err(BackendError::InvalidHandle(ResourceHandle(999)))
        );
    }

    #[test]
    fn test_free_counts_once() {
        let backend = HostBackend::new();
        let handle = backend
            .allocate(&ResourceShapeKey::buffer(4), 4, TierId::Local)
            .unwrap();
        backend.free(handle);
        backend.free(handle);
        assert_eq!(backend.stats().frees, 1);
    }
}
