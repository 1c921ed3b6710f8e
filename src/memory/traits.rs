/*!
 * Memory Traits
 * Collaborator interfaces for resource access and budget discovery
 */

use super::types::ResourceShapeKey;
use crate::core::errors::BackendResult;
use crate::core::types::{ResourceHandle, Size, TierId};
use bytes::Bytes;

/// Hardware resource backend
///
/// Implementations own their internal serialization; the pipeline calls
/// into them without holding its own lock.
pub trait ResourceBackend: Send + Sync {
    /// Size in bytes of the resource's main surface
    fn query_size(&self, handle: ResourceHandle) -> BackendResult<Size>;

    /// Shape descriptor used to bucket staging buffers
    fn query_shape(&self, handle: ResourceHandle) -> BackendResult<ResourceShapeKey>;

    /// Allocate a linear, cacheable resource of the given shape from a tier
    fn allocate(
        &self,
        shape: &ResourceShapeKey,
        size: Size,
        tier: TierId,
    ) -> BackendResult<ResourceHandle>;

    /// Release a resource previously returned by `allocate`
    fn free(&self, handle: ResourceHandle);

    /// Copy the full contents of `src` into `dst`
    fn copy(&self, src: ResourceHandle, dst: ResourceHandle) -> BackendResult<()>;

    /// Map a resource read-only
    fn lock_for_read(&self, handle: ResourceHandle) -> BackendResult<Bytes>;

    /// Undo a successful `lock_for_read`
    fn unlock(&self, handle: ResourceHandle);
}

/// Platform memory size discovery
pub trait MemoryBudgetProvider: Send + Sync {
    /// Total bytes of memory backing a tier
    fn total_tier_capacity(&self, tier: TierId) -> Size;
}
