/*!
 * Memory Types
 * Resource shapes, tiers and pool statistics
 */

use crate::core::types::{Size, TierId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Broad resource category as reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Linear buffer
    Buffer,
    /// 2D surface
    Surface2D,
    /// 3D / array surface
    Volume,
}

/// Backend-defined pixel format code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PixelFormat(pub u32);

impl PixelFormat {
    /// Formatless resources (plain buffers)
    pub const INVALID: PixelFormat = PixelFormat(u32::MAX);
}

/// Pool bucket key. Ordering compares kind, width, height then format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceShapeKey {
    pub kind: ResourceKind,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

impl ResourceShapeKey {
    pub const fn new(kind: ResourceKind, width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            kind,
            width,
            height,
            format,
        }
    }

    /// Linear buffer of `len` bytes
    pub const fn buffer(len: u32) -> Self {
        Self::new(ResourceKind::Buffer, len, 1, PixelFormat::INVALID)
    }
}

impl fmt::Display for ResourceShapeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}/{}x{}/fmt{}",
            self.kind, self.width, self.height, self.format.0
        )
    }
}

/// Budget limit of a tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierCapacity {
    Bounded(Size),
    Unbounded,
}

/// Usage accounting for one memory tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryTier {
    pub id: TierId,
    pub capacity: TierCapacity,
    pub used: Size,
}

impl MemoryTier {
    pub const fn new(id: TierId, capacity: TierCapacity) -> Self {
        Self {
            id,
            capacity,
            used: 0,
        }
    }

    /// Whether `size` more bytes fit without exceeding the capacity
    #[inline]
    pub fn has_room(&self, size: Size) -> bool {
        match self.capacity {
            TierCapacity::Unbounded => true,
            TierCapacity::Bounded(cap) => self
                .used
                .checked_add(size)
                .map(|total| total <= cap)
                .unwrap_or(false),
        }
    }

    /// Bytes still available, `None` when unbounded
    pub fn available(&self) -> Option<Size> {
        match self.capacity {
            TierCapacity::Unbounded => None,
            TierCapacity::Bounded(cap) => Some(cap.saturating_sub(self.used)),
        }
    }
}

/// Snapshot of the buffer pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    pub tiers: Vec<MemoryTier>,
    pub buckets: usize,
    pub buffers: usize,
    pub occupied: usize,
}

impl PoolStats {
    pub fn tier(&self, id: TierId) -> Option<&MemoryTier> {
        self.tiers.iter().find(|t| t.id == id)
    }

    /// Total bytes charged across tiers
    pub fn used_bytes(&self) -> Size {
        self.tiers.iter().map(|t| t.used).sum()
    }
}
