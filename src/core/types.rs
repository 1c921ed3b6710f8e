/*!
 * Core Types
 * Common types used across the dump pipeline
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Size type for byte counts
pub type Size = usize;

/// Opaque handle to a backend-owned hardware resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceHandle(pub u64);

impl ResourceHandle {
    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "res#{}", self.0)
    }
}

/// Memory tier a staging buffer is allocated from, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierId {
    /// Tier 1: system memory shared with the device
    Shared,
    /// Tier 2: dedicated device-local memory
    Local,
}

impl TierId {
    pub const ALL: [TierId; 2] = [TierId::Shared, TierId::Local];

    #[inline(always)]
    pub const fn as_str(&self) -> &'static str {
        match self {
            TierId::Shared => "shared",
            TierId::Local => "local",
        }
    }
}

impl fmt::Display for TierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
