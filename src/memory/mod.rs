/*!
 * Memory Module
 * Staging memory: tier budgets, the shape-bucketed buffer pool and the
 * resource backend interface
 */

pub mod budget;
pub mod host;
pub mod pool;
pub mod traits;
pub mod types;

// Re-export for convenience
pub use budget::{TierBudget, TierPlan};
pub use host::{HostBackend, HostFaults, HostStats, StaticBudget};
pub use pool::{Acquire, BufferPool, BufferSlot, BufferState, StagingBuffer};
pub use traits::*;
pub use types::*;
