/*!
 * Fast Dump Library
 * Asynchronous capture-and-dump of hardware resources for offline inspection
 */

pub mod core;
pub mod memory;
pub mod monitoring;
pub mod persist;
pub mod pipeline;
pub mod scheduler;

// Re-exports
pub use crate::core::{
    BackendError, ConfigError, DumpConfig, DumpError, DumpResult, PipelineError,
    ResourceHandle, TierId,
};
pub use memory::{
    BufferPool, BufferSlot, HostBackend, MemoryBudgetProvider, PixelFormat, PoolStats,
    ResourceBackend, ResourceKind, ResourceShapeKey, StagingBuffer, StaticBudget,
};
pub use monitoring::{init_tracing, SamplingGate};
pub use persist::{
    DirectorySink, ErrorReporter, MemorySink, PersistenceSink, WriteMode, WriteStrategy,
};
pub use pipeline::{
    CaptureQueue, DumpJob, FastDump, FastDumpBuilder, JobId, PipelineStats, Submission,
};
pub use scheduler::SchedulerPhase;
