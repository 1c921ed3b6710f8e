/*!
 * Scheduler Module
 * Single-flight dump dispatch and its state machine
 */

pub mod task;
pub mod types;

// Re-export public API
pub use task::SchedulerTask;
pub use types::SchedulerPhase;
