/*!
 * Scheduler Types
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Dump scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerPhase {
    /// No dump in flight; the queue may still hold jobs
    Idle,
    /// Exactly one job is being dumped by a worker
    Dispatching,
    /// Shutdown requested; the backlog is being processed synchronously
    Draining,
    /// Terminal
    Stopped,
}

impl SchedulerPhase {
    #[inline(always)]
    pub const fn as_str(&self) -> &'static str {
        match self {
            SchedulerPhase::Idle => "idle",
            SchedulerPhase::Dispatching => "dispatching",
            SchedulerPhase::Draining => "draining",
            SchedulerPhase::Stopped => "stopped",
        }
    }

    /// Whether new dispatches may still happen asynchronously
    #[inline]
    pub const fn is_running(&self) -> bool {
        matches!(self, SchedulerPhase::Idle | SchedulerPhase::Dispatching)
    }
}

impl fmt::Display for SchedulerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
