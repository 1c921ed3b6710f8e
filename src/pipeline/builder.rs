/*!
 * Fast Dump Builder
 * Builder pattern for FastDump construction
 */

use super::shared::{Counters, PipelineState, Shared};
use super::FastDump;
use crate::core::config::DumpConfig;
use crate::core::errors::{ConfigError, PipelineError};
use crate::memory::{BufferPool, MemoryBudgetProvider, ResourceBackend, TierBudget};
use crate::monitoring::SamplingGate;
use crate::persist::{ErrorReporter, PersistenceSink, WriteStrategy};
use crate::scheduler::SchedulerTask;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use tracing::{info, warn};

/// Builder for FastDump
#[derive(Default)]
pub struct FastDumpBuilder {
    backend: Option<Arc<dyn ResourceBackend>>,
    budget: Option<Arc<dyn MemoryBudgetProvider>>,
    sink: Option<Arc<dyn PersistenceSink>>,
    config: DumpConfig,
}

impl FastDumpBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resource backend used for queries, staging allocations, copies and reads
    pub fn with_backend(mut self, backend: Arc<dyn ResourceBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Platform memory sizes the tier budgets are derived from
    pub fn with_budget(mut self, budget: Arc<dyn MemoryBudgetProvider>) -> Self {
        self.budget = Some(budget);
        self
    }

    /// Persistence target for dumps and error markers
    pub fn with_sink(mut self, sink: Arc<dyn PersistenceSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_config(mut self, config: DumpConfig) -> Self {
        self.config = config;
        self
    }

    /// Resolve strategies, discover budgets and start the scheduler
    pub fn build(self) -> Result<FastDump, PipelineError> {
        let backend = self
            .backend
            .ok_or_else(|| PipelineError::MissingCollaborator("resource backend".into()))?;
        let budget = self
            .budget
            .ok_or_else(|| PipelineError::MissingCollaborator("memory budget provider".into()))?;
        let sink = self
            .sink
            .ok_or_else(|| PipelineError::MissingCollaborator("persistence sink".into()))?;
        let config = self.config;

        match config.validate() {
            Ok(()) => {}
            Err(ConfigError::NoWriteTarget) => {
                warn!("No write target configured, dumps will be discarded");
            }
            Err(e) => return Err(e.into()),
        }

        let writer = WriteStrategy::from_config(&config, sink);
        let reporter = ErrorReporter::new(config.inform_on_error, &writer);
        let tiers = TierBudget::discover(
            budget.as_ref(),
            config.max_percent_shared,
            config.max_percent_local,
        );
        let gate = SamplingGate::new(config.sampling_active(), config.sampling_idle());

        let shared = Arc::new(Shared {
            state: Mutex::new(PipelineState::new(BufferPool::new(tiers))),
            cond: Condvar::new(),
            backend,
            writer,
            reporter,
            allow_data_loss: config.allow_data_loss,
            counters: Counters::default(),
        });

        let scheduler = SchedulerTask::spawn(Arc::clone(&shared))
            .map_err(|e| PipelineError::SpawnFailed(e.to_string()))?;

        info!(
            mode = ?shared.writer.mode(),
            inform_on_error = config.inform_on_error,
            allow_data_loss = config.allow_data_loss,
            sampling = gate.is_enabled(),
            "Fast dump pipeline ready"
        );

        Ok(FastDump {
            shared,
            gate,
            scheduler: Some(scheduler),
        })
    }
}
