/*!
 * Pipeline Limits and Defaults
 *
 * Centralized location for configuration defaults, environment keys and
 * thread names used by the dump pipeline.
 */

// =============================================================================
// CONFIGURATION DEFAULTS
// =============================================================================

/// Write dumps to files unless told otherwise
pub const DEFAULT_WRITE_TO_FILE: bool = true;

/// Trace-channel writes are opt-in
pub const DEFAULT_WRITE_TO_TRACE: bool = false;

/// Emit `<label>.<tag>` markers on failures
pub const DEFAULT_INFORM_ON_ERROR: bool = true;

/// Drop requests instead of blocking producers when budgets are exhausted
pub const DEFAULT_ALLOW_DATA_LOSS: bool = true;

/// Share of system-shared memory usable for staging (tier 1)
pub const DEFAULT_MAX_PERCENT_SHARED: u8 = 75;

/// Share of device-local memory usable for staging (tier 2, disabled)
pub const DEFAULT_MAX_PERCENT_LOCAL: u8 = 0;

/// Upper bound for tier percentages
pub const MAX_PERCENT: u8 = 100;

/// Directory the demo binary dumps into when none is configured
pub const DEFAULT_OUTPUT_DIR: &str = "./dumps";

// =============================================================================
// ENVIRONMENT KEYS
// =============================================================================

pub const ENV_WRITE_FILE: &str = "FAST_DUMP_WRITE_FILE";
pub const ENV_WRITE_TRACE: &str = "FAST_DUMP_WRITE_TRACE";
pub const ENV_INFORM_ON_ERROR: &str = "FAST_DUMP_INFORM_ON_ERROR";
pub const ENV_ALLOW_DATA_LOSS: &str = "FAST_DUMP_ALLOW_DATA_LOSS";
pub const ENV_MAX_PERCENT_SHARED: &str = "FAST_DUMP_MAX_PERCENT_SHARED";
pub const ENV_MAX_PERCENT_LOCAL: &str = "FAST_DUMP_MAX_PERCENT_LOCAL";
pub const ENV_SAMPLING_ACTIVE_MS: &str = "FAST_DUMP_SAMPLING_ACTIVE_MS";
pub const ENV_SAMPLING_IDLE_MS: &str = "FAST_DUMP_SAMPLING_IDLE_MS";

/// Output directory of the demo binary
pub const ENV_OUTPUT_DIR: &str = "FAST_DUMP_OUTPUT_DIR";

/// JSON log output toggle for `init_tracing`
pub const ENV_TRACE_JSON: &str = "FAST_DUMP_TRACE_JSON";

// =============================================================================
// THREADS
// =============================================================================

pub const SCHEDULER_THREAD_NAME: &str = "fast-dump-scheduler";
pub const WORKER_THREAD_NAME: &str = "fast-dump-worker";
pub const FILE_WRITER_THREAD_NAME: &str = "fast-dump-file";
pub const ERROR_MARKER_THREAD_NAME: &str = "fast-dump-marker";

/// Target used for trace-channel events emitted by the reference sink
pub const TRACE_TARGET: &str = "fast_dump::trace";

/// Bytes of payload hex-encoded per trace-channel event
pub const TRACE_CHUNK_BYTES: usize = 4096;
