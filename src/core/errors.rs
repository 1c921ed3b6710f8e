/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use super::types::{ResourceHandle, Size};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result of a pipeline-internal operation
pub type DumpResult<T> = Result<T, DumpError>;

/// Result of a call into a [`ResourceBackend`](crate::memory::ResourceBackend)
pub type BackendResult<T> = Result<T, BackendError>;

/// What happened to a request that found every tier exhausted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustionOutcome {
    /// Request was not staged and will never be dumped
    Dropped,
    /// Producer waited for a buffer in its bucket to free up
    Blocked,
}

/// Per-request failures. None of them is fatal to the pipeline.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum DumpError {
    #[error("Failed to query resource size: {reason}")]
    #[diagnostic(
        code(dump::size_query_failed),
        help("The resource has no size information. Check that the handle refers to a live resource.")
    )]
    SizeQueryFailed { reason: String },

    #[error("Invalid dump window: offset {offset} + size {dump_size} exceeds resource size {resource_size}")]
    #[diagnostic(
        code(dump::size_or_offset_invalid),
        help("Pass dump_size = 0 to dump everything after the offset.")
    )]
    SizeOrOffsetInvalid {
        offset: Size,
        dump_size: Size,
        resource_size: Size,
    },

    #[error("Failed to query resource shape: {reason}")]
    #[diagnostic(
        code(dump::shape_query_failed),
        help("The backend could not describe the resource layout.")
    )]
    ShapeQueryFailed { reason: String },

    #[error("Staging memory exhausted: {requested} bytes requested ({outcome:?})")]
    #[diagnostic(
        code(dump::allocation_exhausted),
        help("Raise max_percent_shared / max_percent_local or disable allow_data_loss to apply backpressure.")
    )]
    AllocationExhausted {
        requested: Size,
        outcome: ExhaustionOutcome,
    },

    #[error("Failed to copy resource into staging buffer: {reason}")]
    #[diagnostic(code(dump::copy_failed))]
    CopyFailed { reason: String },

    #[error("Failed to lock staging buffer for read: {reason}")]
    #[diagnostic(code(dump::lock_failed))]
    LockFailed { reason: String },
}

impl DumpError {
    /// Suffix of the `<label>.<tag>` error marker
    #[inline]
    pub const fn tag(&self) -> &'static str {
        match self {
            DumpError::SizeQueryFailed { .. } => "get_surface_size_failed",
            DumpError::SizeOrOffsetInvalid { .. } => "incorrect_size_offset",
            DumpError::ShapeQueryFailed { .. } => "get_resource_info_failed",
            DumpError::AllocationExhausted {
                outcome: ExhaustionOutcome::Dropped,
                ..
            } => "discarded",
            DumpError::AllocationExhausted {
                outcome: ExhaustionOutcome::Blocked,
                ..
            } => "blocked",
            DumpError::CopyFailed { .. } => "surface_copy_failed",
            DumpError::LockFailed { .. } => "lock_failed",
        }
    }

    /// Only outcomes that lose the request produce a marker
    #[inline]
    pub const fn loses_request(&self) -> bool {
        !matches!(
            self,
            DumpError::AllocationExhausted {
                outcome: ExhaustionOutcome::Blocked,
                ..
            }
        )
    }
}

/// Failures reported by the resource backend
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum BackendError {
    #[error("Unknown resource {0}")]
    #[diagnostic(code(backend::invalid_handle))]
    InvalidHandle(ResourceHandle),

    #[error("Device out of memory: requested {requested} bytes")]
    #[diagnostic(code(backend::out_of_memory))]
    OutOfMemory { requested: Size },

    #[error("Copy size mismatch: source {source_size} bytes, destination {dest_size} bytes")]
    #[diagnostic(code(backend::size_mismatch))]
    SizeMismatch { source_size: Size, dest_size: Size },

    #[error("Backend operation failed: {0}")]
    #[diagnostic(code(backend::failed))]
    Failed(String),
}

/// Invalid configuration values
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum ConfigError {
    #[error("{key} must be within 0..=100, got {value}")]
    #[diagnostic(
        code(config::percent_out_of_range),
        help("Tier budgets are expressed as a percentage of the reported memory size.")
    )]
    PercentOutOfRange { key: String, value: u64 },

    #[error("Neither write_to_file nor write_to_trace is enabled")]
    #[diagnostic(
        code(config::no_write_target),
        help("Enable at least one persistence target or dumps are silently discarded.")
    )]
    NoWriteTarget,

    #[error("Invalid value for {key}: {value}")]
    #[diagnostic(code(config::invalid_value))]
    InvalidValue { key: String, value: String },

    #[error("Failed to parse configuration: {0}")]
    #[diagnostic(code(config::parse))]
    Parse(String),
}

/// Pipeline construction failures
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum PipelineError {
    #[error("Invalid configuration: {0}")]
    #[diagnostic(code(pipeline::config))]
    Config(#[from] ConfigError),

    #[error("Missing collaborator: {0}")]
    #[diagnostic(
        code(pipeline::missing_collaborator),
        help("Provide a resource backend, a budget provider and a persistence sink.")
    )]
    MissingCollaborator(String),

    #[error("Failed to spawn scheduler thread: {0}")]
    #[diagnostic(code(pipeline::spawn_failed))]
    SpawnFailed(String),
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_marker_tags() {
        let cases = [
            (
                DumpError::SizeQueryFailed {
                    reason: "gone".into(),
                },
                "get_surface_size_failed",
            ),
            (
                DumpError::SizeOrOffsetInvalid {
                    offset: 8,
                    dump_size: 16,
                    resource_size: 16,
                },
                "incorrect_size_offset",
            ),
            (
                DumpError::ShapeQueryFailed {
                    reason: "no info".into(),
                },
                "get_resource_info_failed",
            ),
            (
                DumpError::AllocationExhausted {
                    requested: 64,
                    outcome: ExhaustionOutcome::Dropped,
                },
                "discarded",
            ),
            (
                DumpError::CopyFailed {
                    reason: "engine hang".into(),
                },
                "surface_copy_failed",
            ),
            (
                DumpError::LockFailed {
                    reason: "busy".into(),
                },
                "lock_failed",
            ),
        ];

        for (err, tag) in cases {
            assert_eq!(err.tag(), tag);
            assert!(err.loses_request());
        }
    }

    #[test]
    fn test_blocked_is_not_a_loss() {
        let err = DumpError::AllocationExhausted {
            requested: 64,
            outcome: ExhaustionOutcome::Blocked,
        };
        assert!(!err.loses_request());
    }

    #[test]
    fn test_error_serialization() {
        let err = DumpError::SizeOrOffsetInvalid {
            offset: 4,
            dump_size: 8,
            resource_size: 10,
        };
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("size_or_offset_invalid"));

        let back: DumpError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, err);
    }
}
