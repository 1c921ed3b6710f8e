/*!
 * Error Reporter
 *
 * Failed requests leave a zero-length `<label>.<tag>` marker next to where
 * the dump would have been written. Markers are written on detached threads:
 * they may outlive the pipeline and their failures are only logged.
 */

use super::writer::WriteStrategy;
use crate::core::errors::DumpError;
use crate::core::limits::ERROR_MARKER_THREAD_NAME;
use std::thread;
use tracing::{debug, warn};

/// Failure marker behavior
#[derive(Debug, Clone)]
pub enum ErrorReporter {
    /// Write markers through the pipeline's write strategy
    Markers(WriteStrategy),
    /// Log only
    Silent,
}

impl ErrorReporter {
    pub fn new(inform_on_error: bool, writer: &WriteStrategy) -> Self {
        if inform_on_error {
            ErrorReporter::Markers(writer.clone())
        } else {
            ErrorReporter::Silent
        }
    }

    /// Marker name for a failed request
    pub fn marker_name(label: &str, err: &DumpError) -> String {
        format!("{}.{}", label, err.tag())
    }

    /// Record a failed request. Never blocks on I/O.
    pub fn report(&self, label: &str, err: &DumpError) {
        if !err.loses_request() {
            debug!(label, tag = err.tag(), "request delayed: {}", err);
            return;
        }

        warn!(label, tag = err.tag(), "dump request failed: {}", err);

        let ErrorReporter::Markers(writer) = self else {
            return;
        };

        let name = Self::marker_name(label, err);
        let writer = writer.clone();
        let spawned = thread::Builder::new()
            .name(ERROR_MARKER_THREAD_NAME.into())
            .spawn(move || writer.write(&name, &[]));

        if let Err(e) = spawned {
            warn!(label, error = %e, "could not spawn error marker writer");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::ExhaustionOutcome;
    use crate::persist::sinks::{MemorySink, SinkChannel};
    use crate::persist::writer::WriteMode;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::time::Duration;

    fn lock_failed() -> DumpError {
        DumpError::LockFailed {
            reason: "busy".into(),
        }
    }

    #[test]
    fn test_marker_written_asynchronously() {
        let sink = Arc::new(MemorySink::new());
        let writer = WriteStrategy::new(WriteMode::FileOnly, sink.clone());
        let reporter = ErrorReporter::new(true, &writer);

        reporter.report("frame7", &lock_failed());

        assert!(sink.wait_for(1, Duration::from_secs(5)));
        let records = sink.records();
        assert_eq!(records[0].name, "frame7.lock_failed");
        assert_eq!(records[0].channel, SinkChannel::File);
        assert!(records[0].data.is_empty());
    }

    #[test]
    fn test_silent_reporter_writes_nothing() {
        let sink = Arc::new(MemorySink::new());
        let writer = WriteStrategy::new(WriteMode::FileOnly, sink.clone());
        let reporter = ErrorReporter::new(false, &writer);

        reporter.report("frame7", &lock_failed());

        assert!(!sink.wait_for(1, Duration::from_millis(100)));
    }

    #[test]
    fn test_blocked_outcome_is_not_marked() {
        let sink = Arc::new(MemorySink::new());
        let writer = WriteStrategy::new(WriteMode::FileOnly, sink.clone());
        let reporter = ErrorReporter::new(true, &writer);

        reporter.report(
            "frame7",
            &DumpError::AllocationExhausted {
                requested: 16,
                outcome: ExhaustionOutcome::Blocked,
            },
        );

        assert!(!sink.wait_for(1, Duration::from_millis(100)));
    }
}
