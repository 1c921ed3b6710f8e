/*!
 * Scheduler Task - Single-Flight Dump Dispatch
 *
 * Dedicated background thread that hands the front job of the capture queue
 * to a worker thread, one job at a time. The worker dumps the staging
 * buffer, then pops the job and releases the buffer back to the pool.
 *
 * Stopping the task only ends asynchronous dispatch: the in-flight job is
 * joined, and whatever is still queued is drained by the caller of
 * `FastDump::shutdown` (or its `Drop`).
 */

use super::types::SchedulerPhase;
use crate::core::limits::{SCHEDULER_THREAD_NAME, WORKER_THREAD_NAME};
use crate::pipeline::shared::Shared;
use parking_lot::MutexGuard;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Handle to the scheduler background thread
pub struct SchedulerTask {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl SchedulerTask {
    /// Spawn the scheduler loop
    pub(crate) fn spawn(shared: Arc<Shared>) -> io::Result<Self> {
        let loop_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name(SCHEDULER_THREAD_NAME.into())
            .spawn(move || run_scheduler_loop(loop_shared))?;

        info!("Dump scheduler spawned");

        Ok(Self {
            shared,
            handle: Some(handle),
        })
    }

    /// Request the loop to stop and wait for it (and its in-flight dump)
    pub(crate) fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };

        {
            let mut state = self.shared.state.lock();
            state.stop_requested = true;
            state.phase = SchedulerPhase::Draining;
        }
        self.shared.cond.notify_all();

        if handle.join().is_err() {
            warn!("Dump scheduler thread panicked");
        } else {
            debug!("Dump scheduler stopped");
        }
    }
}

impl Drop for SchedulerTask {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Core scheduler loop
fn run_scheduler_loop(shared: Arc<Shared>) {
    let mut worker: Option<JoinHandle<()>> = None;
    let mut state = shared.state.lock();

    loop {
        shared.cond.wait_while(&mut state, |s| {
            !s.stop_requested && (s.in_flight || s.queue.is_empty())
        });

        if state.stop_requested {
            break;
        }

        let Some(job) = state.queue.front().cloned() else {
            continue;
        };
        state.in_flight = true;
        state.phase = SchedulerPhase::Dispatching;

        // The previous worker cleared `in_flight` as its last step
        let finished = worker.take();
        let worker_shared = Arc::clone(&shared);
        let worker_job = job.clone();
        let spawned = MutexGuard::unlocked(&mut state, move || {
            if let Some(previous) = finished {
                let _ = previous.join();
            }
            thread::Builder::new()
                .name(WORKER_THREAD_NAME.into())
                .spawn(move || {
                    worker_shared.dump(&worker_job);
                    worker_shared.finish_front();
                })
        });

        match spawned {
            Ok(handle) => worker = Some(handle),
            Err(e) => {
                warn!(job = job.id, error = %e, "could not spawn dump worker, dumping inline");
                MutexGuard::unlocked(&mut state, || shared.dump(&job));
                shared.complete_front(&mut state);
                shared.cond.notify_all();
            }
        }
    }

    drop(state);

    if let Some(handle) = worker {
        if handle.join().is_err() {
            warn!("Dump worker panicked");
        }
    }
}
