// batchreplace - scheduler/job.rs
//
// Runs one Job: Discovering -> Processing -> Finalizing -> a terminal state.
//
// A handle type lives on the caller's thread exposing poll/cancel/pause, and the
// actual work runs on a spawned background thread that streams progress back
// over an mpsc channel. Discovery runs as its own producer thread feeding a
// bounded channel; a rayon thread pool sized to the job's resolved
// concurrency drains that channel via `par_bridge`, so processing starts on
// the first discovered file instead of waiting for the whole tree to
// enumerate. A single aggregator thread is the only writer to `JobStats`'s
// processing counters, so the stats the caller observes are never torn by
// concurrent updates.

use crate::core::model::{
    FileDescriptor, FileResult, JobConfig, JobState, JobStats, ObserverEvent, Phase,
    ProgressEvent, Ruleset,
};
use crate::core::walker;
use crate::util::constants;
use crate::util::error::{DiscoveryError, JobError};
use crate::worker::file_worker::{self, ProcessOptions};
use chrono::Utc;
use rayon::iter::ParallelBridge;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::{Duration, Instant};

/// Handle to a running (or finished) job. Lives on the caller's thread.
pub struct JobHandle {
    event_rx: mpsc::Receiver<ObserverEvent>,
    cancel: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    stats: Arc<Mutex<JobStats>>,
    state: Arc<Mutex<JobState>>,
}

impl JobHandle {
    /// Request cancellation. Already-started files are allowed to finish
    /// their current rule pass; files not yet started are reported `Skipped`.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Pause dispatch of not-yet-started files. Has no effect on a file
    /// already mid-processing.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> JobState {
        *self.state.lock().expect("job state mutex poisoned")
    }

    pub fn stats(&self) -> JobStats {
        self.stats.lock().expect("job stats mutex poisoned").clone()
    }

    /// Drain at most `max` pending events without blocking.
    pub fn poll_events(&self, max: usize) -> Vec<ObserverEvent> {
        let mut events = Vec::with_capacity(max.min(64));
        while events.len() < max {
            match self.event_rx.try_recv() {
                Ok(event) => events.push(event),
                Err(_) => break,
            }
        }
        events
    }

    /// Block until the job reaches a terminal state, returning the final
    /// stats. Intended for the CLI's synchronous `run`/`preview` paths.
    pub fn join(self) -> JobStats {
        loop {
            for event in self.event_rx.iter() {
                if let ObserverEvent::StateChanged(s) = &event {
                    if s.is_terminal() {
                        return self.stats();
                    }
                }
            }
            if self.state().is_terminal() {
                return self.stats();
            }
        }
    }
}

/// Start a job on a background thread and return a handle to it.
pub fn run_job(config: JobConfig) -> JobHandle {
    let (event_tx, event_rx) = mpsc::channel();
    let cancel = Arc::new(AtomicBool::new(false));
    let paused = Arc::new(AtomicBool::new(false));
    let stats = Arc::new(Mutex::new(JobStats::default()));
    let state = Arc::new(Mutex::new(JobState::Idle));

    let handle = JobHandle {
        event_rx,
        cancel: Arc::clone(&cancel),
        paused: Arc::clone(&paused),
        stats: Arc::clone(&stats),
        state: Arc::clone(&state),
    };

    std::thread::spawn(move || {
        run_job_inner(config, event_tx, cancel, paused, stats, state);
    });

    handle
}

fn set_state(state: &Arc<Mutex<JobState>>, tx: &mpsc::Sender<ObserverEvent>, new: JobState) {
    *state.lock().expect("job state mutex poisoned") = new;
    let _ = tx.send(ObserverEvent::StateChanged(new));
}

fn run_job_inner(
    config: JobConfig,
    event_tx: mpsc::Sender<ObserverEvent>,
    cancel: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    stats: Arc<Mutex<JobStats>>,
    state: Arc<Mutex<JobState>>,
) {
    {
        let mut s = stats.lock().expect("job stats mutex poisoned");
        s.started_at = Some(Utc::now());
    }

    set_state(&state, &event_tx, JobState::Discovering);

    let concurrency = resolve_concurrency(config.options.concurrency);
    let pool = match rayon::ThreadPoolBuilder::new().num_threads(concurrency).build() {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build worker pool");
            let _ = event_tx.send(ObserverEvent::Warning(
                JobError::PoolBuildFailed { reason: e.to_string() }.to_string(),
            ));
            finalize(&stats, &state, &event_tx, JobState::Failed);
            return;
        }
    };

    // The bounded channel between the discovery producer and the worker
    // pool: `file_tx.send` blocks once it holds `queue_depth` undispatched
    // files, so a fast walker cannot run arbitrarily far ahead of a slow
    // worker pool.
    let queue_depth = (concurrency * constants::QUEUE_DEPTH_MULTIPLIER).max(1);
    let (file_tx, file_rx) = mpsc::sync_channel::<FileDescriptor>(queue_depth);
    let (discovery_done_tx, discovery_done_rx) = mpsc::channel::<Result<(), DiscoveryError>>();

    let producer_root = config.root_directory.clone();
    let producer_filter = config.filter.clone();
    let producer_event_tx = event_tx.clone();
    let producer_stats = Arc::clone(&stats);
    let producer_cancel = Arc::clone(&cancel);

    let producer = std::thread::spawn(move || {
        let mut last_emit = Instant::now()
            .checked_sub(Duration::from_millis(constants::DEFAULT_PROGRESS_INTERVAL_MS))
            .unwrap_or_else(Instant::now);

        let result = walker::walk_streaming(
            &producer_root,
            &producer_filter,
            |descriptor| {
                if file_tx.send(descriptor).is_err() {
                    // Nothing left to drain the channel; stop discovering.
                    return false;
                }

                let snapshot = {
                    let mut s = producer_stats.lock().expect("job stats mutex poisoned");
                    s.total_files += 1;
                    s.clone()
                };

                if last_emit.elapsed()
                    >= Duration::from_millis(constants::DEFAULT_PROGRESS_INTERVAL_MS)
                {
                    last_emit = Instant::now();
                    let _ = producer_event_tx.send(ObserverEvent::Progress(ProgressEvent {
                        processed_files: snapshot.processed_files,
                        total_files: snapshot.total_files,
                        modified_files: snapshot.modified_files,
                        total_replacements: snapshot.total_replacements,
                        current_path: None,
                        phase: Phase::Discovering,
                    }));
                }

                !producer_cancel.load(Ordering::SeqCst)
            },
            |warning| {
                let _ = producer_event_tx.send(ObserverEvent::Warning(warning));
            },
        );

        let _ = discovery_done_tx.send(result);
    });

    set_state(&state, &event_tx, JobState::Processing);

    let (result_tx, result_rx) = mpsc::channel::<FileResult>();
    let aggregator_stats = Arc::clone(&stats);
    let aggregator_event_tx = event_tx.clone();

    let aggregator = std::thread::spawn(move || {
        aggregate(result_rx, aggregator_stats, aggregator_event_tx);
    });

    let ruleset = Arc::new(config.ruleset);
    let process_options = ProcessOptions {
        dry_run: config.options.dry_run,
        create_backup: config.options.create_backup,
    };

    // `par_bridge` pulls the next file off `file_rx` only as a worker
    // thread becomes free, so the channel above provides real backpressure
    // between discovery and processing rather than just a staging buffer.
    // `for_each_with` clones the sender once per rayon worker thread rather
    // than sharing one instance across threads — `mpsc::Sender` is `Send`
    // but not `Sync`, so a plain shared capture would not compile.
    pool.install(|| {
        file_rx
            .into_iter()
            .par_bridge()
            .for_each_with(result_tx, |tx, descriptor| {
                while paused.load(Ordering::SeqCst) && !cancel.load(Ordering::SeqCst) {
                    std::thread::sleep(Duration::from_millis(constants::SCHEDULER_POLL_INTERVAL_MS));
                }
                let result = file_worker::process(&descriptor, &ruleset, process_options, &cancel);
                let _ = tx.send(result);
            });
    });

    let _ = producer.join();
    let _ = aggregator.join();

    if let Ok(Err(discovery_err)) = discovery_done_rx.recv() {
        tracing::error!(error = %discovery_err, "Discovery failed, job aborted");
        let _ = event_tx.send(ObserverEvent::Warning(
            JobError::DiscoveryFailed(discovery_err).to_string(),
        ));
        finalize(&stats, &state, &event_tx, JobState::Failed);
        return;
    }

    set_state(&state, &event_tx, JobState::Finalizing);

    let final_state = if cancel.load(Ordering::SeqCst) {
        JobState::Cancelled
    } else {
        JobState::Complete
    };
    finalize(&stats, &state, &event_tx, final_state);
}

/// Single writer of `JobStats`'s processing counters: drains `FileResult`s
/// from the worker pool, folds them into the running totals, and emits
/// throttled `ProgressEvent`s and per-file `FileDone` events to the caller.
fn aggregate(
    result_rx: mpsc::Receiver<FileResult>,
    stats: Arc<Mutex<JobStats>>,
    event_tx: mpsc::Sender<ObserverEvent>,
) {
    let mut last_emit = Instant::now()
        .checked_sub(Duration::from_millis(constants::DEFAULT_PROGRESS_INTERVAL_MS))
        .unwrap_or_else(Instant::now);

    for result in result_rx.iter() {
        let snapshot = {
            let mut s = stats.lock().expect("job stats mutex poisoned");
            s.processed_files += 1;
            match result.status {
                crate::core::model::FileStatus::Modified => {
                    s.modified_files += 1;
                    s.total_replacements += result.total_replacements;
                }
                crate::core::model::FileStatus::Error => s.errors += 1,
                crate::core::model::FileStatus::Unchanged
                | crate::core::model::FileStatus::Skipped => {}
            }
            s.clone()
        };

        let current_path = Some(result.path.clone());
        let _ = event_tx.send(ObserverEvent::FileDone(result));

        if last_emit.elapsed() >= Duration::from_millis(constants::DEFAULT_PROGRESS_INTERVAL_MS) {
            last_emit = Instant::now();
            let _ = event_tx.send(ObserverEvent::Progress(ProgressEvent {
                processed_files: snapshot.processed_files,
                total_files: snapshot.total_files,
                modified_files: snapshot.modified_files,
                total_replacements: snapshot.total_replacements,
                current_path,
                phase: Phase::Processing,
            }));
        }
    }
}

/// Finalize the job: stamp `endedAt`, emit one `ProgressEvent{phase:
/// Finalizing}` carrying the exact final counts (guaranteed regardless of
/// throttling — the one Progress event the observer contract does not
/// allow dropping the last instance of), then transition to the terminal
/// state.
fn finalize(
    stats: &Arc<Mutex<JobStats>>,
    state: &Arc<Mutex<JobState>>,
    event_tx: &mpsc::Sender<ObserverEvent>,
    final_state: JobState,
) {
    let snapshot = {
        let mut s = stats.lock().expect("job stats mutex poisoned");
        s.ended_at = Some(Utc::now());
        s.clone()
    };

    let _ = event_tx.send(ObserverEvent::Progress(ProgressEvent {
        processed_files: snapshot.processed_files,
        total_files: snapshot.total_files,
        modified_files: snapshot.modified_files,
        total_replacements: snapshot.total_replacements,
        current_path: None,
        phase: Phase::Finalizing,
    }));

    set_state(state, event_tx, final_state);
}

/// Resolve a `JobOptions::concurrency` of 0 ("auto") to
/// `min(available_parallelism, DEFAULT_MAX_CONCURRENCY)`; a non-zero value
/// is used as-is, floored at `MIN_CONCURRENCY`.
fn resolve_concurrency(requested: usize) -> usize {
    if requested == 0 {
        let available = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(constants::MIN_CONCURRENCY);
        available.min(constants::DEFAULT_MAX_CONCURRENCY)
    } else {
        requested.max(constants::MIN_CONCURRENCY)
    }
}
