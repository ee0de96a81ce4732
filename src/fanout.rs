//! Concurrent fan-out of one operation over many inputs.
//!
//! Each batch runs on its own `rayon` pool (not the global one), one input per
//! job, and outcomes come back index-aligned with the inputs no matter which
//! job finished first.
//!
//! Jobs are never interrupted once started. A [`CancellationToken`] and an
//! optional batch deadline are checked before each job begins; jobs that never
//! start are reported as skipped. Hung network calls are bounded by the
//! transport's request timeout.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use rayon::prelude::*;

use crate::error::AppError;

/// Shared flag asking a running batch to stop starting new jobs.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Cancelled,
    DeadlineExceeded,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome<T> {
    Done(T),
    Skipped(SkipReason),
    /// The job panicked; carries the panic message.
    Panicked(String),
}

impl<T> TaskOutcome<T> {
    pub fn done(&self) -> Option<&T> {
        match self {
            TaskOutcome::Done(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_done(self) -> Option<T> {
        match self {
            TaskOutcome::Done(v) => Some(v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FanOutReport<T> {
    /// `outcomes[i]` belongs to `inputs[i]`.
    pub outcomes: Vec<TaskOutcome<T>>,
    pub elapsed: Duration,
}

impl<T> FanOutReport<T> {
    pub fn completed(&self) -> usize {
        self.outcomes.iter().filter(|o| matches!(o, TaskOutcome::Done(_))).count()
    }
}

/// Batch runner configuration.
#[derive(Debug, Clone, Default)]
pub struct FanOut {
    workers: Option<usize>,
    deadline: Option<Duration>,
    cancel: CancellationToken,
}

impl FanOut {
    pub fn new() -> Self {
        Self::default()
    }

    /// Worker thread count; defaults to one per input.
    pub fn workers(mut self, workers: Option<usize>) -> Self {
        self.workers = workers;
        self
    }

    /// Jobs not started within `deadline` of the batch start are skipped.
    pub fn deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Apply `op` to every input in parallel and block until all jobs finish.
    pub fn run<I, O, F>(&self, inputs: &[I], op: F) -> Result<FanOutReport<O>, AppError>
    where
        I: Sync,
        O: Send,
        F: Fn(&I) -> O + Sync,
    {
        let started = Instant::now();
        if inputs.is_empty() {
            return Ok(FanOutReport {
                outcomes: Vec::new(),
                elapsed: started.elapsed(),
            });
        }

        let workers = self.workers.unwrap_or(inputs.len()).max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("r1-fanout-{i}"))
            .build()
            .map_err(|e| AppError::runtime(format!("Failed to build worker pool: {e}")))?;

        tracing::debug!(inputs = inputs.len(), workers, "fan-out started");

        let outcomes: Vec<TaskOutcome<O>> = pool.install(|| {
            inputs
                .par_iter()
                .with_max_len(1)
                .map(|input| self.run_one(started, || op(input)))
                .collect()
        });

        let report = FanOutReport {
            outcomes,
            elapsed: started.elapsed(),
        };
        tracing::debug!(
            completed = report.completed(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "fan-out finished"
        );
        Ok(report)
    }

    fn run_one<O>(&self, started: Instant, job: impl FnOnce() -> O) -> TaskOutcome<O> {
        if self.cancel.is_cancelled() {
            return TaskOutcome::Skipped(SkipReason::Cancelled);
        }
        if self.deadline.is_some_and(|d| started.elapsed() >= d) {
            return TaskOutcome::Skipped(SkipReason::DeadlineExceeded);
        }
        match panic::catch_unwind(AssertUnwindSafe(job)) {
            Ok(v) => TaskOutcome::Done(v),
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!(%message, "fan-out job panicked");
                TaskOutcome::Panicked(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::thread;

    use super::*;

    #[test]
    fn outcomes_follow_input_order_not_completion_order() {
        let finished = Mutex::new(Vec::new());
        let inputs = ["A", "B", "C"];
        let report = FanOut::new()
            .run(&inputs, |t| {
                let delay = match *t {
                    "A" => 160,
                    "B" => 80,
                    _ => 0,
                };
                thread::sleep(Duration::from_millis(delay));
                finished.lock().unwrap().push(t.to_string());
                t.to_lowercase()
            })
            .unwrap();

        let outputs: Vec<_> = report.outcomes.into_iter().filter_map(TaskOutcome::into_done).collect();
        assert_eq!(outputs, ["a", "b", "c"]);
        assert_eq!(*finished.lock().unwrap(), ["C", "B", "A"]);
    }

    #[test]
    fn single_worker_still_completes_everything() {
        let inputs: Vec<u32> = (0..8).collect();
        let report = FanOut::new().workers(Some(1)).run(&inputs, |n| n * 2).unwrap();
        assert_eq!(report.completed(), 8);
        assert_eq!(report.outcomes[7], TaskOutcome::Done(14));
    }

    #[test]
    fn cancelled_batch_starts_nothing() {
        let token = CancellationToken::new();
        token.cancel();
        let report = FanOut::new().cancellation(token).run(&[1, 2, 3], |n| *n).unwrap();
        assert!(
            report
                .outcomes
                .iter()
                .all(|o| *o == TaskOutcome::Skipped(SkipReason::Cancelled))
        );
    }

    #[test]
    fn jobs_after_the_deadline_are_skipped() {
        let inputs = [0u64, 1, 2];
        let report = FanOut::new()
            .workers(Some(1))
            .deadline(Some(Duration::from_millis(50)))
            .run(&inputs, |_| thread::sleep(Duration::from_millis(120)))
            .unwrap();
        assert_eq!(report.outcomes[0], TaskOutcome::Done(()));
        assert!(
            report.outcomes[1..]
                .iter()
                .all(|o| *o == TaskOutcome::Skipped(SkipReason::DeadlineExceeded))
        );
    }

    #[test]
    fn a_panicking_job_does_not_sink_the_batch() {
        let report = FanOut::new()
            .run(&[1, 0, 2], |n| {
                if *n == 0 {
                    panic!("division by zero");
                }
                10 / n
            })
            .unwrap();
        assert_eq!(report.outcomes[0], TaskOutcome::Done(10));
        assert_eq!(report.outcomes[1], TaskOutcome::Panicked("division by zero".into()));
        assert_eq!(report.outcomes[2], TaskOutcome::Done(5));
    }

    #[test]
    fn empty_input_is_an_empty_report() {
        let report = FanOut::new().run(&[] as &[u8], |n| *n).unwrap();
        assert!(report.outcomes.is_empty());
    }
}
