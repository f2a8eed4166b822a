//! Bounded worker-pool execution of independent per-repository tasks.
//!
//! Every task is fully independent: no ordering between completions, no
//! shared mutable state between units, and one task's failure never cancels
//! its siblings. Results flow through a channel drained after the pool
//! finishes, so the collection needs no locking in task code.

use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;

use tracing::debug;

use crate::core::identity::RepoId;
use crate::core::task::TaskResult;

/// Worker cap for a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parallelism {
    /// One worker; completions arrive in submission order.
    Sequential,
    /// At most this many workers.
    Bounded(NonZeroUsize),
    /// One worker per available processing unit.
    Available,
}

impl Parallelism {
    /// `Sequential` when asked for, an explicit cap when one is configured,
    /// otherwise available parallelism.
    pub fn from_flags(sequential: bool, max_parallelism: usize) -> Self {
        if sequential {
            return Self::Sequential;
        }
        match NonZeroUsize::new(max_parallelism) {
            Some(cap) => Self::Bounded(cap),
            None => Self::Available,
        }
    }

    fn worker_count(self, tasks: usize) -> usize {
        let cap = match self {
            Self::Sequential => 1,
            Self::Bounded(cap) => cap.get(),
            Self::Available => thread::available_parallelism().map_or(1, NonZeroUsize::get),
        };
        cap.min(tasks)
    }
}

/// Run `op` once per repository on a bounded pool of worker threads.
///
/// Guarantees exactly one result per repository: a panic inside `op` is
/// caught and converted to a failed result for that repository alone. The
/// observer is notified on the worker thread as each task finishes; it is
/// purely observational and does not affect the aggregated results.
///
/// Sequential and concurrent runs over the same input produce the same
/// results as an unordered collection; only completion order differs.
pub fn execute_all<F>(
    repos: &[RepoId],
    parallelism: Parallelism,
    observer: Option<&(dyn Fn(&TaskResult) + Sync)>,
    op: F,
) -> Vec<TaskResult>
where
    F: Fn(&RepoId) -> TaskResult + Sync,
{
    if repos.is_empty() {
        return Vec::new();
    }
    let workers = parallelism.worker_count(repos.len());
    debug!(tasks = repos.len(), workers, "executing batch");

    let cursor = AtomicUsize::new(0);
    let (sender, receiver) = mpsc::channel();
    thread::scope(|scope| {
        for _ in 0..workers {
            let sender = sender.clone();
            let cursor = &cursor;
            let op = &op;
            scope.spawn(move || {
                loop {
                    let index = cursor.fetch_add(1, Ordering::Relaxed);
                    let Some(repo) = repos.get(index) else { break };
                    let result = run_one(repo, op);
                    if let Some(observer) = observer {
                        observer(&result);
                    }
                    if sender.send(result).is_err() {
                        break;
                    }
                }
            });
        }
    });
    drop(sender);
    receiver.into_iter().collect()
}

fn run_one<F>(repo: &RepoId, op: &F) -> TaskResult
where
    F: Fn(&RepoId) -> TaskResult,
{
    match panic::catch_unwind(AssertUnwindSafe(|| op(repo))) {
        Ok(result) => result,
        Err(payload) => TaskResult::failed(
            repo.clone(),
            format!("task panicked: {}", panic_message(payload.as_ref())),
        ),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
