//! Where large-file hashing runs.
//!
//! An [`Offload`] accepts a boxed job and runs it somewhere other than the
//! calling task. Results travel back over a `tokio::sync::oneshot` channel,
//! whose receiver can be awaited from any executor.

use tokio::sync::oneshot;

/// A unit of blocking work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Submits blocking work to a worker pool.
pub trait Offload: Send + Sync {
    fn submit(&self, job: Job);
}

/// Runs jobs on tokio's blocking thread pool. Requires a tokio runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioBlocking;

impl Offload for TokioBlocking {
    fn submit(&self, job: Job) {
        // The join handle is dropped; the result comes back over the job's own channel.
        drop(tokio::task::spawn_blocking(job));
    }
}

/// Runs every job on a fresh OS thread. Works without any runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadOffload;

impl Offload for ThreadOffload {
    fn submit(&self, job: Job) {
        std::thread::spawn(job);
    }
}

/// Submit `f` and return a receiver for its result.
///
/// The receiver errors if the worker panicked or the job was dropped unrun.
pub(crate) fn run<T, F>(offload: &dyn Offload, f: F) -> oneshot::Receiver<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    offload.submit(Box::new(move || {
        // Receiver gone means the caller stopped waiting.
        let _ = tx.send(f());
    }));
    rx
}
