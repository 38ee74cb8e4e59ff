//! Execution contexts for asynchronous dispatch.
//!
//! An asynchronous walk is packaged as a [`Task`] and handed to the pipeline's
//! [`Executor`]. The caller receives a [`DispatchFuture`] right away.
//!
//! Three executors are provided:
//!
//! - [`WorkerPool`] *(default)*: dedicated OS threads fed by a channel. One
//!   worker is enough, since asynchronous dispatch is about not blocking the
//!   caller rather than about parallelism.
//! - [`TokioExecutor`]: runs walks on a tokio runtime's blocking pool.
//! - [`InlineExecutor`]: runs walks on the calling thread.

use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::thread;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, trace};

use crate::error::{PipelineError, PipelineResult};

/// A unit of work scheduled by the pipeline.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Something that can run [`Task`]s off the caller's thread.
pub trait Executor: Send + Sync + 'static {
    /// Schedules `task` for execution.
    ///
    /// Implementations must not block until the task has run.
    fn execute(&self, task: Task);
}

impl<E: Executor + ?Sized> Executor for Arc<E> {
    fn execute(&self, task: Task) {
        (**self).execute(task)
    }
}

/// A shared, type-erased executor.
pub type BoxedExecutor = Arc<dyn Executor>;

// =============================================================================
// WorkerPool
// =============================================================================

/// Dedicated worker threads fed by an unbounded channel.
///
/// Workers exit once the pool and every clone of its sender are dropped and
/// the queue has drained.
pub struct WorkerPool {
    sender: mpsc::UnboundedSender<Task>,
    workers: usize,
}

impl WorkerPool {
    /// Default thread name prefix.
    pub const DEFAULT_THREAD_NAME: &'static str = "sluice-worker";

    /// Spawns a single worker thread.
    pub fn single() -> std::io::Result<Self> {
        Self::new(1, Self::DEFAULT_THREAD_NAME)
    }

    /// Spawns `workers` threads named `{thread_name}-{index}`.
    ///
    /// A worker count of zero is raised to one.
    pub fn new(workers: usize, thread_name: &str) -> std::io::Result<Self> {
        let workers = workers.max(1);
        let (sender, receiver) = mpsc::unbounded_channel::<Task>();
        let receiver = Arc::new(Mutex::new(receiver));

        for index in 0..workers {
            let receiver = Arc::clone(&receiver);
            thread::Builder::new()
                .name(format!("{thread_name}-{index}"))
                .spawn(move || worker_loop(&receiver))?;
        }

        debug!(workers, thread_name, "Started dispatch worker pool");
        Ok(Self { sender, workers })
    }

    /// Number of worker threads.
    pub fn workers(&self) -> usize {
        self.workers
    }
}

fn worker_loop(receiver: &Mutex<mpsc::UnboundedReceiver<Task>>) {
    loop {
        // The lock is only held while waiting; tasks run unlocked.
        let task = receiver.lock().blocking_recv();
        let Some(task) = task else { break };
        if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
            error!("Dispatch task panicked");
        }
    }
    trace!("Dispatch worker exiting");
}

impl Executor for WorkerPool {
    fn execute(&self, task: Task) {
        if self.sender.send(task).is_err() {
            // Every worker failed to start or has exited; the dropped task
            // surfaces as `Interrupted` on its future.
            error!("Dispatch worker pool is closed, dropping task");
        }
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers)
            .finish()
    }
}

// =============================================================================
// TokioExecutor
// =============================================================================

/// Runs tasks on the blocking thread pool of a tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioExecutor {
    handle: tokio::runtime::Handle,
}

impl TokioExecutor {
    /// Uses the given runtime handle.
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Uses the runtime the caller is currently running on, if any.
    pub fn current() -> Option<Self> {
        tokio::runtime::Handle::try_current().ok().map(Self::new)
    }
}

impl Executor for TokioExecutor {
    fn execute(&self, task: Task) {
        self.handle.spawn_blocking(task);
    }
}

// =============================================================================
// InlineExecutor
// =============================================================================

/// Runs every task immediately on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    fn execute(&self, task: Task) {
        task();
    }
}

// =============================================================================
// DispatchFuture
// =============================================================================

/// Pending result of an asynchronous dispatch.
///
/// Resolves to the walk's result, or to its error. If the task is dropped
/// before reporting, for example because an implementation panicked, the
/// future resolves to [`PipelineError::Interrupted`].
#[must_use = "futures do nothing unless polled"]
pub struct DispatchFuture<T> {
    receiver: oneshot::Receiver<PipelineResult<T>>,
    service: &'static str,
}

/// Sending half paired with a [`DispatchFuture`].
pub(crate) struct Completion<T> {
    sender: oneshot::Sender<PipelineResult<T>>,
}

impl<T> Completion<T> {
    pub(crate) fn complete(self, result: PipelineResult<T>) {
        // The caller may have dropped the future; nothing to report then.
        let _ = self.sender.send(result);
    }
}

impl<T> DispatchFuture<T> {
    pub(crate) fn channel(service: &'static str) -> (Completion<T>, Self) {
        let (sender, receiver) = oneshot::channel();
        (Completion { sender }, Self { receiver, service })
    }

    /// Blocks the current thread until the result is available.
    ///
    /// Must not be called from within an asynchronous runtime; `.await` the
    /// future there instead.
    pub fn wait(self) -> PipelineResult<T> {
        let service = self.service;
        self.receiver
            .blocking_recv()
            .unwrap_or(Err(PipelineError::Interrupted { service }))
    }

    /// Returns the result if it is already available, without blocking.
    pub fn try_take(&mut self) -> Option<PipelineResult<T>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(PipelineError::Interrupted {
                service: self.service,
            })),
        }
    }
}

impl<T> Future for DispatchFuture<T> {
    type Output = PipelineResult<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let service = self.service;
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(PipelineError::Interrupted { service })))
    }
}

impl<T> fmt::Debug for DispatchFuture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchFuture")
            .field("service", &self.service)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn run_on<E: Executor>(executor: &E, value: u32) -> DispatchFuture<u32> {
        let (completion, future) = DispatchFuture::channel("test");
        executor.execute(Box::new(move || completion.complete(Ok(value))));
        future
    }

    #[test]
    fn test_worker_pool_runs_tasks() {
        let pool = WorkerPool::single().unwrap();
        assert_eq!(pool.workers(), 1);
        assert_eq!(run_on(&pool, 7).wait(), Ok(7));
    }

    #[test]
    fn test_worker_pool_runs_on_named_thread() {
        let pool = WorkerPool::new(2, "pool-test").unwrap();
        let (completion, future) = DispatchFuture::channel("test");
        pool.execute(Box::new(move || {
            let name = thread::current().name().map(str::to_owned);
            completion.complete(Ok(name));
        }));
        let name = future.wait().unwrap().unwrap();
        assert!(name.starts_with("pool-test-"));
    }

    #[test]
    fn test_zero_workers_is_raised_to_one() {
        let pool = WorkerPool::new(0, "pool-zero").unwrap();
        assert_eq!(pool.workers(), 1);
        assert_eq!(run_on(&pool, 1).wait(), Ok(1));
    }

    #[test]
    fn test_worker_survives_panicking_task() {
        let pool = WorkerPool::single().unwrap();
        let (completion, future) = DispatchFuture::<u32>::channel("panics");
        pool.execute(Box::new(move || {
            let _completion = completion;
            panic!("task failure");
        }));
        assert_eq!(
            future.wait(),
            Err(PipelineError::Interrupted { service: "panics" })
        );
        assert_eq!(run_on(&pool, 3).wait(), Ok(3));
    }

    #[test]
    fn test_inline_executor_runs_immediately() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&counter);
        InlineExecutor.execute(Box::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dropped_task_is_interrupted() {
        let (completion, mut future) = DispatchFuture::<u32>::channel("dropped");
        assert!(future.try_take().is_none());
        drop(completion);
        assert_eq!(
            future.try_take(),
            Some(Err(PipelineError::Interrupted { service: "dropped" }))
        );
    }

    #[test]
    fn test_future_wakes_on_completion() {
        let (completion, future) = DispatchFuture::channel("wake");
        let mut task = tokio_test::task::spawn(future);
        tokio_test::assert_pending!(task.poll());

        completion.complete(Ok(5u32));
        assert!(task.is_woken());
        assert_eq!(tokio_test::assert_ready!(task.poll()), Ok(5));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_tokio_executor_resolves_future() {
        let executor = TokioExecutor::current().unwrap();
        assert_eq!(run_on(&executor, 42).await, Ok(42));
    }
}
