//! Caller policies: the five strategies controlling *where* a
//! connected callback runs. The policy is the only axis that decides
//! placement — callback code itself is unaware of which one is
//! active.

use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, TryRecvError};

use crate::threadpool::WorkerPool;

type Callback<A, R> = Arc<dyn Fn(A) -> R + Send + Sync>;

/// The eventual result of one callback invocation.
pub enum CallFuture<R> {
    /// Already computed — the `Sync` policy's case.
    Ready(R),
    /// Computed at most once, on demand — the `Lazy` policy's case.
    Lazy(Box<dyn FnOnce() -> R + Send>),
    /// Running on a freshly spawned thread — the `Async` policy's case.
    Thread(JoinHandle<R>),
    /// Running on a pooled worker, result delivered over a channel —
    /// the `DedicatedWorker`/`SharedPool` policies' case.
    Channel(Receiver<R>),
}

impl<R> CallFuture<R> {
    /// Blocks until the result is available.
    pub fn wait(self) -> R {
        match self {
            CallFuture::Ready(value) => value,
            CallFuture::Lazy(f) => f(),
            CallFuture::Thread(handle) => handle.join().expect("callback thread panicked"),
            CallFuture::Channel(rx) => rx.recv().expect("worker dropped result channel"),
        }
    }

    /// Non-blocking poll. Returns `Ok(value)` if the result was
    /// already available, or hands the future back in `Err` otherwise.
    /// A `Lazy` future is never "ready" on its own — it only runs once
    /// demanded via `wait`.
    pub fn try_wait(self) -> Result<R, Self> {
        match self {
            CallFuture::Ready(value) => Ok(value),
            CallFuture::Lazy(f) => Err(CallFuture::Lazy(f)),
            CallFuture::Thread(handle) => {
                if handle.is_finished() {
                    Ok(handle.join().expect("callback thread panicked"))
                } else {
                    Err(CallFuture::Thread(handle))
                }
            }
            CallFuture::Channel(rx) => match rx.try_recv() {
                Ok(value) => Ok(value),
                Err(TryRecvError::Empty) => Err(CallFuture::Channel(rx)),
                Err(TryRecvError::Disconnected) => {
                    panic!("worker dropped result channel without sending a value")
                }
            },
        }
    }
}

/// Strategy determining where and when a connected callback runs.
pub trait CallerPolicy<A, R>: Send + Sync
where
    A: Send + 'static,
    R: Send + 'static,
{
    fn call(&self, callback: Callback<A, R>, args: A) -> CallFuture<R>;
}

/// Runs the callback inline on the calling thread. Result is
/// immediately available; strict caller order is preserved because
/// nothing escapes the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct SyncPolicy;

impl<A, R> CallerPolicy<A, R> for SyncPolicy
where
    A: Send + 'static,
    R: Send + 'static,
{
    fn call(&self, callback: Callback<A, R>, args: A) -> CallFuture<R> {
        CallFuture::Ready(callback(args))
    }
}

/// Defers the callback until its result is demanded via `wait`.
/// Ordering is demand-driven, not call-driven.
#[derive(Debug, Default, Clone, Copy)]
pub struct LazyPolicy;

impl<A, R> CallerPolicy<A, R> for LazyPolicy
where
    A: Send + 'static,
    R: Send + 'static,
{
    fn call(&self, callback: Callback<A, R>, args: A) -> CallFuture<R> {
        CallFuture::Lazy(Box::new(move || callback(args)))
    }
}

/// Spawns a fresh OS thread per invocation. No ordering guarantees
/// between calls.
#[derive(Debug, Default, Clone, Copy)]
pub struct AsyncPolicy;

impl<A, R> CallerPolicy<A, R> for AsyncPolicy
where
    A: Send + 'static,
    R: Send + 'static,
{
    fn call(&self, callback: Callback<A, R>, args: A) -> CallFuture<R> {
        let handle = std::thread::Builder::new()
            .name("sigflow-async-call".into())
            .spawn(move || callback(args))
            .expect("failed to spawn thread for Async caller policy");
        CallFuture::Thread(handle)
    }
}

/// One worker thread dedicated to this policy instance. Invocations
/// are queued FIFO, giving strict per-signal ordering even though the
/// work happens off the calling thread.
pub struct DedicatedWorkerPolicy {
    pool: WorkerPool,
}

impl DedicatedWorkerPolicy {
    pub fn new() -> Self {
        Self {
            pool: WorkerPool::new(1),
        }
    }
}

impl Default for DedicatedWorkerPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl<A, R> CallerPolicy<A, R> for DedicatedWorkerPolicy
where
    A: Send + 'static,
    R: Send + 'static,
{
    fn call(&self, callback: Callback<A, R>, args: A) -> CallFuture<R> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        self.pool.submit(move || {
            let result = callback(args);
            let _ = tx.send(result);
        });
        CallFuture::Channel(rx)
    }
}

/// Invocations dispatched to a worker pool shared across multiple
/// signals. FIFO per worker stripe; no ordering guarantee across the
/// whole pool.
#[derive(Clone)]
pub struct SharedPoolPolicy {
    pool: Arc<WorkerPool>,
}

impl SharedPoolPolicy {
    pub fn new(pool: Arc<WorkerPool>) -> Self {
        Self { pool }
    }
}

impl<A, R> CallerPolicy<A, R> for SharedPoolPolicy
where
    A: Send + 'static,
    R: Send + 'static,
{
    fn call(&self, callback: Callback<A, R>, args: A) -> CallFuture<R> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        self.pool.submit(move || {
            let result = callback(args);
            let _ = tx.send(result);
        });
        CallFuture::Channel(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn cb() -> Callback<i32, i32> {
        Arc::new(|x| x * 2)
    }

    #[test]
    fn sync_is_immediately_ready() {
        let policy = SyncPolicy;
        let fut = policy.call(cb(), 21);
        assert_eq!(fut.wait(), 42);
    }

    #[test]
    fn lazy_does_not_run_until_waited() {
        let ran = Arc::new(AtomicUsize::new(0));
        let ran2 = ran.clone();
        let callback: Callback<i32, i32> = Arc::new(move |x| {
            ran2.fetch_add(1, Ordering::SeqCst);
            x
        });
        let fut = LazyPolicy.call(callback, 7);
        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert_eq!(fut.wait(), 7);
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn async_runs_off_thread() {
        let fut = AsyncPolicy.call(cb(), 10);
        assert_eq!(fut.wait(), 20);
    }

    #[test]
    fn dedicated_worker_is_fifo() {
        let policy = DedicatedWorkerPolicy::new();
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut futures = Vec::new();
        for i in 0..20 {
            let order = order.clone();
            let callback: Callback<i32, i32> = Arc::new(move |x| {
                order.lock().unwrap().push(x);
                x
            });
            futures.push(policy.call(callback, i));
        }
        for fut in futures {
            fut.wait();
        }
        assert_eq!(*order.lock().unwrap(), (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn shared_pool_completes_all_jobs() {
        let pool = Arc::new(WorkerPool::new(4));
        let policy = SharedPoolPolicy::new(pool);
        let futures: Vec<_> = (0..50).map(|i| policy.call(cb(), i)).collect();
        let results: Vec<_> = futures.into_iter().map(|f| f.wait()).collect();
        assert_eq!(results, (0..50).map(|i| i * 2).collect::<Vec<_>>());
    }
}
