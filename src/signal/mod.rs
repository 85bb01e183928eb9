//! Typed emission channel: stores connected callbacks, dispatches each
//! one through its caller policy, and aggregates the per-callback
//! results through its result policy.
//!
//! ```text
//!                 ┌──────────────┐
//!  emit(args) ───▶│  callback map │──▶ caller policy ──▶ CallFuture
//!                 └──────────────┘         (×N connected)     │
//!                                                              ▼
//!                                                  results(wait, clear)
//!                                                  drains futures through
//!                                                  the result policy
//! ```

pub mod executor;
pub mod result;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

pub use executor::{AsyncPolicy, CallFuture, CallerPolicy, DedicatedWorkerPolicy, LazyPolicy, SharedPoolPolicy, SyncPolicy};
pub use result::{Last, NoResult, Queue, ResultPolicy};

/// A unique, never-reused handle returned by `Signal::connect`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

type Callback<A, R> = Arc<dyn Fn(A) -> R + Send + Sync>;

/// A typed many-to-many callback channel with a pluggable caller
/// policy `C` and result-aggregation policy `P`.
pub struct Signal<A, R, C, P = NoResult<R>>
where
    C: CallerPolicy<A, R>,
    P: ResultPolicy<R>,
    A: Send + 'static,
    R: Send + 'static,
{
    callbacks: Mutex<HashMap<u64, Callback<A, R>>>,
    next_id: AtomicU64,
    futures: Mutex<Vec<CallFuture<R>>>,
    result: Mutex<P>,
    caller: C,
    // The id of the thread currently inside `emit`, if any. Used only
    // to detect the disallowed case of a Sync-policy callback calling
    // back into `emit` on the same signal from the same thread.
    emitting_thread: Mutex<Option<std::thread::ThreadId>>,
}

impl<A, R, C, P> Signal<A, R, C, P>
where
    C: CallerPolicy<A, R>,
    P: ResultPolicy<R>,
    A: Send + 'static,
    R: Send + 'static,
{
    pub fn new(caller: C) -> Self {
        Self {
            callbacks: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            futures: Mutex::new(Vec::new()),
            result: Mutex::new(P::default()),
            caller,
            emitting_thread: Mutex::new(None),
        }
    }

    /// Registers a callback, returning a unique, never-reused id.
    /// Safe to call while an `emit` is in progress — the new
    /// connection takes effect starting with the next `emit`.
    pub fn connect<F>(&self, callback: F) -> ConnectionId
    where
        F: Fn(A) -> R + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.callbacks.lock().unwrap().insert(id, Arc::new(callback));
        ConnectionId(id)
    }

    /// Removes a connected callback. Idempotent: returns `false` if
    /// already disconnected (or never connected).
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.callbacks.lock().unwrap().remove(&id.0).is_some()
    }

    /// Number of callbacks currently connected.
    pub fn connection_count(&self) -> usize {
        self.callbacks.lock().unwrap().len()
    }

    /// Invokes every connected callback through the caller policy,
    /// clearing any prior pending futures first, and returns the
    /// number of callbacks invoked.
    ///
    /// # Panics
    ///
    /// Panics if called reentrantly on the same signal from the same
    /// thread (e.g. a `Sync`-policy callback calling `emit` again on
    /// its own signal) — this is the one reentrancy case worth
    /// detecting and failing loudly on rather than deadlocking.
    pub fn emit(&self, args: A) -> usize
    where
        A: Clone,
    {
        {
            let mut current = self.emitting_thread.lock().unwrap();
            let me = std::thread::current().id();
            assert!(
                *current != Some(me),
                "Signal::emit called reentrantly on the same signal from the same thread"
            );
            *current = Some(me);
        }

        let callbacks: Vec<_> = self.callbacks.lock().unwrap().values().cloned().collect();
        let mut futures = self.futures.lock().unwrap();
        futures.clear();
        for callback in &callbacks {
            futures.push(self.caller.call(callback.clone(), args.clone()));
        }
        drop(futures);

        *self.emitting_thread.lock().unwrap() = None;
        callbacks.len()
    }

    /// Drains the futures collected by the last `emit`, folding each
    /// result through the result policy.
    ///
    /// `wait = true` blocks until every future resolves; `wait =
    /// false` only collects futures that are already ready, leaving
    /// the rest pending for a later call. `clear = true` resets the
    /// aggregate after reading it; `clear = false` leaves it in place
    /// so a later call observes the same aggregate plus anything new.
    pub fn results(&self, wait: bool, clear: bool) -> P::Output {
        let mut futures = self.futures.lock().unwrap();
        let mut policy = self.result.lock().unwrap();

        if wait {
            for future in futures.drain(..) {
                policy.push(future.wait());
            }
        } else {
            let pending = std::mem::take(&mut *futures);
            for future in pending {
                match future.try_wait() {
                    Ok(value) => policy.push(value),
                    Err(future) => futures.push(future),
                }
            }
        }

        let output = policy.snapshot();
        if clear {
            policy.clear();
        }
        output
    }

    /// Discards any pending futures whose result is already available
    /// without blocking; futures still in flight are left untouched.
    pub fn flush_available_results(&self) {
        let mut futures = self.futures.lock().unwrap();
        let pending = std::mem::take(&mut *futures);
        for future in pending {
            if let Err(future) = future.try_wait() {
                futures.push(future);
            }
        }
    }
}
