//! Output pins: one per produced stream. An output pin owns a
//! `BufferPool` (so it can hand out reusable buffers) and a `Signal`
//! that fans data out to every connected input.

use std::sync::Arc;

use crate::data::{BufferPool, Data};
use crate::signal::{ConnectionId, NoResult, Signal, SyncPolicy};

/// The signal type every output pin uses to fan data out: callbacks
/// take one `Data` and return nothing meaningful, so results are
/// discarded (`NoResult`). The caller policy is fixed to `Sync` at the
/// pin level — an output pin always dispatches the *enqueue* of data
/// into a connected input's FIFO synchronously and cheaply; any
/// heavier downstream work happens later, inside that module's own
/// `PipelinedModule` executor (see `pipeline`).
pub type DataSignal = Signal<Data, (), SyncPolicy, NoResult<()>>;

/// An output pin: a buffer pool plus the signal that emits to every
/// connected input.
///
/// The signal itself is `Arc`-wrapped (not just the pool) so a pipeline
/// can cache a `signal_handle()` at registration time and keep wiring
/// new connections onto it later without ever needing to borrow back
/// through the owning module — in particular without contending with
/// whatever lock guards that module's in-flight `process` call.
pub struct OutputPin {
    pool: Arc<BufferPool>,
    signal: Arc<DataSignal>,
}

impl OutputPin {
    pub fn new(pool_capacity: usize) -> Self {
        Self {
            pool: Arc::new(BufferPool::new(pool_capacity)),
            signal: Arc::new(Signal::new(SyncPolicy)),
        }
    }

    /// Acquires a buffer of at least `size` bytes from this pin's
    /// pool, blocking if the pool is exhausted.
    pub fn get_buffer(&self, size: usize) -> Data {
        self.pool.acquire(size)
    }

    /// Emits `data` to every connected input pin.
    pub fn emit(&self, data: Data) -> usize {
        self.signal.emit(data)
    }

    /// Connects a slot (typically an input pin's enqueue closure) to
    /// this pin's signal.
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(Data) + Send + Sync + 'static,
    {
        self.signal.connect(move |data| slot(data))
    }

    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.signal.disconnect(id)
    }

    /// Exposes the underlying signal for direct wiring (e.g. by the
    /// `Reorder` wrapper, which connects its delegate's output signal
    /// straight to its own).
    pub fn signal(&self) -> &DataSignal {
        &self.signal
    }

    /// A cheap, reference-counted handle to this pin's signal,
    /// independent of the `OutputPin`'s own lifetime — lets a pipeline
    /// keep wiring new connections onto an already-running module's
    /// output without reaching back through that module at all.
    pub fn signal_handle(&self) -> Arc<DataSignal> {
        self.signal.clone()
    }

    pub fn num_connections(&self) -> usize {
        self.signal.connection_count()
    }

    pub fn pool(&self) -> &Arc<BufferPool> {
        &self.pool
    }
}
