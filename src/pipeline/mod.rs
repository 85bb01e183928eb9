//! The pipeline executor: wraps each `Module` with its own worker
//! thread, wires output pins to input pins, and tracks completion.
//!
//! Grounded directly on `PipelinedInput`/`PipelinedModule`/`Pipeline`
//! in the original C++ runtime: data is queued on the calling thread
//! (whichever thread emits onto the upstream output pin) and always
//! *dispatched* by the owning module's own executor thread, so one
//! slow module can never block another.

use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Select, Sender};

use crate::data::Data;
use crate::error::{Result, SigflowError, TopologyError};
use crate::module::Module;
use crate::pin::{DataSignal, DEFAULT_QUEUE_BOUND};
use crate::threadpool::WorkerPool;

/// Opaque handle to a module added to a `Pipeline`, returned by
/// `add_module` and consumed by `connect`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleHandle(usize);

/// Construction-time settings for a `Pipeline`, beyond the per-module
/// graph itself.
///
/// Mirrors the original's low-latency flag plus the two knobs demo
/// modules and pin constructors otherwise have to hardcode
/// (`DEFAULT_QUEUE_BOUND`, a pool sized off `available_parallelism`).
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// When set, every module's `process` call is dispatched on that
    /// module's own dedicated worker thread (the `DedicatedWorker`
    /// policy) instead of a pool shared across the whole pipeline —
    /// trading throughput for lower, more predictable per-datum
    /// latency. See `Pipeline::is_low_latency`.
    pub is_low_latency: bool,
    /// Default bound for a pin's FIFO when a module constructor
    /// doesn't override it.
    pub default_pin_queue_bound: usize,
    /// Worker count for the shared pool backing non-low-latency
    /// modules. `None` defers to `std::thread::available_parallelism`.
    pub default_pool_size: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            is_low_latency: false,
            default_pin_queue_bound: DEFAULT_QUEUE_BOUND,
            default_pool_size: None,
        }
    }
}

/// Smaller than `DEFAULT_QUEUE_BOUND`: low latency should mean modules
/// prefer a shallower per-pin FIFO alongside favoring `DedicatedWorker`
/// over `SharedPool` — a shallower queue bounds how much a module can
/// get ahead of a slow downstream before backpressure kicks in.
const LOW_LATENCY_QUEUE_BOUND: usize = 4;

impl PipelineConfig {
    /// Shorthand for the common case of toggling the low-latency flag
    /// (e.g. from a `--live` CLI switch) together with the smaller pin
    /// queue bound that implies.
    pub fn low_latency(is_low_latency: bool) -> Self {
        Self {
            is_low_latency,
            default_pin_queue_bound: if is_low_latency {
                LOW_LATENCY_QUEUE_BOUND
            } else {
                DEFAULT_QUEUE_BOUND
            },
            ..Self::default()
        }
    }
}

/// A module's pins, captured once at `add_module` time, before the
/// module is ever shared or started.
///
/// `connect` wires entirely through these cached handles and never
/// locks the module itself: an output's `Signal::connect` only needs
/// `&self` and is safe to call while that module's own `process` is
/// mid-flight (e.g. an actively looping source), but reaching an
/// `OutputPin` by calling `Module::output` through the module's
/// `Mutex` is not — that lock is held for the full duration of
/// `process`, which for a long-running source could be indefinite.
/// Caching these once up front is what makes "connect after start, to
/// a module that's already running" possible at all.
struct PinHandles {
    inputs: Vec<Sender<Data>>,
    outputs: Vec<Arc<DataSignal>>,
}

struct Completion {
    remaining: Mutex<usize>,
    condvar: Condvar,
}

impl Completion {
    fn new(remaining: usize) -> Self {
        Self {
            remaining: Mutex::new(remaining),
            condvar: Condvar::new(),
        }
    }

    fn notify_finished(&self) {
        let mut remaining = self.remaining.lock().unwrap();
        assert!(*remaining > 0, "more sinks finished than were registered");
        *remaining -= 1;
        self.condvar.notify_all();
    }

    fn wait(&self) {
        let mut remaining = self.remaining.lock().unwrap();
        while *remaining > 0 {
            remaining = self.condvar.wait(remaining).unwrap();
        }
    }
}

/// A graph of modules, wired by pin, executed by one reader thread per
/// module that dispatches `process` either inline (low latency, one
/// `DedicatedWorker` per module) or through a pool shared by the whole
/// pipeline (the default, `SharedPool`). Demo and application modules
/// may also branch on `Pipeline::is_low_latency` directly (e.g. a live
/// source choosing a smaller internal buffer) — the original runtime
/// threads this same flag through to its segmenting/muxing modules.
pub struct Pipeline {
    modules: Vec<Arc<Mutex<Box<dyn Module>>>>,
    pins: Vec<PinHandles>,
    config: PipelineConfig,
    completion: Arc<Completion>,
    workers: Vec<JoinHandle<()>>,
    started: bool,
    /// Built once in `start` and reused by any module added afterwards,
    /// so late-added modules share the same `SharedPool` rather than
    /// spinning up a second one.
    shared_pool: Option<Arc<WorkerPool>>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            modules: Vec::new(),
            pins: Vec::new(),
            config,
            completion: Arc::new(Completion::new(0)),
            workers: Vec::new(),
            started: false,
            shared_pool: None,
        }
    }

    pub fn is_low_latency(&self) -> bool {
        self.config.is_low_latency
    }

    /// This pipeline's configured default pin FIFO depth — modules
    /// that want to size their own pins off it (rather than the
    /// crate-wide `DEFAULT_QUEUE_BOUND`) should read it before being
    /// handed to `add_module`, e.g. `PrintSink::with_queue_bound(pipeline.pin_queue_bound())`.
    pub fn pin_queue_bound(&self) -> usize {
        self.config.default_pin_queue_bound
    }

    /// Registers a module, taking ownership of it. Returns a handle
    /// usable with `connect` for the pipeline's lifetime — including
    /// after `start`, per the topology's "late connect" guarantee: a
    /// module added (and wired) while the pipeline is already running
    /// gets its own worker thread immediately and, if it's a sink,
    /// is folded into the outstanding-completion count.
    pub fn add_module(&mut self, module: Box<dyn Module>) -> ModuleHandle {
        // Captured now, while `module` is still exclusively ours and
        // hasn't been handed to any worker thread — see `PinHandles`.
        let pins = PinHandles {
            inputs: (0..module.num_inputs()).map(|i| module.input(i).sender()).collect(),
            outputs: (0..module.num_outputs()).map(|i| module.output(i).signal_handle()).collect(),
        };
        let handle = ModuleHandle(self.modules.len());
        let is_sink = pins.outputs.is_empty();
        let shared = Arc::new(Mutex::new(module));
        self.modules.push(shared.clone());
        self.pins.push(pins);

        if self.started {
            if is_sink {
                *self.completion.remaining.lock().unwrap() += 1;
            }
            let completion = self.completion.clone();
            let shared_pool = self.shared_pool.clone();
            tracing::info!(handle = handle.0, "module added after pipeline start");
            self.workers
                .push(std::thread::spawn(move || run_module(shared, completion, shared_pool)));
        }
        handle
    }

    /// Wires `from`'s output pin `out_idx` to `to`'s input pin
    /// `in_idx`: every datum emitted on the output is pushed into the
    /// input's FIFO, applying that input's backpressure. Safe to call
    /// before or after `start` — `Signal::connect` accepts new
    /// listeners concurrently with an in-flight `emit`, so a connection
    /// made while `from` is mid-stream simply takes effect starting
    /// with its next emission.
    pub fn connect(&mut self, from: ModuleHandle, out_idx: usize, to: ModuleHandle, in_idx: usize) -> Result<()> {
        let from_outputs = self.pins[from.0].outputs.len();
        if from_outputs == 0 {
            return Err(SigflowError::Topology(TopologyError::ConnectFromSink));
        }
        if out_idx >= from_outputs {
            return Err(SigflowError::Topology(TopologyError::OutputIndexOutOfRange {
                index: out_idx,
                len: from_outputs,
            }));
        }

        let to_inputs = self.pins[to.0].inputs.len();
        if to_inputs == 0 {
            return Err(SigflowError::Topology(TopologyError::ConnectIntoSource));
        }
        if in_idx >= to_inputs {
            return Err(SigflowError::Topology(TopologyError::InputIndexOutOfRange {
                index: in_idx,
                len: to_inputs,
            }));
        }

        let sender = self.pins[to.0].inputs[in_idx].clone();
        self.pins[from.0].outputs[out_idx].connect(move |data| {
            sender.send(data).ok();
        });
        Ok(())
    }

    /// Starts every registered module's worker thread. Source modules
    /// (zero declared inputs) are triggered immediately; all others
    /// sit blocked on their input pins until data or end-of-stream
    /// arrives.
    pub fn start(&mut self) {
        assert!(!self.started, "pipeline already started");
        self.started = true;

        let sinks = self.pins.iter().filter(|p| p.outputs.is_empty()).count();
        *self.completion.remaining.lock().unwrap() = sinks;
        tracing::info!(sinks, modules = self.modules.len(), "pipeline starting");

        // Low latency: every module dispatches `process` on its own
        // OS thread (the `DedicatedWorker` policy, one instance per
        // module) — `shared_pool` stays `None` and `run_module` calls
        // straight into the delegate. Otherwise every module's
        // `process` calls are submitted to one pool shared across the
        // whole pipeline (the `SharedPool` policy), matching §4.6's
        // stated default; the per-module thread still owns the
        // blocking read off that module's input pins, it just hands
        // the actual `process` invocation to the pool and waits for it
        // before popping the next datum, so call order into the
        // delegate is unaffected.
        self.shared_pool = if self.config.is_low_latency {
            None
        } else {
            let size = self
                .config
                .default_pool_size
                .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1));
            Some(Arc::new(WorkerPool::new(size)))
        };

        for module in self.modules.iter().cloned() {
            let completion = self.completion.clone();
            let shared_pool = self.shared_pool.clone();
            self.workers
                .push(std::thread::spawn(move || run_module(module, completion, shared_pool)));
        }
        tracing::info!("pipeline started");
    }

    /// Blocks until every sink module has seen end-of-stream.
    pub fn wait_for_completion(&self) {
        tracing::info!("pipeline waiting for completion");
        self.completion.wait();
        tracing::info!("pipeline completed");
    }

    /// Tears the pipeline down immediately: every worker thread is
    /// joined once its module reaches end-of-stream, without waiting
    /// for upstream data to drain naturally. Sources still run their
    /// one `process` call to completion — there is no way to interrupt
    /// a module mid-`process`, only to stop feeding it further work.
    pub fn exit_sync(mut self) {
        tracing::warn!("pipeline asked to exit now");
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

/// Dispatches one `process` call for `module`, either inline (the
/// `DedicatedWorker` case — `pool` is `None`, so this very thread *is*
/// the dedicated worker) or by submitting the call to the shared pool
/// and blocking until it finishes (the `SharedPool` case). Either way
/// the caller only proceeds once `process(data)` has returned — the
/// pool never runs two calls for the same module concurrently, since
/// this module's own reader thread is the only one ever dispatching
/// into it.
fn dispatch(module: &Arc<Mutex<Box<dyn Module>>>, data: Data, pool: &Option<Arc<WorkerPool>>) {
    match pool {
        None => {
            module.lock().unwrap().process(data);
        }
        Some(pool) => {
            let module = module.clone();
            let (tx, rx) = crossbeam_channel::bounded::<()>(1);
            pool.submit(move || {
                module.lock().unwrap().process(data);
                let _ = tx.send(());
            });
            rx.recv().expect("shared pool dropped the job without finishing it");
        }
    }
}

/// Runs one module to completion: dispatches `process` calls as its
/// inputs arrive (or once, immediately, for a source), then flushes
/// and destroys it. Takes the module by `Arc<Mutex<_>>`, not by value,
/// so `Pipeline::connect`/`add_module` can still reach its pins after
/// this thread has taken ownership of driving it — reads only ever
/// lock the module for the duration of a single call.
fn run_module(module: Arc<Mutex<Box<dyn Module>>>, completion: Arc<Completion>, shared_pool: Option<Arc<WorkerPool>>) {
    let (num_inputs, num_outputs) = {
        let guard = module.lock().unwrap();
        (guard.num_inputs(), guard.num_outputs())
    };
    let is_sink = num_outputs == 0;

    if num_inputs == 0 {
        // Source: a single process() call does all the work (reading
        // a file, generating frames, ...), emitting as it goes.
        dispatch(&module, Data::eos(), &shared_pool);
    } else {
        // Receivers are cloned once up front: `Select` needs live
        // references for the duration of the blocking wait, and we
        // can't hold the module's lock across that wait (connect()
        // from another thread would deadlock against it).
        let receivers: Vec<Receiver<Data>> = {
            let guard = module.lock().unwrap();
            (0..num_inputs).map(|i| guard.input(i).receiver_clone()).collect()
        };
        let mut eos_seen = vec![false; num_inputs];
        loop {
            let remaining: Vec<usize> = (0..num_inputs).filter(|&i| !eos_seen[i]).collect();
            if remaining.is_empty() {
                break;
            }

            let mut select = Select::new();
            for &i in &remaining {
                select.recv(&receivers[i]);
            }
            let oper = select.select();
            let idx = remaining[oper.index()];
            let data = oper
                .recv(&receivers[idx])
                .expect("input pin's own sender dropped unexpectedly");

            if data.is_eos() {
                eos_seen[idx] = true;
                continue;
            }
            dispatch(&module, data, &shared_pool);
        }
    }

    let mut guard = module.lock().unwrap();
    guard.flush();
    if is_sink {
        guard.destroy();
        completion.notify_finished();
    } else {
        for i in 0..num_outputs {
            guard.output(i).emit(Data::eos());
        }
        guard.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Metadata;
    use crate::pin::{InputPin, OutputPin};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    struct CountingSource {
        output: OutputPin,
        count: usize,
    }

    impl Module for CountingSource {
        fn process(&mut self, _data: Data) {
            for i in 0..self.count {
                let data = Data::from_bytes(bytes::BytesMut::from(&[i as u8][..]), Metadata::default());
                self.output.emit(data);
            }
        }
        fn num_inputs(&self) -> usize {
            0
        }
        fn num_outputs(&self) -> usize {
            1
        }
        fn input(&self, _idx: usize) -> &InputPin {
            unreachable!("source has no inputs")
        }
        fn output(&self, _idx: usize) -> &OutputPin {
            &self.output
        }
    }

    struct CollectingSink {
        input: InputPin,
        seen: Arc<StdMutex<Vec<u8>>>,
    }

    impl Module for CollectingSink {
        fn process(&mut self, data: Data) {
            self.seen.lock().unwrap().push(data.as_slice()[0]);
        }
        fn num_inputs(&self) -> usize {
            1
        }
        fn num_outputs(&self) -> usize {
            0
        }
        fn input(&self, _idx: usize) -> &InputPin {
            &self.input
        }
        fn output(&self, _idx: usize) -> &OutputPin {
            unreachable!("sink has no outputs")
        }
    }

    #[test]
    fn source_to_sink_delivers_every_datum_in_order() {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let mut pipeline = Pipeline::new(PipelineConfig::default());

        let source = pipeline.add_module(Box::new(CountingSource {
            output: OutputPin::new(4),
            count: 10,
        }));
        let sink = pipeline.add_module(Box::new(CollectingSink {
            input: InputPin::new(16),
            seen: seen.clone(),
        }));
        pipeline.connect(source, 0, sink, 0).unwrap();

        pipeline.start();
        pipeline.wait_for_completion();

        assert_eq!(*seen.lock().unwrap(), (0..10).collect::<Vec<u8>>());
    }

    #[test]
    fn low_latency_pipeline_still_delivers_every_datum_in_order() {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let mut pipeline = Pipeline::new(PipelineConfig::low_latency(true));
        assert!(pipeline.is_low_latency());

        let source = pipeline.add_module(Box::new(CountingSource {
            output: OutputPin::new(4),
            count: 10,
        }));
        let sink = pipeline.add_module(Box::new(CollectingSink {
            input: InputPin::new(16),
            seen: seen.clone(),
        }));
        pipeline.connect(source, 0, sink, 0).unwrap();

        pipeline.start();
        pipeline.wait_for_completion();

        assert_eq!(*seen.lock().unwrap(), (0..10).collect::<Vec<u8>>());
    }

    #[test]
    fn low_latency_config_shrinks_default_pin_queue_bound() {
        let normal = PipelineConfig::default();
        let low_latency = PipelineConfig::low_latency(true);
        assert_eq!(normal.default_pin_queue_bound, DEFAULT_QUEUE_BOUND);
        assert!(low_latency.default_pin_queue_bound < normal.default_pin_queue_bound);

        let pipeline = Pipeline::new(PipelineConfig::low_latency(true));
        assert_eq!(pipeline.pin_queue_bound(), low_latency.default_pin_queue_bound);
    }

    #[test]
    fn empty_pipeline_completes_immediately() {
        let mut pipeline = Pipeline::new(PipelineConfig::default());
        pipeline.start();
        pipeline.wait_for_completion();
    }

    #[test]
    fn connecting_into_a_source_is_rejected() {
        let mut pipeline = Pipeline::new(PipelineConfig::default());
        let source = pipeline.add_module(Box::new(CountingSource {
            output: OutputPin::new(4),
            count: 1,
        }));
        let another_source = pipeline.add_module(Box::new(CountingSource {
            output: OutputPin::new(4),
            count: 1,
        }));
        let err = pipeline.connect(source, 0, another_source, 0).unwrap_err();
        assert!(matches!(
            err,
            SigflowError::Topology(TopologyError::ConnectIntoSource)
        ));
    }

    #[test]
    fn connecting_from_a_sink_is_rejected() {
        let mut pipeline = Pipeline::new(PipelineConfig::default());
        let sink = pipeline.add_module(Box::new(CollectingSink {
            input: InputPin::new(4),
            seen: Arc::new(StdMutex::new(Vec::new())),
        }));
        let another_sink = pipeline.add_module(Box::new(CollectingSink {
            input: InputPin::new(4),
            seen: Arc::new(StdMutex::new(Vec::new())),
        }));
        let err = pipeline.connect(sink, 0, another_sink, 0).unwrap_err();
        assert!(matches!(err, SigflowError::Topology(TopologyError::ConnectFromSink)));
    }

    #[test]
    fn out_of_range_output_index_is_rejected() {
        let mut pipeline = Pipeline::new(PipelineConfig::default());
        let source = pipeline.add_module(Box::new(CountingSource {
            output: OutputPin::new(4),
            count: 1,
        }));
        let sink = pipeline.add_module(Box::new(CollectingSink {
            input: InputPin::new(4),
            seen: Arc::new(StdMutex::new(Vec::new())),
        }));
        let err = pipeline.connect(source, 5, sink, 0).unwrap_err();
        assert!(matches!(
            err,
            SigflowError::Topology(TopologyError::OutputIndexOutOfRange { index: 5, len: 1 })
        ));
    }

    #[test]
    fn backpressure_blocks_a_fast_source_behind_a_slow_sink() {
        struct SlowSink {
            input: InputPin,
            processed: Arc<AtomicUsize>,
        }
        impl Module for SlowSink {
            fn process(&mut self, _data: Data) {
                std::thread::sleep(Duration::from_millis(5));
                self.processed.fetch_add(1, Ordering::SeqCst);
            }
            fn num_inputs(&self) -> usize {
                1
            }
            fn num_outputs(&self) -> usize {
                0
            }
            fn input(&self, _idx: usize) -> &InputPin {
                &self.input
            }
            fn output(&self, _idx: usize) -> &OutputPin {
                unreachable!()
            }
        }

        let processed = Arc::new(AtomicUsize::new(0));
        let mut pipeline = Pipeline::new(PipelineConfig::default());
        let source = pipeline.add_module(Box::new(CountingSource {
            output: OutputPin::new(4),
            count: 20,
        }));
        let sink = pipeline.add_module(Box::new(SlowSink {
            input: InputPin::new(2),
            processed: processed.clone(),
        }));
        pipeline.connect(source, 0, sink, 0).unwrap();

        pipeline.start();
        pipeline.wait_for_completion();

        assert_eq!(processed.load(Ordering::SeqCst), 20);
    }
}
