//! The `Module` contract: a processing node owning pins, and the
//! `Reorder` decorator that fronts an asynchronous delegate while
//! preserving input order.

use std::sync::Arc;

use crate::data::Data;
use crate::pin::{InputPin, OutputPin};

/// Lifecycle state the framework tracks for every module. User code
/// never sets this directly — `PipelinedModule` drives the
/// transitions as it calls into the delegate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    Idle,
    Running,
    Flushed,
}

/// A unit of processing: owns its pins, implements `process`.
///
/// Implementors declare their pins during construction (typically by
/// storing `Vec<InputPin>`/`Vec<OutputPin>` and exposing them through
/// `input`/`output`/`num_inputs`/`num_outputs`).
pub trait Module: Send {
    /// Consumes one datum, emitting zero or more onward on this
    /// module's output pins. May block — the framework isolates that
    /// blocking on this module's own executor.
    fn process(&mut self, data: Data);

    /// Drains any buffered internal state upon end-of-stream. Called
    /// exactly once, before `destroy`.
    fn flush(&mut self) {}

    /// Breaks outbound callback references before destruction. Must
    /// be safe to call more than once.
    fn destroy(&mut self) {}

    fn num_inputs(&self) -> usize;
    fn num_outputs(&self) -> usize;
    fn input(&self, idx: usize) -> &InputPin;
    fn output(&self, idx: usize) -> &OutputPin;
}

/// A generic decorator that fronts any module with a two-stage
/// dispatch to preserve input ordering across an asynchronous
/// delegate.
///
/// One natural framing of this is two signal emissions (a
/// `Sync`/`Last` "synchroniser" signal capturing the datum in order,
/// followed by a `DedicatedWorker`/`Queue` "internal" signal
/// scheduling the actual delegate call) — but that mechanism loses
/// data if `process` is called again before the dedicated worker has
/// drained the previous datum from the synchroniser's single "last"
/// slot, since `Signal::emit` always clears the prior pending
/// futures. This implementation gets the order-preservation invariant
/// from a bounded handoff queue instead (reusing `InputPin`, already
/// the ordered-FIFO building block elsewhere in the crate) drained by
/// one dedicated worker thread, which cannot lose an in-flight datum
/// (see DESIGN.md).
pub struct Reorder {
    delegate: Box<dyn Module>,
    handoff: Arc<InputPin>,
    output: Arc<OutputPin>,
    worker: Option<std::thread::JoinHandle<Box<dyn Module>>>,
    stop_sentinel_sent: bool,
    destroyed: bool,
}

impl Reorder {
    /// Wraps `delegate`, fronting it with an order-preserving queue of
    /// depth `queue_bound`.
    pub fn new(mut delegate: Box<dyn Module>, queue_bound: usize) -> Self {
        assert_eq!(
            delegate.num_outputs(),
            1,
            "Reorder currently wraps single-output delegates only"
        );

        let output = Arc::new(OutputPin::new(delegate.output(0).pool().capacity()));
        let output_for_relay = output.clone();
        delegate.output(0).connect(move |data| {
            output_for_relay.emit(data);
        });

        Self {
            delegate,
            handoff: Arc::new(InputPin::new(queue_bound)),
            output,
            worker: None,
            stop_sentinel_sent: false,
            destroyed: false,
        }
    }

    fn ensure_worker_started(&mut self) {
        if self.worker.is_some() {
            return;
        }
        // Temporarily move the delegate onto the worker thread; we
        // never touch `self.delegate` again directly once the worker
        // is running (process() only ever pushes onto `handoff`).
        let delegate_placeholder: Box<dyn Module> = std::mem::replace(&mut self.delegate, Box::new(NullModule));
        let handoff = self.handoff.clone();
        self.worker = Some(
            std::thread::Builder::new()
                .name("sigflow-reorder".into())
                .spawn(move || {
                    let mut delegate = delegate_placeholder;
                    loop {
                        let datum = handoff.pop();
                        if datum.is_eos() {
                            delegate.flush();
                            return delegate;
                        }
                        delegate.process(datum);
                    }
                })
                .expect("failed to spawn Reorder worker thread"),
        );
    }
}

/// Placeholder swapped into `Reorder::delegate` while the real
/// delegate has been handed off to the worker thread; never invoked.
struct NullModule;
impl Module for NullModule {
    fn process(&mut self, _data: Data) {
        unreachable!("NullModule placeholder must never be called")
    }
    fn num_inputs(&self) -> usize {
        0
    }
    fn num_outputs(&self) -> usize {
        0
    }
    fn input(&self, _idx: usize) -> &InputPin {
        unreachable!()
    }
    fn output(&self, _idx: usize) -> &OutputPin {
        unreachable!()
    }
}

impl Module for Reorder {
    fn process(&mut self, data: Data) {
        if self.destroyed {
            tracing::warn!("Reorder::process called after destroy; dropping datum");
            return;
        }
        self.ensure_worker_started();
        self.handoff.push(data);
    }

    /// Drains the handoff queue and joins the worker, writing the real
    /// delegate back into `self.delegate` rather than dropping it — a
    /// `process` call immediately after `flush` (before `destroy`) must
    /// still reach the real delegate, not the `NullModule` placeholder.
    /// No-op once `destroy` has actually run.
    fn flush(&mut self) {
        if self.destroyed {
            return;
        }
        if self.worker.is_some() && !self.stop_sentinel_sent {
            self.handoff.push(Data::eos());
            self.stop_sentinel_sent = true;
        }
        if let Some(handle) = self.worker.take() {
            self.delegate = handle.join().expect("Reorder worker thread panicked");
            self.stop_sentinel_sent = false;
        }
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.flush();
        self.delegate.destroy();
        self.destroyed = true;
    }

    fn num_inputs(&self) -> usize {
        1
    }

    fn num_outputs(&self) -> usize {
        1
    }

    fn input(&self, _idx: usize) -> &InputPin {
        &self.handoff
    }

    fn output(&self, idx: usize) -> &OutputPin {
        assert_eq!(idx, 0);
        &self.output
    }
}
