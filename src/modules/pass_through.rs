//! A one-input/one-output identity module: re-emits whatever it
//! receives unchanged. Used in tests and as a template for transform
//! modules that need the pin/signal plumbing without any real work.

use crate::data::Data;
use crate::module::Module;
use crate::pin::{InputPin, OutputPin, DEFAULT_QUEUE_BOUND};

pub struct PassThrough {
    input: InputPin,
    output: OutputPin,
}

impl PassThrough {
    pub fn new() -> Self {
        Self::with_queue_bound(DEFAULT_QUEUE_BOUND)
    }

    /// Same as `new`, but with an explicit input FIFO depth — pass
    /// `PipelineConfig::default_pin_queue_bound` to keep a module's
    /// queue sized to the pipeline it's being wired into.
    pub fn with_queue_bound(queue_bound: usize) -> Self {
        Self {
            input: InputPin::new(queue_bound),
            output: OutputPin::new(queue_bound),
        }
    }
}

impl Default for PassThrough {
    fn default() -> Self {
        Self::new()
    }
}

impl Module for PassThrough {
    fn process(&mut self, data: Data) {
        self.output.emit(data);
    }

    fn num_inputs(&self) -> usize {
        1
    }
    fn num_outputs(&self) -> usize {
        1
    }
    fn input(&self, idx: usize) -> &InputPin {
        assert_eq!(idx, 0);
        &self.input
    }
    fn output(&self, idx: usize) -> &OutputPin {
        assert_eq!(idx, 0);
        &self.output
    }
}
