//! A sink module that logs the size of every datum it receives,
//! grounded in `modules/src/out/print.cpp`.

use crate::data::Data;
use crate::module::Module;
use crate::pin::{InputPin, OutputPin, DEFAULT_QUEUE_BOUND};

pub struct PrintSink {
    input: InputPin,
}

impl PrintSink {
    pub fn new() -> Self {
        Self::with_queue_bound(DEFAULT_QUEUE_BOUND)
    }

    /// Same as `new`, but with an explicit input FIFO depth — pass
    /// `PipelineConfig::default_pin_queue_bound` to keep a module's
    /// queue sized to the pipeline it's being wired into (e.g. smaller
    /// under the low-latency flag).
    pub fn with_queue_bound(queue_bound: usize) -> Self {
        Self {
            input: InputPin::new(queue_bound),
        }
    }
}

impl Default for PrintSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Module for PrintSink {
    fn process(&mut self, data: Data) {
        tracing::info!(size = data.len(), "PrintSink: received data");
    }

    fn num_inputs(&self) -> usize {
        1
    }
    fn num_outputs(&self) -> usize {
        0
    }
    fn input(&self, idx: usize) -> &InputPin {
        assert_eq!(idx, 0);
        &self.input
    }
    fn output(&self, _idx: usize) -> &OutputPin {
        unreachable!("PrintSink has no outputs")
    }
}
