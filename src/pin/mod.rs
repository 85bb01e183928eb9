//! Typed edges between modules: output pins produce, input pins
//! consume.

pub mod input;
pub mod output;

pub use input::{InputPin, DEFAULT_QUEUE_BOUND};
pub use output::{DataSignal, OutputPin};
