//! Error taxonomy for the pipeline runtime.
//!
//! Only the taxonomy rows that can actually surface as a `Result` get a
//! variant here (configuration, topology, processing). Backpressure is
//! never an error — producers block. Shutdown races are programmer
//! errors and show up as `debug_assert!` failures, not `Result`s.

/// Errors surfaced by the pipeline runtime to its caller.
#[derive(Debug, thiserror::Error)]
pub enum SigflowError {
    /// Fatal at construction time: a bad parameter, a missing resource.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Fatal at `Pipeline::connect` time: out-of-range pin index, a
    /// type mismatch between an output and an input, or a connection
    /// that would close a cycle.
    #[error("graph topology error: {0}")]
    Topology(#[from] TopologyError),

    /// Non-fatal: a module failed to process one datum. The datum is
    /// dropped and the module keeps running.
    #[error("processing error in module {module}: {reason}")]
    Processing { module: String, reason: String },
}

/// The specific ways a graph mutation can be rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopologyError {
    #[error("output pin index {index} out of range (module has {len} output pins)")]
    OutputIndexOutOfRange { index: usize, len: usize },

    #[error("input pin index {index} out of range (module has {len} input pins)")]
    InputIndexOutOfRange { index: usize, len: usize },

    #[error("cannot connect a sink's output: module declares no output pins")]
    ConnectFromSink,

    #[error("cannot connect into a source's declared inputs: module declares no input pins")]
    ConnectIntoSource,
}

pub type Result<T = (), E = SigflowError> = std::result::Result<T, E>;
