//! `sigflow`: a signal/pin/module runtime for building media-style
//! processing pipelines out of independently schedulable modules.
//!
//! A [`Module`](module::Module) declares typed [`OutputPin`](pin::OutputPin)s
//! and [`InputPin`](pin::InputPin)s. A [`Pipeline`](pipeline::Pipeline) wires
//! modules together and gives each one its own worker thread, so a slow
//! module backpressures only the modules feeding it, never the whole
//! graph. Fan-out and cross-thread dispatch both go through
//! [`Signal`](signal::Signal), a typed many-to-many callback channel with a
//! pluggable caller policy (synchronous, deferred, or off-thread).
//!
//! Call [`logging::init`] once at process startup if you want
//! `tracing` events routed to stderr; the crate never installs a
//! subscriber on its own.

pub mod clock;
pub mod data;
pub mod error;
pub mod logging;
pub mod module;
pub mod modules;
pub mod pin;
pub mod pipeline;
pub mod signal;
pub mod threadpool;

pub use data::{BufferPool, Data, Metadata, StreamKind};
pub use error::{Result, SigflowError, TopologyError};
pub use module::{Module, Reorder};
pub use pin::{InputPin, OutputPin};
pub use pipeline::{ModuleHandle, Pipeline, PipelineConfig};
