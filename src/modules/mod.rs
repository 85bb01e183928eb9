//! Illustrative, non-codec processing nodes that exercise the
//! framework end-to-end: a source, a sink, and an identity transform.
//! Not a media-codec layer (see Non-goals) — a starting template for
//! one.

mod file_source;
mod pass_through;
mod print_sink;

pub use file_source::{FileSource, DEFAULT_CHUNK_SIZE};
pub use pass_through::PassThrough;
pub use print_sink::PrintSink;
