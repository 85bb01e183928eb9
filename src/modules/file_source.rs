//! A source module that reads a file in fixed-size chunks, grounded
//! in `modules/src/in/file.cpp`.

use std::fs::File;
use std::io::Read;

use crate::data::Data;
use crate::error::{Result, SigflowError};
use crate::module::Module;
use crate::pin::{InputPin, OutputPin, DEFAULT_QUEUE_BOUND};

/// Chunk size the original used (`64 * 1024`); large enough to
/// amortize syscalls, small enough that downstream modules that can't
/// reassemble a stream themselves still see reasonable latency.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

pub struct FileSource {
    file: File,
    chunk_size: usize,
    output: OutputPin,
}

impl FileSource {
    /// Opens `path` for reading. Fails fast — mirrors the original's
    /// `throw std::runtime_error("File not found")` — as a
    /// `Configuration` error rather than a panic.
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let file = File::open(path.as_ref())
            .map_err(|e| SigflowError::Configuration(format!("can't open {}: {e}", path.as_ref().display())))?;
        Ok(Self {
            file,
            chunk_size: DEFAULT_CHUNK_SIZE,
            output: OutputPin::new(DEFAULT_QUEUE_BOUND),
        })
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Overrides the output buffer pool's capacity (defaults to
    /// `DEFAULT_QUEUE_BOUND`) — pass `PipelineConfig::default_pin_queue_bound`
    /// to keep a low-latency pipeline's pools small.
    pub fn with_output_pool_capacity(mut self, capacity: usize) -> Self {
        self.output = OutputPin::new(capacity);
        self
    }
}

impl Module for FileSource {
    /// Ignores `_data` (the framework's fake trigger) and reads the
    /// whole file, emitting one chunk per read until EOF.
    fn process(&mut self, _data: Data) {
        loop {
            let mut buffer = self.output.get_buffer(self.chunk_size);
            let read = {
                let slice = buffer.as_mut_slice().expect("sole owner of a freshly acquired buffer");
                match self.file.read(slice) {
                    Ok(n) => n,
                    Err(e) => {
                        tracing::error!(error = %e, "FileSource: read failed");
                        break;
                    }
                }
            };
            if read == 0 {
                break;
            }
            if read < self.chunk_size {
                buffer.truncate(read);
            }
            self.output.emit(buffer);
        }
    }

    fn num_inputs(&self) -> usize {
        0
    }
    fn num_outputs(&self) -> usize {
        1
    }
    fn input(&self, _idx: usize) -> &InputPin {
        unreachable!("FileSource has no inputs")
    }
    fn output(&self, idx: usize) -> &OutputPin {
        assert_eq!(idx, 0);
        &self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_whole_file_in_chunks() {
        let path = std::env::temp_dir().join(format!("sigflow-file-source-test-{}", std::process::id()));
        std::fs::File::create(&path).unwrap().write_all(&vec![7u8; 10]).unwrap();

        let mut source = FileSource::open(&path).unwrap().with_chunk_size(4);
        let received = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let received2 = received.clone();
        source.output(0).connect(move |data| {
            received2.lock().unwrap().push(data.as_slice().to_vec());
        });

        source.process(Data::eos());
        std::fs::remove_file(&path).ok();

        let chunks = received.lock().unwrap();
        let total: usize = chunks.iter().map(|c| c.len()).sum();
        assert_eq!(total, 10);
        assert_eq!(chunks.last().unwrap().len(), 2);
    }

    #[test]
    fn missing_file_is_a_configuration_error() {
        let err = FileSource::open("/nonexistent/path/for/test").unwrap_err();
        assert!(matches!(err, SigflowError::Configuration(_)));
    }
}
