//! End-to-end pipeline throughput: a source streaming N small buffers
//! into a sink through a two-stage graph (source -> pass-through ->
//! sink), measured under both the default shared-pool executor and
//! the low-latency dedicated-worker-per-module executor.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use sigflow::modules::PassThrough;
use sigflow::{Data, InputPin, Metadata, Module, OutputPin, Pipeline, PipelineConfig};

struct Source {
    output: OutputPin,
    count: usize,
}

impl Module for Source {
    fn process(&mut self, _data: Data) {
        for _ in 0..self.count {
            self.output.emit(Data::from_bytes(bytes::BytesMut::zeroed(64), Metadata::default()));
        }
    }
    fn num_inputs(&self) -> usize {
        0
    }
    fn num_outputs(&self) -> usize {
        1
    }
    fn input(&self, _idx: usize) -> &InputPin {
        unreachable!()
    }
    fn output(&self, _idx: usize) -> &OutputPin {
        &self.output
    }
}

struct Sink {
    input: InputPin,
}

impl Module for Sink {
    fn process(&mut self, _data: Data) {}
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

fn run_pipeline(count: usize, low_latency: bool) {
    let mut pipeline = Pipeline::new(PipelineConfig::low_latency(low_latency));
    let source = pipeline.add_module(Box::new(Source {
        output: OutputPin::new(8),
        count,
    }));
    let xform = pipeline.add_module(Box::new(PassThrough::new()));
    let sink = pipeline.add_module(Box::new(Sink {
        input: InputPin::new(8),
    }));
    pipeline.connect(source, 0, xform, 0).unwrap();
    pipeline.connect(xform, 0, sink, 0).unwrap();
    pipeline.start();
    pipeline.wait_for_completion();
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline_source_to_sink");
    for count in [100usize, 1_000] {
        group.bench_with_input(BenchmarkId::new("shared_pool", count), &count, |b, &count| {
            b.iter(|| run_pipeline(count, false));
        });
        group.bench_with_input(BenchmarkId::new("low_latency", count), &count, |b, &count| {
            b.iter(|| run_pipeline(count, true));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
