//! `dashcastx`: a minimal demonstration of the consumer contract —
//! reads a file, pushes its chunks through a pipeline, and prints
//! what arrives at the other end.
//!
//! The option set (`-h/--help`, `-l/--live`, `-s/--seg-dur`,
//! `-r/--res WxH`, one positional URL) mirrors the option set a DASH
//! packager would take; this binary doesn't segment or mux anything
//! (that layer is out of scope), it only demonstrates the pipeline
//! wiring end to end against a file source and a print sink.

use clap::Parser;

use sigflow::modules::{FileSource, PrintSink};
use sigflow::{Pipeline, PipelineConfig};

#[derive(Parser, Debug)]
#[command(name = "dashcastx", about = "Demonstration pipeline: file in, sizes logged out")]
struct Cli {
    /// Run at system clock pace with low-latency settings, instead of
    /// as fast as possible.
    #[arg(short, long)]
    live: bool,

    /// Segment duration in milliseconds.
    #[arg(short, long = "seg-dur", default_value_t = 2000)]
    seg_dur: u64,

    /// Output resolution, e.g. "1280x720".
    #[arg(short, long)]
    res: Option<String>,

    /// Input file path (or URL, in a fuller implementation).
    url: String,
}

fn parse_resolution(spec: &str) -> Result<(u32, u32), String> {
    let (w, h) = spec
        .split_once('x')
        .ok_or_else(|| format!("resolution {spec:?} must look like WIDTHxHEIGHT"))?;
    let w: u32 = w.parse().map_err(|_| format!("invalid width in {spec:?}"))?;
    let h: u32 = h.parse().map_err(|_| format!("invalid height in {spec:?}"))?;
    Ok((w, h))
}

fn main() -> std::process::ExitCode {
    sigflow::logging::init();
    let cli = Cli::parse();

    if let Some(res) = &cli.res {
        if let Err(e) = parse_resolution(res) {
            eprintln!("dashcastx: {e}");
            return std::process::ExitCode::FAILURE;
        }
    }

    tracing::info!(
        url = %cli.url,
        live = cli.live,
        seg_dur_ms = cli.seg_dur,
        res = cli.res.as_deref().unwrap_or("<default>"),
        "dashcastx: starting"
    );

    let source = match FileSource::open(&cli.url) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("dashcastx: {e}");
            return std::process::ExitCode::FAILURE;
        }
    };

    let mut pipeline = Pipeline::new(PipelineConfig::low_latency(cli.live));
    let bound = pipeline.pin_queue_bound();
    let source = source.with_output_pool_capacity(bound);
    let source_handle = pipeline.add_module(Box::new(source));
    let sink_handle = pipeline.add_module(Box::new(PrintSink::with_queue_bound(bound)));
    if let Err(e) = pipeline.connect(source_handle, 0, sink_handle, 0) {
        eprintln!("dashcastx: {e}");
        return std::process::ExitCode::FAILURE;
    }

    pipeline.start();
    pipeline.wait_for_completion();

    std::process::ExitCode::SUCCESS
}
