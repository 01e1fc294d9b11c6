use std::path::PathBuf;

use anyhow::{Context as AnyhowContext, Result};
use clap::Parser;

use indicatif::ProgressStyle;
use tracing::{info, info_span};
use tracing_indicatif::span_ext::IndicatifSpanExt;
use tracing_indicatif::IndicatifLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::filter::LevelFilter;

use lk_track_rust::adapter::{FrameSource, OutputSink};
use lk_track_rust::config::*;
use lk_track_rust::dataset::SyntheticVideo;
use lk_track_rust::detector::ShiTomasi;
use lk_track_rust::optical_flow::LucasKanade;
use lk_track_rust::output::{output_fps, JsonlSink, NullSink, RerunSink};
use lk_track_rust::pipeline::Pipeline;
use lk_track_rust::tracker::Tracker;

#[derive(Parser)]
pub struct Args {
    /// Input video. Without it a synthetic video is tracked.
    #[clap(short, long)]
    pub input: Option<String>,
    /// Annotated output video
    #[clap(short, long)]
    pub output: Option<String>,
    /// Write the tracks of every frame as JSON lines
    #[clap(long)]
    pub jsonl: Option<PathBuf>,
    /// Save a rerun recording of the annotated frames
    #[clap(long)]
    pub rerun: Option<PathBuf>,
    /// Read the tracking parameters from a JSON file instead of the flags
    #[clap(long)]
    pub config_file: Option<PathBuf>,
    #[clap(long)]
    pub debug: bool,
    #[clap(flatten)]
    pub config: Config,
}

#[cfg(feature = "opencv")]
fn open_input(path: &str) -> Result<Box<dyn FrameSource>> {
    Ok(Box::new(lk_track_rust::video::VideoInput::open(path)?))
}

#[cfg(not(feature = "opencv"))]
fn open_input(_path: &str) -> Result<Box<dyn FrameSource>> {
    anyhow::bail!("reading video files requires the `opencv` feature")
}

#[cfg(feature = "opencv")]
fn open_output(path: &str, fps: f64) -> Result<Box<dyn OutputSink>> {
    Ok(Box::new(lk_track_rust::video::VideoOutput::new(path, *b"mp4v", fps)))
}

#[cfg(not(feature = "opencv"))]
fn open_output(_path: &str, _fps: f64) -> Result<Box<dyn OutputSink>> {
    anyhow::bail!("writing video files requires the `opencv` feature")
}

fn open_sinks(args: &Args, fps: f64) -> Result<Vec<Box<dyn OutputSink>>> {
    let mut sinks: Vec<Box<dyn OutputSink>> = vec![];
    if let Some(path) = &args.output {
        sinks.push(open_output(path, fps)?);
    }
    if let Some(path) = &args.jsonl {
        sinks.push(Box::new(JsonlSink::create(path)?));
    }
    if let Some(path) = &args.rerun {
        sinks.push(Box::new(RerunSink::save(path)?));
    }
    if sinks.is_empty() {
        sinks.push(Box::new(NullSink));
    }
    Ok(sinks)
}

fn main() -> Result<()> {
    // parse the config
    let args = Args::parse();
    let config = match &args.config_file {
        Some(path) => Config::from_json_file(path)?,
        None => {
            args.config.validate()?;
            args.config.clone()
        }
    };
    let _ = CONFIG.set(config);
    let config = CONFIG.get().context("config not initialized")?;

    // setup logging
    let level = if args.debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let indicatif_layer = IndicatifLayer::new();
    tracing_subscriber::registry()
        .with(level)
        .with(tracing_subscriber::fmt::layer().with_writer(indicatif_layer.get_stdout_writer()))
        .with(indicatif_layer)
        .init();
    info!(config = %serde_json::to_string(config)?, "tracking parameters");

    let source: Box<dyn FrameSource> = match &args.input {
        Some(path) => open_input(path)?,
        None => Box::new(SyntheticVideo::from_config(config)),
    };
    let sinks = open_sinks(&args, output_fps(&source))?;
    let tracker = Tracker::from_config(ShiTomasi::new(), LucasKanade::from_config(config), config);
    let mut pipeline = Pipeline::new(source, tracker, sinks);

    let header_span = info_span!("header");
    header_span.pb_set_style(&ProgressStyle::default_bar());
    if let Some(length) = pipeline.len_hint() {
        header_span.pb_set_length(length);
    }
    let header_span_enter = header_span.enter();

    let summary = pipeline.run()?;

    std::mem::drop(header_span_enter);
    std::mem::drop(header_span);

    info!(
        frames = summary.frames,
        dropped = summary.dropped_frames,
        tracks = summary.final_tracks,
        "done"
    );
    Ok(())
}
