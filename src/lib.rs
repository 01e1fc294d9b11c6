//! Sparse feature tracking across video frames.
//!
//! A [`Tracker`](tracker::Tracker) keeps a set of points alive across frames:
//! it seeds new points with a corner detector when few are left, carries
//! them forward with pyramidal Lucas-Kanade optical flow, and drops points
//! that were lost or did not move. Detection, flow, frame input and frame
//! output sit behind the traits in [`adapter`].

pub mod adapter;
pub mod codec;
pub mod config;
pub mod dataset;
pub mod detector;
pub mod error;
pub mod feature;
pub mod frame;
pub mod image;
pub mod math;
pub mod my_types;
pub mod optical_flow;
pub mod output;
pub mod pipeline;
pub mod policy;
pub mod pyramid;
pub mod tracker;
pub mod visualization;

#[cfg(feature = "opencv")]
pub mod video;

pub use adapter::{
    DetectionParams, DetectorAdapter, FlowAdapter, FlowResult, FrameSource, OutputSink,
};
pub use error::{ContractViolation, TrackError, TrackResult};
pub use feature::{Track, TrackSet};
pub use pipeline::{FrameProcessor, Pipeline, RunSummary};
pub use tracker::{CycleStats, Tracker};
