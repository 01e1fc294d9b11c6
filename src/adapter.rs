//! Seams between the tracking engine and the outside world.
//!
//! The engine owns the track lifecycle. Feature detection, optical flow,
//! frame decoding and frame output are reached only through these traits.

use anyhow::Result;

use crate::feature::Track;
use crate::image::{ColorFrame, Image};
use crate::my_types::*;

/// Parameters for a detector call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectionParams {
    /// Upper bound on the number of returned points. 0 means unbounded.
    pub max_count: usize,
    /// Fraction in (0, 1) of the strongest response a candidate must reach.
    pub quality_level: f64,
    /// Minimum euclidean distance between two returned points.
    pub min_distance: f64,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            max_count: 500,
            quality_level: 0.01,
            min_distance: 10.,
        }
    }
}

/// Finds corner-like candidate points in a grayscale frame, strongest first.
pub trait DetectorAdapter {
    fn detect(&mut self, gray: &Image, params: &DetectionParams) -> Result<Vec<Point2d>>;
}

/// Output of a flow call. All three vectors are index-aligned with the input points.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FlowResult {
    pub positions: Vec<Point2d>,
    pub status: Vec<bool>,
    pub errors: Vec<f64>,
}

impl FlowResult {
    pub fn with_capacity(n: usize) -> Self {
        Self {
            positions: Vec::with_capacity(n),
            status: Vec::with_capacity(n),
            errors: Vec::with_capacity(n),
        }
    }

    pub fn push(&mut self, position: Point2d, ok: bool, error: f64) {
        self.positions.push(position);
        self.status.push(ok);
        self.errors.push(error);
    }
}

/// Moves a set of points from `previous` to `current`. Both frames have the
/// same dimensions. An empty point set must yield an empty result.
pub trait FlowAdapter {
    fn advance(
        &mut self,
        previous: &Image,
        current: &Image,
        points: &[Point2d],
    ) -> Result<FlowResult>;
}

/// Supplies color frames in playback order. `Ok(None)` signals end of stream.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<ColorFrame>>;

    /// Number of frames left, when known up front
    fn len_hint(&self) -> Option<u64> {
        None
    }

    /// Playback rate of the stream, when the source has one
    fn fps(&self) -> Option<f64> {
        None
    }
}

/// One processed frame, as handed to an output sink.
pub struct AnnotatedFrame<'a> {
    /// 1-based index of the frame in the stream
    pub index: usize,
    pub image: &'a ColorFrame,
    pub tracks: &'a [Track],
}

/// Receives annotated frames for display or persistence.
pub trait OutputSink {
    fn write(&mut self, frame: &AnnotatedFrame) -> Result<()>;

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<T: DetectorAdapter + ?Sized> DetectorAdapter for Box<T> {
    fn detect(&mut self, gray: &Image, params: &DetectionParams) -> Result<Vec<Point2d>> {
        (**self).detect(gray, params)
    }
}

impl<T: FlowAdapter + ?Sized> FlowAdapter for Box<T> {
    fn advance(
        &mut self,
        previous: &Image,
        current: &Image,
        points: &[Point2d],
    ) -> Result<FlowResult> {
        (**self).advance(previous, current, points)
    }
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn next_frame(&mut self) -> Result<Option<ColorFrame>> {
        (**self).next_frame()
    }

    fn len_hint(&self) -> Option<u64> {
        (**self).len_hint()
    }

    fn fps(&self) -> Option<f64> {
        (**self).fps()
    }
}

impl<T: OutputSink + ?Sized> OutputSink for Box<T> {
    fn write(&mut self, frame: &AnnotatedFrame) -> Result<()> {
        (**self).write(frame)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}

/// Fans a frame out to several sinks. The first failure is returned after
/// every sink has seen the frame.
impl OutputSink for Vec<Box<dyn OutputSink>> {
    fn write(&mut self, frame: &AnnotatedFrame) -> Result<()> {
        let mut result = Ok(());
        for sink in self.iter_mut() {
            if let Err(err) = sink.write(frame) {
                if result.is_ok() {
                    result = Err(err);
                }
            }
        }
        result
    }

    fn finish(&mut self) -> Result<()> {
        for sink in self.iter_mut() {
            sink.finish()?;
        }
        Ok(())
    }
}
