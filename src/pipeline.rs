use tracing::{info, warn, Span};
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::adapter::{AnnotatedFrame, FrameSource, OutputSink};
use crate::error::{TrackError, TrackResult};
use crate::feature::Track;
use crate::image::ColorFrame;

/// A per-frame processing capability. `Tracker` is the one implementation.
pub trait FrameProcessor {
    type Stats;

    /// Process one color frame and write the annotated result into `output`.
    fn process_frame(
        &mut self,
        frame: &ColorFrame,
        output: &mut ColorFrame,
    ) -> TrackResult<Self::Stats>;

    /// Tracks alive after the last processed frame
    fn tracks(&self) -> &[Track];
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: usize,
    pub dropped_frames: usize,
    pub final_tracks: usize,
}

/// Pulls frames from a source, runs them through a processor and hands the
/// annotated frames to a sink, one frame at a time.
pub struct Pipeline<S, P, O> {
    source: S,
    processor: P,
    sink: O,
    output: ColorFrame,
    // Incremented when a frame is pulled from the source. 0 before the first frame.
    frame_index: usize,
    dropped_frames: usize,
}

impl<S: FrameSource, P: FrameProcessor, O: OutputSink> Pipeline<S, P, O> {
    pub fn new(source: S, processor: P, sink: O) -> Self {
        Self {
            source,
            processor,
            sink,
            output: ColorFrame::zeros((0, 0, 3)),
            frame_index: 0,
            dropped_frames: 0,
        }
    }

    pub fn processor(&self) -> &P {
        &self.processor
    }

    pub fn sink(&self) -> &O {
        &self.sink
    }

    pub fn len_hint(&self) -> Option<u64> {
        self.source.len_hint()
    }

    /// Process the next frame. Returns `Ok(None)` once the source is exhausted.
    ///
    /// A `SinkRejection` loses the output of this frame only; the tracker
    /// state has already advanced and the next call proceeds normally.
    pub fn step(&mut self) -> TrackResult<Option<P::Stats>> {
        let frame = match self.source.next_frame().map_err(TrackError::Adapter)? {
            Some(frame) => frame,
            None => return Ok(None),
        };
        self.frame_index += 1;

        let stats = self.processor.process_frame(&frame, &mut self.output)?;

        let annotated = AnnotatedFrame {
            index: self.frame_index,
            image: &self.output,
            tracks: self.processor.tracks(),
        };
        self.sink
            .write(&annotated)
            .map_err(|source| TrackError::SinkRejection {
                frame: self.frame_index,
                source,
            })?;
        Ok(Some(stats))
    }

    /// Process frames until the source is exhausted. Sink rejections are
    /// logged and counted, any other error stops the run.
    pub fn run(&mut self) -> TrackResult<RunSummary> {
        let mut frames = 0;
        loop {
            match self.step() {
                Ok(Some(_)) => {}
                Ok(None) => break,
                Err(err) if err.is_recoverable() => {
                    warn!("{:#}", anyhow::Error::new(err));
                    self.dropped_frames += 1;
                }
                Err(err) => return Err(err),
            }
            frames += 1;
            Span::current().pb_inc(1);
        }
        self.sink.finish().map_err(TrackError::Adapter)?;

        let summary = RunSummary {
            frames,
            dropped_frames: self.dropped_frames,
            final_tracks: self.processor.tracks().len(),
        };
        info!(?summary, "run complete");
        Ok(summary)
    }
}
