use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context as AnyhowContext, Result};
use rerun::{RecordingStream, RecordingStreamBuilder};
use serde::Serialize;

use crate::adapter::{AnnotatedFrame, FrameSource, OutputSink};
use crate::feature::TrackRecord;

/// Frame rate of encoded output when the source does not report one
pub const DEFAULT_FPS: f64 = 30.;

/// Rate to encode annotated frames at, so output plays at the input's speed.
pub fn output_fps<S: FrameSource + ?Sized>(source: &S) -> f64 {
    source.fps().unwrap_or(DEFAULT_FPS)
}

/// Discards every frame.
#[derive(Debug, Default)]
pub struct NullSink;

impl OutputSink for NullSink {
    fn write(&mut self, _frame: &AnnotatedFrame) -> Result<()> {
        Ok(())
    }
}

#[derive(Serialize)]
struct FrameRecord {
    frame: usize,
    tracks: Vec<TrackRecord>,
}

/// Writes the tracks of every frame as one JSON line.
pub struct JsonlSink<W: Write> {
    writer: W,
}

impl JsonlSink<BufWriter<File>> {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> JsonlSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> OutputSink for JsonlSink<W> {
    fn write(&mut self, frame: &AnnotatedFrame) -> Result<()> {
        let record = FrameRecord {
            frame: frame.index,
            tracks: frame.tracks.iter().map(TrackRecord::from).collect(),
        };
        serde_json::to_writer(&mut self.writer, &record)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Logs annotated frames and track positions to a rerun recording.
pub struct RerunSink {
    recorder: RecordingStream,
}

impl RerunSink {
    pub fn save(path: &Path) -> Result<Self> {
        let recorder = RecordingStreamBuilder::new("lk-track")
            .save(path)
            .with_context(|| format!("Failed to open recording {}", path.display()))?;
        Ok(Self { recorder })
    }
}

impl OutputSink for RerunSink {
    fn write(&mut self, frame: &AnnotatedFrame) -> Result<()> {
        self.recorder.set_time_sequence("frame", frame.index as i64);
        self.recorder.log(
            "camera/tracks",
            &rerun::Image::try_from(frame.image.clone())?,
        )?;
        let positions = frame
            .tracks
            .iter()
            .map(|t| [t.current.x as f32, t.current.y as f32]);
        self.recorder
            .log("camera/tracks/points", &rerun::Points2D::new(positions))?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.recorder.flush_blocking();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::SyntheticVideo;
    use crate::feature::Track;
    use crate::image::ColorFrame;
    use crate::my_types::Point2d;

    struct Clip {
        fps: f64,
    }

    impl FrameSource for Clip {
        fn next_frame(&mut self) -> Result<Option<ColorFrame>> {
            Ok(None)
        }

        fn fps(&self) -> Option<f64> {
            Some(self.fps)
        }
    }

    #[test]
    fn test_output_fps_follows_source() {
        let source: Box<dyn FrameSource> = Box::new(Clip { fps: 24.5 });
        assert_eq!(output_fps(&source), 24.5);
        assert_eq!(output_fps(source.as_ref()), 24.5);
        assert_eq!(output_fps(&SyntheticVideo::new(8, 8, 1, 0)), DEFAULT_FPS);
    }

    #[test]
    fn test_jsonl_lines() {
        let image = ColorFrame::zeros((2, 2, 3));
        let mut track = Track::seed(Point2d::new(1., 2.));
        track.current = Point2d::new(4.5, 6.);
        let mut sink = JsonlSink::new(vec![]);
        sink.write(&AnnotatedFrame {
            index: 1,
            image: &image,
            tracks: &[track],
        })
        .unwrap();
        sink.write(&AnnotatedFrame {
            index: 2,
            image: &image,
            tracks: &[],
        })
        .unwrap();
        sink.finish().unwrap();

        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["frame"], 1);
        assert_eq!(first["tracks"][0]["origin"], serde_json::json!([1.0, 2.0]));
        assert_eq!(first["tracks"][0]["position"], serde_json::json!([4.5, 6.0]));
        assert_eq!(lines[1], r#"{"frame":2,"tracks":[]}"#);
    }

    #[test]
    fn test_null_sink() {
        let image = ColorFrame::zeros((1, 1, 3));
        let mut sink = NullSink;
        assert!(sink
            .write(&AnnotatedFrame {
                index: 1,
                image: &image,
                tracks: &[],
            })
            .is_ok());
    }
}
