//! Scripted adapters for driving the tracker frame by frame.

#![allow(dead_code)]

use anyhow::Result;

use lk_track_rust::adapter::{DetectionParams, DetectorAdapter, FlowAdapter, FlowResult};
use lk_track_rust::image::Image;
use lk_track_rust::my_types::{Point2d, Vector2d};
use lk_track_rust::policy::{Acceptance, Replenishment};
use lk_track_rust::tracker::Tracker;

/// Hands out one scripted detection per call, then nothing.
#[derive(Default)]
pub struct ScriptedDetector {
    pub script: Vec<Vec<Point2d>>,
    pub calls: Vec<DetectionParams>,
}

impl DetectorAdapter for ScriptedDetector {
    fn detect(&mut self, _gray: &Image, params: &DetectionParams) -> Result<Vec<Point2d>> {
        self.calls.push(*params);
        if self.script.is_empty() {
            Ok(vec![])
        } else {
            Ok(self.script.remove(0))
        }
    }
}

/// Per call, a list of (displacement, status) applied to the points in order.
/// Points beyond the scripted list move by `fallback`.
pub struct ScriptedFlow {
    pub script: Vec<Vec<(Vector2d, bool)>>,
    pub fallback: (Vector2d, bool),
    pub inputs: Vec<Vec<Point2d>>,
}

impl ScriptedFlow {
    pub fn constant(dx: f64, dy: f64, status: bool) -> Self {
        ScriptedFlow {
            script: vec![],
            fallback: (Vector2d::new(dx, dy), status),
            inputs: vec![],
        }
    }
}

impl FlowAdapter for ScriptedFlow {
    fn advance(
        &mut self,
        _previous: &Image,
        _current: &Image,
        points: &[Point2d],
    ) -> Result<FlowResult> {
        self.inputs.push(points.to_vec());
        let moves = if self.script.is_empty() {
            vec![]
        } else {
            self.script.remove(0)
        };
        let mut result = FlowResult::default();
        for (i, p) in points.iter().enumerate() {
            let (offset, ok) = moves.get(i).copied().unwrap_or(self.fallback);
            result.push(p + offset, ok, 0.);
        }
        Ok(result)
    }
}

/// Points along a row, 20 px apart
pub fn row(n: usize, y: f64) -> Vec<Point2d> {
    (0..n).map(|i| Point2d::new(10. + 20. * i as f64, y)).collect()
}

pub fn gray(value: u8) -> Image {
    Image::filled(64, 48, value)
}

pub fn tracker(
    detector: ScriptedDetector,
    flow: ScriptedFlow,
) -> Tracker<ScriptedDetector, ScriptedFlow> {
    Tracker::new(detector, flow, Replenishment::default(), Acceptance::default())
}
