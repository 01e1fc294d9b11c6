use tracing::{debug, instrument};

use crate::adapter::{DetectorAdapter, FlowAdapter};
use crate::config::Config;
use crate::error::{ContractViolation, TrackError, TrackResult};
use crate::feature::{Track, TrackSet};
use crate::image::*;
use crate::pipeline::FrameProcessor;
use crate::policy::{Acceptance, Rejection, Replenishment};
use crate::visualization::render_overlay;

/// What happened to the track set during one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CycleStats {
    /// tracks alive before the frame
    pub carried: usize,
    pub seeded: usize,
    pub lost: usize,
    pub stationary: usize,
    /// tracks alive after the frame
    pub kept: usize,
}

impl CycleStats {
    pub fn advanced(&self) -> usize {
        self.carried + self.seeded
    }
}

/// Optical-flow point tracker.
///
/// Every frame: seed new tracks when few are left, move all tracks with the
/// flow adapter, drop the ones that were lost or barely moved, then make the
/// current frame the basis of the next one.
pub struct Tracker<D: DetectorAdapter, F: FlowAdapter> {
    detector: D,
    optical_flow: F,
    replenishment: Replenishment,
    acceptance: Acceptance,
    tracks: TrackSet,
    /// gray frame of the last completed cycle, None before the first frame
    previous_gray: Option<Image>,
    /// storage for the next gray frame, recycled from the retired previous frame
    spare_gray: Image,
    // Incremented when a frame cycle completes. 0 before the first frame.
    frame_number: usize,
}

impl<D: DetectorAdapter, F: FlowAdapter> Tracker<D, F> {
    pub fn new(
        detector: D,
        optical_flow: F,
        replenishment: Replenishment,
        acceptance: Acceptance,
    ) -> Self {
        Tracker {
            detector,
            optical_flow,
            replenishment,
            acceptance,
            tracks: TrackSet::new(),
            previous_gray: None,
            spare_gray: Image::empty(),
            frame_number: 0,
        }
    }

    pub fn from_config(detector: D, optical_flow: F, config: &Config) -> Self {
        Self::new(
            detector,
            optical_flow,
            Replenishment::from_config(config),
            Acceptance::from_config(config),
        )
    }

    pub fn tracks(&self) -> &[Track] {
        self.tracks.as_slice()
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    pub fn optical_flow(&self) -> &F {
        &self.optical_flow
    }

    pub fn optical_flow_mut(&mut self) -> &mut F {
        &mut self.optical_flow
    }

    pub fn frame_number(&self) -> usize {
        self.frame_number
    }

    pub fn previous_gray(&self) -> Option<&Image> {
        self.previous_gray.as_ref()
    }

    /// Run one frame cycle on an already converted grayscale frame.
    ///
    /// On error the track set and the previous frame are left as they were.
    #[instrument(skip_all, fields(frame = self.frame_number + 1))]
    pub fn track(&mut self, gray: Image) -> TrackResult<CycleStats> {
        if let Some(previous) = &self.previous_gray {
            if previous.shape() != gray.shape() {
                return Err(ContractViolation::DegenerateFrame {
                    expected: previous.shape(),
                    actual: gray.shape(),
                }
                .into());
            }
        }

        let mut stats = CycleStats {
            carried: self.tracks.len(),
            ..CycleStats::default()
        };

        // replenish
        let seeds = if self.replenishment.needs_replenishment(self.tracks.len()) {
            self.detector
                .detect(&gray, &self.replenishment.params)
                .map_err(TrackError::Adapter)?
        } else {
            vec![]
        };
        stats.seeded = seeds.len();

        // the first frame is compared against itself
        let previous = self.previous_gray.as_ref().unwrap_or(&gray);

        // advance
        let mut points = self.tracks.previous_positions();
        points.extend_from_slice(&seeds);
        let flow = if points.is_empty() {
            Default::default()
        } else {
            self.optical_flow
                .advance(previous, &gray, &points)
                .map_err(TrackError::Adapter)?
        };
        if flow.positions.len() != points.len()
            || flow.status.len() != points.len()
            || flow.errors.len() != points.len()
        {
            return Err(ContractViolation::FlowLength {
                expected: points.len(),
                positions: flow.positions.len(),
                status: flow.status.len(),
                errors: flow.errors.len(),
            }
            .into());
        }

        // accept
        self.tracks.extend_seeded(&seeds);
        self.tracks.set_current(&flow.positions);
        let acceptance = self.acceptance;
        self.tracks.compact(|i, track| match acceptance.check(track, flow.status[i]) {
            Ok(()) => true,
            Err(Rejection::Lost) => {
                stats.lost += 1;
                false
            }
            Err(Rejection::Stationary) => {
                stats.stationary += 1;
                false
            }
        });
        stats.kept = self.tracks.len();

        self.rotate(gray);
        debug!(?stats, "frame cycle complete");
        Ok(stats)
    }

    /// Commit the current frame as the basis for the next one.
    fn rotate(&mut self, gray: Image) {
        self.tracks.rotate();
        if let Some(retired) = self.previous_gray.replace(gray) {
            self.spare_gray = retired;
        }
        self.frame_number += 1;
    }
}

impl<D: DetectorAdapter, F: FlowAdapter> FrameProcessor for Tracker<D, F> {
    type Stats = CycleStats;

    fn process_frame(
        &mut self,
        frame: &ColorFrame,
        output: &mut ColorFrame,
    ) -> TrackResult<CycleStats> {
        let mut gray = std::mem::replace(&mut self.spare_gray, Image::empty());
        grayscale_into(frame, &mut gray);
        let stats = self.track(gray)?;
        render_overlay(frame, self.tracks(), output);
        Ok(stats)
    }

    fn tracks(&self) -> &[Track] {
        self.tracks.as_slice()
    }
}
