use crate::adapter::DetectionParams;
use crate::config::Config;
use crate::feature::Track;
use crate::math::manhattan;

/// Decides when new tracks are seeded.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Replenishment {
    pub low_water_mark: usize,
    pub params: DetectionParams,
}

impl Default for Replenishment {
    fn default() -> Self {
        Self {
            low_water_mark: 10,
            params: DetectionParams::default(),
        }
    }
}

impl Replenishment {
    pub fn from_config(config: &Config) -> Self {
        Self {
            low_water_mark: config.low_water_mark,
            params: config.detection_params(),
        }
    }

    pub fn needs_replenishment(&self, track_count: usize) -> bool {
        track_count <= self.low_water_mark
    }
}

/// Why an advanced track was dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejection {
    /// the flow could not match the point
    Lost,
    /// matched, but moved too little to be interesting
    Stationary,
}

/// Decides which advanced tracks survive into the next frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Acceptance {
    /// Manhattan displacement must be strictly greater than this
    pub min_displacement: f64,
    pub require_status: bool,
}

impl Default for Acceptance {
    fn default() -> Self {
        Self {
            min_displacement: 2.,
            require_status: true,
        }
    }
}

impl Acceptance {
    pub fn from_config(config: &Config) -> Self {
        Self {
            min_displacement: config.min_displacement,
            require_status: config.require_status,
        }
    }

    /// `track.previous` is the position before the flow call and
    /// `track.current` the position after it.
    pub fn check(&self, track: &Track, status: bool) -> Result<(), Rejection> {
        if self.require_status && !status {
            return Err(Rejection::Lost);
        }
        if !(track.current.x.is_finite() && track.current.y.is_finite()) {
            return Err(Rejection::Lost);
        }
        if manhattan(&track.previous, &track.current) > self.min_displacement {
            Ok(())
        } else {
            Err(Rejection::Stationary)
        }
    }

    pub fn accepts(&self, track: &Track, status: bool) -> bool {
        self.check(track, status).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::my_types::Point2d;

    fn moved(dx: f64, dy: f64) -> Track {
        let mut track = Track::seed(Point2d::new(50., 50.));
        track.current = Point2d::new(50. + dx, 50. + dy);
        track
    }

    #[test]
    fn test_low_water_mark() {
        let policy = Replenishment::default();
        assert!(policy.needs_replenishment(0));
        assert!(policy.needs_replenishment(10));
        assert!(!policy.needs_replenishment(11));
        assert_eq!(policy.params.max_count, 500);
    }

    #[test]
    fn test_threshold_is_strict() {
        let policy = Acceptance::default();
        assert_eq!(policy.check(&moved(2., 0.), true), Err(Rejection::Stationary));
        assert_eq!(policy.check(&moved(1., -1.), true), Err(Rejection::Stationary));
        assert!(policy.accepts(&moved(2.0001, 0.), true));
        assert!(policy.accepts(&moved(-1.5, 1.5), true));
    }

    #[test]
    fn test_status_gate() {
        let policy = Acceptance::default();
        assert_eq!(policy.check(&moved(1000., 0.), false), Err(Rejection::Lost));
        assert_eq!(policy.check(&moved(0., 0.), false), Err(Rejection::Lost));

        let lenient = Acceptance {
            require_status: false,
            ..Acceptance::default()
        };
        assert!(lenient.accepts(&moved(3., 0.), false));
    }

    #[test]
    fn test_non_finite_position_is_lost() {
        let policy = Acceptance::default();
        assert_eq!(policy.check(&moved(f64::INFINITY, 0.), true), Err(Rejection::Lost));
        assert_eq!(policy.check(&moved(0., f64::NEG_INFINITY), true), Err(Rejection::Lost));
        assert_eq!(policy.check(&moved(f64::NAN, 5.), true), Err(Rejection::Lost));
        // far away but finite is still a valid match
        assert!(policy.accepts(&moved(1e12, 0.), true));
    }
}
