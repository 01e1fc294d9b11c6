use serde::Serialize;

use crate::my_types::*;

/// A point followed across frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Track {
    /// position in the frame the track was seeded
    pub origin: Point2d,
    /// position in the prior frame, the input of the next flow call
    pub previous: Point2d,
    /// position in the current frame
    pub current: Point2d,
}

impl Track {
    /// A freshly detected track. It has not been advanced yet, so all three
    /// positions coincide.
    pub fn seed(point: Point2d) -> Self {
        Track {
            origin: point,
            previous: point,
            current: point,
        }
    }

    /// Commit the current position as the basis for the next frame
    pub fn rotate(&mut self) {
        self.previous = self.current;
    }
}

/// Serialized form of a track, as written by the output sinks.
#[derive(Clone, Debug, Serialize)]
pub struct TrackRecord {
    pub origin: [f64; 2],
    pub position: [f64; 2],
}

impl From<&Track> for TrackRecord {
    fn from(track: &Track) -> Self {
        TrackRecord {
            origin: [track.origin.x, track.origin.y],
            position: [track.current.x, track.current.y],
        }
    }
}

/// Ordered set of live tracks. Order is insertion order and removal never
/// reorders the survivors.
#[derive(Clone, Debug, Default)]
pub struct TrackSet {
    tracks: Vec<Track>,
}

impl TrackSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn as_slice(&self) -> &[Track] {
        &self.tracks
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Track> {
        self.tracks.iter()
    }

    /// Append seeded tracks after the existing ones
    pub fn extend_seeded(&mut self, points: &[Point2d]) {
        self.tracks.extend(points.iter().copied().map(Track::seed));
    }

    pub fn previous_positions(&self) -> Vec<Point2d> {
        self.tracks.iter().map(|t| t.previous).collect()
    }

    /// Store advanced positions. `positions` is index-aligned with the set.
    pub fn set_current(&mut self, positions: &[Point2d]) {
        assert_eq!(positions.len(), self.tracks.len());
        for (track, position) in self.tracks.iter_mut().zip(positions) {
            track.current = *position;
        }
    }

    /// Stable filter. `keep` is called once per track, in order, with its index.
    pub fn compact<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(usize, &Track) -> bool,
    {
        let before = self.tracks.len();
        let mut i = 0;
        self.tracks.retain(|track| {
            let kept = keep(i, track);
            i += 1;
            kept
        });
        before - self.tracks.len()
    }

    pub fn rotate(&mut self) {
        for track in self.tracks.iter_mut() {
            track.rotate();
        }
    }
}

impl<'a> IntoIterator for &'a TrackSet {
    type Item = &'a Track;
    type IntoIter = std::slice::Iter<'a, Track>;

    fn into_iter(self) -> Self::IntoIter {
        self.tracks.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xs(set: &TrackSet) -> Vec<f64> {
        set.iter().map(|t| t.origin.x).collect()
    }

    #[test]
    fn test_seed_appends_in_order() {
        let mut set = TrackSet::new();
        set.extend_seeded(&[Point2d::new(1., 0.), Point2d::new(2., 0.)]);
        set.extend_seeded(&[Point2d::new(3., 0.)]);
        assert_eq!(xs(&set), vec![1., 2., 3.]);
        let t = set.as_slice()[2];
        assert_eq!(t.origin, t.previous);
        assert_eq!(t.origin, t.current);
    }

    #[test]
    fn test_compact_is_stable() {
        let mut set = TrackSet::new();
        let points: Vec<_> = (0..6).map(|i| Point2d::new(i as f64, 0.)).collect();
        set.extend_seeded(&points);
        let removed = set.compact(|i, _| i % 2 == 1);
        assert_eq!(removed, 3);
        assert_eq!(xs(&set), vec![1., 3., 5.]);
    }

    #[test]
    fn test_rotate() {
        let mut set = TrackSet::new();
        set.extend_seeded(&[Point2d::new(1., 1.)]);
        set.set_current(&[Point2d::new(4., 5.)]);
        set.rotate();
        let t = set.as_slice()[0];
        assert_eq!(t.previous, Point2d::new(4., 5.));
        assert_eq!(t.origin, Point2d::new(1., 1.));
    }
}
