use anyhow::Result;

use crate::adapter::{DetectionParams, DetectorAdapter};
use crate::image::Image;
use crate::my_types::*;

/// Side of the window the structure tensor is summed over
const BLOCK_SIZE: usize = 3;

/// Shi-Tomasi "good features to track" corner detector.
/// ref https://www.ai.mit.edu/courses/6.891/handouts/shi94good.pdf
pub struct ShiTomasi {
    dx: Vec<f32>,
    dy: Vec<f32>,
    response: Vec<f32>,
}

impl ShiTomasi {
    pub fn new() -> Self {
        ShiTomasi {
            dx: vec![],
            dy: vec![],
            response: vec![],
        }
    }

    /// Sobel derivatives, zero on the one pixel border
    fn compute_gradients(&mut self, image: &Image) {
        let (w, h) = image.shape();
        self.dx.clear();
        self.dy.clear();
        self.dx.resize(w * h, 0.);
        self.dy.resize(w * h, 0.);
        if w < 3 || h < 3 {
            return;
        }
        let v = |x: usize, y: usize| image.value(x, y) as f32;
        for y in 1..h - 1 {
            for x in 1..w - 1 {
                self.dx[y * w + x] = (v(x + 1, y - 1) + 2. * v(x + 1, y) + v(x + 1, y + 1))
                    - (v(x - 1, y - 1) + 2. * v(x - 1, y) + v(x - 1, y + 1));
                self.dy[y * w + x] = (v(x - 1, y + 1) + 2. * v(x, y + 1) + v(x + 1, y + 1))
                    - (v(x - 1, y - 1) + 2. * v(x, y - 1) + v(x + 1, y - 1));
            }
        }
    }

    /// Minimum eigenvalue of the structure tensor for every pixel
    fn compute_response(&mut self, image: &Image) {
        let (w, h) = image.shape();
        self.response.clear();
        self.response.resize(w * h, 0.);
        let r = BLOCK_SIZE / 2;
        if w < BLOCK_SIZE + 2 || h < BLOCK_SIZE + 2 {
            return;
        }
        for y in r + 1..h - r - 1 {
            for x in r + 1..w - r - 1 {
                let mut a = 0.;
                let mut b = 0.;
                let mut c = 0.;
                for yy in y - r..=y + r {
                    for xx in x - r..=x + r {
                        let gx = self.dx[yy * w + xx];
                        let gy = self.dy[yy * w + xx];
                        a += gx * gx;
                        b += gx * gy;
                        c += gy * gy;
                    }
                }
                self.response[y * w + x] = min_eigenvalue(a, b, c);
            }
        }
    }

    fn is_local_max(&self, w: usize, x: usize, y: usize) -> bool {
        let value = self.response[y * w + x];
        for yy in y - 1..=y + 1 {
            for xx in x - 1..=x + 1 {
                if self.response[yy * w + xx] > value {
                    return false;
                }
            }
        }
        true
    }
}

impl Default for ShiTomasi {
    fn default() -> Self {
        Self::new()
    }
}

/// Smaller eigenvalue of the symmetric matrix [a b; b c]
fn min_eigenvalue(a: f32, b: f32, c: f32) -> f32 {
    let half_trace = (a + c) / 2.;
    let half_diff = (a - c) / 2.;
    half_trace - (half_diff * half_diff + b * b).sqrt()
}

impl DetectorAdapter for ShiTomasi {
    fn detect(&mut self, image: &Image, params: &DetectionParams) -> Result<Vec<Point2d>> {
        anyhow::ensure!(
            params.quality_level > 0. && params.quality_level < 1.,
            "quality level must be in (0, 1), got {}",
            params.quality_level
        );
        let (w, h) = image.shape();
        self.compute_gradients(image);
        self.compute_response(image);

        let max_response = self.response.iter().cloned().fold(0., f32::max);
        if max_response <= 0. {
            return Ok(vec![]);
        }
        let threshold = max_response * params.quality_level as f32;

        let mut candidates = vec![];
        for y in 1..h.saturating_sub(1) {
            for x in 1..w.saturating_sub(1) {
                let value = self.response[y * w + x];
                if value > threshold && self.is_local_max(w, x, y) {
                    candidates.push((value, x, y));
                }
            }
        }
        // strongest first, ties in raster order
        candidates.sort_by(|a, b| b.0.total_cmp(&a.0));

        let mut grid = DistanceGrid::new(w, h, params.min_distance);
        let mut corners = vec![];
        for (_, x, y) in candidates {
            if params.max_count > 0 && corners.len() >= params.max_count {
                break;
            }
            let point = Point2d::new(x as f64, y as f64);
            if grid.try_insert(point) {
                corners.push(point);
            }
        }
        Ok(corners)
    }
}

/// Bucket grid answering "is any accepted point closer than min_distance".
struct DistanceGrid {
    cell: f64,
    cols: usize,
    rows: usize,
    min_distance2: f64,
    cells: Vec<Vec<Point2d>>,
}

impl DistanceGrid {
    fn new(width: usize, height: usize, min_distance: f64) -> Self {
        let cell = min_distance.max(1.);
        let cols = (width as f64 / cell).ceil() as usize + 1;
        let rows = (height as f64 / cell).ceil() as usize + 1;
        DistanceGrid {
            cell,
            cols,
            rows,
            min_distance2: min_distance * min_distance,
            cells: vec![vec![]; cols * rows],
        }
    }

    fn try_insert(&mut self, point: Point2d) -> bool {
        let cx = (point.x / self.cell) as usize;
        let cy = (point.y / self.cell) as usize;
        for y in cy.saturating_sub(1)..=usize::min(cy + 1, self.rows - 1) {
            for x in cx.saturating_sub(1)..=usize::min(cx + 1, self.cols - 1) {
                for other in &self.cells[y * self.cols + x] {
                    if (other - point).norm_squared() < self.min_distance2 {
                        return false;
                    }
                }
            }
        }
        self.cells[cy * self.cols + cx].push(point);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn squares(positions: &[(i32, i32)]) -> Image {
        let mut image = Image::filled(100, 80, 10);
        let square = Image::filled(12, 12, 200);
        for &(x, y) in positions {
            image.set_sub_image_i32(x, y, &square);
        }
        image
    }

    fn near(points: &[Point2d], x: f64, y: f64) -> bool {
        points.iter().any(|p| (p.x - x).abs() <= 2. && (p.y - y).abs() <= 2.)
    }

    #[test]
    fn test_square_corners() {
        let image = squares(&[(30, 30)]);
        let mut detector = ShiTomasi::new();
        let corners = detector.detect(&image, &DetectionParams::default()).unwrap();
        assert_eq!(corners.len(), 4);
        for (x, y) in [(30., 30.), (41., 30.), (30., 41.), (41., 41.)] {
            assert!(near(&corners, x, y), "missing corner near ({x}, {y}): {corners:?}");
        }
    }

    #[test]
    fn test_flat_image_has_no_corners() {
        let image = Image::filled(50, 50, 128);
        let mut detector = ShiTomasi::new();
        let corners = detector.detect(&image, &DetectionParams::default()).unwrap();
        assert!(corners.is_empty());
    }

    #[test]
    fn test_max_count_and_min_distance() {
        let image = squares(&[(10, 10), (50, 10), (10, 50), (60, 50)]);
        let mut detector = ShiTomasi::new();
        let params = DetectionParams {
            max_count: 5,
            ..DetectionParams::default()
        };
        let corners = detector.detect(&image, &params).unwrap();
        assert_eq!(corners.len(), 5);

        let params = DetectionParams {
            max_count: 0,
            min_distance: 20.,
            ..DetectionParams::default()
        };
        let corners = detector.detect(&image, &params).unwrap();
        for (i, a) in corners.iter().enumerate() {
            for b in &corners[i + 1..] {
                assert!((a - b).norm() >= 20.);
            }
        }
        // one corner survives per square
        assert_eq!(corners.len(), 4);
    }

    #[test]
    fn test_invalid_quality() {
        let image = squares(&[(30, 30)]);
        let mut detector = ShiTomasi::new();
        let params = DetectionParams {
            quality_level: 0.,
            ..DetectionParams::default()
        };
        assert!(detector.detect(&image, &params).is_err());
    }

    #[test]
    fn test_min_eigenvalue() {
        assert_eq!(min_eigenvalue(4., 0., 1.), 1.);
        assert_eq!(min_eigenvalue(2., 2., 2.), 0.);
    }
}
