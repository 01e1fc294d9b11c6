use anyhow::Result;
use nalgebra as na;

use crate::adapter::{FlowAdapter, FlowResult};
use crate::config::Config;
use crate::frame::PyramidFrame;
use crate::image::*;
use crate::my_types::*;

type Range = [[i16; 2]; 2];

/// Sparse pyramidal Lucas-Kanade optical flow.
pub struct LucasKanade {
    lk_iters: usize,
    lk_levels: usize,
    lk_win_size: usize,
    lk_term: f64,
    lk_min_eig: f64,
    ix: Matrixd,
    iy: Matrixd,
    it: Matrixd,
    grid: Matrixd,
    frame0: PyramidFrame,
    frame1: PyramidFrame,
}

impl LucasKanade {
    pub fn new(
        lk_levels: usize,
        lk_iters: usize,
        lk_win_size: usize,
        lk_term: f64,
        lk_min_eig: f64,
    ) -> Self {
        LucasKanade {
            lk_iters,
            lk_levels,
            lk_win_size,
            lk_term,
            lk_min_eig,
            ix: na::DMatrix::zeros(lk_win_size, lk_win_size),
            iy: na::DMatrix::zeros(lk_win_size, lk_win_size),
            it: na::DMatrix::zeros(lk_win_size, lk_win_size),
            grid: na::DMatrix::zeros(lk_win_size, lk_win_size),
            frame0: PyramidFrame::empty(),
            frame1: PyramidFrame::empty(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.lk_levels,
            config.lk_iters,
            config.lk_win_size,
            config.lk_term,
            config.lk_min_eig,
        )
    }

    /// Number of pyramid levels that fit the image, at most `lk_levels`.
    fn usable_levels(&self, image: &Image) -> usize {
        let mut levels = 0;
        let (mut w, mut h) = image.shape();
        while levels < self.lk_levels && w / 2 > self.lk_win_size && h / 2 > self.lk_win_size {
            w /= 2;
            h /= 2;
            levels += 1;
        }
        levels
    }

    /// Returns the tracked point and the mean absolute residual of the final
    /// window at full resolution.
    /// ref http://robots.stanford.edu/cs223b04/algo_tracking.pdf
    fn process_point(&mut self, levels: usize, point0: Vector2d) -> Option<(Vector2d, f64)> {
        let lk_term2 = self.lk_term.powi(2);
        let r = (self.lk_win_size - 1) / 2;

        let mut g_init = Vector2d::zeros();
        let mut d = Vector2d::zeros();
        let mut residual = 0.;
        for level in (0..levels + 1).rev() {
            let level0 = self.frame0.get_image_at_level(level);
            let level1 = self.frame1.get_image_at_level(level);
            let u = point0 / u32::pow(2, level as u32) as f64;
            let range = integration_range(level0, u, r, 1)?;
            // compute the derivative
            scharr(level0, u, range, &mut self.ix, &mut self.iy, &mut self.grid);
            let gradient = spatial_gradient(&self.ix, &self.iy);
            if gradient.symmetric_eigenvalues().min() < self.lk_min_eig {
                return None;
            }
            let mut converged = false;
            let mut nu = Vector2d::zeros();
            for _ in 0..self.lk_iters {
                image_difference(range, r, &self.grid, &mut self.it, level1, u + g_init + nu)?;
                let eta = flow_vector(&gradient, &self.ix, &self.iy, &self.it)?;
                nu += eta;
                if eta.norm_squared() < lk_term2 {
                    converged = true;
                    break;
                }
            }

            d = nu;
            if !converged {
                return None;
            }
            if level > 0 {
                g_init = 2. * (g_init + d)
            } else {
                image_difference(range, r, &self.grid, &mut self.it, level1, u + g_init + d)?;
                residual = self.it.iter().map(|v| v.abs()).sum::<f64>() / self.it.len() as f64;
            }
        }

        Some((point0 + g_init + d, residual))
    }
}

impl FlowAdapter for LucasKanade {
    fn advance(
        &mut self,
        previous: &Image,
        current: &Image,
        points: &[Point2d],
    ) -> Result<FlowResult> {
        let mut result = FlowResult::with_capacity(points.len());
        if points.is_empty() {
            return Ok(result);
        }
        anyhow::ensure!(
            previous.shape() == current.shape(),
            "flow frames differ in shape: {:?} vs {:?}",
            previous.shape(),
            current.shape()
        );
        anyhow::ensure!(!previous.is_empty(), "flow frames are empty");

        let levels = self.usable_levels(previous);
        self.frame0.update(previous, levels)?;
        self.frame1.update(current, levels)?;

        for point in points {
            match self.process_point(levels, *point) {
                Some((tracked, residual)) => result.push(tracked, true, residual),
                None => result.push(*point, false, f64::INFINITY),
            }
        }
        Ok(result)
    }
}

fn flow_vector(gradient: &Matrix2d, ix: &Matrixd, iy: &Matrixd, it: &Matrixd) -> Option<Vector2d> {
    let mut b = Vector2d::zeros();

    for y in 0..iy.nrows() {
        for x in 0..ix.ncols() {
            b[0] += it[(y, x)] * ix[(y, x)];
            b[1] += it[(y, x)] * iy[(y, x)];
        }
    }

    gradient.try_inverse().map(|inv_g| inv_g * b)
}

fn image_difference(
    prev_range: Range,
    r: usize,
    i0: &Matrixd,
    it: &mut Matrixd,
    level: &Image,
    center: Vector2d,
) -> Option<()> {
    let range = integration_range(level, center, r, 0)?;
    if range != prev_range {
        return None;
    }
    fill_grid(level, range, center, it);
    *it *= -1.;
    *it += i0.view((1, 1), (it.nrows(), it.ncols()));
    Some(())
}

fn spatial_gradient(ix: &Matrixd, iy: &Matrixd) -> Matrix2d {
    assert_eq!(ix.nrows(), iy.nrows());
    assert_eq!(ix.ncols(), iy.ncols());

    let mut x2 = 0.;
    let mut y2 = 0.;
    let mut xy = 0.;

    for y in 0..iy.nrows() {
        for x in 0..ix.ncols() {
            x2 += ix[(y, x)] * ix[(y, x)];
            y2 += iy[(y, x)] * iy[(y, x)];
            xy += ix[(y, x)] * iy[(y, x)];
        }
    }

    Matrix2d::new(x2, xy, xy, y2)
}

/// ref https://theailearner.com/tag/scharr-operator/
fn scharr(
    level: &Image,
    center: Vector2d,
    range: Range,
    out_x: &mut Matrixd,
    out_y: &mut Matrixd,
    grid: &mut Matrixd,
) {
    let grange = [
        [range[0][0] - 1, range[0][1] + 1],
        [range[1][0] - 1, range[1][1] + 1],
    ];
    fill_grid(level, grange, center, grid);

    *out_x = Matrixd::zeros(grid.nrows() - 2, grid.ncols() - 2);
    *out_y = Matrixd::zeros(grid.nrows() - 2, grid.ncols() - 2);
    for y in 1..(grid.nrows() - 1) {
        for x in 1..(grid.ncols() - 1) {
            out_x[(y - 1, x - 1)] =
                (10. * grid[(y, x + 1)] + 3. * grid[(y + 1, x + 1)] + 3. * grid[(y - 1, x + 1)]
                    - 10. * grid[(y, x - 1)]
                    - 3. * grid[(y + 1, x - 1)]
                    - 3. * grid[(y - 1, x - 1)])
                    / 32.;
            out_y[(y - 1, x - 1)] =
                (10. * grid[(y + 1, x)] + 3. * grid[(y + 1, x + 1)] + 3. * grid[(y + 1, x - 1)]
                    - 10. * grid[(y - 1, x)]
                    - 3. * grid[(y - 1, x + 1)]
                    - 3. * grid[(y - 1, x - 1)])
                    / 32.;
        }
    }
}

fn fill_grid(level: &Image, range: Range, center: Vector2d, grid: &mut Matrixd) {
    *grid = na::DMatrix::zeros(
        (range[1][1] - range[1][0] + 1) as usize,
        (range[0][1] - range[0][0] + 1) as usize,
    );

    for (y_ind, y) in (range[1][0]..=range[1][1]).enumerate() {
        for (x_ind, x) in (range[0][0]..=range[0][1]).enumerate() {
            grid[(y_ind, x_ind)] = bilinear(level, center + Vector2d::new(x as f64, y as f64));
        }
    }
}

/// Returns closed range of integer steps that can be taken without going outside
/// the image borders. Returns None if the center point is outside the level
/// boundaries.
fn integration_range(level: &Image, center: Vector2d, r: usize, padding: i16) -> Option<Range> {
    let r = r as i16;
    let mut range = [[0, 0], [0, 0]];
    for i in 0..2 {
        let s = if i == 0 { level.width } else { level.height };
        if !(center[i] >= 0. && center[i] <= (s - 1) as f64) {
            return None;
        }
        let n = center[i] as i16;
        let fract = if center[i].fract() > 0. { 1 } else { 0 };
        range[i] = [
            i16::max(-r, -n + padding),
            i16::min(r, s as i16 - n - padding - 1 - fract),
        ];
        if range[i][0] > range[i][1] {
            return None;
        }
    }
    Some(range)
}
