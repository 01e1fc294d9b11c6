use crate::feature::Track;
use crate::image::ColorFrame;
use crate::math::to_pixel;
use crate::my_types::*;

pub const LINE_COLOR: [u8; 3] = [255, 255, 255];
pub const MARKER_COLOR: [u8; 3] = [255, 255, 255];
pub const MARKER_RADIUS: i64 = 3;

/// Copy `frame` into `output` and draw every track on it: a line from its
/// origin to its current position and a filled disc at the current position.
pub fn render_overlay(frame: &ColorFrame, tracks: &[Track], output: &mut ColorFrame) {
    if output.dim() == frame.dim() {
        output.assign(frame);
    } else {
        *output = frame.clone();
    }

    let (height, width, _) = output.dim();
    for track in tracks {
        if let Some((p0, p1)) = clip_segment(track.origin, track.current, width, height) {
            draw_line(output, to_pixel(&p0), to_pixel(&p1), LINE_COLOR);
        }
        if is_near_frame(track.current, width, height) {
            draw_disc(output, to_pixel(&track.current), MARKER_RADIUS, MARKER_COLOR);
        }
    }
}

fn is_near_frame(p: Point2d, width: usize, height: usize) -> bool {
    let margin = MARKER_RADIUS as f64 + 1.;
    p.x > -margin && p.y > -margin && p.x < width as f64 + margin && p.y < height as f64 + margin
}

/// Cut the segment `p0`-`p1` to the pixel centers of a `width` x `height`
/// frame. Returns None if no part of it lies inside.
/// ref https://en.wikipedia.org/wiki/Liang%E2%80%93Barsky_algorithm
fn clip_segment(
    p0: Point2d,
    p1: Point2d,
    width: usize,
    height: usize,
) -> Option<(Point2d, Point2d)> {
    if width == 0 || height == 0 || !p0.iter().chain(p1.iter()).all(|v| v.is_finite()) {
        return None;
    }
    let max = Vector2d::new((width - 1) as f64, (height - 1) as f64);
    let d = p1 - p0;
    let mut t0: f64 = 0.;
    let mut t1: f64 = 1.;
    for i in 0..2 {
        for (p, q) in [(-d[i], p0[i]), (d[i], max[i] - p0[i])] {
            if p == 0. {
                if q < 0. {
                    return None;
                }
                continue;
            }
            let r = q / p;
            if p < 0. {
                if r > t1 {
                    return None;
                }
                t0 = t0.max(r);
            } else {
                if r < t0 {
                    return None;
                }
                t1 = t1.min(r);
            }
        }
    }
    let clamp = |p: Point2d| Point2d::new(p.x.clamp(0., max.x), p.y.clamp(0., max.y));
    Some((clamp(p0 + t0 * d), clamp(p0 + t1 * d)))
}

#[inline(always)]
fn put_pixel(image: &mut ColorFrame, x: i64, y: i64, color: [u8; 3]) {
    let (height, width, _) = image.dim();
    if x < 0 || y < 0 || x >= width as i64 || y >= height as i64 {
        return;
    }
    for (c, value) in color.iter().enumerate() {
        image[[y as usize, x as usize, c]] = *value;
    }
}

/// ref https://en.wikipedia.org/wiki/Bresenham%27s_line_algorithm
pub fn draw_line(image: &mut ColorFrame, p0: (i64, i64), p1: (i64, i64), color: [u8; 3]) {
    let (mut x, mut y) = p0;
    let dx = (p1.0 - x).abs();
    let dy = -(p1.1 - y).abs();
    let sx = if x < p1.0 { 1 } else { -1 };
    let sy = if y < p1.1 { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        put_pixel(image, x, y, color);
        if x == p1.0 && y == p1.1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

pub fn draw_disc(image: &mut ColorFrame, center: (i64, i64), radius: i64, color: [u8; 3]) {
    let r2 = radius * radius;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= r2 {
                put_pixel(image, center.0 + dx, center.1 + dy, color);
            }
        }
    }
}
