use ndarray as nd;

use crate::my_types::*;

/// Color frame as supplied by a frame source, shape (height, width, 3), RGB.
pub type ColorFrame = nd::Array3<u8>;

// BT.601 luma weights in 14-bit fixed point
const R2Y: u32 = 4899;
const G2Y: u32 = 9617;
const B2Y: u32 = 1868;
const GRAY_SHIFT: u32 = 14;

/// Row-major grayscale image storage
#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
}

impl Image {
    /// Create an empty image
    pub fn empty() -> Image {
        Image {
            data: vec![],
            width: 0,
            height: 0,
        }
    }

    /// Create an image filled with a constant value
    pub fn filled(width: usize, height: usize, value: u8) -> Image {
        Image {
            data: vec![value; width * height],
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn shape(&self) -> ImageShape {
        (self.width, self.height)
    }

    #[inline(always)]
    pub fn value(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    #[inline(always)]
    pub fn value_i32(&self, x: i32, y: i32) -> u8 {
        self.data[y as usize * self.width + x as usize]
    }

    #[inline(always)]
    pub fn set_value(&mut self, x: usize, y: usize, value: u8) {
        self.data[y * self.width + x] = value;
    }

    /// Copy `patch` with its top-left corner at (x, y), clipping at the borders
    pub fn set_sub_image_i32(&mut self, x: i32, y: i32, patch: &Image) {
        for py in 0..patch.height as i32 {
            for px in 0..patch.width as i32 {
                let (tx, ty) = (x + px, y + py);
                if tx < 0 || ty < 0 || tx >= self.width as i32 || ty >= self.height as i32 {
                    continue;
                }
                self.set_value(tx as usize, ty as usize, patch.value_i32(px, py));
            }
        }
    }
}

/// Convert a color frame to grayscale, reusing the storage of `gray`.
pub fn grayscale_into(frame: &ColorFrame, gray: &mut Image) {
    let (height, width, _) = frame.dim();
    gray.data.clear();
    gray.data.reserve(width * height);
    gray.width = width;
    gray.height = height;
    for pixel in frame.lanes(nd::Axis(2)) {
        let (r, g, b) = (pixel[0] as u32, pixel[1] as u32, pixel[2] as u32);
        let y = (r * R2Y + g * G2Y + b * B2Y + (1 << (GRAY_SHIFT - 1))) >> GRAY_SHIFT;
        gray.data.push(y.min(255) as u8);
    }
}

pub fn to_grayscale(frame: &ColorFrame) -> Image {
    let mut gray = Image::empty();
    grayscale_into(frame, &mut gray);
    gray
}

/// Replicate a grayscale image into the three channels of a color frame
pub fn gray_to_color(image: &Image) -> ColorFrame {
    ColorFrame::from_shape_fn((image.height, image.width, 3), |(y, x, _)| {
        image.value(x, y)
    })
}

/// Bilinear interpolation. Coordinates outside the image are clamped to the border.
pub fn bilinear(image: &Image, point: Vector2d) -> f64 {
    let max_x = (image.width - 1) as f64;
    let max_y = (image.height - 1) as f64;
    let x = point.x.clamp(0., max_x);
    let y = point.y.clamp(0., max_y);

    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = usize::min(x0 + 1, image.width - 1);
    let y1 = usize::min(y0 + 1, image.height - 1);
    let ax = x - x0 as f64;
    let ay = y - y0 as f64;

    let v00 = image.value(x0, y0) as f64;
    let v10 = image.value(x1, y0) as f64;
    let v01 = image.value(x0, y1) as f64;
    let v11 = image.value(x1, y1) as f64;

    (1. - ay) * ((1. - ax) * v00 + ax * v10) + ay * ((1. - ax) * v01 + ax * v11)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grayscale() {
        let mut frame = ColorFrame::zeros((2, 3, 3));
        frame[[0, 0, 0]] = 255;
        frame[[0, 1, 1]] = 255;
        frame[[0, 2, 2]] = 255;
        for c in 0..3 {
            frame[[1, 0, c]] = 255;
            frame[[1, 1, c]] = 128;
        }
        let gray = to_grayscale(&frame);
        assert_eq!(gray.shape(), (3, 2));
        assert_eq!(gray.data, vec![76, 150, 29, 255, 128, 0]);
    }

    #[test]
    fn test_grayscale_into_reuses_storage() {
        let frame = ColorFrame::from_elem((4, 5, 3), 10);
        let mut gray = Image::filled(100, 100, 0);
        grayscale_into(&frame, &mut gray);
        assert_eq!(gray.shape(), (5, 4));
        assert_eq!(gray.data.len(), 20);
        assert!(gray.data.iter().all(|&v| v == 10));
    }

    #[test]
    fn test_bilinear() {
        let image = Image {
            data: vec![0, 10, 20, 30],
            width: 2,
            height: 2,
        };
        assert_eq!(bilinear(&image, Vector2d::new(0., 0.)), 0.);
        assert_eq!(bilinear(&image, Vector2d::new(1., 1.)), 30.);
        assert!((bilinear(&image, Vector2d::new(0.5, 0.5)) - 15.).abs() < 1e-12);
        assert!((bilinear(&image, Vector2d::new(0.5, 0.)) - 5.).abs() < 1e-12);
        // clamped
        assert_eq!(bilinear(&image, Vector2d::new(-3., 5.)), 20.);
    }

    #[test]
    fn test_sub_image_clips() {
        let mut image = Image::filled(4, 4, 0);
        let patch = Image::filled(3, 3, 9);
        image.set_sub_image_i32(2, -1, &patch);
        assert_eq!(image.value(2, 0), 9);
        assert_eq!(image.value(3, 1), 9);
        assert_eq!(image.value(1, 0), 0);
        assert_eq!(image.value(2, 2), 0);
    }
}
