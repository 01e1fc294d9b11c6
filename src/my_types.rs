use nalgebra as na;

/// Pixel coordinates, x to the right and y down. (0, 0) is the center of the
/// top-left pixel.
pub type Vector2d = na::Vector2<f64>;
pub type Matrix2d = na::Matrix2<f64>;

pub type Matrixd = na::DMatrix<f64>;

pub type Point2d = Vector2d;

/// (width, height)
pub type ImageShape = (usize, usize);
