use crate::my_types::*;

/// Sum of absolute coordinate differences.
pub fn manhattan(p0: &Point2d, p1: &Point2d) -> f64 {
    (p1.x - p0.x).abs() + (p1.y - p0.y).abs()
}

/// Round a sub-pixel position to the nearest pixel.
pub fn to_pixel(p: &Point2d) -> (i64, i64) {
    (p.x.round() as i64, p.y.round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manhattan() {
        let p0 = Point2d::new(1., 1.);
        assert_eq!(manhattan(&p0, &p0), 0.);
        assert_eq!(manhattan(&p0, &Point2d::new(2., 2.)), 2.);
        assert_eq!(manhattan(&p0, &Point2d::new(-2., 5.)), 7.);
        assert_eq!(manhattan(&Point2d::new(-2., 5.), &p0), 7.);
    }

    #[test]
    fn test_to_pixel() {
        assert_eq!(to_pixel(&Point2d::new(1.4, 2.6)), (1, 3));
        assert_eq!(to_pixel(&Point2d::new(-0.6, 0.)), (-1, 0));
    }
}
