use anyhow::Result;

use crate::image::Image;
use crate::pyramid::Pyramid;

#[derive(Debug)]
pub struct PyramidFrame {
    /// original image
    pub image: Image,
    /// downsized images
    pub pyramid: Pyramid,
}

impl PyramidFrame {
    pub fn empty() -> Self {
        Self {
            image: Image::empty(),
            pyramid: Pyramid::empty(),
        }
    }

    /// Copy `image` into this frame and rebuild the pyramid, reusing the
    /// existing buffers.
    pub fn update(&mut self, image: &Image, lk_levels: usize) -> Result<()> {
        self.image.data.clear();
        self.image.data.extend_from_slice(&image.data);
        self.image.width = image.width;
        self.image.height = image.height;
        self.pyramid.compute(&self.image, lk_levels)
    }

    pub fn get_image_at_level(&self, level: usize) -> &Image {
        if level == 0 {
            &self.image
        } else {
            &self.pyramid.levels[level - 1]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels() {
        let mut frame = PyramidFrame::empty();
        frame.update(&Image::filled(40, 20, 7), 2).unwrap();
        assert_eq!(frame.get_image_at_level(0).shape(), (40, 20));
        assert_eq!(frame.get_image_at_level(1).shape(), (20, 10));
        assert_eq!(frame.get_image_at_level(2).shape(), (10, 5));
    }
}
