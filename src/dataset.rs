use anyhow::Result;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::adapter::FrameSource;
use crate::config::Config;
use crate::image::*;
use crate::my_types::*;

const BLOCK: usize = 8;
const SPRITE_SIZE: usize = 32;
const SPRITE_COUNT: usize = 3;

struct Sprite {
    patch: Image,
    position: Vector2d,
    velocity: Vector2d,
}

/// Deterministic test video: a static blocky background with a few textured
/// squares moving at constant speed and bouncing off the borders.
pub struct SyntheticVideo {
    background: Image,
    sprites: Vec<Sprite>,
    remaining: usize,
}

fn random_blocks(
    rng: &mut Xoshiro256PlusPlus,
    width: usize,
    height: usize,
    lo: u8,
    hi: u8,
) -> Image {
    let mut image = Image::filled(width, height, 0);
    for by in (0..height).step_by(BLOCK) {
        for bx in (0..width).step_by(BLOCK) {
            let patch = Image::filled(BLOCK, BLOCK, rng.gen_range(lo..=hi));
            image.set_sub_image_i32(bx as i32, by as i32, &patch);
        }
    }
    image
}

impl SyntheticVideo {
    pub fn new(width: usize, height: usize, frames: usize, seed: u64) -> Self {
        let mut video = Self::static_scene(width, height, frames, seed);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed.wrapping_add(1));
        for _ in 0..SPRITE_COUNT {
            let patch = random_blocks(&mut rng, SPRITE_SIZE, SPRITE_SIZE, 140, 255);
            let max_x = width.saturating_sub(SPRITE_SIZE).max(1) as f64;
            let max_y = height.saturating_sub(SPRITE_SIZE).max(1) as f64;
            let position = Vector2d::new(rng.gen_range(0. ..max_x), rng.gen_range(0. ..max_y));
            let sign = |rng: &mut Xoshiro256PlusPlus| if rng.gen_bool(0.5) { 1. } else { -1. };
            let velocity = Vector2d::new(
                sign(&mut rng) * rng.gen_range(2..=4) as f64,
                sign(&mut rng) * rng.gen_range(2..=4) as f64,
            );
            video.sprites.push(Sprite {
                patch,
                position,
                velocity,
            });
        }
        video
    }

    /// Only the background, nothing moves
    pub fn static_scene(width: usize, height: usize, frames: usize, seed: u64) -> Self {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        SyntheticVideo {
            background: random_blocks(&mut rng, width, height, 20, 110),
            sprites: vec![],
            remaining: frames,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(320, 240, config.synthetic_frames, config.seed)
    }

    pub fn render_gray(&self) -> Image {
        let mut image = self.background.clone();
        for sprite in &self.sprites {
            image.set_sub_image_i32(
                sprite.position.x.round() as i32,
                sprite.position.y.round() as i32,
                &sprite.patch,
            );
        }
        image
    }

    fn step(&mut self) {
        let (width, height) = self.background.shape();
        let limits = [
            width.saturating_sub(SPRITE_SIZE) as f64,
            height.saturating_sub(SPRITE_SIZE) as f64,
        ];
        for sprite in self.sprites.iter_mut() {
            sprite.position += sprite.velocity;
            for i in 0..2 {
                if sprite.position[i] < 0. || sprite.position[i] > limits[i] {
                    sprite.velocity[i] = -sprite.velocity[i];
                    sprite.position[i] = sprite.position[i].clamp(0., limits[i]);
                }
            }
        }
    }
}

impl FrameSource for SyntheticVideo {
    fn next_frame(&mut self) -> Result<Option<ColorFrame>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        let frame = gray_to_color(&self.render_gray());
        self.step();
        Ok(Some(frame))
    }

    fn len_hint(&self) -> Option<u64> {
        Some(self.remaining as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_count_and_shape() {
        let mut video = SyntheticVideo::new(64, 48, 3, 7);
        assert_eq!(video.len_hint(), Some(3));
        let mut count = 0;
        while let Some(frame) = video.next_frame().unwrap() {
            assert_eq!(frame.dim(), (48, 64, 3));
            count += 1;
        }
        assert_eq!(count, 3);
        assert!(video.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_seeded() {
        let a = SyntheticVideo::new(64, 48, 1, 3).render_gray();
        let b = SyntheticVideo::new(64, 48, 1, 3).render_gray();
        let c = SyntheticVideo::new(64, 48, 1, 4).render_gray();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_static_scene_does_not_change() {
        let mut video = SyntheticVideo::static_scene(40, 40, 2, 0);
        let first = video.next_frame().unwrap().unwrap();
        let second = video.next_frame().unwrap().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_sprites_move() {
        let mut video = SyntheticVideo::new(128, 96, 2, 0);
        let first = video.next_frame().unwrap().unwrap();
        let second = video.next_frame().unwrap().unwrap();
        assert_ne!(first, second);
    }
}
