use std::path::Path;
use std::sync::OnceLock;

use anyhow::{bail, Context as AnyhowContext, Result};
use serde::{Deserialize, Serialize};

use crate::adapter::DetectionParams;

pub static CONFIG: OnceLock<Config> = OnceLock::new();

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, clap::Parser)]
#[serde(default)]
pub struct Config {
    #[clap(long, default_value = "0")]
    pub seed: u64,

    /// Seed new tracks when at most this many are alive
    #[clap(long, default_value = "10")]
    pub low_water_mark: usize,

    #[clap(long, default_value = "500")]
    pub max_corners: usize,

    #[clap(long, default_value = "0.01")]
    pub quality_level: f64,

    #[clap(long, default_value = "10.0")]
    pub min_distance: f64,

    /// Tracks must move strictly more than this (manhattan, pixels) per frame
    #[clap(long, default_value = "2.0")]
    pub min_displacement: f64,

    /// Drop tracks the flow could not match
    #[clap(long, default_value = "true", parse(try_from_str))]
    pub require_status: bool,

    #[clap(long, default_value = "3")]
    pub lk_levels: usize,

    #[clap(long, default_value = "30")]
    pub lk_iters: usize,

    #[clap(long, default_value = "21")]
    pub lk_win_size: usize,

    #[clap(long, default_value = "0.01")]
    pub lk_term: f64,

    #[clap(long, default_value = "0.0001")]
    pub lk_min_eig: f64,

    /// Frame count of the synthetic video used when no input is given
    #[clap(long, default_value = "120")]
    pub synthetic_frames: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            seed: 0,
            low_water_mark: 10,
            max_corners: 500,
            quality_level: 0.01,
            min_distance: 10.,
            min_displacement: 2.,
            require_status: true,
            lk_levels: 3,
            lk_iters: 30,
            lk_win_size: 21,
            lk_term: 0.01,
            lk_min_eig: 1e-4,
            synthetic_frames: 120,
        }
    }
}

impl Config {
    pub fn from_json_file(path: &Path) -> Result<Config> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = serde_json::from_str(&text)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.quality_level > 0. && self.quality_level < 1.) {
            bail!("quality_level must be in (0, 1), got {}", self.quality_level);
        }
        if self.min_distance < 0. {
            bail!("min_distance must not be negative, got {}", self.min_distance);
        }
        if self.lk_win_size < 3 || self.lk_win_size % 2 == 0 {
            bail!("lk_win_size must be odd and at least 3, got {}", self.lk_win_size);
        }
        if self.lk_iters == 0 {
            bail!("lk_iters must be positive");
        }
        Ok(())
    }

    pub fn detection_params(&self) -> DetectionParams {
        DetectionParams {
            max_count: self.max_corners,
            quality_level: self.quality_level,
            min_distance: self.min_distance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_flag_defaults_match_default() {
        let config = Config::parse_from(["lk-track-rust"]);
        assert_eq!(config, Config::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let config: Config = serde_json::from_str(r#"{"min_displacement": 4.5}"#).unwrap();
        assert_eq!(config.min_displacement, 4.5);
        assert_eq!(config.low_water_mark, 10);
        assert_eq!(config.detection_params(), DetectionParams::default());
    }

    #[test]
    fn test_validate() {
        let mut config = Config::default();
        config.quality_level = 1.;
        assert!(config.validate().is_err());
        let mut config = Config::default();
        config.lk_win_size = 8;
        assert!(config.validate().is_err());
        let mut config = Config::default();
        config.min_distance = -1.;
        assert!(config.validate().is_err());
    }
}
