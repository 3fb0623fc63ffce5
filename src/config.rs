use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    common::{BYTES_PER_2BPP_TILE, MAX_NUM_TILES},
    persist::{load_json, save_json},
    raster::MonoQuantizer,
};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct DecoderConfig {
    pub max_tiles: usize,
    // Luminance lower bounds for white, light and dark hues.
    pub hue_thresholds: [u8; 3],
}

impl Default for DecoderConfig {
    fn default() -> Self {
        DecoderConfig {
            max_tiles: MAX_NUM_TILES,
            hue_thresholds: MonoQuantizer::DEFAULT_THRESHOLDS,
        }
    }
}

pub fn get_default_config_path() -> Result<PathBuf> {
    let project_dirs = directories::ProjectDirs::from("", "", "gb_tile_decoder")
        .context("Unable to open config directory.")?;
    Ok(project_dirs.config_dir().join("config.json"))
}

impl DecoderConfig {
    pub fn quantizer(&self) -> MonoQuantizer {
        MonoQuantizer::new(self.hue_thresholds)
    }

    /// Largest decompressed size that still fits `max_tiles`.
    pub fn capacity_bytes(&self) -> usize {
        self.max_tiles.saturating_mul(BYTES_PER_2BPP_TILE)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.max_tiles <= usize::MAX / BYTES_PER_2BPP_TILE,
            "max_tiles too large: {}",
            self.max_tiles
        );
        let [white, light, dark] = self.hue_thresholds;
        ensure!(
            white > light && light > dark,
            "hue thresholds must be strictly descending: {:?}",
            self.hue_thresholds
        );
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let config: DecoderConfig =
            load_json(path).with_context(|| format!("invalid config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` if given, else the per-user config file if one exists.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match get_default_config_path() {
            Ok(default_path) => Self::load_if_exists(&default_path),
            Err(err) => {
                warn!("{:#}, using defaults", err);
                Ok(Self::default())
            }
        }
    }

    fn load_if_exists(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            info!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        save_json(path, self)
    }
}
