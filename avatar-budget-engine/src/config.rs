//! Engine configuration

use avatar_budget_algorithms::{BoneAnalysisOptions, MetricsOptions, PlatformLimits};
use avatar_budget_core::{Error, Result};
use avatar_budget_io::ConfigOverrides;
use avatar_budget_simplification::DEFAULT_MIN_RATIO;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Smallest texture ceiling accepted by [`OptimizeConfig::validate`]
pub const MIN_TEXTURE_SIZE: u32 = 128;

/// Largest texture ceiling accepted by [`OptimizeConfig::validate`]
pub const MAX_TEXTURE_SIZE: u32 = 4096;

/// Settings for a full optimization pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OptimizeConfig {
    /// Triangle total to decimate down to
    pub target_triangles: usize,
    /// Emit only triangles from decimation
    pub preserve_uvs: bool,
    /// Longest allowed texture side in pixels
    pub max_texture_size: u32,
    /// Lowest keep ratio decimation may use
    pub min_ratio: f32,
    pub remove_unused_bones: bool,
    pub decimate: bool,
    pub resize_textures: bool,
    pub bone_options: BoneAnalysisOptions,
    pub metrics: MetricsOptions,
    pub limits: PlatformLimits,
}

impl Default for OptimizeConfig {
    fn default() -> Self {
        Self {
            target_triangles: 70_000,
            preserve_uvs: true,
            max_texture_size: 2048,
            min_ratio: DEFAULT_MIN_RATIO,
            remove_unused_bones: true,
            decimate: true,
            resize_textures: true,
            bone_options: BoneAnalysisOptions::default(),
            metrics: MetricsOptions::default(),
            limits: PlatformLimits::default(),
        }
    }
}

impl OptimizeConfig {
    /// Defaults aimed at standalone headsets
    pub fn quest() -> Self {
        let limits = PlatformLimits::quest();
        Self {
            target_triangles: limits.triangles.good as usize,
            max_texture_size: 1024,
            limits,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.target_triangles == 0 {
            return Err(Error::InvalidConfig(
                "target triangle count must be positive".to_string(),
            ));
        }
        if !(MIN_TEXTURE_SIZE..=MAX_TEXTURE_SIZE).contains(&self.max_texture_size) {
            return Err(Error::InvalidConfig(format!(
                "max texture size {} outside {}..={}",
                self.max_texture_size, MIN_TEXTURE_SIZE, MAX_TEXTURE_SIZE
            )));
        }
        if !(DEFAULT_MIN_RATIO..=1.0).contains(&self.min_ratio) {
            return Err(Error::InvalidConfig(format!(
                "minimum ratio {} outside {}..=1.0",
                self.min_ratio, DEFAULT_MIN_RATIO
            )));
        }
        Ok(())
    }

    /// Copy of this config with every present override applied
    pub fn with_overrides(&self, overrides: &ConfigOverrides) -> Self {
        let mut config = self.clone();
        if let Some(target) = overrides.target_triangles {
            config.target_triangles = target;
        }
        if let Some(size) = overrides.max_texture_size {
            config.max_texture_size = size;
        }
        if let Some(preserve) = overrides.preserve_uvs {
            config.preserve_uvs = preserve;
        }
        if let Some(remove) = overrides.remove_unused_bones {
            config.remove_unused_bones = remove;
        }
        if let Some(decimate) = overrides.decimate {
            config.decimate = decimate;
        }
        if let Some(resize) = overrides.resize_textures {
            config.resize_textures = resize;
        }
        config
    }

    /// Read a JSON config. Missing keys take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| Error::InvalidConfig(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }
}

/// Settings for [`crate::BridgeWatcher`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchConfig {
    /// Time between polls of the bridge file
    pub interval: Duration,
    /// Apply the selection whenever a new document arrives
    pub auto_apply: bool,
    /// Delete marked objects after applying
    pub auto_delete: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            auto_apply: true,
            auto_delete: false,
        }
    }
}
