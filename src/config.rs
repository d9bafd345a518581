//! Engine configuration.
//!
//! All constants the engine needs are supplied at initialization: particle
//! count, spacing, depth range, palette definition, placement thresholds,
//! drift amplitudes, shading bands and per-stage tween timings. Every
//! section has defaults, so a configuration file only lists what it changes:
//!
//! ```toml
//! [field]
//! particle_count = 4096
//! seed = 7
//!
//! [stages.enter]
//! target = 1.0
//! duration = 3.0
//! delay = 0.2
//! easing = "ease_in_out_cubic"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::animator::DriftConfig;
use crate::error::ConfigError;
use crate::palette::{Palette, PaletteBand};
use crate::placement::PlacementThresholds;
use crate::shading::ShadingConfig;
use crate::stage::StageTimings;

/// Shape of the generated particle field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    /// Number of particle slots, fixed for the renderer's lifetime.
    pub particle_count: u32,
    /// Horizontal distance between consecutive slots along the wave.
    pub spacing: f32,
    /// Extent of the depth axis; positions span `[-depth_range / 2, depth_range / 2]`.
    pub depth_range: f32,
    /// RNG seed for the seed table and the palette.
    pub seed: u64,
    /// Particles with `seed > accent_threshold` get the accent colour.
    pub accent_threshold: f32,
    /// Accent colour, sRGB.
    pub accent: [f32; 3],
    pub palette: Vec<PaletteBand>,
    pub placement: PlacementThresholds,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            particle_count: 56 * 56,
            spacing: 0.01,
            depth_range: 12.0,
            seed: 0x5EED,
            accent_threshold: 0.99,
            accent: Palette::DEFAULT_ACCENT,
            palette: PaletteBand::defaults(),
            placement: PlacementThresholds::default(),
        }
    }
}

impl FieldConfig {
    /// Length of the wave along the horizontal axis.
    #[inline]
    pub fn wave_length(&self) -> f32 {
        self.particle_count as f32 * self.spacing
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub field: FieldConfig,
    pub drift: DriftConfig,
    pub shading: ShadingConfig,
    pub stages: StageTimings,
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Set the particle count.
    pub fn with_particle_count(mut self, count: u32) -> Self {
        self.field.particle_count = count;
        self
    }

    /// Set the RNG seed for the seed table and palette.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.field.seed = seed;
        self
    }

    /// Reject values the generator or the driver cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let field = &self.field;
        if field.particle_count == 0 {
            return Err(ConfigError::Invalid("particle_count must be at least 1".into()));
        }
        if !(field.spacing > 0.0 && field.spacing.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "spacing must be positive, got {}",
                field.spacing
            )));
        }
        if !(field.depth_range > 0.0 && field.depth_range.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "depth_range must be positive, got {}",
                field.depth_range
            )));
        }
        if field.palette.iter().all(|band| band.count == 0) {
            return Err(ConfigError::Invalid("palette has no colours".into()));
        }
        if let Some(index) = field.palette.iter().position(|band| !band.is_valid()) {
            return Err(ConfigError::Invalid(format!(
                "field.palette[{}] needs a finite base colour and a finite, non-negative variance",
                index
            )));
        }
        for (name, spec) in [("enter", &self.stages.enter), ("restart", &self.stages.restart)] {
            let finite = spec.duration.is_finite() && spec.delay.is_finite();
            if !(finite && spec.duration >= 0.0 && spec.delay >= 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "stages.{} duration and delay must be finite and non-negative",
                    name
                )));
            }
            if !(0.0..=1.0).contains(&spec.target) {
                return Err(ConfigError::Invalid(format!(
                    "stages.{} target must lie in [0, 1], got {}",
                    name, spec.target
                )));
            }
        }
        let (lo, hi) = self.shading.flicker_period;
        if !(lo > 0.0 && hi >= lo) {
            return Err(ConfigError::Invalid(format!(
                "shading.flicker_period must be positive and ordered, got ({}, {})",
                lo, hi
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tween::Easing;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.field.particle_count, 3136);
        assert!((config.field.wave_length() - 31.36).abs() < 1e-4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            [field]
            particle_count = 64
            seed = 7

            [stages.restart]
            target = 0.0
            duration = 0.5
            easing = "linear"
            "#,
        )
        .unwrap();
        assert_eq!(config.field.particle_count, 64);
        assert_eq!(config.field.seed, 7);
        assert_eq!(config.field.spacing, 0.01);
        assert_eq!(config.stages.restart.duration, 0.5);
        assert_eq!(config.stages.restart.easing, Easing::Linear);
        assert_eq!(config.stages.restart.delay, 0.0);
        assert_eq!(config.stages.enter, StageTimings::default().enter);
    }

    #[test]
    fn test_rejects_invalid_values() {
        let zero = EngineConfig::default().with_particle_count(0);
        assert!(matches!(zero.validate(), Err(ConfigError::Invalid(_))));

        let mut negative = EngineConfig::default();
        negative.stages.enter.duration = -1.0;
        assert!(negative.validate().is_err());

        let mut spacing = EngineConfig::default();
        spacing.field.spacing = 0.0;
        assert!(spacing.validate().is_err());
    }

    #[test]
    fn test_rejects_non_finite_palette_variance() {
        let config = EngineConfig::from_toml_str(
            r#"
            [[field.palette]]
            base = [0.6, 0.3, 0.2]
            range = "soft"
            count = 10
            variance = inf
            "#,
        );
        assert!(matches!(config, Err(ConfigError::Invalid(_))));

        let mut negative = EngineConfig::default();
        negative.field.palette[0].variance = -0.1;
        assert!(negative.validate().is_err());

        let mut nan_base = EngineConfig::default();
        nan_base.field.palette[1].base[2] = f32::NAN;
        assert!(nan_base.validate().is_err());
    }

    #[test]
    fn test_rejects_non_finite_timings() {
        let mut config = EngineConfig::default();
        config.stages.enter.duration = f32::INFINITY;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.stages.restart.delay = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_error() {
        let result = EngineConfig::from_toml_str("[field]\nparticle_count = \"many\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = EngineConfig::load("/definitely/not/here.toml");
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
