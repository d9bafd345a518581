//! The fixed colour palette particles draw from.
//!
//! The palette is generated once from weighted bands. Each band is a base
//! colour plus a saturation/value [`ColorRange`] and a hue variance, and
//! contributes `count` entries. The result is an immutable, indexed sequence
//! shared by the CPU generator and uploaded verbatim to the GPU.
//!
//! ```ignore
//! let palette = Palette::generate(&PaletteBand::defaults(), Palette::DEFAULT_ACCENT, 7)?;
//! assert_eq!(palette.len(), 100);
//! ```

use std::sync::Arc;

use glam::Vec3;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::FieldError;

const PALETTE_SALT: u64 = 0x9E37_79B9_7F4A_7C15;

/// Saturation and value intervals a band samples from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorRange {
    pub saturation: (f32, f32),
    pub value: (f32, f32),
}

impl ColorRange {
    /// Light, washed-out colours.
    pub const SOFT: ColorRange = ColorRange {
        saturation: (0.2, 0.3),
        value: (0.6, 0.9),
    };

    /// Muted mid-tones.
    pub const NEUTRAL: ColorRange = ColorRange {
        saturation: (0.25, 0.35),
        value: (0.3, 0.7),
    };
}

/// Named range presets usable from configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangePreset {
    Soft,
    Neutral,
}

impl RangePreset {
    pub fn range(self) -> ColorRange {
        match self {
            RangePreset::Soft => ColorRange::SOFT,
            RangePreset::Neutral => ColorRange::NEUTRAL,
        }
    }
}

/// One weighted band of the palette.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaletteBand {
    /// Base colour, sRGB components in `[0, 1]`. Only its hue is kept.
    pub base: [f32; 3],
    pub range: RangePreset,
    /// Number of palette entries this band contributes.
    pub count: u32,
    /// Maximum hue deviation from the base, in turns.
    pub variance: f32,
}

impl PaletteBand {
    /// 25 soft siennas followed by 75 neutral tans.
    pub fn defaults() -> Vec<PaletteBand> {
        vec![
            PaletteBand {
                base: srgb8(160, 82, 45),
                range: RangePreset::Soft,
                count: 25,
                variance: 0.05,
            },
            PaletteBand {
                base: srgb8(210, 180, 140),
                range: RangePreset::Neutral,
                count: 75,
                variance: 0.03,
            },
        ]
    }

    /// Finite base colour and a finite, non-negative hue variance.
    pub fn is_valid(&self) -> bool {
        self.base.iter().all(|c| c.is_finite())
            && self.variance.is_finite()
            && self.variance >= 0.0
    }
}

/// Immutable palette of linear-space colours plus the accent colour.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    colors: Arc<[Vec3]>,
    accent: Vec3,
}

impl Palette {
    /// `#D7D5D1`, in sRGB.
    pub const DEFAULT_ACCENT: [f32; 3] = [215.0 / 255.0, 213.0 / 255.0, 209.0 / 255.0];

    /// Build the palette. Deterministic for a given `seed`.
    pub fn generate(bands: &[PaletteBand], accent: [f32; 3], seed: u64) -> Result<Self, FieldError> {
        let total: usize = bands.iter().map(|b| b.count as usize).sum();
        if total == 0 {
            return Err(FieldError::EmptyPalette);
        }
        if let Some(index) = bands.iter().position(|band| !band.is_valid()) {
            return Err(FieldError::InvalidPaletteBand { index });
        }

        let mut rng = SmallRng::seed_from_u64(seed ^ PALETTE_SALT);
        let mut colors = Vec::with_capacity(total);
        for band in bands {
            let base_hue = rgb_to_hsv(Vec3::from(band.base)).x;
            let range = band.range.range();
            for _ in 0..band.count {
                let hue_offset = if band.variance > 0.0 {
                    rng.gen_range(-band.variance..=band.variance)
                } else {
                    0.0
                };
                let hue = (base_hue + hue_offset).rem_euclid(1.0);
                let s = sample(&mut rng, range.saturation);
                let v = sample(&mut rng, range.value);
                colors.push(srgb_to_linear(hsv_to_rgb(hue, s, v)));
            }
        }

        tracing::debug!(colors = total, bands = bands.len(), "generated palette");

        Ok(Self {
            colors: colors.into(),
            accent: srgb_to_linear(Vec3::from(accent)),
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    #[inline]
    pub fn colors(&self) -> &[Vec3] {
        &self.colors
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<Vec3> {
        self.colors.get(index).copied()
    }

    /// The accent colour (linear).
    #[inline]
    pub fn accent(&self) -> Vec3 {
        self.accent
    }

    /// Map a unit hash to a palette slot: `floor(h * len)`, clamped to the last slot.
    #[inline]
    pub fn index_for(&self, unit: f32) -> usize {
        ((unit * self.len() as f32).floor().max(0.0) as usize).min(self.len() - 1)
    }

    /// Colours padded to `vec4<f32>` for a storage buffer.
    pub fn to_gpu(&self) -> Vec<[f32; 4]> {
        self.colors.iter().map(|c| [c.x, c.y, c.z, 1.0]).collect()
    }
}

fn sample(rng: &mut SmallRng, (min, max): (f32, f32)) -> f32 {
    if max > min {
        rng.gen_range(min..max)
    } else {
        min
    }
}

fn srgb8(r: u8, g: u8, b: u8) -> [f32; 3] {
    [r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0]
}

/// sRGB to linear, per component.
pub fn srgb_to_linear(c: Vec3) -> Vec3 {
    let f = |x: f32| {
        if x <= 0.04045 {
            x / 12.92
        } else {
            ((x + 0.055) / 1.055).powf(2.4)
        }
    };
    Vec3::new(f(c.x), f(c.y), f(c.z))
}

/// HSV to RGB. All components in `[0, 1]`.
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Vec3 {
    let c = v * s;
    let hp = h.rem_euclid(1.0) * 6.0;
    let x = c * (1.0 - (hp % 2.0 - 1.0).abs());
    let m = v - c;

    let rgb = if hp < 1.0 {
        Vec3::new(c, x, 0.0)
    } else if hp < 2.0 {
        Vec3::new(x, c, 0.0)
    } else if hp < 3.0 {
        Vec3::new(0.0, c, x)
    } else if hp < 4.0 {
        Vec3::new(0.0, x, c)
    } else if hp < 5.0 {
        Vec3::new(x, 0.0, c)
    } else {
        Vec3::new(c, 0.0, x)
    };

    rgb + Vec3::splat(m)
}

/// RGB to HSV. All components in `[0, 1]`.
pub fn rgb_to_hsv(rgb: Vec3) -> Vec3 {
    let cmax = rgb.max_element();
    let cmin = rgb.min_element();
    let delta = cmax - cmin;

    let mut h = 0.0;
    if delta > 0.0001 {
        h = if cmax == rgb.x {
            ((rgb.y - rgb.z) / delta) % 6.0
        } else if cmax == rgb.y {
            (rgb.z - rgb.x) / delta + 2.0
        } else {
            (rgb.x - rgb.y) / delta + 4.0
        };
        h /= 6.0;
        if h < 0.0 {
            h += 1.0;
        }
    }

    let s = if cmax > 0.0001 { delta / cmax } else { 0.0 };
    Vec3::new(h, s, cmax)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_palette(seed: u64) -> Palette {
        Palette::generate(&PaletteBand::defaults(), Palette::DEFAULT_ACCENT, seed).unwrap()
    }

    #[test]
    fn test_rejects_invalid_band() {
        let mut bands = PaletteBand::defaults();
        bands[1].variance = f32::INFINITY;
        assert_eq!(
            Palette::generate(&bands, Palette::DEFAULT_ACCENT, 1),
            Err(FieldError::InvalidPaletteBand { index: 1 })
        );

        let mut bands = PaletteBand::defaults();
        bands[0].variance = -0.01;
        assert!(Palette::generate(&bands, Palette::DEFAULT_ACCENT, 1).is_err());

        let mut bands = PaletteBand::defaults();
        bands[0].base[0] = f32::NAN;
        assert_eq!(
            Palette::generate(&bands, Palette::DEFAULT_ACCENT, 1),
            Err(FieldError::InvalidPaletteBand { index: 0 })
        );
    }

    #[test]
    fn test_default_palette_size() {
        let palette = default_palette(1);
        assert_eq!(palette.len(), 100);
        assert!(!palette.is_empty());
        assert_eq!(palette.to_gpu().len(), 100);
    }

    #[test]
    fn test_palette_deterministic() {
        assert_eq!(default_palette(42), default_palette(42));
        assert_ne!(default_palette(42).colors(), default_palette(43).colors());
    }

    #[test]
    fn test_palette_colors_in_unit_range() {
        for c in default_palette(9).colors() {
            assert!(c.min_element() >= 0.0 && c.max_element() <= 1.0, "{:?}", c);
        }
    }

    #[test]
    fn test_neutral_band_is_darker_on_average() {
        let palette = default_palette(5);
        let (soft, neutral) = palette.colors().split_at(25);
        let avg = |cs: &[Vec3]| cs.iter().map(|c| c.max_element()).sum::<f32>() / cs.len() as f32;
        assert!(avg(neutral) < avg(soft));
    }

    #[test]
    fn test_empty_palette_rejected() {
        let result = Palette::generate(&[], Palette::DEFAULT_ACCENT, 0);
        assert!(matches!(result, Err(FieldError::EmptyPalette)));
    }

    #[test]
    fn test_index_for_clamps() {
        let palette = default_palette(0);
        assert_eq!(palette.index_for(0.0), 0);
        assert_eq!(palette.index_for(0.999_999_9), 99);
        assert_eq!(palette.index_for(1.0), 99);
        assert_eq!(palette.index_for(0.505), 50);
    }

    #[test]
    fn test_hsv_round_trip_of_sienna() {
        let sienna = Vec3::from(srgb8(160, 82, 45));
        let hsv = rgb_to_hsv(sienna);
        let back = hsv_to_rgb(hsv.x, hsv.y, hsv.z);
        assert!((back - sienna).abs().max_element() < 1e-4);
    }

    #[test]
    fn test_accent_is_linearized() {
        let palette = default_palette(0);
        let accent = palette.accent();
        assert!(accent.x < Palette::DEFAULT_ACCENT[0]);
        assert!((accent.x - 0.6795).abs() < 1e-3);
    }
}
