//! Per-slot seed table.
//!
//! Every particle slot gets one stable random scalar in `[0, 1)` at setup.
//! All per-particle variation (placement, colour, drift direction, flicker
//! period, size class) is derived from it.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::error::FieldError;

/// Immutable table of per-particle seeds.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedTable {
    seeds: Vec<f32>,
}

impl SeedTable {
    /// Generate `count` seeds from a fixed RNG seed.
    ///
    /// The same `(count, rng_seed)` pair always yields the same table.
    pub fn generate(count: u32, rng_seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(rng_seed);
        let seeds = (0..count).map(|_| rng.gen::<f32>()).collect();
        Self { seeds }
    }

    /// Use an explicit table. Every value must lie in `[0, 1)`.
    pub fn from_values(seeds: Vec<f32>) -> Result<Self, FieldError> {
        if let Some((index, &value)) = seeds
            .iter()
            .enumerate()
            .find(|(_, v)| !(0.0..1.0).contains(*v))
        {
            return Err(FieldError::SeedOutOfRange { index, value });
        }
        Ok(Self { seeds })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.seeds.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.seeds.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<f32> {
        self.seeds.get(index).copied()
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.seeds
    }
}
