//! Particle records: the CPU view and the GPU storage layout.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::placement::PlacementPolicy;

/// One particle slot.
///
/// `seed`, `initial_position`, `color` and `placement` are written once by
/// the generator. `final_position` drifts every frame and `current_position`
/// is the interpolated, displayed position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub seed: f32,
    pub placement: PlacementPolicy,
    pub initial_position: Vec3,
    pub final_position: Vec3,
    pub current_position: Vec3,
    pub color: Vec3,
}

/// GPU-compatible particle layout (64 bytes, vec3 fields 16-byte aligned).
///
/// The trailing scalar of each row fills the vec3 padding slot.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ParticleGpu {
    pub initial_position: [f32; 3],
    pub seed: f32,
    pub final_position: [f32; 3],
    pub placement: u32,
    pub current_position: [f32; 3],
    pub _pad0: f32,
    pub color: [f32; 3],
    pub _pad1: f32,
}

impl ParticleGpu {
    /// Matching WGSL struct definition.
    pub const WGSL_STRUCT: &'static str = r#"struct Particle {
    initial_position: vec3<f32>,
    seed: f32,
    final_position: vec3<f32>,
    placement: u32,
    current_position: vec3<f32>,
    _pad0: f32,
    color: vec3<f32>,
    _pad1: f32,
}
"#;

    pub const SEED_OFFSET: u32 = 12;
    pub const CURRENT_POSITION_OFFSET: u32 = 32;
    pub const COLOR_OFFSET: u32 = 48;

    /// A slot with only its seed filled in, ready for the generator pass.
    pub fn seeded(seed: f32) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }
}

impl From<&Particle> for ParticleGpu {
    fn from(p: &Particle) -> Self {
        Self {
            initial_position: p.initial_position.to_array(),
            seed: p.seed,
            final_position: p.final_position.to_array(),
            placement: p.placement.to_u32(),
            current_position: p.current_position.to_array(),
            _pad0: 0.0,
            color: p.color.to_array(),
            _pad1: 0.0,
        }
    }
}

impl Particle {
    /// Read a slot back from its GPU form. `None` for an unknown placement tag.
    pub fn from_gpu(gpu: &ParticleGpu) -> Option<Self> {
        Some(Self {
            seed: gpu.seed,
            placement: PlacementPolicy::from_u32(gpu.placement)?,
            initial_position: Vec3::from(gpu.initial_position),
            final_position: Vec3::from(gpu.final_position),
            current_position: Vec3::from(gpu.current_position),
            color: Vec3::from(gpu.color),
        })
    }
}

/// A fully populated field: one [`Particle`] per slot.
///
/// Only the generator creates a field, so it is never partially populated.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleField {
    particles: Vec<Particle>,
}

impl ParticleField {
    pub(crate) fn from_particles(particles: Vec<Particle>) -> Self {
        Self { particles }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    #[inline]
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Particle> {
        self.particles.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter()
    }

    pub(crate) fn particles_mut(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    /// Pack the field for a storage buffer upload.
    pub fn to_gpu(&self) -> Vec<ParticleGpu> {
        self.particles.iter().map(ParticleGpu::from).collect()
    }
}
