//! Per-frame animator.
//!
//! Every frame, each particle's final position drifts by a small
//! noise-driven velocity, and the displayed position is re-interpolated
//! between the scattered initial position and the drifting final position:
//!
//! ```text
//! t        = time * time_scale
//! s        = 2 * seed - 1
//! velocity = (noise1(t) * s * horizontal,
//!             sin(s + t) * vertical,
//!             noise3(final + depth_noise_offset) * depth)
//! final   += velocity                       // cumulative, never reset
//! current  = mix(initial, final, enter_progress)
//! ```
//!
//! The drift is applied once per frame, not scaled by frame time.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::generator::WORKGROUP_SIZE;
use crate::particle::{ParticleField, ParticleGpu};
use crate::shader_utils::{all_utils_wgsl, mix_vec3, noise1, noise3, wgsl_f32};
use crate::uniforms::FrameUniforms;

/// Per-frame drift amplitudes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftConfig {
    /// Multiplier applied to the clock before sampling noise.
    pub time_scale: f32,
    pub horizontal: f32,
    pub vertical: f32,
    pub depth: f32,
    /// Offset added to the final position before the depth noise lookup.
    pub depth_noise_offset: f32,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            time_scale: 0.3,
            horizontal: 0.01,
            vertical: 0.006,
            depth: 0.01,
            depth_noise_offset: 1.0,
        }
    }
}

/// Drift to add to a final position this frame.
pub fn drift_velocity(config: &DriftConfig, seed: f32, final_position: Vec3, time: f32) -> Vec3 {
    let t = time * config.time_scale;
    let s = seed * 2.0 - 1.0;
    Vec3::new(
        noise1(t) * s * config.horizontal,
        (s + t).sin() * config.vertical,
        noise3(final_position + Vec3::splat(config.depth_noise_offset)) * config.depth,
    )
}

/// Displayed position for a given enter progress (clamped to `[0, 1]`).
#[inline]
pub fn interpolate(initial: Vec3, final_position: Vec3, enter_progress: f32) -> Vec3 {
    mix_vec3(initial, final_position, enter_progress.clamp(0.0, 1.0))
}

/// Advance one slot.
///
/// The signature is the contract: seed and initial position are read-only,
/// only the final and current positions are written.
pub fn animate_slot(
    config: &DriftConfig,
    seed: f32,
    initial: Vec3,
    final_position: &mut Vec3,
    current_position: &mut Vec3,
    time: f32,
    enter_progress: f32,
) {
    *final_position += drift_velocity(config, seed, *final_position, time);
    *current_position = interpolate(initial, *final_position, enter_progress);
}

impl ParticleField {
    /// Run the animator over every slot.
    pub fn animate(&mut self, config: &DriftConfig, time: f32, enter_progress: f32) {
        for p in self.particles_mut() {
            animate_slot(
                config,
                p.seed,
                p.initial_position,
                &mut p.final_position,
                &mut p.current_position,
                time,
                enter_progress,
            );
        }
    }

    /// Recompute displayed positions without drifting.
    pub fn settle(&mut self, enter_progress: f32) {
        for p in self.particles_mut() {
            p.current_position = interpolate(p.initial_position, p.final_position, enter_progress);
        }
    }
}

/// WGSL for the per-frame pass (entry point `update`).
///
/// Bindings: `0` particles (read-write), `1` frame uniforms.
pub fn animator_wgsl(config: &DriftConfig) -> String {
    format!(
        r#"{particle_struct}
{uniforms_struct}
@group(0) @binding(0)
var<storage, read_write> particles: array<Particle>;

@group(0) @binding(1)
var<uniform> uniforms: Uniforms;

{utils}
const TIME_SCALE: f32 = {time_scale};
const DRIFT_X: f32 = {horizontal};
const DRIFT_Y: f32 = {vertical};
const DRIFT_Z: f32 = {depth};
const DEPTH_NOISE_OFFSET: f32 = {offset};

@compute @workgroup_size({workgroup})
fn update(@builtin(global_invocation_id) global_id: vec3<u32>) {{
    let index = global_id.x;
    if index >= arrayLength(&particles) {{
        return;
    }}

    let seed = particles[index].seed;
    let s = seed * 2.0 - 1.0;
    let t = uniforms.time * TIME_SCALE;

    let final_position = particles[index].final_position;
    let velocity = vec3<f32>(
        noise1(t) * s * DRIFT_X,
        sin(s + t) * DRIFT_Y,
        noise3(final_position + vec3<f32>(DEPTH_NOISE_OFFSET)) * DRIFT_Z
    );
    let drifted = final_position + velocity;
    particles[index].final_position = drifted;

    let progress = clamp(uniforms.enter_progress, 0.0, 1.0);
    particles[index].current_position = mix(particles[index].initial_position, drifted, vec3<f32>(progress));
}}
"#,
        particle_struct = ParticleGpu::WGSL_STRUCT,
        uniforms_struct = FrameUniforms::WGSL_STRUCT,
        utils = all_utils_wgsl(),
        time_scale = wgsl_f32(config.time_scale),
        horizontal = wgsl_f32(config.horizontal),
        vertical = wgsl_f32(config.vertical),
        depth = wgsl_f32(config.depth),
        offset = wgsl_f32(config.depth_noise_offset),
        workgroup = WORKGROUP_SIZE,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FieldConfig;
    use crate::generator::FieldGenerator;
    use crate::palette::{Palette, PaletteBand};
    use crate::spawn::SeedTable;

    fn field(count: u32) -> ParticleField {
        let config = FieldConfig {
            particle_count: count,
            ..FieldConfig::default()
        };
        let palette = Palette::generate(&PaletteBand::defaults(), Palette::DEFAULT_ACCENT, 0).unwrap();
        let seeds = SeedTable::generate(count, 21);
        FieldGenerator::new(&config, &palette).generate(&seeds).unwrap()
    }

    #[test]
    fn test_interpolation_identity() {
        let mut f = field(512);
        let config = DriftConfig::default();
        for frame in 0..10 {
            f.animate(&config, frame as f32 / 60.0, 0.0);
        }
        for p in f.iter() {
            assert_eq!(p.current_position, p.initial_position);
        }
        f.animate(&config, 0.5, 1.0);
        for p in f.iter() {
            assert_eq!(p.current_position, p.final_position);
        }
    }

    #[test]
    fn test_animator_leaves_write_once_fields() {
        let before = field(256);
        let mut after = before.clone();
        for frame in 0..30 {
            after.animate(&DriftConfig::default(), frame as f32 * 0.016, 0.5);
        }
        for (a, b) in before.iter().zip(after.iter()) {
            assert_eq!(a.seed, b.seed);
            assert_eq!(a.initial_position, b.initial_position);
            assert_eq!(a.color, b.color);
            assert_eq!(a.placement, b.placement);
        }
    }

    #[test]
    fn test_drift_is_cumulative() {
        let config = DriftConfig::default();
        let mut final_position = Vec3::new(0.3, 0.2, 0.1);
        let mut current = Vec3::ZERO;
        let start = final_position;
        for frame in 0..600 {
            animate_slot(&config, 0.9, Vec3::ZERO, &mut final_position, &mut current, frame as f32 / 60.0, 1.0);
        }
        assert_ne!(final_position, start);
        // Bounded per frame by the amplitudes
        let max_step = config.horizontal + config.vertical + config.depth;
        assert!((final_position - start).length() <= max_step * 600.0);
    }

    #[test]
    fn test_velocity_bounded_at_extreme_time() {
        let config = DriftConfig::default();
        for time in [0.0, 1e6, 1e9, f32::MAX / 2.0] {
            let v = drift_velocity(&config, 0.7, Vec3::new(5.0, -3.0, 2.0), time);
            assert!(v.x.abs() <= config.horizontal);
            assert!(v.z.abs() <= config.depth);
        }
    }

    #[test]
    fn test_progress_is_clamped() {
        let initial = Vec3::new(1.0, 2.0, 3.0);
        let target = Vec3::new(-1.0, 0.0, 9.0);
        assert_eq!(interpolate(initial, target, -0.5), initial);
        assert_eq!(interpolate(initial, target, 1.5), target);
    }

    #[test]
    fn test_settle_does_not_drift() {
        let mut f = field(64);
        let before = f.clone();
        f.settle(1.0);
        for (a, b) in before.iter().zip(f.iter()) {
            assert_eq!(a.final_position, b.final_position);
            assert_eq!(b.current_position, b.final_position);
        }
    }

    #[test]
    fn test_animator_wgsl_valid() {
        let wgsl = animator_wgsl(&DriftConfig::default());
        assert!(wgsl.contains("fn update"));
        assert!(wgsl.contains("TIME_SCALE: f32 = 0.3"));
        let module = naga::front::wgsl::parse_str(&wgsl).expect("animator WGSL should parse");
        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        );
        validator.validate(&module).expect("animator WGSL should validate");
    }
}
