//! Shading functions: bokeh colour, opacity and scale.
//!
//! These are pure functions of a particle's buffer state, its world depth and
//! the clock. [`render_wgsl`] emits the same formulas as the vertex/fragment
//! stage; the [`Shading`] methods are their CPU mirror.
//!
//! - **Colour**: a sharp circle at the base viewing depth, blended towards a
//!   soft circle for particles near or far from the camera.
//! - **Opacity**: `flicker * enter_fade * depth_fade`, clamped to `[0, 1]`.
//! - **Scale**: one of three size classes, times a depth attenuation in
//!   `[0.3, 1.0]`, doubled.

use glam::{Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::particle::ParticleGpu;
use crate::shader_utils::{all_utils_wgsl, hash_unit, mix, modulo, smoothstep, step, wgsl_f32};
use crate::uniforms::FrameUniforms;

/// Shading bands and size classes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadingConfig {
    /// Depths past which particles soften towards the far side.
    pub softness_band: (f32, f32),
    /// Near/far pivot and the depth at which far particles have fully faded.
    pub fade_pivot: f32,
    pub fade_far: f32,
    /// Flicker period for seed 0 and seed 1.
    pub flicker_period: (f32, f32),
    /// Share of the period spent ramping in (and again ramping out).
    pub flicker_ramp: f32,
    /// Lower clamp of the enter fade.
    pub enter_fade_floor: f32,
    pub large_size: f32,
    pub small_size: f32,
    /// Size range interpolated by seed for the mid class.
    pub mid_size: (f32, f32),
    /// `seed >= large_at` is the large class.
    pub large_at: f32,
    /// `seed < small_below` is the small class.
    pub small_below: f32,
    pub attenuation_floor: f32,
    pub attenuation_gain: f32,
    /// Edge length of the sprite quad in world units.
    pub sprite_size: f32,
}

impl Default for ShadingConfig {
    fn default() -> Self {
        Self {
            softness_band: (0.5, 2.5),
            fade_pivot: 1.0,
            fade_far: 7.0,
            flicker_period: (1.0, 8.0),
            flicker_ramp: 0.3,
            enter_fade_floor: 0.4,
            large_size: 3.5,
            small_size: 1.5,
            mid_size: (0.5, 2.0),
            large_at: 0.98,
            small_below: 0.05,
            attenuation_floor: 0.3,
            attenuation_gain: 2.0,
            sprite_size: 0.1,
        }
    }
}

/// Size class selected by seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeClass {
    Large,
    Small,
    Mid,
}

/// CPU evaluation of the shading functions.
#[derive(Debug, Clone, Copy)]
pub struct Shading {
    config: ShadingConfig,
    half_depth: f32,
}

impl Shading {
    pub fn new(config: ShadingConfig, depth_range: f32) -> Self {
        Self {
            config,
            half_depth: depth_range * 0.5,
        }
    }

    pub fn config(&self) -> &ShadingConfig {
        &self.config
    }

    /// 0 for a sharp circle, 1 for a fully soft one.
    pub fn softness(&self, z: f32) -> f32 {
        let (lo, hi) = self.config.softness_band;
        if z < 0.0 {
            1.0 - smoothstep(-self.half_depth, 0.0, z)
        } else if z > lo {
            smoothstep(lo, hi, z)
        } else {
            0.0
        }
    }

    /// Circle alpha at `dist` from the sprite centre (uv space, radius 0.5).
    pub fn circle_mask(&self, dist: f32, softness: f32) -> f32 {
        let sharp = 1.0 - step(0.5, dist);
        let soft = 1.0 - smoothstep(0.0, 0.5, dist);
        mix(sharp, soft, softness)
    }

    /// RGBA for a fragment at `uv` of a particle at world depth `z`.
    pub fn fragment_color(&self, color: Vec3, uv: Vec2, z: f32) -> Vec4 {
        let dist = uv.distance(Vec2::splat(0.5));
        color.extend(self.circle_mask(dist, self.softness(z)))
    }

    /// Periodic on/off envelope, phase-shifted per particle.
    pub fn flicker(&self, seed: f32, time: f32) -> f32 {
        let (lo, hi) = self.config.flicker_period;
        let period = mix(lo, hi, seed);
        let offset = hash_unit(seed.to_bits());
        let t = modulo(time + offset * period, period);
        let ramp = period * self.config.flicker_ramp;
        let ramp_in = smoothstep(0.0, ramp, t);
        let ramp_out = 1.0 - smoothstep(period - ramp, period, t);
        ramp_in * ramp_out
    }

    #[inline]
    pub fn enter_fade(&self, enter_progress: f32) -> f32 {
        enter_progress.clamp(self.config.enter_fade_floor, 1.0)
    }

    /// 1 near the base viewing depth, falling to 0 towards either end.
    pub fn depth_fade(&self, z: f32) -> f32 {
        let pivot = self.config.fade_pivot;
        let faded = if z < pivot {
            1.0 - smoothstep(-self.half_depth, pivot, z)
        } else if z > pivot {
            smoothstep(pivot, self.config.fade_far, z)
        } else {
            0.0
        };
        1.0 - faded
    }

    pub fn opacity(&self, seed: f32, time: f32, enter_progress: f32, z: f32) -> f32 {
        let alpha = self.flicker(seed, time) * self.enter_fade(enter_progress) * self.depth_fade(z);
        alpha.clamp(0.0, 1.0)
    }

    pub fn size_class(&self, seed: f32) -> SizeClass {
        if seed >= self.config.large_at {
            SizeClass::Large
        } else if seed < self.config.small_below {
            SizeClass::Small
        } else {
            SizeClass::Mid
        }
    }

    /// Size before depth attenuation.
    pub fn base_size(&self, seed: f32) -> f32 {
        match self.size_class(seed) {
            SizeClass::Large => self.config.large_size,
            SizeClass::Small => self.config.small_size,
            SizeClass::Mid => mix(self.config.mid_size.0, self.config.mid_size.1, seed),
        }
    }

    pub fn attenuation(&self, z: f32) -> f32 {
        smoothstep(-self.half_depth, self.half_depth, z).clamp(self.config.attenuation_floor, 1.0)
            * self.config.attenuation_gain
    }

    pub fn scale(&self, seed: f32, z: f32) -> f32 {
        self.base_size(seed) * self.attenuation(z)
    }
}

/// WGSL for the instanced billboard pass (`vs_main` / `fs_main`).
///
/// Instance attributes: location 0 `current_position`, location 1 `seed`,
/// location 2 `color`, all read from the particle storage buffer bound as a
/// vertex buffer. Binding 0 is the frame uniforms.
pub fn render_wgsl(config: &ShadingConfig, depth_range: f32) -> String {
    format!(
        r#"{uniforms_struct}
@group(0) @binding(0)
var<uniform> uniforms: Uniforms;

{utils}
const HALF_DEPTH: f32 = {half_depth};
const SOFT_NEAR: f32 = {soft_lo};
const SOFT_FAR: f32 = {soft_hi};
const FADE_PIVOT: f32 = {fade_pivot};
const FADE_FAR: f32 = {fade_far};
const FLICKER_MIN: f32 = {flicker_lo};
const FLICKER_MAX: f32 = {flicker_hi};
const FLICKER_RAMP: f32 = {flicker_ramp};
const ENTER_FADE_FLOOR: f32 = {enter_floor};
const SIZE_LARGE: f32 = {large};
const SIZE_SMALL: f32 = {small};
const SIZE_MID_MIN: f32 = {mid_lo};
const SIZE_MID_MAX: f32 = {mid_hi};
const LARGE_AT: f32 = {large_at};
const SMALL_BELOW: f32 = {small_below};
const ATTENUATION_FLOOR: f32 = {att_floor};
const ATTENUATION_GAIN: f32 = {att_gain};
const SPRITE_HALF: f32 = {sprite_half};

struct VertexOutput {{
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec3<f32>,
    @location(1) uv: vec2<f32>,
    @location(2) world_z: f32,
    @location(3) opacity: f32,
}}

fn flicker(seed: f32, time: f32) -> f32 {{
    let period = mix(FLICKER_MIN, FLICKER_MAX, seed);
    let offset = hash_unit(bitcast<u32>(seed));
    let shifted = time + offset * period;
    let t = shifted - period * floor(shifted / period);
    let ramp = period * FLICKER_RAMP;
    return smoothstep(0.0, ramp, t) * (1.0 - smoothstep(period - ramp, period, t));
}}

fn depth_fade(z: f32) -> f32 {{
    var faded = 0.0;
    if z < FADE_PIVOT {{
        faded = 1.0 - smoothstep(-HALF_DEPTH, FADE_PIVOT, z);
    }} else if z > FADE_PIVOT {{
        faded = smoothstep(FADE_PIVOT, FADE_FAR, z);
    }}
    return 1.0 - faded;
}}

fn base_size(seed: f32) -> f32 {{
    if seed >= LARGE_AT {{
        return SIZE_LARGE;
    }} else if seed < SMALL_BELOW {{
        return SIZE_SMALL;
    }}
    return mix(SIZE_MID_MIN, SIZE_MID_MAX, seed);
}}

fn softness(z: f32) -> f32 {{
    if z < 0.0 {{
        return 1.0 - smoothstep(-HALF_DEPTH, 0.0, z);
    }} else if z > SOFT_NEAR {{
        return smoothstep(SOFT_NEAR, SOFT_FAR, z);
    }}
    return 0.0;
}}

@vertex
fn vs_main(
    @builtin(vertex_index) vertex_index: u32,
    @location(0) particle_pos: vec3<f32>,
    @location(1) seed: f32,
    @location(2) particle_color: vec3<f32>,
) -> VertexOutput {{
    var quad_vertices = array<vec2<f32>, 6>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>( 1.0, -1.0),
        vec2<f32>(-1.0,  1.0),
        vec2<f32>(-1.0,  1.0),
        vec2<f32>( 1.0, -1.0),
        vec2<f32>( 1.0,  1.0),
    );
    let quad_pos = quad_vertices[vertex_index];

    let world = uniforms.model * vec4<f32>(particle_pos, 1.0);
    let z = world.z;

    let attenuation = clamp(smoothstep(-HALF_DEPTH, HALF_DEPTH, z), ATTENUATION_FLOOR, 1.0) * ATTENUATION_GAIN;
    let scale = base_size(seed) * attenuation;

    // Billboard in view space
    var view_pos = uniforms.view * world;
    view_pos.x += quad_pos.x * SPRITE_HALF * scale;
    view_pos.y += quad_pos.y * SPRITE_HALF * scale;

    let enter_fade = clamp(uniforms.enter_progress, ENTER_FADE_FLOOR, 1.0);

    var out: VertexOutput;
    out.clip_position = uniforms.proj * view_pos;
    out.color = particle_color;
    out.uv = quad_pos * 0.5 + vec2<f32>(0.5);
    out.world_z = z;
    out.opacity = clamp(flicker(seed, uniforms.time) * enter_fade * depth_fade(z), 0.0, 1.0);
    return out;
}}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {{
    let dist = distance(in.uv, vec2<f32>(0.5));
    let sharp = 1.0 - step(0.5, dist);
    let soft = 1.0 - smoothstep(0.0, 0.5, dist);
    let circle = mix(sharp, soft, softness(in.world_z));
    let alpha = circle * in.opacity;
    if alpha <= 0.0 {{
        discard;
    }}
    return vec4<f32>(in.color, alpha);
}}
"#,
        uniforms_struct = FrameUniforms::WGSL_STRUCT,
        utils = all_utils_wgsl(),
        half_depth = wgsl_f32(depth_range * 0.5),
        soft_lo = wgsl_f32(config.softness_band.0),
        soft_hi = wgsl_f32(config.softness_band.1),
        fade_pivot = wgsl_f32(config.fade_pivot),
        fade_far = wgsl_f32(config.fade_far),
        flicker_lo = wgsl_f32(config.flicker_period.0),
        flicker_hi = wgsl_f32(config.flicker_period.1),
        flicker_ramp = wgsl_f32(config.flicker_ramp),
        enter_floor = wgsl_f32(config.enter_fade_floor),
        large = wgsl_f32(config.large_size),
        small = wgsl_f32(config.small_size),
        mid_lo = wgsl_f32(config.mid_size.0),
        mid_hi = wgsl_f32(config.mid_size.1),
        large_at = wgsl_f32(config.large_at),
        small_below = wgsl_f32(config.small_below),
        att_floor = wgsl_f32(config.attenuation_floor),
        att_gain = wgsl_f32(config.attenuation_gain),
        sprite_half = wgsl_f32(config.sprite_size * 0.5),
    )
}

/// Instance attributes read by [`render_wgsl`]'s vertex stage.
pub const INSTANCE_ATTRIBUTES: [wgpu::VertexAttribute; 3] = [
    wgpu::VertexAttribute {
        offset: ParticleGpu::CURRENT_POSITION_OFFSET as u64,
        shader_location: 0,
        format: wgpu::VertexFormat::Float32x3,
    },
    wgpu::VertexAttribute {
        offset: ParticleGpu::SEED_OFFSET as u64,
        shader_location: 1,
        format: wgpu::VertexFormat::Float32,
    },
    wgpu::VertexAttribute {
        offset: ParticleGpu::COLOR_OFFSET as u64,
        shader_location: 2,
        format: wgpu::VertexFormat::Float32x3,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    fn shading() -> Shading {
        Shading::new(ShadingConfig::default(), 12.0)
    }

    #[test]
    fn test_opacity_bounded() {
        let s = shading();
        for i in 0..200 {
            let seed = i as f32 / 200.0;
            for &time in &[0.0, 0.37, 5.0, 1234.5, 1e6, 1e9] {
                for &enter in &[-1.0, 0.0, 0.5, 1.0, 2.0] {
                    for &z in &[-20.0, -6.0, -1.0, 0.0, 1.0, 3.0, 7.0, 50.0] {
                        let o = s.opacity(seed, time, enter, z);
                        assert!((0.0..=1.0).contains(&o), "opacity {} out of range", o);
                    }
                }
            }
        }
    }

    #[test]
    fn test_enter_fade_floor() {
        let s = shading();
        assert_eq!(s.enter_fade(0.0), 0.4);
        assert_eq!(s.enter_fade(0.7), 0.7);
        assert_eq!(s.enter_fade(3.0), 1.0);
    }

    #[test]
    fn test_depth_fade() {
        let s = shading();
        assert_eq!(s.depth_fade(1.0), 1.0);
        assert_eq!(s.depth_fade(7.0), 0.0);
        assert_eq!(s.depth_fade(-6.0), 0.0);
        let mid = s.depth_fade(3.0);
        assert!(mid > 0.0 && mid < 1.0);
    }

    #[test]
    fn test_softness_sharp_at_viewing_depth() {
        let s = shading();
        assert_eq!(s.softness(0.0), 0.0);
        assert_eq!(s.softness(0.4), 0.0);
        assert_eq!(s.softness(2.5), 1.0);
        assert_eq!(s.softness(-6.0), 1.0);
    }

    #[test]
    fn test_circle_mask() {
        let s = shading();
        assert_eq!(s.circle_mask(0.0, 0.0), 1.0);
        assert_eq!(s.circle_mask(0.6, 0.0), 0.0);
        assert_eq!(s.circle_mask(0.5, 1.0), 0.0);
        let c = s.fragment_color(Vec3::new(0.2, 0.4, 0.6), Vec2::splat(0.5), 0.0);
        assert_eq!(c, Vec4::new(0.2, 0.4, 0.6, 1.0));
    }

    #[test]
    fn test_flicker_envelope() {
        let s = shading();
        let seed = 0.5;
        let mut saw_on = false;
        let mut saw_off = false;
        for i in 0..2000 {
            let f = s.flicker(seed, i as f32 * 0.01);
            assert!((0.0..=1.0).contains(&f));
            saw_on |= f > 0.99;
            saw_off |= f < 0.01;
        }
        assert!(saw_on && saw_off);
    }

    #[test]
    fn test_flicker_phase_differs_between_particles() {
        let s = shading();
        let a: Vec<f32> = (0..50).map(|i| s.flicker(0.41, i as f32 * 0.1)).collect();
        let b: Vec<f32> = (0..50).map(|i| s.flicker(0.4100001, i as f32 * 0.1)).collect();
        assert_ne!(a, b);
    }

    #[test]
    fn test_seed_098_is_large() {
        let s = shading();
        assert_eq!(s.size_class(0.98), SizeClass::Large);
        assert_eq!(s.base_size(0.98), 3.5);
        assert_eq!(s.size_class(0.995), SizeClass::Large);
    }

    #[test]
    fn test_size_classes() {
        let s = shading();
        assert_eq!(s.size_class(0.01), SizeClass::Small);
        assert_eq!(s.base_size(0.01), 1.5);
        assert_eq!(s.size_class(0.5), SizeClass::Mid);
        assert!((s.base_size(0.5) - 1.25).abs() < 1e-6);
    }

    #[test]
    fn test_attenuation_range() {
        let s = shading();
        assert_eq!(s.attenuation(-100.0), 0.6);
        assert_eq!(s.attenuation(100.0), 2.0);
        assert_eq!(s.scale(0.99, 100.0), 7.0);
    }

    #[test]
    fn test_render_wgsl_valid() {
        let wgsl = render_wgsl(&ShadingConfig::default(), 12.0);
        assert!(wgsl.contains("fn vs_main"));
        assert!(wgsl.contains("fn fs_main"));
        let module = naga::front::wgsl::parse_str(&wgsl).expect("render WGSL should parse");
        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        );
        validator.validate(&module).expect("render WGSL should validate");
    }
}
