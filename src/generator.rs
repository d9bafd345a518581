//! Particle field generator.
//!
//! A one-shot pass that derives every slot's placement, final position,
//! scattered initial position and colour from its seed and index. Slots are
//! independent of each other, so the pass runs unordered on the GPU
//! (`generate` entry point of [`generator_wgsl`]) and as a plain map on the
//! CPU ([`FieldGenerator::generate`]).
//!
//! # Algorithm (slot `i`, seed `seed`, `s = 2 * seed - 1`)
//!
//! ```text
//! t        = i * spacing
//! hash_a   = hash_unit(10 * i)          noise_a = noise1(hash_a)
//! hash_b   = hash_f32(20 * (seed + 1))  noise_b = noise1(hash_b)
//! wave     = (t - noise_a - L / 2,
//!             2.2 * sin(t / 2) + s - noise_b,
//!             hash_unit(i) * D - D / 2 + 2 * noise_b)
//! final    = first matching policy of the guard chain
//! initial  = final + (6 s, 8 s, 16 seed)
//! color    = accent if seed > accent_threshold else palette[floor(hash_unit(i + 3) * len)]
//! ```

use glam::Vec3;

use crate::config::FieldConfig;
use crate::error::FieldError;
use crate::palette::Palette;
use crate::particle::{Particle, ParticleField, ParticleGpu};
use crate::placement::{guard_chain_wgsl, policy_constants_wgsl, PlacementPolicy};
use crate::shader_utils::{all_utils_wgsl, hash_f32, hash_unit, noise1, wgsl_f32, wgsl_vec3};
use crate::spawn::SeedTable;

/// Workgroup size of both compute passes.
pub const WORKGROUP_SIZE: u32 = 256;

const WAVE_AMPLITUDE: f32 = 2.2;
const RISING_DISPLACEMENT: f32 = 24.0;
const BOX_HEIGHT: f32 = 10.0;
const SCATTER: Vec3 = Vec3::new(6.0, 8.0, 16.0);

/// Per-slot random samples shared by the placement policies.
#[derive(Debug, Clone, Copy)]
struct SlotSamples {
    hash_a: f32,
    noise_a: f32,
    noise_b: f32,
}

impl SlotSamples {
    fn new(index: u32, seed: f32) -> Self {
        let hash_a = hash_unit(index.wrapping_mul(10));
        Self {
            hash_a,
            noise_a: noise1(hash_a),
            noise_b: noise1(hash_f32((seed + 1.0) * 20.0)),
        }
    }
}

/// CPU reference of the generator pass.
pub struct FieldGenerator<'a> {
    config: &'a FieldConfig,
    palette: &'a Palette,
}

impl<'a> FieldGenerator<'a> {
    pub fn new(config: &'a FieldConfig, palette: &'a Palette) -> Self {
        Self { config, palette }
    }

    /// Generate every slot from scratch.
    pub fn generate(&self, seeds: &SeedTable) -> Result<ParticleField, FieldError> {
        let expected = self.config.particle_count as usize;
        if expected == 0 {
            return Err(FieldError::EmptyField);
        }
        if seeds.len() != expected {
            return Err(FieldError::SeedCountMismatch {
                expected,
                actual: seeds.len(),
            });
        }
        if self.palette.is_empty() {
            return Err(FieldError::EmptyPalette);
        }

        let particles = seeds
            .as_slice()
            .iter()
            .enumerate()
            .map(|(i, &seed)| self.generate_particle(i as u32, seed))
            .collect();

        tracing::info!(particles = expected, "generated particle field");
        Ok(ParticleField::from_particles(particles))
    }

    /// Generate one slot. Depends only on `index`, `seed` and the configuration.
    pub fn generate_particle(&self, index: u32, seed: f32) -> Particle {
        let samples = SlotSamples::new(index, seed);
        let placement = PlacementPolicy::select(seed, &self.config.placement);
        let final_position = self.place(placement, index, seed, &samples);
        let s = seed * 2.0 - 1.0;
        let initial_position = final_position + SCATTER * Vec3::new(s, s, seed);

        Particle {
            seed,
            placement,
            initial_position,
            final_position,
            current_position: initial_position,
            color: self.color_for(index, seed),
        }
    }

    /// Position along the noisy sine wave.
    pub fn wave_position(&self, index: u32, seed: f32) -> Vec3 {
        self.wave(index, seed, &SlotSamples::new(index, seed))
    }

    /// Colour for a slot: the accent above the threshold, otherwise a hashed palette entry.
    pub fn color_for(&self, index: u32, seed: f32) -> Vec3 {
        if seed > self.config.accent_threshold {
            return self.palette.accent();
        }
        let slot = self.palette.index_for(hash_unit(index.wrapping_add(3)));
        self.palette.colors()[slot]
    }

    fn wave(&self, index: u32, seed: f32, samples: &SlotSamples) -> Vec3 {
        let depth = self.config.depth_range;
        let t = index as f32 * self.config.spacing;
        let s = seed * 2.0 - 1.0;
        Vec3::new(
            t - samples.noise_a - self.config.wave_length() * 0.5,
            (t / 2.0).sin() * WAVE_AMPLITUDE + s - samples.noise_b,
            hash_unit(index) * depth - depth * 0.5 + samples.noise_b * 2.0,
        )
    }

    fn place(&self, policy: PlacementPolicy, index: u32, seed: f32, samples: &SlotSamples) -> Vec3 {
        match policy {
            PlacementPolicy::VerticalOffset => {
                self.wave(index, seed, samples)
                    + Vec3::new(0.0, (samples.noise_a - samples.noise_b) * RISING_DISPLACEMENT, 0.0)
            }
            PlacementPolicy::RandomBox => {
                let length = self.config.wave_length();
                let depth = self.config.depth_range;
                Vec3::new(
                    hash_unit(index.wrapping_sub(1)) * length - length * 0.5,
                    (samples.hash_a * 2.0 - 1.0) * BOX_HEIGHT,
                    (hash_f32(seed + index as f32) * 2.0 - 1.0) * depth,
                )
            }
            PlacementPolicy::Wave => self.wave(index, seed, samples),
        }
    }
}

/// WGSL for the one-shot generator pass (entry point `generate`).
///
/// Bindings: `0` particles (read-write, seeds pre-filled), `1` palette.
pub fn generator_wgsl(config: &FieldConfig, palette: &Palette) -> String {
    let depth = config.depth_range;
    let length = config.wave_length();

    let chain = guard_chain_wgsl(&config.placement, |policy| {
        let position = match policy {
            PlacementPolicy::VerticalOffset => format!(
                "wave + vec3<f32>(0.0, (noise_a - noise_b) * {}, 0.0)",
                wgsl_f32(RISING_DISPLACEMENT)
            ),
            PlacementPolicy::RandomBox => format!(
                "vec3<f32>(hash_unit(index - 1u) * WAVE_LENGTH - WAVE_LENGTH * 0.5, (hash_a * 2.0 - 1.0) * {}, (hash_f32(seed + f32(index)) * 2.0 - 1.0) * DEPTH_RANGE)",
                wgsl_f32(BOX_HEIGHT)
            ),
            PlacementPolicy::Wave => "wave".to_string(),
        };
        format!(
            "        placement = {};\n        final_position = {};",
            policy.wgsl_name(),
            position
        )
    });

    format!(
        r#"{particle_struct}
@group(0) @binding(0)
var<storage, read_write> particles: array<Particle>;

@group(0) @binding(1)
var<storage, read> palette: array<vec4<f32>>;

{utils}
{policies}

const SPACING: f32 = {spacing};
const DEPTH_RANGE: f32 = {depth};
const WAVE_LENGTH: f32 = {length};
const ACCENT_THRESHOLD: f32 = {accent_threshold};
const ACCENT: vec3<f32> = {accent};
const SCATTER: vec3<f32> = {scatter};

@compute @workgroup_size({workgroup})
fn generate(@builtin(global_invocation_id) global_id: vec3<u32>) {{
    let index = global_id.x;
    if index >= arrayLength(&particles) {{
        return;
    }}

    let seed = particles[index].seed;
    let s = seed * 2.0 - 1.0;
    let t = f32(index) * SPACING;

    let hash_a = hash_unit(index * 10u);
    let noise_a = noise1(hash_a);
    let noise_b = noise1(hash_f32((seed + 1.0) * 20.0));

    let wave = vec3<f32>(
        t - noise_a - WAVE_LENGTH * 0.5,
        sin(t / 2.0) * {amplitude} + s - noise_b,
        hash_unit(index) * DEPTH_RANGE - DEPTH_RANGE * 0.5 + noise_b * 2.0
    );

    var placement = PLACEMENT_WAVE;
    var final_position = wave;
    {chain}

    let initial_position = final_position + SCATTER * vec3<f32>(s, s, seed);

    let palette_len = arrayLength(&palette);
    let color_index = min(u32(floor(hash_unit(index + 3u) * f32(palette_len))), palette_len - 1u);
    var color = palette[color_index].xyz;
    if seed > ACCENT_THRESHOLD {{
        color = ACCENT;
    }}

    particles[index].placement = placement;
    particles[index].final_position = final_position;
    particles[index].initial_position = initial_position;
    particles[index].current_position = initial_position;
    particles[index].color = color;
}}
"#,
        particle_struct = ParticleGpu::WGSL_STRUCT,
        utils = all_utils_wgsl(),
        policies = policy_constants_wgsl(),
        spacing = wgsl_f32(config.spacing),
        depth = wgsl_f32(depth),
        length = wgsl_f32(length),
        accent_threshold = wgsl_f32(config.accent_threshold),
        accent = wgsl_vec3(palette.accent()),
        scatter = wgsl_vec3(SCATTER),
        workgroup = WORKGROUP_SIZE,
        amplitude = wgsl_f32(WAVE_AMPLITUDE),
        chain = chain,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::PaletteBand;

    fn palette() -> Palette {
        Palette::generate(&PaletteBand::defaults(), Palette::DEFAULT_ACCENT, 11).unwrap()
    }

    fn validate_wgsl(code: &str) -> Result<(), String> {
        let module = naga::front::wgsl::parse_str(code)
            .map_err(|e| format!("WGSL parse error: {:?}", e))?;
        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        );
        validator
            .validate(&module)
            .map_err(|e| format!("WGSL validation error: {:?}", e))?;
        Ok(())
    }

    #[test]
    fn test_generation_is_deterministic() {
        let config = FieldConfig::default();
        let palette = palette();
        let seeds = SeedTable::generate(config.particle_count, config.seed);
        let a = FieldGenerator::new(&config, &palette).generate(&seeds).unwrap();
        let b = FieldGenerator::new(&config, &palette).generate(&seeds).unwrap();
        assert_eq!(a.len(), 3136);
        for (pa, pb) in a.iter().zip(b.iter()) {
            assert_eq!(pa.final_position.to_array().map(f32::to_bits), pb.final_position.to_array().map(f32::to_bits));
            assert_eq!(pa.initial_position.to_array().map(f32::to_bits), pb.initial_position.to_array().map(f32::to_bits));
            assert_eq!(pa.color.to_array().map(f32::to_bits), pb.color.to_array().map(f32::to_bits));
        }
    }

    #[test]
    fn test_slots_are_independent_of_order() {
        let config = FieldConfig::default();
        let palette = palette();
        let seeds = SeedTable::generate(config.particle_count, 99);
        let field = FieldGenerator::new(&config, &palette).generate(&seeds).unwrap();
        let generator = FieldGenerator::new(&config, &palette);
        for i in (0..config.particle_count).rev().step_by(97) {
            let alone = generator.generate_particle(i, seeds.get(i as usize).unwrap());
            assert_eq!(&alone, field.get(i as usize).unwrap());
        }
    }

    #[test]
    fn test_initial_state_matches_initial_position() {
        let config = FieldConfig::default();
        let palette = palette();
        let generator = FieldGenerator::new(&config, &palette);
        let p = generator.generate_particle(120, 0.45);
        assert_eq!(p.current_position, p.initial_position);
        let s = 0.45 * 2.0 - 1.0;
        let offset = p.initial_position - p.final_position;
        assert!((offset - Vec3::new(6.0 * s, 8.0 * s, 16.0 * 0.45)).abs().max_element() < 1e-4);
    }

    #[test]
    fn test_placement_recorded_per_seed() {
        let config = FieldConfig::default();
        let palette = palette();
        let generator = FieldGenerator::new(&config, &palette);
        assert_eq!(generator.generate_particle(5, 0.1).placement, PlacementPolicy::VerticalOffset);
        assert_eq!(generator.generate_particle(5, 0.65).placement, PlacementPolicy::RandomBox);
        assert_eq!(generator.generate_particle(5, 0.5).placement, PlacementPolicy::Wave);
        assert_eq!(generator.generate_particle(5, 0.3).placement, PlacementPolicy::Wave);
        assert_eq!(generator.generate_particle(5, 0.7).placement, PlacementPolicy::Wave);
    }

    #[test]
    fn test_wave_policy_uses_wave_position() {
        let config = FieldConfig::default();
        let palette = palette();
        let generator = FieldGenerator::new(&config, &palette);
        let p = generator.generate_particle(800, 0.5);
        assert_eq!(p.final_position, generator.wave_position(800, 0.5));
    }

    #[test]
    fn test_vertical_offset_only_moves_y() {
        let config = FieldConfig::default();
        let palette = palette();
        let generator = FieldGenerator::new(&config, &palette);
        let p = generator.generate_particle(800, 0.2);
        let wave = generator.wave_position(800, 0.2);
        assert_eq!(p.final_position.x, wave.x);
        assert_eq!(p.final_position.z, wave.z);
    }

    #[test]
    fn test_random_box_bounds() {
        let config = FieldConfig::default();
        let palette = palette();
        let generator = FieldGenerator::new(&config, &palette);
        let half_length = config.wave_length() * 0.5;
        for i in 0..config.particle_count {
            let p = generator.generate_particle(i, 0.65);
            assert!(p.final_position.x.abs() <= half_length);
            assert!(p.final_position.y.abs() <= 10.0);
            assert!(p.final_position.z.abs() <= config.depth_range);
        }
    }

    #[test]
    fn test_wave_depth_spread() {
        let config = FieldConfig::default();
        let palette = palette();
        let generator = FieldGenerator::new(&config, &palette);
        for i in (0..config.particle_count).step_by(13) {
            let wave = generator.wave_position(i, 0.5);
            // hash spread plus at most two units of noise
            assert!(wave.z.abs() <= config.depth_range * 0.5 + 2.0);
        }
    }

    #[test]
    fn test_accent_scenarios() {
        let config = FieldConfig::default();
        let palette = palette();
        let generator = FieldGenerator::new(&config, &palette);
        for i in 0..50 {
            let accent = generator.generate_particle(i, 0.995);
            assert_eq!(accent.color, palette.accent());

            let not_accent = generator.generate_particle(i, 0.98);
            let slot = palette.index_for(hash_unit(i + 3));
            assert_eq!(not_accent.color, palette.colors()[slot]);
        }
    }

    #[test]
    fn test_generate_rejects_bad_inputs() {
        let config = FieldConfig {
            particle_count: 10,
            ..FieldConfig::default()
        };
        let palette = palette();
        let generator = FieldGenerator::new(&config, &palette);
        let short = SeedTable::generate(9, 0);
        assert!(matches!(
            generator.generate(&short),
            Err(FieldError::SeedCountMismatch { expected: 10, actual: 9 })
        ));

        let empty = FieldConfig {
            particle_count: 0,
            ..FieldConfig::default()
        };
        let generator = FieldGenerator::new(&empty, &palette);
        assert!(matches!(
            generator.generate(&SeedTable::generate(0, 0)),
            Err(FieldError::EmptyField)
        ));
    }

    #[test]
    fn test_generator_wgsl_valid() {
        let wgsl = generator_wgsl(&FieldConfig::default(), &palette());
        assert!(wgsl.contains("fn generate"));
        assert!(wgsl.contains("if seed < 0.3"));
        validate_wgsl(&wgsl).expect("generator WGSL should be valid");
    }

    #[test]
    fn test_generator_wgsl_uses_configured_thresholds() {
        let mut config = FieldConfig::default();
        config.placement.rising_below = 0.25;
        config.accent_threshold = 0.95;
        let wgsl = generator_wgsl(&config, &palette());
        assert!(wgsl.contains("if seed < 0.25"));
        assert!(wgsl.contains("ACCENT_THRESHOLD: f32 = 0.95"));
        validate_wgsl(&wgsl).expect("generator WGSL should be valid");
    }
}
