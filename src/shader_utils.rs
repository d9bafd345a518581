//! Hash, noise and shader-math primitives shared by the GPU passes and their
//! CPU reference.
//!
//! Every function here exists twice: once as WGSL (prepended to the generated
//! compute and render shaders) and once as Rust, so the CPU reference used by
//! the headless engine and the tests runs the same algorithm the GPU does.
//!
//! # Available Functions
//!
//! ## Hash
//! - `hash_u32(n: u32) -> u32` - PCG integer hash
//! - `hash_unit(n: u32) -> f32` - hash to `[0, 1)` (top 24 bits, never reaches 1.0)
//! - `hash_f32(x: f32) -> f32` - truncate a float to `u32`, then [`hash_unit`]
//!
//! ## Noise
//! - `noise3(p: vec3<f32>) -> f32` - 3D gradient noise, clamped to `[-1, 1]`
//! - `noise1(x: f32) -> f32` - 1D slice of `noise3` along the x axis
//!
//! ## Math
//! WGSL's `mix`, `smoothstep`, `step` and GLSL-style `mod` have Rust mirrors
//! ([`mix`], [`smoothstep`], [`step`], [`modulo`]) with identical formulas.

use glam::Vec3;

/// WGSL code for the hash functions.
pub const HASH_WGSL: &str = r#"
// PCG hash
fn hash_u32(n: u32) -> u32 {
    let state = n * 747796405u + 2891336453u;
    let word = ((state >> ((state >> 28u) + 4u)) ^ state) * 277803737u;
    return (word >> 22u) ^ word;
}

// Random float in [0, 1)
fn hash_unit(n: u32) -> f32 {
    return f32(hash_u32(n) >> 8u) / 16777216.0;
}

fn hash_f32(x: f32) -> f32 {
    return hash_unit(u32(x));
}
"#;

/// WGSL code for gradient noise.
pub const NOISE_WGSL: &str = r#"
fn noise_fade(t: vec3<f32>) -> vec3<f32> {
    return t * t * t * (t * (t * 6.0 - 15.0) + 10.0);
}

fn noise_gradient(corner_hash: u32, p: vec3<f32>) -> f32 {
    let h = corner_hash & 15u;
    var u = p.y;
    if h < 8u {
        u = p.x;
    }
    var v = p.z;
    if h < 4u {
        v = p.y;
    } else if h == 12u || h == 14u {
        v = p.x;
    }
    if (h & 1u) != 0u {
        u = -u;
    }
    if (h & 2u) != 0u {
        v = -v;
    }
    return u + v;
}

fn noise_lattice(c: vec3<i32>) -> u32 {
    return hash_u32(bitcast<u32>(c.x) ^ hash_u32(bitcast<u32>(c.y) ^ hash_u32(bitcast<u32>(c.z))));
}

// 3D gradient noise in [-1, 1]
fn noise3(p: vec3<f32>) -> f32 {
    let cell = floor(p);
    let f = p - cell;
    let c = vec3<i32>(cell);
    let w = noise_fade(f);

    let n000 = noise_gradient(noise_lattice(c), f);
    let n100 = noise_gradient(noise_lattice(c + vec3<i32>(1, 0, 0)), f - vec3<f32>(1.0, 0.0, 0.0));
    let n010 = noise_gradient(noise_lattice(c + vec3<i32>(0, 1, 0)), f - vec3<f32>(0.0, 1.0, 0.0));
    let n110 = noise_gradient(noise_lattice(c + vec3<i32>(1, 1, 0)), f - vec3<f32>(1.0, 1.0, 0.0));
    let n001 = noise_gradient(noise_lattice(c + vec3<i32>(0, 0, 1)), f - vec3<f32>(0.0, 0.0, 1.0));
    let n101 = noise_gradient(noise_lattice(c + vec3<i32>(1, 0, 1)), f - vec3<f32>(1.0, 0.0, 1.0));
    let n011 = noise_gradient(noise_lattice(c + vec3<i32>(0, 1, 1)), f - vec3<f32>(0.0, 1.0, 1.0));
    let n111 = noise_gradient(noise_lattice(c + vec3<i32>(1, 1, 1)), f - vec3<f32>(1.0, 1.0, 1.0));

    let x00 = mix(n000, n100, w.x);
    let x10 = mix(n010, n110, w.x);
    let x01 = mix(n001, n101, w.x);
    let x11 = mix(n011, n111, w.x);
    let y0 = mix(x00, x10, w.y);
    let y1 = mix(x01, x11, w.y);
    return clamp(mix(y0, y1, w.z), -1.0, 1.0);
}

fn noise1(x: f32) -> f32 {
    return noise3(vec3<f32>(x, 0.0, 0.0));
}
"#;

/// Get all shared utility functions combined.
pub fn all_utils_wgsl() -> String {
    format!("// Shared utility functions\n{}\n{}\n", HASH_WGSL, NOISE_WGSL)
}

/// Format an `f32` as a WGSL float literal.
///
/// `Display` prints `1.0` as `1`, which WGSL reads as an abstract integer.
pub fn wgsl_f32(value: f32) -> String {
    let text = format!("{:?}", value);
    if text.contains('.') || text.contains('e') || text.contains("inf") || text.contains("NaN") {
        text
    } else {
        format!("{}.0", text)
    }
}

/// Format a `Vec3` as a WGSL `vec3<f32>` constructor.
pub fn wgsl_vec3(value: Vec3) -> String {
    format!(
        "vec3<f32>({}, {}, {})",
        wgsl_f32(value.x),
        wgsl_f32(value.y),
        wgsl_f32(value.z)
    )
}

// ========== Hash ==========

/// PCG integer hash.
#[inline]
pub fn hash_u32(n: u32) -> u32 {
    let state = n.wrapping_mul(747796405).wrapping_add(2891336453);
    let word = ((state >> ((state >> 28) + 4)) ^ state).wrapping_mul(277803737);
    (word >> 22) ^ word
}

/// Hash to a float in `[0, 1)`.
#[inline]
pub fn hash_unit(n: u32) -> f32 {
    (hash_u32(n) >> 8) as f32 / 16_777_216.0
}

/// Truncate a float to `u32` (saturating, NaN maps to 0) and hash it.
#[inline]
pub fn hash_f32(x: f32) -> f32 {
    hash_unit(x as u32)
}

// ========== Noise ==========

#[inline]
fn fade(t: f32) -> f32 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

#[inline]
fn gradient(corner_hash: u32, x: f32, y: f32, z: f32) -> f32 {
    let h = corner_hash & 15;
    let u = if h < 8 { x } else { y };
    let v = if h < 4 {
        y
    } else if h == 12 || h == 14 {
        x
    } else {
        z
    };
    let u = if h & 1 != 0 { -u } else { u };
    let v = if h & 2 != 0 { -v } else { v };
    u + v
}

#[inline]
fn lattice(x: i32, y: i32, z: i32) -> u32 {
    hash_u32((x as u32) ^ hash_u32((y as u32) ^ hash_u32(z as u32)))
}

/// 3D gradient noise, clamped to `[-1, 1]`.
///
/// Lattice coordinates saturate for huge inputs, so the result stays bounded
/// no matter how long the clock has been running.
pub fn noise3(p: Vec3) -> f32 {
    let cell = p.floor();
    let f = p - cell;
    let (cx, cy, cz) = (cell.x as i32, cell.y as i32, cell.z as i32);
    let (cx1, cy1, cz1) = (cx.wrapping_add(1), cy.wrapping_add(1), cz.wrapping_add(1));
    let (wx, wy, wz) = (fade(f.x), fade(f.y), fade(f.z));

    let n000 = gradient(lattice(cx, cy, cz), f.x, f.y, f.z);
    let n100 = gradient(lattice(cx1, cy, cz), f.x - 1.0, f.y, f.z);
    let n010 = gradient(lattice(cx, cy1, cz), f.x, f.y - 1.0, f.z);
    let n110 = gradient(lattice(cx1, cy1, cz), f.x - 1.0, f.y - 1.0, f.z);
    let n001 = gradient(lattice(cx, cy, cz1), f.x, f.y, f.z - 1.0);
    let n101 = gradient(lattice(cx1, cy, cz1), f.x - 1.0, f.y, f.z - 1.0);
    let n011 = gradient(lattice(cx, cy1, cz1), f.x, f.y - 1.0, f.z - 1.0);
    let n111 = gradient(lattice(cx1, cy1, cz1), f.x - 1.0, f.y - 1.0, f.z - 1.0);

    let x00 = mix(n000, n100, wx);
    let x10 = mix(n010, n110, wx);
    let x01 = mix(n001, n101, wx);
    let x11 = mix(n011, n111, wx);
    let y0 = mix(x00, x10, wy);
    let y1 = mix(x01, x11, wy);
    mix(y0, y1, wz).clamp(-1.0, 1.0)
}

/// 1D noise: a slice of [`noise3`] along the x axis.
#[inline]
pub fn noise1(x: f32) -> f32 {
    noise3(Vec3::new(x, 0.0, 0.0))
}

// ========== Math ==========

/// WGSL `mix`: `a * (1 - t) + b * t`. Exact at both `t = 0` and `t = 1`.
#[inline]
pub fn mix(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

/// Component-wise WGSL `mix` for vectors with a scalar factor.
#[inline]
pub fn mix_vec3(a: Vec3, b: Vec3, t: f32) -> Vec3 {
    a * (1.0 - t) + b * t
}

/// WGSL `smoothstep`.
#[inline]
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// WGSL `step`: 1.0 when `x >= edge`.
#[inline]
pub fn step(edge: f32, x: f32) -> f32 {
    if x >= edge {
        1.0
    } else {
        0.0
    }
}

/// GLSL-style modulo, `x - y * floor(x / y)`. Non-negative for positive `y`.
#[inline]
pub fn modulo(x: f32, y: f32) -> f32 {
    x - y * (x / y).floor()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_unit_range() {
        for n in (0..200_000u32).chain([u32::MAX, u32::MAX - 1]) {
            let v = hash_unit(n);
            assert!((0.0..1.0).contains(&v), "hash_unit({}) = {}", n, v);
        }
    }

    #[test]
    fn test_hash_is_stable() {
        assert_eq!(hash_u32(0), hash_u32(0));
        assert_ne!(hash_u32(1), hash_u32(2));
        assert_eq!(hash_f32(3.7), hash_unit(3));
        assert_eq!(hash_f32(-5.0), hash_unit(0));
        assert_eq!(hash_f32(f32::NAN), hash_unit(0));
    }

    #[test]
    fn test_noise_bounded() {
        let mut max = 0.0f32;
        for i in 0..4000 {
            let p = Vec3::new(i as f32 * 0.173, i as f32 * -0.311, i as f32 * 0.057);
            let n = noise3(p);
            assert!((-1.0..=1.0).contains(&n));
            max = max.max(n.abs());
        }
        // Not degenerate
        assert!(max > 0.1);
    }

    #[test]
    fn test_noise_extreme_inputs() {
        for x in [1e9f32, -1e9, 3.4e38, -3.4e38, 1e-30] {
            let n = noise3(Vec3::splat(x));
            assert!(n.is_finite());
            assert!((-1.0..=1.0).contains(&n));
        }
        assert!(noise1(1e12).is_finite());
    }

    #[test]
    fn test_noise_zero_on_lattice() {
        assert_eq!(noise3(Vec3::new(2.0, -3.0, 5.0)), 0.0);
    }

    #[test]
    fn test_mix_exact_endpoints() {
        let a = Vec3::new(1.3, -7.1, 0.02);
        let b = Vec3::new(-4.4, 9.9, 15.5);
        assert_eq!(mix_vec3(a, b, 0.0), a);
        assert_eq!(mix_vec3(a, b, 1.0), b);
    }

    #[test]
    fn test_smoothstep_and_modulo() {
        assert_eq!(smoothstep(0.0, 1.0, -1.0), 0.0);
        assert_eq!(smoothstep(0.0, 1.0, 2.0), 1.0);
        assert!((smoothstep(0.0, 1.0, 0.5) - 0.5).abs() < 1e-6);
        assert!((modulo(-1.0, 3.0) - 2.0).abs() < 1e-6);
        assert!((modulo(7.5, 3.0) - 1.5).abs() < 1e-6);
        assert_eq!(step(0.5, 0.5), 1.0);
        assert_eq!(step(0.5, 0.49), 0.0);
    }

    #[test]
    fn test_wgsl_f32_literals() {
        assert_eq!(wgsl_f32(1.0), "1.0");
        assert_eq!(wgsl_f32(-3.0), "-3.0");
        assert_eq!(wgsl_f32(0.01), "0.01");
        assert_eq!(wgsl_vec3(Vec3::new(1.0, 0.5, 2.0)), "vec3<f32>(1.0, 0.5, 2.0)");
    }

    #[test]
    fn test_utils_wgsl_validates() {
        let shader = format!(
            "{}\n@compute @workgroup_size(1)\nfn main() {{\n    let n = noise3(vec3<f32>(hash_f32(3.0), hash_unit(1u), 0.5)) + noise1(0.25);\n}}\n",
            all_utils_wgsl()
        );
        let module = naga::front::wgsl::parse_str(&shader).expect("utils should parse");
        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        );
        validator.validate(&module).expect("utils should validate");
    }
}
