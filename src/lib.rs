//! # Ember Field
//!
//! A GPU particle field whose placement, drift, colour, scale and opacity are
//! all computed in WGSL, choreographed by a small host-side stage machine that
//! tweens a single "enter" progress value.
//!
//! ## Quick Start
//!
//! ```ignore
//! use emberfield::prelude::*;
//!
//! fn main() -> Result<(), SimulationError> {
//!     Simulation::new()
//!         .with_particle_count(56 * 56)
//!         .on_stage_changed(|stage| println!("stage: {stage}"))
//!         .run()
//! }
//! ```
//!
//! ## Passes
//!
//! | Pass | Runs | Reads | Writes |
//! |------|------|-------|--------|
//! | `generate` | once per field | seed, palette | placement, initial/final/current position, colour |
//! | `update` | every frame | seed, initial/final position, enter progress, time | final/current position |
//! | `vs_main` / `fs_main` | every frame | current position, seed, colour, enter progress, time | nothing |
//!
//! Each pass has a CPU mirror ([`FieldGenerator`], [`ParticleField::animate`],
//! [`Shading`]) built on the same hash and noise functions, which is what the
//! tests run against.
//!
//! ## Stages
//!
//! [`StageController`] holds the current [`Stage`] and the enter-progress
//! tween. Requesting [`Stage::Enter`] tweens the progress to 1 and then
//! advances to [`Stage::Brand`]; requesting [`Stage::Restart`] tweens it back
//! to 0 and then re-enters. Collaborators observe changes through
//! [`ParticleEngine::on_stage_changed`] and read
//! [`ParticleEngine::enter_progress`].
//!
//! ## Headless use
//!
//! ```ignore
//! let mut engine = ParticleEngine::new(EngineConfig::default())?;
//! engine.request_stage(Stage::Enter);
//! for _ in 0..180 {
//!     let frame = engine.frame(1.0 / 60.0);
//!     println!("{} {:.3}", frame.stage, frame.enter_progress);
//! }
//! ```

pub mod animator;
pub mod camera;
pub mod config;
pub mod engine;
pub mod error;
pub mod generator;
mod gpu;
pub mod palette;
pub mod particle;
pub mod placement;
pub mod shader;
pub mod shader_utils;
pub mod shading;
mod simulation;
pub mod spawn;
pub mod stage;
pub mod time;
pub mod tween;
pub mod uniforms;

pub use animator::DriftConfig;
pub use bytemuck;
pub use camera::{Camera, FieldTransform};
pub use config::{EngineConfig, FieldConfig};
pub use engine::{FrameState, ParticleEngine};
pub use error::{ConfigError, EngineError, FieldError, GpuError, SimulationError, StageError};
pub use generator::FieldGenerator;
pub use glam::{Vec2, Vec3, Vec4};
pub use gpu::GpuState;
pub use palette::{ColorRange, Palette, PaletteBand, RangePreset};
pub use particle::{Particle, ParticleField, ParticleGpu};
pub use placement::{PlacementPolicy, PlacementThresholds};
pub use shader::ShaderSet;
pub use shading::{Shading, ShadingConfig, SizeClass};
pub use simulation::Simulation;
pub use spawn::SeedTable;
pub use stage::{ListenerId, Stage, StageController, StageTimings};
pub use time::Clock;
pub use tween::{Easing, TransitionDriver, TweenId, TweenSpec};
pub use uniforms::FrameUniforms;

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use emberfield::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::EngineConfig;
    pub use crate::engine::{FrameState, ParticleEngine};
    pub use crate::error::{EngineError, SimulationError, StageError};
    pub use crate::simulation::Simulation;
    pub use crate::stage::{Stage, StageTimings};
    pub use crate::tween::{Easing, TweenSpec};
    pub use crate::{Vec2, Vec3, Vec4};
    pub use winit::keyboard::KeyCode;
}
