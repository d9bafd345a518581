//! Process-scoped engine context.
//!
//! [`ParticleEngine`] owns everything the passes depend on: configuration,
//! palette, seed table, the CPU particle field, the clock and the stage
//! controller. Nothing here is global; tests build as many engines as they
//! like.
//!
//! Each frame runs in a fixed order: the clock advances, the stage
//! controller evaluates its tween (writing the enter progress), and only then
//! is the animator run or the compute pass submitted with that value.

use crate::config::EngineConfig;
use crate::error::{EngineError, FieldError, StageError};
use crate::generator::FieldGenerator;
use crate::palette::Palette;
use crate::particle::{ParticleField, ParticleGpu};
use crate::shader::ShaderSet;
use crate::shading::Shading;
use crate::spawn::SeedTable;
use crate::stage::{ListenerId, Stage, StageController};
use crate::time::Clock;

/// Host state snapshot for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameState {
    pub time: f32,
    pub delta: f32,
    pub enter_progress: f32,
    pub stage: Stage,
}

pub struct ParticleEngine {
    config: EngineConfig,
    palette: Palette,
    seeds: SeedTable,
    field: ParticleField,
    shading: Shading,
    clock: Clock,
    stages: StageController,
    cpu_simulation: bool,
}

impl ParticleEngine {
    /// Validate the configuration and generate the field.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let field_config = &config.field;
        let palette = Palette::generate(&field_config.palette, field_config.accent, field_config.seed)?;
        let seeds = SeedTable::generate(field_config.particle_count, field_config.seed);
        let field = FieldGenerator::new(field_config, &palette).generate(&seeds)?;
        let shading = Shading::new(config.shading, field_config.depth_range);
        let stages = StageController::new(config.stages);

        tracing::info!(
            particles = field.len(),
            palette = palette.len(),
            seed = field_config.seed,
            "engine ready"
        );

        Ok(Self {
            config,
            palette,
            seeds,
            field,
            shading,
            clock: Clock::new(),
            stages,
            cpu_simulation: true,
        })
    }

    /// Whether [`frame`](Self::frame) runs the CPU animator. Turn off when
    /// the GPU owns the particle buffers.
    pub fn set_cpu_simulation(&mut self, enabled: bool) {
        self.cpu_simulation = enabled;
    }

    /// Advance by `dt` seconds.
    pub fn frame(&mut self, dt: f32) -> FrameState {
        self.clock.advance(dt);
        self.step()
    }

    /// Advance by the wall time since the previous frame.
    pub fn frame_realtime(&mut self) -> FrameState {
        self.clock.tick();
        self.step()
    }

    fn step(&mut self) -> FrameState {
        self.stages.tick(self.clock.elapsed());
        let state = self.frame_state();
        if self.cpu_simulation {
            self.field
                .animate(&self.config.drift, state.time, state.enter_progress);
        }
        state
    }

    /// Current snapshot without advancing.
    pub fn frame_state(&self) -> FrameState {
        FrameState {
            time: self.clock.shader_time(),
            delta: self.clock.delta(),
            enter_progress: self.stages.enter_progress(),
            stage: self.stages.stage(),
        }
    }

    pub fn request_stage(&mut self, stage: Stage) -> bool {
        self.stages.request_stage(stage, self.clock.elapsed())
    }

    pub fn request_stage_named(&mut self, name: &str) -> Result<bool, StageError> {
        self.stages.request_stage_named(name, self.clock.elapsed())
    }

    pub fn on_stage_changed(&mut self, listener: impl FnMut(Stage) + 'static) -> ListenerId {
        self.stages.on_stage_changed(listener)
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.stages.remove_listener(id)
    }

    /// Re-derive every particle from the seed table, discarding all drift.
    pub fn regenerate(&mut self) -> Result<(), FieldError> {
        self.field = FieldGenerator::new(&self.config.field, &self.palette).generate(&self.seeds)?;
        Ok(())
    }

    /// Shader sources for this configuration.
    pub fn shaders(&self) -> ShaderSet {
        ShaderSet::new(&self.config, &self.palette)
    }

    /// Slots with only their seeds filled, for the GPU generator pass.
    pub fn seeded_slots(&self) -> Vec<ParticleGpu> {
        self.seeds
            .as_slice()
            .iter()
            .map(|&seed| ParticleGpu::seeded(seed))
            .collect()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn seeds(&self) -> &SeedTable {
        &self.seeds
    }

    pub fn field(&self) -> &ParticleField {
        &self.field
    }

    pub fn shading(&self) -> &Shading {
        &self.shading
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut Clock {
        &mut self.clock
    }

    #[inline]
    pub fn stage(&self) -> Stage {
        self.stages.stage()
    }

    #[inline]
    pub fn enter_progress(&self) -> f32 {
        self.stages.enter_progress()
    }

    #[inline]
    pub fn particle_count(&self) -> u32 {
        self.config.field.particle_count
    }
}

impl std::fmt::Debug for ParticleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParticleEngine")
            .field("particles", &self.field.len())
            .field("stages", &self.stages)
            .field("elapsed", &self.clock.elapsed())
            .field("cpu_simulation", &self.cpu_simulation)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;

    fn small() -> EngineConfig {
        EngineConfig::default().with_particle_count(256).with_seed(11)
    }

    #[test]
    fn test_rejects_invalid_config() {
        let result = ParticleEngine::new(EngineConfig::default().with_particle_count(0));
        assert!(matches!(
            result,
            Err(EngineError::Config(ConfigError::Invalid(_)))
        ));
    }

    #[test]
    fn test_starts_in_preferences_with_scattered_field() {
        let engine = ParticleEngine::new(small()).unwrap();
        assert_eq!(engine.stage(), Stage::Preferences);
        assert_eq!(engine.enter_progress(), 0.0);
        assert_eq!(engine.field().len(), 256);
        assert_eq!(engine.seeded_slots().len(), 256);
        for p in engine.field().iter() {
            assert_eq!(p.current_position, p.initial_position);
        }
    }

    #[test]
    fn test_frame_order_progress_before_animation() {
        let mut engine = ParticleEngine::new(small()).unwrap();
        engine.request_stage(Stage::Enter);
        let mut last = engine.frame(0.0);
        for _ in 0..240 {
            last = engine.frame(1.0 / 60.0);
        }
        assert_eq!(last.stage, Stage::Brand);
        assert_eq!(last.enter_progress, 1.0);
        // The last animator step already used progress 1
        for p in engine.field().iter() {
            assert_eq!(p.current_position, p.final_position);
        }
    }

    #[test]
    fn test_cpu_simulation_toggle() {
        let mut engine = ParticleEngine::new(small()).unwrap();
        engine.set_cpu_simulation(false);
        let before = engine.field().clone();
        engine.frame(0.5);
        assert_eq!(engine.field(), &before);
    }

    #[test]
    fn test_regenerate_discards_drift() {
        let mut engine = ParticleEngine::new(small()).unwrap();
        let pristine = engine.field().clone();
        for _ in 0..30 {
            engine.frame(1.0 / 60.0);
        }
        assert_ne!(engine.field(), &pristine);
        engine.regenerate().unwrap();
        assert_eq!(engine.field(), &pristine);
    }

    #[test]
    fn test_named_request() {
        let mut engine = ParticleEngine::new(small()).unwrap();
        assert!(engine.request_stage_named("nowhere").is_err());
        assert_eq!(engine.stage(), Stage::Preferences);
        assert_eq!(engine.request_stage_named("Avatar"), Ok(true));
    }
}
