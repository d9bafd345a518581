//! Simulation builder and windowed runner.
//!
//! Each redraw advances the [`ParticleEngine`] (clock, then stage tween)
//! and hands the resulting uniforms to [`GpuState::render`], which runs the
//! animator pass before drawing. The CPU animator is switched off here since
//! the GPU owns the particle buffers.

use std::collections::HashMap;
use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use crate::camera::{Camera, FieldTransform};
use crate::config::EngineConfig;
use crate::engine::ParticleEngine;
use crate::error::SimulationError;
use crate::gpu::GpuState;
use crate::stage::Stage;
use crate::uniforms::FrameUniforms;

type StageListener = Box<dyn FnMut(Stage)>;

/// A windowed particle field.
///
/// ```ignore
/// Simulation::new()
///     .with_particle_count(4096)
///     .on_stage_changed(|stage| println!("now in {stage}"))
///     .run()?;
/// ```
pub struct Simulation {
    config: EngineConfig,
    title: String,
    key_bindings: HashMap<KeyCode, Stage>,
    listeners: Vec<StageListener>,
}

impl Simulation {
    pub fn new() -> Self {
        let key_bindings = HashMap::from([
            (KeyCode::Enter, Stage::Enter),
            (KeyCode::KeyA, Stage::Avatar),
            (KeyCode::KeyR, Stage::Restart),
            (KeyCode::KeyP, Stage::Preferences),
        ]);
        Self {
            config: EngineConfig::default(),
            title: "Ember Field".to_string(),
            key_bindings,
            listeners: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_particle_count(mut self, count: u32) -> Self {
        self.config.field.particle_count = count;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.field.seed = seed;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Request `stage` when `key` is pressed. Replaces any existing binding.
    pub fn with_key_binding(mut self, key: KeyCode, stage: Stage) -> Self {
        self.key_bindings.insert(key, stage);
        self
    }

    /// Called on every stage change, automatic ones included.
    pub fn on_stage_changed<F>(mut self, listener: F) -> Self
    where
        F: FnMut(Stage) + 'static,
    {
        self.listeners.push(Box::new(listener));
        self
    }

    /// Open the window and run until it is closed.
    pub fn run(self) -> Result<(), SimulationError> {
        let mut engine = ParticleEngine::new(self.config)?;
        engine.set_cpu_simulation(false);
        for listener in self.listeners {
            engine.on_stage_changed(listener);
        }

        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut app = App {
            window: None,
            gpu_state: None,
            engine,
            camera: Camera::new(),
            transform: FieldTransform::default(),
            title: self.title,
            key_bindings: self.key_bindings,
            error: None,
        };
        event_loop.run_app(&mut app)?;

        match app.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

struct App {
    window: Option<Arc<Window>>,
    gpu_state: Option<GpuState>,
    engine: ParticleEngine,
    camera: Camera,
    transform: FieldTransform,
    title: String,
    key_bindings: HashMap<KeyCode, Stage>,
    /// First fatal error; returned from `run` once the loop exits.
    error: Option<SimulationError>,
}

impl App {
    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<(), SimulationError> {
        let window_attrs = Window::default_attributes()
            .with_title(self.title.clone())
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));

        let window = Arc::new(event_loop.create_window(window_attrs)?);
        self.window = Some(window.clone());

        let shaders = self.engine.shaders();
        let slots = self.engine.seeded_slots();
        let palette = self.engine.palette().to_gpu();
        let gpu_state = pollster::block_on(GpuState::new(window, &shaders, &slots, &palette))?;
        self.gpu_state = Some(gpu_state);
        Ok(())
    }

    fn handle_key(&mut self, event: &KeyEvent, event_loop: &ActiveEventLoop) {
        if event.state != ElementState::Pressed || event.repeat {
            return;
        }
        let PhysicalKey::Code(code) = event.physical_key else {
            return;
        };
        if code == KeyCode::Escape {
            event_loop.exit();
            return;
        }
        if let Some(&stage) = self.key_bindings.get(&code) {
            if !self.engine.request_stage(stage) {
                tracing::debug!(%stage, "already in requested stage");
            }
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(gpu_state) = &mut self.gpu_state else {
            return;
        };
        let frame = self.engine.frame_realtime();
        let uniforms = FrameUniforms::new(
            &self.camera,
            &self.transform,
            gpu_state.aspect(),
            &frame,
            gpu_state.particle_count(),
        );
        match gpu_state.render(&uniforms) {
            Ok(_) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                gpu_state.resize(winit::dpi::PhysicalSize {
                    width: gpu_state.config.width,
                    height: gpu_state.config.height,
                })
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                tracing::error!("GPU out of memory, exiting");
                event_loop.exit();
            }
            Err(e) => tracing::warn!(error = ?e, "frame dropped"),
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(err) = self.init(event_loop) {
                tracing::error!(error = %err, "initialization failed");
                self.error = Some(err);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(physical_size) => {
                if let Some(gpu_state) = &mut self.gpu_state {
                    gpu_state.resize(physical_size);
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                self.handle_key(&event, event_loop);
            }
            WindowEvent::RedrawRequested => {
                self.redraw(event_loop);
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_key_bindings() {
        let sim = Simulation::new();
        assert_eq!(sim.key_bindings.get(&KeyCode::Enter), Some(&Stage::Enter));
        assert_eq!(sim.key_bindings.get(&KeyCode::KeyA), Some(&Stage::Avatar));
        assert_eq!(sim.key_bindings.get(&KeyCode::KeyR), Some(&Stage::Restart));
        assert_eq!(sim.key_bindings.get(&KeyCode::KeyP), Some(&Stage::Preferences));
    }

    #[test]
    fn test_builder() {
        let sim = Simulation::new()
            .with_particle_count(128)
            .with_seed(9)
            .with_key_binding(KeyCode::KeyB, Stage::Brand)
            .with_key_binding(KeyCode::Enter, Stage::Restart)
            .on_stage_changed(|_| {});
        assert_eq!(sim.config.field.particle_count, 128);
        assert_eq!(sim.config.field.seed, 9);
        assert_eq!(sim.key_bindings.get(&KeyCode::KeyB), Some(&Stage::Brand));
        assert_eq!(sim.key_bindings.get(&KeyCode::Enter), Some(&Stage::Restart));
        assert_eq!(sim.listeners.len(), 1);
    }

    #[test]
    fn test_invalid_config_fails_before_window() {
        let result = Simulation::new().with_particle_count(0).run();
        assert!(matches!(result, Err(SimulationError::Engine(_))));
    }
}
