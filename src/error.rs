//! Error types for emberfield.
//!
//! Initialization failures are fatal: the engine cannot render without its
//! particle buffers, so every error here surfaces to the caller of
//! [`Simulation::run`](crate::Simulation::run) instead of degrading silently.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while generating the particle field.
#[derive(Debug, Error, PartialEq)]
pub enum FieldError {
    /// A field needs at least one particle slot.
    #[error("particle field must contain at least one particle")]
    EmptyField,
    /// The seed table does not cover every slot.
    #[error("seed table has {actual} entries but the field has {expected} slots")]
    SeedCountMismatch { expected: usize, actual: usize },
    /// A seed lies outside `[0, 1)`.
    #[error("seed {value} at slot {index} is outside [0, 1)")]
    SeedOutOfRange { index: usize, value: f32 },
    /// No palette band contributes any colour.
    #[error("palette must contain at least one colour")]
    EmptyPalette,
    /// A band has a non-finite base colour or a variance that is negative or non-finite.
    #[error("palette band {index} has a non-finite base colour or an invalid variance")]
    InvalidPaletteBand { index: usize },
}

/// Errors raised by the stage controller.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StageError {
    /// The requested stage does not exist.
    #[error("unknown stage `{0}`")]
    Unknown(String),
}

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The configuration is not valid TOML or has the wrong shape.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    /// A value is out of its allowed range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Errors that can occur while building the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("particle generation failed: {0}")]
    Field(#[from] FieldError),
}

/// Errors that can occur during GPU initialization.
#[derive(Debug, Error)]
pub enum GpuError {
    /// Failed to create a surface for rendering.
    #[error("failed to create GPU surface: {0}")]
    SurfaceCreation(#[from] wgpu::CreateSurfaceError),
    /// No compatible GPU adapter found.
    #[error("no compatible GPU adapter found; WebGPU/Vulkan/Metal/DX12 support is required")]
    NoAdapter,
    /// Failed to create GPU device.
    #[error("failed to create GPU device: {0}")]
    DeviceCreation(#[from] wgpu::RequestDeviceError),
    /// A particle buffer would exceed what the device can bind.
    #[error("{label} needs {size} bytes but the device allows at most {limit}")]
    BufferTooLarge {
        label: &'static str,
        size: u64,
        limit: u64,
    },
}

/// Errors that can occur when running a simulation.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// Failed to create event loop.
    #[error("failed to create event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    /// Failed to create window.
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    /// GPU initialization failed.
    #[error("GPU error: {0}")]
    Gpu(#[from] GpuError),
    /// The engine could not be built.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = FieldError::SeedCountMismatch {
            expected: 4,
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "seed table has 3 entries but the field has 4 slots"
        );
        assert_eq!(
            StageError::Unknown("lobby".into()).to_string(),
            "unknown stage `lobby`"
        );
    }

    #[test]
    fn test_engine_error_wraps_field_error() {
        let err: EngineError = FieldError::EmptyField.into();
        assert!(err.to_string().contains("at least one particle"));
        let err: SimulationError = err.into();
        assert!(matches!(err, SimulationError::Engine(EngineError::Field(_))));
    }
}
