//! Per-frame uniform block shared by the animator and render passes.

use bytemuck::{Pod, Zeroable};

use crate::camera::{Camera, FieldTransform};
use crate::engine::FrameState;

/// GPU uniform layout (208 bytes).
///
/// `enter_progress` is written by the host before the frame's compute
/// submission and is read-only on the GPU.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct FrameUniforms {
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    pub time: f32,
    pub delta_time: f32,
    pub enter_progress: f32,
    pub particle_count: u32,
}

impl FrameUniforms {
    pub const WGSL_STRUCT: &'static str = r#"struct Uniforms {
    view: mat4x4<f32>,
    proj: mat4x4<f32>,
    model: mat4x4<f32>,
    time: f32,
    delta_time: f32,
    enter_progress: f32,
    particle_count: u32,
}
"#;

    /// Zeroed uniforms, uploaded before the first frame.
    pub fn idle(particle_count: u32) -> Self {
        Self {
            particle_count,
            ..Self::zeroed()
        }
    }

    pub fn new(
        camera: &Camera,
        transform: &FieldTransform,
        aspect: f32,
        frame: &FrameState,
        particle_count: u32,
    ) -> Self {
        Self {
            view: camera.view_matrix().to_cols_array_2d(),
            proj: camera.projection(aspect).to_cols_array_2d(),
            model: transform.model_matrix().to_cols_array_2d(),
            time: frame.time,
            delta_time: frame.delta,
            enter_progress: frame.enter_progress.clamp(0.0, 1.0),
            particle_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::Stage;

    #[test]
    fn test_layout() {
        assert_eq!(std::mem::size_of::<FrameUniforms>(), 208);
    }

    #[test]
    fn test_snapshot_clamps_progress() {
        let frame = FrameState {
            time: 3.0,
            delta: 0.016,
            enter_progress: 1.5,
            stage: Stage::Brand,
        };
        let u = FrameUniforms::new(&Camera::new(), &FieldTransform::default(), 1.5, &frame, 64);
        assert_eq!(u.enter_progress, 1.0);
        assert_eq!(u.time, 3.0);
        assert_eq!(u.particle_count, 64);
    }
}
