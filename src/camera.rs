//! Fixed camera and the field's model transform.

use std::f32::consts::PI;

use glam::{EulerRot, Mat4, Quat, Vec3};

/// Perspective camera looking down the negative z axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn new() -> Self {
        Self {
            eye: Vec3::new(0.0, 0.0, 8.0),
            target: Vec3::ZERO,
            fov_y: 110f32.to_radians(),
            near: 0.1,
            far: 100.0,
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, Vec3::Y)
    }

    pub fn projection(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, aspect.max(f32::EPSILON), self.near, self.far)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

/// Placement of the whole particle field in the world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldTransform {
    pub translation: Vec3,
    /// Euler angles in radians, applied in XYZ order.
    pub rotation: Vec3,
}

impl FieldTransform {
    pub fn model_matrix(&self) -> Mat4 {
        let rotation = Quat::from_euler(
            EulerRot::XYZ,
            self.rotation.x,
            self.rotation.y,
            self.rotation.z,
        );
        Mat4::from_rotation_translation(rotation, self.translation)
    }

    /// World position of a point in field space.
    pub fn to_world(&self, local: Vec3) -> Vec3 {
        self.model_matrix().transform_point3(local)
    }
}

impl Default for FieldTransform {
    fn default() -> Self {
        Self {
            translation: Vec3::new(0.0, -2.5, 0.0),
            rotation: Vec3::new(0.0, 0.3, PI / 12.0),
        }
    }
}
