//! Camera types and the view/projection uniform layout.
//!
//! The engine renders from a single [`Camera`]. How the camera moves is up to
//! the application: anything implementing [`CameraController`] can be attached
//! to a scene and is advanced once per frame with the elapsed time.

use cgmath::{InnerSpace, Matrix4, Point3, Rad, Vector3};
use instant::Duration;

/// Converts from the OpenGL clip space cgmath produces (z in -1..1) to the
/// wgpu clip space (z in 0..1).
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// A free camera described by position, yaw and pitch.
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pub position: Point3<f32>,
    pub yaw: Rad<f32>,
    pub pitch: Rad<f32>,
}

impl Camera {
    pub fn new<V, Y, P>(position: V, yaw: Y, pitch: P) -> Self
    where
        V: Into<Point3<f32>>,
        Y: Into<Rad<f32>>,
        P: Into<Rad<f32>>,
    {
        Self {
            position: position.into(),
            yaw: yaw.into(),
            pitch: pitch.into(),
        }
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        let (sin_pitch, cos_pitch) = self.pitch.0.sin_cos();
        let (sin_yaw, cos_yaw) = self.yaw.0.sin_cos();

        Matrix4::look_to_rh(
            self.position,
            Vector3::new(cos_pitch * cos_yaw, sin_pitch, cos_pitch * sin_yaw).normalize(),
            Vector3::unit_y(),
        )
    }
}

/// Per-frame camera movement hook.
///
/// The scene calls `update` once per frame after all object hooks ran. The
/// engine ships no controller of its own; input handling lives with the
/// application.
pub trait CameraController {
    fn update(&mut self, camera: &mut Camera, dt: Duration);
}

/// CPU mirror of the shared frame uniform buffer: the view matrix at byte
/// offset 0 and the projection matrix at byte offset 64, 128 bytes total.
/// The WGSL side of this contract lives in the shaders under `pipelines/`.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameUniform {
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
}
