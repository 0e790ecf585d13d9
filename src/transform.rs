//! Per-object transforms with cached model matrices.
//!
//! A [`Transform`] stores position, rotation (Euler degrees) and scale and
//! derives a 4x4 model matrix from them. The matrix is cached and only
//! recomputed when one of the mutators ran since the last read, so hot render
//! loops that read the matrix every frame don't pay for the trigonometry
//! unless something actually moved.

use std::cell::Cell;

use cgmath::{Deg, Matrix4, SquareMatrix, Vector3};

/// Position, rotation and scale of a single object.
///
/// Rotation is stored as Euler angles in degrees and applied in the fixed
/// order X, then Y, then Z. Callers that need a different composition order
/// have to pre-compose their rotations before setting them here.
#[derive(Clone, Debug)]
pub struct Transform {
    position: Vector3<f32>,
    rotation: Vector3<f32>,
    scale: Vector3<f32>,
    cached: Cell<Matrix4<f32>>,
    dirty: Cell<bool>,
}

impl Transform {
    /// Identity transform: origin, no rotation, unit scale.
    pub fn new() -> Self {
        Self {
            position: Vector3::new(0.0, 0.0, 0.0),
            rotation: Vector3::new(0.0, 0.0, 0.0),
            scale: Vector3::new(1.0, 1.0, 1.0),
            cached: Cell::new(Matrix4::identity()),
            dirty: Cell::new(false),
        }
    }

    pub fn from_position(position: Vector3<f32>) -> Self {
        let mut transform = Self::new();
        transform.set_position(position);
        transform
    }

    pub fn position(&self) -> Vector3<f32> {
        self.position
    }

    /// Euler angles in degrees, applied X then Y then Z.
    pub fn rotation(&self) -> Vector3<f32> {
        self.rotation
    }

    pub fn scale(&self) -> Vector3<f32> {
        self.scale
    }

    pub fn set_position(&mut self, position: Vector3<f32>) {
        self.position = position;
        self.dirty.set(true);
    }

    pub fn translate(&mut self, delta: Vector3<f32>) {
        self.position += delta;
        self.dirty.set(true);
    }

    pub fn set_rotation(&mut self, degrees: Vector3<f32>) {
        self.rotation = degrees;
        self.dirty.set(true);
    }

    pub fn rotate(&mut self, degrees: Vector3<f32>) {
        self.rotation += degrees;
        self.dirty.set(true);
    }

    pub fn set_scale(&mut self, scale: Vector3<f32>) {
        self.scale = scale;
        self.dirty.set(true);
    }

    /// Multiplies the current scale component-wise.
    pub fn scale_by(&mut self, factor: Vector3<f32>) {
        self.scale.x *= factor.x;
        self.scale.y *= factor.y;
        self.scale.z *= factor.z;
        self.dirty.set(true);
    }

    /// The model matrix for the current position/rotation/scale.
    ///
    /// Composed as translate * rotate_x * rotate_y * rotate_z * scale.
    /// Recomputed only when a mutator ran since the last read; the returned
    /// matrix is always consistent with the state at the time of the call.
    pub fn model_matrix(&self) -> Matrix4<f32> {
        if self.dirty.get() {
            let matrix = Matrix4::from_translation(self.position)
                * Matrix4::from_angle_x(Deg(self.rotation.x))
                * Matrix4::from_angle_y(Deg(self.rotation.y))
                * Matrix4::from_angle_z(Deg(self.rotation.z))
                * Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z);
            self.cached.set(matrix);
            self.dirty.set(false);
        }
        self.cached.get()
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_matrix_eq(a: Matrix4<f32>, b: Matrix4<f32>) {
        let a: [[f32; 4]; 4] = a.into();
        let b: [[f32; 4]; 4] = b.into();
        for col in 0..4 {
            for row in 0..4 {
                assert!(
                    (a[col][row] - b[col][row]).abs() < 1e-5,
                    "matrices differ at [{}][{}]: {} vs {}",
                    col,
                    row,
                    a[col][row],
                    b[col][row]
                );
            }
        }
    }

    #[test]
    fn model_matrix_composes_translate_rotate_scale() {
        let mut transform = Transform::new();
        transform.translate(Vector3::new(1.0, 2.0, 3.0));
        transform.translate(Vector3::new(0.5, -1.0, 0.0));
        transform.rotate(Vector3::new(30.0, 0.0, 10.0));
        transform.rotate(Vector3::new(0.0, 45.0, 35.0));
        transform.set_scale(Vector3::new(2.0, 2.0, 0.5));

        let expected = Matrix4::from_translation(Vector3::new(1.5, 1.0, 3.0))
            * Matrix4::from_angle_x(Deg(30.0))
            * Matrix4::from_angle_y(Deg(45.0))
            * Matrix4::from_angle_z(Deg(45.0))
            * Matrix4::from_nonuniform_scale(2.0, 2.0, 0.5);

        assert_matrix_eq(transform.model_matrix(), expected);
    }

    #[test]
    fn matrix_tracks_every_mutator() {
        let mut transform = Transform::new();
        assert_matrix_eq(transform.model_matrix(), Matrix4::identity());

        transform.set_position(Vector3::new(4.0, 0.0, 0.0));
        assert_matrix_eq(
            transform.model_matrix(),
            Matrix4::from_translation(Vector3::new(4.0, 0.0, 0.0)),
        );

        // A second read without mutation returns the same cached matrix.
        assert_matrix_eq(
            transform.model_matrix(),
            Matrix4::from_translation(Vector3::new(4.0, 0.0, 0.0)),
        );

        transform.scale_by(Vector3::new(3.0, 1.0, 1.0));
        let expected = Matrix4::from_translation(Vector3::new(4.0, 0.0, 0.0))
            * Matrix4::from_nonuniform_scale(3.0, 1.0, 1.0);
        assert_matrix_eq(transform.model_matrix(), expected);
    }

    #[test]
    fn clone_preserves_state() {
        let mut transform = Transform::new();
        transform.set_rotation(Vector3::new(0.0, 90.0, 0.0));
        let clone = transform.clone();
        assert_matrix_eq(clone.model_matrix(), transform.model_matrix());
    }
}
