//! Node transforms with cached world matrices
//!
//! There is no change detection: every setter marks the transform dirty and
//! the next propagation pass recomputes the world matrix of the node and of
//! everything below it.

use glam::{Mat3, Vec2};
use mono_gfx::math::{self, Matrix, Vector};

#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    position: Vector,
    /// Degrees
    rotation: f32,
    scale: Vector,

    dirty: bool,
    world: Matrix,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            rotation: 0.0,
            scale: Vec2::ONE,
            dirty: true,
            world: Mat3::IDENTITY,
        }
    }
}

impl Transform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_position(position: Vector) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn with_rotation(mut self, degrees: f32) -> Self {
        self.set_rotation(degrees);
        self
    }

    pub fn with_scale(mut self, scale: Vector) -> Self {
        self.set_scale(scale);
        self
    }

    pub fn position(&self) -> Vector {
        self.position
    }

    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    pub fn scale(&self) -> Vector {
        self.scale
    }

    pub fn set_position(&mut self, position: Vector) {
        self.position = position;
        self.mark_dirty();
    }

    pub fn set_rotation(&mut self, degrees: f32) {
        self.rotation = degrees;
        self.mark_dirty();
    }

    pub fn set_scale(&mut self, scale: Vector) {
        self.scale = scale;
        self.mark_dirty();
    }

    pub fn translate(&mut self, delta: Vector) {
        self.position += delta;
        self.mark_dirty();
    }

    pub fn rotate(&mut self, degrees: f32) {
        self.rotation += degrees;
        self.mark_dirty();
    }

    /// Force recomputation on the next propagation pass
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Translate, rotate, scale for this node alone
    pub fn local_matrix(&self) -> Matrix {
        math::compose(self.position, self.rotation, self.scale)
    }

    /// World matrix as of the last recomputation
    pub fn world_matrix(&self) -> &Matrix {
        &self.world
    }

    /// World-space position as of the last recomputation
    pub fn world_position(&self) -> Vector {
        math::get_translation(&self.world)
    }

    /// `world = parent * local`, then clean
    pub(crate) fn recompute(&mut self, parent: &Matrix) {
        self.world = math::mul(parent, &self.local_matrix());
        self.dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_transform_is_dirty() {
        let transform = Transform::new();
        assert!(transform.is_dirty());
        assert_eq!(transform.scale(), Vec2::ONE);
        assert_eq!(*transform.world_matrix(), Mat3::IDENTITY);
    }

    #[test]
    fn test_setters_mark_dirty() {
        let mut transform = Transform::new();
        transform.recompute(&Mat3::IDENTITY);
        assert!(!transform.is_dirty());

        transform.translate(Vec2::new(1.0, 2.0));
        assert!(transform.is_dirty());
        transform.recompute(&Mat3::IDENTITY);

        transform.rotate(15.0);
        assert!(transform.is_dirty());
        transform.recompute(&Mat3::IDENTITY);

        transform.set_scale(Vec2::splat(2.0));
        assert!(transform.is_dirty());
    }

    #[test]
    fn test_recompute_applies_parent() {
        let parent = math::translation(Vec2::new(10.0, 0.0));
        let mut child = Transform::new().with_rotation(90.0);
        child.recompute(&parent);

        let mapped = math::transform_point(child.world_matrix(), Vec2::X);
        assert!((mapped - Vec2::new(10.0, 1.0)).length() < 1e-4);
        assert!((child.world_position() - Vec2::new(10.0, 0.0)).length() < 1e-4);
    }
}
