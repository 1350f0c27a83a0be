//! Camera-follow behaviour
//!
//! The camera itself is a world-space offset stored in the
//! [`World`](crate::World) and subtracted from every drawn point.
//! [`CameraFollow`] moves it to keep its node on screen.

use crate::component::Component;
use crate::node::NodeId;
use crate::world::World;
use glam::Vec2;
use mono_gfx::Vector;

/// Directions the camera may move in (bitfield)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FollowDirections(pub u8);

impl FollowDirections {
    pub const NONE: Self = Self(0);
    pub const LEFT: Self = Self(1 << 1);
    pub const RIGHT: Self = Self(1 << 2);
    pub const UP: Self = Self(1 << 3);
    pub const DOWN: Self = Self(1 << 4);
    pub const HORIZONTAL: Self = Self(Self::LEFT.0 | Self::RIGHT.0);
    pub const VERTICAL: Self = Self(Self::UP.0 | Self::DOWN.0);
    pub const ALL: Self = Self(Self::HORIZONTAL.0 | Self::VERTICAL.0);

    pub fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    pub fn is_none(&self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for FollowDirections {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Distance in pixels the node may travel from the camera anchor before
/// the camera is pushed along
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DeadZone {
    pub left: f32,
    pub right: f32,
    pub up: f32,
    pub down: f32,
}

impl DeadZone {
    pub fn new(left: f32, right: f32, up: f32, down: f32) -> Self {
        Self {
            left,
            right,
            up,
            down,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CameraFollow {
    directions: FollowDirections,
    zone: DeadZone,
    half_screen: Vector,
    /// Added to the node position to get the camera position
    center: Vector,
}

impl CameraFollow {
    /// Follower that keeps the node at the centre of a `width` x `height`
    /// screen
    pub fn new(width: u32, height: u32) -> Self {
        let half_screen = Vec2::new(width as f32, height as f32) / 2.0;
        Self {
            directions: FollowDirections::NONE,
            zone: DeadZone::default(),
            half_screen,
            center: -half_screen,
        }
    }

    pub fn with_directions(mut self, directions: FollowDirections) -> Self {
        self.directions = directions;
        self
    }

    pub fn with_dead_zone(mut self, zone: DeadZone) -> Self {
        self.zone = zone;
        self
    }

    pub fn set_directions(&mut self, directions: FollowDirections) {
        self.directions = directions;
    }

    pub fn set_dead_zone(&mut self, zone: DeadZone) {
        self.zone = zone;
    }

    /// Screen point the node is anchored to
    pub fn shift(&mut self, anchor: Vector) {
        self.center = -anchor;
    }

    /// A dead-zone edge spanning half the screen pins the camera to the node
    fn snaps(&self) -> bool {
        self.zone.left == self.half_screen.x
            || self.zone.right == self.half_screen.x
            || self.zone.up == self.half_screen.y
            || self.zone.down == self.half_screen.y
    }

    /// Camera position for a node at `position`, given the current camera
    pub fn follow(&self, position: Vector, camera: Vector) -> Vector {
        if self.directions.is_none() {
            return camera;
        }

        let target = position + self.center;
        if self.snaps() {
            return target;
        }

        let d = self.directions;
        let z = self.zone;
        let mut out = camera;

        if d.contains(FollowDirections::LEFT) && target.x < camera.x - z.left {
            out.x = target.x + z.left;
        } else if d.contains(FollowDirections::RIGHT) && target.x > camera.x + z.right {
            out.x = target.x - z.right;
        }

        if d.contains(FollowDirections::UP) && target.y < camera.y - z.up {
            out.y = target.y + z.up;
        } else if d.contains(FollowDirections::DOWN) && target.y > camera.y + z.down {
            out.y = target.y - z.down;
        }

        out
    }
}

impl Component for CameraFollow {
    fn update(&mut self, node: NodeId, _dt: f32, world: &mut World) {
        let Some(position) = world.transform(node).map(|t| t.world_position()) else {
            return;
        };
        let camera = self.follow(position, world.camera());
        world.set_camera(camera);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;

    #[test]
    fn test_directions() {
        let d = FollowDirections::LEFT | FollowDirections::UP;
        assert!(d.contains(FollowDirections::LEFT));
        assert!(!d.contains(FollowDirections::RIGHT));
        assert!(!d.contains(FollowDirections::NONE));
        assert!(FollowDirections::ALL.contains(FollowDirections::VERTICAL));
    }

    #[test]
    fn test_disabled_keeps_camera() {
        let follow = CameraFollow::new(128, 64);
        let camera = Vec2::new(3.0, 4.0);
        assert_eq!(follow.follow(Vec2::new(500.0, 500.0), camera), camera);
    }

    #[test]
    fn test_snap_to_center() {
        let follow = CameraFollow::new(128, 64)
            .with_directions(FollowDirections::ALL)
            .with_dead_zone(DeadZone::new(64.0, 0.0, 0.0, 0.0));
        let camera = follow.follow(Vec2::new(100.0, 40.0), Vec2::ZERO);
        assert_eq!(camera, Vec2::new(36.0, 8.0));
    }

    #[test]
    fn test_dead_zone_pushes() {
        let follow = CameraFollow::new(128, 64)
            .with_directions(FollowDirections::HORIZONTAL)
            .with_dead_zone(DeadZone::new(10.0, 10.0, 10.0, 10.0));

        // Target x = 70 - 64 = 6, inside [-10, 10] of camera 0
        assert_eq!(follow.follow(Vec2::new(70.0, 32.0), Vec2::ZERO), Vec2::ZERO);

        // Target x = 84 - 64 = 20, 10 past the right edge
        assert_eq!(
            follow.follow(Vec2::new(84.0, 32.0), Vec2::ZERO),
            Vec2::new(10.0, 0.0)
        );

        // Target x = 40 - 64 = -24, 14 past the left edge
        assert_eq!(
            follow.follow(Vec2::new(40.0, 32.0), Vec2::ZERO),
            Vec2::new(-14.0, 0.0)
        );

        // Vertical movement is not followed
        assert_eq!(follow.follow(Vec2::new(64.0, 500.0), Vec2::ZERO), Vec2::ZERO);
    }

    #[test]
    fn test_shift_moves_anchor() {
        let mut follow = CameraFollow::new(128, 64)
            .with_directions(FollowDirections::ALL)
            .with_dead_zone(DeadZone::new(64.0, 64.0, 32.0, 32.0));
        follow.shift(Vec2::new(16.0, 16.0));
        assert_eq!(
            follow.follow(Vec2::new(16.0, 16.0), Vec2::new(5.0, 5.0)),
            Vec2::ZERO
        );
    }

    #[test]
    fn test_component_updates_world_camera() {
        let mut world = World::new(128, 64);
        let follow = CameraFollow::new(128, 64)
            .with_directions(FollowDirections::ALL)
            .with_dead_zone(DeadZone::new(64.0, 64.0, 32.0, 32.0));
        world
            .set_scene(Node::at(Vec2::new(80.0, 40.0)).with_component(follow))
            .unwrap();

        world.update_tree(0.016);
        assert_eq!(world.camera(), Vec2::new(16.0, 8.0));
    }
}
