//! Behaviour attached to nodes

use crate::node::NodeId;
use crate::world::World;
use mono_gfx::Canvas;

/// Lifecycle hooks of a component
///
/// `start` fires once when the owning node becomes active (or when the
/// component is added to an already active node), always before the first
/// `update`. `end` fires once when the node is detached or freed, and never
/// for a component that did not start. The component value itself is the
/// hook state.
///
/// Tree changes requested from inside a hook (attach, detach, free, adding
/// components) are queued and applied once the outermost hook-running world
/// operation returns. Transform changes apply immediately.
pub trait Component: Send {
    fn start(&mut self, _node: NodeId, _world: &mut World) {}

    fn update(&mut self, _node: NodeId, _dt: f32, _world: &mut World) {}

    fn end(&mut self, _node: NodeId, _world: &mut World) {}
}

/// Custom painting for a node
///
/// Called with the node's world transform set on the canvas and the draw
/// color reset to black.
pub trait Draw: Send {
    fn draw(&mut self, canvas: &mut Canvas<'_>);
}

impl<F> Draw for F
where
    F: FnMut(&mut Canvas<'_>) + Send,
{
    fn draw(&mut self, canvas: &mut Canvas<'_>) {
        self(canvas)
    }
}
