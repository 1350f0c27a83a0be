//! Node handles and blueprints
//!
//! A [`Node`] is an inert description of an entity: transform, children,
//! components and an optional visual. Handing it to the world moves it into
//! the scene arena, after which it is addressed by a [`NodeId`].

use crate::component::{Component, Draw};
use crate::transform::Transform;
use mono_gfx::{RenderData, Vector};
use std::fmt;

/// Generational handle into the scene arena
///
/// Ids of freed nodes go stale; every lookup through a stale id behaves as
/// a null node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    pub(crate) fn from_parts(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// What a node paints
pub enum Visual {
    /// Quad rasterized from cached world-space corners
    Sprite(RenderData),
    /// Arbitrary drawing with the node's world transform active
    Custom(Box<dyn Draw>),
}

impl fmt::Debug for Visual {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visual::Sprite(data) => f.debug_tuple("Sprite").field(data).finish(),
            Visual::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// Blueprint for a subtree
#[derive(Default)]
pub struct Node {
    pub(crate) transform: Transform,
    pub(crate) children: Vec<Node>,
    pub(crate) components: Vec<Box<dyn Component>>,
    pub(crate) visual: Option<Visual>,
}

impl Node {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(position: Vector) -> Self {
        Self::new().with_transform(Transform::from_position(position))
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_component(mut self, component: impl Component + 'static) -> Self {
        self.components.push(Box::new(component));
        self
    }

    pub fn with_sprite(mut self, data: RenderData) -> Self {
        self.visual = Some(Visual::Sprite(data));
        self
    }

    pub fn with_draw(mut self, draw: impl Draw + 'static) -> Self {
        self.visual = Some(Visual::Custom(Box::new(draw)));
        self
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }

    /// Nodes in this blueprint, itself included
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(Node::subtree_len).sum::<usize>()
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("transform", &self.transform)
            .field("children", &self.children)
            .field("components", &self.components.len())
            .field("visual", &self.visual)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use mono_gfx::Quad;

    #[test]
    fn test_blueprint_builder() {
        let node = Node::at(Vec2::new(4.0, 2.0))
            .with_sprite(RenderData::filled(Quad::rect(0.0, 0.0, 8.0, 8.0)))
            .with_child(Node::new().with_child(Node::new()))
            .with_child(Node::new());

        assert_eq!(node.transform().position(), Vec2::new(4.0, 2.0));
        assert!(matches!(node.visual, Some(Visual::Sprite(_))));
        assert_eq!(node.subtree_len(), 4);
    }

    #[test]
    fn test_node_id_display() {
        assert_eq!(NodeId::from_parts(3, 7).to_string(), "3v7");
    }
}
