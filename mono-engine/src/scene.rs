//! Scene arena and render list
//!
//! Nodes live in a generational arena indexed by [`NodeId`]. The scene owns
//! the tree links (parent, children), the per-node transforms and the render
//! list. Lifecycle hooks are not run here; [`World`](crate::World) drives
//! activation and calls into the scene for the structural bookkeeping.

use crate::component::Component;
use crate::error::{SceneError, SceneResult};
use crate::node::{Node, NodeId, Visual};
use crate::transform::Transform;
use glam::{Mat3, Vec2};
use mono_gfx::{Canvas, Matrix, PixelColor};

pub(crate) struct ComponentSlot {
    /// Taken out while one of its hooks runs
    pub(crate) component: Option<Box<dyn Component>>,
    pub(crate) started: bool,
}

pub(crate) struct NodeData {
    pub(crate) transform: Transform,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) components: Vec<ComponentSlot>,
    pub(crate) visual: Option<Visual>,
    pub(crate) active: bool,
    corners_stale: bool,
}

impl NodeData {
    /// Flag the cached render corners for refresh after a recompute
    pub(crate) fn mark_corners_stale(&mut self) {
        if matches!(self.visual, Some(Visual::Sprite(_))) {
            self.corners_stale = true;
        }
    }
}

/// One drawable node in paint order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderEntry {
    pub node: NodeId,
    /// World-space quad corners, refreshed whenever the node's world matrix
    /// is recomputed. Zero for custom visuals.
    pub corners: [Vec2; 4],
}

/// Scene statistics
#[derive(Debug, Clone, Copy)]
pub struct SceneStats {
    pub nodes: usize,
    pub active_nodes: usize,
    pub renderables: usize,
}

pub struct Scene {
    nodes: Vec<Option<NodeData>>,
    generations: Vec<u32>,
    free_indices: Vec<usize>,

    root: Option<NodeId>,
    render_list: Vec<RenderEntry>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

fn lookup<'a>(
    nodes: &'a [Option<NodeData>],
    generations: &[u32],
    id: NodeId,
) -> Option<&'a NodeData> {
    let index = id.index() as usize;
    if generations.get(index) != Some(&id.generation()) {
        return None;
    }
    nodes[index].as_ref()
}

fn lookup_mut<'a>(
    nodes: &'a mut [Option<NodeData>],
    generations: &[u32],
    id: NodeId,
) -> Option<&'a mut NodeData> {
    let index = id.index() as usize;
    if generations.get(index) != Some(&id.generation()) {
        return None;
    }
    nodes[index].as_mut()
}

impl Scene {
    pub fn new() -> Self {
        Self::with_capacity(16)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            generations: Vec::with_capacity(capacity),
            free_indices: Vec::new(),
            root: None,
            render_list: Vec::with_capacity(capacity),
        }
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub(crate) fn set_root(&mut self, root: Option<NodeId>) {
        self.root = root;
    }

    /// Whether `id` refers to a live node
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.nodes.len() - self.free_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn get(&self, id: NodeId) -> Option<&NodeData> {
        lookup(&self.nodes, &self.generations, id)
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        lookup_mut(&mut self.nodes, &self.generations, id)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|node| node.parent)
    }

    /// Children in insertion order; empty for a stale id
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self.get(id) {
            Some(node) => &node.children,
            None => &[],
        }
    }

    pub fn is_active(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(|node| node.active)
    }

    pub fn component_count(&self, id: NodeId) -> usize {
        self.get(id).map_or(0, |node| node.components.len())
    }

    pub fn transform(&self, id: NodeId) -> Option<&Transform> {
        self.get(id).map(|node| &node.transform)
    }

    pub fn transform_mut(&mut self, id: NodeId) -> Option<&mut Transform> {
        self.get_mut(id).map(|node| &mut node.transform)
    }

    pub fn world_matrix(&self, id: NodeId) -> Option<Matrix> {
        self.get(id).map(|node| *node.transform.world_matrix())
    }

    /// World matrix of the parent, identity for roots and detached nodes
    pub(crate) fn parent_world(&self, id: NodeId) -> Matrix {
        self.parent(id)
            .and_then(|parent| self.world_matrix(parent))
            .unwrap_or(Mat3::IDENTITY)
    }

    /// True when `ancestor` is `id` or lies on its parent chain
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Active nodes with a visual, in paint order
    pub fn render_list(&self) -> &[RenderEntry] {
        &self.render_list
    }

    pub fn stats(&self) -> SceneStats {
        let active_nodes = self
            .nodes
            .iter()
            .flatten()
            .filter(|node| node.active)
            .count();

        SceneStats {
            nodes: self.len(),
            active_nodes,
            renderables: self.render_list.len(),
        }
    }

    fn insert(&mut self, data: NodeData) -> NodeId {
        if let Some(index) = self.free_indices.pop() {
            self.nodes[index] = Some(data);
            return NodeId::from_parts(index as u32, self.generations[index]);
        }

        let index = self.nodes.len();
        self.nodes.push(Some(data));
        self.generations.push(0);
        NodeId::from_parts(index as u32, 0)
    }

    fn remove(&mut self, id: NodeId) -> Option<NodeData> {
        let index = id.index() as usize;
        if self.generations.get(index) != Some(&id.generation()) {
            return None;
        }

        let removed = self.nodes[index].take();
        if removed.is_some() {
            self.generations[index] = self.generations[index].wrapping_add(1);
            self.free_indices.push(index);
        }
        removed
    }

    /// Move a blueprint into the arena as an inactive subtree
    ///
    /// Storage for the whole subtree is reserved up front, so a failed
    /// allocation leaves the arena untouched.
    pub(crate) fn spawn(&mut self, blueprint: Node, parent: Option<NodeId>) -> SceneResult<NodeId> {
        let needed = blueprint.subtree_len().saturating_sub(self.free_indices.len());
        self.nodes
            .try_reserve(needed)
            .map_err(|_| SceneError::Allocation)?;
        self.generations
            .try_reserve(needed)
            .map_err(|_| SceneError::Allocation)?;

        Ok(self.spawn_reserved(blueprint, parent))
    }

    fn spawn_reserved(&mut self, blueprint: Node, parent: Option<NodeId>) -> NodeId {
        let Node {
            transform,
            children,
            components,
            visual,
        } = blueprint;

        let id = self.insert(NodeData {
            transform,
            parent,
            children: Vec::with_capacity(children.len()),
            components: components
                .into_iter()
                .map(|component| ComponentSlot {
                    component: Some(component),
                    started: false,
                })
                .collect(),
            visual,
            active: false,
            corners_stale: false,
        });

        for child in children {
            let child_id = self.spawn_reserved(child, Some(id));
            if let Some(node) = self.get_mut(id) {
                node.children.push(child_id);
            }
        }

        id
    }

    /// Link `child` as the last child of `parent`
    pub(crate) fn link(&mut self, parent: NodeId, child: NodeId) {
        if let Some(node) = self.get_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.get_mut(parent) {
            node.children.push(child);
        }
    }

    /// Cut `id` from its parent, or clear the root if it is the root
    pub(crate) fn unlink(&mut self, id: NodeId) {
        if self.root == Some(id) {
            self.root = None;
        }

        let Some(parent) = self.get_mut(id).and_then(|node| node.parent.take()) else {
            return;
        };
        if let Some(node) = self.get_mut(parent) {
            if let Some(pos) = node.children.iter().position(|&c| c == id) {
                node.children.remove(pos);
            }
        }
    }

    /// Release `id` and every descendant. Returns the number of nodes freed.
    pub(crate) fn remove_subtree(&mut self, id: NodeId) -> usize {
        let mut removed = 0;
        let mut stack = vec![id];

        while let Some(current) = stack.pop() {
            if let Some(node) = self.remove(current) {
                self.unregister_render(current);
                stack.extend(node.children);
                removed += 1;
            }
        }

        removed
    }

    pub(crate) fn register_render(&mut self, id: NodeId) {
        let Some(node) = self.get_mut(id) else {
            return;
        };

        let corners = match &node.visual {
            Some(Visual::Sprite(data)) => data.quad.transformed(node.transform.world_matrix()),
            Some(Visual::Custom(_)) => [Vec2::ZERO; 4],
            None => return,
        };

        if self.render_list.iter().any(|entry| entry.node == id) {
            log::warn!("Node {} is already in the render list", id);
            return;
        }
        self.render_list.push(RenderEntry { node: id, corners });
    }

    pub(crate) fn unregister_render(&mut self, id: NodeId) {
        if let Some(pos) = self.render_list.iter().position(|entry| entry.node == id) {
            self.render_list.remove(pos);
        }
    }

    /// Recompute world matrices top-down from the root
    ///
    /// A node is recomputed when it or any ancestor is dirty. Returns the
    /// number of matrices recomputed. Cached render corners of recomputed
    /// sprites are refreshed afterwards.
    pub fn propagate_transforms(&mut self) -> usize {
        let mut recomputed = 0;

        if let Some(root) = self.root {
            let mut stack = vec![(root, Mat3::IDENTITY, false)];

            while let Some((id, parent_world, inherited)) = stack.pop() {
                let Some(node) = self.get_mut(id) else {
                    log::warn!("Skipping stale node {} during propagation", id);
                    continue;
                };

                let dirty = inherited || node.transform.is_dirty();
                if dirty {
                    node.transform.recompute(&parent_world);
                    node.mark_corners_stale();
                    recomputed += 1;
                }

                let world = *node.transform.world_matrix();
                for &child in node.children.iter().rev() {
                    stack.push((child, world, dirty));
                }
            }
        }

        self.refresh_corners();
        recomputed
    }

    fn refresh_corners(&mut self) {
        let Scene {
            nodes,
            generations,
            render_list,
            ..
        } = self;

        for entry in render_list.iter_mut() {
            let Some(node) = lookup_mut(nodes, generations, entry.node) else {
                continue;
            };
            if !node.corners_stale {
                continue;
            }
            node.corners_stale = false;

            if let Some(Visual::Sprite(data)) = &node.visual {
                entry.corners = data.quad.transformed(node.transform.world_matrix());
            }
        }
    }

    /// Paint the render list in order. Returns the number of entries drawn.
    pub fn render(&mut self, canvas: &mut Canvas<'_>) -> usize {
        let Scene {
            nodes,
            generations,
            render_list,
            ..
        } = self;

        let mut drawn = 0;
        for entry in render_list.iter() {
            let Some(node) = lookup_mut(nodes, generations, entry.node) else {
                log::warn!("Render list entry {} has no node, skipping", entry.node);
                continue;
            };

            canvas.set_transform(*node.transform.world_matrix());

            match &mut node.visual {
                Some(Visual::Sprite(data)) => {
                    // Untextured quads fill with their own color
                    canvas.set_color(data.color);
                    canvas.rasterize_corners(data, &entry.corners);
                }
                Some(Visual::Custom(draw)) => {
                    canvas.set_color(PixelColor::Black);
                    draw.draw(canvas);
                }
                None => {
                    log::warn!("Node {} in render list has no visual", entry.node);
                    continue;
                }
            }
            drawn += 1;
        }

        canvas.reset_transform();
        drawn
    }
}
