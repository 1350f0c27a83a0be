//! Shared run-time state
//!
//! The world owns the scene, input snapshot, camera, timed callbacks and the
//! music player. It is the context every component hook and timer callback
//! receives. The engine keeps it behind a single lock that the frame loop
//! holds for a whole tick and the input producer takes per event.

use crate::component::Component;
use crate::error::{SceneError, SceneResult};
use crate::input::{InputEvent, InputState};
use crate::node::{Node, NodeId};
use crate::scene::{RenderEntry, Scene};
use crate::scheduler::{Scheduler, TimerId};
use crate::transform::Transform;
use crate::tweener::{Tween, TweenId, Tweener};
use mono_audio::{MusicPlayer, PlayerConfig};
use mono_gfx::{Canvas, Framebuffer, Matrix, Vector};
use std::collections::VecDeque;
use std::ops::ControlFlow;

/// Tree change requested while a hook was running
enum Deferred {
    SetRoot(NodeId),
    /// `spawned` subtrees were created by `add_child` and are released if
    /// the attach can no longer happen
    Attach {
        parent: NodeId,
        child: NodeId,
        spawned: bool,
    },
    Detach(NodeId),
    Free(NodeId),
    AddComponent(NodeId, Box<dyn Component>),
}

fn scheduler_of(world: &mut World) -> &mut Scheduler<World> {
    &mut world.scheduler
}

fn tweener_of(world: &mut World) -> &mut Tweener<World> {
    &mut world.tweener
}

pub struct World {
    scene: Scene,
    input: InputState,
    camera: Vector,
    screen: (u32, u32),
    delta_time: f32,
    dirty: bool,
    exit: bool,

    scheduler: Scheduler<World>,
    tweener: Tweener<World>,
    audio: MusicPlayer,

    hook_depth: u32,
    flushing: bool,
    deferred: VecDeque<Deferred>,
}

impl World {
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_audio(width, height, PlayerConfig::default())
    }

    pub fn with_audio(width: u32, height: u32, audio: PlayerConfig) -> Self {
        Self {
            scene: Scene::new(),
            input: InputState::new(),
            camera: Vector::ZERO,
            screen: (width, height),
            delta_time: 0.0,
            dirty: true,
            exit: false,
            scheduler: Scheduler::new(),
            tweener: Tweener::new(),
            audio: MusicPlayer::new(audio),
            hook_depth: 0,
            flushing: false,
            deferred: VecDeque::new(),
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn screen_size(&self) -> (u32, u32) {
        self.screen
    }

    // --- State flags ---

    /// Seconds covered by the current tick
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Request a redraw on the next presented frame
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn request_exit(&mut self) {
        self.exit = true;
    }

    pub fn exit_requested(&self) -> bool {
        self.exit
    }

    // --- Camera ---

    pub fn camera(&self) -> Vector {
        self.camera
    }

    pub fn set_camera(&mut self, position: Vector) {
        if position != self.camera {
            self.camera = position;
            self.dirty = true;
        }
    }

    pub fn shift_camera(&mut self, delta: Vector) {
        self.set_camera(self.camera + delta);
    }

    // --- Input ---

    pub fn input(&self) -> &InputState {
        &self.input
    }

    pub(crate) fn handle_input(&mut self, event: InputEvent) {
        log::trace!("Input {:?} {:?}", event.key, event.kind);
        if event.is_exit_request() {
            log::debug!("Exit requested from input");
            self.exit = true;
        }
        self.input.record(event);
    }

    pub(crate) fn end_input_tick(&mut self) {
        self.input.end_tick();
    }

    // --- Audio ---

    pub fn audio(&self) -> &MusicPlayer {
        &self.audio
    }

    pub fn audio_mut(&mut self) -> &mut MusicPlayer {
        &mut self.audio
    }

    // --- Node queries ---

    pub fn root(&self) -> Option<NodeId> {
        self.scene.root()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.scene.contains(id)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.scene.parent(id)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.scene.children(id)
    }

    pub fn is_active(&self, id: NodeId) -> bool {
        self.scene.is_active(id)
    }

    pub fn transform(&self, id: NodeId) -> Option<&Transform> {
        self.scene.transform(id)
    }

    /// Mutable transform; setters mark it dirty
    pub fn transform_mut(&mut self, id: NodeId) -> Option<&mut Transform> {
        self.scene.transform_mut(id)
    }

    pub fn world_matrix(&self, id: NodeId) -> Option<Matrix> {
        self.scene.world_matrix(id)
    }

    pub fn render_list(&self) -> &[RenderEntry] {
        self.scene.render_list()
    }

    // --- Tree changes ---

    fn in_hook(&self) -> bool {
        self.hook_depth > 0
    }

    /// Move a blueprint into the world as a detached, inactive subtree
    pub fn spawn(&mut self, node: Node) -> SceneResult<NodeId> {
        self.scene.spawn(node, None)
    }

    /// Install a new scene, freeing the previous tree first
    pub fn set_scene(&mut self, root: Node) -> SceneResult<NodeId> {
        let id = self.spawn(root)?;
        self.set_root(id)?;
        Ok(id)
    }

    /// Make an already spawned, detached subtree the scene root
    pub fn set_root(&mut self, id: NodeId) -> SceneResult<()> {
        self.check_detached(id)?;
        if self.in_hook() {
            self.deferred.push_back(Deferred::SetRoot(id));
            return Ok(());
        }

        self.apply_set_root(id);
        self.flush_deferred();
        Ok(())
    }

    /// Spawn `node` and attach it as the last child of `parent`
    ///
    /// The id is valid immediately; activation is deferred when called from
    /// a hook.
    pub fn add_child(&mut self, parent: NodeId, node: Node) -> SceneResult<NodeId> {
        if !self.scene.contains(parent) {
            return Err(SceneError::StaleNode(parent));
        }
        let child = self.spawn(node)?;
        if self.in_hook() {
            self.deferred.push_back(Deferred::Attach {
                parent,
                child,
                spawned: true,
            });
            return Ok(child);
        }

        self.apply_attach(parent, child);
        self.flush_deferred();
        Ok(child)
    }

    /// Attach a detached subtree under `parent`
    pub fn attach(&mut self, parent: NodeId, child: NodeId) -> SceneResult<()> {
        if !self.scene.contains(parent) {
            return Err(SceneError::StaleNode(parent));
        }
        self.check_detached(child)?;
        if self.scene.is_ancestor(child, parent) {
            return Err(SceneError::Cycle(child));
        }

        if self.in_hook() {
            self.deferred.push_back(Deferred::Attach {
                parent,
                child,
                spawned: false,
            });
            return Ok(());
        }

        self.apply_attach(parent, child);
        self.flush_deferred();
        Ok(())
    }

    /// Deactivate a subtree and cut it from its parent. Its nodes stay
    /// alive and can be attached again.
    pub fn detach(&mut self, id: NodeId) -> SceneResult<()> {
        if !self.scene.contains(id) {
            return Err(SceneError::StaleNode(id));
        }
        if self.in_hook() {
            self.deferred.push_back(Deferred::Detach(id));
            return Ok(());
        }

        self.apply_detach(id);
        self.flush_deferred();
        Ok(())
    }

    /// Deactivate and release a subtree. A stale id is a no-op.
    pub fn free(&mut self, id: NodeId) {
        if !self.scene.contains(id) {
            log::trace!("free() on stale node {}", id);
            return;
        }
        if self.in_hook() {
            self.deferred.push_back(Deferred::Free(id));
            return;
        }

        self.apply_free(id);
        self.flush_deferred();
    }

    /// Add a component; it starts right away when the node is active
    pub fn add_component(
        &mut self,
        id: NodeId,
        component: impl Component + 'static,
    ) -> SceneResult<()> {
        self.add_boxed_component(id, Box::new(component))
    }

    pub fn add_boxed_component(
        &mut self,
        id: NodeId,
        component: Box<dyn Component>,
    ) -> SceneResult<()> {
        if !self.scene.contains(id) {
            return Err(SceneError::StaleNode(id));
        }
        if self.in_hook() {
            self.deferred.push_back(Deferred::AddComponent(id, component));
            return Ok(());
        }

        self.apply_add_component(id, component);
        self.flush_deferred();
        Ok(())
    }

    fn check_detached(&self, id: NodeId) -> SceneResult<()> {
        if !self.scene.contains(id) {
            return Err(SceneError::StaleNode(id));
        }
        if self.scene.parent(id).is_some() || self.scene.root() == Some(id) {
            return Err(SceneError::AlreadyAttached(id));
        }
        Ok(())
    }

    fn flush_deferred(&mut self) {
        if self.in_hook() || self.flushing {
            return;
        }

        self.flushing = true;
        while let Some(op) = self.deferred.pop_front() {
            match op {
                Deferred::SetRoot(id) => {
                    if self.check_detached(id).is_ok() {
                        self.apply_set_root(id);
                    } else {
                        log::warn!("Dropping deferred scene change to {}", id);
                    }
                }
                Deferred::Attach {
                    parent,
                    child,
                    spawned,
                } => {
                    let valid = self.scene.contains(parent)
                        && self.check_detached(child).is_ok()
                        && !self.scene.is_ancestor(child, parent);
                    if valid {
                        self.apply_attach(parent, child);
                    } else {
                        log::warn!("Dropping deferred attach of {} under {}", child, parent);
                        if spawned && self.check_detached(child).is_ok() {
                            self.apply_free(child);
                        }
                    }
                }
                Deferred::Detach(id) => {
                    if self.scene.contains(id) {
                        self.apply_detach(id);
                    }
                }
                Deferred::Free(id) => {
                    if self.scene.contains(id) {
                        self.apply_free(id);
                    }
                }
                Deferred::AddComponent(id, component) => {
                    if self.scene.contains(id) {
                        self.apply_add_component(id, component);
                    } else {
                        log::warn!("Dropping component added to freed node {}", id);
                    }
                }
            }
        }
        self.flushing = false;
    }

    fn apply_set_root(&mut self, id: NodeId) {
        if let Some(old) = self.scene.root() {
            log::debug!("Replacing scene root {} with {}", old, id);
            self.apply_free(old);
        }

        self.scene.set_root(Some(id));
        self.activate(id);
        self.propagate_transforms();
    }

    fn apply_attach(&mut self, parent: NodeId, child: NodeId) {
        self.scene.link(parent, child);
        if self.scene.is_active(parent) {
            self.activate(child);
        }
    }

    fn apply_detach(&mut self, id: NodeId) {
        self.deactivate(id);
        self.scene.unlink(id);
    }

    fn apply_free(&mut self, id: NodeId) {
        self.deactivate(id);
        self.scene.unlink(id);
        let freed = self.scene.remove_subtree(id);
        log::debug!("Freed {} nodes under {}", freed, id);
    }

    fn apply_add_component(&mut self, id: NodeId, component: Box<dyn Component>) {
        let Some(node) = self.scene.get_mut(id) else {
            return;
        };
        node.components.push(crate::scene::ComponentSlot {
            component: Some(component),
            started: false,
        });
        let index = node.components.len() - 1;

        if node.active {
            self.start_component(id, index);
        }
    }

    // --- Lifecycle ---

    /// Mark a subtree active: register renderables, start components,
    /// then recurse into children
    fn activate(&mut self, id: NodeId) {
        let (component_count, children) = {
            let Some(node) = self.scene.get_mut(id) else {
                return;
            };
            node.active = true;
            node.transform.mark_dirty();
            (node.components.len(), node.children.clone())
        };

        log::trace!("Activating node {}", id);
        self.dirty = true;
        self.scene.register_render(id);

        for index in 0..component_count {
            self.start_component(id, index);
        }
        for child in children {
            self.activate(child);
        }
    }

    /// Inverse of [`World::activate`], leaves first
    fn deactivate(&mut self, id: NodeId) {
        let (component_count, children) = match self.scene.get(id) {
            Some(node) if node.active => (node.components.len(), node.children.clone()),
            _ => return,
        };

        for child in children {
            self.deactivate(child);
        }
        for index in 0..component_count {
            self.end_component(id, index);
        }

        log::trace!("Deactivating node {}", id);
        self.scene.unregister_render(id);
        if let Some(node) = self.scene.get_mut(id) {
            node.active = false;
        }
        self.dirty = true;
    }

    /// Run one hook with the component taken out of its slot
    fn with_component<F>(&mut self, id: NodeId, index: usize, hook: F)
    where
        F: FnOnce(&mut dyn Component, &mut World),
    {
        let Some(mut component) = self
            .scene
            .get_mut(id)
            .and_then(|node| node.components.get_mut(index))
            .and_then(|slot| slot.component.take())
        else {
            return;
        };

        self.hook_depth += 1;
        hook(component.as_mut(), self);
        self.hook_depth -= 1;

        match self
            .scene
            .get_mut(id)
            .and_then(|node| node.components.get_mut(index))
        {
            Some(slot) => slot.component = Some(component),
            None => log::warn!("Component slot {} of {} vanished during a hook", index, id),
        }
    }

    fn slot_started(&mut self, id: NodeId, index: usize, started: bool) -> Option<bool> {
        let slot = self
            .scene
            .get_mut(id)
            .and_then(|node| node.components.get_mut(index))?;
        Some(std::mem::replace(&mut slot.started, started))
    }

    fn start_component(&mut self, id: NodeId, index: usize) {
        if self.slot_started(id, index, true) == Some(false) {
            self.with_component(id, index, |component, world| component.start(id, world));
        }
    }

    fn end_component(&mut self, id: NodeId, index: usize) {
        if self.slot_started(id, index, false) == Some(true) {
            self.with_component(id, index, |component, world| component.end(id, world));
        }
    }

    // --- Per-tick passes ---

    /// Depth-first update walk over the active tree
    ///
    /// Components that have not started yet are started first. A transform
    /// dirtied by a node's own components is recomputed before its children
    /// run. Deferred tree changes are applied when the walk ends.
    pub fn update_tree(&mut self, dt: f32) {
        self.delta_time = dt;
        if let Some(root) = self.scene.root() {
            self.update_node(root, dt);
        }
        self.flush_deferred();
    }

    fn update_node(&mut self, id: NodeId, dt: f32) {
        let component_count = match self.scene.get(id) {
            Some(node) if node.active => node.components.len(),
            _ => return,
        };

        for index in 0..component_count {
            self.start_component(id, index);
            self.with_component(id, index, |component, world| {
                component.update(id, dt, world)
            });
        }

        self.fix_up_transform(id);

        let children = self.scene.children(id).to_vec();
        for child in children {
            self.update_node(child, dt);
        }
    }

    fn fix_up_transform(&mut self, id: NodeId) {
        let parent_world = self.scene.parent_world(id);
        let Some(node) = self.scene.get_mut(id) else {
            return;
        };
        if !node.transform.is_dirty() {
            return;
        }

        node.transform.recompute(&parent_world);
        node.mark_corners_stale();
        let children = node.children.clone();
        for child in children {
            if let Some(transform) = self.scene.transform_mut(child) {
                transform.mark_dirty();
            }
        }
        self.dirty = true;
    }

    /// Recompute dirty world matrices; any recompute requests a redraw
    pub fn propagate_transforms(&mut self) -> usize {
        let recomputed = self.scene.propagate_transforms();
        if recomputed > 0 {
            self.dirty = true;
        }
        recomputed
    }

    /// Tick the scheduler, then the tweener
    pub fn tick_timers(&mut self, dt: f32) {
        Scheduler::tick(self, dt, scheduler_of);
        Tweener::tick(self, dt, tweener_of);
    }

    /// Paint the render list into `target` with the current camera
    pub fn render(&mut self, target: &mut Framebuffer) -> usize {
        let mut canvas = Canvas::new(target).with_camera(self.camera);
        self.scene.render(&mut canvas)
    }

    // --- Timed callbacks ---

    pub fn start_timer<F>(&mut self, timeout: f32, repeat: bool, callback: F) -> TimerId
    where
        F: FnMut(&mut World) -> ControlFlow<()> + Send + 'static,
    {
        self.scheduler.start(timeout, repeat, callback)
    }

    pub fn stop_timer(&mut self, id: TimerId) -> bool {
        self.scheduler.stop(id)
    }

    pub fn stop_all_timers(&mut self) {
        self.scheduler.stop_all();
    }

    pub fn scheduler(&self) -> &Scheduler<World> {
        &self.scheduler
    }

    pub fn start_tween(&mut self, tween: Tween<World>) -> TweenId {
        self.tweener.start(tween)
    }

    pub fn finish_tween(&mut self, id: TweenId) -> bool {
        Tweener::finish(self, id, tweener_of)
    }

    pub fn cancel_tween(&mut self, id: TweenId) -> bool {
        self.tweener.cancel(id)
    }

    pub fn tweener(&self) -> &Tweener<World> {
        &self.tweener
    }

    /// Free the scene and drop every timer, tween and queued change
    pub fn teardown(&mut self) {
        if let Some(root) = self.scene.root() {
            self.free(root);
        }
        self.deferred.clear();
        self.scheduler.stop_all();
        self.tweener.clear();
        self.audio.stop();
    }
}
