//! Frame orchestration
//!
//! One tick: take the world lock with a bounded wait, run the update walk,
//! tick timers, propagate transforms, advance the music player, then redraw
//! (only when something changed) and present. The input snapshot is reset
//! before the lock is released.

use crate::error::EngineError;
use crate::input::InputHandle;
use crate::node::{Node, NodeId};
use crate::world::World;
use mono_audio::PlayerConfig;
use mono_gfx::{Canvas, Framebuffer, SCREEN_HEIGHT, SCREEN_WIDTH};
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub muted: bool,
    /// Keep the backlight forced on while running
    pub backlight: bool,
    /// Update rate cap; 0 runs unthrottled
    pub physics_fps: u32,
    /// Presentation rate cap; 0 presents every tick
    pub render_fps: u32,
    /// Music volume in `[0, 1]`
    pub volume: f32,
    /// Longest the frame loop waits for the world lock
    pub lock_timeout: Duration,
    pub width: u32,
    pub height: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            muted: false,
            backlight: true,
            physics_fps: 0,
            render_fps: 0,
            volume: 1.0,
            lock_timeout: Duration::from_millis(25),
            width: SCREEN_WIDTH,
            height: SCREEN_HEIGHT,
        }
    }
}

fn frame_interval(fps: u32) -> Duration {
    if fps == 0 {
        Duration::ZERO
    } else {
        Duration::from_secs_f64(1.0 / fps as f64)
    }
}

/// Output device the frame is presented to
pub trait Display: Send {
    fn present(&mut self, frame: &Framebuffer);

    /// Surface holding the presented frame, drawn on by the overlay
    fn surface(&mut self) -> Option<&mut Framebuffer> {
        None
    }

    fn commit(&mut self) {}

    /// Best effort
    fn set_backlight(&mut self, _on: bool) {}
}

/// Display that keeps the last presented frame in memory
pub struct HeadlessDisplay {
    surface: Framebuffer,
    presents: u64,
    commits: u64,
    backlight: bool,
}

impl HeadlessDisplay {
    pub fn new(width: u32, height: u32) -> mono_gfx::Result<Self> {
        Ok(Self {
            surface: Framebuffer::new(width, height, false)?,
            presents: 0,
            commits: 0,
            backlight: false,
        })
    }

    pub fn frame(&self) -> &Framebuffer {
        &self.surface
    }

    pub fn presents(&self) -> u64 {
        self.presents
    }

    pub fn commits(&self) -> u64 {
        self.commits
    }

    pub fn backlight(&self) -> bool {
        self.backlight
    }
}

impl Display for HeadlessDisplay {
    fn present(&mut self, frame: &Framebuffer) {
        self.surface.clone_from(frame);
        self.presents += 1;
    }

    fn surface(&mut self) -> Option<&mut Framebuffer> {
        Some(&mut self.surface)
    }

    fn commit(&mut self) {
        self.commits += 1;
    }

    fn set_backlight(&mut self, on: bool) {
        self.backlight = on;
    }
}

/// Drawn on the display surface after every presentation
pub type Overlay = Box<dyn FnMut(&World, &mut Canvas<'_>) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A frame was processed
    Ran,
    /// Too soon after the previous frame
    Throttled,
    /// The world lock was busy
    LockTimeout,
    /// Exit was requested or the engine is torn down
    Exit,
}

/// Engine statistics
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineStats {
    pub frames: u64,
    pub redraws: u64,
    pub presents: u64,
    pub throttled: u64,
    pub lock_timeouts: u64,
}

pub struct Engine<D: Display> {
    config: EngineConfig,
    world: Arc<Mutex<World>>,
    framebuffer: Framebuffer,
    display: D,
    overlay: Option<Overlay>,

    tick_interval: Duration,
    present_interval: Duration,
    last_tick: Option<Instant>,
    last_present: Option<Instant>,
    /// Sum of processed frame deltas, drives the music player
    clock: Duration,

    stats: EngineStats,
    torn_down: bool,
}

impl<D: Display> Engine<D> {
    pub fn new(config: EngineConfig, mut display: D) -> Result<Self, EngineError> {
        if !config.volume.is_finite() {
            return Err(EngineError::Config(format!("volume {}", config.volume)));
        }

        let framebuffer = Framebuffer::new(config.width, config.height, false)?;
        let world = World::with_audio(
            config.width,
            config.height,
            PlayerConfig {
                volume: config.volume,
                muted: config.muted,
                ..PlayerConfig::default()
            },
        );

        if config.backlight {
            display.set_backlight(true);
        }

        log::info!(
            "Engine initialized: {}x{}, physics {} fps, render {} fps",
            config.width,
            config.height,
            config.physics_fps,
            config.render_fps
        );

        Ok(Self {
            tick_interval: frame_interval(config.physics_fps),
            present_interval: frame_interval(config.render_fps),
            config,
            world: Arc::new(Mutex::new(world)),
            framebuffer,
            display,
            overlay: None,
            last_tick: None,
            last_present: None,
            clock: Duration::ZERO,
            stats: EngineStats::default(),
            torn_down: false,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// Locked access to the world
    pub fn world(&self) -> MutexGuard<'_, World> {
        self.world.lock()
    }

    pub fn shared_world(&self) -> Arc<Mutex<World>> {
        self.world.clone()
    }

    /// Producer handle for the platform input thread
    pub fn input_handle(&self) -> InputHandle {
        InputHandle::new(self.world.clone())
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn set_overlay<F>(&mut self, overlay: F)
    where
        F: FnMut(&World, &mut Canvas<'_>) + Send + 'static,
    {
        self.overlay = Some(Box::new(overlay));
    }

    pub fn clear_overlay(&mut self) {
        self.overlay = None;
    }

    /// Swap in a new scene, tearing down the previous one
    pub fn set_scene(&mut self, root: Node) -> Result<NodeId, EngineError> {
        Ok(self.world.lock().set_scene(root)?)
    }

    /// One paced iteration of the frame loop
    pub fn tick(&mut self) -> TickOutcome {
        if self.torn_down {
            return TickOutcome::Exit;
        }

        let Some(mut world) = self.world.try_lock_for(self.config.lock_timeout) else {
            self.stats.lock_timeouts += 1;
            log::trace!("World lock busy, skipping tick");
            return TickOutcome::LockTimeout;
        };
        if world.exit_requested() {
            return TickOutcome::Exit;
        }

        let now = Instant::now();
        let dt = match self.last_tick {
            Some(last) => {
                let elapsed = now.duration_since(last);
                if elapsed < self.tick_interval {
                    self.stats.throttled += 1;
                    return TickOutcome::Throttled;
                }
                elapsed
            }
            None => Duration::ZERO,
        };
        self.last_tick = Some(now);

        let present = self
            .last_present
            .map_or(true, |last| now.duration_since(last) >= self.present_interval);
        if present {
            self.last_present = Some(now);
        }

        run_frame(
            &mut world,
            FrameTargets {
                framebuffer: &mut self.framebuffer,
                display: &mut self.display,
                overlay: &mut self.overlay,
                clock: &mut self.clock,
                stats: &mut self.stats,
            },
            dt,
            present,
        );
        TickOutcome::Ran
    }

    /// Process one frame with an explicit delta, ignoring the rate caps
    pub fn step(&mut self, dt: Duration) -> TickOutcome {
        if self.torn_down {
            return TickOutcome::Exit;
        }

        let mut world = self.world.lock();
        if world.exit_requested() {
            return TickOutcome::Exit;
        }

        run_frame(
            &mut world,
            FrameTargets {
                framebuffer: &mut self.framebuffer,
                display: &mut self.display,
                overlay: &mut self.overlay,
                clock: &mut self.clock,
                stats: &mut self.stats,
            },
            dt,
            true,
        );
        TickOutcome::Ran
    }

    /// Tick until exit is requested, then tear down
    pub fn run(&mut self) {
        log::info!("Entering frame loop");
        while self.tick() != TickOutcome::Exit {
            std::thread::yield_now();
        }
        self.teardown();
    }

    /// Free the scene and subsystems. Safe to call more than once.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        self.world.lock().teardown();
        if self.config.backlight {
            self.display.set_backlight(false);
        }

        log::info!(
            "Engine shut down after {} frames ({} redraws)",
            self.stats.frames,
            self.stats.redraws
        );
    }
}

impl<D: Display> Drop for Engine<D> {
    fn drop(&mut self) {
        self.teardown();
    }
}

struct FrameTargets<'a, D: Display> {
    framebuffer: &'a mut Framebuffer,
    display: &'a mut D,
    overlay: &'a mut Option<Overlay>,
    clock: &'a mut Duration,
    stats: &'a mut EngineStats,
}

fn run_frame<D: Display>(world: &mut World, out: FrameTargets<'_, D>, dt: Duration, present: bool) {
    let dt_secs = dt.as_secs_f32();
    *out.clock += dt;

    world.update_tree(dt_secs);
    world.tick_timers(dt_secs);
    world.propagate_transforms();
    world.audio_mut().update(out.clock.as_millis() as u64);
    out.stats.frames += 1;

    if present {
        if world.take_dirty() {
            out.framebuffer.clear();
            world.render(out.framebuffer);
            out.stats.redraws += 1;
        }

        out.display.present(out.framebuffer);
        if let Some(overlay) = out.overlay.as_mut() {
            if let Some(surface) = out.display.surface() {
                let mut canvas = Canvas::new(surface);
                overlay(world, &mut canvas);
            }
        }
        out.display.commit();
        out.stats.presents += 1;
    }

    world.end_input_tick();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Component;
    use crate::error::SceneError;
    use crate::input::{InputEvent, InputKind, Key};
    use glam::Vec2;
    use mono_audio::{codec, Beat, Music, Note};
    use mono_gfx::{PixelColor, Quad, RenderData};
    use std::ops::ControlFlow;

    const FRAME: Duration = Duration::from_millis(16);

    fn engine() -> Engine<HeadlessDisplay> {
        Engine::new(EngineConfig::default(), HeadlessDisplay::new(128, 64).unwrap()).unwrap()
    }

    fn square_scene() -> Node {
        Node::new().with_child(Node::new().with_sprite(RenderData::filled(Quad::rect(
            0.0, 0.0, 4.0, 4.0,
        ))))
    }

    fn lit(fb: &Framebuffer) -> usize {
        let mut count = 0;
        for y in 0..fb.height() as i32 {
            for x in 0..fb.width() as i32 {
                if fb.get(x, y) {
                    count += 1;
                }
            }
        }
        count
    }

    #[test]
    fn test_engine_creation() {
        let engine = engine();
        assert!(engine.display().backlight());
        assert_eq!(engine.framebuffer().width(), 128);
        assert_eq!(engine.stats().frames, 0);
    }

    #[test]
    fn test_invalid_config() {
        let bad_size = EngineConfig {
            width: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(
            Engine::new(bad_size, HeadlessDisplay::new(1, 1).unwrap()),
            Err(EngineError::Gfx(_))
        ));

        let bad_volume = EngineConfig {
            volume: f32::NAN,
            ..EngineConfig::default()
        };
        assert!(matches!(
            Engine::new(bad_volume, HeadlessDisplay::new(1, 1).unwrap()),
            Err(EngineError::Config(_))
        ));
    }

    fn attach_twice(engine: &mut Engine<HeadlessDisplay>) -> Result<NodeId, EngineError> {
        let root = engine.set_scene(Node::new())?;
        let mut world = engine.world();
        let child = world.spawn(Node::new())?;
        world.attach(root, child)?;
        world.attach(root, child)?;
        Ok(child)
    }

    #[test]
    fn test_scene_errors_surface_as_engine_errors() {
        let mut engine = engine();
        match attach_twice(&mut engine) {
            Err(EngineError::Scene(SceneError::AlreadyAttached(id))) => {
                let world = engine.world();
                assert_eq!(world.parent(id), world.root());
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_zero_delta_step() {
        let mut engine = engine();
        engine.set_scene(square_scene()).unwrap();

        assert_eq!(engine.step(Duration::ZERO), TickOutcome::Ran);
        {
            let world = engine.world();
            let list = world.render_list();
            assert_eq!(list.len(), 1);
            assert_eq!(list[0].corners, Quad::rect(0.0, 0.0, 4.0, 4.0).corners);
        }

        assert_eq!(lit(engine.framebuffer()), 16);
        assert_eq!(lit(engine.display().frame()), 16);
        assert_eq!(engine.display().commits(), 1);
    }

    #[test]
    fn test_redraw_only_when_dirty() {
        let mut engine = engine();
        engine.set_scene(square_scene()).unwrap();

        engine.step(FRAME);
        engine.step(FRAME);
        engine.step(FRAME);
        assert_eq!(engine.stats().redraws, 1);
        assert_eq!(engine.stats().presents, 3);
        // The previous frame is presented again, not a blank one
        assert_eq!(lit(engine.display().frame()), 16);

        engine.world().set_camera(Vec2::new(-10.0, 0.0));
        engine.step(FRAME);
        assert_eq!(engine.stats().redraws, 2);
        assert!(engine.framebuffer().get(10, 0));
        assert!(!engine.framebuffer().get(0, 0));
    }

    struct Spin;

    impl Component for Spin {
        fn update(&mut self, node: NodeId, dt: f32, world: &mut World) {
            if let Some(transform) = world.transform_mut(node) {
                transform.translate(Vec2::new(dt * 100.0, 0.0));
            }
        }
    }

    #[test]
    fn test_moving_node_redraws_every_frame() {
        let mut engine = engine();
        engine
            .set_scene(
                Node::new()
                    .with_sprite(RenderData::filled(Quad::rect(0.0, 0.0, 2.0, 2.0)))
                    .with_component(Spin),
            )
            .unwrap();

        engine.step(Duration::from_millis(10));
        engine.step(Duration::from_millis(10));
        assert_eq!(engine.stats().redraws, 2);
        assert!(engine.framebuffer().get(2, 0));
        assert!(!engine.framebuffer().get(0, 0));
    }

    #[test]
    fn test_exit_from_input() {
        let mut engine = engine();
        let input = engine.input_handle();

        assert_eq!(engine.step(FRAME), TickOutcome::Ran);
        input.send(InputEvent::new(Key::Back, InputKind::Long));
        assert_eq!(engine.step(FRAME), TickOutcome::Exit);
        assert_eq!(engine.tick(), TickOutcome::Exit);
    }

    #[test]
    fn test_input_visible_for_one_tick() {
        let mut engine = engine();
        let input = engine.input_handle();

        input.send(InputEvent::new(Key::Ok, InputKind::Press));
        assert!(engine.world().input().is_pressed(Key::Ok));
        engine.step(FRAME);

        let world = engine.world();
        assert!(!world.input().is_pressed(Key::Ok));
        assert!(world.input().is_down(Key::Ok));
    }

    #[test]
    fn test_input_from_producer_thread() {
        let mut engine = engine();
        let input = engine.input_handle();

        std::thread::spawn(move || {
            input.send(InputEvent::new(Key::Back, InputKind::Long));
        })
        .join()
        .unwrap();

        engine.run();
        assert!(engine.world().root().is_none());
        assert_eq!(engine.stats().frames, 0);
    }

    #[test]
    fn test_throttled_tick() {
        let mut engine = Engine::new(
            EngineConfig {
                physics_fps: 1,
                ..EngineConfig::default()
            },
            HeadlessDisplay::new(128, 64).unwrap(),
        )
        .unwrap();

        assert_eq!(engine.tick(), TickOutcome::Ran);
        assert_eq!(engine.tick(), TickOutcome::Throttled);
        assert_eq!(engine.stats().frames, 1);
        assert_eq!(engine.stats().throttled, 1);
    }

    #[test]
    fn test_render_fps_caps_presentation() {
        let mut engine = Engine::new(
            EngineConfig {
                render_fps: 1,
                ..EngineConfig::default()
            },
            HeadlessDisplay::new(128, 64).unwrap(),
        )
        .unwrap();

        assert_eq!(engine.tick(), TickOutcome::Ran);
        assert_eq!(engine.tick(), TickOutcome::Ran);
        assert_eq!(engine.stats().frames, 2);
        assert_eq!(engine.stats().presents, 1);
    }

    #[test]
    fn test_lock_timeout_skips_tick() {
        let mut engine = Engine::new(
            EngineConfig {
                lock_timeout: Duration::from_millis(1),
                ..EngineConfig::default()
            },
            HeadlessDisplay::new(128, 64).unwrap(),
        )
        .unwrap();

        let shared = engine.shared_world();
        let guard = shared.lock();
        assert_eq!(engine.tick(), TickOutcome::LockTimeout);
        drop(guard);

        assert_eq!(engine.tick(), TickOutcome::Ran);
        assert_eq!(engine.stats().lock_timeouts, 1);
    }

    #[test]
    fn test_overlay_draws_on_display_surface() {
        let mut engine = engine();
        engine.set_overlay(|world: &World, canvas: &mut Canvas<'_>| {
            if !world.exit_requested() {
                canvas.set_color(PixelColor::Black);
                canvas.set_pixel(127, 63);
            }
        });

        engine.step(FRAME);
        assert!(engine.display().frame().get(127, 63));
        assert!(!engine.framebuffer().get(127, 63));
    }

    #[test]
    fn test_timers_run_each_frame() {
        let mut engine = engine();
        engine.world().start_timer(0.032, false, |world: &mut World| {
            world.set_camera(Vec2::new(1.0, 1.0));
            ControlFlow::Continue(())
        });

        engine.step(FRAME);
        assert_eq!(engine.world().camera(), Vec2::ZERO);
        engine.step(FRAME);
        assert_eq!(engine.world().camera(), Vec2::new(1.0, 1.0));
    }

    #[test]
    fn test_music_follows_frame_clock() {
        let mut engine = engine();
        let rx = {
            let mut world = engine.world();
            let audio = world.audio_mut();
            let rx = audio.connect_sink();
            let notes = vec![
                codec::encode(&Beat::new(Note::C, 4, 1.0)).unwrap(),
                codec::encode(&Beat::end()).unwrap(),
            ];
            audio.set_music(Music::new(notes, 120)).unwrap();
            audio.play(0);
            rx
        };

        engine.step(Duration::from_millis(400));
        assert!(rx.is_empty());
        engine.step(Duration::from_millis(100));
        assert_eq!(rx.len(), 1);
    }

    #[test]
    fn test_teardown_is_idempotent() {
        let mut engine = engine();
        engine.set_scene(square_scene()).unwrap();

        engine.teardown();
        engine.teardown();
        assert!(!engine.display().backlight());
        assert!(engine.world().scene().is_empty());
        assert_eq!(engine.step(FRAME), TickOutcome::Exit);
    }
}
