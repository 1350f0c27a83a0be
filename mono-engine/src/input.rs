//! Key snapshot shared between the input producer and the frame loop
//!
//! The platform delivers discrete events on its own thread through an
//! [`InputHandle`]. Each event takes the world lock, so the frame loop sees
//! a stable snapshot for the whole tick. The latest event kind per key is
//! cleared at the end of every processed tick; the held state survives
//! until the matching release.

use crate::world::World;
use parking_lot::Mutex;
use std::sync::Arc;

pub const KEY_COUNT: usize = 6;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Up = 0,
    Down = 1,
    Right = 2,
    Left = 3,
    Ok = 4,
    Back = 5,
}

impl Key {
    pub const ALL: [Key; KEY_COUNT] = [
        Key::Up,
        Key::Down,
        Key::Right,
        Key::Left,
        Key::Ok,
        Key::Back,
    ];

    fn bit(self) -> u8 {
        1 << self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputKind {
    Press,
    Release,
    Short,
    Long,
    Repeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    pub key: Key,
    pub kind: InputKind,
}

impl InputEvent {
    pub fn new(key: Key, kind: InputKind) -> Self {
        Self { key, kind }
    }

    /// Long press of Back asks the engine to exit
    pub fn is_exit_request(&self) -> bool {
        self.key == Key::Back && self.kind == InputKind::Long
    }
}

#[derive(Debug, Clone, Default)]
pub struct InputState {
    latest: [Option<InputKind>; KEY_COUNT],
    held: u8,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: InputEvent) {
        self.latest[event.key as usize] = Some(event.kind);

        match event.kind {
            InputKind::Press => self.held |= event.key.bit(),
            InputKind::Release => self.held &= !event.key.bit(),
            _ => {}
        }
    }

    /// Latest event kind since the last processed tick
    pub fn latest(&self, key: Key) -> Option<InputKind> {
        self.latest[key as usize]
    }

    /// Pressed and not yet released
    pub fn is_down(&self, key: Key) -> bool {
        self.held & key.bit() != 0
    }

    pub fn is_pressed(&self, key: Key) -> bool {
        self.latest(key) == Some(InputKind::Press)
    }

    pub fn is_released(&self, key: Key) -> bool {
        self.latest(key) == Some(InputKind::Release)
    }

    /// Reset the latest kinds to neutral
    pub fn end_tick(&mut self) {
        self.latest = [None; KEY_COUNT];
    }
}

/// Producer side of the input snapshot
#[derive(Clone)]
pub struct InputHandle {
    world: Arc<Mutex<World>>,
}

impl InputHandle {
    pub(crate) fn new(world: Arc<Mutex<World>>) -> Self {
        Self { world }
    }

    /// Record one event, blocking until the frame loop releases the lock
    pub fn send(&self, event: InputEvent) {
        self.world.lock().handle_input(event);
    }
}
