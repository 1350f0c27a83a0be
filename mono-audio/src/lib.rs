//! Monochrome engine audio
//!
//! Plays note streams through a notification sink (buzzer, vibration motor).
//!
//! Key features:
//! - 32-bit packed note encoding (note class, octave, beat length)
//! - Tick-driven music player with looping and note separation
//! - Directive sequences dispatched over a bounded channel

pub mod codec;
pub mod error;
pub mod player;
pub mod types;

pub use codec::*;
pub use error::*;
pub use player::*;
pub use types::*;

pub fn version() -> &'static str {
    "0.1.0"
}
