//! Note, music and notification directive types

use std::fmt;

/// Note class stored in the top bits of an encoded beat
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Note {
    C = 0,
    CSharp = 1,
    D = 2,
    DSharp = 3,
    E = 4,
    F = 5,
    FSharp = 6,
    G = 7,
    GSharp = 8,
    A = 9,
    ASharp = 10,
    B = 11,

    /// Marks the end of a note list
    End = 12,
    /// Vibration pulse instead of a tone
    Buzz = 13,
    /// Rest
    None = 14,
}

impl Note {
    pub fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => Note::C,
            1 => Note::CSharp,
            2 => Note::D,
            3 => Note::DSharp,
            4 => Note::E,
            5 => Note::F,
            6 => Note::FSharp,
            7 => Note::G,
            8 => Note::GSharp,
            9 => Note::A,
            10 => Note::ASharp,
            11 => Note::B,
            12 => Note::End,
            13 => Note::Buzz,
            14 => Note::None,
            _ => return None,
        })
    }

    /// True for the twelve pitched classes
    pub fn is_pitch(self) -> bool {
        (self as u8) < 12
    }
}

/// One decoded note: class, octave and length in beats
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Beat {
    pub note: Note,
    pub octave: u8,
    /// Length in beats, in `[0, 4]`
    pub length: f32,
}

impl Beat {
    pub fn new(note: Note, octave: u8, length: f32) -> Self {
        Self {
            note,
            octave,
            length,
        }
    }

    pub fn end() -> Self {
        Self::new(Note::End, 0, 0.0)
    }
}

/// A song: encoded beats plus tempo settings
#[derive(Debug, Clone, PartialEq)]
pub struct Music {
    /// Encoded beats; playback stops (or loops) at [`Note::End`] or at the
    /// end of the list
    pub notes: Vec<u32>,
    /// Beats per minute
    pub bpm: u8,
    /// Gap cut from the end of every note, in beats
    pub separation: f32,
    /// Restart from the first note after the end marker
    pub looping: bool,
}

impl Music {
    pub fn new(notes: Vec<u32>, bpm: u8) -> Self {
        Self {
            notes,
            bpm,
            separation: 0.0,
            looping: false,
        }
    }

    pub fn with_separation(mut self, separation: f32) -> Self {
        self.separation = separation;
        self
    }

    pub fn with_loop(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Duration of one beat in milliseconds
    pub fn beat_ms(&self) -> f32 {
        60_000.0 / self.bpm as f32
    }
}

/// One step of a notification sequence
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Directive {
    /// Start a tone; volume in `[0, 1]`
    Tone { frequency: f32, volume: f32 },
    /// Switch the vibration motor
    Vibrate(bool),
    /// Wait, in milliseconds
    Delay(u32),
    /// Stop any tone
    Silence,
}

/// Directives for one note, played in order by the sink
#[derive(Clone, PartialEq)]
pub struct Sequence {
    pub directives: Vec<Directive>,
    /// Player clock at dispatch, in milliseconds
    pub timestamp: u64,
}

impl Sequence {
    pub fn new(directives: Vec<Directive>, timestamp: u64) -> Self {
        Self {
            directives,
            timestamp,
        }
    }

    pub fn len(&self) -> usize {
        self.directives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }
}

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequence")
            .field("directives", &self.directives.len())
            .field("timestamp", &self.timestamp)
            .finish()
    }
}

/// Music player configuration
#[derive(Debug, Clone, Copy)]
pub struct PlayerConfig {
    /// Tone volume, clamped to `[0, 1]`
    pub volume: f32,
    /// Muted players keep time but dispatch nothing
    pub muted: bool,
    /// Sequences buffered for the sink before new ones are dropped
    pub queue_depth: usize,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            volume: 1.0,
            muted: false,
            queue_depth: 4,
        }
    }
}
