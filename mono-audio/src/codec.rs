//! 32-bit packed note encoding
//!
//! Layout, most significant bit first:
//!
//! ```text
//! 31      26 25  22 21    16 15              0
//! [ note   ][ pad ][ octave ][ length 0..4    ]
//! ```
//!
//! The length is a beat count in `[0, 4]` scaled to the full `u16` range.

use crate::error::{AudioError, Result};
use crate::types::{Beat, Note};

/// Frequency of C0 in Hz
pub const REFERENCE_FREQUENCY: f32 = 16.35;

pub const MAX_BEAT_LENGTH: f32 = 4.0;

const NOTE_SHIFT: u32 = 26;
const OCTAVE_SHIFT: u32 = 16;
const FIELD_MASK: u32 = 0x3F;
const LENGTH_MASK: u32 = 0xFFFF;

/// Beat length in `[0, 4]` to its 16-bit scaled form. Out-of-range lengths
/// are clamped.
pub fn scale_length(length: f32) -> u16 {
    let length = length.clamp(0.0, MAX_BEAT_LENGTH);
    (length / MAX_BEAT_LENGTH * u16::MAX as f32) as u16
}

pub fn unscale_length(scaled: u16) -> f32 {
    scaled as f32 / u16::MAX as f32 * MAX_BEAT_LENGTH
}

/// Pack a beat into 32 bits
pub fn encode(beat: &Beat) -> Result<u32> {
    if beat.octave as u32 > FIELD_MASK {
        return Err(AudioError::InvalidOctave(beat.octave));
    }

    Ok(((beat.note as u32) << NOTE_SHIFT)
        | ((beat.octave as u32) << OCTAVE_SHIFT)
        | scale_length(beat.length) as u32)
}

/// Unpack a beat, rejecting note classes past [`Note::None`]
pub fn decode(value: u32) -> Result<Beat> {
    let class = ((value >> NOTE_SHIFT) & FIELD_MASK) as u8;
    let note = Note::from_u8(class).ok_or(AudioError::InvalidNote(class))?;

    Ok(Beat {
        note,
        octave: ((value >> OCTAVE_SHIFT) & FIELD_MASK) as u8,
        length: unscale_length((value & LENGTH_MASK) as u16),
    })
}

/// Equal-temperament frequency of a pitched beat in Hz
///
/// Only meaningful for pitched classes; sentinels map to whatever their
/// numeric class would give.
pub fn frequency(beat: &Beat) -> f32 {
    let semitones = beat.octave as f32 * 12.0 + beat.note as u8 as f32;
    REFERENCE_FREQUENCY * 2f32.powf(semitones / 12.0)
}
