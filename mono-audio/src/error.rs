//! Audio error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AudioError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AudioError {
    #[error("unknown note class {0}")]
    InvalidNote(u8),

    #[error("octave {0} does not fit in 6 bits")]
    InvalidOctave(u8),

    #[error("music must have a non-zero tempo")]
    ZeroTempo,

    #[error("music contains no notes")]
    EmptyMusic,
}
