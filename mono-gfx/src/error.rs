//! Error types for bitmap allocation and construction

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GfxError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GfxError {
    #[error("failed to allocate {bytes} bytes of pixel storage")]
    Allocation { bytes: usize },

    #[error("invalid bitmap dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("bitmap data is {actual} bytes, expected {expected}")]
    DataLength { expected: usize, actual: usize },
}
