//! Monochrome graphics core
//!
//! Software rendering for 1-bit displays on small devices.
//!
//! Key pieces:
//! - Affine 2-D matrices via glam
//! - Packed bit-per-pixel bitmaps with OR/AND-clear/XOR/overwrite writes
//! - Barycentric quad rasterizer with UV sampling, tiling and masks
//! - Debug primitives (line, filled box, box frame)

pub mod error;
pub mod framebuffer;
pub mod math;
pub mod raster;

pub use error::*;
pub use framebuffer::*;
pub use math::{Matrix, Vector};
pub use raster::*;

pub fn version() -> &'static str {
    "0.1.0"
}
