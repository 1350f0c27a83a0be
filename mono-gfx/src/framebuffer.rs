//! Packed 1-bit bitmaps and the double-buffered framebuffer
//!
//! Pixels are stored 8 per byte, row-major, least significant bit first
//! (XBM order). Each row is padded to a whole byte, so a bitmap keeps its
//! true pixel width separately from the padded storage stride. UV sampling
//! always uses the true width.

use crate::error::{GfxError, Result};
use glam::Vec2;

/// Default display width in pixels
pub const SCREEN_WIDTH: u32 = 128;
/// Default display height in pixels
pub const SCREEN_HEIGHT: u32 = 64;

/// How a written pixel combines with the destination bit
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelColor {
    /// OR: ink the pixel
    #[default]
    Black = 0,
    /// AND-clear: erase the pixel
    White = 1,
    /// XOR: invert the pixel
    Flip = 2,
    /// Overwrite the destination bit with the written value
    Set = 3,
}

/// Number of bytes needed for a packed bitmap
pub fn packed_size(width: u32, height: u32) -> usize {
    (width as usize).div_ceil(8) * height as usize
}

fn alloc_zeroed(bytes: usize) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    data.try_reserve_exact(bytes)
        .map_err(|_| GfxError::Allocation { bytes })?;
    data.resize(bytes, 0);
    Ok(data)
}

/// A packed 1-bit image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    stride: usize,
    data: Vec<u8>,
}

impl Bitmap {
    /// Allocate a cleared bitmap
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(GfxError::InvalidDimensions { width, height });
        }

        Ok(Self {
            width,
            height,
            stride: (width as usize).div_ceil(8),
            data: alloc_zeroed(packed_size(width, height))?,
        })
    }

    /// Build a bitmap from decompressed, row-padded icon data
    ///
    /// `width` is the true pixel width of the image. `data` must hold
    /// `ceil(width / 8) * height` bytes.
    pub fn from_packed(width: u32, height: u32, data: &[u8]) -> Result<Self> {
        let mut bitmap = Self::new(width, height)?;
        if data.len() != bitmap.data.len() {
            return Err(GfxError::DataLength {
                expected: bitmap.data.len(),
                actual: data.len(),
            });
        }
        bitmap.data.copy_from_slice(data);
        Ok(bitmap)
    }

    /// True (unpadded) width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes per row
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Width of the padded storage in pixels
    pub fn padded_width(&self) -> u32 {
        (self.stride * 8) as u32
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Check if a coordinate lies inside the bitmap
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    #[inline]
    fn locate(&self, x: u32, y: u32) -> (usize, u8) {
        debug_assert!(x < self.width && y < self.height, "pixel ({x}, {y}) out of range");
        (y as usize * self.stride + (x as usize >> 3), 1 << (x & 7))
    }

    /// Read a pixel the caller has already validated
    ///
    /// # Panics
    /// Panics if the coordinate lies outside the storage.
    #[inline]
    pub fn get_unchecked(&self, x: u32, y: u32) -> bool {
        let (index, bit) = self.locate(x, y);
        self.data[index] & bit != 0
    }

    /// Write a pixel the caller has already validated
    ///
    /// `Set` writes an inked pixel; use [`Bitmap::put_unchecked`] to
    /// overwrite with an explicit value.
    ///
    /// # Panics
    /// Panics if the coordinate lies outside the storage.
    #[inline]
    pub fn set_unchecked(&mut self, x: u32, y: u32, color: PixelColor) {
        self.put_unchecked(x, y, color, true);
    }

    /// Write `value` through `color`. Only `Set` looks at `value`.
    #[inline]
    pub fn put_unchecked(&mut self, x: u32, y: u32, color: PixelColor, value: bool) {
        let (index, bit) = self.locate(x, y);
        let byte = &mut self.data[index];
        match color {
            PixelColor::Black => *byte |= bit,
            PixelColor::White => *byte &= !bit,
            PixelColor::Flip => *byte ^= bit,
            PixelColor::Set => {
                if value {
                    *byte |= bit;
                } else {
                    *byte &= !bit;
                }
            }
        }
    }

    /// Read a pixel, `false` outside the bitmap
    pub fn get(&self, x: i32, y: i32) -> bool {
        self.in_bounds(x, y) && self.get_unchecked(x as u32, y as u32)
    }

    /// Write a pixel, ignored outside the bitmap
    pub fn set(&mut self, x: i32, y: i32, color: PixelColor) {
        if self.in_bounds(x, y) {
            self.set_unchecked(x as u32, y as u32, color);
        }
    }

    /// Checked variant of [`Bitmap::put_unchecked`]
    pub fn put(&mut self, x: i32, y: i32, color: PixelColor, value: bool) {
        if self.in_bounds(x, y) {
            self.put_unchecked(x as u32, y as u32, color, value);
        }
    }

    /// Sample at normalized coordinates
    ///
    /// Coordinates outside `[0, 1)` sample as `false`.
    pub fn sample(&self, uv: Vec2) -> bool {
        if !(uv.x >= 0.0 && uv.y >= 0.0) {
            return false;
        }
        let x = (uv.x * self.width as f32) as u32;
        let y = (uv.y * self.height as f32) as u32;
        x < self.width && y < self.height && self.get_unchecked(x, y)
    }

    /// Zero every pixel
    pub fn clear(&mut self) {
        self.data.fill(0);
    }
}

/// Display-sized bitmap with an optional back buffer
#[derive(Debug, Clone)]
pub struct Framebuffer {
    front: Bitmap,
    back: Option<Bitmap>,
}

impl Framebuffer {
    /// Allocate a cleared framebuffer
    pub fn new(width: u32, height: u32, double_buffered: bool) -> Result<Self> {
        let front = Bitmap::new(width, height)?;
        let back = if double_buffered {
            Some(Bitmap::new(width, height)?)
        } else {
            None
        };

        log::debug!(
            "Allocated {}x{} framebuffer ({} bytes, double buffered: {})",
            width,
            height,
            packed_size(width, height),
            double_buffered
        );

        Ok(Self { front, back })
    }

    pub fn width(&self) -> u32 {
        self.front.width()
    }

    pub fn height(&self) -> u32 {
        self.front.height()
    }

    pub fn is_double_buffered(&self) -> bool {
        self.back.is_some()
    }

    /// The bitmap being drawn into and presented
    pub fn front(&self) -> &Bitmap {
        &self.front
    }

    pub fn front_mut(&mut self) -> &mut Bitmap {
        &mut self.front
    }

    pub fn back(&self) -> Option<&Bitmap> {
        self.back.as_ref()
    }

    /// Packed bytes of the front bitmap, ready for the display
    pub fn bytes(&self) -> &[u8] {
        self.front.as_bytes()
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        self.front.in_bounds(x, y)
    }

    pub fn get(&self, x: i32, y: i32) -> bool {
        self.front.get(x, y)
    }

    pub fn get_unchecked(&self, x: u32, y: u32) -> bool {
        self.front.get_unchecked(x, y)
    }

    pub fn set(&mut self, x: i32, y: i32, color: PixelColor) {
        self.front.set(x, y, color);
    }

    pub fn set_unchecked(&mut self, x: u32, y: u32, color: PixelColor) {
        self.front.set_unchecked(x, y, color);
    }

    pub fn put(&mut self, x: i32, y: i32, color: PixelColor, value: bool) {
        self.front.put(x, y, color, value);
    }

    /// Clear the front bitmap
    pub fn clear(&mut self) {
        self.front.clear();
    }

    /// Exchange front and back bitmaps. No-op when single buffered.
    pub fn swap_back(&mut self) {
        if let Some(back) = self.back.as_mut() {
            std::mem::swap(&mut self.front, back);
        }
    }

    /// Exchange front bitmaps with another framebuffer of the same size
    pub fn swap_with(&mut self, other: &mut Framebuffer) {
        debug_assert_eq!(
            (self.width(), self.height()),
            (other.width(), other.height())
        );
        std::mem::swap(&mut self.front, &mut other.front);
    }
}
