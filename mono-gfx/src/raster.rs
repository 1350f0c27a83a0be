//! Quad rasterization into the 1-bit framebuffer
//!
//! A quad is transformed by the canvas' active transform, made
//! camera-relative, culled against the screen and filled as two triangles.
//! Each covered pixel is handed to a [`Shader`] together with its
//! interpolated UV coordinate.

use crate::framebuffer::{Bitmap, Framebuffer, PixelColor};
use crate::math::{self, Matrix, Vector};
use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Vec2};
use std::fmt;
use std::sync::Arc;

/// Triangles with an area at or below this are treated as degenerate
const AREA_EPSILON: f32 = 1e-6;

/// Lines are clipped this far inside the far screen edges
const LINE_CLIP_INSET: f32 = 1e-3;

/// Tiling flags (bitfield)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TileMode(pub u8);

impl TileMode {
    pub const NONE: Self = Self(0);
    pub const HORIZONTAL: Self = Self(1 << 0);
    pub const VERTICAL: Self = Self(1 << 1);
    pub const BOTH: Self = Self(Self::HORIZONTAL.0 | Self::VERTICAL.0);

    pub fn is_tiled(&self) -> bool {
        self.0 != 0
    }

    pub fn has_horizontal(&self) -> bool {
        self.0 & Self::HORIZONTAL.0 != 0
    }

    pub fn has_vertical(&self) -> bool {
        self.0 & Self::VERTICAL.0 != 0
    }
}

/// UV mirroring applied by [`Quad::flip_uv`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlipMode {
    #[default]
    None,
    Horizontal,
    Vertical,
    Both,
}

/// Axis-aligned rectangle in local coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Four corners with their texture coordinates
///
/// Corners run top-left, top-right, bottom-right, bottom-left in a y-down
/// space. That winding is what the rasterizer treats as front-facing.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Quad {
    pub corners: [Vec2; 4],
    pub uv: [Vec2; 4],
}

impl Quad {
    /// Rectangle with UVs spanning the whole texture
    pub fn rect(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            corners: [
                Vec2::new(x, y),
                Vec2::new(x + width, y),
                Vec2::new(x + width, y + height),
                Vec2::new(x, y + height),
            ],
            uv: [
                Vec2::new(0.0, 0.0),
                Vec2::new(1.0, 0.0),
                Vec2::new(1.0, 1.0),
                Vec2::new(0.0, 1.0),
            ],
        }
    }

    /// Mirror the texture coordinates
    pub fn flip_uv(&mut self, mode: FlipMode) {
        let (horizontal, vertical) = match mode {
            FlipMode::None => return,
            FlipMode::Horizontal => (true, false),
            FlipMode::Vertical => (false, true),
            FlipMode::Both => (true, true),
        };

        for uv in self.uv.iter_mut() {
            if horizontal {
                uv.x = 1.0 - uv.x;
            }
            if vertical {
                uv.y = 1.0 - uv.y;
            }
        }
    }

    /// Corners mapped through `m`
    pub fn transformed(&self, m: &Matrix) -> [Vec2; 4] {
        self.corners.map(|corner| math::transform_point(m, corner))
    }
}

impl From<Rect> for Quad {
    fn from(rect: Rect) -> Self {
        Quad::rect(rect.x, rect.y, rect.width, rect.height)
    }
}

/// One covered pixel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fragment {
    /// Screen pixel, always inside the target
    pub x: i32,
    pub y: i32,
    /// Interpolated texture coordinate
    pub uv: Vec2,
    /// Scale of the active transform, used for tiling
    pub scaling: Vec2,
    /// Draw color of the canvas
    pub color: PixelColor,
}

/// Per-pixel callback invoked by the rasterizer
pub trait Shader: Send + Sync {
    fn shade(&self, target: &mut Framebuffer, data: &RenderData, fragment: &Fragment);
}

/// Paints every covered pixel with the canvas draw color, ignoring UV
#[derive(Debug, Clone, Copy, Default)]
pub struct SolidFill;

impl Shader for SolidFill {
    fn shade(&self, target: &mut Framebuffer, _data: &RenderData, fragment: &Fragment) {
        target.set(fragment.x, fragment.y, fragment.color);
    }
}

/// Samples the sprite (and mask) bitmaps at the fragment UV
#[derive(Debug, Clone, Copy, Default)]
pub struct SpriteShader;

impl Shader for SpriteShader {
    fn shade(&self, target: &mut Framebuffer, data: &RenderData, fragment: &Fragment) {
        let Some(sprite) = data.sprite.as_deref() else {
            return;
        };

        let uv = if data.tile_mode.is_tiled() {
            tiled_uv(fragment.uv, fragment.scaling, data.tile_mode, sprite)
        } else {
            fragment.uv
        };

        if let Some(mask) = data.mask.as_deref() {
            if mask.sample(uv) {
                target.set(fragment.x, fragment.y, data.mask_color);
            }
        }
        if sprite.sample(uv) {
            target.set(fragment.x, fragment.y, data.color);
        }
    }
}

/// Repeat UVs along the tiled axes
///
/// The UV is stretched by the transform scale on each tiled axis, wrapped
/// into `[0, 1)` and clamped to the last texel so sampling never lands one
/// past the far edge. Axes that are not tiled pass through untouched.
pub fn tiled_uv(uv: Vec2, scaling: Vec2, mode: TileMode, sprite: &Bitmap) -> Vec2 {
    fn wrap(value: f32, texels: u32) -> f32 {
        let max = 1.0 - 1.0 / texels as f32;
        let mut t = value - value.trunc();
        if t < 0.0 {
            t += 1.0;
        }
        t.min(max)
    }

    let mut out = uv;
    if mode.has_horizontal() {
        out.x = wrap(uv.x * scaling.x, sprite.width());
    }
    if mode.has_vertical() {
        out.y = wrap(uv.y * scaling.y, sprite.height());
    }
    out
}

/// Everything needed to draw one textured or filled quad
///
/// Bitmaps are shared with the asset store and never modified here.
#[derive(Clone, Default)]
pub struct RenderData {
    pub quad: Quad,
    pub sprite: Option<Arc<Bitmap>>,
    pub mask: Option<Arc<Bitmap>>,
    pub color: PixelColor,
    pub mask_color: PixelColor,
    pub tile_mode: TileMode,
    /// Overrides the built-in solid or sprite shading
    pub shader: Option<Arc<dyn Shader>>,
}

impl RenderData {
    /// Untextured quad
    ///
    /// Scene sprites fill with `color`. Drawn directly through a
    /// [`Canvas`], it takes the canvas draw color instead.
    pub fn filled(quad: Quad) -> Self {
        Self {
            quad,
            ..Self::default()
        }
    }

    /// Quad textured with `sprite`, inked black
    pub fn sprite(quad: Quad, sprite: Arc<Bitmap>) -> Self {
        Self {
            quad,
            sprite: Some(sprite),
            ..Self::default()
        }
    }

    pub fn with_mask(mut self, mask: Arc<Bitmap>, mask_color: PixelColor) -> Self {
        self.mask = Some(mask);
        self.mask_color = mask_color;
        self
    }

    pub fn with_color(mut self, color: PixelColor) -> Self {
        self.color = color;
        self
    }

    pub fn with_tiling(mut self, mode: TileMode) -> Self {
        self.tile_mode = mode;
        self
    }

    pub fn with_shader(mut self, shader: Arc<dyn Shader>) -> Self {
        self.shader = Some(shader);
        self
    }
}

impl fmt::Debug for RenderData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderData")
            .field("quad", &self.quad)
            .field("sprite", &self.sprite.as_ref().map(|s| (s.width(), s.height())))
            .field("mask", &self.mask.as_ref().map(|m| (m.width(), m.height())))
            .field("color", &self.color)
            .field("mask_color", &self.mask_color)
            .field("tile_mode", &self.tile_mode)
            .field("custom_shader", &self.shader.is_some())
            .finish()
    }
}

#[inline]
fn edge_function(a: Vec2, b: Vec2, c: Vec2) -> f32 {
    (c.x - a.x) * (b.y - a.y) - (c.y - a.y) * (b.x - a.x)
}

/// Pixel centres exactly on an inclusive edge are covered
#[inline]
fn covers(weight: f32, inclusive: bool) -> bool {
    weight > 0.0 || (inclusive && weight == 0.0)
}

/// Liang-Barsky clip of `a..b` against `[0, max]`
fn clip_segment(a: Vec2, b: Vec2, max: Vec2) -> Option<(Vec2, Vec2)> {
    let d = b - a;
    let (mut t0, mut t1) = (0.0f32, 1.0f32);

    for (p, q) in [(-d.x, a.x), (d.x, max.x - a.x), (-d.y, a.y), (d.y, max.y - a.y)] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }

        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }

    let clipped = (a + d * t0, a + d * t1);
    (clipped.0.is_finite() && clipped.1.is_finite()).then_some(clipped)
}

/// Drawing state bound to a framebuffer: active transform, camera and
/// draw color
pub struct Canvas<'a> {
    target: &'a mut Framebuffer,
    transform: Matrix,
    camera: Vector,
    color: PixelColor,
}

impl<'a> Canvas<'a> {
    pub fn new(target: &'a mut Framebuffer) -> Self {
        Self {
            target,
            transform: Mat3::IDENTITY,
            camera: Vec2::ZERO,
            color: PixelColor::Black,
        }
    }

    pub fn with_camera(mut self, camera: Vector) -> Self {
        self.camera = camera;
        self
    }

    pub fn target(&mut self) -> &mut Framebuffer {
        self.target
    }

    pub fn transform(&self) -> &Matrix {
        &self.transform
    }

    /// Transform applied to every point drawn from now on
    pub fn set_transform(&mut self, transform: Matrix) {
        self.transform = transform;
    }

    pub fn reset_transform(&mut self) {
        self.transform = Mat3::IDENTITY;
    }

    pub fn camera(&self) -> Vector {
        self.camera
    }

    pub fn set_camera(&mut self, camera: Vector) {
        self.camera = camera;
    }

    pub fn color(&self) -> PixelColor {
        self.color
    }

    /// Draw mode for lines, boxes and solid fills
    pub fn set_color(&mut self, color: PixelColor) {
        self.color = color;
    }

    /// Write one screen pixel with the draw color, ignored off-screen
    pub fn set_pixel(&mut self, x: i32, y: i32) {
        self.target.set(x, y, self.color);
    }

    /// Transform and fill a quad
    pub fn rasterize(&mut self, data: &RenderData) {
        let corners = data.quad.transformed(&self.transform);
        self.rasterize_corners(data, &corners);
    }

    /// Fill a quad whose corners were already transformed to world space
    ///
    /// The camera is still subtracted here. UV scaling for tiling comes from
    /// the active transform.
    pub fn rasterize_corners(&mut self, data: &RenderData, corners: &[Vec2; 4]) {
        if corners.iter().any(|c| !c.is_finite()) {
            log::warn!("Skipping quad with non-finite corners: {:?}", corners);
            return;
        }

        let screen = corners.map(|c| c - self.camera);

        let (min, max) = screen
            .iter()
            .fold((Vec2::splat(f32::MAX), Vec2::splat(f32::MIN)), |(lo, hi), c| {
                (lo.min(*c), hi.max(*c))
            });

        let width = self.target.width() as f32;
        let height = self.target.height() as f32;
        if max.x < 0.0 || max.y < 0.0 || min.x >= width || min.y >= height {
            return;
        }

        let shader: &dyn Shader = match data.shader.as_deref() {
            Some(shader) => shader,
            None if data.sprite.is_some() => &SpriteShader,
            None => &SolidFill,
        };

        let scaling = math::get_scaling(&self.transform);
        let uv = &data.quad.uv;

        // Outer edges are inclusive. The shared 0-2 diagonal belongs to the
        // first triangle only so no pixel is shaded twice.
        self.fill_triangle(
            data,
            shader,
            scaling,
            [screen[0], screen[2], screen[1]],
            [uv[0], uv[2], uv[1]],
            [true, true, true],
        );
        self.fill_triangle(
            data,
            shader,
            scaling,
            [screen[0], screen[3], screen[2]],
            [uv[0], uv[3], uv[2]],
            [true, false, true],
        );
    }

    /// `inclusive[i]` decides whether centres exactly on the edge opposite
    /// vertex `i` are covered
    #[allow(clippy::too_many_arguments)]
    fn fill_triangle(
        &mut self,
        data: &RenderData,
        shader: &dyn Shader,
        scaling: Vec2,
        [a, b, c]: [Vec2; 3],
        [uv_a, uv_b, uv_c]: [Vec2; 3],
        inclusive: [bool; 3],
    ) {
        let area = edge_function(a, b, c);
        if area <= AREA_EPSILON {
            return;
        }

        let max_x = self.target.width() as i32 - 1;
        let max_y = self.target.height() as i32 - 1;

        let min_px = (a.x.min(b.x).min(c.x).floor() as i32).max(0);
        let min_py = (a.y.min(b.y).min(c.y).floor() as i32).max(0);
        let max_px = (a.x.max(b.x).max(c.x).ceil() as i32).min(max_x);
        let max_py = (a.y.max(b.y).max(c.y).ceil() as i32).min(max_y);
        if min_px > max_px || min_py > max_py {
            return;
        }

        // Coverage is tested on the raw edge functions, which stay exact for
        // pixel-aligned and half-pixel-aligned corners. Only the UV is
        // normalized.
        let inv_area = 1.0 / area;
        let p0 = Vec2::new(min_px as f32 + 0.5, min_py as f32 + 0.5);

        let mut e0_row = edge_function(b, c, p0);
        let mut e1_row = edge_function(c, a, p0);
        let mut e2_row = edge_function(a, b, p0);

        let e0_dx = c.y - b.y;
        let e1_dx = a.y - c.y;
        let e2_dx = b.y - a.y;

        let e0_dy = b.x - c.x;
        let e1_dy = c.x - a.x;
        let e2_dy = a.x - b.x;

        let mut fragment = Fragment {
            x: 0,
            y: 0,
            uv: Vec2::ZERO,
            scaling,
            color: self.color,
        };

        for y in min_py..=max_py {
            let (mut e0, mut e1, mut e2) = (e0_row, e1_row, e2_row);

            for x in min_px..=max_px {
                if covers(e0, inclusive[0]) && covers(e1, inclusive[1]) && covers(e2, inclusive[2])
                {
                    fragment.x = x;
                    fragment.y = y;
                    fragment.uv = (uv_a * e0 + uv_b * e1 + uv_c * e2) * inv_area;
                    shader.shade(self.target, data, &fragment);
                }

                e0 += e0_dx;
                e1 += e1_dx;
                e2 += e2_dx;
            }

            e0_row += e0_dy;
            e1_row += e1_dy;
            e2_row += e2_dy;
        }
    }

    /// Bresenham line between two local points, clipped to the screen
    pub fn draw_line(&mut self, from: Vector, to: Vector) {
        let a = math::transform_point(&self.transform, from) - self.camera;
        let b = math::transform_point(&self.transform, to) - self.camera;
        if !a.is_finite() || !b.is_finite() {
            log::warn!("Skipping line with non-finite endpoints");
            return;
        }

        let max_x = self.target.width() as i32 - 1;
        let max_y = self.target.height() as i32 - 1;
        let bounds = Vec2::new(
            self.target.width() as f32 - LINE_CLIP_INSET,
            self.target.height() as f32 - LINE_CLIP_INSET,
        );
        let Some((a, b)) = clip_segment(a, b, bounds) else {
            return;
        };

        // Clipping huge endpoints loses precision; the clamp keeps the
        // stepping inside the screen regardless
        let pixel = |p: Vec2| {
            (
                (p.x.floor() as i32).clamp(0, max_x),
                (p.y.floor() as i32).clamp(0, max_y),
            )
        };
        let (mut x0, mut y0) = pixel(a);
        let (x1, y1) = pixel(b);

        let dx = (x1 - x0).abs();
        let dy = (y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = (if dx > dy { dx } else { -dy }) / 2;

        loop {
            self.target.set(x0, y0, self.color);
            if x0 == x1 && y0 == y1 {
                break;
            }
            let e2 = err;
            if e2 > -dx {
                err -= dy;
                x0 += sx;
            }
            if e2 < dy {
                err += dx;
                y0 += sy;
            }
        }
    }

    /// Filled rectangle, routed through the rasterizer
    pub fn draw_box(&mut self, rect: Rect) {
        self.rasterize(&RenderData::filled(rect.into()));
    }

    /// Rectangle outline
    pub fn draw_frame(&mut self, rect: Rect) {
        let [tl, tr, br, bl] = Quad::from(rect).corners;
        self.draw_line(tl, tr);
        self.draw_line(tr, br);
        self.draw_line(br, bl);
        self.draw_line(bl, tl);
    }
}
