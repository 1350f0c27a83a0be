//! Benchmarks for mono-gfx
//!
//! Measures quad fill rate for the built-in shaders and framebuffer clears.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::Vec2;
use mono_gfx::{math, Bitmap, Canvas, Framebuffer, PixelColor, Quad, RenderData, TileMode};
use std::sync::Arc;

fn checker(width: u32, height: u32) -> Arc<Bitmap> {
    let mut bitmap = Bitmap::new(width, height).unwrap();
    for y in 0..height as i32 {
        for x in 0..width as i32 {
            if (x + y) % 2 == 0 {
                bitmap.set(x, y, PixelColor::Black);
            }
        }
    }
    Arc::new(bitmap)
}

fn bench_solid_fill(c: &mut Criterion) {
    let mut group = c.benchmark_group("solid_fill");

    for size in [8.0f32, 32.0, 64.0].iter() {
        let mut fb = Framebuffer::new(128, 64, false).unwrap();
        let data = RenderData::filled(Quad::rect(0.0, 0.0, *size, *size));

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let mut canvas = Canvas::new(&mut fb);
                canvas.rasterize(black_box(&data));
            });
        });
    }

    group.finish();
}

fn bench_sprite(c: &mut Criterion) {
    let mut group = c.benchmark_group("sprite");
    let sprite = checker(16, 16);

    group.bench_function("rotated", |b| {
        let mut fb = Framebuffer::new(128, 64, false).unwrap();
        let data = RenderData::sprite(Quad::rect(-8.0, -8.0, 16.0, 16.0), sprite.clone());
        let transform = math::compose(Vec2::new(64.0, 32.0), 30.0, Vec2::splat(2.0));

        b.iter(|| {
            let mut canvas = Canvas::new(&mut fb);
            canvas.set_transform(transform);
            canvas.rasterize(black_box(&data));
        });
    });

    group.bench_function("tiled_background", |b| {
        let mut fb = Framebuffer::new(128, 64, false).unwrap();
        let data = RenderData::sprite(Quad::rect(0.0, 0.0, 16.0, 8.0), sprite.clone())
            .with_tiling(TileMode::BOTH);
        let transform = math::scale(Vec2::splat(8.0));

        b.iter(|| {
            let mut canvas = Canvas::new(&mut fb);
            canvas.set_transform(transform);
            canvas.rasterize(black_box(&data));
        });
    });

    group.finish();
}

fn bench_clear(c: &mut Criterion) {
    let mut fb = Framebuffer::new(128, 64, true).unwrap();

    c.bench_function("clear_and_swap", |b| {
        b.iter(|| {
            fb.clear();
            fb.swap_back();
            black_box(fb.bytes());
        });
    });
}

criterion_group!(benches, bench_solid_fill, bench_sprite, bench_clear);
criterion_main!(benches);
