//! Benchmarks for mono-engine
//!
//! Measures transform propagation, the update walk and full frames.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::Vec2;
use mono_engine::{
    Component, Engine, EngineConfig, HeadlessDisplay, Node, NodeId, World,
};
use mono_gfx::{Quad, RenderData};
use std::time::Duration;

struct Drift;

impl Component for Drift {
    fn update(&mut self, node: NodeId, dt: f32, world: &mut World) {
        if let Some(transform) = world.transform_mut(node) {
            transform.translate(Vec2::new(dt, 0.0));
        }
    }
}

fn square() -> RenderData {
    RenderData::filled(Quad::rect(0.0, 0.0, 4.0, 4.0))
}

fn wide(count: usize) -> Node {
    let mut root = Node::new();
    for i in 0..count {
        root = root.with_child(Node::at(Vec2::new(i as f32, 0.0)).with_sprite(square()));
    }
    root
}

fn deep(depth: usize) -> Node {
    let mut node = Node::new().with_sprite(square());
    for _ in 0..depth {
        node = Node::at(Vec2::new(1.0, 0.0)).with_child(node);
    }
    node
}

fn bench_propagation(c: &mut Criterion) {
    let mut group = c.benchmark_group("propagate");

    for (name, tree) in [("wide", wide as fn(usize) -> Node), ("deep", deep)] {
        for size in [16usize, 128].iter() {
            let mut world = World::new(128, 64);
            let root = world.set_scene(tree(*size)).unwrap();

            group.bench_with_input(BenchmarkId::new(name, size), size, |b, _| {
                b.iter(|| {
                    if let Some(transform) = world.transform_mut(root) {
                        transform.rotate(1.0);
                    }
                    black_box(world.propagate_transforms());
                });
            });
        }
    }

    group.finish();
}

fn bench_update_walk(c: &mut Criterion) {
    let mut world = World::new(128, 64);
    let mut root = Node::new();
    for i in 0..64 {
        root = root.with_child(
            Node::at(Vec2::new(i as f32, 0.0))
                .with_sprite(square())
                .with_component(Drift),
        );
    }
    world.set_scene(root).unwrap();

    c.bench_function("update_walk_64", |b| {
        b.iter(|| {
            world.update_tree(black_box(0.016));
        });
    });
}

fn bench_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame");

    group.bench_function("static", |b| {
        let display = HeadlessDisplay::new(128, 64).unwrap();
        let mut engine = Engine::new(EngineConfig::default(), display).unwrap();
        engine.set_scene(wide(32)).unwrap();

        b.iter(|| engine.step(Duration::from_millis(16)));
    });

    group.bench_function("moving", |b| {
        let display = HeadlessDisplay::new(128, 64).unwrap();
        let mut engine = Engine::new(EngineConfig::default(), display).unwrap();
        let root = engine.set_scene(wide(32)).unwrap();

        b.iter(|| {
            if let Some(transform) = engine.world().transform_mut(root) {
                transform.translate(Vec2::new(0.5, 0.0));
            }
            engine.step(Duration::from_millis(16))
        });
    });

    group.finish();
}

criterion_group!(benches, bench_propagation, bench_update_walk, bench_frame);
criterion_main!(benches);
