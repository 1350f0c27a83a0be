//! Monochrome scene-graph engine
//!
//! Retained-mode 2-D engine for 1-bit displays.
//!
//! Key features:
//! - Arena-backed node tree with dirty-flag transform propagation
//! - Component lifecycle hooks (start, update, end)
//! - Paint-ordered render list kept in sync with attach/detach/free
//! - Fixed-rate frame loop with dirty-redraw skipping
//! - Scheduler and tweener for timed callbacks

pub mod camera;
pub mod component;
pub mod engine;
pub mod error;
pub mod input;
pub mod node;
pub mod scene;
pub mod scheduler;
pub mod transform;
pub mod tweener;
pub mod world;

pub use camera::*;
pub use component::*;
pub use engine::*;
pub use error::*;
pub use input::*;
pub use node::*;
pub use scene::*;
pub use scheduler::*;
pub use transform::*;
pub use tweener::*;
pub use world::*;

pub fn version() -> &'static str {
    "0.1.0"
}
