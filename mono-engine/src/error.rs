//! Error types for scene operations and engine setup

use crate::node::NodeId;
use mono_gfx::GfxError;
use thiserror::Error;

pub type SceneResult<T> = std::result::Result<T, SceneError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    #[error("node {0} no longer exists")]
    StaleNode(NodeId),

    #[error("node {0} already has a parent")]
    AlreadyAttached(NodeId),

    #[error("cannot attach node {0} under its own subtree")]
    Cycle(NodeId),

    #[error("node arena could not grow")]
    Allocation,
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("framebuffer setup failed: {0}")]
    Gfx(#[from] GfxError),

    #[error("scene setup failed: {0}")]
    Scene(#[from] SceneError),

    #[error("invalid configuration: {0}")]
    Config(String),
}
