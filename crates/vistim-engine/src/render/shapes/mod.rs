//! Pipelines for the two kinds of quads the scene produces.

mod common;

pub mod rect;
pub mod textured;

pub(crate) use common::{logical_clip_to_scissor, ClipRect};
