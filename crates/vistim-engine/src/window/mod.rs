//! Window and event loop.
//!
//! Owns the `winit` event loop and the stimulus window, and wires them to
//! the GPU context and the texture registry.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig};
