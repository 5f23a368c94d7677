//! Contract between the window runtime and the application.
//!
//! The runtime owns the window, the GPU context and the scene renderer;
//! the application records a [`DrawList`](crate::scene::DrawList) each
//! frame and hands it back through [`FrameCtx::render`].

mod app;
mod ctx;

pub use app::{App, AppControl};
pub use ctx::FrameCtx;
