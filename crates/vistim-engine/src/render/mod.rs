//! wgpu renderers.
//!
//! [`SceneRenderer`] draws a [`DrawList`](crate::scene::DrawList) in one
//! render pass, switching between the solid and the textured pipeline as
//! the paint order requires. Geometry is in logical pixels; shaders map it
//! to NDC with a viewport uniform.

mod ctx;
mod scene;
pub mod shapes;

pub use ctx::{RenderCtx, RenderTarget};
pub use scene::SceneRenderer;
