//! Screen geometry.
//!
//! Positions are logical pixels with the origin at the top-left of the
//! surface, +Y pointing down. Texture coordinates use the same orientation
//! (`(0, 0)` is the top-left texel of the image as the viewer sees it);
//! the textured shader maps them onto the bottom-up entity buffers.

mod rect;
mod vec2;
mod viewport;

pub use rect::Rect;
pub use vec2::Vec2;
pub use viewport::Viewport;
