//! Draw stream.
//!
//! A [`DrawList`] records renderer-agnostic commands for one frame and
//! yields them back-to-front (z-index, then insertion order). Textured
//! commands carry a [`TextureRef`](crate::texture::TextureRef); the
//! renderer binds it, which performs any pending upload.

mod cmd;
mod key;
mod list;
mod z_index;

pub mod shapes;

pub use cmd::DrawCmd;
pub use key::SortKey;
pub use list::{DrawItem, DrawList};
pub use z_index::ZIndex;
