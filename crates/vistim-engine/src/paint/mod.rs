//! Colors.
//!
//! Renderers consume premultiplied alpha; [`palette`] holds the named
//! stimulus colors.

mod color;
pub mod palette;

pub use color::Color;
