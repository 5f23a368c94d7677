//! Font atlases.
//!
//! A font is baked once into a single alpha texture entity keyed
//! `FONT:<name>`; its glyph table rides along as the entity payload.

mod font;

pub use font::{
    FontGlyphs, GlyphMetrics, GlyphQuad, ATLAS_SIZE, CELL_SIZE, FIRST_CHAR, LAST_CHAR, RASTER_PX,
};

pub(crate) use font::layout_text;
