use crate::coords::Vec2;
use crate::paint::Color;
use crate::scene::{DrawCmd, DrawList, ZIndex};
use crate::text::{layout_text, GlyphQuad};
use crate::texture::{TextureHandle, TextureRef};

/// A run of glyph quads sampled from one font atlas.
#[derive(Debug, Clone, PartialEq)]
pub struct TextCmd {
    pub font: TextureRef,
    /// Laid out when recorded.
    pub quads: Vec<GlyphQuad>,
    pub color: Color,
}

impl DrawList {
    /// Lays `text` out at `origin` (top-left of the line box) in `font`.
    ///
    /// Returns `false` and records nothing when `font` is not a font
    /// texture.
    pub fn push_text(
        &mut self,
        z: ZIndex,
        font: &TextureHandle,
        text: &str,
        size: f32,
        color: Color,
        origin: Vec2,
    ) -> bool {
        let Some(quads) = layout_text(font.entity(), text, size, origin) else {
            log::warn!("`{}` is not a font texture", font.key());
            return false;
        };
        if !quads.is_empty() {
            self.push(z, DrawCmd::Text(TextCmd { font: font.texture_ref(), quads, color }));
        }
        true
    }
}
