use std::fs;
use std::path::Path;

use crate::coords::{Rect, Vec2};
use crate::texture::{
    copy_rows_flipped, MipChain, PixelFormat, TextureError, TextureHandle, TextureKey, TextureManager,
    TextureEntity, TexturePayload, IMAGE_ROW_ALIGN,
};

/// Side of the square glyph atlas, in texels.
pub const ATLAS_SIZE: u32 = 1024;
/// Side of one atlas cell. The atlas holds `(ATLAS_SIZE / CELL_SIZE)²` cells.
pub const CELL_SIZE: u32 = 64;
/// Pixel size glyphs are rasterized at; leaves headroom inside a cell.
pub const RASTER_PX: f32 = 48.0;
/// First and last character code baked into the atlas (Latin-1 range).
pub const FIRST_CHAR: u32 = 32;
pub const LAST_CHAR: u32 = 255;

const CELLS_PER_ROW: u32 = ATLAS_SIZE / CELL_SIZE;

/// Placement and metrics of one baked character, at [`RASTER_PX`].
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct GlyphMetrics {
    /// Bitmap size inside the cell.
    pub width: u32,
    pub height: u32,
    /// Offset of the bitmap's left edge from the pen.
    pub xmin: f32,
    /// Offset of the bitmap's bottom edge above the baseline.
    pub ymin: f32,
    pub advance: f32,
    /// Top-left texel of the glyph's cell.
    pub cell: (u32, u32),
}

/// One textured quad produced by [`FontGlyphs::layout`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GlyphQuad {
    pub rect: Rect,
    /// Atlas coordinates, top-left origin, normalized.
    pub uv_min: [f32; 2],
    pub uv_max: [f32; 2],
}

/// Glyph table of a baked font atlas.
#[derive(Debug, Clone)]
pub struct FontGlyphs {
    name: String,
    glyphs: Vec<GlyphMetrics>,
    ascent: f32,
    line_gap: f32,
    descent: f32,
}

impl FontGlyphs {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    pub fn glyph(&self, c: char) -> Option<&GlyphMetrics> {
        let code = u32::from(c);
        if !(FIRST_CHAR..=LAST_CHAR).contains(&code) {
            return None;
        }
        self.glyphs.get((code - FIRST_CHAR) as usize)
    }

    /// Distance between consecutive baselines at `size`.
    pub fn line_height(&self, size: f32) -> f32 {
        (self.ascent - self.descent + self.line_gap) * size / RASTER_PX
    }

    /// Lays out one line of `text` with its top-left corner at `origin`.
    ///
    /// Control characters produce no quad and do not advance the pen.
    /// Characters outside the baked range render as `?`.
    pub fn layout(&self, text: &str, size: f32, origin: Vec2) -> Vec<GlyphQuad> {
        let scale = size / RASTER_PX;
        let baseline = origin.y + self.ascent * scale;
        let mut pen = origin.x;
        let mut quads = Vec::with_capacity(text.len());

        for c in text.chars() {
            if c.is_control() {
                continue;
            }
            let Some(g) = self.glyph(c).or_else(|| self.glyph('?')) else {
                continue;
            };
            if g.width > 0 && g.height > 0 {
                let x = pen + g.xmin * scale;
                let top = baseline - (g.ymin + g.height as f32) * scale;
                let atlas = ATLAS_SIZE as f32;
                quads.push(GlyphQuad {
                    rect: Rect::new(x, top, g.width as f32 * scale, g.height as f32 * scale),
                    uv_min: [g.cell.0 as f32 / atlas, g.cell.1 as f32 / atlas],
                    uv_max: [
                        (g.cell.0 + g.width) as f32 / atlas,
                        (g.cell.1 + g.height) as f32 / atlas,
                    ],
                });
            }
            pen += g.advance * scale;
        }
        quads
    }

    /// Advance width and line height of `text` at `size`.
    pub fn measure(&self, text: &str, size: f32) -> Vec2 {
        let scale = size / RASTER_PX;
        let width = text
            .chars()
            .filter(|c| !c.is_control())
            .filter_map(|c| self.glyph(c).or_else(|| self.glyph('?')))
            .map(|g| g.advance * scale)
            .sum();
        Vec2::new(width, self.line_height(size))
    }
}

/// Rasterizes every baked character of `font` into a top-down alpha atlas
/// of `ATLAS_SIZE²` bytes.
fn bake(font: &fontdue::Font, name: &str) -> (FontGlyphs, Vec<u8>) {
    let mut atlas = vec![0u8; (ATLAS_SIZE * ATLAS_SIZE) as usize];
    let mut glyphs = Vec::with_capacity((LAST_CHAR - FIRST_CHAR + 1) as usize);

    for (slot, code) in (FIRST_CHAR..=LAST_CHAR).enumerate() {
        let slot = slot as u32;
        let cell = ((slot % CELLS_PER_ROW) * CELL_SIZE, (slot / CELLS_PER_ROW) * CELL_SIZE);
        let Some(c) = char::from_u32(code) else {
            glyphs.push(GlyphMetrics { cell, ..GlyphMetrics::default() });
            continue;
        };

        let (metrics, bitmap) = font.rasterize(c, RASTER_PX);
        let width = (metrics.width as u32).min(CELL_SIZE);
        let height = (metrics.height as u32).min(CELL_SIZE);
        for row in 0..height as usize {
            let src = &bitmap[row * metrics.width..row * metrics.width + width as usize];
            let dst = (cell.1 as usize + row) * ATLAS_SIZE as usize + cell.0 as usize;
            atlas[dst..dst + width as usize].copy_from_slice(src);
        }

        glyphs.push(GlyphMetrics {
            width,
            height,
            xmin: metrics.xmin as f32,
            ymin: metrics.ymin as f32,
            advance: metrics.advance_width,
            cell,
        });
    }

    let (ascent, descent, line_gap) = match font.horizontal_line_metrics(RASTER_PX) {
        Some(m) => (m.ascent, m.descent, m.line_gap),
        None => (RASTER_PX * 0.8, -RASTER_PX * 0.2, 0.0),
    };

    let table = FontGlyphs {
        name: name.to_string(),
        glyphs,
        ascent,
        line_gap,
        descent,
    };
    (table, atlas)
}

impl TextureManager {
    /// Loads a TrueType/OpenType file as the `FONT:<path>` atlas texture.
    pub fn load_font_file(&self, path: impl AsRef<Path>) -> Result<TextureHandle, TextureError> {
        let path = path.as_ref();
        let name = path.display().to_string();
        self.load_font_with(&name, || {
            fs::read(path).map_err(|source| TextureError::Io {
                path: path.to_path_buf(),
                source,
            })
        })
    }

    /// Bakes font `bytes` into the `FONT:<name>` atlas texture. A font
    /// already cached under `name` is returned as is.
    pub fn load_font_bytes(&self, name: &str, bytes: &[u8]) -> Result<TextureHandle, TextureError> {
        self.load_font_with(name, || Ok(bytes.to_vec()))
    }

    /// The glyph table of a font texture.
    pub fn font_glyphs(&self, texture: &TextureHandle) -> Option<FontGlyphs> {
        match &texture.entity().lock().aux {
            Some(TexturePayload::Font(glyphs)) => Some(glyphs.clone()),
            _ => None,
        }
    }

    fn load_font_with(
        &self,
        name: &str,
        read: impl FnOnce() -> Result<Vec<u8>, TextureError>,
    ) -> Result<TextureHandle, TextureError> {
        let handle = self.acquire(TextureKey::font(name))?.handle;
        let font_err = |reason: String| TextureError::Font {
            name: name.to_string(),
            reason,
        };

        let mut state = handle.entity().lock();
        let baked = match &state.aux {
            Some(TexturePayload::Font(_)) => true,
            Some(TexturePayload::Video(_)) => {
                return Err(font_err("key is used by a video texture".into()));
            }
            None => false,
        };
        if baked {
            drop(state);
            return Ok(handle);
        }

        let bytes = read().inspect_err(|e| log::warn!("cannot read font `{name}`: {e}"))?;
        let font = fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default())
            .map_err(|e| font_err(e.to_string()))
            .inspect_err(|e| log::warn!("{e}"))?;
        let (glyphs, atlas) = bake(&font, name);

        let layout = MipChain::new(ATLAS_SIZE, ATLAS_SIZE, 0, 1, IMAGE_ROW_ALIGN)?;
        let base = *layout.base();
        let buffer = state.allocate(handle.key(), layout, PixelFormat::ALPHA8)?;
        copy_rows_flipped(
            &mut buffer[base.range()],
            base.stride as usize,
            &atlas,
            ATLAS_SIZE as usize,
            ATLAS_SIZE as usize,
            ATLAS_SIZE as usize,
        );
        log::debug!("baked font `{name}` ({} glyphs)", glyphs.len());
        state.aux = Some(TexturePayload::Font(glyphs));
        drop(state);
        Ok(handle)
    }
}

/// Lays `text` out with the glyph table of `font`. `None` unless `font` is
/// a baked font texture.
pub(crate) fn layout_text(
    font: &TextureEntity,
    text: &str,
    size: f32,
    origin: Vec2,
) -> Option<Vec<GlyphQuad>> {
    match &font.lock().aux {
        Some(TexturePayload::Font(glyphs)) => Some(glyphs.layout(text, size, origin)),
        _ => None,
    }
}
