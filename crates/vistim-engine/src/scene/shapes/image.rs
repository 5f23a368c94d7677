use crate::coords::{Rect, Vec2};
use crate::paint::Color;
use crate::scene::{DrawCmd, DrawList, ZIndex};
use crate::texture::{TextureHandle, TextureRef};

/// Textured quad: an image, a video frame or any other entity.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageCmd {
    pub texture: TextureRef,
    /// Destination in logical pixels.
    pub dest: Rect,
    /// Source region in texels, top-left origin; `None` samples the whole
    /// texture. Resolved against the texture size at draw time since video
    /// sizes are only known after the first frame.
    pub src: Option<Rect>,
    /// Multiplies the sampled color (premultiplied).
    pub tint: Color,
    /// Letterbox the texture into `dest` keeping its aspect ratio.
    pub keep_aspect: bool,
}

impl ImageCmd {
    pub fn new(texture: &TextureHandle, dest: Rect) -> Self {
        Self {
            texture: texture.texture_ref(),
            dest,
            src: None,
            tint: Color::opaque(1.0, 1.0, 1.0),
            keep_aspect: false,
        }
    }

    pub fn with_src(mut self, src: Rect) -> Self {
        self.src = Some(src);
        self
    }

    pub fn with_tint(mut self, tint: Color) -> Self {
        self.tint = tint;
        self
    }

    pub fn keep_aspect(mut self) -> Self {
        self.keep_aspect = true;
        self
    }

    /// Destination and unit texture coordinates for a texture of `size`
    /// texels.
    pub fn resolve(&self, size: (u32, u32)) -> (Rect, Rect) {
        let texels = Vec2::from_size(size);
        let src = self.src.unwrap_or(Rect::new(0.0, 0.0, texels.x, texels.y));
        let dest = if self.keep_aspect { self.dest.fit(src.size) } else { self.dest };
        (dest, src.to_unit(texels))
    }
}

impl DrawList {
    /// Draws the whole of `texture` stretched over `dest`.
    pub fn push_image(&mut self, z: ZIndex, texture: &TextureHandle, dest: Rect) {
        self.push(z, DrawCmd::Image(ImageCmd::new(texture, dest)));
    }

    pub fn push_image_cmd(&mut self, z: ZIndex, cmd: ImageCmd) {
        self.push(z, DrawCmd::Image(cmd));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::{TextureKey, TextureManager};

    fn handle(textures: &TextureManager) -> TextureHandle {
        textures.acquire(TextureKey::new("IMAGE:test.png")).unwrap().handle
    }

    #[test]
    fn whole_texture_maps_to_unit_square() {
        let textures = TextureManager::new();
        let cmd = ImageCmd::new(&handle(&textures), Rect::new(10.0, 10.0, 100.0, 50.0));
        let (dest, uv) = cmd.resolve((64, 32));
        assert_eq!(dest, Rect::new(10.0, 10.0, 100.0, 50.0));
        assert_eq!(uv, Rect::UNIT);
    }

    #[test]
    fn region_and_aspect_are_resolved_against_size() {
        let textures = TextureManager::new();
        let cmd = ImageCmd::new(&handle(&textures), Rect::new(0.0, 0.0, 100.0, 100.0))
            .with_src(Rect::new(0.0, 0.0, 32.0, 16.0))
            .keep_aspect();
        let (dest, uv) = cmd.resolve((64, 64));
        assert_eq!(dest, Rect::new(0.0, 25.0, 100.0, 50.0));
        assert_eq!(uv, Rect::new(0.0, 0.0, 0.5, 0.25));
    }

    #[test]
    fn recorded_image_does_not_hold_a_count() {
        let textures = TextureManager::new();
        let h = handle(&textures);
        let mut list = DrawList::new();
        list.push_image(ZIndex(0), &h, Rect::new(0.0, 0.0, 1.0, 1.0));
        assert_eq!(textures.refcount(h.key()), Some(1));
        drop(h);
        assert!(textures.is_empty());
        assert_eq!(list.len(), 1);
    }
}
