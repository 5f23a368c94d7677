use std::num::NonZeroU32;

use super::{MipLevel, PixelFormat, TextureError};

/// Identifier of a GPU texture object. Never zero; "not ready" is `None`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct GpuTextureId(NonZeroU32);

impl GpuTextureId {
    #[inline]
    pub fn new(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }

    #[inline]
    pub fn get(self) -> u32 {
        self.0.get()
    }
}

/// Parameters for creating a GPU texture from an entity buffer.
#[derive(Debug, Clone)]
pub struct TextureDesc<'a> {
    pub label: &'a str,
    pub format: PixelFormat,
    pub levels: &'a [MipLevel],
    /// Streaming textures are refreshed in place after creation.
    pub streaming: bool,
}

/// Creates GPU texture objects.
///
/// Implemented by the wgpu device layer; tests substitute a counting fake.
pub trait GpuUploader {
    /// Creates a texture and uploads every level of `data`, laid out as
    /// described by `desc.levels`.
    fn create_texture(
        &self,
        desc: &TextureDesc<'_>,
        data: &[u8],
    ) -> Result<Box<dyn GpuTexture>, TextureError>;
}

/// A live GPU texture object. Dropping it deletes the GPU object.
pub trait GpuTexture: Send + Sync {
    fn id(&self) -> GpuTextureId;

    /// Replaces the contents of `level` with the matching range of `data`
    /// without recreating the texture.
    fn update_level(&self, level: &MipLevel, data: &[u8]) -> Result<(), TextureError>;
}
