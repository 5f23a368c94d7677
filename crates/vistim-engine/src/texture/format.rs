/// Scalar type of one channel in the CPU buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ComponentType {
    U8,
}

/// How the bytes of one pixel are interpreted when sampled.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum UploadLayout {
    /// One grey channel, drawn opaque.
    Luminance,
    /// One coverage channel, drawn in the tint color.
    Alpha,
    /// Four channels, red first.
    Rgba,
}

/// Bit masks of each channel within a pixel (little-endian byte order).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ChannelMasks {
    pub red: u32,
    pub green: u32,
    pub blue: u32,
    pub alpha: u32,
}

/// Pixel format of a texture entity, fixed when its buffer is allocated.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PixelFormat {
    pub internal: wgpu::TextureFormat,
    pub upload: UploadLayout,
    pub component: ComponentType,
    pub bits_per_pixel: u32,
    pub masks: ChannelMasks,
}

impl PixelFormat {
    pub const LUMA8: Self = Self {
        internal: wgpu::TextureFormat::R8Unorm,
        upload: UploadLayout::Luminance,
        component: ComponentType::U8,
        bits_per_pixel: 8,
        masks: ChannelMasks { red: 0xff, green: 0xff, blue: 0xff, alpha: 0 },
    };

    pub const ALPHA8: Self = Self {
        internal: wgpu::TextureFormat::R8Unorm,
        upload: UploadLayout::Alpha,
        component: ComponentType::U8,
        bits_per_pixel: 8,
        masks: ChannelMasks { red: 0, green: 0, blue: 0, alpha: 0xff },
    };

    pub const RGBA8: Self = Self {
        internal: wgpu::TextureFormat::Rgba8Unorm,
        upload: UploadLayout::Rgba,
        component: ComponentType::U8,
        bits_per_pixel: 32,
        masks: ChannelMasks {
            red: 0x0000_00ff,
            green: 0x0000_ff00,
            blue: 0x00ff_0000,
            alpha: 0xff00_0000,
        },
    };

    #[inline]
    pub const fn bytes_per_pixel(&self) -> u32 {
        self.bits_per_pixel / 8
    }
}

impl Default for PixelFormat {
    fn default() -> Self {
        Self::RGBA8
    }
}
