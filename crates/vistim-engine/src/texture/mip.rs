use super::TextureError;

/// Highest mip level an entity may carry (level 0 is the base image).
pub const MAX_MIP_LEVEL: u32 = 10;

/// Row alignment used for static images and glyph atlases.
pub const IMAGE_ROW_ALIGN: u32 = 4;

/// Row alignment used for streaming video frames (GPU copy pitch).
pub const VIDEO_ROW_ALIGN: u32 = 256;

/// Geometry of one mip level inside an entity buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct MipLevel {
    pub width: u32,
    pub height: u32,
    /// Bytes per row, including alignment padding.
    pub stride: u32,
    /// Byte offset of the level's first row in the entity buffer.
    pub offset: usize,
}

impl MipLevel {
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.stride as usize * self.height as usize
    }

    #[inline]
    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.byte_len()
    }
}

/// Layout of a mip pyramid in one contiguous buffer.
///
/// Level `i + 1` is level `i` halved (floor) in both dimensions. The chain
/// stops early once a halved dimension would reach zero, so every level has
/// a non-empty image.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct MipChain {
    levels: Vec<MipLevel>,
    bytes_per_pixel: u32,
    byte_len: usize,
}

impl MipChain {
    pub fn new(
        width: u32,
        height: u32,
        max_level: u32,
        bytes_per_pixel: u32,
        row_align: u32,
    ) -> Result<Self, TextureError> {
        let invalid = || TextureError::InvalidDimensions { width, height };
        if width == 0 || height == 0 || bytes_per_pixel == 0 {
            return Err(invalid());
        }
        debug_assert!(row_align.is_power_of_two());

        let max_level = max_level.min(MAX_MIP_LEVEL);
        let mut levels = Vec::with_capacity(max_level as usize + 1);
        let (mut w, mut h) = (width, height);
        let mut offset = 0usize;

        for _ in 0..=max_level {
            if w == 0 || h == 0 {
                break;
            }
            let row = w.checked_mul(bytes_per_pixel).ok_or_else(invalid)?;
            let stride = align_up(row, row_align).ok_or_else(invalid)?;
            let level = MipLevel { width: w, height: h, stride, offset };
            offset = offset.checked_add(level.byte_len()).ok_or_else(invalid)?;
            levels.push(level);
            w /= 2;
            h /= 2;
        }

        Ok(Self { levels, bytes_per_pixel, byte_len: offset })
    }

    #[inline]
    pub fn levels(&self) -> &[MipLevel] {
        &self.levels
    }

    #[inline]
    pub fn base(&self) -> &MipLevel {
        &self.levels[0]
    }

    #[inline]
    pub fn level(&self, i: usize) -> Option<&MipLevel> {
        self.levels.get(i)
    }

    /// Number of levels, always at least one.
    #[inline]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    #[inline]
    pub fn bytes_per_pixel(&self) -> u32 {
        self.bytes_per_pixel
    }

    /// Total bytes of the whole pyramid.
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.byte_len
    }
}

fn align_up(value: u32, align: u32) -> Option<u32> {
    let mask = align.max(1) - 1;
    value.checked_add(mask).map(|v| v & !mask)
}

/// Copies `height` rows of `row_bytes` from `src` into `dst`, reversing the
/// row order. Strides may differ on each side.
pub(crate) fn copy_rows_flipped(
    dst: &mut [u8],
    dst_stride: usize,
    src: &[u8],
    src_stride: usize,
    row_bytes: usize,
    height: usize,
) {
    for y in 0..height {
        let s = y * src_stride;
        let d = (height - 1 - y) * dst_stride;
        let (Some(src_row), Some(dst_row)) = (src.get(s..s + row_bytes), dst.get_mut(d..d + row_bytes))
        else {
            break;
        };
        dst_row.copy_from_slice(src_row);
    }
}
