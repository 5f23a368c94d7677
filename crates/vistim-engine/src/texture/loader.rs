use std::path::Path;

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageBuffer, Pixel};

use super::entity::EntityState;
use super::mip::{copy_rows_flipped, IMAGE_ROW_ALIGN, MAX_MIP_LEVEL};
use super::{MipChain, PixelFormat, TextureError, TextureHandle, TextureKey, TextureManager};

/// Options for [`TextureManager::load_image`].
#[derive(Debug, Copy, Clone)]
pub struct ImageOptions {
    /// Highest mip level to generate. Clamped to what the image size allows.
    pub max_level: u32,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self { max_level: MAX_MIP_LEVEL }
    }
}

impl TextureManager {
    /// Loads an image file as a mip-mapped texture keyed `IMAGE:<path>`.
    ///
    /// Loading a path that is already cached returns another handle to the
    /// same entity without touching the file again.
    pub fn load_image(
        &self,
        path: impl AsRef<Path>,
        options: ImageOptions,
    ) -> Result<TextureHandle, TextureError> {
        let path = path.as_ref();
        let handle = self.acquire(TextureKey::image(path))?.handle;

        let result = {
            let mut state = handle.entity().lock();
            if state.is_allocated() {
                Ok(())
            } else {
                decode_into(&mut state, handle.key(), path, options)
            }
        };

        match result {
            Ok(()) => Ok(handle),
            Err(err) => {
                log::warn!("image {} not loaded: {err}", path.display());
                drop(handle);
                Err(err)
            }
        }
    }
}

fn decode_into(
    state: &mut EntityState,
    key: &TextureKey,
    path: &Path,
    options: ImageOptions,
) -> Result<(), TextureError> {
    let img = image::open(path).map_err(|source| TextureError::Decode {
        path: path.to_path_buf(),
        source,
    })?;

    match img {
        DynamicImage::ImageLuma8(grey) => fill_pyramid(state, key, &grey, PixelFormat::LUMA8, options),
        other => fill_pyramid(state, key, &other.to_rgba8(), PixelFormat::RGBA8, options),
    }
}

/// Writes `base` and its down-scaled levels into the entity buffer, bottom
/// row first.
fn fill_pyramid<P>(
    state: &mut EntityState,
    key: &TextureKey,
    base: &ImageBuffer<P, Vec<u8>>,
    format: PixelFormat,
    options: ImageOptions,
) -> Result<(), TextureError>
where
    P: Pixel<Subpixel = u8> + 'static,
{
    let bpp = format.bytes_per_pixel();
    let layout = MipChain::new(base.width(), base.height(), options.max_level, bpp, IMAGE_ROW_ALIGN)?;
    let levels = layout.levels().to_vec();
    let buffer = state.allocate(key, layout, format)?;

    for (i, level) in levels.iter().enumerate() {
        let scaled;
        let src = if i == 0 {
            base
        } else {
            scaled = imageops::resize(base, level.width, level.height, FilterType::CatmullRom);
            &scaled
        };
        let row_bytes = (level.width * bpp) as usize;
        copy_rows_flipped(
            &mut buffer[level.range()],
            level.stride as usize,
            src.as_raw(),
            row_bytes,
            row_bytes,
            level.height as usize,
        );
    }
    Ok(())
}
