//! GPU-backed texture cache.
//!
//! This module is responsible for:
//! - deduplicating textures by key and reference counting them
//! - mip pyramid layout of the CPU buffers
//! - lazy GPU upload, including the double-buffered path for video
//! - loading static images into entities

mod entity;
mod error;
mod format;
mod gpu;
mod key;
mod loader;
mod manager;
mod mip;
mod ring;
mod upload;

pub use entity::{TextureEntity, TexturePayload};
pub use error::TextureError;
pub use format::{ChannelMasks, ComponentType, PixelFormat, UploadLayout};
pub use gpu::{GpuTexture, GpuTextureId, GpuUploader, TextureDesc};
pub use key::TextureKey;
pub use loader::ImageOptions;
pub use manager::{Acquired, EntityId, ManagerLease, TextureHandle, TextureManager, TextureRef};
pub use mip::{MipChain, MipLevel, IMAGE_ROW_ALIGN, MAX_MIP_LEVEL, VIDEO_ROW_ALIGN};
pub use ring::FrameRing;

pub(crate) use entity::{CpuBuffer, EntityState};
pub(crate) use mip::copy_rows_flipped;
