use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::texture::{
    GpuTexture, GpuTextureId, GpuUploader, MipLevel, TextureDesc, TextureError, UploadLayout,
};

/// A live texture as the renderers see it.
#[derive(Debug, Clone)]
pub struct SampledTexture {
    pub view: wgpu::TextureView,
    pub layout: UploadLayout,
    pub size: (u32, u32),
}

type Registry = Arc<Mutex<HashMap<GpuTextureId, SampledTexture>>>;

/// [`GpuUploader`] backed by a wgpu device.
///
/// Every texture it creates is registered under its id so renderers can
/// resolve the id returned by `bind` to a view. The entry is removed when
/// the owning entity drops its GPU object.
#[derive(Clone)]
pub struct WgpuUploader {
    device: wgpu::Device,
    queue: wgpu::Queue,
    textures: Registry,
    next_id: Arc<AtomicU32>,
}

impl WgpuUploader {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            textures: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn lookup(&self, id: GpuTextureId) -> Option<SampledTexture> {
        self.textures.lock().get(&id).cloned()
    }

    /// Number of GPU textures currently alive.
    pub fn live_textures(&self) -> usize {
        self.textures.lock().len()
    }

    fn allocate_id(&self) -> Result<GpuTextureId, TextureError> {
        let raw = self.next_id.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        GpuTextureId::new(raw).ok_or_else(|| TextureError::GpuCreate("texture ids exhausted".into()))
    }
}

impl std::fmt::Debug for WgpuUploader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuUploader").field("live", &self.live_textures()).finish()
    }
}

impl GpuUploader for WgpuUploader {
    fn create_texture(
        &self,
        desc: &TextureDesc<'_>,
        data: &[u8],
    ) -> Result<Box<dyn GpuTexture>, TextureError> {
        let base = *desc
            .levels
            .first()
            .ok_or_else(|| TextureError::GpuCreate(format!("`{}` has no mip levels", desc.label)))?;
        check_extent(&base, self.device.limits().max_texture_dimension_2d)?;
        check_data(desc.levels, data)?;

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(desc.label),
            size: wgpu::Extent3d {
                width: base.width,
                height: base.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: desc.levels.len() as u32,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: desc.format.internal,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (index, level) in desc.levels.iter().enumerate() {
            write_level(&self.queue, &texture, index as u32, level, data);
        }

        let id = self.allocate_id()?;
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.textures.lock().insert(
            id,
            SampledTexture { view, layout: desc.format.upload, size: (base.width, base.height) },
        );
        log::debug!(
            "created gpu texture #{} `{}` {}x{} ({} levels{})",
            id.get(),
            desc.label,
            base.width,
            base.height,
            desc.levels.len(),
            if desc.streaming { ", streaming" } else { "" }
        );

        Ok(Box::new(WgpuTexture {
            id,
            texture,
            queue: self.queue.clone(),
            levels: desc.levels.to_vec(),
            registry: Arc::clone(&self.textures),
        }))
    }
}

struct WgpuTexture {
    id: GpuTextureId,
    texture: wgpu::Texture,
    queue: wgpu::Queue,
    levels: Vec<MipLevel>,
    registry: Registry,
}

impl GpuTexture for WgpuTexture {
    fn id(&self) -> GpuTextureId {
        self.id
    }

    fn update_level(&self, level: &MipLevel, data: &[u8]) -> Result<(), TextureError> {
        let index = level_index(&self.levels, level).ok_or_else(|| {
            TextureError::GpuUpload(format!(
                "level {}x{} at offset {} is not part of texture #{}",
                level.width,
                level.height,
                level.offset,
                self.id.get()
            ))
        })?;
        if data.len() < level.range().end {
            return Err(TextureError::GpuUpload(format!(
                "frame holds {} bytes, level needs {}",
                data.len(),
                level.range().end
            )));
        }
        write_level(&self.queue, &self.texture, index, level, data);
        Ok(())
    }
}

impl Drop for WgpuTexture {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.id);
        log::trace!("gpu texture #{} released", self.id.get());
    }
}

fn write_level(queue: &wgpu::Queue, texture: &wgpu::Texture, index: u32, level: &MipLevel, data: &[u8]) {
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: index,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &data[level.range()],
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(level.stride),
            rows_per_image: Some(level.height),
        },
        wgpu::Extent3d {
            width: level.width,
            height: level.height,
            depth_or_array_layers: 1,
        },
    );
}

fn level_index(levels: &[MipLevel], level: &MipLevel) -> Option<u32> {
    levels.iter().position(|l| l == level).map(|i| i as u32)
}

fn check_extent(base: &MipLevel, max_dimension: u32) -> Result<(), TextureError> {
    if base.width > max_dimension || base.height > max_dimension {
        return Err(TextureError::GpuCreate(format!(
            "{}x{} exceeds the device limit of {max_dimension}",
            base.width, base.height
        )));
    }
    Ok(())
}

fn check_data(levels: &[MipLevel], data: &[u8]) -> Result<(), TextureError> {
    let needed = levels.iter().map(|l| l.range().end).max().unwrap_or(0);
    if data.len() < needed {
        return Err(TextureError::GpuCreate(format!(
            "buffer holds {} bytes, pyramid needs {needed}",
            data.len()
        )));
    }
    Ok(())
}
