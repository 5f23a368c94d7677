use std::mem;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::text::FontGlyphs;
use crate::video::VideoPipeline;

use super::{FrameRing, GpuTexture, MipChain, PixelFormat, TextureError, TextureKey};

/// Backend-specific data owned by an entity and destroyed with it.
pub enum TexturePayload {
    Font(FontGlyphs),
    Video(VideoPipeline),
}

impl TexturePayload {
    /// Releases the payload's resources. For video this stops the decoder
    /// thread and idles the pipeline; it may block on a thread join.
    pub fn destroy(self) {
        match self {
            TexturePayload::Font(_) => {}
            TexturePayload::Video(pipeline) => pipeline.shutdown(),
        }
    }
}

impl std::fmt::Debug for TexturePayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TexturePayload::Font(g) => f.debug_tuple("Font").field(&g.len()).finish(),
            TexturePayload::Video(p) => f.debug_tuple("Video").field(&p.state()).finish(),
        }
    }
}

/// CPU side storage of an entity.
#[derive(Debug, Default)]
pub(crate) enum CpuBuffer {
    #[default]
    Empty,
    Plain(Vec<u8>),
    /// Streaming entities after their first upload.
    Ring(FrameRing),
}

/// Mutable part of an entity, guarded by the entity lock.
pub(crate) struct EntityState {
    pub(crate) layout: Option<MipChain>,
    pub(crate) format: PixelFormat,
    pub(crate) cpu: CpuBuffer,
    /// Shared so a frame refresh can upload with the lock released.
    pub(crate) gpu: Option<Arc<dyn GpuTexture>>,
    pub(crate) is_video: bool,
    /// The CPU buffer holds a frame the GPU has not seen yet.
    pub(crate) outdated: bool,
    pub(crate) aux: Option<TexturePayload>,
}

impl EntityState {
    fn empty() -> Self {
        Self {
            layout: None,
            format: PixelFormat::default(),
            cpu: CpuBuffer::Empty,
            gpu: None,
            is_video: false,
            outdated: false,
            aux: None,
        }
    }

    /// Fixes the entity geometry and allocates a zeroed buffer for every level.
    pub(crate) fn allocate(
        &mut self,
        key: &TextureKey,
        layout: MipChain,
        format: PixelFormat,
    ) -> Result<&mut [u8], TextureError> {
        if self.layout.is_some() {
            return Err(TextureError::AlreadyAllocated { key: key.to_string() });
        }
        self.cpu = CpuBuffer::Plain(vec![0u8; layout.byte_len()]);
        self.layout = Some(layout);
        self.format = format;
        Ok(self.write_buffer().unwrap_or_default())
    }

    /// Buffer the next frame should be written into, if allocated.
    pub(crate) fn write_buffer(&mut self) -> Option<&mut [u8]> {
        match &mut self.cpu {
            CpuBuffer::Empty => None,
            CpuBuffer::Plain(data) => Some(data.as_mut_slice()),
            CpuBuffer::Ring(ring) => Some(ring.back_mut()),
        }
    }

    #[inline]
    pub(crate) fn is_allocated(&self) -> bool {
        self.layout.is_some()
    }

    pub(crate) fn base_size(&self) -> Option<(u32, u32)> {
        self.layout.as_ref().map(|l| (l.base().width, l.base().height))
    }
}

/// A cached GPU-backed image: static bitmap, glyph atlas or video target.
///
/// Every field except the key sits behind one lock, shared by the render
/// thread (upload) and any frame producer.
pub struct TextureEntity {
    key: TextureKey,
    state: Mutex<EntityState>,
}

impl TextureEntity {
    pub(crate) fn new(key: TextureKey) -> Self {
        Self {
            key,
            state: Mutex::new(EntityState::empty()),
        }
    }

    #[inline]
    pub fn key(&self) -> &TextureKey {
        &self.key
    }

    #[inline]
    pub(crate) fn lock(&self) -> MutexGuard<'_, EntityState> {
        self.state.lock()
    }

    /// Base level size, once the buffer is allocated.
    pub fn size(&self) -> Option<(u32, u32)> {
        self.lock().base_size()
    }

    pub fn is_video(&self) -> bool {
        self.lock().is_video
    }

    /// Releases everything the entity owns.
    ///
    /// Fields are detached under the lock, then dropped with the lock
    /// released: GPU object first, then the payload, then the CPU buffer.
    pub(crate) fn destroy(&self) {
        let (gpu, aux, cpu) = {
            let mut state = self.lock();
            state.layout = None;
            state.outdated = false;
            (
                state.gpu.take(),
                state.aux.take(),
                mem::take(&mut state.cpu),
            )
        };

        drop(gpu);
        if let Some(aux) = aux {
            aux.destroy();
        }
        drop(cpu);
        log::debug!("texture `{}` destroyed", self.key);
    }
}

impl std::fmt::Debug for TextureEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureEntity").field("key", &self.key).finish_non_exhaustive()
    }
}
