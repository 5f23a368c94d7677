//! Lazy GPU upload.
//!
//! Binding an entity either creates its GPU texture (first use: every level
//! uploaded) or, for a streaming entity with a pending frame, refreshes the
//! existing texture from the frame ring. Never both in one call.
//!
//! A refresh holds the entity lock only to lend the filled ring region out;
//! the copy to the GPU runs unlocked so frame delivery never waits on it.

use std::mem;
use std::sync::Arc;

use super::entity::{CpuBuffer, EntityState};
use super::{
    FrameRing, GpuTexture, GpuTextureId, GpuUploader, MipLevel, TextureDesc, TextureEntity,
    TextureError,
};

pub(crate) fn bind_entity(
    entity: &TextureEntity,
    uploader: &dyn GpuUploader,
) -> Result<Option<GpuTextureId>, TextureError> {
    let mut guard = entity.lock();
    let state = &mut *guard;

    if let Some(gpu) = state.gpu.as_ref() {
        let id = gpu.id();
        if !(state.is_video && state.outdated) {
            return Ok(Some(id));
        }
        let Some(pending) = lend_pending_frame(state) else {
            return Ok(Some(id));
        };
        drop(guard);
        upload_lent(entity, pending)?;
        return Ok(Some(id));
    }

    let Some(layout) = state.layout.as_ref() else {
        return Ok(None);
    };
    let data = match &state.cpu {
        CpuBuffer::Empty => return Ok(None),
        CpuBuffer::Plain(data) => data.as_slice(),
        CpuBuffer::Ring(ring) => ring.front(),
    };

    let texture = uploader.create_texture(
        &TextureDesc {
            label: entity.key().as_str(),
            format: state.format,
            levels: layout.levels(),
            streaming: state.is_video,
        },
        data,
    )?;

    if state.is_video {
        if let CpuBuffer::Plain(frame) = mem::take(&mut state.cpu) {
            state.cpu = CpuBuffer::Ring(FrameRing::from_frame(frame));
        }
    }
    state.outdated = false;

    let id = texture.id();
    state.gpu = Some(Arc::from(texture));
    log::trace!("texture `{}` uploaded as gpu #{}", entity.key(), id.get());
    Ok(Some(id))
}

/// A published frame on its way to the GPU.
struct LentFrame {
    gpu: Arc<dyn GpuTexture>,
    levels: Vec<MipLevel>,
    region: Vec<u8>,
}

/// Moves the filled ring region out and clears `outdated`.
///
/// `None` while another bind still holds the previous region; that bind's
/// caller leaves `outdated` set for the next one.
fn lend_pending_frame(state: &mut EntityState) -> Option<LentFrame> {
    let (Some(gpu), Some(layout), CpuBuffer::Ring(ring)) =
        (state.gpu.as_ref(), state.layout.as_ref(), &mut state.cpu)
    else {
        return None;
    };
    let region = ring.lend()?;
    let frame = LentFrame { gpu: Arc::clone(gpu), levels: layout.levels().to_vec(), region };
    state.outdated = false;
    Some(frame)
}

/// Uploads a lent region with the entity unlocked, then returns it to the
/// ring. The entity may have been destroyed meanwhile; the region is then
/// dropped.
fn upload_lent(entity: &TextureEntity, frame: LentFrame) -> Result<(), TextureError> {
    let LentFrame { gpu, levels, region } = frame;
    let uploaded = levels.iter().try_for_each(|level| gpu.update_level(level, &region));
    {
        let mut state = entity.lock();
        if let CpuBuffer::Ring(ring) = &mut state.cpu {
            ring.give_back(region);
        }
    }
    drop(gpu);
    uploaded
}
