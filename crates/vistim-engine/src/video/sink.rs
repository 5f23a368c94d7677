use std::sync::{Arc, Weak};

use crate::texture::{
    copy_rows_flipped, MipChain, PixelFormat, TextureEntity, TexturePayload, VIDEO_ROW_ALIGN,
};

use super::controller::StatusCell;
use super::{FrameSink, VideoFrame};

/// Writes decoded frames into the back buffer of a video texture entity.
///
/// The first frame fixes the texture geometry; frames of any other size are
/// dropped. Once a frame is stored the pipeline leaves `Ready`.
pub(crate) struct EntityFrameSink {
    entity: Weak<TextureEntity>,
    status: Arc<StatusCell>,
}

impl EntityFrameSink {
    pub(crate) fn new(entity: Weak<TextureEntity>, status: Arc<StatusCell>) -> Self {
        Self { entity, status }
    }
}

impl FrameSink for EntityFrameSink {
    fn deliver(&self, frame: &VideoFrame<'_>) {
        let Some(entity) = self.entity.upgrade() else {
            return;
        };

        {
            let mut state = entity.lock();
            // Destroyed or never attached: nothing to write into.
            if !matches!(state.aux, Some(TexturePayload::Video(_))) {
                return;
            }

            if !state.is_allocated() {
                let layout = match MipChain::new(frame.width, frame.height, 0, 4, VIDEO_ROW_ALIGN) {
                    Ok(layout) => layout,
                    Err(e) => {
                        log::error!("video `{}`: unusable frame size: {e}", entity.key());
                        return;
                    }
                };
                if let Err(e) = state.allocate(entity.key(), layout, PixelFormat::RGBA8) {
                    log::error!("video `{}`: {e}", entity.key());
                    return;
                }
                log::info!(
                    "video `{}` negotiated {}x{}",
                    entity.key(),
                    frame.width,
                    frame.height
                );
            }

            let Some(base) = state.layout.as_ref().map(|l| *l.base()) else {
                return;
            };
            if (frame.width, frame.height) != (base.width, base.height) {
                log::warn!(
                    "video `{}`: dropping {}x{} frame, texture is {}x{}",
                    entity.key(),
                    frame.width,
                    frame.height,
                    base.width,
                    base.height
                );
                return;
            }

            let row_bytes = frame.width as usize * 4;
            let needed = frame.stride * (frame.height as usize - 1) + row_bytes;
            if frame.stride < row_bytes || frame.data.len() < needed {
                log::warn!("video `{}`: short frame dropped", entity.key());
                return;
            }

            let Some(dst) = state.write_buffer() else {
                return;
            };
            copy_rows_flipped(
                &mut dst[base.range()],
                base.stride as usize,
                frame.data,
                frame.stride,
                row_bytes,
                frame.height as usize,
            );
            state.outdated = true;
        }

        self.status.frame_arrived();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::{TextureKey, TextureManager};
    use crate::video::{VideoConfig, VideoFeed, VideoPipeline, VideoState};

    fn attach_video(manager: &TextureManager) -> (crate::texture::TextureHandle, Arc<StatusCell>) {
        let handle = manager.acquire(TextureKey::new("TESTPIPE")).unwrap().handle;
        let pipeline = VideoPipeline::open(
            manager.backend().as_ref(),
            &VideoFeed::Test,
            Arc::downgrade(handle.entity()),
            VideoConfig::default(),
        )
        .unwrap();
        handle.entity().lock().aux = Some(TexturePayload::Video(pipeline));
        let status = Arc::new(StatusCell::default());
        status.set(VideoState::Ready);
        (handle, status)
    }

    fn frame(width: u32, height: u32, fill: impl Fn(u32, u32) -> u8) -> Vec<u8> {
        let mut data = Vec::new();
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&[fill(x, y); 4]);
            }
        }
        data
    }

    #[test]
    fn first_frame_allocates_and_marks_playing() {
        let manager = TextureManager::new();
        let (handle, status) = attach_video(&manager);
        let sink = EntityFrameSink::new(Arc::downgrade(handle.entity()), Arc::clone(&status));

        let data = frame(3, 2, |_, y| y as u8 + 1);
        sink.deliver(&VideoFrame { width: 3, height: 2, stride: 12, data: &data });

        assert_eq!(handle.size(), Some((3, 2)));
        assert_eq!(status.get(), VideoState::Playing);
        let state = handle.entity().lock();
        assert!(state.outdated);
        let layout = state.layout.as_ref().unwrap();
        assert_eq!(layout.base().stride, 256);
        let crate::texture::CpuBuffer::Plain(buf) = &state.cpu else {
            panic!("expected plain buffer");
        };
        // Bottom row (y = 1) lands first.
        assert_eq!(buf[0], 2);
        assert_eq!(buf[256], 1);
    }

    #[test]
    fn mismatched_geometry_is_dropped() {
        let manager = TextureManager::new();
        let (handle, status) = attach_video(&manager);
        let sink = EntityFrameSink::new(Arc::downgrade(handle.entity()), Arc::clone(&status));

        let small = frame(2, 2, |_, _| 9);
        sink.deliver(&VideoFrame { width: 2, height: 2, stride: 8, data: &small });
        handle.entity().lock().outdated = false;

        let big = frame(4, 4, |_, _| 7);
        sink.deliver(&VideoFrame { width: 4, height: 4, stride: 16, data: &big });
        assert_eq!(handle.size(), Some((2, 2)));
        assert!(!handle.entity().lock().outdated);
    }

    #[test]
    fn destroyed_entity_ignores_frames() {
        let manager = TextureManager::new();
        let (handle, status) = attach_video(&manager);
        let sink = EntityFrameSink::new(Arc::downgrade(handle.entity()), Arc::clone(&status));
        handle.entity().destroy();

        let data = frame(2, 2, |_, _| 1);
        sink.deliver(&VideoFrame { width: 2, height: 2, stride: 8, data: &data });
        assert_eq!(handle.size(), None);
        assert_eq!(status.get(), VideoState::Ready);
    }
}
