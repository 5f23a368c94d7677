use std::sync::Arc;

use crate::texture::{TextureHandle, TextureManager, TexturePayload};

use super::{VideoCommand, VideoError, VideoFeed, VideoOptions, VideoPipeline, VideoState};

impl TextureManager {
    /// Returns the video texture fed by `feed`, creating its pipeline on
    /// first use.
    ///
    /// The pipeline is opened immediately, so unreachable resources fail
    /// here. With `options.autostart` playback also starts; a failed start
    /// releases the texture again.
    pub fn create_video(&self, feed: &VideoFeed, options: VideoOptions) -> Result<TextureHandle, VideoError> {
        feed.validate()?;
        let handle = self.acquire(feed.key())?.handle;

        let pipeline = {
            let mut state = handle.entity().lock();
            match &state.aux {
                Some(TexturePayload::Video(existing)) => existing.clone(),
                Some(TexturePayload::Font(_)) => {
                    return Err(VideoError::NotVideo(handle.key().to_string()));
                }
                None => {
                    let pipeline = VideoPipeline::open(
                        self.backend().as_ref(),
                        feed,
                        Arc::downgrade(handle.entity()),
                        options.config,
                    )
                    .inspect_err(|e| log::warn!("cannot open video `{}`: {e}", handle.key()))?;
                    state.is_video = true;
                    state.aux = Some(TexturePayload::Video(pipeline.clone()));
                    pipeline
                }
            }
        };

        if options.autostart {
            pipeline
                .play()
                .inspect_err(|e| log::warn!("video `{}` failed to start: {e}", handle.key()))?;
        }
        Ok(handle)
    }

    /// Runs a playback command on a video texture.
    pub fn exec(&self, texture: &TextureHandle, command: VideoCommand) -> Result<(), VideoError> {
        let pipeline = self
            .video(texture)
            .ok_or_else(|| VideoError::NotVideo(texture.key().to_string()))?;

        match command {
            VideoCommand::Play => pipeline.play(),
            VideoCommand::Pause => pipeline.pause(),
            VideoCommand::Stop => {
                pipeline.stop();
                Ok(())
            }
            VideoCommand::Seek(position) => pipeline.seek(position),
        }
    }

    /// Playback state of a video texture; `None` for other textures.
    pub fn video_state(&self, texture: &TextureHandle) -> Option<VideoState> {
        self.video(texture).map(|p| p.state())
    }

    /// The pipeline feeding `texture`, if it is a video.
    pub fn video(&self, texture: &TextureHandle) -> Option<VideoPipeline> {
        match &texture.entity().lock().aux {
            Some(TexturePayload::Video(pipeline)) => Some(pipeline.clone()),
            _ => None,
        }
    }
}
