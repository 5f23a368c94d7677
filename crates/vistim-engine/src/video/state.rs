use std::fmt;
use std::time::Duration;

/// Lifecycle state of a video pipeline.
///
/// `Stopped` is both the initial and the terminal state. `Ready` lasts from
/// a play request until the first frame lands in the texture.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum VideoState {
    #[default]
    Stopped,
    Ready,
    Paused,
    Playing,
}

impl fmt::Display for VideoState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            VideoState::Stopped => "stopped",
            VideoState::Ready => "ready",
            VideoState::Paused => "paused",
            VideoState::Playing => "playing",
        })
    }
}

/// Command accepted by [`crate::texture::TextureManager::exec`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum VideoCommand {
    Play,
    Pause,
    Stop,
    /// Flushing key-frame seek to an absolute position.
    Seek(Duration),
}

impl VideoCommand {
    /// Seek expressed in milliseconds from the stream start.
    pub fn seek_ms(ms: u64) -> Self {
        VideoCommand::Seek(Duration::from_millis(ms))
    }
}
