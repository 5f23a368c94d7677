use std::time::Duration;

use thiserror::Error;

use crate::texture::TextureError;

use super::{PipelineState, VideoState};

/// Failures reported by a media backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("no element factory named `{0}`")]
    UnknownFactory(String),

    #[error("no element named `{0}` in pipeline")]
    UnknownElement(String),

    #[error("element `{0}` already exists in pipeline")]
    DuplicateElement(String),

    #[error("element `{element}` has no property `{property}`")]
    UnknownProperty { element: String, property: String },

    #[error("invalid value `{value}` for property `{property}`")]
    InvalidProperty { property: String, value: String },

    #[error("cannot link `{src}` to `{sink}`: {reason}")]
    Link {
        src: String,
        sink: String,
        reason: String,
    },

    #[error("invalid pipeline description: {0}")]
    Parse(String),

    #[error("state change to {target:?} failed: {reason}")]
    StateChange { target: PipelineState, reason: String },

    #[error("seek failed: {0}")]
    Seek(String),

    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failures of video creation and control.
#[derive(Debug, Error)]
pub enum VideoError {
    #[error("invalid video feed: {0}")]
    InvalidFeed(String),

    #[error(transparent)]
    Texture(#[from] TextureError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("cannot {command} a {state} video")]
    InvalidTransition {
        command: &'static str,
        state: VideoState,
    },

    #[error("pipeline stopped before delivering a frame")]
    PrerollFailed,

    #[error("no frame delivered within {0:?}")]
    PrerollTimeout(Duration),

    #[error("texture `{0}` is not a video")]
    NotVideo(String),

    #[error("failed to spawn decoder thread")]
    Spawn(#[source] std::io::Error),
}
