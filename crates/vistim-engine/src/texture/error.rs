use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the texture registry and the upload path.
#[derive(Debug, Error)]
pub enum TextureError {
    #[error("texture key must not be empty")]
    EmptyKey,

    #[error("invalid texture dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("texture `{key}` is already allocated")]
    AlreadyAllocated { key: String },

    #[error("failed to decode image {}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to load font `{name}`: {reason}")]
    Font { name: String, reason: String },

    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("GPU texture creation failed: {0}")]
    GpuCreate(String),

    #[error("GPU texture upload failed: {0}")]
    GpuUpload(String),
}
