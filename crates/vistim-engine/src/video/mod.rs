//! Video textures.
//!
//! A video texture is a cache entity whose pixels come from a decode
//! pipeline. The [`VideoPipeline`] controller runs the playback state
//! machine and a decoder thread draining the pipeline bus; the backend's
//! streaming thread writes frames straight into the entity's back buffer.

mod api;
mod backend;
mod controller;
mod error;
mod feed;
pub mod graph;
mod sink;
pub mod soft;
mod state;

pub use backend::{
    BusMessage, BusWatch, Caps, FrameSink, MediaBackend, MediaKind, MediaPipeline, PadLinkDecision,
    PadPolicy, PadPresence, PipelineState, SeekFlags, StateChange, VideoFrame,
};
pub use controller::{VideoConfig, VideoOptions, VideoPipeline};
pub use error::{BackendError, VideoError};
pub use feed::{ElementSpec, PipelineSpec, VideoFeed};
pub use soft::SoftBackend;
pub use state::{VideoCommand, VideoState};
