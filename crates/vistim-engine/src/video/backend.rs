//! Media backend contract.
//!
//! A backend builds decode graphs out of named elements, links them (either
//! directly or when a dynamic pad appears), reports stream events on a bus
//! and pushes raw frames into a [`FrameSink`].

use std::sync::Arc;
use std::time::Duration;

use super::{BackendError, ElementSpec};

/// Backend-side pipeline state.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum PipelineState {
    Null,
    Ready,
    Paused,
    Playing,
}

/// How a state change completed.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum StateChange {
    Success,
    /// Completes later on the streaming thread.
    Async,
    /// Live source: paused state delivers no preroll frame.
    NoPreroll,
}

/// Presence of an element's source pad.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PadPresence {
    /// Exists as soon as the element does; linked immediately.
    Always,
    /// Appears at runtime once the stream type is known.
    Sometimes,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum MediaKind {
    Video,
    Audio,
    Other,
}

/// Capabilities of a pad that appeared at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caps {
    pub kind: MediaKind,
    pub format: String,
}

impl Caps {
    pub fn video(format: impl Into<String>) -> Self {
        Self { kind: MediaKind::Video, format: format.into() }
    }

    pub fn audio(format: impl Into<String>) -> Self {
        Self { kind: MediaKind::Audio, format: format.into() }
    }
}

/// What to do with a pad that appeared at runtime.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PadLinkDecision {
    Link,
    Ignore,
    /// The stream cannot be played; the backend posts a bus error.
    Fail,
}

/// Decides the fate of a dynamic pad given its caps and whether they are
/// compatible with the downstream element.
pub type PadPolicy = Arc<dyn Fn(&Caps, bool) -> PadLinkDecision + Send + Sync>;

/// Flags of a seek request.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SeekFlags {
    /// Drop queued data before seeking.
    pub flush: bool,
    /// Snap to the nearest key frame.
    pub key_unit: bool,
}

impl SeekFlags {
    pub const FLUSH_KEY_UNIT: Self = Self { flush: true, key_unit: true };
}

/// Message posted on a pipeline bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusMessage {
    Eos,
    Error { source: String, message: String },
    StateChanged { old: PipelineState, new: PipelineState },
    Other(String),
}

/// Receives bus messages. Called from backend threads.
pub type BusWatch = Arc<dyn Fn(BusMessage) + Send + Sync>;

/// A decoded frame: tightly described RGBA8 rows, top row first.
#[derive(Debug, Clone, Copy)]
pub struct VideoFrame<'a> {
    pub width: u32,
    pub height: u32,
    /// Bytes between the starts of consecutive rows.
    pub stride: usize,
    pub data: &'a [u8],
}

/// Terminal consumer of decoded frames. Invoked on the backend's streaming
/// thread.
pub trait FrameSink: Send + Sync {
    fn deliver(&self, frame: &VideoFrame<'_>);
}

/// A decode graph owned by one video texture.
pub trait MediaPipeline: Send {
    fn name(&self) -> &str;

    fn add_element(&mut self, spec: &ElementSpec) -> Result<(), BackendError>;

    /// Name of the most recently added element.
    fn tail(&self) -> Option<String>;

    fn src_presence(&self, element: &str) -> Result<PadPresence, BackendError>;

    /// Links two elements whose pads already exist.
    fn link(&mut self, src: &str, sink: &str) -> Result<(), BackendError>;

    /// Links `src` to `sink` once `src` exposes a pad, subject to `policy`.
    fn link_on_pad_added(&mut self, src: &str, sink: &str, policy: PadPolicy) -> Result<(), BackendError>;

    /// Routes frames reaching the terminal element `element` to `sink`.
    fn set_frame_sink(&mut self, element: &str, sink: Arc<dyn FrameSink>) -> Result<(), BackendError>;

    fn set_bus_watch(&mut self, watch: BusWatch);

    fn clear_bus_watch(&mut self);

    /// Moves the pipeline to `target`. Leaving the streaming states joins the
    /// backend's streaming thread.
    fn set_state(&mut self, target: PipelineState) -> Result<StateChange, BackendError>;

    fn state(&self) -> PipelineState;

    fn seek(&mut self, position: Duration, flags: SeekFlags) -> Result<(), BackendError>;
}

/// Factory of pipelines plus process-wide init/teardown.
pub trait MediaBackend: Send + Sync {
    fn name(&self) -> &str;

    fn init(&self) -> Result<(), BackendError>;

    fn deinit(&self);

    fn new_pipeline(&self, name: &str) -> Result<Box<dyn MediaPipeline>, BackendError>;

    /// Builds a pipeline from a textual description of linked elements.
    fn parse_launch(&self, name: &str, description: &str) -> Result<Box<dyn MediaPipeline>, BackendError>;
}
