//! Playback state machine of one video texture.
//!
//! Two locks are involved and neither is held across the other's wait:
//! - the control lock serializes commands and owns the decoder thread;
//! - the status cell holds the observable [`VideoState`] and is only taken
//!   for a read or a single transition, so the frame sink on the streaming
//!   thread and the decoder thread never block behind a command.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::texture::TextureEntity;

use super::graph;
use super::sink::EntityFrameSink;
use super::{
    BusMessage, MediaBackend, MediaPipeline, PipelineState, SeekFlags, VideoError, VideoFeed,
    VideoState,
};

/// Playback tuning shared by every command of one pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoConfig {
    /// Upper bound on the wait for the first frame after `play`.
    /// `None` waits indefinitely.
    pub preroll_timeout: Option<Duration>,
    /// Whether `play` from `Stopped` waits for the first frame. When false,
    /// `play` returns in `Ready` and the caller polls the state.
    pub wait_for_preroll: bool,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            preroll_timeout: Some(Duration::from_secs(10)),
            wait_for_preroll: true,
        }
    }
}

/// Options of [`crate::texture::TextureManager::create_video`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VideoOptions {
    /// Start playback as part of creation.
    pub autostart: bool,
    pub config: VideoConfig,
}

impl VideoOptions {
    pub fn autostart() -> Self {
        Self { autostart: true, ..Self::default() }
    }
}

#[derive(Default)]
struct Status {
    state: VideoState,
    /// A frame reached the texture since the last start.
    prerolled: bool,
}

/// Observable state plus its change notification.
#[derive(Default)]
pub(crate) struct StatusCell {
    status: Mutex<Status>,
    changed: Condvar,
}

impl StatusCell {
    pub(crate) fn get(&self) -> VideoState {
        self.status.lock().state
    }

    pub(crate) fn set(&self, next: VideoState) {
        let mut status = self.status.lock();
        if next == VideoState::Ready {
            status.prerolled = false;
        }
        if status.state != next {
            log::trace!("video state {} -> {}", status.state, next);
            status.state = next;
            self.changed.notify_all();
        }
    }

    /// Moves to `to` only if the current state is `from`.
    pub(crate) fn transition(&self, from: VideoState, to: VideoState) -> bool {
        let mut status = self.status.lock();
        if status.state != from {
            return false;
        }
        log::trace!("video state {from} -> {to}");
        status.state = to;
        self.changed.notify_all();
        true
    }

    /// Records a delivered frame; the first one ends `Ready`.
    pub(crate) fn frame_arrived(&self) {
        let mut status = self.status.lock();
        status.prerolled = true;
        if status.state == VideoState::Ready {
            log::trace!("video state ready -> playing");
            status.state = VideoState::Playing;
        }
        self.changed.notify_all();
    }

    /// Blocks while the state is `Ready`.
    ///
    /// Returns whether a frame arrived, or `None` on timeout.
    pub(crate) fn wait_while_ready(&self, timeout: Option<Duration>) -> Option<bool> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut status = self.status.lock();
        while status.state == VideoState::Ready {
            match deadline {
                Some(deadline) => {
                    if self.changed.wait_until(&mut status, deadline).timed_out()
                        && status.state == VideoState::Ready
                    {
                        return None;
                    }
                }
                None => self.changed.wait(&mut status),
            }
        }
        Some(status.prerolled)
    }
}

enum DecoderEvent {
    Bus(BusMessage),
    Shutdown,
}

#[derive(Default)]
struct Control {
    thread: Option<JoinHandle<()>>,
    events: Option<Sender<DecoderEvent>>,
}

struct Inner {
    name: String,
    status: Arc<StatusCell>,
    control: Mutex<Control>,
    pipeline: Arc<Mutex<Box<dyn MediaPipeline>>>,
    config: VideoConfig,
}

/// Handle on the decode pipeline feeding one video texture.
///
/// Clones drive the same pipeline. The owning texture entity shuts it down
/// when destroyed.
#[derive(Clone)]
pub struct VideoPipeline {
    inner: Arc<Inner>,
}

impl VideoPipeline {
    /// Builds the graph for `feed` and opens its resources (`Ready` on the
    /// backend side). Frames go to `entity`.
    pub(crate) fn open(
        backend: &dyn MediaBackend,
        feed: &VideoFeed,
        entity: Weak<TextureEntity>,
        config: VideoConfig,
    ) -> Result<Self, VideoError> {
        let status = Arc::new(StatusCell::default());
        let sink = Arc::new(EntityFrameSink::new(entity, Arc::clone(&status)));
        let mut pipeline = graph::build(backend, feed, sink)?;

        if let Err(e) = pipeline.set_state(PipelineState::Ready) {
            let _ = pipeline.set_state(PipelineState::Null);
            return Err(e.into());
        }

        log::debug!("video pipeline `{}` opened", pipeline.name());
        Ok(Self::with_pipeline(pipeline, status, config))
    }

    fn with_pipeline(pipeline: Box<dyn MediaPipeline>, status: Arc<StatusCell>, config: VideoConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                name: pipeline.name().to_string(),
                status,
                control: Mutex::new(Control::default()),
                pipeline: Arc::new(Mutex::new(pipeline)),
                config,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn state(&self) -> VideoState {
        self.inner.status.get()
    }

    pub fn config(&self) -> VideoConfig {
        self.inner.config
    }

    /// Starts or resumes playback.
    ///
    /// From `Stopped`, spawns the decoder thread and, unless configured
    /// otherwise, blocks until the first frame has been written into the
    /// texture.
    pub fn play(&self) -> Result<(), VideoError> {
        let inner = &self.inner;
        {
            let mut control = inner.control.lock();
            match inner.status.get() {
                VideoState::Playing => return Ok(()),
                VideoState::Paused => {
                    inner.pipeline.lock().set_state(PipelineState::Playing)?;
                    inner.status.transition(VideoState::Paused, VideoState::Playing);
                    return Ok(());
                }
                VideoState::Ready => {}
                VideoState::Stopped => self.start(&mut control)?,
            }
        }

        if !inner.config.wait_for_preroll {
            return Ok(());
        }

        match inner.status.wait_while_ready(inner.config.preroll_timeout) {
            Some(true) => Ok(()),
            Some(false) => Err(VideoError::PrerollFailed),
            None => {
                let timeout = inner.config.preroll_timeout.unwrap_or_default();
                log::warn!("video `{}` delivered no frame within {timeout:?}", inner.name);
                self.stop();
                Err(VideoError::PrerollTimeout(timeout))
            }
        }
    }

    fn start(&self, control: &mut Control) -> Result<(), VideoError> {
        let inner = &self.inner;

        join_finished(control);
        inner.status.set(VideoState::Ready);

        let (tx, rx) = mpsc::channel();
        let bus_tx = Mutex::new(tx.clone());
        let mut pipeline = inner.pipeline.lock();
        pipeline.set_bus_watch(Arc::new(move |msg| {
            let _ = bus_tx.lock().send(DecoderEvent::Bus(msg));
        }));

        if let Err(e) = pipeline.set_state(PipelineState::Playing) {
            abort_start(&mut **pipeline, &inner.status);
            return Err(e.into());
        }
        drop(pipeline);

        let worker_pipeline = Arc::clone(&inner.pipeline);
        let worker_status = Arc::clone(&inner.status);
        let worker_name = inner.name.clone();
        let spawned = thread::Builder::new()
            .name(format!("vistim-decoder:{}", inner.name))
            .spawn(move || decoder_loop(&worker_name, rx, &worker_pipeline, &worker_status));

        match spawned {
            Ok(handle) => {
                control.thread = Some(handle);
                control.events = Some(tx);
                log::debug!("video `{}` started", inner.name);
                Ok(())
            }
            Err(e) => {
                abort_start(&mut **inner.pipeline.lock(), &inner.status);
                Err(VideoError::Spawn(e))
            }
        }
    }

    /// Suspends frame delivery. Only valid while playing.
    pub fn pause(&self) -> Result<(), VideoError> {
        let inner = &self.inner;
        let _control = inner.control.lock();
        let state = inner.status.get();
        if state != VideoState::Playing {
            return Err(VideoError::InvalidTransition { command: "pause", state });
        }
        inner.pipeline.lock().set_state(PipelineState::Paused)?;
        inner.status.transition(VideoState::Playing, VideoState::Paused);
        Ok(())
    }

    /// Stops playback and joins the decoder thread. Idempotent.
    ///
    /// The texture keeps its last frame.
    pub fn stop(&self) {
        let inner = &self.inner;
        let mut control = inner.control.lock();
        inner.status.set(VideoState::Stopped);

        if let Some(events) = control.events.take() {
            let _ = events.send(DecoderEvent::Shutdown);
        }
        if let Some(thread) = control.thread.take() {
            if thread.join().is_err() {
                log::error!("decoder thread of `{}` panicked", inner.name);
            }
        }
    }

    /// Flushing key-frame seek to `position`.
    ///
    /// Valid in every state. A stopped pipeline keeps the position and
    /// starts from it on the next `play`.
    pub fn seek(&self, position: Duration) -> Result<(), VideoError> {
        let mut control = self.inner.control.lock();
        if self.inner.status.get() == VideoState::Stopped {
            join_finished(&mut control);
        }
        self.inner
            .pipeline
            .lock()
            .seek(position, SeekFlags::FLUSH_KEY_UNIT)?;
        log::debug!("video `{}` seeked to {position:?}", self.inner.name);
        Ok(())
    }

    /// Id of the decoder thread of the current run, if one was started.
    pub(crate) fn decoder_thread(&self) -> Option<ThreadId> {
        self.inner.control.lock().thread.as_ref().map(|t| t.thread().id())
    }

    /// Stops playback and releases the backend resources.
    pub(crate) fn shutdown(&self) {
        self.stop();
        let mut pipeline = self.inner.pipeline.lock();
        pipeline.clear_bus_watch();
        if let Err(e) = pipeline.set_state(PipelineState::Null) {
            log::warn!("video `{}` did not reach null state: {e}", self.inner.name);
        }
        log::debug!("video pipeline `{}` shut down", self.inner.name);
    }
}

impl std::fmt::Debug for VideoPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoPipeline")
            .field("name", &self.inner.name)
            .field("state", &self.state())
            .finish()
    }
}

/// Joins a decoder thread whose run ended on its own, so the backend has
/// reached `Null` before the next command touches it.
fn join_finished(control: &mut Control) {
    if let Some(stale) = control.thread.take() {
        let _ = stale.join();
    }
    control.events = None;
}

fn abort_start(pipeline: &mut dyn MediaPipeline, status: &StatusCell) {
    pipeline.clear_bus_watch();
    let _ = pipeline.set_state(PipelineState::Null);
    status.set(VideoState::Stopped);
}

/// Consumes bus traffic until end of stream, an error or a shutdown request,
/// then idles the pipeline.
///
/// The state turns `Stopped` before the backend is idled, so no command
/// observes `Playing` on a run that is already ending. A `play` arriving in
/// between joins this thread before starting the next run.
fn decoder_loop(
    name: &str,
    events: Receiver<DecoderEvent>,
    pipeline: &Mutex<Box<dyn MediaPipeline>>,
    status: &StatusCell,
) {
    log::trace!("decoder thread of `{name}` running");
    loop {
        match events.recv() {
            Ok(DecoderEvent::Bus(BusMessage::Eos)) => {
                log::info!("video `{name}`: end of stream");
                break;
            }
            Ok(DecoderEvent::Bus(BusMessage::Error { source, message })) => {
                log::error!("video `{name}`: error from `{source}`: {message}");
                break;
            }
            Ok(DecoderEvent::Bus(other)) => log::trace!("video `{name}`: {other:?}"),
            Ok(DecoderEvent::Shutdown) | Err(_) => break,
        }
    }

    status.set(VideoState::Stopped);
    {
        let mut pipeline = pipeline.lock();
        if let Err(e) = pipeline.set_state(PipelineState::Null) {
            log::warn!("video `{name}` did not reach null state: {e}");
        }
        pipeline.clear_bus_watch();
    }
    log::trace!("decoder thread of `{name}` finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::TextureManager;
    use crate::video::{
        BackendError, BusWatch, ElementSpec, FrameSink, PadPolicy, PadPresence, StateChange,
    };

    /// Pipeline whose move to `Null` waits until the test releases it.
    struct GatedPipeline {
        watch: Arc<Mutex<Option<BusWatch>>>,
        state: PipelineState,
        entered_null: mpsc::Sender<()>,
        release: mpsc::Receiver<()>,
    }

    impl MediaPipeline for GatedPipeline {
        fn name(&self) -> &str {
            "gated"
        }

        fn add_element(&mut self, _spec: &ElementSpec) -> Result<(), BackendError> {
            Ok(())
        }

        fn tail(&self) -> Option<String> {
            None
        }

        fn src_presence(&self, _element: &str) -> Result<PadPresence, BackendError> {
            Ok(PadPresence::Always)
        }

        fn link(&mut self, _src: &str, _sink: &str) -> Result<(), BackendError> {
            Ok(())
        }

        fn link_on_pad_added(&mut self, _src: &str, _sink: &str, _policy: PadPolicy) -> Result<(), BackendError> {
            Ok(())
        }

        fn set_frame_sink(&mut self, _element: &str, _sink: Arc<dyn FrameSink>) -> Result<(), BackendError> {
            Ok(())
        }

        fn set_bus_watch(&mut self, watch: BusWatch) {
            *self.watch.lock() = Some(watch);
        }

        fn clear_bus_watch(&mut self) {
            *self.watch.lock() = None;
        }

        fn set_state(&mut self, target: PipelineState) -> Result<StateChange, BackendError> {
            if target == PipelineState::Null && self.state != PipelineState::Null {
                let _ = self.entered_null.send(());
                let _ = self.release.recv();
            }
            self.state = target;
            Ok(StateChange::Success)
        }

        fn state(&self) -> PipelineState {
            self.state
        }

        fn seek(&mut self, _position: Duration, _flags: SeekFlags) -> Result<(), BackendError> {
            Ok(())
        }
    }

    // ── status cell ───────────────────────────────────────────────────────

    #[test]
    fn transition_requires_expected_state() {
        let cell = StatusCell::default();
        assert!(!cell.transition(VideoState::Ready, VideoState::Playing));
        cell.set(VideoState::Ready);
        assert!(cell.transition(VideoState::Ready, VideoState::Playing));
        assert_eq!(cell.get(), VideoState::Playing);
    }

    #[test]
    fn wait_returns_once_a_frame_arrives() {
        let cell = Arc::new(StatusCell::default());
        cell.set(VideoState::Ready);
        let producer = {
            let cell = Arc::clone(&cell);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                cell.frame_arrived();
            })
        };
        assert_eq!(cell.wait_while_ready(Some(Duration::from_secs(5))), Some(true));
        assert_eq!(cell.get(), VideoState::Playing);
        producer.join().unwrap();
    }

    #[test]
    fn frame_then_end_of_stream_still_counts_as_started() {
        let cell = StatusCell::default();
        cell.set(VideoState::Ready);
        cell.frame_arrived();
        cell.set(VideoState::Stopped);
        assert_eq!(cell.wait_while_ready(None), Some(true));
    }

    #[test]
    fn stop_without_frame_reports_failure() {
        let cell = StatusCell::default();
        cell.set(VideoState::Ready);
        cell.set(VideoState::Stopped);
        assert_eq!(cell.wait_while_ready(None), Some(false));
    }

    #[test]
    fn wait_times_out_while_ready() {
        let cell = StatusCell::default();
        cell.set(VideoState::Ready);
        assert_eq!(cell.wait_while_ready(Some(Duration::from_millis(10))), None);
    }

    // ── config ────────────────────────────────────────────────────────────

    #[test]
    fn defaults_block_with_bounded_preroll() {
        let options = VideoOptions::default();
        assert!(!options.autostart);
        assert!(options.config.wait_for_preroll);
        assert_eq!(options.config.preroll_timeout, Some(Duration::from_secs(10)));
        assert!(VideoOptions::autostart().autostart);
    }

    // ── decoder thread ────────────────────────────────────────────────────

    #[test]
    fn end_of_stream_reports_stopped_before_the_backend_idles() {
        let watch = Arc::new(Mutex::new(None::<BusWatch>));
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let fake = GatedPipeline {
            watch: Arc::clone(&watch),
            state: PipelineState::Ready,
            entered_null: entered_tx,
            release: release_rx,
        };
        let status = Arc::new(StatusCell::default());
        let config = VideoConfig { wait_for_preroll: false, ..VideoConfig::default() };
        let pipeline = VideoPipeline::with_pipeline(Box::new(fake), Arc::clone(&status), config);

        pipeline.play().unwrap();
        status.frame_arrived();
        assert_eq!(pipeline.state(), VideoState::Playing);

        let post = watch.lock().clone().unwrap();
        post(BusMessage::Eos);
        entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(pipeline.state(), VideoState::Stopped);

        release_tx.send(()).unwrap();
        pipeline.stop();
        assert_eq!(pipeline.decoder_thread(), None);
    }

    #[test]
    fn resume_keeps_the_decoder_thread() {
        let textures = TextureManager::new();
        let video = textures.create_video(&VideoFeed::Test, VideoOptions::autostart()).unwrap();
        let pipeline = textures.video(&video).unwrap();
        let running = pipeline.decoder_thread();
        assert!(running.is_some());

        pipeline.pause().unwrap();
        assert_eq!(pipeline.decoder_thread(), running);
        pipeline.play().unwrap();
        assert_eq!(pipeline.state(), VideoState::Playing);
        assert_eq!(pipeline.decoder_thread(), running);

        pipeline.stop();
        assert_eq!(pipeline.decoder_thread(), None);
    }
}
