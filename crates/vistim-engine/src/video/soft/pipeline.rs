use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::video::{
    BackendError, BusMessage, BusWatch, Caps, ElementSpec, FrameSink, MediaPipeline,
    PadLinkDecision, PadPolicy, PadPresence, PipelineState, SeekFlags, StateChange, VideoFrame,
};

use super::element::{Element, ElementKind};
use super::source::{Pull, Source};

/// Bus of one pipeline. The watch is invoked without holding the lock.
#[derive(Clone, Default)]
struct Bus(Arc<Mutex<Option<BusWatch>>>);

impl Bus {
    fn post(&self, message: BusMessage) {
        let watch = self.0.lock().clone();
        match watch {
            Some(watch) => watch(message),
            None => log::trace!("no bus watch, dropping {message:?}"),
        }
    }
}

struct Link {
    src: String,
    sink: String,
    /// Set for links made when a dynamic pad appears.
    policy: Option<PadPolicy>,
}

/// Dynamic pad of the decoder, resolved when the first frame is decoded.
#[derive(Clone)]
struct PendingPad {
    element: String,
    policy: PadPolicy,
    compatible: bool,
}

/// Where frames of a prepared pipeline go.
#[derive(Clone)]
struct Route {
    source_name: String,
    pad: Option<PendingPad>,
    sink: Arc<dyn FrameSink>,
}

struct Prepared {
    source: Source,
    route: Route,
}

#[derive(Default)]
struct StreamControl {
    paused: bool,
    stop: bool,
    seek: Option<Duration>,
}

#[derive(Default)]
struct StreamShared {
    control: Mutex<StreamControl>,
    wake: Condvar,
}

impl StreamShared {
    fn update(&self, f: impl FnOnce(&mut StreamControl)) {
        f(&mut *self.control.lock());
        self.wake.notify_all();
    }
}

struct Streamer {
    shared: Arc<StreamShared>,
    thread: JoinHandle<Source>,
    route: Route,
    live: bool,
}

/// In-process pipeline: a linear chain from one source element to an
/// `appsink`, driven by one streaming thread while paused or playing.
pub struct SoftPipeline {
    name: String,
    elements: Vec<Element>,
    links: Vec<Link>,
    frame_sink: Option<(String, Arc<dyn FrameSink>)>,
    bus: Bus,
    state: PipelineState,
    prepared: Option<Prepared>,
    streamer: Option<Streamer>,
    /// Seek requested while idle in `Null`; applied when the source opens.
    pending_seek: Option<Duration>,
}

impl SoftPipeline {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            elements: Vec::new(),
            links: Vec::new(),
            frame_sink: None,
            bus: Bus::default(),
            state: PipelineState::Null,
            prepared: None,
            streamer: None,
            pending_seek: None,
        }
    }

    fn element(&self, name: &str) -> Result<&Element, BackendError> {
        self.elements
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| BackendError::UnknownElement(name.to_string()))
    }

    fn check_link(&self, src: &str, sink: &str) -> Result<(), BackendError> {
        let fail = |reason: &str| {
            Err(BackendError::Link {
                src: src.to_string(),
                sink: sink.to_string(),
                reason: reason.to_string(),
            })
        };
        let (src_el, sink_el) = (self.element(src)?, self.element(sink)?);
        if !src_el.kind.has_src_pad() {
            return fail("source element has no output");
        }
        if !sink_el.kind.has_sink_pad() {
            return fail("sink element has no input");
        }
        if self.links.iter().any(|l| l.src == src) {
            return fail("output already linked");
        }
        if self.links.iter().any(|l| l.sink == sink) {
            return fail("input already linked");
        }
        Ok(())
    }

    fn source_element(&self) -> Option<&Element> {
        self.elements.iter().find(|e| e.kind.is_source())
    }

    /// Walks the chain from the source to the frame sink and opens the
    /// source's resources.
    fn prepare(&self) -> Result<Prepared, BackendError> {
        let not_ready = |reason: String| BackendError::StateChange {
            target: PipelineState::Ready,
            reason,
        };

        let mut sources = self.elements.iter().filter(|e| e.kind.is_source());
        let source = sources
            .next()
            .ok_or_else(|| not_ready(format!("`{}` has no source element", self.name)))?;
        if let Some(extra) = sources.next() {
            return Err(not_ready(format!("second source element `{}`", extra.name)));
        }
        let (sink_name, sink) = self
            .frame_sink
            .clone()
            .ok_or_else(|| not_ready(format!("`{}` has no frame sink", self.name)))?;

        let mut current = source;
        let mut decoded = !source.kind.is_encoded();
        let mut pad = None;
        for _ in 0..self.elements.len() {
            if current.name == sink_name {
                let source_obj = Source::open(&source.kind)?;
                return Ok(Prepared {
                    source: source_obj,
                    route: Route {
                        source_name: source.name.clone(),
                        pad,
                        sink,
                    },
                });
            }

            let link = self
                .links
                .iter()
                .find(|l| l.src == current.name)
                .ok_or_else(|| not_ready(format!("`{}` is not linked downstream", current.name)))?;
            let next = self.element(&link.sink)?;

            if current.kind == ElementKind::DecodeBin {
                decoded = true;
                if let Some(policy) = &link.policy {
                    pad = Some(PendingPad {
                        element: current.name.clone(),
                        policy: Arc::clone(policy),
                        compatible: next.kind.accepts_raw_video(),
                    });
                }
            } else if !decoded && next.kind != ElementKind::DecodeBin {
                return Err(not_ready(format!(
                    "`{}` carries encoded data that `{}` cannot handle",
                    current.name, next.name
                )));
            }
            current = next;
        }
        Err(not_ready(format!("no path from `{}` to `{sink_name}`", source.name)))
    }

    /// Opens the source and moves it to any position requested while idle.
    fn open(&mut self) -> Result<Prepared, BackendError> {
        let mut prepared = self.prepare()?;
        if let Some(position) = self.pending_seek.take() {
            prepared.source.seek(position)?;
        }
        Ok(prepared)
    }

    fn start_streaming(&mut self, paused: bool) -> Result<bool, BackendError> {
        let Prepared { source, route } = match self.prepared.take() {
            Some(prepared) => prepared,
            None => self.open()?,
        };

        let live = source.is_live();
        let shared = Arc::new(StreamShared::default());
        shared.control.lock().paused = paused;

        let worker = StreamWorker {
            source,
            route: route.clone(),
            shared: Arc::clone(&shared),
            bus: self.bus.clone(),
        };
        let thread = thread::Builder::new()
            .name(format!("vistim-stream:{}", self.name))
            .spawn(move || worker.run())
            .map_err(|source| BackendError::Io {
                context: "cannot spawn streaming thread".into(),
                source,
            })?;

        self.streamer = Some(Streamer { shared, thread, route, live });
        Ok(live)
    }

    /// Stops and joins the streaming thread, returning its source.
    fn stop_streaming(&mut self) -> Option<Prepared> {
        let streamer = self.streamer.take()?;
        streamer.shared.update(|c| c.stop = true);
        match streamer.thread.join() {
            Ok(source) => Some(Prepared { source, route: streamer.route }),
            Err(_) => {
                log::error!("streaming thread of `{}` panicked", self.name);
                None
            }
        }
    }

    fn seekable(&self) -> bool {
        self.source_element()
            .is_some_and(|e| matches!(e.kind, ElementKind::TestSrc(_) | ElementKind::FileSrc { .. }))
    }
}

impl MediaPipeline for SoftPipeline {
    fn name(&self) -> &str {
        &self.name
    }

    fn add_element(&mut self, spec: &ElementSpec) -> Result<(), BackendError> {
        if self.elements.iter().any(|e| e.name == spec.name) {
            return Err(BackendError::DuplicateElement(spec.name.clone()));
        }
        self.elements.push(Element::from_spec(spec)?);
        Ok(())
    }

    fn tail(&self) -> Option<String> {
        self.elements.last().map(|e| e.name.clone())
    }

    fn src_presence(&self, element: &str) -> Result<PadPresence, BackendError> {
        Ok(self.element(element)?.kind.presence())
    }

    fn link(&mut self, src: &str, sink: &str) -> Result<(), BackendError> {
        self.check_link(src, sink)?;
        if self.element(src)?.kind.presence() == PadPresence::Sometimes {
            return Err(BackendError::Link {
                src: src.to_string(),
                sink: sink.to_string(),
                reason: "output pad does not exist yet".into(),
            });
        }
        self.links.push(Link { src: src.into(), sink: sink.into(), policy: None });
        Ok(())
    }

    fn link_on_pad_added(&mut self, src: &str, sink: &str, policy: PadPolicy) -> Result<(), BackendError> {
        self.check_link(src, sink)?;
        if self.element(src)?.kind.presence() != PadPresence::Sometimes {
            return Err(BackendError::Link {
                src: src.to_string(),
                sink: sink.to_string(),
                reason: "element has no dynamic pads".into(),
            });
        }
        self.links.push(Link { src: src.into(), sink: sink.into(), policy: Some(policy) });
        Ok(())
    }

    fn set_frame_sink(&mut self, element: &str, sink: Arc<dyn FrameSink>) -> Result<(), BackendError> {
        if self.element(element)?.kind != ElementKind::AppSink {
            return Err(BackendError::Link {
                src: element.to_string(),
                sink: "frame sink".into(),
                reason: "only an appsink can hand out frames".into(),
            });
        }
        self.frame_sink = Some((element.to_string(), sink));
        Ok(())
    }

    fn set_bus_watch(&mut self, watch: BusWatch) {
        *self.bus.0.lock() = Some(watch);
    }

    fn clear_bus_watch(&mut self) {
        *self.bus.0.lock() = None;
    }

    fn set_state(&mut self, target: PipelineState) -> Result<StateChange, BackendError> {
        let old = self.state;
        if old == target {
            return Ok(StateChange::Success);
        }

        let mut live = false;
        match target {
            PipelineState::Null => {
                self.stop_streaming();
                self.prepared = None;
            }
            PipelineState::Ready => {
                if old == PipelineState::Null {
                    self.prepared = Some(self.open()?);
                } else if let Some(mut prepared) = self.stop_streaming() {
                    prepared.source.rewind();
                    self.prepared = Some(prepared);
                }
            }
            PipelineState::Paused | PipelineState::Playing => {
                let paused = target == PipelineState::Paused;
                match &self.streamer {
                    Some(streamer) => {
                        live = streamer.live;
                        streamer.shared.update(|c| c.paused = paused);
                    }
                    None => live = self.start_streaming(paused)?,
                }
            }
        }

        self.state = target;
        log::trace!("`{}`: {old:?} -> {target:?}", self.name);
        self.bus.post(BusMessage::StateChanged { old, new: target });

        Ok(if live && target == PipelineState::Paused {
            StateChange::NoPreroll
        } else {
            StateChange::Success
        })
    }

    fn state(&self) -> PipelineState {
        self.state
    }

    /// Every frame of the soft sources is a key frame, and nothing is queued
    /// between source and sink, so both flags are satisfied by construction.
    /// In `Null` the position is kept until the source is opened again.
    fn seek(&mut self, position: Duration, _flags: SeekFlags) -> Result<(), BackendError> {
        if !self.seekable() {
            return Err(BackendError::Seek(format!("`{}` has no seekable source", self.name)));
        }
        match (&self.streamer, &mut self.prepared) {
            (Some(streamer), _) => {
                streamer.shared.update(|c| c.seek = Some(position));
                Ok(())
            }
            (None, Some(prepared)) => prepared.source.seek(position),
            (None, None) => {
                self.pending_seek = Some(position);
                Ok(())
            }
        }
    }
}

impl Drop for SoftPipeline {
    fn drop(&mut self) {
        self.stop_streaming();
    }
}

/// State owned by the streaming thread.
struct StreamWorker {
    source: Source,
    route: Route,
    shared: Arc<StreamShared>,
    bus: Bus,
}

enum Resume {
    Run,
    Stop,
}

impl StreamWorker {
    fn run(mut self) -> Source {
        let mut linked = self.route.pad.is_none();
        let mut pad_resolved = self.route.pad.is_none();

        while let Resume::Run = self.wait_runnable() {
            match self.source.pull() {
                Ok(Pull::Frame { frame, duration }) => {
                    if !pad_resolved {
                        pad_resolved = true;
                        match self.resolve_pad() {
                            PadLinkDecision::Link => linked = true,
                            PadLinkDecision::Ignore => {}
                            PadLinkDecision::Fail => {
                                self.park_until_stop();
                                break;
                            }
                        }
                    }
                    if linked {
                        self.route.sink.deliver(&VideoFrame {
                            width: frame.width,
                            height: frame.height,
                            stride: frame.width as usize * 4,
                            data: &frame.data,
                        });
                    }
                    self.pace(duration);
                }
                Ok(Pull::Pending) => {}
                Ok(Pull::Eos) => {
                    self.bus.post(BusMessage::Eos);
                    if let Resume::Stop = self.park_after_eos() {
                        break;
                    }
                }
                Err(message) => {
                    self.bus.post(BusMessage::Error {
                        source: self.route.source_name.clone(),
                        message,
                    });
                    self.park_until_stop();
                    break;
                }
            }
        }
        self.source
    }

    fn resolve_pad(&self) -> PadLinkDecision {
        let Some(pad) = &self.route.pad else {
            return PadLinkDecision::Link;
        };
        let decision = (pad.policy)(&Caps::video("RGBA"), pad.compatible);
        if decision == PadLinkDecision::Fail {
            self.bus.post(BusMessage::Error {
                source: pad.element.clone(),
                message: "decoded stream cannot be linked downstream".into(),
            });
        }
        decision
    }

    /// Blocks while paused; applies pending seeks.
    fn wait_runnable(&mut self) -> Resume {
        let mut control = self.shared.control.lock();
        loop {
            if control.stop {
                return Resume::Stop;
            }
            if let Some(position) = control.seek.take() {
                if let Err(e) = self.source.seek(position) {
                    log::warn!("seek to {position:?} failed: {e}");
                }
            }
            if !control.paused {
                return Resume::Run;
            }
            self.shared.wake.wait(&mut control);
        }
    }

    /// Sleeps for one frame, waking early on any control change.
    fn pace(&self, duration: Duration) {
        let deadline = Instant::now() + duration;
        let mut control = self.shared.control.lock();
        while !control.stop && !control.paused && control.seek.is_none() {
            if self.shared.wake.wait_until(&mut control, deadline).timed_out() {
                break;
            }
        }
    }

    /// After end of stream, only a seek restarts the flow.
    fn park_after_eos(&self) -> Resume {
        let mut control = self.shared.control.lock();
        loop {
            if control.stop {
                return Resume::Stop;
            }
            if control.seek.is_some() {
                return Resume::Run;
            }
            self.shared.wake.wait(&mut control);
        }
    }

    fn park_until_stop(&self) {
        let mut control = self.shared.control.lock();
        while !control.stop {
            self.shared.wake.wait(&mut control);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Default)]
    struct CountingSink {
        frames: AtomicUsize,
        last_size: Mutex<(u32, u32)>,
    }

    impl FrameSink for CountingSink {
        fn deliver(&self, frame: &VideoFrame<'_>) {
            *self.last_size.lock() = (frame.width, frame.height);
            self.frames.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn test_pipeline(extra: &[(&str, &str)], sink: Arc<CountingSink>) -> SoftPipeline {
        let mut src = ElementSpec::new("videotestsrc", "src").prop("width", 16).prop("height", 8);
        for (k, v) in extra {
            src = src.prop(*k, *v);
        }
        let mut p = SoftPipeline::new("test");
        p.add_element(&src).unwrap();
        p.add_element(&ElementSpec::new("appsink", "out")).unwrap();
        p.link("src", "out").unwrap();
        p.set_frame_sink("out", sink).unwrap();
        p
    }

    fn wait_for(cond: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    // ── linking ───────────────────────────────────────────────────────────

    #[test]
    fn dynamic_pads_cannot_be_linked_directly() {
        let mut p = SoftPipeline::new("p");
        p.add_element(&ElementSpec::new("decodebin", "dec")).unwrap();
        p.add_element(&ElementSpec::new("videoconvert", "conv")).unwrap();
        assert!(matches!(p.link("dec", "conv"), Err(BackendError::Link { .. })));
        let policy: PadPolicy = Arc::new(|_: &Caps, _: bool| PadLinkDecision::Link);
        p.link_on_pad_added("dec", "conv", policy).unwrap();
    }

    #[test]
    fn duplicate_names_and_double_links_are_rejected() {
        let mut p = SoftPipeline::new("p");
        p.add_element(&ElementSpec::new("videotestsrc", "a")).unwrap();
        assert!(matches!(
            p.add_element(&ElementSpec::new("appsink", "a")),
            Err(BackendError::DuplicateElement(_))
        ));
        p.add_element(&ElementSpec::new("appsink", "b")).unwrap();
        p.add_element(&ElementSpec::new("appsink", "c")).unwrap();
        p.link("a", "b").unwrap();
        assert!(p.link("a", "c").is_err());
        assert!(p.link("b", "c").is_err());
    }

    #[test]
    fn encoded_source_without_decoder_fails_ready() {
        let mut p = SoftPipeline::new("p");
        p.add_element(&ElementSpec::new("filesrc", "src").prop("location", "x.gif")).unwrap();
        p.add_element(&ElementSpec::new("appsink", "out")).unwrap();
        p.link("src", "out").unwrap();
        p.set_frame_sink("out", Arc::new(CountingSink::default())).unwrap();
        assert!(matches!(p.set_state(PipelineState::Ready), Err(BackendError::StateChange { .. })));
        assert_eq!(p.state(), PipelineState::Null);
    }

    // ── streaming ─────────────────────────────────────────────────────────

    #[test]
    fn playing_delivers_frames_until_buffer_count_then_eos() {
        let sink = Arc::new(CountingSink::default());
        let mut p = test_pipeline(&[("num-buffers", "3"), ("framerate", "200")], Arc::clone(&sink));
        let (tx, rx) = std::sync::mpsc::channel();
        let tx = Mutex::new(tx);
        p.set_bus_watch(Arc::new(move |m| {
            let _ = tx.lock().send(m);
        }));

        p.set_state(PipelineState::Playing).unwrap();
        let eos = rx
            .iter()
            .find(|m| *m == BusMessage::Eos || matches!(m, BusMessage::Error { .. }));
        assert_eq!(eos, Some(BusMessage::Eos));
        assert_eq!(sink.frames.load(Ordering::SeqCst), 3);
        assert_eq!(*sink.last_size.lock(), (16, 8));

        p.set_state(PipelineState::Null).unwrap();
        assert!(p.streamer.is_none());
    }

    #[test]
    fn paused_pipeline_delivers_nothing() {
        let sink = Arc::new(CountingSink::default());
        let mut p = test_pipeline(&[("framerate", "200")], Arc::clone(&sink));
        p.set_state(PipelineState::Paused).unwrap();
        thread::sleep(Duration::from_millis(50));
        assert_eq!(sink.frames.load(Ordering::SeqCst), 0);

        p.set_state(PipelineState::Playing).unwrap();
        assert!(wait_for(|| sink.frames.load(Ordering::SeqCst) > 0));
        p.set_state(PipelineState::Null).unwrap();
    }

    #[test]
    fn failing_pad_policy_posts_error() {
        let sink = Arc::new(CountingSink::default());
        let mut p = SoftPipeline::new("p");
        p.add_element(&ElementSpec::new("videotestsrc", "src")).unwrap();
        p.add_element(&ElementSpec::new("decodebin", "dec")).unwrap();
        p.add_element(&ElementSpec::new("appsink", "out")).unwrap();
        p.link("src", "dec").unwrap();
        p.link_on_pad_added("dec", "out", Arc::new(|_: &Caps, _: bool| PadLinkDecision::Fail))
            .unwrap();
        p.set_frame_sink("out", Arc::clone(&sink) as Arc<dyn FrameSink>).unwrap();

        let (tx, rx) = std::sync::mpsc::channel();
        let tx = Mutex::new(tx);
        p.set_bus_watch(Arc::new(move |m| {
            let _ = tx.lock().send(m);
        }));
        p.set_state(PipelineState::Playing).unwrap();
        let error = rx.iter().find(|m| matches!(m, BusMessage::Error { .. }));
        assert!(matches!(error, Some(BusMessage::Error { source, .. }) if source == "dec"));
        assert_eq!(sink.frames.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn network_sources_refuse_to_seek() {
        let mut p = SoftPipeline::new("p");
        p.add_element(&ElementSpec::new("udpsrc", "src").prop("port", 5004)).unwrap();
        assert!(matches!(
            p.seek(Duration::from_secs(1), SeekFlags::FLUSH_KEY_UNIT),
            Err(BackendError::Seek(_))
        ));
    }

    #[test]
    fn seek_while_idle_applies_on_next_start() {
        let sink = Arc::new(CountingSink::default());
        let mut p = test_pipeline(&[("num-buffers", "3"), ("framerate", "200")], Arc::clone(&sink));
        let (tx, rx) = std::sync::mpsc::channel();
        let tx = Mutex::new(tx);
        p.set_bus_watch(Arc::new(move |m| {
            let _ = tx.lock().send(m);
        }));
        let next_eos = || {
            rx.iter()
                .find(|m| *m == BusMessage::Eos || matches!(m, BusMessage::Error { .. }))
        };

        p.set_state(PipelineState::Playing).unwrap();
        assert_eq!(next_eos(), Some(BusMessage::Eos));
        p.set_state(PipelineState::Null).unwrap();
        assert_eq!(sink.frames.load(Ordering::SeqCst), 3);

        // 10 ms at 200 fps is the third and last frame.
        p.seek(Duration::from_millis(10), SeekFlags::FLUSH_KEY_UNIT).unwrap();
        p.set_state(PipelineState::Playing).unwrap();
        assert_eq!(next_eos(), Some(BusMessage::Eos));
        assert_eq!(sink.frames.load(Ordering::SeqCst), 4);
        p.set_state(PipelineState::Null).unwrap();
    }
}
