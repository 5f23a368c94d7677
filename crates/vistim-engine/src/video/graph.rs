//! Decode graph assembly.
//!
//! Every feed becomes `source [→ decoder] → converter → sink`. Links whose
//! source pad only appears at runtime are deferred to the backend's pad-added
//! notification, filtered by [`pad_link_policy`].

use std::sync::Arc;

use super::{
    BackendError, Caps, ElementSpec, FrameSink, MediaBackend, MediaKind, MediaPipeline,
    PadLinkDecision, PadPresence, VideoFeed,
};

/// Name of the color converter appended to every graph.
pub const CONVERTER_NAME: &str = "vistimconv";

/// Name of the terminal frame sink appended to every graph.
pub const SINK_NAME: &str = "vistimsink";

const SOURCE_NAME: &str = "vistimsrc";
const DECODER_NAME: &str = "vistimdec";

/// Decides whether a runtime pad gets linked.
///
/// Compatible pads are linked. An incompatible video pad makes the stream
/// unplayable; any other incompatible pad (audio, subtitles) is ignored.
pub fn pad_link_policy(caps: &Caps, compatible: bool) -> PadLinkDecision {
    if compatible {
        return PadLinkDecision::Link;
    }
    match caps.kind {
        MediaKind::Video => {
            log::error!("video pad with caps `{}` cannot be linked", caps.format);
            PadLinkDecision::Fail
        }
        MediaKind::Audio | MediaKind::Other => {
            log::debug!("ignoring unlinkable pad `{}`", caps.format);
            PadLinkDecision::Ignore
        }
    }
}

/// Elements producing the encoded or raw stream for `feed`.
pub fn source_chain(feed: &VideoFeed) -> Vec<ElementSpec> {
    let decoder = || ElementSpec::new("decodebin", DECODER_NAME);
    match feed {
        VideoFeed::Test => vec![ElementSpec::new("videotestsrc", SOURCE_NAME)],
        VideoFeed::File(path) => vec![
            ElementSpec::new("filesrc", SOURCE_NAME).prop("location", path.display()),
            decoder(),
        ],
        VideoFeed::Tcp { host, port } => vec![
            ElementSpec::new("tcpclientsrc", SOURCE_NAME)
                .prop("host", host)
                .prop("port", port),
            decoder(),
        ],
        VideoFeed::Udp { port } => vec![
            ElementSpec::new("udpsrc", SOURCE_NAME).prop("port", port),
            decoder(),
        ],
        VideoFeed::Pipeline(spec) => spec.elements.clone(),
        VideoFeed::Custom(_) => Vec::new(),
    }
}

/// Builds the complete graph for `feed`, with frames routed to `sink`.
pub fn build(
    backend: &dyn MediaBackend,
    feed: &VideoFeed,
    sink: Arc<dyn FrameSink>,
) -> Result<Box<dyn MediaPipeline>, BackendError> {
    let name = match feed {
        VideoFeed::Pipeline(spec) => spec.name.clone(),
        other => other.key().to_string(),
    };

    let mut pipeline = match feed {
        VideoFeed::Custom(description) => backend.parse_launch(&name, description)?,
        _ => backend.new_pipeline(&name)?,
    };

    let mut chain = source_chain(feed);
    chain.push(ElementSpec::new("videoconvert", CONVERTER_NAME));
    chain.push(ElementSpec::new("appsink", SINK_NAME));

    let mut prev = pipeline.tail();
    for element in &chain {
        pipeline.add_element(element)?;
        if let Some(src) = prev.as_deref() {
            link(&mut *pipeline, src, &element.name)?;
        }
        prev = Some(element.name.clone());
    }

    pipeline.set_frame_sink(SINK_NAME, sink)?;
    log::debug!("built decode graph `{}` ({} elements)", pipeline.name(), chain.len());
    Ok(pipeline)
}

fn link(pipeline: &mut dyn MediaPipeline, src: &str, sink: &str) -> Result<(), BackendError> {
    match pipeline.src_presence(src)? {
        PadPresence::Always => pipeline.link(src, sink),
        PadPresence::Sometimes => pipeline.link_on_pad_added(src, sink, Arc::new(pad_link_policy)),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use parking_lot::Mutex;

    use super::*;
    use crate::video::{
        BusWatch, PadPolicy, PipelineSpec, PipelineState, SeekFlags, StateChange, VideoFrame,
    };

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Add(String),
        Link(String, String),
        Deferred(String, String),
        Sink(String),
    }

    struct Recorder {
        name: String,
        calls: Arc<Mutex<Vec<Call>>>,
        elements: Vec<ElementSpec>,
    }

    impl MediaPipeline for Recorder {
        fn name(&self) -> &str {
            &self.name
        }
        fn add_element(&mut self, spec: &ElementSpec) -> Result<(), BackendError> {
            self.calls.lock().push(Call::Add(spec.factory.clone()));
            self.elements.push(spec.clone());
            Ok(())
        }
        fn tail(&self) -> Option<String> {
            self.elements.last().map(|e| e.name.clone())
        }
        fn src_presence(&self, element: &str) -> Result<PadPresence, BackendError> {
            let spec = self
                .elements
                .iter()
                .find(|e| e.name == element)
                .ok_or_else(|| BackendError::UnknownElement(element.into()))?;
            Ok(if spec.factory == "decodebin" { PadPresence::Sometimes } else { PadPresence::Always })
        }
        fn link(&mut self, src: &str, sink: &str) -> Result<(), BackendError> {
            self.calls.lock().push(Call::Link(src.into(), sink.into()));
            Ok(())
        }
        fn link_on_pad_added(&mut self, src: &str, sink: &str, _: PadPolicy) -> Result<(), BackendError> {
            self.calls.lock().push(Call::Deferred(src.into(), sink.into()));
            Ok(())
        }
        fn set_frame_sink(&mut self, element: &str, _: Arc<dyn FrameSink>) -> Result<(), BackendError> {
            self.calls.lock().push(Call::Sink(element.into()));
            Ok(())
        }
        fn set_bus_watch(&mut self, _: BusWatch) {}
        fn clear_bus_watch(&mut self) {}
        fn set_state(&mut self, _: PipelineState) -> Result<StateChange, BackendError> {
            Ok(StateChange::Success)
        }
        fn state(&self) -> PipelineState {
            PipelineState::Null
        }
        fn seek(&mut self, _: Duration, _: SeekFlags) -> Result<(), BackendError> {
            Ok(())
        }
    }

    struct RecordingBackend {
        calls: Arc<Mutex<Vec<Call>>>,
    }

    impl MediaBackend for RecordingBackend {
        fn name(&self) -> &str {
            "recording"
        }
        fn init(&self) -> Result<(), BackendError> {
            Ok(())
        }
        fn deinit(&self) {}
        fn new_pipeline(&self, name: &str) -> Result<Box<dyn MediaPipeline>, BackendError> {
            Ok(Box::new(Recorder { name: name.into(), calls: Arc::clone(&self.calls), elements: Vec::new() }))
        }
        fn parse_launch(&self, name: &str, _: &str) -> Result<Box<dyn MediaPipeline>, BackendError> {
            let mut p = Recorder { name: name.into(), calls: Arc::clone(&self.calls), elements: Vec::new() };
            p.elements.push(ElementSpec::new("videotestsrc", "parsed0"));
            Ok(Box::new(p))
        }
    }

    struct NullSink;

    impl FrameSink for NullSink {
        fn deliver(&self, _: &VideoFrame<'_>) {}
    }

    fn record(feed: &VideoFeed) -> Vec<Call> {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let backend = RecordingBackend { calls: Arc::clone(&calls) };
        build(&backend, feed, Arc::new(NullSink)).unwrap();
        let out = calls.lock().clone();
        out
    }

    // ── policy ────────────────────────────────────────────────────────────

    #[test]
    fn compatible_pads_are_linked() {
        assert_eq!(pad_link_policy(&Caps::video("RGBA"), true), PadLinkDecision::Link);
        assert_eq!(pad_link_policy(&Caps::audio("S16LE"), true), PadLinkDecision::Link);
    }

    #[test]
    fn incompatible_video_fails_but_audio_is_ignored() {
        assert_eq!(pad_link_policy(&Caps::video("H265"), false), PadLinkDecision::Fail);
        assert_eq!(pad_link_policy(&Caps::audio("S16LE"), false), PadLinkDecision::Ignore);
    }

    // ── graph shape ───────────────────────────────────────────────────────

    #[test]
    fn test_feed_links_directly() {
        let calls = record(&VideoFeed::Test);
        assert_eq!(
            calls,
            vec![
                Call::Add("videotestsrc".into()),
                Call::Add("videoconvert".into()),
                Call::Link(SOURCE_NAME.into(), CONVERTER_NAME.into()),
                Call::Add("appsink".into()),
                Call::Link(CONVERTER_NAME.into(), SINK_NAME.into()),
                Call::Sink(SINK_NAME.into()),
            ]
        );
    }

    #[test]
    fn decoder_output_is_linked_on_pad_added() {
        let calls = record(&VideoFeed::File("clip.gif".into()));
        assert!(calls.contains(&Call::Link(SOURCE_NAME.into(), DECODER_NAME.into())));
        assert!(calls.contains(&Call::Deferred(DECODER_NAME.into(), CONVERTER_NAME.into())));
    }

    #[test]
    fn custom_description_gets_terminal_elements() {
        let calls = record(&VideoFeed::Custom("videotestsrc".into()));
        assert_eq!(calls[0], Call::Add("videoconvert".into()));
        assert!(calls.contains(&Call::Link("parsed0".into(), CONVERTER_NAME.into())));
        assert_eq!(calls.last(), Some(&Call::Sink(SINK_NAME.into())));
    }

    #[test]
    fn user_pipeline_elements_are_chained_in_order() {
        let spec = PipelineSpec::new("cam")
            .element(ElementSpec::new("videotestsrc", "a"))
            .element(ElementSpec::new("videoconvert", "b"));
        let calls = record(&VideoFeed::Pipeline(spec));
        assert!(calls.contains(&Call::Link("a".into(), "b".into())));
        assert!(calls.contains(&Call::Link("b".into(), CONVERTER_NAME.into())));
    }
}
