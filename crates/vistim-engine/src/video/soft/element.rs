use std::path::PathBuf;
use std::time::Duration;

use crate::video::{BackendError, ElementSpec, PadPresence};

/// Test pattern drawn by `videotestsrc`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum Pattern {
    #[default]
    Bars,
    Checkers,
    /// Horizontal gradient scrolling one pixel per frame.
    Gradient,
}

impl Pattern {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "bars" | "smpte" => Some(Pattern::Bars),
            "checkers" => Some(Pattern::Checkers),
            "gradient" => Some(Pattern::Gradient),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestSrcProps {
    pub pattern: Pattern,
    pub width: u32,
    pub height: u32,
    /// Frames per second.
    pub framerate: u32,
    /// Frames to produce before end of stream; unbounded if `None`.
    pub num_buffers: Option<u64>,
}

impl Default for TestSrcProps {
    fn default() -> Self {
        Self {
            pattern: Pattern::Bars,
            width: 320,
            height: 240,
            framerate: 30,
            num_buffers: None,
        }
    }
}

impl TestSrcProps {
    pub fn frame_duration(&self) -> Duration {
        Duration::from_secs(1) / self.framerate.max(1)
    }
}

/// Typed configuration of one element instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementKind {
    TestSrc(TestSrcProps),
    FileSrc { location: Option<PathBuf> },
    TcpClientSrc { host: String, port: u16 },
    UdpSrc { port: u16 },
    DecodeBin,
    VideoConvert,
    AppSink,
}

impl ElementKind {
    fn from_factory(factory: &str) -> Option<Self> {
        Some(match factory {
            "videotestsrc" => ElementKind::TestSrc(TestSrcProps::default()),
            "filesrc" => ElementKind::FileSrc { location: None },
            "tcpclientsrc" => ElementKind::TcpClientSrc { host: "localhost".into(), port: 4953 },
            "udpsrc" => ElementKind::UdpSrc { port: 5004 },
            "decodebin" => ElementKind::DecodeBin,
            "videoconvert" => ElementKind::VideoConvert,
            "appsink" => ElementKind::AppSink,
            _ => return None,
        })
    }

    pub fn is_source(&self) -> bool {
        matches!(
            self,
            ElementKind::TestSrc(_)
                | ElementKind::FileSrc { .. }
                | ElementKind::TcpClientSrc { .. }
                | ElementKind::UdpSrc { .. }
        )
    }

    /// The source emits encoded data that needs a decoder downstream.
    pub fn is_encoded(&self) -> bool {
        self.is_source() && !matches!(self, ElementKind::TestSrc(_))
    }

    pub fn has_src_pad(&self) -> bool {
        !matches!(self, ElementKind::AppSink)
    }

    pub fn has_sink_pad(&self) -> bool {
        !self.is_source()
    }

    /// Whether the sink pad takes raw video frames.
    pub fn accepts_raw_video(&self) -> bool {
        matches!(self, ElementKind::VideoConvert | ElementKind::AppSink)
    }

    pub fn presence(&self) -> PadPresence {
        match self {
            ElementKind::DecodeBin => PadPresence::Sometimes,
            _ => PadPresence::Always,
        }
    }
}

/// An element instance inside a soft pipeline.
#[derive(Debug, Clone)]
pub struct Element {
    pub factory: String,
    pub name: String,
    pub kind: ElementKind,
}

impl Element {
    pub fn from_spec(spec: &ElementSpec) -> Result<Self, BackendError> {
        let kind = ElementKind::from_factory(&spec.factory)
            .ok_or_else(|| BackendError::UnknownFactory(spec.factory.clone()))?;
        let mut element = Element {
            factory: spec.factory.clone(),
            name: spec.name.clone(),
            kind,
        };
        for (key, value) in &spec.props {
            element.set_property(key, value)?;
        }
        Ok(element)
    }

    pub fn set_property(&mut self, key: &str, value: &str) -> Result<(), BackendError> {
        let invalid = || BackendError::InvalidProperty {
            property: key.to_string(),
            value: value.to_string(),
        };
        let unknown = || BackendError::UnknownProperty {
            element: self.name.clone(),
            property: key.to_string(),
        };

        match (&mut self.kind, key) {
            (ElementKind::TestSrc(p), "pattern") => p.pattern = Pattern::parse(value).ok_or_else(invalid)?,
            (ElementKind::TestSrc(p), "width") => p.width = parse_positive(value).ok_or_else(invalid)?,
            (ElementKind::TestSrc(p), "height") => p.height = parse_positive(value).ok_or_else(invalid)?,
            (ElementKind::TestSrc(p), "framerate") => p.framerate = parse_framerate(value).ok_or_else(invalid)?,
            (ElementKind::TestSrc(p), "num-buffers") => {
                let n: i64 = value.parse().map_err(|_| invalid())?;
                p.num_buffers = u64::try_from(n).ok();
            }
            (ElementKind::FileSrc { location }, "location") => {
                if value.is_empty() {
                    return Err(invalid());
                }
                *location = Some(PathBuf::from(value));
            }
            (ElementKind::TcpClientSrc { host, .. }, "host") => {
                if value.is_empty() {
                    return Err(invalid());
                }
                *host = value.to_string();
            }
            (ElementKind::TcpClientSrc { port, .. } | ElementKind::UdpSrc { port }, "port") => {
                *port = value.parse().map_err(|_| invalid())?;
            }
            _ => return Err(unknown()),
        }
        Ok(())
    }
}

fn parse_positive(value: &str) -> Option<u32> {
    value.parse().ok().filter(|&v| v > 0)
}

/// Accepts `30` or the fraction form `30/1`.
fn parse_framerate(value: &str) -> Option<u32> {
    match value.split_once('/') {
        Some((num, den)) => {
            let num: u32 = num.trim().parse().ok()?;
            let den: u32 = den.trim().parse().ok().filter(|&d| d > 0)?;
            Some(num / den).filter(|&f| f > 0)
        }
        None => parse_positive(value),
    }
}
