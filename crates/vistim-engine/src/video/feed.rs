use std::path::PathBuf;

use crate::texture::TextureKey;

use super::VideoError;

/// One processing node of a decode graph: factory, instance name and
/// string properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSpec {
    pub factory: String,
    pub name: String,
    pub props: Vec<(String, String)>,
}

impl ElementSpec {
    pub fn new(factory: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            factory: factory.into(),
            name: name.into(),
            props: Vec::new(),
        }
    }

    pub fn prop(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.props.push((key.into(), value.to_string()));
        self
    }
}

/// A named chain of elements, linked in order. The color converter and the
/// frame sink are appended automatically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSpec {
    pub name: String,
    pub elements: Vec<ElementSpec>,
}

impl PipelineSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            elements: Vec::new(),
        }
    }

    pub fn element(mut self, element: ElementSpec) -> Self {
        self.elements.push(element);
        self
    }
}

/// Source of a video texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoFeed {
    /// Synthetic test pattern.
    Test,
    /// Media file on disk.
    File(PathBuf),
    /// Length-prefixed encoded frames read from a TCP server.
    Tcp { host: String, port: u16 },
    /// Encoded frames received as UDP datagrams.
    Udp { port: u16 },
    /// Backend launch description, e.g. `videotestsrc pattern=checkers`.
    Custom(String),
    /// Element chain assembled by the caller.
    Pipeline(PipelineSpec),
}

impl VideoFeed {
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        VideoFeed::Tcp { host: host.into(), port }
    }

    /// Rejects feeds that can never open, before anything is allocated.
    pub fn validate(&self) -> Result<(), VideoError> {
        let invalid = |reason: &str| Err(VideoError::InvalidFeed(reason.to_string()));
        match self {
            VideoFeed::Test => Ok(()),
            VideoFeed::File(path) if path.as_os_str().is_empty() => invalid("empty file path"),
            VideoFeed::File(_) => Ok(()),
            VideoFeed::Tcp { host, .. } if host.is_empty() => invalid("empty TCP host"),
            VideoFeed::Tcp { port: 0, .. } | VideoFeed::Udp { port: 0 } => invalid("port must be at least 1"),
            VideoFeed::Tcp { .. } | VideoFeed::Udp { .. } => Ok(()),
            VideoFeed::Custom(desc) if desc.trim().is_empty() => invalid("empty pipeline description"),
            VideoFeed::Custom(_) => Ok(()),
            VideoFeed::Pipeline(spec) if spec.name.is_empty() => invalid("unnamed pipeline"),
            VideoFeed::Pipeline(spec) if spec.elements.is_empty() => invalid("pipeline has no elements"),
            VideoFeed::Pipeline(_) => Ok(()),
        }
    }

    /// Cache key of the texture fed by this source.
    pub fn key(&self) -> TextureKey {
        match self {
            VideoFeed::Test => TextureKey::new("TESTPIPE"),
            VideoFeed::File(path) => TextureKey::new(format!("FILE:{}", path.display())),
            VideoFeed::Tcp { host, port } => TextureKey::new(format!("TCP:{host}:{port}")),
            VideoFeed::Udp { port } => TextureKey::new(format!("UDP:{port}")),
            VideoFeed::Custom(desc) => TextureKey::new(format!("CUSTOM:{desc}")),
            VideoFeed::Pipeline(spec) => TextureKey::pipeline(&spec.name),
        }
    }
}
