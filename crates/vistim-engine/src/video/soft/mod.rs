//! Built-in media backend.
//!
//! Runs decode graphs in-process: synthetic test patterns, image and GIF
//! files decoded with the `image` crate, and encoded frames received over
//! TCP or UDP. Each playing pipeline owns one streaming thread.

mod element;
mod launch;
mod pipeline;
mod source;

use std::sync::Arc;

use image::ImageFormat;

use super::{BackendError, MediaBackend, MediaPipeline, PadLinkDecision, PadPolicy, PadPresence};

pub use element::Pattern;
pub use pipeline::SoftPipeline;

/// Software implementation of [`MediaBackend`].
#[derive(Debug, Default)]
pub struct SoftBackend {}

impl SoftBackend {
    pub fn new() -> Self {
        Self {}
    }

    /// Image formats the file and network sources can decode.
    pub fn decodable_formats() -> Vec<ImageFormat> {
        ImageFormat::all().filter(|f| f.reading_enabled()).collect()
    }
}

impl MediaBackend for SoftBackend {
    fn name(&self) -> &str {
        "soft"
    }

    fn init(&self) -> Result<(), BackendError> {
        let formats = Self::decodable_formats();
        if !formats.iter().any(|f| *f == ImageFormat::Gif) {
            log::warn!("GIF decoding unavailable; animated files will show one frame");
        }
        log::debug!("soft backend decodes {formats:?}");
        Ok(())
    }

    fn deinit(&self) {}

    fn new_pipeline(&self, name: &str) -> Result<Box<dyn MediaPipeline>, BackendError> {
        Ok(Box::new(SoftPipeline::new(name)))
    }

    fn parse_launch(&self, name: &str, description: &str) -> Result<Box<dyn MediaPipeline>, BackendError> {
        let elements = launch::parse(description)?;
        let mut pipeline = SoftPipeline::new(name);
        let link_compatible: PadPolicy = Arc::new(|_: &super::Caps, compatible: bool| {
            if compatible {
                PadLinkDecision::Link
            } else {
                PadLinkDecision::Ignore
            }
        });

        let mut prev: Option<&str> = None;
        for element in &elements {
            pipeline.add_element(element)?;
            if let Some(src) = prev {
                match pipeline.src_presence(src)? {
                    PadPresence::Always => pipeline.link(src, &element.name)?,
                    PadPresence::Sometimes => {
                        pipeline.link_on_pad_added(src, &element.name, Arc::clone(&link_compatible))?
                    }
                }
            }
            prev = Some(&element.name);
        }
        Ok(Box::new(pipeline))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::PipelineState;

    #[test]
    fn parse_launch_links_the_chain() {
        let backend = SoftBackend::new();
        let pipeline = backend
            .parse_launch("custom", "videotestsrc pattern=gradient ! videoconvert name=conv")
            .unwrap();
        assert_eq!(pipeline.tail().as_deref(), Some("conv"));
        assert_eq!(pipeline.state(), PipelineState::Null);
    }

    #[test]
    fn parse_launch_rejects_unknown_factories() {
        let backend = SoftBackend::new();
        assert!(matches!(
            backend.parse_launch("custom", "v4l2src ! videoconvert"),
            Err(BackendError::UnknownFactory(_))
        ));
    }

    #[test]
    fn init_succeeds_with_builtin_codecs() {
        let backend = SoftBackend::new();
        backend.init().unwrap();
        assert!(SoftBackend::decodable_formats().contains(&ImageFormat::Png));
        backend.deinit();
    }
}
