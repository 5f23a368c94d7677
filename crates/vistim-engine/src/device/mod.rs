//! GPU device and surface.
//!
//! This module is responsible for:
//! - creating the wgpu instance, adapter, device and queue
//! - configuring the window surface and acquiring frames
//! - backing texture entities with wgpu textures ([`WgpuUploader`])

mod context;
mod error;
mod frame;
mod init;
mod surface;
mod uploader;

pub use context::Gpu;
pub use error::SurfaceErrorAction;
pub use frame::GpuFrame;
pub use init::GpuInit;
pub use uploader::{SampledTexture, WgpuUploader};
