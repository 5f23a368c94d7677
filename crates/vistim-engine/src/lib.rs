//! vistim engine.
//!
//! A 2D drawing core for real-time visual stimulus display: solid shapes,
//! text, still images and live video drawn through wgpu. Textures are kept
//! in a reference-counted registry ([`texture::TextureManager`]) and
//! uploaded lazily when first drawn; video textures are fed by a decode
//! pipeline running on its own threads ([`video`]).

pub mod coords;
pub mod core;
pub mod device;
pub mod logging;
pub mod paint;
pub mod render;
pub mod scene;
pub mod text;
pub mod texture;
pub mod time;
pub mod video;
pub mod window;
