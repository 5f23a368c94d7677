use winit::event::WindowEvent;

use crate::texture::TextureManager;

use super::ctx::FrameCtx;

/// Returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application driven by [`Runtime::run`](crate::window::Runtime::run).
pub trait App {
    /// Called once the window and its GPU context exist and the texture
    /// registry is attached. Load fonts, images and videos here.
    fn on_start(&mut self, textures: &TextureManager) -> anyhow::Result<()> {
        let _ = textures;
        Ok(())
    }

    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        let _ = event;
        AppControl::Continue
    }

    /// Called once per redraw.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl;

    /// Called before the window and the registry lease are released.
    fn on_exit(&mut self) {}
}
