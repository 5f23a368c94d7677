use winit::window::Window;

use crate::coords::Viewport;
use crate::device::{Gpu, SurfaceErrorAction, WgpuUploader};
use crate::paint::Color;
use crate::render::{RenderCtx, RenderTarget, SceneRenderer};
use crate::scene::DrawList;
use crate::texture::TextureManager;
use crate::time::FrameTime;

use super::app::AppControl;

/// Per-frame context passed to [`App::on_frame`](super::App::on_frame).
///
/// `'a` spans the callback; `'w` is the window borrow held by `Gpu<'w>`.
pub struct FrameCtx<'a, 'w> {
    pub window: &'a Window,
    pub gpu: &'a mut Gpu<'w>,
    pub textures: &'a TextureManager,
    pub time: FrameTime,
    pub(crate) scene: &'a mut SceneRenderer,
}

impl<'a, 'w> FrameCtx<'a, 'w> {
    /// Window size in logical pixels.
    pub fn viewport(&self) -> Viewport {
        let size = self.window.inner_size();
        Viewport::from_physical(size.width, size.height, self.window.scale_factor())
    }

    /// Uploader for binding textures outside the scene renderer.
    pub fn uploader(&self) -> &WgpuUploader {
        self.gpu.uploader()
    }

    /// Clears to `clear`, draws `draw_list` and presents.
    ///
    /// Textures referenced by the list are bound (and uploaded or refreshed)
    /// during this call.
    pub fn render(&mut self, clear: Color, draw_list: &mut DrawList) -> AppControl {
        let viewport = self.viewport();
        if !viewport.is_valid() {
            return AppControl::Continue;
        }

        let mut frame = match self.gpu.begin_frame() {
            Ok(f) => f,
            Err(err) => {
                return match self.gpu.handle_surface_error(err) {
                    SurfaceErrorAction::Fatal => {
                        log::error!("surface out of memory");
                        AppControl::Exit
                    }
                    _ => AppControl::Continue,
                };
            }
        };

        {
            let gpu = &*self.gpu;
            let rctx = RenderCtx::new(
                gpu.device(),
                gpu.queue(),
                gpu.surface_format(),
                viewport,
                self.window.scale_factor() as f32,
                gpu.uploader(),
            );
            let mut target = RenderTarget::new(&mut frame.encoder, &frame.view);
            self.scene.render(&rctx, &mut target, draw_list, Some(clear));
        }

        self.window.pre_present_notify();
        self.gpu.submit(frame);
        AppControl::Continue
    }
}
