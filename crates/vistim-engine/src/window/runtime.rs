use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Fullscreen, Window, WindowId};

use crate::core::{App, AppControl, FrameCtx};
use crate::device::{Gpu, GpuInit};
use crate::render::SceneRenderer;
use crate::texture::{ManagerLease, TextureManager};
use crate::time::FrameClock;

/// Window configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    /// Borderless fullscreen on the current monitor.
    pub fullscreen: bool,
    /// Hide the pointer while it is over the window.
    pub hide_cursor: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "vistim".to_string(),
            initial_size: LogicalSize::new(800.0, 600.0),
            fullscreen: false,
            hide_cursor: false,
        }
    }
}

/// Entry point: opens one window and drives `app` until it exits.
pub struct Runtime;

impl Runtime {
    /// Runs the event loop.
    ///
    /// `textures` is attached for as long as the window exists, so the media
    /// backend is initialized before [`App::on_start`] and every cached
    /// entity is destroyed once the window closes.
    pub fn run<A>(config: RuntimeConfig, gpu_init: GpuInit, textures: TextureManager, app: A) -> Result<()>
    where
        A: App + 'static,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState {
            config,
            gpu_init,
            textures,
            app,
            window: None,
            exit_requested: false,
            error: None,
        };

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        state.close();
        match state.error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[self_referencing]
struct WindowEntry {
    clock: FrameClock,
    scene: SceneRenderer,
    lease: ManagerLease,

    window: Window,

    #[borrows(window)]
    #[covariant]
    gpu: Gpu<'this>,
}

struct AppState<A: App + 'static> {
    config: RuntimeConfig,
    gpu_init: GpuInit,
    textures: TextureManager,
    app: A,
    window: Option<WindowEntry>,
    exit_requested: bool,
    error: Option<anyhow::Error>,
}

impl<A: App + 'static> AppState<A> {
    fn open(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let mut attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);
        if self.config.fullscreen {
            attrs = attrs.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }

        let window = event_loop.create_window(attrs).context("failed to create window")?;
        if self.config.hide_cursor {
            window.set_cursor_visible(false);
        }

        let lease = self.textures.attach().context("failed to initialize the media backend")?;
        let gpu_init = self.gpu_init.clone();

        let entry = WindowEntryTryBuilder {
            clock: FrameClock::new(),
            scene: SceneRenderer::new(),
            lease,
            window,
            gpu_builder: |w| pollster::block_on(Gpu::new(w, gpu_init)),
        }
        .try_build()?;

        self.window = Some(entry);
        self.app.on_start(&self.textures).context("application start failed")?;
        Ok(())
    }

    /// Releases the window, then the registry lease.
    fn close(&mut self) {
        if let Some(entry) = self.window.take() {
            self.app.on_exit();
            let heads = entry.into_heads();
            drop(heads.window);
            drop(heads.lease);
            log::debug!("window closed; {} textures left", self.textures.len());
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, e: anyhow::Error) {
        log::error!("{e:#}");
        self.error.get_or_insert(e);
        self.exit(event_loop);
    }

    fn exit(&mut self, event_loop: &ActiveEventLoop) {
        self.exit_requested = true;
        self.close();
        event_loop.exit();
    }

    fn window_id(&self) -> Option<WindowId> {
        self.window.as_ref().map(|e| e.with_window(|w| w.id()))
    }
}

impl<A: App + 'static> ApplicationHandler for AppState<A> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() || self.exit_requested {
            return;
        }
        if let Err(e) = self.open(event_loop) {
            self.fail(event_loop, e);
            return;
        }
        if let Some(entry) = &self.window {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }
        // Stimulus display redraws every refresh; Fifo presentation paces it.
        event_loop.set_control_flow(ControlFlow::Poll);
        if let Some(entry) = &self.window {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        if self.exit_requested || self.window_id() != Some(window_id) {
            return;
        }

        if self.app.on_window_event(&event) == AppControl::Exit {
            self.exit(event_loop);
            return;
        }

        match event {
            WindowEvent::CloseRequested => self.exit(event_loop),

            WindowEvent::Resized(new_size) => {
                if let Some(entry) = self.window.as_mut() {
                    entry.with_gpu_mut(|gpu| gpu.resize(new_size));
                    entry.with_clock_mut(|c| c.reset());
                }
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(entry) = self.window.as_mut() {
                    let size = entry.with_window(|w| w.inner_size());
                    entry.with_gpu_mut(|gpu| gpu.resize(size));
                }
            }

            WindowEvent::RedrawRequested => {
                let (app, textures) = (&mut self.app, &self.textures);
                let Some(entry) = self.window.as_mut() else { return };

                let control = entry.with_mut(|fields| {
                    let mut ctx = FrameCtx {
                        window: fields.window,
                        gpu: fields.gpu,
                        textures,
                        time: fields.clock.tick(),
                        scene: fields.scene,
                    };
                    app.on_frame(&mut ctx)
                });

                if control == AppControl::Exit {
                    self.exit(event_loop);
                }
            }

            _ => {}
        }
    }
}
