use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{Key, NamedKey};

use vistim_engine::coords::{Rect, Vec2};
use vistim_engine::core::{App, AppControl, FrameCtx};
use vistim_engine::device::GpuInit;
use vistim_engine::logging::{init_logging, LoggingConfig};
use vistim_engine::paint::{palette, Color};
use vistim_engine::scene::shapes::ImageCmd;
use vistim_engine::scene::{DrawList, ZIndex};
use vistim_engine::texture::{ImageOptions, TextureHandle, TextureManager};
use vistim_engine::video::{VideoCommand, VideoFeed, VideoOptions, VideoState};
use vistim_engine::window::{Runtime, RuntimeConfig};

/// Draws a frame of stimuli: a color grid, an image, a video and a caption.
#[derive(Parser, Debug)]
#[command(name = "vistim-demo", about = "vistim stimulus display demo")]
struct Args {
    /// Still image drawn in the top left corner.
    #[arg(short, long, value_name = "FILE")]
    image: Option<PathBuf>,

    /// TrueType/OpenType font used for the caption.
    #[arg(short, long, value_name = "FILE")]
    font: Option<PathBuf>,

    /// Video source: `test`, `file:PATH`, `tcp:HOST:PORT`, `udp:PORT`
    /// or `custom:DESCRIPTION`.
    #[arg(short, long, default_value = "test")]
    video: String,

    /// Background color, by palette name (e.g. `aluminium6`, `plum_dark`).
    #[arg(short, long, default_value = "black")]
    background: String,

    #[arg(long)]
    fullscreen: bool,
}

fn parse_feed(spec: &str) -> Result<VideoFeed> {
    let (kind, rest) = spec.split_once(':').unwrap_or((spec, ""));
    let feed = match kind {
        "test" => VideoFeed::Test,
        "file" => VideoFeed::File(PathBuf::from(rest)),
        "tcp" => {
            let (host, port) = rest.rsplit_once(':').context("expected tcp:HOST:PORT")?;
            VideoFeed::tcp(host, port.parse().context("invalid TCP port")?)
        }
        "udp" => VideoFeed::Udp { port: rest.parse().context("invalid UDP port")? },
        "custom" => VideoFeed::Custom(rest.to_string()),
        other => bail!("unknown video source `{other}`"),
    };
    feed.validate()?;
    Ok(feed)
}

struct Demo {
    args: Args,
    feed: VideoFeed,
    background: Color,
    textures: Option<TextureManager>,
    image: Option<TextureHandle>,
    font: Option<TextureHandle>,
    video: Option<TextureHandle>,
    draw_list: DrawList,
}

impl Demo {
    fn toggle_pause(&self) {
        let (Some(textures), Some(video)) = (&self.textures, &self.video) else {
            return;
        };
        let command = match textures.video_state(video) {
            Some(VideoState::Playing) => VideoCommand::Pause,
            _ => VideoCommand::Play,
        };
        if let Err(e) = textures.exec(video, command) {
            log::warn!("{command:?} failed: {e}");
        }
    }

    fn rewind(&self) {
        if let (Some(textures), Some(video)) = (&self.textures, &self.video) {
            if let Err(e) = textures.exec(video, VideoCommand::seek_ms(0)) {
                log::warn!("rewind failed: {e}");
                return;
            }
            // A clip that reached its end has stopped; start it again.
            if textures.video_state(video) == Some(VideoState::Stopped) {
                if let Err(e) = textures.exec(video, VideoCommand::Play) {
                    log::warn!("restart failed: {e}");
                }
            }
        }
    }
}

impl App for Demo {
    fn on_start(&mut self, textures: &TextureManager) -> Result<()> {
        if let Some(path) = &self.args.image {
            match textures.load_image(path, ImageOptions::default()) {
                Ok(h) => self.image = Some(h),
                Err(e) => log::error!("{e}"),
            }
        }
        if let Some(path) = &self.args.font {
            self.font = Some(textures.load_font_file(path)?);
        }
        self.video = Some(textures.create_video(&self.feed, VideoOptions::autostart())?);
        self.textures = Some(textures.clone());
        Ok(())
    }

    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        let WindowEvent::KeyboardInput { event, .. } = event else {
            return AppControl::Continue;
        };
        if event.state != ElementState::Pressed || event.repeat {
            return AppControl::Continue;
        }
        match &event.logical_key {
            Key::Named(NamedKey::Escape) => return AppControl::Exit,
            Key::Named(NamedKey::Space) => self.toggle_pause(),
            Key::Character(c) if c.as_str() == "r" => self.rewind(),
            _ => {}
        }
        AppControl::Continue
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        let bounds = ctx.viewport().bounds();
        let list = &mut self.draw_list;
        list.clear();

        // Color grid along the bottom edge.
        let cell = bounds.size.x / palette::tango::ALL.len() as f32;
        for (i, color) in palette::tango::ALL.iter().enumerate() {
            let rect = Rect::new(i as f32 * cell, bounds.size.y - cell, cell, cell);
            list.push_solid_rect(ZIndex::BACKGROUND, rect, *color);
        }

        if let Some(video) = &self.video {
            let dest = Rect::centered(bounds.center(), bounds.size * 0.6);
            list.push_rect_outline(ZIndex::new(0), dest, 2.0, palette::basic::YELLOW);
            list.push_image_cmd(
                ZIndex::new(1),
                ImageCmd::new(video, dest).keep_aspect(),
            );
        }

        if let Some(image) = &self.image {
            list.push_image_cmd(
                ZIndex::new(2),
                ImageCmd::new(image, Rect::new(16.0, 16.0, 160.0, 160.0)).keep_aspect(),
            );
        }

        if let Some(font) = &self.font {
            let caption = format!(
                "frame {}  late {}  [space] pause  [r] rewind  [esc] quit",
                ctx.time.frame_index, ctx.time.late_frames
            );
            list.push_text(
                ZIndex::OVERLAY,
                font,
                &caption,
                18.0,
                palette::basic::WHITE,
                Vec2::new(16.0, bounds.size.y - cell - 28.0),
            );
        }

        ctx.render(self.background, list)
    }

    fn on_exit(&mut self) {
        if let (Some(textures), Some(video)) = (&self.textures, &self.video) {
            let _ = textures.exec(video, VideoCommand::Stop);
        }
        self.video = None;
        self.image = None;
        self.font = None;
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());
    let args = Args::parse();

    let feed = parse_feed(&args.video)?;
    let background = palette::by_name(&args.background)
        .with_context(|| format!("unknown palette color `{}`", args.background))?;

    let config = RuntimeConfig {
        title: "vistim demo".to_string(),
        fullscreen: args.fullscreen,
        hide_cursor: args.fullscreen,
        ..RuntimeConfig::default()
    };
    let demo = Demo {
        args,
        feed,
        background,
        textures: None,
        image: None,
        font: None,
        video: None,
        draw_list: DrawList::new(),
    };
    Runtime::run(config, GpuInit::default(), TextureManager::new(), demo)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_feed_strings() {
        assert_eq!(parse_feed("test").unwrap(), VideoFeed::Test);
        assert_eq!(parse_feed("tcp:localhost:5000").unwrap(), VideoFeed::tcp("localhost", 5000));
        assert_eq!(parse_feed("udp:5004").unwrap(), VideoFeed::Udp { port: 5004 });
        assert_eq!(parse_feed("file:clip.gif").unwrap(), VideoFeed::File("clip.gif".into()));
    }

    #[test]
    fn rejects_bad_feeds() {
        assert!(parse_feed("tcp:nohost").is_err());
        assert!(parse_feed("udp:x").is_err());
        assert!(parse_feed("v4l2").is_err());
        assert!(parse_feed("file:").is_err());
    }
}
