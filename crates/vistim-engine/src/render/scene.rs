use std::collections::HashSet;
use std::ops::Range;

use crate::coords::Rect;
use crate::device::SampledTexture;
use crate::paint::Color;
use crate::scene::{DrawCmd, DrawList};
use crate::texture::{GpuTextureId, TextureRef};

use super::shapes::rect::RectRenderer;
use super::shapes::textured::TexturedRenderer;
use super::shapes::logical_clip_to_scissor;
use super::{RenderCtx, RenderTarget};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum BatchKind {
    Solid,
    Textured(GpuTextureId),
}

/// Run of consecutive instances drawn with one pipeline, texture and clip.
#[derive(Debug, Clone, PartialEq)]
struct Batch {
    kind: BatchKind,
    clip: Option<Rect>,
    instances: Range<u32>,
}

fn extend_batches(batches: &mut Vec<Batch>, kind: BatchKind, clip: Option<Rect>, index: u32) {
    if let Some(last) = batches.last_mut() {
        if last.kind == kind && last.clip == clip && last.instances.end == index {
            last.instances.end += 1;
            return;
        }
    }
    batches.push(Batch { kind, clip, instances: index..index + 1 });
}

/// Draws a whole [`DrawList`] in paint order.
///
/// Textured commands bind their entity first, which creates or refreshes
/// the GPU texture. Entities without pixel data yet (a video before its
/// first frame, a destroyed entity behind a stale reference) are skipped
/// for the frame.
#[derive(Default)]
pub struct SceneRenderer {
    rects: RectRenderer,
    textured: TexturedRenderer,
    batches: Vec<Batch>,
    used_textures: Vec<GpuTextureId>,
    failed: HashSet<String>,
}

impl SceneRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the frame. `clear` fills the target first; `None` draws over
    /// its current contents.
    pub fn render(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        draw_list: &mut DrawList,
        clear: Option<Color>,
    ) {
        self.rects.clear();
        self.textured.clear();
        self.batches.clear();
        self.used_textures.clear();

        for item in draw_list.iter_in_paint_order() {
            match &item.cmd {
                DrawCmd::Rect(cmd) => {
                    if let Some(i) = self.rects.push(cmd.rect, cmd.color) {
                        extend_batches(&mut self.batches, BatchKind::Solid, item.clip_rect, i);
                    }
                }
                DrawCmd::Image(cmd) => {
                    let Some((id, texture)) = self.resolve(ctx, &cmd.texture) else { continue };
                    let (dest, uv) = cmd.resolve(texture.size);
                    if let Some(i) = self.textured.push(dest, uv, cmd.tint, texture.layout) {
                        extend_batches(&mut self.batches, BatchKind::Textured(id), item.clip_rect, i);
                    }
                }
                DrawCmd::Text(cmd) => {
                    let Some((id, texture)) = self.resolve(ctx, &cmd.font) else { continue };
                    for quad in &cmd.quads {
                        let uv = Rect::from_min_max(quad.uv_min.into(), quad.uv_max.into());
                        if let Some(i) = self.textured.push(quad.rect, uv, cmd.color, texture.layout) {
                            extend_batches(&mut self.batches, BatchKind::Textured(id), item.clip_rect, i);
                        }
                    }
                }
            }
        }

        self.rects.prepare(ctx);
        self.textured.prepare(ctx, &self.used_textures);

        let load = match clear {
            Some(c) => wgpu::LoadOp::Clear(c.to_wgpu()),
            None => wgpu::LoadOp::Load,
        };
        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("vistim scene pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                ops: wgpu::Operations { load, store: wgpu::StoreOp::Store },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        let mut bound: Option<bool> = None; // Some(true) = textured pipeline
        for batch in &self.batches {
            let Some((x, y, w, h)) = logical_clip_to_scissor(batch.clip, ctx.viewport, ctx.scale_factor)
            else {
                continue;
            };
            let textured = matches!(batch.kind, BatchKind::Textured(_));
            if bound != Some(textured) {
                let ok = if textured { self.textured.bind(&mut rpass) } else { self.rects.bind(&mut rpass) };
                if !ok {
                    continue;
                }
                bound = Some(textured);
            }
            rpass.set_scissor_rect(x, y, w, h);
            match batch.kind {
                BatchKind::Solid => self.rects.draw(&mut rpass, batch.instances.clone()),
                BatchKind::Textured(id) => self.textured.draw(&mut rpass, id, batch.instances.clone()),
            }
        }
    }

    /// Binds `texture` and returns its GPU id and view, or `None` if it
    /// cannot be drawn this frame.
    fn resolve(&mut self, ctx: &RenderCtx<'_>, texture: &TextureRef) -> Option<(GpuTextureId, SampledTexture)> {
        let id = match texture.bind(ctx.uploader) {
            Ok(Some(id)) => id,
            Ok(None) => return None,
            Err(e) => {
                if self.failed.insert(texture.key().as_str().to_owned()) {
                    log::warn!("cannot upload `{}`: {e}", texture.key());
                }
                return None;
            }
        };
        let sampled = ctx.uploader.lookup(id)?;
        if !self.used_textures.contains(&id) {
            self.used_textures.push(id);
        }
        Some((id, sampled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u32) -> GpuTextureId {
        GpuTextureId::new(raw).unwrap()
    }

    #[test]
    fn consecutive_instances_merge() {
        let mut batches = Vec::new();
        extend_batches(&mut batches, BatchKind::Solid, None, 0);
        extend_batches(&mut batches, BatchKind::Solid, None, 1);
        extend_batches(&mut batches, BatchKind::Textured(id(1)), None, 0);
        extend_batches(&mut batches, BatchKind::Textured(id(1)), None, 1);
        assert_eq!(
            batches,
            vec![
                Batch { kind: BatchKind::Solid, clip: None, instances: 0..2 },
                Batch { kind: BatchKind::Textured(id(1)), clip: None, instances: 0..2 },
            ]
        );
    }

    #[test]
    fn texture_or_clip_change_splits() {
        let clip = Some(Rect::new(0.0, 0.0, 5.0, 5.0));
        let mut batches = Vec::new();
        extend_batches(&mut batches, BatchKind::Textured(id(1)), None, 0);
        extend_batches(&mut batches, BatchKind::Textured(id(2)), None, 1);
        extend_batches(&mut batches, BatchKind::Textured(id(2)), clip, 2);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[2].instances, 2..3);
    }

    #[test]
    fn interleaved_pipelines_keep_paint_order() {
        let mut batches = Vec::new();
        extend_batches(&mut batches, BatchKind::Solid, None, 0);
        extend_batches(&mut batches, BatchKind::Textured(id(1)), None, 0);
        extend_batches(&mut batches, BatchKind::Solid, None, 1);
        let kinds: Vec<_> = batches.iter().map(|b| b.kind).collect();
        assert_eq!(kinds, vec![BatchKind::Solid, BatchKind::Textured(id(1)), BatchKind::Solid]);
    }
}
