use std::collections::HashMap;
use std::ops::Range;

use bytemuck::{Pod, Zeroable};

use crate::coords::Rect;
use crate::paint::Color;
use crate::render::RenderCtx;
use crate::texture::{GpuTextureId, UploadLayout};

use super::common::{
    premul_alpha_blend, primitive_state, InstanceBuffer, QuadBuffers, QuadVertex, ViewportUniform,
};

/// Textured quad pipeline for images, video frames and glyphs.
///
/// The pixel layout of each texture selects the shading mode per instance:
/// RGBA is premultiplied then tinted, luminance is drawn opaque grey times
/// the tint, and alpha textures are coverage masks filled with the tint.
#[derive(Default)]
pub struct TexturedRenderer {
    pipeline_format: Option<wgpu::TextureFormat>,
    pipeline: Option<wgpu::RenderPipeline>,
    viewport_layout: Option<wgpu::BindGroupLayout>,
    texture_layout: Option<wgpu::BindGroupLayout>,
    viewport_group: Option<wgpu::BindGroup>,
    viewport_ubo: Option<wgpu::Buffer>,
    sampler: Option<wgpu::Sampler>,
    quad: Option<QuadBuffers>,
    instances: Vec<TexturedInstance>,
    instance_vbo: InstanceBuffer,
    texture_groups: HashMap<GpuTextureId, wgpu::BindGroup>,
}

impl TexturedRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.instances.clear();
    }

    /// Queues a quad covering `dest` that samples `uv` (unit coordinates,
    /// top-left origin).
    pub fn push(&mut self, dest: Rect, uv: Rect, tint: Color, layout: UploadLayout) -> Option<u32> {
        if dest.is_empty() || !dest.is_finite() {
            return None;
        }
        let index = self.instances.len() as u32;
        self.instances.push(TexturedInstance {
            dst_min: dest.origin.to_array(),
            dst_max: dest.max().to_array(),
            uv_min: uv.origin.to_array(),
            uv_max: uv.max().to_array(),
            tint: tint.to_array(),
            mode: shading_mode(layout),
            _pad: [0; 3],
        });
        Some(index)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Creates GPU objects on first use, uploads queued instances and makes
    /// sure every texture in `textures` has a bind group.
    pub fn prepare(&mut self, ctx: &RenderCtx<'_>, textures: &[GpuTextureId]) {
        // Ids are never reused, so groups of released textures can go.
        self.texture_groups.retain(|id, _| ctx.uploader.lookup(*id).is_some());
        if self.instances.is_empty() {
            return;
        }
        self.ensure_pipeline(ctx);
        self.ensure_bindings(ctx);
        if self.quad.is_none() {
            self.quad = Some(QuadBuffers::new(ctx.device, "vistim textured"));
        }
        if let Some(ubo) = &self.viewport_ubo {
            ctx.queue.write_buffer(ubo, 0, bytemuck::bytes_of(&ViewportUniform::new(ctx.viewport)));
        }
        self.instance_vbo.write(ctx.device, ctx.queue, "vistim textured instance vbo", &self.instances);
        for &id in textures {
            self.ensure_texture_group(ctx, id);
        }
    }

    pub fn bind(&self, rpass: &mut wgpu::RenderPass<'_>) -> bool {
        let (Some(pipeline), Some(group), Some(quad), Some(instances)) = (
            self.pipeline.as_ref(),
            self.viewport_group.as_ref(),
            self.quad.as_ref(),
            self.instance_vbo.buffer(),
        ) else {
            return false;
        };
        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, group, &[]);
        rpass.set_vertex_buffer(0, quad.vbo.slice(..));
        rpass.set_vertex_buffer(1, instances.slice(..));
        rpass.set_index_buffer(quad.ibo.slice(..), wgpu::IndexFormat::Uint16);
        true
    }

    /// Draws `instances`, all sampling `texture`.
    pub fn draw(&self, rpass: &mut wgpu::RenderPass<'_>, texture: GpuTextureId, instances: Range<u32>) {
        let Some(group) = self.texture_groups.get(&texture) else {
            log::trace!("gpu texture #{} has no bind group; skipped", texture.get());
            return;
        };
        rpass.set_bind_group(1, group, &[]);
        rpass.draw_indexed(0..6, 0, instances);
    }

    fn ensure_texture_group(&mut self, ctx: &RenderCtx<'_>, id: GpuTextureId) {
        if self.texture_groups.contains_key(&id) {
            return;
        }
        let (Some(layout), Some(sampler)) = (self.texture_layout.as_ref(), self.sampler.as_ref()) else {
            return;
        };
        let Some(texture) = ctx.uploader.lookup(id) else { return };
        let group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("vistim texture bind group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });
        self.texture_groups.insert(id, group);
    }

    fn ensure_pipeline(&mut self, ctx: &RenderCtx<'_>) {
        if self.pipeline_format == Some(ctx.surface_format) && self.pipeline.is_some() {
            return;
        }

        let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("vistim textured shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/textured.wgsl").into()),
        });

        let viewport_layout = ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("vistim textured viewport bgl"),
            entries: &[ViewportUniform::layout_entry()],
        });

        let texture_layout = ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("vistim textured texture bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = ctx.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("vistim textured pipeline layout"),
            bind_group_layouts: &[&viewport_layout, &texture_layout],
            immediate_size: 0,
        });

        let pipeline = ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("vistim textured pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[QuadVertex::layout(), TexturedInstance::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: ctx.surface_format,
                    blend: Some(premul_alpha_blend()),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: primitive_state(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        self.pipeline_format = Some(ctx.surface_format);
        self.pipeline = Some(pipeline);
        self.viewport_layout = Some(viewport_layout);
        self.texture_layout = Some(texture_layout);
        self.viewport_group = None;
        self.viewport_ubo = None;
        self.texture_groups.clear();
    }

    fn ensure_bindings(&mut self, ctx: &RenderCtx<'_>) {
        if self.sampler.is_none() {
            self.sampler = Some(ctx.device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some("vistim textured sampler"),
                address_mode_u: wgpu::AddressMode::ClampToEdge,
                address_mode_v: wgpu::AddressMode::ClampToEdge,
                address_mode_w: wgpu::AddressMode::ClampToEdge,
                mag_filter: wgpu::FilterMode::Linear,
                min_filter: wgpu::FilterMode::Linear,
                mipmap_filter: wgpu::MipmapFilterMode::Linear,
                ..Default::default()
            }));
        }
        if self.viewport_group.is_some() && self.viewport_ubo.is_some() {
            return;
        }
        let Some(layout) = self.viewport_layout.as_ref() else { return };

        let viewport_ubo = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("vistim textured viewport ubo"),
            size: std::mem::size_of::<ViewportUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("vistim textured viewport bind group"),
            layout,
            entries: &[wgpu::BindGroupEntry { binding: 0, resource: viewport_ubo.as_entire_binding() }],
        });

        self.viewport_ubo = Some(viewport_ubo);
        self.viewport_group = Some(group);
    }
}

const MODE_RGBA: u32 = 0;
const MODE_LUMINANCE: u32 = 1;
const MODE_ALPHA: u32 = 2;

fn shading_mode(layout: UploadLayout) -> u32 {
    match layout {
        UploadLayout::Rgba => MODE_RGBA,
        UploadLayout::Luminance => MODE_LUMINANCE,
        UploadLayout::Alpha => MODE_ALPHA,
    }
}

/// Instance data layout (64 bytes):
///
///  offset  0  dst_min  [f32; 2]   loc 1
///  offset  8  dst_max  [f32; 2]   loc 2
///  offset 16  uv_min   [f32; 2]   loc 3
///  offset 24  uv_max   [f32; 2]   loc 4
///  offset 32  tint     [f32; 4]   loc 5
///  offset 48  mode     u32        loc 6
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct TexturedInstance {
    dst_min: [f32; 2],
    dst_max: [f32; 2],
    uv_min: [f32; 2],
    uv_max: [f32; 2],
    tint: [f32; 4],
    mode: u32,
    _pad: [u32; 3],
}

impl TexturedInstance {
    const ATTRS: [wgpu::VertexAttribute; 6] = wgpu::vertex_attr_array![
        1 => Float32x2, // dst_min
        2 => Float32x2, // dst_max
        3 => Float32x2, // uv_min
        4 => Float32x2, // uv_max
        5 => Float32x4, // tint
        6 => Uint32     // mode
    ];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<TexturedInstance>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paint::palette::basic;

    #[test]
    fn instance_is_64_bytes() {
        assert_eq!(std::mem::size_of::<TexturedInstance>(), 64);
    }

    #[test]
    fn layout_selects_mode() {
        let mut r = TexturedRenderer::new();
        let dest = Rect::new(0.0, 0.0, 10.0, 10.0);
        r.push(dest, Rect::UNIT, basic::WHITE, UploadLayout::Alpha);
        r.push(dest, Rect::UNIT, basic::WHITE, UploadLayout::Luminance);
        r.push(dest, Rect::new(0.25, 0.0, 0.5, 1.0), basic::WHITE, UploadLayout::Rgba);
        let modes: Vec<u32> = r.instances.iter().map(|i| i.mode).collect();
        assert_eq!(modes, vec![MODE_ALPHA, MODE_LUMINANCE, MODE_RGBA]);
        assert_eq!(r.instances[2].uv_min, [0.25, 0.0]);
        assert_eq!(r.instances[2].uv_max, [0.75, 1.0]);
        assert_eq!(r.instances[0].dst_max, [10.0, 10.0]);
    }

    #[test]
    fn empty_destination_is_dropped() {
        let mut r = TexturedRenderer::new();
        assert_eq!(r.push(Rect::default(), Rect::UNIT, basic::WHITE, UploadLayout::Rgba), None);
        assert!(r.is_empty());
    }
}
