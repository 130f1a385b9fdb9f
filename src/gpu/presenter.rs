use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::error::Result;

use super::{GpuContext, StateSurfaces, SHARED_WGSL};

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct PresentUniforms {
    pub grid_size: [f32; 2],
    pub target_size: [f32; 2],
}

/// Picks the target format for the presenter. Cell values are written as
/// they are, so a linear (non-sRGB) format is preferred; an sRGB target
/// would encode 0.5 as roughly 188/255 instead of 128.
pub fn preferred_target_format(formats: &[wgpu::TextureFormat]) -> Option<wgpu::TextureFormat> {
    formats
        .iter()
        .find(|f| !f.is_srgb())
        .or_else(|| formats.first())
        .copied()
}

/// Draws the current state texture over the whole target as opaque gray.
pub struct Presenter {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    bind_groups: [wgpu::BindGroup; 2],
}

impl Presenter {
    pub fn new(
        ctx: &GpuContext,
        surfaces: &StateSurfaces,
        target_format: wgpu::TextureFormat,
    ) -> Result<Self> {
        let device = &ctx.device;
        let shader_source = format!(
            "{}\n{}",
            SHARED_WGSL,
            include_str!("../../shaders/present.wgsl")
        );

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Present Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline = ctx.checked("present program", |device| {
            let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Present Shader"),
                source: wgpu::ShaderSource::Wgsl(shader_source.into()),
            });
            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Present Pipeline Layout"),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Present Pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: "vs_main",
                    buffers: &[],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: "fs_main",
                    targets: &[Some(wgpu::ColorTargetState {
                        format: target_format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState {
                    count: 1,
                    mask: !0,
                    alpha_to_coverage_enabled: false,
                },
                multiview: None,
                cache: None,
            })
        })?;

        let uniforms = PresentUniforms {
            grid_size: [surfaces.width() as f32, surfaces.height() as f32],
            target_size: [surfaces.width() as f32, surfaces.height() as f32],
        };
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Present Params"),
            contents: bytemuck::cast_slice(&[uniforms]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_groups = Self::create_bind_groups(ctx, &bind_group_layout, &uniform_buffer, surfaces);

        Ok(Self {
            pipeline,
            bind_group_layout,
            uniform_buffer,
            bind_groups,
        })
    }

    fn create_bind_groups(
        ctx: &GpuContext,
        layout: &wgpu::BindGroupLayout,
        uniform_buffer: &wgpu::Buffer,
        surfaces: &StateSurfaces,
    ) -> [wgpu::BindGroup; 2] {
        surfaces.views().map(|view| {
            ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Present Bind Group"),
                layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: uniform_buffer.as_entire_binding(),
                    },
                ],
            })
        })
    }

    pub fn attach(&mut self, ctx: &GpuContext, surfaces: &StateSurfaces) {
        self.bind_groups =
            Self::create_bind_groups(ctx, &self.bind_group_layout, &self.uniform_buffer, surfaces);
    }

    /// Records a draw of whichever surface is current right now.
    pub fn encode_present(
        &self,
        ctx: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        target_size: (u32, u32),
        surfaces: &StateSurfaces,
    ) {
        let uniforms = PresentUniforms {
            grid_size: [surfaces.width() as f32, surfaces.height() as f32],
            target_size: [target_size.0.max(1) as f32, target_size.1.max(1) as f32],
        };
        ctx.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));

        let bind_group = if surfaces.current_is_a() {
            &self.bind_groups[0]
        } else {
            &self.bind_groups[1]
        };

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Present Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, bind_group, &[]);
        render_pass.draw(0..3, 0..1); // Full-screen triangle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_linear_target_format() {
        let formats = [
            wgpu::TextureFormat::Bgra8UnormSrgb,
            wgpu::TextureFormat::Bgra8Unorm,
        ];
        assert_eq!(
            preferred_target_format(&formats),
            Some(wgpu::TextureFormat::Bgra8Unorm)
        );
    }

    #[test]
    fn falls_back_to_first_format() {
        let formats = [wgpu::TextureFormat::Rgba8UnormSrgb];
        assert_eq!(
            preferred_target_format(&formats),
            Some(wgpu::TextureFormat::Rgba8UnormSrgb)
        );
        assert_eq!(preferred_target_format(&[]), None);
    }
}
