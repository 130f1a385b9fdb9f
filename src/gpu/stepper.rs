use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::error::Result;
use crate::params::RuleParams;

use super::{GpuContext, StateSurfaces, SHARED_WGSL, STATE_FORMAT};

pub const WORKGROUP_SIZE: u32 = 16;

/// Uniform block of `step.wgsl` (`KernelParams`).
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct KernelUniforms {
    pub resolution: [f32; 2],
    pub time: f32,
    pub extent: i32,
    pub inner_radius: f32,
    pub outer_radius: f32,
    pub birth_lo: f32,
    pub birth_hi: f32,
    pub death_lo: f32,
    pub death_hi: f32,
    pub _pad: [f32; 2],
}

impl KernelUniforms {
    pub fn new(params: &RuleParams, width: u32, height: u32, time: f32) -> Self {
        Self {
            resolution: [width as f32, height as f32],
            time,
            extent: params.offset_extent(),
            inner_radius: params.inner_radius,
            outer_radius: params.outer_radius,
            birth_lo: params.birth_lo,
            birth_hi: params.birth_hi,
            death_lo: params.death_lo,
            death_hi: params.death_hi,
            _pad: [0.0; 2],
        }
    }
}

/// Compute pipeline evaluating the rule once per texel, plus one bind group
/// per direction (A -> B, B -> A).
pub struct GpuStepper {
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    bind_groups: [wgpu::BindGroup; 2],
    params: RuleParams,
    generation: u64,
}

impl GpuStepper {
    pub fn new(ctx: &GpuContext, surfaces: &StateSurfaces, params: &RuleParams) -> Result<Self> {
        params.validate()?;
        let device = &ctx.device;

        let shader_source = format!("{}\n{}", SHARED_WGSL, include_str!("../../shaders/step.wgsl"));

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Step Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: STATE_FORMAT,
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline = ctx.checked("step kernel", |device| {
            let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Step Shader"),
                source: wgpu::ShaderSource::Wgsl(shader_source.into()),
            });
            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Step Pipeline Layout"),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("Step Generation"),
                layout: Some(&pipeline_layout),
                module: &shader,
                entry_point: "step_generation",
                compilation_options: Default::default(),
                cache: None,
            })
        })?;

        let uniforms = KernelUniforms::new(params, surfaces.width(), surfaces.height(), 0.0);
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Kernel Params"),
            contents: bytemuck::cast_slice(&[uniforms]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_groups = Self::create_bind_groups(ctx, &bind_group_layout, &uniform_buffer, surfaces);

        Ok(Self {
            pipeline,
            bind_group_layout,
            uniform_buffer,
            bind_groups,
            params: *params,
            generation: 0,
        })
    }

    fn create_bind_groups(
        ctx: &GpuContext,
        layout: &wgpu::BindGroupLayout,
        uniform_buffer: &wgpu::Buffer,
        surfaces: &StateSurfaces,
    ) -> [wgpu::BindGroup; 2] {
        let [view_a, view_b] = surfaces.views();
        let make = |label, read: &wgpu::TextureView, write: &wgpu::TextureView| {
            ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(read),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(write),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: uniform_buffer.as_entire_binding(),
                    },
                ],
            })
        };
        [
            make("Step Bind Group AB", view_a, view_b),
            make("Step Bind Group BA", view_b, view_a),
        ]
    }

    /// Rebuilds the bind groups after the surfaces were reallocated.
    pub fn attach(&mut self, ctx: &GpuContext, surfaces: &StateSurfaces) {
        self.bind_groups =
            Self::create_bind_groups(ctx, &self.bind_group_layout, &self.uniform_buffer, surfaces);
        self.generation = 0;
    }

    pub fn params(&self) -> &RuleParams {
        &self.params
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Records one tick into `encoder` and swaps the surfaces. The write
    /// target becomes current, so a presenter encoded afterwards in the same
    /// submission shows generation N+1.
    pub fn encode_step(
        &mut self,
        ctx: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        surfaces: &mut StateSurfaces,
        elapsed: f32,
    ) {
        let uniforms = KernelUniforms::new(&self.params, surfaces.width(), surfaces.height(), elapsed);
        ctx.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));

        let bind_group = if surfaces.current_is_a() {
            &self.bind_groups[0]
        } else {
            &self.bind_groups[1]
        };
        let groups_x = surfaces.width().div_ceil(WORKGROUP_SIZE);
        let groups_y = surfaces.height().div_ceil(WORKGROUP_SIZE);
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Step Generation"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, bind_group, &[]);
            pass.dispatch_workgroups(groups_x, groups_y, 1);
        }

        surfaces.swap();
        self.generation += 1;
    }

    /// One tick in its own submission.
    pub fn step(&mut self, ctx: &GpuContext, surfaces: &mut StateSurfaces, elapsed: f32) {
        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("SmoothLife Step"),
            });
        self.encode_step(ctx, &mut encoder, surfaces, elapsed);
        ctx.queue.submit(std::iter::once(encoder.finish()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::RulePreset;

    #[test]
    fn uniforms_match_wgsl_layout() {
        assert_eq!(std::mem::size_of::<KernelUniforms>(), 48);
        let u = KernelUniforms::new(&RulePreset::Wide.params(), 640, 480, 2.5);
        assert_eq!(u.resolution, [640.0, 480.0]);
        assert_eq!(u.extent, 5);
        assert_eq!(u.time, 2.5);
    }
}
