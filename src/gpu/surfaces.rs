use crate::error::{Result, SmoothLifeError};
use crate::grid::{check_size, Grid};

use super::GpuContext;

/// Single float channel, written through a storage binding and read with
/// `textureLoad`, so no filtering support is needed.
pub const STATE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R32Float;

const BYTES_PER_CELL: u32 = std::mem::size_of::<f32>() as u32;

/// The two state textures. Exactly one is current; the other is the target
/// of the next tick. `swap` only flips the flag.
pub struct StateSurfaces {
    width: u32,
    height: u32,
    texture_a: wgpu::Texture,
    texture_b: wgpu::Texture,
    view_a: wgpu::TextureView,
    view_b: wgpu::TextureView,
    current_is_a: bool,
}

impl StateSurfaces {
    pub fn new(ctx: &GpuContext, width: u32, height: u32) -> Result<Self> {
        check_size(width, height)?;
        let max = ctx.max_surface_dimension();
        if width > max || height > max {
            return Err(SmoothLifeError::Allocation(format!(
                "resolution {width}x{height} exceeds the device limit of {max}"
            )));
        }

        let descriptor = wgpu::TextureDescriptor {
            label: Some("SmoothLife State"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: STATE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::STORAGE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        };

        let (texture_a, texture_b) = ctx.checked("state surfaces", |device| {
            let a = device.create_texture(&wgpu::TextureDescriptor {
                label: Some("SmoothLife State A"),
                ..descriptor
            });
            let b = device.create_texture(&wgpu::TextureDescriptor {
                label: Some("SmoothLife State B"),
                ..descriptor
            });
            (a, b)
        })?;
        let view_a = texture_a.create_view(&wgpu::TextureViewDescriptor::default());
        let view_b = texture_b.create_view(&wgpu::TextureViewDescriptor::default());

        log::debug!("Allocated state surfaces {}x{}", width, height);

        Ok(Self {
            width,
            height,
            texture_a,
            texture_b,
            view_a,
            view_b,
            current_is_a: true,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn current_is_a(&self) -> bool {
        self.current_is_a
    }

    pub fn current_view(&self) -> &wgpu::TextureView {
        if self.current_is_a {
            &self.view_a
        } else {
            &self.view_b
        }
    }

    pub fn current_texture(&self) -> &wgpu::Texture {
        if self.current_is_a {
            &self.texture_a
        } else {
            &self.texture_b
        }
    }

    /// (read, write) views for the next tick.
    pub(crate) fn views(&self) -> [&wgpu::TextureView; 2] {
        [&self.view_a, &self.view_b]
    }

    pub(crate) fn swap(&mut self) {
        self.current_is_a = !self.current_is_a;
    }

    /// Writes generation 0 into A, zero-fills B and makes A current.
    pub fn upload(&mut self, ctx: &GpuContext, grid: &Grid) -> Result<()> {
        if grid.width() != self.width || grid.height() != self.height {
            return Err(SmoothLifeError::GridMismatch {
                expected: self.width as usize * self.height as usize,
                actual: grid.cells().len(),
            });
        }
        self.write_texture(ctx, &self.texture_a, grid.cells());
        let zeros = vec![0.0f32; grid.cells().len()];
        self.write_texture(ctx, &self.texture_b, &zeros);
        self.current_is_a = true;
        Ok(())
    }

    fn write_texture(&self, ctx: &GpuContext, texture: &wgpu::Texture, cells: &[f32]) {
        ctx.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(cells),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(BYTES_PER_CELL * self.width),
                rows_per_image: Some(self.height),
            },
            self.extent(),
        );
    }

    fn extent(&self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: 1,
        }
    }

    /// Copies the current generation back to the host. Blocks until the GPU
    /// has finished every tick submitted so far.
    pub fn read_current(&self, ctx: &GpuContext) -> Result<Grid> {
        let unpadded_row = BYTES_PER_CELL * self.width;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_row = unpadded_row.div_ceil(align) * align;
        let size = padded_row as u64 * self.height as u64;

        let staging = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("State Readback"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Readback"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: self.current_texture(),
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &staging,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row),
                    rows_per_image: Some(self.height),
                },
            },
            self.extent(),
        );
        ctx.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (sender, receiver) = futures_intrusive::channel::shared::oneshot_channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        ctx.device.poll(wgpu::Maintain::Wait);
        pollster::block_on(receiver.receive())
            .ok_or_else(|| SmoothLifeError::Readback("map callback dropped".into()))?
            .map_err(|e| SmoothLifeError::Readback(e.to_string()))?;

        let data = slice.get_mapped_range();
        let mut cells = Vec::with_capacity(self.width as usize * self.height as usize);
        for row in data.chunks(padded_row as usize) {
            let row: &[f32] = bytemuck::cast_slice(&row[..unpadded_row as usize]);
            cells.extend_from_slice(row);
        }
        drop(data);
        staging.unmap();

        Grid::from_cells(self.width, self.height, cells)
    }
}
