use brushwork_core::{BufferAllocator, Vertex};
use thiserror::Error;

use crate::vertex::to_gpu_vertices;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocError {
    #[error("buffer '{label}' would be empty")]
    EmptyBuffer { label: String },

    #[error("buffer '{label}' needs {size} bytes, device limit is {max}")]
    TooLarge { label: String, size: u64, max: u64 },
}

/// Rejects sizes the device cannot back with a single buffer.
pub(crate) fn check_size(label: &str, size: u64, max: u64) -> Result<(), AllocError> {
    if size == 0 {
        return Err(AllocError::EmptyBuffer {
            label: label.to_string(),
        });
    }
    if size > max {
        return Err(AllocError::TooLarge {
            label: label.to_string(),
            size,
            max,
        });
    }
    Ok(())
}

/// [`BufferAllocator`] backed by a wgpu device and its queue.
pub struct WgpuAllocator {
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl WgpuAllocator {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self { device, queue }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    fn create(
        &self,
        label: &str,
        size: u64,
        usage: wgpu::BufferUsages,
    ) -> Result<wgpu::Buffer, AllocError> {
        check_size(label, size, self.device.limits().max_buffer_size)?;
        Ok(self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage,
            mapped_at_creation: false,
        }))
    }
}

impl BufferAllocator for WgpuAllocator {
    type Buffer = wgpu::Buffer;
    type Error = AllocError;

    fn create_vertex_buffer(
        &mut self,
        label: &str,
        byte_size: u64,
    ) -> Result<wgpu::Buffer, AllocError> {
        self.create(
            label,
            byte_size,
            wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        )
    }

    fn create_index_buffer(
        &mut self,
        label: &str,
        byte_size: u64,
    ) -> Result<wgpu::Buffer, AllocError> {
        self.create(
            label,
            byte_size,
            wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
        )
    }

    fn upload_vertices(&mut self, buffer: &wgpu::Buffer, offset: u64, data: &[Vertex]) {
        let vertices = to_gpu_vertices(data);
        self.queue.write_buffer(buffer, offset, bytemuck::cast_slice(&vertices));
    }

    fn upload_indices(&mut self, buffer: &wgpu::Buffer, offset: u64, data: &[u32]) {
        self.queue.write_buffer(buffer, offset, bytemuck::cast_slice(data));
    }

    fn dispose(&mut self, buffer: wgpu::Buffer) {
        tracing::trace!(size = buffer.size(), "destroying buffer");
        buffer.destroy();
    }

    fn wait_idle(&mut self) {
        // Flush pending writes so the poll covers them too.
        self.queue.submit(std::iter::empty());
        let _ = self.device.poll(wgpu::Maintain::Wait);
    }
}
