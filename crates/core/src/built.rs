use crate::build::BuildError;
use crate::mesh::{Mesh, Vertex};
use crate::settings::BuildSettings;

/// GPU buffer services the scene needs to publish a built mesh.
pub trait BufferAllocator {
    type Buffer;
    type Error: std::error::Error;

    fn create_vertex_buffer(
        &mut self,
        label: &str,
        byte_size: u64,
    ) -> Result<Self::Buffer, Self::Error>;

    fn create_index_buffer(
        &mut self,
        label: &str,
        byte_size: u64,
    ) -> Result<Self::Buffer, Self::Error>;

    fn upload_vertices(&mut self, buffer: &Self::Buffer, offset: u64, data: &[Vertex]);

    fn upload_indices(&mut self, buffer: &Self::Buffer, offset: u64, data: &[u32]);

    fn dispose(&mut self, buffer: Self::Buffer);

    /// Blocks until the device has finished all submitted work.
    fn wait_idle(&mut self);
}

#[derive(Debug)]
pub struct GpuMesh<B> {
    vertex_buffer: B,
    index_buffer: B,
    vertex_count: u32,
    index_count: u32,
}

/// Drawable result of a scene build.
///
/// Owns its buffers until [`BuiltMesh::dispose`] hands them back to the
/// allocator that created them.
#[derive(Debug)]
pub enum BuiltMesh<B> {
    Empty,
    Mesh(GpuMesh<B>),
}

impl<B> BuiltMesh<B> {
    /// Uploads `mesh`; a mesh without indices yields [`BuiltMesh::Empty`]
    /// and allocates nothing.
    pub fn upload<A>(
        allocator: &mut A,
        mesh: &Mesh,
        settings: &BuildSettings,
    ) -> Result<Self, BuildError>
    where
        A: BufferAllocator<Buffer = B>,
    {
        if mesh.indices.is_empty() {
            return Ok(BuiltMesh::Empty);
        }

        let vertex_bytes = mesh.vertices.len() as u64 * Vertex::SIZE_IN_BYTES;
        let index_bytes = mesh.indices.len() as u64 * std::mem::size_of::<u32>() as u64;

        let vertex_buffer = allocator
            .create_vertex_buffer(&settings.vertex_buffer_label, vertex_bytes)
            .map_err(|err| BuildError::Allocation(err.to_string()))?;
        let index_buffer =
            match allocator.create_index_buffer(&settings.index_buffer_label, index_bytes) {
                Ok(buffer) => buffer,
                Err(err) => {
                    allocator.dispose(vertex_buffer);
                    return Err(BuildError::Allocation(err.to_string()));
                }
            };

        allocator.upload_vertices(&vertex_buffer, 0, &mesh.vertices);
        allocator.upload_indices(&index_buffer, 0, &mesh.indices);

        Ok(BuiltMesh::Mesh(GpuMesh {
            vertex_buffer,
            index_buffer,
            vertex_count: mesh.vertices.len() as u32,
            index_count: mesh.indices.len() as u32,
        }))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, BuiltMesh::Empty)
    }

    pub fn index_count(&self) -> u32 {
        match self {
            BuiltMesh::Empty => 0,
            BuiltMesh::Mesh(mesh) => mesh.index_count,
        }
    }

    pub fn vertex_count(&self) -> u32 {
        match self {
            BuiltMesh::Empty => 0,
            BuiltMesh::Mesh(mesh) => mesh.vertex_count,
        }
    }

    pub fn vertex_buffer(&self) -> Option<&B> {
        match self {
            BuiltMesh::Empty => None,
            BuiltMesh::Mesh(mesh) => Some(&mesh.vertex_buffer),
        }
    }

    pub fn index_buffer(&self) -> Option<&B> {
        match self {
            BuiltMesh::Empty => None,
            BuiltMesh::Mesh(mesh) => Some(&mesh.index_buffer),
        }
    }

    /// Waits for in-flight GPU work, then releases both buffers.
    pub fn dispose<A>(self, allocator: &mut A)
    where
        A: BufferAllocator<Buffer = B>,
    {
        if let BuiltMesh::Mesh(mesh) = self {
            allocator.wait_idle();
            allocator.dispose(mesh.vertex_buffer);
            allocator.dispose(mesh.index_buffer);
        }
    }
}
