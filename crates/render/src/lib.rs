mod allocator;
mod draw;
mod vertex;

pub use allocator::{AllocError, WgpuAllocator};
pub use draw::draw_built_mesh;
pub use vertex::{GpuVertex, VERTEX_ATTRIBUTES};

/// A scene whose built mesh lives in wgpu buffers.
pub type GpuScene<S> = brushwork_core::Scene<S, WgpuAllocator>;
