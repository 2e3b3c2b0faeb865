use brushwork_core::Vertex;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub color: [f32; 4],
}

pub const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
    0 => Float32x3,
    1 => Float32x3,
    2 => Float32x2,
    3 => Float32x4
];

impl GpuVertex {
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<GpuVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &VERTEX_ATTRIBUTES,
        }
    }
}

impl From<&Vertex> for GpuVertex {
    fn from(vertex: &Vertex) -> Self {
        Self {
            position: vertex.position,
            normal: vertex.normal,
            uv: vertex.uv,
            color: vertex.color,
        }
    }
}

pub(crate) fn to_gpu_vertices(vertices: &[Vertex]) -> Vec<GpuVertex> {
    vertices.iter().map(GpuVertex::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpu_vertex_matches_core_vertex_size() {
        assert_eq!(
            std::mem::size_of::<GpuVertex>() as u64,
            Vertex::SIZE_IN_BYTES
        );
        assert_eq!(GpuVertex::layout().array_stride, Vertex::SIZE_IN_BYTES);
    }

    #[test]
    fn attribute_offsets_follow_field_order() {
        let offsets: Vec<u64> = VERTEX_ATTRIBUTES.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 12, 24, 32]);
        let locations: Vec<u32> = VERTEX_ATTRIBUTES
            .iter()
            .map(|a| a.shader_location)
            .collect();
        assert_eq!(locations, vec![0, 1, 2, 3]);
    }

    #[test]
    fn conversion_keeps_every_attribute() {
        let vertex = Vertex::new([1.0, 2.0, 3.0], [0.0, 0.0, 1.0]).with_uv([0.25, 0.75]);
        let gpu = GpuVertex::from(&vertex);
        assert_eq!(gpu.position, [1.0, 2.0, 3.0]);
        assert_eq!(gpu.normal, [0.0, 0.0, 1.0]);
        assert_eq!(gpu.uv, [0.25, 0.75]);
        assert_eq!(gpu.color, [1.0; 4]);

        let bytes: &[u8] = bytemuck::cast_slice(std::slice::from_ref(&gpu));
        assert_eq!(bytes.len(), 48);
    }
}
