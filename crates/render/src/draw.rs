use brushwork_core::BuiltMesh;

/// Binds the built buffers at vertex slot 0 and issues one indexed draw.
///
/// The pipeline must already be set and use [`crate::GpuVertex::layout`].
/// An empty mesh records nothing.
pub fn draw_built_mesh(render_pass: &mut wgpu::RenderPass<'_>, mesh: &BuiltMesh<wgpu::Buffer>) {
    let (Some(vertex_buffer), Some(index_buffer)) = (mesh.vertex_buffer(), mesh.index_buffer())
    else {
        return;
    };
    render_pass.set_vertex_buffer(0, vertex_buffer.slice(..));
    render_pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
    render_pass.draw_indexed(0..mesh.index_count(), 0, 0..1);
}
