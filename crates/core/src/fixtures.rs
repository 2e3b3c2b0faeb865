//! Deterministic stand-ins for the geometry engine and the GPU allocator.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

use thiserror::Error;

use crate::built::BufferAllocator;
use crate::mesh::{Mesh, Vertex};
use crate::shape::{MeshBoolean, MeshShape, Operation, ShapeError};

/// One triangle whose vertices carry `tag` in the red color channel.
pub(crate) fn tagged_triangle(tag: f32) -> Mesh {
    let mut mesh = Mesh::from_positions(
        &[[tag, 0.0, 0.0], [tag + 1.0, 0.0, 0.0], [tag, 1.0, 0.0]],
        vec![0, 1, 2],
    );
    for v in &mut mesh.vertices {
        v.normal = [0.0, 0.0, 1.0];
        v.color = [tag, 0.0, 0.0, 1.0];
    }
    mesh
}

pub(crate) fn tagged_shape(kernel: &Rc<RecordingKernel>, tag: f32) -> MeshShape {
    MeshShape::new(tagged_triangle(tag), kernel.clone())
}

fn tag_of(mesh: &Mesh) -> f32 {
    mesh.vertices.first().map(|v| v.color[0]).unwrap_or(f32::NAN)
}

fn flipped(mesh: &Mesh) -> Mesh {
    let mut out = mesh.clone();
    for tri in out.indices.chunks_exact_mut(3) {
        tri.swap(1, 2);
    }
    for v in &mut out.vertices {
        v.normal = [-v.normal[0], -v.normal[1], -v.normal[2]];
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct CombineCall {
    pub(crate) operation: Operation,
    pub(crate) lhs_tag: f32,
    pub(crate) rhs_tag: f32,
}

/// Boolean engine that concatenates instead of clipping and logs each call.
///
/// Union appends `rhs`, Subtract appends `rhs` with reversed winding, and
/// Intersect appends `rhs` with halved alpha, so results stay order dependent.
#[derive(Debug, Default)]
pub(crate) struct RecordingKernel {
    calls: RefCell<Vec<CombineCall>>,
    fail_on_rhs: Cell<Option<f32>>,
}

impl RecordingKernel {
    pub(crate) fn shared() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub(crate) fn fail_on_rhs(&self, tag: f32) {
        self.fail_on_rhs.set(Some(tag));
    }

    pub(crate) fn stop_failing(&self) {
        self.fail_on_rhs.set(None);
    }

    pub(crate) fn calls(&self) -> Vec<CombineCall> {
        self.calls.borrow().clone()
    }

    pub(crate) fn combine_count(&self) -> usize {
        self.calls.borrow().len()
    }

    pub(crate) fn clear(&self) {
        self.calls.borrow_mut().clear();
    }
}

impl MeshBoolean for RecordingKernel {
    fn apply(&self, operation: Operation, lhs: &Mesh, rhs: &Mesh) -> Result<Mesh, ShapeError> {
        let rhs_tag = tag_of(rhs);
        self.calls.borrow_mut().push(CombineCall {
            operation,
            lhs_tag: tag_of(lhs),
            rhs_tag,
        });
        if self.fail_on_rhs.get() == Some(rhs_tag) {
            return Err(ShapeError::Degenerate(format!("rhs tagged {rhs_tag}")));
        }

        let mut out = lhs.clone();
        match operation {
            Operation::Union => out.append(rhs),
            Operation::Subtract => out.append(&flipped(rhs)),
            Operation::Intersect => {
                let mut faded = rhs.clone();
                for v in &mut faded.vertices {
                    v.color[3] *= 0.5;
                }
                out.append(&faded);
            }
        }
        Ok(out)
    }
}

#[derive(Debug, PartialEq, Eq, Hash)]
pub(crate) struct TestBuffer(u32);

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AllocEvent {
    CreateVertex { id: u32, size: u64 },
    CreateIndex { id: u32, size: u64 },
    UploadVertices { id: u32, count: usize },
    UploadIndices { id: u32, count: usize },
    Dispose { id: u32 },
    WaitIdle,
}

#[derive(Debug, Error)]
#[error("out of device memory")]
pub(crate) struct OutOfMemory;

#[derive(Debug, Default)]
pub(crate) struct RecordingAllocator {
    pub(crate) events: Vec<AllocEvent>,
    pub(crate) uploaded_vertices: Vec<Vertex>,
    pub(crate) uploaded_indices: Vec<u32>,
    pub(crate) fail_index_buffers: bool,
    next_id: u32,
    live: Rc<RefCell<HashSet<u32>>>,
}

impl RecordingAllocator {
    pub(crate) fn failing_index_buffers() -> Self {
        Self {
            fail_index_buffers: true,
            ..Self::default()
        }
    }

    pub(crate) fn live_buffers(&self) -> usize {
        self.live.borrow().len()
    }

    /// Shared view of the live buffer ids that outlives the allocator.
    pub(crate) fn live_set(&self) -> Rc<RefCell<HashSet<u32>>> {
        self.live.clone()
    }

    fn allocate(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.live.borrow_mut().insert(id);
        id
    }
}

impl BufferAllocator for RecordingAllocator {
    type Buffer = TestBuffer;
    type Error = OutOfMemory;

    fn create_vertex_buffer(
        &mut self,
        _label: &str,
        byte_size: u64,
    ) -> Result<TestBuffer, OutOfMemory> {
        let id = self.allocate();
        self.events.push(AllocEvent::CreateVertex { id, size: byte_size });
        Ok(TestBuffer(id))
    }

    fn create_index_buffer(
        &mut self,
        _label: &str,
        byte_size: u64,
    ) -> Result<TestBuffer, OutOfMemory> {
        if self.fail_index_buffers {
            return Err(OutOfMemory);
        }
        let id = self.allocate();
        self.events.push(AllocEvent::CreateIndex { id, size: byte_size });
        Ok(TestBuffer(id))
    }

    fn upload_vertices(&mut self, buffer: &TestBuffer, _offset: u64, data: &[Vertex]) {
        self.events.push(AllocEvent::UploadVertices {
            id: buffer.0,
            count: data.len(),
        });
        self.uploaded_vertices = data.to_vec();
    }

    fn upload_indices(&mut self, buffer: &TestBuffer, _offset: u64, data: &[u32]) {
        self.events.push(AllocEvent::UploadIndices {
            id: buffer.0,
            count: data.len(),
        });
        self.uploaded_indices = data.to_vec();
    }

    fn dispose(&mut self, buffer: TestBuffer) {
        self.live.borrow_mut().remove(&buffer.0);
        self.events.push(AllocEvent::Dispose { id: buffer.0 });
    }

    fn wait_idle(&mut self) {
        self.events.push(AllocEvent::WaitIdle);
    }
}
