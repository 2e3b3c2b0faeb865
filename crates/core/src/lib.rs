mod build;
mod built;
#[cfg(test)]
mod fixtures;
mod mesh;
mod scene;
mod settings;
mod shape;
mod tree;

pub use build::{BuildError, BuildReport};
pub use built::{BufferAllocator, BuiltMesh, GpuMesh};
pub use mesh::{make_box, make_uv_sphere, Aabb, Mesh, Vertex};
pub use scene::Scene;
pub use settings::{BuildSettings, DEFAULT_INDEX_BUFFER_LABEL, DEFAULT_VERTEX_BUFFER_LABEL};
pub use shape::{MeshBoolean, MeshShape, Operation, Shape, ShapeError};
pub use tree::{Brush, Node, NodeId, NodeKind, Tree, TreeError};
