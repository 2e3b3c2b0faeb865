use std::fmt;
use std::rc::Rc;

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::mesh::{Mesh, Vertex};

/// Boolean operation a brush applies when it is folded into its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Union,
    Subtract,
    Intersect,
}

impl Operation {
    pub fn name(self) -> &'static str {
        match self {
            Operation::Union => "Union",
            Operation::Subtract => "Subtract",
            Operation::Intersect => "Intersect",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Failure reported by the boolean-algebra engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShapeError {
    #[error("degenerate geometry: {0}")]
    Degenerate(String),

    #[error("boolean {operation} failed: {message}")]
    Kernel {
        operation: Operation,
        message: String,
    },
}

/// A solid the scene can compose.
///
/// `combine` is the only operation the build pipeline needs from the
/// geometry engine; the remaining accessors feed mesh assembly and the
/// brush property setters.
pub trait Shape: Clone {
    fn combine(&self, operation: Operation, other: &Self) -> Result<Self, ShapeError>;

    fn vertices(&self) -> &[Vertex];

    fn indices(&self) -> &[u32];

    fn position(&self) -> Vec3;

    fn set_position(&mut self, position: Vec3);

    fn scale(&self) -> Vec3;

    fn set_scale(&mut self, scale: Vec3);

    /// True when the shape changed since it was last marked valid.
    fn is_invalidated(&self) -> bool;

    fn validate(&mut self);
}

/// Opaque mesh boolean engine used by [`MeshShape`].
pub trait MeshBoolean {
    fn apply(&self, operation: Operation, lhs: &Mesh, rhs: &Mesh) -> Result<Mesh, ShapeError>;
}

/// A mesh placed by position and scale, combined through a [`MeshBoolean`].
///
/// The transformed mesh is cached; a combined shape holds the engine's result
/// with an identity placement.
#[derive(Clone)]
pub struct MeshShape {
    local: Rc<Mesh>,
    world: Rc<Mesh>,
    position: Vec3,
    scale: Vec3,
    invalidated: bool,
    kernel: Rc<dyn MeshBoolean>,
}

impl MeshShape {
    pub fn new(mesh: Mesh, kernel: Rc<dyn MeshBoolean>) -> Self {
        let local = Rc::new(mesh);
        Self {
            world: local.clone(),
            local,
            position: Vec3::ZERO,
            scale: Vec3::ONE,
            invalidated: false,
            kernel,
        }
    }

    pub fn with_placement(mut self, position: Vec3, scale: Vec3) -> Self {
        self.position = position;
        self.scale = scale;
        self.update_world();
        self
    }

    pub fn local_mesh(&self) -> &Mesh {
        &self.local
    }

    pub fn mesh(&self) -> &Mesh {
        &self.world
    }

    fn update_world(&mut self) {
        if self.position == Vec3::ZERO && self.scale == Vec3::ONE {
            self.world = self.local.clone();
            return;
        }
        let matrix =
            Mat4::from_scale_rotation_translation(self.scale, Quat::IDENTITY, self.position);
        let mut world = Mesh::clone(&self.local);
        world.transform(matrix);
        self.world = Rc::new(world);
    }
}

impl fmt::Debug for MeshShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeshShape")
            .field("vertices", &self.world.vertices.len())
            .field("indices", &self.world.indices.len())
            .field("position", &self.position)
            .field("scale", &self.scale)
            .field("invalidated", &self.invalidated)
            .finish_non_exhaustive()
    }
}

impl PartialEq for MeshShape {
    fn eq(&self, other: &Self) -> bool {
        self.position == other.position && self.scale == other.scale && self.world == other.world
    }
}

impl Shape for MeshShape {
    fn combine(&self, operation: Operation, other: &Self) -> Result<Self, ShapeError> {
        let mesh = self.kernel.apply(operation, &self.world, &other.world)?;
        Ok(MeshShape::new(mesh, self.kernel.clone()))
    }

    fn vertices(&self) -> &[Vertex] {
        &self.world.vertices
    }

    fn indices(&self) -> &[u32] {
        &self.world.indices
    }

    fn position(&self) -> Vec3 {
        self.position
    }

    fn set_position(&mut self, position: Vec3) {
        if self.position == position {
            return;
        }
        self.position = position;
        self.invalidated = true;
        self.update_world();
    }

    fn scale(&self) -> Vec3 {
        self.scale
    }

    fn set_scale(&mut self, scale: Vec3) {
        if self.scale == scale {
            return;
        }
        self.scale = scale;
        self.invalidated = true;
        self.update_world();
    }

    fn is_invalidated(&self) -> bool {
        self.invalidated
    }

    fn validate(&mut self) {
        self.invalidated = false;
    }
}
