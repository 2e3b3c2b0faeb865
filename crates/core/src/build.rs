use thiserror::Error;

use crate::mesh::Mesh;
use crate::settings::BuildSettings;
use crate::shape::{Shape, ShapeError};
use crate::tree::{NodeId, NodeKind, Tree, TreeError};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    #[error("brush '{name}' ({node}) failed to combine: {source}")]
    Combine {
        node: NodeId,
        name: String,
        #[source]
        source: ShapeError,
    },

    #[error("buffer allocation failed: {0}")]
    Allocation(String),

    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// Summary of one scene build.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildReport {
    pub nodes_visited: usize,
    pub nodes_rebuilt: usize,
    pub combines: usize,
    pub vertex_count: usize,
    pub index_count: usize,
    pub elapsed_ms: f32,
    pub error: Option<String>,
}

impl BuildReport {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Recomputes the dirty part of the subtree at `id` and folds `id` into its
/// parent.
///
/// Every child of a rebuilt node is visited, clean or not: a clean child
/// contributes its cached shape to the parent's fresh fold.
///
/// Recursion depth equals tree depth, so very deep brush chains are bounded
/// by the thread's stack size.
pub(crate) fn build_node<S: Shape>(
    tree: &mut Tree<S>,
    id: NodeId,
    settings: &BuildSettings,
    report: &mut BuildReport,
) -> Result<(), BuildError> {
    report.nodes_visited += 1;

    let node = tree.node(id).ok_or(TreeError::StaleNode(id))?;
    if node.is_invalidated() && node.is_visible() {
        report.nodes_rebuilt += 1;
        let children = node.children().to_vec();

        if node.is_brush() {
            tree.brush_mut(id)?.reset(settings.track_shape_invalidation);
        }
        for child in children {
            build_node(tree, child, settings, report)?;
        }
        tree.validate(id);
    }

    fold_into_parent(tree, id, report)
}

fn fold_into_parent<S: Shape>(
    tree: &mut Tree<S>,
    id: NodeId,
    report: &mut BuildReport,
) -> Result<(), BuildError> {
    let node = tree.node(id).ok_or(TreeError::StaleNode(id))?;
    let (Some(parent_id), NodeKind::Brush(child)) = (node.parent(), node.kind()) else {
        return Ok(());
    };
    let Some(parent) = tree.node(parent_id).and_then(|n| n.as_brush()) else {
        return Ok(());
    };

    report.combines += 1;
    let combined = parent
        .shape()
        .combine(child.operation(), child.shape())
        .map_err(|source| BuildError::Combine {
            node: id,
            name: node.name().to_string(),
            source,
        })?;
    tree.brush_mut(parent_id)?.set_shape(combined);
    Ok(())
}

/// Concatenates the shapes of the root's visible brush children.
pub(crate) fn assemble<S: Shape>(tree: &Tree<S>, settings: &BuildSettings) -> Mesh {
    let mut combined = Mesh::new();
    let Some(root) = tree.node(tree.root()) else {
        return combined;
    };

    for child in root.children() {
        let Some(node) = tree.node(*child) else {
            continue;
        };
        if !node.is_visible() {
            continue;
        }
        if let Some(brush) = node.as_brush() {
            let shape = brush.shape();
            combined.append_parts(shape.vertices(), shape.indices());
        }
    }

    if settings.compute_normals && !combined.is_empty() {
        combined.compute_normals();
    }
    combined
}
