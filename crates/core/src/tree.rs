//! Scene graph arena: node storage, parent/child links, and dirty propagation.

use std::fmt;

use glam::Vec3;
use thiserror::Error;

use crate::shape::{Operation, Shape};

/// Handle to a node slot in a [`Tree`].
///
/// A handle pairs the slot index with the slot's generation, so a handle to a
/// removed node never aliases a node later created in the same slot.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct NodeId(u32, u32);

impl NodeId {
    const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    const fn idx(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.0, self.1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("node {0} does not exist")]
    StaleNode(NodeId),

    #[error("node {0} already has a parent")]
    AlreadyAttached(NodeId),

    #[error("the root node cannot be attached as a child")]
    RootCannotBeChild,

    #[error("the root node cannot be removed")]
    RootCannotBeRemoved,

    #[error("attaching {child} under {parent} would create a cycle")]
    WouldCycle { parent: NodeId, child: NodeId },

    #[error("node {0} is not a brush")]
    NotABrush(NodeId),
}

/// A primitive shape paired with the operation that folds it into its parent.
#[derive(Debug, Clone)]
pub struct Brush<S> {
    base_shape: S,
    operation: Operation,
    shape: S,
}

impl<S: Shape> Brush<S> {
    pub fn new(base_shape: S, operation: Operation) -> Self {
        Self {
            shape: base_shape.clone(),
            base_shape,
            operation,
        }
    }

    pub fn base_shape(&self) -> &S {
        &self.base_shape
    }

    /// Working shape: the base shape with every child folded in, as of the
    /// last build that reached this brush.
    pub fn shape(&self) -> &S {
        &self.shape
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn position(&self) -> Vec3 {
        self.base_shape.position()
    }

    pub fn scale(&self) -> Vec3 {
        self.base_shape.scale()
    }

    pub(crate) fn reset(&mut self, validate_base: bool) {
        if validate_base {
            self.base_shape.validate();
        }
        self.shape = self.base_shape.clone();
    }

    pub(crate) fn set_shape(&mut self, shape: S) {
        self.shape = shape;
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind<S> {
    /// Grouping and visibility container; takes no part in composition.
    Group,
    Brush(Brush<S>),
}

#[derive(Debug, Clone)]
pub struct Node<S> {
    name: String,
    visible: bool,
    invalidated: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind<S>,
}

impl<S> Node<S> {
    fn new(name: String, kind: NodeKind<S>) -> Self {
        Self {
            name,
            visible: true,
            invalidated: false,
            parent: None,
            children: Vec::new(),
            kind,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_invalidated(&self) -> bool {
        self.invalidated
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in composition order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn kind(&self) -> &NodeKind<S> {
        &self.kind
    }

    pub fn as_brush(&self) -> Option<&Brush<S>> {
        match &self.kind {
            NodeKind::Brush(brush) => Some(brush),
            NodeKind::Group => None,
        }
    }

    pub fn is_brush(&self) -> bool {
        matches!(self.kind, NodeKind::Brush(_))
    }
}

/// Node arena rooted at a single group node.
///
/// Parents own their children through the arena; the `parent` link of a node
/// is a plain handle used for upward dirty propagation.
pub struct Tree<S> {
    nodes: Vec<Option<Node<S>>>,
    generations: Vec<u32>,
    free_list: Vec<usize>,
    root: NodeId,
    root_invalidated: bool,
    revision: u64,
}

impl<S> fmt::Debug for Tree<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.nodes.len();
        let alive = self.nodes.iter().filter(|n| n.is_some()).count();
        f.debug_struct("Tree")
            .field("nodes_total", &total)
            .field("nodes_alive", &alive)
            .field("free_list", &self.free_list.len())
            .field("root", &self.root)
            .field("revision", &self.revision)
            .finish_non_exhaustive()
    }
}

impl<S: Shape> Default for Tree<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Shape> Tree<S> {
    pub fn new() -> Self {
        Self {
            nodes: vec![Some(Node::new("Root".to_string(), NodeKind::Group))],
            generations: vec![1],
            free_list: Vec::new(),
            root: NodeId::new(0, 1),
            root_invalidated: false,
            revision: 0,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Count of invalidations applied so far.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node<S>> {
        if self.generations.get(id.idx()) != Some(&id.1) {
            return None;
        }
        self.nodes.get(id.idx()).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node<S>, TreeError> {
        if self.generations.get(id.idx()) != Some(&id.1) {
            return Err(TreeError::StaleNode(id));
        }
        self.nodes
            .get_mut(id.idx())
            .and_then(Option::as_mut)
            .ok_or(TreeError::StaleNode(id))
    }

    fn get(&self, id: NodeId) -> Result<&Node<S>, TreeError> {
        self.node(id).ok_or(TreeError::StaleNode(id))
    }

    pub fn brush(&self, id: NodeId) -> Result<&Brush<S>, TreeError> {
        self.get(id)?.as_brush().ok_or(TreeError::NotABrush(id))
    }

    pub(crate) fn brush_mut(&mut self, id: NodeId) -> Result<&mut Brush<S>, TreeError> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Brush(brush) => Ok(brush),
            NodeKind::Group => Err(TreeError::NotABrush(id)),
        }
    }

    /// Live nodes in slot order, detached ones included.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node<S>)> + '_ {
        self.nodes.iter().enumerate().filter_map(|(idx, slot)| {
            slot.as_ref()
                .map(|node| (NodeId::new(idx as u32, self.generations[idx]), node))
        })
    }

    pub fn create_group(&mut self, name: impl Into<String>) -> NodeId {
        self.insert(Node::new(name.into(), NodeKind::Group))
    }

    pub fn create_brush(
        &mut self,
        name: impl Into<String>,
        shape: S,
        operation: Operation,
    ) -> NodeId {
        self.insert(Node::new(
            name.into(),
            NodeKind::Brush(Brush::new(shape, operation)),
        ))
    }

    fn insert(&mut self, node: Node<S>) -> NodeId {
        if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].wrapping_add(1);
            self.generations[idx] = generation;
            self.nodes[idx] = Some(node);
            NodeId::new(idx as u32, generation)
        } else {
            self.nodes.push(Some(node));
            self.generations.push(1);
            NodeId::new((self.nodes.len() - 1) as u32, 1)
        }
    }

    /// Attach a detached node as the last child of `parent` and invalidate it.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        if child == self.root {
            return Err(TreeError::RootCannotBeChild);
        }
        self.get(parent)?;
        if self.get(child)?.parent.is_some() {
            return Err(TreeError::AlreadyAttached(child));
        }

        let mut cursor = Some(parent);
        while let Some(id) = cursor {
            if id == child {
                return Err(TreeError::WouldCycle { parent, child });
            }
            cursor = self.get(id)?.parent;
        }

        self.node_mut(parent)?.children.push(child);
        self.node_mut(child)?.parent = Some(parent);
        self.mark_invalidated(child);
        Ok(())
    }

    /// Detach `id` and its whole subtree, freeing their slots, then invalidate
    /// the former parent.
    pub fn remove(&mut self, id: NodeId) -> Result<(), TreeError> {
        if id == self.root {
            return Err(TreeError::RootCannotBeRemoved);
        }
        self.get(id)?;
        self.remove_subtree(id);
        Ok(())
    }

    // Recurses once per level of depth.
    fn remove_subtree(&mut self, id: NodeId) {
        let Ok(node) = self.node_mut(id) else {
            return;
        };
        let parent = node.parent.take();
        let children = node.children.clone();

        if let Some(parent) = parent {
            if let Ok(parent_node) = self.node_mut(parent) {
                parent_node.children.retain(|c| *c != id);
            }
        }
        for child in children {
            self.remove_subtree(child);
        }
        if let Some(parent) = parent {
            self.mark_invalidated(parent);
        }

        self.nodes[id.idx()] = None;
        self.free_list.push(id.idx());
    }

    pub fn invalidate(&mut self, id: NodeId) -> Result<(), TreeError> {
        self.get(id)?;
        self.mark_invalidated(id);
        Ok(())
    }

    // Walks upward until it meets an ancestor that is already dirty.
    fn mark_invalidated(&mut self, id: NodeId) {
        self.revision = self.revision.wrapping_add(1);
        let mut cursor = id;
        loop {
            let Ok(node) = self.node_mut(cursor) else {
                return;
            };
            node.invalidated = true;
            let parent = node.parent;
            if cursor == self.root {
                self.root_invalidated = true;
            }
            match parent.and_then(|p| self.node(p).map(|n| (p, n.invalidated))) {
                Some((p, false)) => cursor = p,
                _ => return,
            }
        }
    }

    pub(crate) fn validate(&mut self, id: NodeId) {
        if let Ok(node) = self.node_mut(id) {
            node.invalidated = false;
        }
    }

    /// Consumes the pending "root was invalidated" notice.
    pub(crate) fn take_root_invalidated(&mut self) -> bool {
        std::mem::take(&mut self.root_invalidated)
    }

    pub fn set_visible(&mut self, id: NodeId, visible: bool) -> Result<(), TreeError> {
        if self.get(id)?.visible == visible {
            return Ok(());
        }
        self.mark_invalidated(id);
        self.node_mut(id)?.visible = visible;
        Ok(())
    }

    pub fn set_position(&mut self, id: NodeId, position: Vec3) -> Result<(), TreeError> {
        let brush = self.brush_mut(id)?;
        if brush.base_shape.position() == position {
            return Ok(());
        }
        brush.base_shape.set_position(position);
        self.mark_invalidated(id);
        Ok(())
    }

    pub fn set_scale(&mut self, id: NodeId, scale: Vec3) -> Result<(), TreeError> {
        let brush = self.brush_mut(id)?;
        if brush.base_shape.scale() == scale {
            return Ok(());
        }
        brush.base_shape.set_scale(scale);
        self.mark_invalidated(id);
        Ok(())
    }

    pub fn set_operation(&mut self, id: NodeId, operation: Operation) -> Result<(), TreeError> {
        let brush = self.brush_mut(id)?;
        if brush.operation == operation {
            return Ok(());
        }
        brush.operation = operation;
        self.mark_invalidated(id);
        Ok(())
    }

    /// Direct access to a brush's base shape that bypasses invalidation.
    ///
    /// Changes made here reach the next build only through the shape's own
    /// dirty flag, when the scene tracks shape invalidation.
    pub fn base_shape_mut(&mut self, id: NodeId) -> Result<&mut S, TreeError> {
        Ok(&mut self.brush_mut(id)?.base_shape)
    }

    /// Invalidates every clean brush whose base shape reports a change.
    ///
    /// Dirty brushes are skipped: their change is already pending, and an
    /// invisible one keeps its shape flag until it is rebuilt.
    pub(crate) fn sync_shape_invalidation(&mut self) -> usize {
        let changed: Vec<NodeId> = self
            .iter()
            .filter(|(_, node)| {
                !node.invalidated
                    && node
                        .as_brush()
                        .map(|brush| brush.base_shape.is_invalidated())
                        .unwrap_or(false)
            })
            .map(|(id, _)| id)
            .collect();
        for id in &changed {
            self.mark_invalidated(*id);
        }
        changed.len()
    }
}
