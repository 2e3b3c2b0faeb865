#[cfg(target_arch = "wasm32")]
use web_time::Instant;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

use crate::build::{assemble, build_node, BuildError, BuildReport};
use crate::built::{BufferAllocator, BuiltMesh};
use crate::settings::BuildSettings;
use crate::shape::Shape;
use crate::tree::{NodeId, Tree};

struct CachedBuild<B> {
    mesh: BuiltMesh<B>,
    revision: u64,
    failed: bool,
}

/// Owns the brush tree and lazily maintains its drawable mesh.
pub struct Scene<S: Shape, A: BufferAllocator> {
    tree: Tree<S>,
    allocator: A,
    settings: BuildSettings,
    cache: Option<CachedBuild<A::Buffer>>,
    last_report: Option<BuildReport>,
}

impl<S: Shape, A: BufferAllocator> std::fmt::Debug for Scene<S, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("tree", &self.tree)
            .field("settings", &self.settings)
            .field("cached", &self.cache.is_some())
            .field("last_report", &self.last_report)
            .finish_non_exhaustive()
    }
}

impl<S: Shape, A: BufferAllocator> Scene<S, A> {
    pub fn new(allocator: A) -> Self {
        Self::with_settings(allocator, BuildSettings::default())
    }

    pub fn with_settings(allocator: A, settings: BuildSettings) -> Self {
        Self {
            tree: Tree::new(),
            allocator,
            settings,
            cache: None,
            last_report: None,
        }
    }

    pub fn root(&self) -> NodeId {
        self.tree.root()
    }

    pub fn tree(&self) -> &Tree<S> {
        &self.tree
    }

    /// Mutable access for edits; the cache catches up on the next read.
    pub fn tree_mut(&mut self) -> &mut Tree<S> {
        &mut self.tree
    }

    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    pub fn settings(&self) -> &BuildSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: BuildSettings) {
        if settings == self.settings {
            return;
        }
        self.settings = settings;
        self.invalidate();
    }

    pub fn last_report(&self) -> Option<&BuildReport> {
        self.last_report.as_ref()
    }

    pub fn is_cached(&self) -> bool {
        self.cache.is_some()
    }

    /// The drawable mesh, rebuilt if anything changed since the last build.
    pub fn built_scene(&mut self) -> &BuiltMesh<A::Buffer> {
        self.sync_with_tree();
        let cached = match self.cache.take() {
            Some(cached) => cached,
            None => self.rebuild(),
        };
        &self.cache.insert(cached).mesh
    }

    /// Drops and disposes the cached mesh, if any.
    pub fn invalidate(&mut self) {
        if let Some(cached) = self.cache.take() {
            tracing::trace!(
                indices = cached.mesh.index_count(),
                "disposing cached scene mesh"
            );
            cached.mesh.dispose(&mut self.allocator);
        }
    }

    /// Forces a rebuild and replaces the cache.
    pub fn build(&mut self) -> &BuiltMesh<A::Buffer> {
        self.invalidate();
        let cached = self.rebuild();
        &self.cache.insert(cached).mesh
    }

    fn sync_with_tree(&mut self) {
        if self.settings.track_shape_invalidation {
            self.sync_shape_changes();
        }
        let root_invalidated = self.tree.take_root_invalidated();
        let retry = self
            .cache
            .as_ref()
            .map(|cached| cached.failed && cached.revision != self.tree.revision())
            .unwrap_or(false);
        if root_invalidated || retry {
            self.invalidate();
        }
    }

    fn rebuild(&mut self) -> CachedBuild<A::Buffer> {
        let _span = tracing::debug_span!("scene_build").entered();
        let start = Instant::now();

        if self.settings.track_shape_invalidation {
            self.sync_shape_changes();
        }

        let mut report = BuildReport::default();
        let result = self.try_build(&mut report);

        // Invalidations raised while building are reflected by this build.
        self.tree.take_root_invalidated();
        report.elapsed_ms = start.elapsed().as_secs_f32() * 1000.0;

        let (mesh, failed) = match result {
            Ok(mesh) => {
                tracing::debug!(
                    visited = report.nodes_visited,
                    rebuilt = report.nodes_rebuilt,
                    combines = report.combines,
                    vertices = report.vertex_count,
                    indices = report.index_count,
                    elapsed_ms = report.elapsed_ms,
                    "scene built"
                );
                (mesh, false)
            }
            Err(err) => {
                tracing::error!("scene build failed: {err}");
                report.error = Some(err.to_string());
                (BuiltMesh::Empty, true)
            }
        };

        self.last_report = Some(report);
        CachedBuild {
            mesh,
            revision: self.tree.revision(),
            failed,
        }
    }

    fn sync_shape_changes(&mut self) {
        let changed = self.tree.sync_shape_invalidation();
        if changed > 0 {
            tracing::debug!(changed, "brushes invalidated by shape changes");
        }
    }

    fn try_build(
        &mut self,
        report: &mut BuildReport,
    ) -> Result<BuiltMesh<A::Buffer>, BuildError> {
        let root = self.tree.root();
        build_node(&mut self.tree, root, &self.settings, report)?;

        let mesh = assemble(&self.tree, &self.settings);
        report.vertex_count = mesh.vertices.len();
        report.index_count = mesh.indices.len();
        BuiltMesh::upload(&mut self.allocator, &mesh, &self.settings)
    }
}

impl<S: Shape, A: BufferAllocator> Drop for Scene<S, A> {
    fn drop(&mut self) {
        self.invalidate();
    }
}
