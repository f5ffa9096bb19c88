//! The octree facade
//!
//! `Octree` ties a root node to its paging bridge and configuration and
//! exposes the operations external callers use: traversals, range
//! queries, selection and eviction.

use std::cmp::Ordering;
use std::ops::ControlFlow;
use std::sync::Arc;

use crate::config::OctreeConfig;
use crate::error::{validation, OctreeResult};
use crate::node::Node;
use crate::paging::PagingBridge;
use crate::query::process_points_directed;
use crate::selection::{self, Interactor};
use crate::traversal::{self, TraversalMode, Visit};
use crate::types::{Color, Point};

/// Residency statistics of an octree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OctreeStats {
    /// Resident nodes, including the root
    pub resident_nodes: usize,
    /// Resident leaves
    pub resident_leaves: usize,
    /// Points held by resident leaves
    pub resident_points: usize,
    /// Currently selected points
    pub selected_points: usize,
}

/// An out-of-core octree over a point cloud
pub struct Octree {
    root: Node,
    bridge: Arc<dyn PagingBridge>,
    config: OctreeConfig,
}

impl Octree {
    pub fn new(root: Node, bridge: Arc<dyn PagingBridge>, config: OctreeConfig) -> Self {
        Self {
            root,
            bridge,
            config,
        }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn config(&self) -> &OctreeConfig {
        &self.config
    }

    pub fn bridge(&self) -> &dyn PagingBridge {
        self.bridge.as_ref()
    }

    /// Run a whole-tree walk with a single visitor
    pub fn traverse<F>(&self, mode: TraversalMode, mut visitor: F) -> OctreeResult<()>
    where
        F: FnMut(Visit<'_>),
    {
        traversal::traverse(&self.root, mode, self.bridge(), &mut visitor)
    }

    /// Visit every node before its children
    pub fn process_nodes_prefix<F>(&self, mut functor: F) -> OctreeResult<()>
    where
        F: FnMut(&Node, u32),
    {
        traversal::process_nodes_prefix(&self.root, 0, self.bridge(), &mut functor)
    }

    /// Visit every node after its children
    pub fn process_nodes_postfix<F>(&self, mut functor: F) -> OctreeResult<()>
    where
        F: FnMut(&Node, u32),
    {
        traversal::process_nodes_postfix(&self.root, 0, self.bridge(), &mut functor)
    }

    /// Stream every point of the dataset
    pub fn process_points<F>(&self, mut functor: F) -> OctreeResult<()>
    where
        F: FnMut(&Point),
    {
        traversal::process_points(&self.root, 0, self.bridge(), &mut functor)
    }

    /// Stream points at a level of detail, cutting the tree at `max_level`
    pub fn process_points_lod<F>(&self, max_level: u32, mut functor: F) -> OctreeResult<()>
    where
        F: FnMut(&Point),
    {
        traversal::process_points_lod(&self.root, 0, max_level, self.bridge(), &mut functor)
    }

    /// Stream every point, processing the root's subtrees in parallel
    #[cfg(feature = "parallel")]
    pub fn par_process_points<F>(&self, functor: F) -> OctreeResult<()>
    where
        F: Fn(&Point) + Sync + Send,
    {
        use rayon::prelude::*;

        let bridge = self.bridge();
        let _pin = self.root.pin(bridge);
        if self.root.is_leaf() {
            return traversal::process_points(&self.root, 0, bridge, &mut |p| functor(p));
        }

        let children = self.root.materialize_children(bridge, 0)?;
        children.as_slice().par_iter().try_for_each(|child| {
            traversal::process_points(child, 1, bridge, &mut |p| functor(p))
        })
    }

    /// Visit every point strictly within `radius` of `query`
    pub fn range_query<F>(&self, query: [f32; 3], radius: f32, mut functor: F) -> OctreeResult<()>
    where
        F: FnMut(&Point, f32),
    {
        self.range_query_until(query, radius, |point, dist_sq| {
            functor(point, dist_sq);
            ControlFlow::Continue(())
        })?;
        Ok(())
    }

    /// Like `range_query`, but the visitor may stop the query early
    pub fn range_query_until<F>(
        &self,
        query: [f32; 3],
        radius: f32,
        mut visitor: F,
    ) -> OctreeResult<ControlFlow<()>>
    where
        F: FnMut(&Point, f32) -> ControlFlow<()>,
    {
        validation::validate_point(query)?;
        let radius_sq = validation::validate_radius(radius)?;
        process_points_directed(
            &self.root,
            0,
            query,
            radius_sq,
            self.config.ordered_children,
            self.bridge(),
            &mut visitor,
        )
    }

    /// The `k` points nearest to `query` within `radius`, nearest first
    pub fn nearest_within(
        &self,
        query: [f32; 3],
        radius: f32,
        k: usize,
    ) -> OctreeResult<Vec<(Point, f32)>> {
        let mut found: Vec<(Point, f32)> = Vec::new();
        if k == 0 {
            return Ok(found);
        }
        self.range_query(query, radius, |point, dist_sq| found.push((*point, dist_sq)))?;
        found.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
        found.truncate(k);
        Ok(found)
    }

    /// Select every resident point inside the sphere.
    /// Returns the number of points that became selected.
    pub fn select(&self, center: [f32; 3], radius: f32) -> OctreeResult<usize> {
        let interactor = Interactor::new(center, radius);
        interactor.validate()?;
        Ok(selection::select_resident(&self.root, &interactor, self.bridge()))
    }

    /// Deselect every resident point inside the sphere.
    /// Returns the number of points that became unselected.
    pub fn deselect(&self, center: [f32; 3], radius: f32) -> OctreeResult<usize> {
        let interactor = Interactor::new(center, radius);
        interactor.validate()?;
        Ok(selection::deselect_resident(&self.root, &interactor, self.bridge()))
    }

    /// Deselect everything, returning the number of points deselected
    pub fn clear_selection(&self) -> usize {
        selection::clear_resident(&self.root, self.bridge())
    }

    /// Hand every selected point to `functor` with its pre-selection color
    pub fn for_each_selected_point<F>(&self, mut functor: F)
    where
        F: FnMut([f32; 3], Color),
    {
        selection::process_selected_points(&self.root, self.bridge(), &mut functor)
    }

    /// Evict every evictable child block of nodes at `level` or deeper.
    /// Returns the number of blocks dropped.
    pub fn evict_below(&self, level: u32) -> usize {
        evict_below(&self.root, 0, level)
    }

    /// Residency statistics, computed without paging anything in
    pub fn stats(&self) -> OctreeStats {
        let mut stats = OctreeStats::default();
        traversal::process_resident_nodes(&self.root, 0, self.bridge(), &mut |node, _| {
            stats.resident_nodes += 1;
            if node.is_leaf() {
                let buffer = node.points();
                stats.resident_leaves += 1;
                stats.resident_points += buffer.len();
                stats.selected_points += buffer.selection().map_or(0, |s| s.count());
            }
        });
        stats
    }
}

fn evict_below(node: &Node, level: u32, min_level: u32) -> usize {
    // Deepest blocks first so emptied parents become evictable
    let evicted_below = match node.resident_children() {
        Some(children) => children
            .iter()
            .map(|child| evict_below(child, level + 1, min_level))
            .sum(),
        None => 0,
    };

    if level >= min_level && node.try_evict_children() {
        evicted_below + 1
    } else {
        evicted_below
    }
}
