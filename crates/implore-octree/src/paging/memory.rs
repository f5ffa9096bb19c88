//! In-memory backing store
//!
//! Builds the logical octree of a point set up front and serves page-ins
//! from a flat record table. Children of a node occupy 8 consecutive
//! records starting at the node's `children_offset`; the root is record 0,
//! so an offset of 0 can only ever mean "leaf".
//!
//! Leaf payloads are kd-partitioned at build time. Interior records carry
//! an evenly strided subsample of their subtree for level-of-detail
//! streaming.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::bounds::BoundingBox;
use crate::config::OctreeConfig;
use crate::error::{OctreeResult, PagingError, PagingResult};
use crate::node::Node;
use crate::octree::Octree;
use crate::paging::PagingBridge;
use crate::query::kd_partition;
use crate::types::Point;

/// A stored node payload
#[derive(Debug, Clone)]
struct NodeRecord {
    domain: BoundingBox,
    children_offset: u64,
    points: Vec<Point>,
}

impl NodeRecord {
    fn to_node(&self) -> Node {
        Node::new(self.domain, self.children_offset, self.points.clone())
    }
}

/// Paging bridge backed by a record table held in memory
#[derive(Debug)]
pub struct InMemoryStore {
    records: Vec<NodeRecord>,
    num_points: usize,
    page_ins: AtomicUsize,
    releases: AtomicUsize,
}

impl InMemoryStore {
    /// Build the record table for a point set
    pub fn build(points: Vec<Point>, config: &OctreeConfig) -> OctreeResult<Self> {
        config.validate()?;

        let num_points = points.len();
        let domain = root_domain(&points);
        let mut records = vec![NodeRecord {
            domain,
            children_offset: 0,
            points: Vec::new(),
        }];

        let mut pending = vec![(0usize, 0u32, points)];
        while let Some((index, depth, mut points)) = pending.pop() {
            if points.len() <= config.max_points_per_node || depth >= config.max_depth {
                kd_partition(&mut points);
                records[index].points = points;
                continue;
            }

            let parent = records[index].domain;
            let offset = records.len();

            let mut buckets: [Vec<Point>; 8] = Default::default();
            for point in &points {
                buckets[parent.octant_of(point.position)].push(*point);
            }

            records[index].children_offset = offset as u64;
            records[index].points = lod_sample(&points, config.lod_points_per_node);

            for (octant, bucket) in buckets.into_iter().enumerate() {
                records.push(NodeRecord {
                    domain: parent.octant(octant),
                    children_offset: 0,
                    points: Vec::new(),
                });
                pending.push((offset + octant, depth + 1, bucket));
            }
        }

        tracing::debug!(
            "Built in-memory octree: {} points in {} node records",
            num_points,
            records.len()
        );

        Ok(Self {
            records,
            num_points,
            page_ins: AtomicUsize::new(0),
            releases: AtomicUsize::new(0),
        })
    }

    /// Build a store and wrap it in an octree whose root is record 0
    pub fn build_octree(points: Vec<Point>, config: OctreeConfig) -> OctreeResult<Octree> {
        let store = Arc::new(Self::build(points, &config)?);
        let root = store.root_node();
        Ok(Octree::new(root, store, config))
    }

    /// A fresh, unmaterialized root node
    pub fn root_node(&self) -> Node {
        self.records[0].to_node()
    }

    /// Number of points in the dataset
    pub fn num_points(&self) -> usize {
        self.num_points
    }

    /// Number of node records in the logical tree
    pub fn num_records(&self) -> usize {
        self.records.len()
    }

    /// Number of successful page-ins served so far
    pub fn page_ins(&self) -> usize {
        self.page_ins.load(Ordering::Relaxed)
    }

    /// Number of release notifications received so far
    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::Relaxed)
    }
}

impl PagingBridge for InMemoryStore {
    fn subdivide(&self, node: &Node) -> PagingResult<[Node; 8]> {
        let offset = node.children_offset();
        if offset == 0 {
            return Err(PagingError::Corrupt {
                offset,
                message: "leaf nodes have no children".to_string(),
            });
        }

        let records = usize::try_from(offset)
            .ok()
            .and_then(|start| self.records.get(start..start.checked_add(8)?))
            .ok_or(PagingError::Unavailable { offset })?;

        let children: Vec<Node> = records.iter().map(NodeRecord::to_node).collect();
        let children: [Node; 8] = children.try_into().map_err(|_| PagingError::Corrupt {
            offset,
            message: "child block is not 8 records long".to_string(),
        })?;

        self.page_ins.fetch_add(1, Ordering::Relaxed);
        Ok(children)
    }

    fn release(&self, _node: &Node) {
        self.releases.fetch_add(1, Ordering::Relaxed);
    }
}

/// Cubic domain enclosing every point
fn root_domain(points: &[Point]) -> BoundingBox {
    if points.is_empty() {
        return BoundingBox::from_point([0.0; 3]);
    }
    let tight = BoundingBox::from_positions(points.iter().map(|p| p.position));
    let mut domain = tight.cubed();
    // Rounding in cubed() can shave the tight corners
    domain.expand_to_include(tight.min);
    domain.expand_to_include(tight.max);
    domain
}

/// Evenly strided subsample of at most `target` points
fn lod_sample(points: &[Point], target: usize) -> Vec<Point> {
    if target == 0 || points.is_empty() {
        return Vec::new();
    }
    let stride = points.len().div_ceil(target);
    points.iter().step_by(stride).copied().collect()
}
