//! Octree nodes, the unit of paging
//!
//! A node owns a fixed domain and, depending on residency, an optional
//! block of 8 children and a point buffer. The logical shape of the tree
//! never changes; only which child blocks are resident does.
//!
//! # Pinning
//!
//! Every traversal pins a node for the whole duration of its subtree
//! visit through a `PinGuard`. A non-zero pin count forbids eviction of
//! the node's children. Pins are advisory: they do not serialize access
//! to the node, the locks below do.
//!
//! Subdivision of a node is single-writer: the child block is installed
//! under its write lock after re-checking that no other traversal
//! installed it first.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, TryLockError};

use crate::bounds::BoundingBox;
use crate::error::{OctreeError, OctreeResult};
use crate::paging::PagingBridge;
use crate::selection::SelectionState;
use crate::types::Point;

/// An owned block of 8 children, indexed by octant code
pub type ChildBlock = Box<[Node; 8]>;

/// Reentrant pin count of a node
#[derive(Debug, Default)]
pub struct PinCount(AtomicU32);

impl PinCount {
    /// Current number of pins
    pub fn get(&self) -> u32 {
        self.0.load(Ordering::Acquire)
    }

    fn acquire(&self) {
        self.0.fetch_add(1, Ordering::AcqRel);
    }

    /// Drop one pin, returning the number of pins left
    fn release(&self) -> u32 {
        let previous = self.0.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "pin count underflow");
        previous.saturating_sub(1)
    }
}

/// Keeps a node pinned until dropped
pub struct PinGuard<'a> {
    node: &'a Node,
    bridge: &'a dyn PagingBridge,
}

impl Drop for PinGuard<'_> {
    fn drop(&mut self) {
        if self.node.pins.release() == 0 {
            self.bridge.release(self.node);
        }
    }
}

/// A node's point records and their selection state
#[derive(Debug, Default)]
pub struct PointBuffer {
    pub(crate) points: Vec<Point>,
    pub(crate) selection: Option<SelectionState>,
}

impl PointBuffer {
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Selection state, `None` when no point is selected
    pub fn selection(&self) -> Option<&SelectionState> {
        self.selection.as_ref()
    }
}

/// Read access to a resident child block
pub struct ResidentChildren<'a>(RwLockReadGuard<'a, Option<ChildBlock>>);

impl ResidentChildren<'_> {
    /// Children as a slice, empty if the block is not resident
    pub fn as_slice(&self) -> &[Node] {
        match self.0.as_deref() {
            Some(block) => block,
            None => &[],
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.as_slice().iter()
    }

    /// Child with the given octant code
    pub fn get(&self, octant: usize) -> Option<&Node> {
        self.as_slice().get(octant)
    }
}

/// A node of the octree
#[derive(Debug)]
pub struct Node {
    domain: BoundingBox,
    children_offset: u64,
    pins: PinCount,
    version: AtomicU64,
    children: RwLock<Option<ChildBlock>>,
    buffer: RwLock<PointBuffer>,
}

impl Node {
    /// Create a node. A zero `children_offset` marks a permanent leaf.
    pub fn new(domain: BoundingBox, children_offset: u64, points: Vec<Point>) -> Self {
        Self {
            domain,
            children_offset,
            pins: PinCount::default(),
            version: AtomicU64::new(0),
            children: RwLock::new(None),
            buffer: RwLock::new(PointBuffer {
                points,
                selection: None,
            }),
        }
    }

    /// Create a permanent leaf
    pub fn leaf(domain: BoundingBox, points: Vec<Point>) -> Self {
        Self::new(domain, 0, points)
    }

    pub fn domain(&self) -> &BoundingBox {
        &self.domain
    }

    pub fn children_offset(&self) -> u64 {
        self.children_offset
    }

    /// Whether this node is a leaf of the logical tree
    pub fn is_leaf(&self) -> bool {
        self.children_offset == 0
    }

    pub fn pin_count(&self) -> u32 {
        self.pins.get()
    }

    pub fn is_pinned(&self) -> bool {
        self.pins.get() > 0
    }

    /// Pin the node; `bridge.release` is called when the last pin drops,
    /// whichever guard that is
    pub fn pin<'a>(&'a self, bridge: &'a dyn PagingBridge) -> PinGuard<'a> {
        self.pins.acquire();
        PinGuard { node: self, bridge }
    }

    /// Version of the point buffer content, bumped on every recolor
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    pub(crate) fn bump_version(&self) -> u64 {
        self.version.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Number of resident point records
    pub fn num_points(&self) -> usize {
        self.points().len()
    }

    /// Number of currently selected points
    pub fn num_selected(&self) -> usize {
        self.points().selection().map_or(0, SelectionState::count)
    }

    /// Whether the selection mask is allocated
    pub fn has_selection(&self) -> bool {
        self.points().selection().is_some()
    }

    /// Read access to the point buffer
    pub fn points(&self) -> RwLockReadGuard<'_, PointBuffer> {
        self.buffer.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn points_mut(&self) -> RwLockWriteGuard<'_, PointBuffer> {
        self.buffer.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether the child block is in memory
    pub fn has_resident_children(&self) -> bool {
        self.read_children().is_some()
    }

    /// Resident children, without paging anything in
    pub fn resident_children(&self) -> Option<ResidentChildren<'_>> {
        let children = self.read_children();
        if children.is_some() {
            Some(ResidentChildren(children))
        } else {
            None
        }
    }

    /// Resident children, paging them in through `bridge` if needed.
    /// The caller must hold a pin on this node.
    pub fn materialize_children(
        &self,
        bridge: &dyn PagingBridge,
        level: u32,
    ) -> OctreeResult<ResidentChildren<'_>> {
        debug_assert!(self.is_pinned(), "materializing an unpinned node");

        if let Some(children) = self.resident_children() {
            return Ok(children);
        }

        {
            let mut children = self.children.write().unwrap_or_else(PoisonError::into_inner);
            if children.is_none() {
                tracing::debug!(
                    "Subdividing node at offset {} (level {})",
                    self.children_offset,
                    level
                );
                let block = bridge.subdivide(self).map_err(|e| {
                    tracing::warn!(
                        "Paging failed at offset {} (level {}): {}",
                        self.children_offset,
                        level,
                        e
                    );
                    e
                })?;
                *children = Some(Box::new(block));
            }
        }

        self.resident_children().ok_or_else(|| {
            OctreeError::Invariant(format!(
                "children of pinned node at offset {} evicted during traversal",
                self.children_offset
            ))
        })
    }

    /// Install a child block directly, replacing nothing.
    /// Returns false if a block is already resident.
    pub fn install_children(&self, block: [Node; 8]) -> bool {
        let mut children = self.children.write().unwrap_or_else(PoisonError::into_inner);
        if children.is_some() {
            return false;
        }
        *children = Some(Box::new(block));
        true
    }

    /// Drop the resident child block if nothing is using it.
    ///
    /// Refuses when this node or a resident descendant is pinned, when a
    /// resident descendant carries a selection, or when a traversal holds
    /// the block. Returns whether the block was dropped.
    pub fn try_evict_children(&self) -> bool {
        let mut children = match self.children.try_write() {
            Ok(children) => children,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                tracing::debug!("Eviction refused at offset {}: in use", self.children_offset);
                return false;
            }
        };

        let Some(block) = children.as_deref() else {
            return false;
        };

        if self.is_pinned() || block.iter().any(Node::subtree_busy) {
            tracing::debug!(
                "Eviction refused at offset {}: pinned or selected",
                self.children_offset
            );
            return false;
        }

        *children = None;
        tracing::debug!("Evicted children of node at offset {}", self.children_offset);
        true
    }

    fn subtree_busy(&self) -> bool {
        if self.is_pinned() || self.has_selection() {
            return true;
        }
        match self.resident_children() {
            Some(children) => children.iter().any(Node::subtree_busy),
            None => false,
        }
    }

    fn read_children(&self) -> RwLockReadGuard<'_, Option<ChildBlock>> {
        self.children.read().unwrap_or_else(PoisonError::into_inner)
    }
}
