//! Paging bridge between the octree and its backing storage
//!
//! The octree never reads node payloads itself. When a traversal reaches
//! an interior node whose children are not resident, it asks the bridge
//! to `subdivide` the node and installs the returned block. When the last
//! pin on a node is dropped, the bridge is told the node may be evicted.

pub mod memory;

pub use memory::InMemoryStore;

use crate::error::PagingResult;
use crate::node::Node;

/// Source of node payloads
///
/// Implementations must be safe to call from several traversals at once.
/// The octree guarantees that a given node is subdivided by at most one
/// traversal at a time.
pub trait PagingBridge: Send + Sync {
    /// Load the 8 children of an interior node, indexed by octant code.
    ///
    /// Each child's domain must be the matching octant of the parent's
    /// domain. Failure aborts the traversal that requested the page-in.
    fn subdivide(&self, node: &Node) -> PagingResult<[Node; 8]>;

    /// The last pin on `node` was dropped; its children may be evicted.
    fn release(&self, _node: &Node) {}
}
