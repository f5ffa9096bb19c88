//! implore-octree - Out-of-core spatial index for large point clouds
//!
//! This crate provides the octree behind implore's point cloud views of
//! datasets far larger than memory. Node payloads are paged in on demand
//! through a `PagingBridge` and can be evicted again once no traversal
//! uses them.
//!
//! # Key Components
//!
//! - **Node**: the unit of paging, with a fixed domain, an optional block
//!   of 8 children and a point buffer
//! - **Traversal**: prefix/postfix node walks and leaf point streaming,
//!   optionally cut at a level of detail
//! - **Query**: radius-bounded searches that prune by node domain and
//!   walk kd-ordered leaf buffers
//! - **Selection**: lazily allocated per-node selection masks with
//!   recolor feedback and exact color restore
//! - **Paging**: the bridge contract plus an in-memory store
//!
//! # Concurrency
//!
//! Several traversals may run against one tree from different threads.
//! Each node is pinned for the duration of its subtree visit, and pinned
//! nodes are never evicted. Readers of point buffers can watch
//! `Node::version` to detect recolors.

pub mod bounds;
pub mod config;
pub mod error;
pub mod node;
pub mod octree;
pub mod paging;
pub mod query;
pub mod selection;
pub mod traversal;
pub mod types;

pub use bounds::BoundingBox;
pub use config::OctreeConfig;
pub use error::{OctreeError, OctreeResult, PagingError, PagingResult};
pub use node::{ChildBlock, Node, PinGuard, PointBuffer, ResidentChildren};
pub use octree::{Octree, OctreeStats};
pub use paging::{InMemoryStore, PagingBridge};
pub use query::{is_kd_partitioned, kd_partition};
pub use selection::{Interactor, SelectionState};
pub use traversal::{TraversalMode, Visit};
pub use types::*;
