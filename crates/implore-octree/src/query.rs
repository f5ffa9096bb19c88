//! Directed range queries
//!
//! Visits every point strictly within a radius of a query point, pruning
//! subtrees whose domain cannot reach the query sphere.
//!
//! # Leaf buffers
//!
//! Leaf point buffers are stored as implicit balanced kd-trees: for every
//! subrange `[left, right]` at depth `d`, the element at
//! `(left + right) / 2` is the median along axis `d % 3`, with smaller or
//! equal elements before it and greater or equal elements after it.
//! `kd_partition` establishes that order.
//!
//! # Child order
//!
//! Children of an interior node are enumerated as `i ^ q`, where `q` is
//! the octant containing the query point, so the query's own octant comes
//! first and the others follow by flipping one, two, then three axes. In
//! ordered mode the enumeration follows one of six axis-priority
//! permutations, chosen by distance to the center planes. On top of that
//! table, the two-axis and three-axis entries trade places when crossing
//! the two nearest planes is cheaper than crossing the farthest one, so a
//! query inside the node visits its children nearest-first.

use std::cmp::Ordering;
use std::ops::ControlFlow;

use crate::bounds::octant_code;
use crate::error::OctreeResult;
use crate::node::Node;
use crate::paging::PagingBridge;
use crate::types::{sqr_distance, Point};

/// Enumeration order without distance ordering
const UNORDERED: [usize; 8] = [0, 1, 2, 4, 3, 5, 6, 7];

/// Enumeration orders for each axis priority, nearest axis first.
/// With axis bits A, B, C in priority order: `0, A, B, C, AB, AC, BC, ABC`.
const AXIS_PRIORITY_ORDERS: [[usize; 8]; 6] = [
    [0, 1, 2, 4, 3, 5, 6, 7], // x, y, z
    [0, 1, 4, 2, 5, 3, 6, 7], // x, z, y
    [0, 2, 1, 4, 3, 6, 5, 7], // y, x, z
    [0, 2, 4, 1, 6, 3, 5, 7], // y, z, x
    [0, 4, 1, 2, 5, 6, 3, 7], // z, x, y
    [0, 4, 2, 1, 6, 5, 3, 7], // z, y, x
];

/// Reorder a point buffer into an implicit balanced kd-tree
pub fn kd_partition(points: &mut [Point]) {
    kd_partition_at(points, 0);
}

fn kd_partition_at(points: &mut [Point], dim: usize) {
    if points.len() <= 1 {
        return;
    }
    let mid = (points.len() - 1) / 2;
    points.select_nth_unstable_by(mid, |a, b| {
        a.position[dim]
            .partial_cmp(&b.position[dim])
            .unwrap_or(Ordering::Equal)
    });
    let (left, rest) = points.split_at_mut(mid);
    kd_partition_at(left, (dim + 1) % 3);
    kd_partition_at(&mut rest[1..], (dim + 1) % 3);
}

/// Check that a buffer is in implicit kd-tree order
pub fn is_kd_partitioned(points: &[Point]) -> bool {
    is_kd_partitioned_at(points, 0)
}

fn is_kd_partitioned_at(points: &[Point], dim: usize) -> bool {
    if points.len() <= 1 {
        return true;
    }
    let mid = (points.len() - 1) / 2;
    let split = points[mid].position[dim];
    let (left, rest) = points.split_at(mid);
    let right = &rest[1..];

    left.iter().all(|p| p.position[dim] <= split)
        && right.iter().all(|p| p.position[dim] >= split)
        && is_kd_partitioned_at(left, (dim + 1) % 3)
        && is_kd_partitioned_at(right, (dim + 1) % 3)
}

/// Octant enumeration for a query point relative to a node center.
///
/// Entries are XOR masks to apply to the query's own octant code.
pub fn child_order(query: [f32; 3], center: [f32; 3], ordered: bool) -> [usize; 8] {
    if !ordered {
        return UNORDERED;
    }

    let d = [
        (query[0] - center[0]) * (query[0] - center[0]),
        (query[1] - center[1]) * (query[1] - center[1]),
        (query[2] - center[2]) * (query[2] - center[2]),
    ];

    let priority = if d[0] <= d[1] {
        if d[1] <= d[2] {
            0
        } else if d[0] <= d[2] {
            1
        } else {
            4
        }
    } else if d[0] <= d[2] {
        2
    } else if d[1] <= d[2] {
        3
    } else {
        5
    };

    let mut order = AXIS_PRIORITY_ORDERS[priority];
    let axis = |bit: usize| bit.trailing_zeros() as usize;
    let (a, b, c) = (axis(order[1]), axis(order[2]), axis(order[3]));
    // Crossing the two nearest planes can still be cheaper than the farthest one
    if d[a] + d[b] < d[c] {
        order.swap(3, 4);
    }
    order
}

/// Visit every point of the subtree within `sqrt(radius_sq)` of `query`.
///
/// The visitor receives each point and its squared distance, and may stop
/// the query early by returning `ControlFlow::Break`. Interior nodes are
/// paged in through `bridge` on first visit.
pub fn process_points_directed<F>(
    node: &Node,
    level: u32,
    query: [f32; 3],
    radius_sq: f32,
    ordered: bool,
    bridge: &dyn PagingBridge,
    visitor: &mut F,
) -> OctreeResult<ControlFlow<()>>
where
    F: FnMut(&Point, f32) -> ControlFlow<()>,
{
    let _pin = node.pin(bridge);

    if node.is_leaf() {
        let buffer = node.points();
        return Ok(process_kd(buffer.points(), 0, query, radius_sq, visitor));
    }

    let center = node.domain().center();
    let query_octant = octant_code(center, query);
    let children = node.materialize_children(bridge, level)?;

    for mask in child_order(query, center, ordered) {
        let Some(child) = children.get(mask ^ query_octant) else {
            continue;
        };
        if child.domain().sqr_distance_to(query) >= radius_sq {
            tracing::trace!(
                "Pruned octant {} at level {}",
                mask ^ query_octant,
                level + 1
            );
            continue;
        }
        let flow = process_points_directed(
            child,
            level + 1,
            query,
            radius_sq,
            ordered,
            bridge,
            visitor,
        )?;
        if flow.is_break() {
            return Ok(flow);
        }
    }

    Ok(ControlFlow::Continue(()))
}

fn process_kd<F>(
    points: &[Point],
    dim: usize,
    query: [f32; 3],
    radius_sq: f32,
    visitor: &mut F,
) -> ControlFlow<()>
where
    F: FnMut(&Point, f32) -> ControlFlow<()>,
{
    if points.is_empty() {
        return ControlFlow::Continue(());
    }

    let mid = (points.len() - 1) / 2;
    let split = &points[mid];
    let (left, rest) = points.split_at(mid);
    let right = &rest[1..];

    let diff = query[dim] - split.position[dim];
    let (near, far) = if diff < 0.0 {
        (left, right)
    } else {
        (right, left)
    };
    let next = (dim + 1) % 3;

    process_kd(near, next, query, radius_sq, visitor)?;

    let dist_sq = sqr_distance(split.position, query);
    if dist_sq < radius_sq {
        visitor(split, dist_sq)?;
    }

    if diff * diff <= radius_sq {
        process_kd(far, next, query, radius_sq, visitor)?;
    }

    ControlFlow::Continue(())
}
