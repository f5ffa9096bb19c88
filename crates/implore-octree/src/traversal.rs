//! Whole-tree traversals
//!
//! Every bulk operation on the octree is a prefix walk, a postfix walk or
//! a point stream over leaves. Each node is pinned for the duration of
//! its entire subtree visit, and interior nodes are paged in on demand.

use crate::error::OctreeResult;
use crate::node::Node;
use crate::paging::PagingBridge;
use crate::types::Point;

/// Which kind of whole-tree walk to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalMode {
    /// Visit each node before its children
    Prefix,
    /// Visit each node after its children
    Postfix,
    /// Visit every point of every leaf
    Points,
}

/// An item handed to a traversal visitor
#[derive(Debug, Clone, Copy)]
pub enum Visit<'a> {
    Node { node: &'a Node, level: u32 },
    Point(&'a Point),
}

/// Apply `functor` to every node before its children
pub fn process_nodes_prefix<F>(
    node: &Node,
    level: u32,
    bridge: &dyn PagingBridge,
    functor: &mut F,
) -> OctreeResult<()>
where
    F: FnMut(&Node, u32),
{
    let _pin = node.pin(bridge);
    functor(node, level);

    if !node.is_leaf() {
        let children = node.materialize_children(bridge, level)?;
        for child in children.iter() {
            process_nodes_prefix(child, level + 1, bridge, functor)?;
        }
    }
    Ok(())
}

/// Apply `functor` to every node after its children
pub fn process_nodes_postfix<F>(
    node: &Node,
    level: u32,
    bridge: &dyn PagingBridge,
    functor: &mut F,
) -> OctreeResult<()>
where
    F: FnMut(&Node, u32),
{
    let _pin = node.pin(bridge);

    if !node.is_leaf() {
        let children = node.materialize_children(bridge, level)?;
        for child in children.iter() {
            process_nodes_postfix(child, level + 1, bridge, functor)?;
        }
    }

    functor(node, level);
    Ok(())
}

/// Apply `functor` to every point stored in a leaf, in buffer order
pub fn process_points<F>(
    node: &Node,
    level: u32,
    bridge: &dyn PagingBridge,
    functor: &mut F,
) -> OctreeResult<()>
where
    F: FnMut(&Point),
{
    let _pin = node.pin(bridge);

    if node.is_leaf() {
        let buffer = node.points();
        buffer.points().iter().for_each(|p| functor(p));
        return Ok(());
    }

    let children = node.materialize_children(bridge, level)?;
    for child in children.iter() {
        process_points(child, level + 1, bridge, functor)?;
    }
    Ok(())
}

/// Stream points down to `max_level`.
///
/// Leaves above the cut stream their full buffers; interior nodes at
/// `max_level` stream their level-of-detail sample instead of descending.
pub fn process_points_lod<F>(
    node: &Node,
    level: u32,
    max_level: u32,
    bridge: &dyn PagingBridge,
    functor: &mut F,
) -> OctreeResult<()>
where
    F: FnMut(&Point),
{
    let _pin = node.pin(bridge);

    if node.is_leaf() || level >= max_level {
        let buffer = node.points();
        buffer.points().iter().for_each(|p| functor(p));
        return Ok(());
    }

    let children = node.materialize_children(bridge, level)?;
    for child in children.iter() {
        process_points_lod(child, level + 1, max_level, bridge, functor)?;
    }
    Ok(())
}

/// Run a traversal of the given mode with a single visitor
pub fn traverse<F>(
    node: &Node,
    mode: TraversalMode,
    bridge: &dyn PagingBridge,
    visitor: &mut F,
) -> OctreeResult<()>
where
    F: FnMut(Visit<'_>),
{
    match mode {
        TraversalMode::Prefix => process_nodes_prefix(node, 0, bridge, &mut |node, level| {
            visitor(Visit::Node { node, level })
        }),
        TraversalMode::Postfix => process_nodes_postfix(node, 0, bridge, &mut |node, level| {
            visitor(Visit::Node { node, level })
        }),
        TraversalMode::Points => {
            process_points(node, 0, bridge, &mut |point| visitor(Visit::Point(point)))
        }
    }
}

/// Apply `functor` to every node whose subtree is already resident,
/// without paging anything in. `bridge` only receives release notices.
pub fn process_resident_nodes<F>(
    node: &Node,
    level: u32,
    bridge: &dyn PagingBridge,
    functor: &mut F,
) where
    F: FnMut(&Node, u32),
{
    let _pin = node.pin(bridge);
    functor(node, level);

    if let Some(children) = node.resident_children() {
        for child in children.iter() {
            process_resident_nodes(child, level + 1, bridge, functor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::BoundingBox;
    use crate::error::{PagingError, PagingResult};
    use crate::types::Color;

    /// Two-level tree: root with 8 leaf children, each holding one point
    struct OneLevel;

    impl PagingBridge for OneLevel {
        fn subdivide(&self, node: &Node) -> PagingResult<[Node; 8]> {
            Ok(node.domain().octants().map(|domain| {
                let center = domain.center();
                Node::leaf(domain, vec![Point::new(center, Color::default())])
            }))
        }
    }

    struct Broken;

    impl PagingBridge for Broken {
        fn subdivide(&self, node: &Node) -> PagingResult<[Node; 8]> {
            Err(PagingError::Unavailable {
                offset: node.children_offset(),
            })
        }
    }

    fn root() -> Node {
        Node::new(BoundingBox::new([0.0; 3], [2.0; 3]), 1, Vec::new())
    }

    #[test]
    fn test_prefix_visits_parent_first() {
        let root = root();
        let mut levels = Vec::new();
        process_nodes_prefix(&root, 0, &OneLevel, &mut |_, level| levels.push(level)).unwrap();
        assert_eq!(levels, vec![0, 1, 1, 1, 1, 1, 1, 1, 1]);
    }

    #[test]
    fn test_postfix_visits_parent_last() {
        let root = root();
        let mut levels = Vec::new();
        process_nodes_postfix(&root, 0, &OneLevel, &mut |_, level| levels.push(level)).unwrap();
        assert_eq!(levels, vec![1, 1, 1, 1, 1, 1, 1, 1, 0]);
    }

    #[test]
    fn test_process_points_pages_in_and_releases_pins() {
        let root = root();
        let mut count = 0;
        process_points(&root, 0, &OneLevel, &mut |_| count += 1).unwrap();
        assert_eq!(count, 8);
        assert!(root.has_resident_children());

        process_resident_nodes(&root, 0, &OneLevel, &mut |node, _| {
            assert_eq!(node.pin_count(), 1)
        });
    }

    #[test]
    fn test_lod_cut_streams_interior_sample() {
        let sample = vec![Point::new([1.0; 3], Color::default()); 3];
        let root = Node::new(BoundingBox::new([0.0; 3], [2.0; 3]), 1, sample);

        let mut count = 0;
        process_points_lod(&root, 0, 0, &OneLevel, &mut |_| count += 1).unwrap();
        assert_eq!(count, 3);
        assert!(!root.has_resident_children());

        let mut count = 0;
        process_points_lod(&root, 0, 1, &OneLevel, &mut |_| count += 1).unwrap();
        assert_eq!(count, 8);
    }

    #[test]
    fn test_traverse_modes() {
        let root = root();
        let mut nodes = 0;
        let mut points = 0;
        traverse(&root, TraversalMode::Prefix, &OneLevel, &mut |visit| match visit {
            Visit::Node { .. } => nodes += 1,
            Visit::Point(_) => points += 1,
        })
        .unwrap();
        traverse(&root, TraversalMode::Points, &OneLevel, &mut |visit| match visit {
            Visit::Node { .. } => nodes += 1,
            Visit::Point(_) => points += 1,
        })
        .unwrap();
        assert_eq!(nodes, 9);
        assert_eq!(points, 8);
    }

    #[test]
    fn test_empty_leaf_is_noop() {
        let leaf = Node::leaf(BoundingBox::new([0.0; 3], [1.0; 3]), Vec::new());
        let mut count = 0;
        process_points(&leaf, 0, &Broken, &mut |_| count += 1).unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_paging_failure_aborts_and_unpins() {
        let root = root();
        let mut visited = 0;
        let result = process_nodes_prefix(&root, 0, &Broken, &mut |_, _| visited += 1);
        assert!(result.is_err());
        assert_eq!(visited, 1);
        assert_eq!(root.pin_count(), 0);
    }
}
