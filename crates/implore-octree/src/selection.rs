//! Point selection
//!
//! Points inside a spherical interactor can be marked selected. A
//! selected point is recolored for visual feedback, and its original
//! color is kept so deselection restores it exactly.
//!
//! Selection state lives with a node's point buffer and is allocated
//! lazily: a node with no selected points carries no mask at all. The
//! mask and the color backup are one structure, created and dropped
//! together.
//!
//! Selection only touches resident nodes and never pages anything in.

use crate::error::{validation, OctreeResult};
use crate::node::{Node, PointBuffer};
use crate::paging::PagingBridge;
use crate::types::{sqr_distance, Color};

/// A spherical selection region
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interactor {
    pub center: [f32; 3],
    pub radius: f32,
}

impl Interactor {
    pub fn new(center: [f32; 3], radius: f32) -> Self {
        Self { center, radius }
    }

    pub fn radius_sq(&self) -> f32 {
        self.radius * self.radius
    }

    /// Whether a position lies strictly inside the sphere
    pub fn contains(&self, position: [f32; 3]) -> bool {
        sqr_distance(position, self.center) < self.radius_sq()
    }

    /// Check the interactor can be used for a query
    pub fn validate(&self) -> OctreeResult<()> {
        validation::validate_point(self.center)?;
        validation::validate_radius(self.radius)?;
        Ok(())
    }
}

/// Selection mask and color backup of one node
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionState {
    mask: Vec<bool>,
    saved_colors: Vec<Color>,
    count: usize,
}

impl SelectionState {
    fn new(len: usize) -> Self {
        Self {
            mask: vec![false; len],
            saved_colors: vec![Color::default(); len],
            count: 0,
        }
    }

    /// Number of selected points
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn len(&self) -> usize {
        self.mask.len()
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.mask.get(index).copied().unwrap_or(false)
    }

    /// Color the point had before it was selected
    pub fn saved_color(&self, index: usize) -> Option<Color> {
        if self.is_selected(index) {
            self.saved_colors.get(index).copied()
        } else {
            None
        }
    }

    /// Indices of selected points
    pub fn selected_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.mask
            .iter()
            .enumerate()
            .filter_map(|(i, &selected)| selected.then_some(i))
    }
}

/// Select every point of `node` inside the interactor.
///
/// Returns the number of points whose state changed. The node's version
/// is bumped only when that number is non-zero.
pub fn select_points_in_node(node: &Node, interactor: &Interactor) -> usize {
    let changed = {
        let mut buffer = node.points_mut();
        let PointBuffer { points, selection } = &mut *buffer;
        let len = points.len();
        let mut changed = 0;

        for (i, point) in points.iter_mut().enumerate() {
            if !interactor.contains(point.position) {
                continue;
            }
            let state = selection.get_or_insert_with(|| SelectionState::new(len));
            debug_assert_eq!(state.mask.len(), len, "selection mask length mismatch");
            if state.mask[i] {
                continue;
            }
            state.mask[i] = true;
            state.saved_colors[i] = point.color;
            state.count += 1;
            point.color = point.color.highlighted();
            changed += 1;
        }
        changed
    };

    if changed > 0 {
        let version = node.bump_version();
        tracing::debug!(
            "Selected {} points in node at offset {} (version {})",
            changed,
            node.children_offset(),
            version
        );
    }
    changed
}

/// Deselect every selected point of `node` inside the interactor,
/// restoring original colors. Frees the selection state once empty.
///
/// Returns the number of points whose state changed.
pub fn deselect_points_in_node(node: &Node, interactor: &Interactor) -> usize {
    let changed = {
        let mut buffer = node.points_mut();
        let PointBuffer { points, selection } = &mut *buffer;
        let Some(state) = selection.as_mut() else {
            return 0;
        };
        debug_assert_eq!(state.mask.len(), points.len(), "selection mask length mismatch");

        let mut changed = 0;
        for (i, point) in points.iter_mut().enumerate() {
            if !state.mask[i] || !interactor.contains(point.position) {
                continue;
            }
            state.mask[i] = false;
            point.color = state.saved_colors[i];
            state.count -= 1;
            changed += 1;
        }

        if state.count == 0 {
            *selection = None;
        }
        changed
    };

    if changed > 0 {
        let version = node.bump_version();
        tracing::debug!(
            "Deselected {} points in node at offset {} (version {})",
            changed,
            node.children_offset(),
            version
        );
    }
    changed
}

/// Deselect every point of `node`, restoring original colors
pub fn clear_selection_in_node(node: &Node) -> usize {
    let changed = {
        let mut buffer = node.points_mut();
        let PointBuffer { points, selection } = &mut *buffer;
        let Some(state) = selection.take() else {
            return 0;
        };
        for i in state.selected_indices() {
            points[i].color = state.saved_colors[i];
        }
        state.count
    };

    if changed > 0 {
        node.bump_version();
    }
    changed
}

/// Select within the interactor across every resident leaf of the subtree
pub fn select_resident(node: &Node, interactor: &Interactor, bridge: &dyn PagingBridge) -> usize {
    apply_resident(node, interactor, bridge, &select_points_in_node)
}

/// Deselect within the interactor across every resident leaf of the subtree
pub fn deselect_resident(node: &Node, interactor: &Interactor, bridge: &dyn PagingBridge) -> usize {
    apply_resident(node, interactor, bridge, &deselect_points_in_node)
}

/// Clear the selection of every resident leaf of the subtree
pub fn clear_resident(node: &Node, bridge: &dyn PagingBridge) -> usize {
    let _pin = node.pin(bridge);
    if node.is_leaf() {
        return clear_selection_in_node(node);
    }
    match node.resident_children() {
        Some(children) => children.iter().map(|child| clear_resident(child, bridge)).sum(),
        None => 0,
    }
}

fn apply_resident(
    node: &Node,
    interactor: &Interactor,
    bridge: &dyn PagingBridge,
    op: &dyn Fn(&Node, &Interactor) -> usize,
) -> usize {
    if node.domain().sqr_distance_to(interactor.center) >= interactor.radius_sq() {
        return 0;
    }

    let _pin = node.pin(bridge);
    if node.is_leaf() {
        return op(node, interactor);
    }
    match node.resident_children() {
        Some(children) => children
            .iter()
            .map(|child| apply_resident(child, interactor, bridge, op))
            .sum(),
        None => 0,
    }
}

/// Hand every selected point of the resident subtree to `processor`,
/// with its position and its color from before selection
pub fn process_selected_points<F>(node: &Node, bridge: &dyn PagingBridge, processor: &mut F)
where
    F: FnMut([f32; 3], Color),
{
    let _pin = node.pin(bridge);

    if node.is_leaf() {
        let buffer = node.points();
        if let Some(state) = buffer.selection() {
            for i in state.selected_indices() {
                processor(buffer.points()[i].position, state.saved_colors[i]);
            }
        }
        return;
    }

    if let Some(children) = node.resident_children() {
        for child in children.iter() {
            process_selected_points(child, bridge, processor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::BoundingBox;
    use crate::types::Point;

    fn scenario_leaf() -> Node {
        let points = vec![
            Point::new([0.0, 0.0, 0.0], Color::rgb(10.0, 20.0, 30.0)),
            Point::new([1.0, 0.0, 0.0], Color::rgb(200.0, 200.0, 200.0)),
            Point::new([5.0, 5.0, 5.0], Color::rgb(50.0, 60.0, 70.0)),
            Point::new([0.0, 0.0, 1.0], Color::new(90.0, 80.0, 70.0, 3.0)),
        ];
        Node::leaf(BoundingBox::new([0.0; 3], [5.0; 3]), points)
    }

    fn origin_interactor() -> Interactor {
        Interactor::new([0.0, 0.0, 0.0], 1.5)
    }

    #[test]
    fn test_select_marks_points_inside() {
        let node = scenario_leaf();
        assert_eq!(select_points_in_node(&node, &origin_interactor()), 3);

        let buffer = node.points();
        let state = buffer.selection().unwrap();
        assert_eq!(state.count(), 3);
        assert!(state.is_selected(0));
        assert!(state.is_selected(1));
        assert!(!state.is_selected(2));
        assert!(state.is_selected(3));
        assert_eq!(state.saved_color(1), Some(Color::rgb(200.0, 200.0, 200.0)));
        assert_eq!(state.saved_color(2), None);
    }

    #[test]
    fn test_select_recolors_and_bumps_version() {
        let node = scenario_leaf();
        select_points_in_node(&node, &origin_interactor());
        assert_eq!(node.version(), 1);

        let buffer = node.points();
        let points = buffer.points();
        let intensity = Color::rgb(10.0, 20.0, 30.0).luminance();
        assert_eq!(points[0].color, Color::new(0.0, intensity + 127.5, 0.0, 0.0));
        assert_eq!(points[1].color.g, 255.0);
        assert_eq!(points[2].color, Color::rgb(50.0, 60.0, 70.0));
        assert_eq!(points[3].color.a, 3.0);
    }

    #[test]
    fn test_select_twice_is_idempotent() {
        let node = scenario_leaf();
        select_points_in_node(&node, &origin_interactor());
        let colors: Vec<Color> = node.points().points().iter().map(|p| p.color).collect();

        assert_eq!(select_points_in_node(&node, &origin_interactor()), 0);
        assert_eq!(node.version(), 1);

        let after: Vec<Color> = node.points().points().iter().map(|p| p.color).collect();
        assert_eq!(colors, after);
    }

    #[test]
    fn test_select_deselect_roundtrip_restores_colors() {
        let node = scenario_leaf();
        let original: Vec<Color> = node.points().points().iter().map(|p| p.color).collect();

        select_points_in_node(&node, &origin_interactor());
        assert_eq!(deselect_points_in_node(&node, &origin_interactor()), 3);

        let restored: Vec<Color> = node.points().points().iter().map(|p| p.color).collect();
        assert_eq!(original, restored);
        assert!(!node.has_selection());
        assert_eq!(node.version(), 2);
    }

    #[test]
    fn test_partial_deselect_keeps_state() {
        let node = scenario_leaf();
        select_points_in_node(&node, &origin_interactor());

        assert_eq!(deselect_points_in_node(&node, &Interactor::new([1.0, 0.0, 0.0], 0.5)), 1);
        assert!(node.has_selection());
        assert_eq!(node.num_selected(), 2);
    }

    #[test]
    fn test_selection_miss_allocates_nothing() {
        let node = scenario_leaf();
        assert_eq!(select_points_in_node(&node, &Interactor::new([100.0; 3], 1.0)), 0);
        assert!(!node.has_selection());
        assert_eq!(node.version(), 0);

        assert_eq!(deselect_points_in_node(&node, &origin_interactor()), 0);
        assert_eq!(node.version(), 0);
    }

    #[test]
    fn test_clear_selection_in_node() {
        let node = scenario_leaf();
        let original: Vec<Color> = node.points().points().iter().map(|p| p.color).collect();
        select_points_in_node(&node, &origin_interactor());

        assert_eq!(clear_selection_in_node(&node), 3);
        assert!(!node.has_selection());
        let restored: Vec<Color> = node.points().points().iter().map(|p| p.color).collect();
        assert_eq!(original, restored);
    }

    #[test]
    fn test_interactor_validation() {
        assert!(Interactor::new([0.0; 3], 1.0).validate().is_ok());
        assert!(Interactor::new([0.0; 3], -1.0).validate().is_err());
        assert!(Interactor::new([f32::NAN, 0.0, 0.0], 1.0).validate().is_err());
    }
}
