//! Axis-aligned node domains
//!
//! Octants are addressed by a 3-bit code relative to the domain center:
//! bit 0 is set for the upper half along x, bit 1 along y, bit 2 along z.
//! A coordinate exactly on the center plane belongs to the upper half, so
//! the 8 child domains partition the parent with one inclusive side.

use serde::{Deserialize, Serialize};

/// A 3D axis-aligned bounding box
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl BoundingBox {
    /// Create a bounding box from min/max corners
    pub fn new(min: [f32; 3], max: [f32; 3]) -> Self {
        Self { min, max }
    }

    /// Create a bounding box from a single point
    pub fn from_point(point: [f32; 3]) -> Self {
        Self {
            min: point,
            max: point,
        }
    }

    /// Create an empty (invalid) bounding box
    pub fn empty() -> Self {
        Self {
            min: [f32::INFINITY; 3],
            max: [f32::NEG_INFINITY; 3],
        }
    }

    /// Smallest box containing every position
    pub fn from_positions<I>(positions: I) -> Self
    where
        I: IntoIterator<Item = [f32; 3]>,
    {
        let mut bbox = Self::empty();
        for p in positions {
            bbox.expand_to_include(p);
        }
        bbox
    }

    /// Check if the bounding box is empty/invalid
    pub fn is_empty(&self) -> bool {
        self.min[0] > self.max[0] || self.min[1] > self.max[1] || self.min[2] > self.max[2]
    }

    /// Expand to include a point
    pub fn expand_to_include(&mut self, point: [f32; 3]) {
        for (i, &p) in point.iter().enumerate() {
            self.min[i] = self.min[i].min(p);
            self.max[i] = self.max[i].max(p);
        }
    }

    /// Check if a point is contained (inclusive on both sides)
    pub fn contains_point(&self, point: [f32; 3]) -> bool {
        (0..3).all(|i| point[i] >= self.min[i] && point[i] <= self.max[i])
    }

    /// Calculate the center of the bounding box
    pub fn center(&self) -> [f32; 3] {
        [
            (self.min[0] + self.max[0]) * 0.5,
            (self.min[1] + self.max[1]) * 0.5,
            (self.min[2] + self.max[2]) * 0.5,
        ]
    }

    /// Smallest cube sharing this box's center that contains it
    pub fn cubed(&self) -> Self {
        let center = self.center();
        let half = (0..3)
            .map(|i| (self.max[i] - self.min[i]) * 0.5)
            .fold(0.0f32, f32::max);
        Self {
            min: [center[0] - half, center[1] - half, center[2] - half],
            max: [center[0] + half, center[1] + half, center[2] + half],
        }
    }

    /// Squared distance from a point to the nearest point of the box.
    /// Zero when the point is inside.
    pub fn sqr_distance_to(&self, point: [f32; 3]) -> f32 {
        let mut dist_sq = 0.0;
        for (i, &p) in point.iter().enumerate() {
            if p < self.min[i] {
                dist_sq += (self.min[i] - p) * (self.min[i] - p);
            } else if p > self.max[i] {
                dist_sq += (p - self.max[i]) * (p - self.max[i]);
            }
        }
        dist_sq
    }

    /// Octant code of the child that contains `point`
    pub fn octant_of(&self, point: [f32; 3]) -> usize {
        octant_code(self.center(), point)
    }

    /// Domain of the child with the given octant code
    pub fn octant(&self, index: usize) -> BoundingBox {
        let center = self.center();
        let mut child = *self;
        for axis in 0..3 {
            if index & (1 << axis) != 0 {
                child.min[axis] = center[axis];
            } else {
                child.max[axis] = center[axis];
            }
        }
        child
    }

    /// All 8 child domains, indexed by octant code
    pub fn octants(&self) -> [BoundingBox; 8] {
        std::array::from_fn(|i| self.octant(i))
    }
}

/// Octant code of `point` relative to `center`, one bit per axis set
/// when the point lies at or above the center on that axis
#[inline]
pub fn octant_code(center: [f32; 3], point: [f32; 3]) -> usize {
    let mut code = 0;
    for axis in 0..3 {
        if point[axis] >= center[axis] {
            code |= 1 << axis;
        }
    }
    code
}
