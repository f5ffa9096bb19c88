//! Point records shared by the traversal, query and selection engines
//!
//! A point is a 3D position plus a 4-channel color. The first three
//! channels are visible color on the 0-255 scale; the fourth is an
//! auxiliary channel that carries scalar data such as the original
//! intensity and is never touched by selection feedback.

use serde::{Deserialize, Serialize};

/// Intensity at which selection feedback switches from dim green to
/// the bright blend
pub const HIGHLIGHT_THRESHOLD: f32 = 127.5;

/// A color with visible channels on the 0-255 scale
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    /// Auxiliary scalar channel
    pub a: f32,
}

impl Color {
    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Create a color with an empty auxiliary channel
    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 0.0 }
    }

    pub fn to_array(&self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Perceived intensity, `0.299 R + 0.587 G + 0.114 B`
    pub fn luminance(&self) -> f32 {
        0.299 * self.r + 0.587 * self.g + 0.114 * self.b
    }

    /// Color shown for this color while its point is selected
    pub fn highlighted(&self) -> Color {
        highlight_color(self.luminance(), self.a)
    }
}

impl From<[f32; 4]> for Color {
    fn from(arr: [f32; 4]) -> Self {
        Self {
            r: arr[0],
            g: arr[1],
            b: arr[2],
            a: arr[3],
        }
    }
}

impl From<Color> for [f32; 4] {
    fn from(c: Color) -> Self {
        c.to_array()
    }
}

/// Map an intensity to the two-tone selection feedback color.
///
/// Dark points become green `(0, i + 127.5, 0)`; points at or above the
/// threshold become `(i - 127.5, 255, i - 127.5)`. The auxiliary channel
/// is carried through unchanged.
pub fn highlight_color(intensity: f32, aux: f32) -> Color {
    if intensity < HIGHLIGHT_THRESHOLD {
        Color::new(0.0, intensity + HIGHLIGHT_THRESHOLD, 0.0, aux)
    } else {
        let v = intensity - HIGHLIGHT_THRESHOLD;
        Color::new(v, 255.0, v, aux)
    }
}

/// A single point record
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub position: [f32; 3],
    pub color: Color,
}

impl Point {
    pub fn new(position: [f32; 3], color: Color) -> Self {
        Self { position, color }
    }

    /// Squared Euclidean distance to `other`
    pub fn sqr_distance_to(&self, other: [f32; 3]) -> f32 {
        sqr_distance(self.position, other)
    }
}

/// Squared Euclidean distance between two positions
#[inline]
pub fn sqr_distance(a: [f32; 3], b: [f32; 3]) -> f32 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    dx * dx + dy * dy + dz * dz
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_luminance() {
        assert_eq!(Color::rgb(0.0, 0.0, 0.0).luminance(), 0.0);
        let white = Color::rgb(255.0, 255.0, 255.0).luminance();
        assert!((white - 255.0).abs() < 1e-3);
    }

    #[test]
    fn test_highlight_dark_branch() {
        let c = highlight_color(20.0, 7.0);
        assert_eq!(c, Color::new(0.0, 147.5, 0.0, 7.0));
    }

    #[test]
    fn test_highlight_bright_branch() {
        let c = highlight_color(200.0, 0.0);
        assert_eq!(c, Color::new(72.5, 255.0, 72.5, 0.0));
    }

    #[test]
    fn test_highlight_threshold_takes_bright_branch() {
        let c = highlight_color(HIGHLIGHT_THRESHOLD, 0.0);
        assert_eq!(c, Color::new(0.0, 255.0, 0.0, 0.0));
    }

    #[test]
    fn test_highlight_keeps_aux_channel() {
        let c = Color::new(255.0, 255.0, 255.0, 0.42).highlighted();
        assert_eq!(c.a, 0.42);
        assert_eq!(c.g, 255.0);
    }

    #[test]
    fn test_sqr_distance() {
        let p = Point::new([1.0, 2.0, 2.0], Color::default());
        assert_eq!(p.sqr_distance_to([0.0, 0.0, 0.0]), 9.0);
    }
}
