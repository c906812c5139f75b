//! Video geometry reported by the native layer.

use serde::{Deserialize, Serialize};

/// Decoded picture size plus stream rotation.
///
/// Width and height are as decoded. Callers laying out a view must use
/// [`VideoGeometry::display_size`], which swaps them for 90° and 270°
/// rotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VideoGeometry {
    pub width: i32,
    pub height: i32,
    /// Degrees, always one of 0, 90, 180, 270.
    pub rotation: i32,
}

impl VideoGeometry {
    pub fn new(width: i32, height: i32, rotation: i32) -> Self {
        Self {
            width: width.max(0),
            height: height.max(0),
            rotation: normalize_rotation(rotation),
        }
    }

    /// `true` when both dimensions are known.
    pub fn is_known(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Size as it appears on screen after rotation.
    pub fn display_size(&self) -> (i32, i32) {
        if self.rotation % 180 != 0 {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        }
    }

    /// Display width over display height, when the size is known.
    pub fn aspect_ratio(&self) -> Option<f64> {
        if !self.is_known() {
            return None;
        }
        let (width, height) = self.display_size();
        Some(f64::from(width) / f64::from(height))
    }
}

/// Map any angle to the nearest quarter turn in `[0, 360)`.
pub fn normalize_rotation(degrees: i32) -> i32 {
    let wrapped = degrees.rem_euclid(360);
    ((wrapped + 45) / 90 * 90) % 360
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quarter_turn_swaps_dimensions() {
        let geometry = VideoGeometry::new(640, 360, 90);
        assert_eq!(geometry.display_size(), (360, 640));
        let ratio = geometry.aspect_ratio().unwrap();
        assert!((ratio - 0.5625).abs() < 1e-9);

        assert_eq!(VideoGeometry::new(640, 360, 180).display_size(), (640, 360));
        assert_eq!(VideoGeometry::new(640, 360, 270).display_size(), (360, 640));
    }

    #[test]
    fn rotation_is_normalized() {
        assert_eq!(normalize_rotation(-90), 270);
        assert_eq!(normalize_rotation(450), 90);
        assert_eq!(normalize_rotation(89), 90);
        assert_eq!(normalize_rotation(359), 0);
    }

    #[test]
    fn unknown_size_has_no_aspect_ratio() {
        assert_eq!(VideoGeometry::default().aspect_ratio(), None);
        assert!(!VideoGeometry::new(-1, 360, 0).is_known());
    }
}
