//! Integer screen rectangles.

use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle in virtual-screen coordinates.
///
/// `Rect::default()` is the all-zero rectangle and stands for "unknown".
/// It is degenerate, so it never equals the rect of a real display.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build from left/top/right/bottom edges (Win32 `RECT` layout).
    pub const fn from_edges(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self::new(left, top, right - left, bottom - top)
    }

    /// `true` when the rect has no area.
    pub const fn is_degenerate(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Width and height, clamped at zero.
    pub fn size(&self) -> (u32, u32) {
        (self.width.max(0) as u32, self.height.max(0) as u32)
    }

    /// Compare width and height only; the origin is ignored.
    pub fn same_size(&self, other: &Rect) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// Split into left and right halves (side-by-side stereo layout).
    ///
    /// An odd width gives the extra column to the right half.
    pub fn split_side_by_side(&self) -> (Rect, Rect) {
        let left_width = self.width / 2;
        let left = Rect::new(self.x, self.y, left_width, self.height);
        let right = Rect::new(
            self.x + left_width,
            self.y,
            self.width - left_width,
            self.height,
        );
        (left, right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_exact() {
        let a = Rect::new(0, 0, 1920, 1080);
        let b = Rect::new(0, 0, 1920, 1080);
        let c = Rect::new(0, 0, 1920, 1081);
        assert_eq!(a, a);
        assert_eq!(a, b);
        assert_eq!(b, a);
        assert_ne!(a, c);
        assert_ne!(c, a);
    }

    #[test]
    fn default_never_equals_real_rect() {
        let unknown = Rect::default();
        assert!(unknown.is_degenerate());
        for real in [
            Rect::new(0, 0, 1, 1),
            Rect::new(-1920, 0, 1920, 1080),
            Rect::new(0, 0, 2160, 1200),
        ] {
            assert!(!real.is_degenerate());
            assert_ne!(unknown, real);
        }
    }

    #[test]
    fn from_edges() {
        let r = Rect::from_edges(-1920, 0, 0, 1080);
        assert_eq!(r, Rect::new(-1920, 0, 1920, 1080));
    }

    #[test]
    fn same_size_ignores_origin() {
        let headset = Rect::new(-4000, 77, 2160, 1200);
        let monitor = Rect::new(3840, 0, 2160, 1200);
        assert!(headset.same_size(&monitor));
        assert_ne!(headset, monitor);
    }

    #[test]
    fn side_by_side_split() {
        let (l, r) = Rect::new(0, 0, 2161, 1200).split_side_by_side();
        assert_eq!(l, Rect::new(0, 0, 1080, 1200));
        assert_eq!(r, Rect::new(1080, 0, 1081, 1200));
    }
}
