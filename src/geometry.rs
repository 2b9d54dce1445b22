use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Database units. The reference technology uses 1 unit = 1 nm.
pub type Int = i64;

/// A direction: horizontal or vertical.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dir {
    Horiz,
    #[default]
    Vert,
}

impl Display for Dir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::Horiz => write!(f, "horizontal"),
            Self::Vert => write!(f, "vertical"),
        }
    }
}

impl Dir {
    pub fn short_form(&self) -> &'static str {
        match *self {
            Self::Horiz => "h",
            Self::Vert => "v",
        }
    }
}

#[derive(
    Debug, Default, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Point {
    pub x: Int,
    pub y: Int,
}

impl Point {
    #[inline]
    pub const fn new(x: Int, y: Int) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn translate(&self, p: Point) -> Self {
        Self::new(self.x + p.x, self.y + p.y)
    }
}

impl Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// An axis-aligned rectangle.
///
/// `p0` is the lower-left corner and `p1` the upper-right corner.
/// All constructors normalize their inputs so this always holds.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub p0: Point,
    pub p1: Point,
}

impl Rect {
    pub fn new(a: Point, b: Point) -> Self {
        Self {
            p0: Point::new(a.x.min(b.x), a.y.min(b.y)),
            p1: Point::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    #[inline]
    pub fn from_xy(x0: Int, y0: Int, x1: Int, y1: Int) -> Self {
        Self::new(Point::new(x0, y0), Point::new(x1, y1))
    }

    #[inline]
    pub fn ll_wh(x: Int, y: Int, w: Int, h: Int) -> Self {
        Self::from_xy(x, y, x + w, y + h)
    }

    /// A `w` by `h` rectangle centered at `center`.
    ///
    /// Odd dimensions put the extra unit above/right of the center.
    pub fn centered(center: Point, w: Int, h: Int) -> Self {
        let x0 = center.x - w / 2;
        let y0 = center.y - h / 2;
        Self::ll_wh(x0, y0, w, h)
    }

    #[inline]
    pub fn left(&self) -> Int {
        self.p0.x
    }
    #[inline]
    pub fn right(&self) -> Int {
        self.p1.x
    }
    #[inline]
    pub fn bottom(&self) -> Int {
        self.p0.y
    }
    #[inline]
    pub fn top(&self) -> Int {
        self.p1.y
    }
    #[inline]
    pub fn width(&self) -> Int {
        self.p1.x - self.p0.x
    }
    #[inline]
    pub fn height(&self) -> Int {
        self.p1.y - self.p0.y
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.p0.x + self.p1.x) / 2,
            (self.p0.y + self.p1.y) / 2,
        )
    }

    pub fn translate(&self, p: Point) -> Self {
        Self {
            p0: self.p0.translate(p),
            p1: self.p1.translate(p),
        }
    }

    pub fn expand(&self, dist: Int) -> Self {
        Self::from_xy(
            self.p0.x - dist,
            self.p0.y - dist,
            self.p1.x + dist,
            self.p1.y + dist,
        )
    }

    /// Expands only along `dir` by `dist` on both sides.
    pub fn expand_dir(&self, dir: Dir, dist: Int) -> Self {
        match dir {
            Dir::Horiz => Self::from_xy(self.p0.x - dist, self.p0.y, self.p1.x + dist, self.p1.y),
            Dir::Vert => Self::from_xy(self.p0.x, self.p0.y - dist, self.p1.x, self.p1.y + dist),
        }
    }

    pub fn union(&self, other: &Rect) -> Self {
        Self::from_xy(
            self.p0.x.min(other.p0.x),
            self.p0.y.min(other.p0.y),
            self.p1.x.max(other.p1.x),
            self.p1.y.max(other.p1.y),
        )
    }

    /// True if the two rectangles share at least one point.
    /// Abutting edges count.
    pub fn touches(&self, other: &Rect) -> bool {
        self.p0.x <= other.p1.x
            && other.p0.x <= self.p1.x
            && self.p0.y <= other.p1.y
            && other.p0.y <= self.p1.y
    }

    /// True if the interiors of the two rectangles intersect.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.p0.x < other.p1.x
            && other.p0.x < self.p1.x
            && self.p0.y < other.p1.y
            && other.p0.y < self.p1.y
    }

    pub fn contains(&self, other: &Rect) -> bool {
        self.p0.x <= other.p0.x
            && self.p0.y <= other.p0.y
            && other.p1.x <= self.p1.x
            && other.p1.y <= self.p1.y
    }

    /// Squared Euclidean distance between the closest points of two rectangles.
    /// Zero if they touch.
    pub fn distance2(&self, other: &Rect) -> Int {
        let dx = (other.p0.x - self.p1.x).max(self.p0.x - other.p1.x).max(0);
        let dy = (other.p0.y - self.p1.y).max(self.p0.y - other.p1.y).max(0);
        dx * dx + dy * dy
    }
}

/// The bounding box of a collection of rectangles.
pub fn bbox<'a>(rects: impl IntoIterator<Item = &'a Rect>) -> Option<Rect> {
    rects
        .into_iter()
        .fold(None, |acc: Option<Rect>, r| match acc {
            Some(acc) => Some(acc.union(r)),
            None => Some(*r),
        })
}

/// Rounds `x` up to the nearest multiple of `grid`.
#[inline]
pub fn snap_up(x: Int, grid: Int) -> Int {
    debug_assert!(grid > 0);
    x.div_euclid(grid) * grid + if x.rem_euclid(grid) == 0 { 0 } else { grid }
}

/// Rounds `x` down to the nearest multiple of `grid`.
#[inline]
pub fn snap_down(x: Int, grid: Int) -> Int {
    debug_assert!(grid > 0);
    x.div_euclid(grid) * grid
}

// Rounds a to the nearest multiple of b
#[inline]
pub fn round(a: Int, b: Int) -> Int {
    debug_assert!(b > 0);
    let min = a.div_euclid(b) * b;
    let max = min + b;
    if a - min < max - a {
        min
    } else {
        max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_normalizes() {
        let r = Rect::from_xy(10, 20, -5, 0);
        assert_eq!(r.p0, Point::new(-5, 0));
        assert_eq!(r.p1, Point::new(10, 20));
        assert_eq!(r.width(), 15);
        assert_eq!(r.height(), 20);
    }

    #[test]
    fn test_rect_distance() {
        let a = Rect::from_xy(0, 0, 100, 100);
        let b = Rect::from_xy(160, 0, 200, 100);
        assert_eq!(a.distance2(&b), 3600);
        let c = Rect::from_xy(130, 140, 200, 200);
        assert_eq!(a.distance2(&c), 30 * 30 + 40 * 40);
        let d = Rect::from_xy(100, 50, 200, 60);
        assert_eq!(a.distance2(&d), 0);
        assert!(a.touches(&d));
        assert!(!a.overlaps(&d));
    }

    #[test]
    fn test_snapping() {
        assert_eq!(snap_up(101, 50), 150);
        assert_eq!(snap_up(100, 50), 100);
        assert_eq!(snap_up(-10, 50), 0);
        assert_eq!(snap_down(149, 50), 100);
        assert_eq!(snap_down(-10, 50), -50);
        assert_eq!(round(124, 50), 100);
        assert_eq!(round(126, 50), 150);
    }

    #[test]
    fn test_centered() {
        let r = Rect::centered(Point::new(400, 1000), 800, 600);
        assert_eq!(r, Rect::from_xy(0, 700, 800, 1300));
        assert_eq!(r.center(), Point::new(400, 1000));
    }

    #[test]
    fn test_bbox() {
        let rects = [Rect::from_xy(0, 0, 1, 1), Rect::from_xy(-3, 2, 0, 5)];
        assert_eq!(bbox(&rects), Some(Rect::from_xy(-3, 0, 1, 5)));
        assert_eq!(bbox(&[]), None);
    }
}
