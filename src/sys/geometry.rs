//! screen-space geometry shared by the resize frame and the expanded renderer

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self { Point { x, y } }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self { Size { width, height } }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub const fn new(origin: Point, size: Size) -> Self { Rect { origin, size } }

    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Rect::new(Point::new(x, y), Size::new(width, height))
    }

    pub fn min(&self) -> Point { self.origin }

    pub fn max(&self) -> Point {
        Point::new(self.origin.x + self.size.width, self.origin.y + self.size.height)
    }

    pub fn mid(&self) -> Point {
        Point::new(
            self.origin.x + self.size.width * 0.5,
            self.origin.y + self.size.height * 0.5,
        )
    }

    /// Grows the rect by `amount` on every side.
    pub fn outset(&self, amount: f64) -> Rect {
        Rect::from_xywh(
            self.origin.x - amount,
            self.origin.y - amount,
            self.size.width + 2.0 * amount,
            self.size.height + 2.0 * amount,
        )
    }
}

pub trait Round {
    fn round(&self) -> Self;
}

impl Round for Rect {
    fn round(&self) -> Self {
        let min_rounded = self.min().round();
        let max_rounded = self.max().round();
        Rect {
            origin: min_rounded,
            size: Size {
                width: max_rounded.x - min_rounded.x,
                height: max_rounded.y - min_rounded.y,
            },
        }
    }
}

impl Round for Point {
    fn round(&self) -> Self {
        Point {
            x: self.x.round(),
            y: self.y.round(),
        }
    }
}

impl Round for Size {
    fn round(&self) -> Self {
        Size {
            width: self.width.round(),
            height: self.height.round(),
        }
    }
}

pub trait IsWithin {
    fn is_within(&self, how_much: f64, other: Self) -> bool;
}

impl IsWithin for Rect {
    fn is_within(&self, how_much: f64, other: Self) -> bool {
        self.origin.is_within(how_much, other.origin) && self.size.is_within(how_much, other.size)
    }
}

impl IsWithin for Point {
    fn is_within(&self, how_much: f64, other: Self) -> bool {
        self.x.is_within(how_much, other.x) && self.y.is_within(how_much, other.y)
    }
}

impl IsWithin for Size {
    fn is_within(&self, how_much: f64, other: Self) -> bool {
        self.width.is_within(how_much, other.width) && self.height.is_within(how_much, other.height)
    }
}

impl IsWithin for f64 {
    fn is_within(&self, how_much: f64, other: Self) -> bool { (self - other).abs() < how_much }
}

pub trait SameAs: IsWithin + Sized {
    fn same_as(&self, other: Self) -> bool { self.is_within(0.1, other) }
}

impl SameAs for Rect {}
impl SameAs for Point {}
impl SameAs for Size {}

pub trait RectExt {
    fn contains(&self, point: Point) -> bool;
    fn contains_rect(&self, other: Self) -> bool;
}

impl RectExt for Rect {
    fn contains(&self, point: Point) -> bool {
        (self.min().x..=self.max().x).contains(&point.x)
            && (self.min().y..=self.max().y).contains(&point.y)
    }

    fn contains_rect(&self, other: Self) -> bool {
        self.min().x <= other.min().x
            && self.min().y <= other.min().y
            && self.max().x >= other.max().x
            && self.max().y >= other.max().y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_rect() {
        let rect = Rect::new(Point::new(10.4, 20.7), Size::new(100.0, 200.0));
        let rounded = rect.round();
        assert_eq!(rounded.origin.x, 10.0);
        assert_eq!(rounded.origin.y, 21.0);
        assert_eq!(rounded.size.width, 100.0);
        assert_eq!(rounded.size.height, 200.0);
    }

    #[test]
    fn test_is_within_rect() {
        let a = Rect::from_xywh(10.0, 20.0, 100.0, 200.0);
        let b = Rect::from_xywh(10.05, 20.08, 100.03, 200.02);
        assert!(a.is_within(0.1, b));
        assert!(!a.is_within(0.01, b));
        assert!(a.same_as(b));
    }

    #[test]
    fn test_outset_keeps_center() {
        let rect = Rect::from_xywh(40.0, 60.0, 100.0, 100.0);
        let outer = rect.outset(12.0);
        assert_eq!(outer, Rect::from_xywh(28.0, 48.0, 124.0, 124.0));
        assert!(outer.mid().same_as(rect.mid()));
        assert!(outer.contains_rect(rect));
    }

    #[test]
    fn test_contains_point() {
        let rect = Rect::from_xywh(0.0, 0.0, 100.0, 100.0);
        assert!(rect.contains(Point::new(50.0, 50.0)));
        assert!(rect.contains(Point::new(100.0, 100.0)));
        assert!(!rect.contains(Point::new(101.0, 50.0)));
        assert!(!rect.contains(Point::new(-1.0, 50.0)));
    }
}
