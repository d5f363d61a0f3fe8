// Zone geometry values: points, rectangles and areas.
//
// `Area` is a set of axis-aligned rectangles. It is coarse:
// it records what was exposed/hidden or marked as topology so the value can
// be replicated and queried, while exact polygon math belongs to whatever
// renders the zone. Adding a rectangle already covered is a no-op; subtracting
// removes every rectangle fully covered by the subtrahend.

use serde::{Deserialize, Serialize};

/// A point in zone coordinates (pixels, origin top-left).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ZonePoint {
    pub x: i32,
    pub y: i32,
}

impl ZonePoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in zone coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
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

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn contains_point(&self, p: ZonePoint) -> bool {
        p.x >= self.x && p.y >= self.y && p.x < self.x + self.width && p.y < self.y + self.height
    }

    /// True if `other` lies entirely inside `self`.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.x + other.width <= self.x + self.width
            && other.y + other.height <= self.y + self.height
    }
}

/// A set of rectangles treated as one region.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Area {
    rects: Vec<Rect>,
}

impl Area {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rects(rects: impl IntoIterator<Item = Rect>) -> Self {
        let mut area = Self::new();
        for rect in rects {
            area.add_rect(rect);
        }
        area
    }

    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    pub fn contains_point(&self, p: ZonePoint) -> bool {
        self.rects.iter().any(|r| r.contains_point(p))
    }

    pub fn add_rect(&mut self, rect: Rect) {
        if rect.is_empty() || self.rects.iter().any(|r| r.contains_rect(&rect)) {
            return;
        }
        self.rects.retain(|r| !rect.contains_rect(r));
        self.rects.push(rect);
    }

    /// Union `other` into this area.
    pub fn add(&mut self, other: &Area) {
        for rect in &other.rects {
            self.add_rect(*rect);
        }
    }

    /// Remove every rectangle of this area that `other` fully covers.
    pub fn subtract(&mut self, other: &Area) {
        self.rects
            .retain(|r| !other.rects.iter().any(|o| o.contains_rect(r)));
    }

    pub fn clear(&mut self) {
        self.rects.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_skips_covered_rects() {
        let mut area = Area::from_rects([Rect::new(0, 0, 100, 100)]);
        area.add_rect(Rect::new(10, 10, 5, 5));
        assert_eq!(area.rects().len(), 1);
    }

    #[test]
    fn add_absorbs_smaller_rects() {
        let mut area = Area::from_rects([Rect::new(10, 10, 5, 5), Rect::new(200, 200, 5, 5)]);
        area.add_rect(Rect::new(0, 0, 100, 100));
        assert_eq!(area.rects().len(), 2);
        assert!(area.contains_point(ZonePoint::new(50, 50)));
        assert!(area.contains_point(ZonePoint::new(201, 201)));
    }

    #[test]
    fn subtract_removes_covered_rects_only() {
        let mut area = Area::from_rects([Rect::new(0, 0, 10, 10), Rect::new(50, 50, 10, 10)]);
        area.subtract(&Area::from_rects([Rect::new(-5, -5, 20, 20)]));
        assert_eq!(area.rects(), &[Rect::new(50, 50, 10, 10)]);
    }

    #[test]
    fn empty_rects_are_ignored() {
        let area = Area::from_rects([Rect::new(0, 0, 0, 10)]);
        assert!(area.is_empty());
    }
}
