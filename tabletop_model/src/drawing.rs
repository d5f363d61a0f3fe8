// Freehand drawings on a zone.
//
// A `DrawnElement` pairs a `Drawable` (its shape and identity) with the
// `Pen` it was drawn with. Drawings are stored per zone in insertion order;
// that order is also paint order.

use serde::{Deserialize, Serialize};

use crate::geom::{Rect, ZonePoint};
use crate::types::{Guid, Layer};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pen {
    /// Packed 0xAARRGGBB colour.
    pub color: u32,
    pub width: u32,
    /// 0 = transparent, 255 = opaque.
    pub opacity: u8,
    pub eraser: bool,
    pub filled: bool,
}

impl Default for Pen {
    fn default() -> Self {
        Self {
            color: 0xFF00_0000,
            width: 3,
            opacity: 255,
            eraser: false,
            filled: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Shape {
    Line { points: Vec<ZonePoint> },
    Rectangle(Rect),
    Oval(Rect),
    Text { at: ZonePoint, text: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Drawable {
    pub id: Guid,
    pub layer: Layer,
    pub shape: Shape,
}

impl Drawable {
    pub fn new(layer: Layer, shape: Shape) -> Self {
        Self {
            id: Guid::new(),
            layer,
            shape,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawnElement {
    pub drawable: Drawable,
    pub pen: Pen,
}

impl DrawnElement {
    pub fn id(&self) -> Guid {
        self.drawable.id
    }
}
