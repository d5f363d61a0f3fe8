// Free-floating text labels pinned to a zone position.

use serde::{Deserialize, Serialize};

use crate::types::Guid;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub id: Guid,
    pub text: String,
    pub x: i32,
    pub y: i32,
    pub show_background: bool,
    /// Packed 0xAARRGGBB colour.
    pub foreground: u32,
}

impl Label {
    pub fn new(text: impl Into<String>, x: i32, y: i32) -> Self {
        Self {
            id: Guid::new(),
            text: text.into(),
            x,
            y,
            show_background: true,
            foreground: 0xFF00_0000,
        }
    }
}
