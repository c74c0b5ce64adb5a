//! Pixel delta events
//!
//! A [`Delta`] is produced once per committed `set_pixel` and fanned out
//! to every observer. On the wire it is the JSON array `[y, x, color]`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One committed single-cell mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Delta {
    /// Row of the mutated cell
    pub y: usize,
    /// Column of the mutated cell
    pub x: usize,
    /// New color code
    pub color: u8,
}

impl Delta {
    /// Create a new delta
    #[must_use]
    pub fn new(y: usize, x: usize, color: u8) -> Self {
        Self { y, x, color }
    }

    /// Encode as the text frame sent to observers
    pub fn to_wire(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl Serialize for Delta {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.y, self.x, self.color).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Delta {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (y, x, color) = <(usize, usize, u8)>::deserialize(deserializer)?;
        Ok(Self { y, x, color })
    }
}
