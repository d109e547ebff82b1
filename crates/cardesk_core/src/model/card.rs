//! Card domain model.

use crate::geometry::placement::NormPos;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of a card across moves between boxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(pub Uuid);

impl CardId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CardId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for CardId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A two-sided card placed on its box's desk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub front: String,
    /// Empty for single-sided cards.
    #[serde(default)]
    pub back: String,
    /// Normalized position; see [`NormPos`].
    pub px: f64,
    pub py: f64,
}

impl Card {
    /// Creates a card with a fresh id.
    pub fn new(front: impl Into<String>, back: impl Into<String>, pos: NormPos) -> Self {
        Self {
            id: CardId::new(),
            front: front.into(),
            back: back.into(),
            px: pos.px,
            py: pos.py,
        }
    }

    pub fn position(&self) -> NormPos {
        NormPos::new(self.px, self.py)
    }

    pub fn set_position(&mut self, pos: NormPos) {
        self.px = pos.px;
        self.py = pos.py;
    }
}
