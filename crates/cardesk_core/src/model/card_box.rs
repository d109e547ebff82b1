//! Box (card container) domain model.
//!
//! # Invariants
//! - `cards` order is insertion order and doubles as render z-order.
//! - `children[i]` is the box targeted by `Direction::from_slot(i)`.

use super::card::{Card, CardId};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Number of directional child slots a populated box exposes.
pub const SLOT_COUNT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoxId(pub Uuid);

impl BoxId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BoxId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for BoxId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Named container of cards with up to four directional child boxes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardBox {
    pub id: BoxId,
    pub name: String,
    #[serde(default)]
    pub cards: Vec<Card>,
    #[serde(default)]
    pub children: Vec<CardBox>,
}

impl CardBox {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: BoxId::new(),
            name: name.into(),
            cards: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn card(&self, id: CardId) -> Option<&Card> {
        self.cards.iter().find(|card| card.id == id)
    }

    pub fn card_mut(&mut self, id: CardId) -> Option<&mut Card> {
        self.cards.iter_mut().find(|card| card.id == id)
    }

    /// Removes and returns a card, preserving the order of the rest.
    pub fn take_card(&mut self, id: CardId) -> Option<Card> {
        let index = self.cards.iter().position(|card| card.id == id)?;
        Some(self.cards.remove(index))
    }

    pub fn has_full_slots(&self) -> bool {
        self.children.len() >= SLOT_COUNT
    }

    /// Cards in this box and every descendant.
    pub fn total_cards(&self) -> usize {
        self.cards.len()
            + self
                .children
                .iter()
                .map(CardBox::total_cards)
                .sum::<usize>()
    }
}
