//! Box tree and path addressing.
//!
//! # Responsibility
//! - Own the single root box.
//! - Resolve `BoxPath` addresses for reads and writes.
//! - Build the first-run default tree.
//!
//! # Invariants
//! - Reads through an unresolvable path fall back to the root.
//! - Writes through an unresolvable path change nothing.
//! - The UI only addresses depth 0 and 1; deeper paths resolve but are
//!   never constructed by the session.

use super::card::{Card, CardId};
use super::card_box::{CardBox, SLOT_COUNT};
use crate::geometry::placement::NormPos;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub const DEFAULT_ROOT_NAME: &str = "Workspace";
pub const DEFAULT_CHILD_NAMES: [&str; SLOT_COUNT] = ["A", "B", "C", "D"];

const SEED_CARDS: [(&str, &str, f64, f64); 3] = [
    ("Welcome to your desk", "Tap to flip a card", 0.30, 0.30),
    ("Drag me around", "Cards stay where you drop them", 0.55, 0.42),
    ("Flick me to a box", "Throw toward an edge to move me", 0.40, 0.60),
];

/// Address of a box as a sequence of child slot indices from the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BoxPath(Vec<usize>);

impl BoxPath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn slot(index: usize) -> Self {
        Self(vec![index])
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    /// Slot index at depth 1, if this path addresses a root child.
    pub fn top_slot(&self) -> Option<usize> {
        self.0.first().copied()
    }
}

impl Display for BoxPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            return write!(f, "root");
        }
        let parts: Vec<String> = self.0.iter().map(usize::to_string).collect();
        write!(f, "root/{}", parts.join("/"))
    }
}

/// The whole desk: one root box owning everything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub root: CardBox,
}

impl Tree {
    pub fn new(root: CardBox) -> Self {
        Self { root }
    }

    /// Root "Workspace" with three seed cards and empty children A-D.
    pub fn default_tree() -> Self {
        let mut root = CardBox::new(DEFAULT_ROOT_NAME);
        root.cards = SEED_CARDS
            .iter()
            .map(|(front, back, px, py)| Card::new(*front, *back, NormPos::new(*px, *py)))
            .collect();
        root.children = DEFAULT_CHILD_NAMES
            .iter()
            .map(|name| CardBox::new(*name))
            .collect();
        Self { root }
    }

    /// Returns the addressed box, or the root when the path does not resolve.
    pub fn get(&self, path: &BoxPath) -> &CardBox {
        self.try_get(path).unwrap_or(&self.root)
    }

    pub fn try_get(&self, path: &BoxPath) -> Option<&CardBox> {
        path.indices()
            .iter()
            .try_fold(&self.root, |node, index| node.children.get(*index))
    }

    pub fn try_get_mut(&mut self, path: &BoxPath) -> Option<&mut CardBox> {
        path.indices()
            .iter()
            .try_fold(&mut self.root, |node, index| node.children.get_mut(*index))
    }

    /// Replaces the addressed box in place.
    ///
    /// Returns `false` and leaves the tree untouched when `path` does not resolve.
    pub fn set(&mut self, path: &BoxPath, next: CardBox) -> bool {
        match self.try_get_mut(path) {
            Some(slot) => {
                *slot = next;
                true
            }
            None => false,
        }
    }

    /// Path that `get` would actually read for `path`.
    pub fn resolve(&self, path: &BoxPath) -> BoxPath {
        if self.try_get(path).is_some() {
            path.clone()
        } else {
            BoxPath::root()
        }
    }

    /// Number of directional slots available to relocations.
    pub fn sibling_slots(&self) -> usize {
        self.root.children.len()
    }

    pub fn total_cards(&self) -> usize {
        self.root.total_cards()
    }

    /// Finds which box currently holds a card.
    pub fn locate_card(&self, id: CardId) -> Option<BoxPath> {
        fn walk(node: &CardBox, id: CardId, trail: &mut Vec<usize>) -> bool {
            if node.card(id).is_some() {
                return true;
            }
            for (index, child) in node.children.iter().enumerate() {
                trail.push(index);
                if walk(child, id, trail) {
                    return true;
                }
                trail.pop();
            }
            false
        }

        let mut trail = Vec::new();
        walk(&self.root, id, &mut trail).then(|| BoxPath(trail))
    }

    pub fn find_card(&self, id: CardId) -> Option<&Card> {
        let path = self.locate_card(id)?;
        self.try_get(&path)?.card(id)
    }
}
