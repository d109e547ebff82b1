//! Desk domain model: cards, boxes and the box tree.
//!
//! # Responsibility
//! - Define the persisted shapes of cards and boxes.
//! - Provide path-addressed read/write access to the tree.
//!
//! # Invariants
//! - A box exclusively owns its cards and child boxes (strict tree).
//! - Card and box ids are stable v4 UUIDs and never reused.
//! - The root's children, once populated, are exactly four fixed slots.

pub mod card;
pub mod card_box;
pub mod tree;
