//! Snapshot persistence for the box tree.
//!
//! # Responsibility
//! - Debounce tree changes into single snapshot writes.
//! - Load the last snapshot or fall back to the default tree.
//!
//! # Invariants
//! - The stored snapshot is only ever replaced by a complete, valid one.
//! - Schema changes bump both the key and the envelope version.

pub mod gateway;
