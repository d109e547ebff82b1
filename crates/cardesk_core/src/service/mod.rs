//! Desk use-case services.
//!
//! # Responsibility
//! - Orchestrate geometry, tree and persistence into UI-facing operations.
//! - Keep the UI shell decoupled from storage and timing details.

pub mod desk_session;
pub mod relocation;
