//! Core engine for the Cardesk card organizer.
//! This crate is the single source of truth for desk state and its invariants;
//! the mobile shell only renders what it reports and forwards input events.

pub mod config;
pub mod db;
pub mod geometry;
pub mod logging;
pub mod model;
pub mod persist;
pub mod repo;
pub mod schedule;
pub mod service;

pub use config::DeskConfig;
pub use geometry::classifier::{boost, classify, Direction, Vector2};
pub use geometry::placement::{
    apply_drag, clamp_normalized, exit_position, DeskBounds, NormPos, PlacementRect,
};
pub use logging::{init_logging, init_logging_from, logging_status, LogConfig, LogLevel};
pub use model::card::{Card, CardId};
pub use model::card_box::{BoxId, CardBox, SLOT_COUNT};
pub use model::tree::{BoxPath, Tree};
pub use persist::gateway::{
    DefaultReason, LoadOutcome, PersistError, PersistenceGateway, SaveStatus, SNAPSHOT_KEY,
    SNAPSHOT_VERSION,
};
pub use repo::snapshot_repo::{SnapshotStore, SqliteSnapshotStore, StoreError, StoreResult};
pub use schedule::{Millis, TimerQueue};
pub use service::desk_session::{
    CardView, DeskError, DeskSession, Motion, ReleaseOutcome, TickReport,
};
pub use service::relocation::{NoMoveReason, ReleaseDecision};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
