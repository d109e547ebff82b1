//! Durable key-value storage behind the persistence gateway.
//!
//! # Responsibility
//! - Define the `SnapshotStore` contract the gateway writes through.
//! - Keep SQL details inside the repository boundary.
//!
//! # Invariants
//! - A failed `put` leaves the previous value for that key intact.

pub mod snapshot_repo;
