//! Pure spatial math for the desk.
//!
//! # Responsibility
//! - Turn pointer translations into directional decisions.
//! - Map drag deltas onto clamped normalized card positions.
//!
//! # Invariants
//! - Every function here is pure; no tree or session state is touched.

pub mod classifier;
pub mod placement;
