//! Flick and hover direction classification.
//!
//! # Responsibility
//! - Bin a 2D translation into one of four directions or no decision.
//! - Measure flick strength as predicted-vs-actual divergence.
//!
//! # Invariants
//! - Only the dominant axis wins; diagonals are never split.
//! - Ties (`|dx| == |dy|`) resolve to the horizontal axis.
//! - Slot mapping is fixed: Left=0, Right=1, Up=2, Down=3.

use serde::{Deserialize, Serialize};
use std::ops::Sub;

/// Displacement in desk units. Positive `dy` points down.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector2 {
    pub dx: f64,
    pub dy: f64,
}

impl Vector2 {
    pub const ZERO: Self = Self { dx: 0.0, dy: 0.0 };

    pub const fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }

    pub fn length(self) -> f64 {
        self.dx.hypot(self.dy)
    }

    pub fn is_finite(self) -> bool {
        self.dx.is_finite() && self.dy.is_finite()
    }
}

impl Sub for Vector2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.dx - rhs.dx, self.dy - rhs.dy)
    }
}

/// One of the four directional targets around the desk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Self::Left, Self::Right, Self::Up, Self::Down];

    /// Child slot index this direction targets.
    pub fn slot(self) -> usize {
        match self {
            Self::Left => 0,
            Self::Right => 1,
            Self::Up => 2,
            Self::Down => 3,
        }
    }

    pub fn from_slot(slot: usize) -> Option<Self> {
        Self::ALL.get(slot).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

/// Classifies a translation by its dominant axis.
///
/// Returns `None` when both components are below `threshold`, or when the
/// translation is not finite.
pub fn classify(translation: Vector2, threshold: f64) -> Option<Direction> {
    if !translation.is_finite() {
        return None;
    }
    let abs_x = translation.dx.abs();
    let abs_y = translation.dy.abs();
    if abs_x < threshold && abs_y < threshold {
        return None;
    }

    if abs_x >= abs_y {
        if translation.dx < 0.0 {
            Some(Direction::Left)
        } else {
            Some(Direction::Right)
        }
    } else if translation.dy < 0.0 {
        Some(Direction::Up)
    } else {
        Some(Direction::Down)
    }
}

/// Momentum carried past the release point.
pub fn boost(actual: Vector2, predicted: Vector2) -> f64 {
    (predicted - actual).length()
}
