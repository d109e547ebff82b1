//! Normalized card placement on the desk.
//!
//! # Responsibility
//! - Apply zoom-scaled drag deltas to stored normalized positions.
//! - Clamp positions so cards stay fully visible.
//! - Compute off-desk exit targets and random landing spots.
//!
//! # Invariants
//! - `clamp_normalized` is idempotent.
//! - Positions produced by `apply_drag` always satisfy the desk margins.
//! - Only `exit_position` produces coordinates outside `[0, 1]`.

use super::classifier::{Direction, Vector2};
use rand::Rng;
use serde::{Deserialize, Serialize};

const EXIT_NEAR: f64 = -0.25;
const EXIT_FAR: f64 = 1.25;

/// Position relative to the desk, `(0, 0)` top-left and `(1, 1)` bottom-right.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NormPos {
    pub px: f64,
    pub py: f64,
}

impl NormPos {
    pub const fn new(px: f64, py: f64) -> Self {
        Self { px, py }
    }

    pub fn is_on_desk(self) -> bool {
        (0.0..=1.0).contains(&self.px) && (0.0..=1.0).contains(&self.py)
    }
}

/// Desk surface size and the keep-out margins at its edges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeskBounds {
    pub width: f64,
    pub height: f64,
    /// Left, right and top margin.
    pub margin: f64,
    /// Bottom margin; larger so cards clear the input bar.
    pub bottom_margin: f64,
}

impl Default for DeskBounds {
    fn default() -> Self {
        Self {
            width: 2000.0,
            height: 2000.0,
            margin: 30.0,
            bottom_margin: 120.0,
        }
    }
}

impl DeskBounds {
    /// Same margins, new surface size. Non-positive sizes keep the old value.
    pub fn resized(self, width: f64, height: f64) -> Self {
        let valid = |value: f64| value.is_finite() && value > 0.0;
        Self {
            width: if valid(width) { width } else { self.width },
            height: if valid(height) { height } else { self.height },
            ..self
        }
    }
}

/// Sub-rectangle of the desk, in normalized coordinates, used for landing spots.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementRect {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Default for PlacementRect {
    fn default() -> Self {
        Self {
            min_x: 0.18,
            max_x: 0.80,
            min_y: 0.20,
            max_y: 0.70,
        }
    }
}

impl PlacementRect {
    pub fn contains(&self, pos: NormPos) -> bool {
        (self.min_x..=self.max_x).contains(&pos.px) && (self.min_y..=self.max_y).contains(&pos.py)
    }
}

/// Moves `base` by `delta` screen units at camera `scale` and clamps the result.
pub fn apply_drag(base: NormPos, delta: Vector2, scale: f64, bounds: DeskBounds) -> NormPos {
    let scale = if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        1.0
    };
    let delta = if delta.is_finite() { delta } else { Vector2::ZERO };

    let x = clamp_axis(
        base.px * bounds.width + delta.dx / scale,
        bounds.margin,
        bounds.width - bounds.margin,
        bounds.width,
    );
    let y = clamp_axis(
        base.py * bounds.height + delta.dy / scale,
        bounds.margin,
        bounds.height - bounds.bottom_margin,
        bounds.height,
    );
    NormPos::new(x / bounds.width, y / bounds.height)
}

/// Clamps a stored position into the visible sub-range of the desk.
pub fn clamp_normalized(pos: NormPos, bounds: DeskBounds) -> NormPos {
    apply_drag(pos, Vector2::ZERO, 1.0, bounds)
}

/// Off-desk target a card animates toward before it is moved.
pub fn exit_position(pos: NormPos, direction: Direction) -> NormPos {
    match direction {
        Direction::Left => NormPos::new(EXIT_NEAR, pos.py),
        Direction::Right => NormPos::new(EXIT_FAR, pos.py),
        Direction::Up => NormPos::new(pos.px, EXIT_NEAR),
        Direction::Down => NormPos::new(pos.px, EXIT_FAR),
    }
}

/// Uniform random position inside `rect`.
///
/// Swapped bounds are read in order; a non-finite axis lands at the centre.
pub fn random_position<R: Rng + ?Sized>(rng: &mut R, rect: PlacementRect) -> NormPos {
    NormPos::new(
        sample_axis(rng, rect.min_x, rect.max_x),
        sample_axis(rng, rect.min_y, rect.max_y),
    )
}

fn sample_axis<R: Rng + ?Sized>(rng: &mut R, a: f64, b: f64) -> f64 {
    if !a.is_finite() || !b.is_finite() {
        return 0.5;
    }
    rng.gen_range(a.min(b)..=a.max(b))
}

fn clamp_axis(value: f64, low: f64, high: f64, size: f64) -> f64 {
    if high < low {
        return size / 2.0;
    }
    if value.is_nan() {
        return low;
    }
    value.clamp(low, high)
}

#[cfg(test)]
mod tests {
    use super::{
        apply_drag, clamp_normalized, exit_position, random_position, DeskBounds, NormPos,
        PlacementRect,
    };
    use crate::geometry::classifier::{Direction, Vector2};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn bounds() -> DeskBounds {
        DeskBounds {
            width: 1000.0,
            height: 800.0,
            margin: 30.0,
            bottom_margin: 100.0,
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn drag_delta_is_divided_by_zoom() {
        let moved = apply_drag(NormPos::new(0.5, 0.5), Vector2::new(100.0, -80.0), 2.0, bounds());
        assert!(close(moved.px, 0.55));
        assert!(close(moved.py, 0.45));
    }

    #[test]
    fn drag_clamps_to_margins() {
        let far = apply_drag(NormPos::new(0.5, 0.5), Vector2::new(10_000.0, 10_000.0), 1.0, bounds());
        assert!(close(far.px, 970.0 / 1000.0));
        assert!(close(far.py, 700.0 / 800.0));

        let near = apply_drag(NormPos::new(0.5, 0.5), Vector2::new(-10_000.0, -10_000.0), 1.0, bounds());
        assert!(close(near.px, 30.0 / 1000.0));
        assert!(close(near.py, 30.0 / 800.0));
    }

    #[test]
    fn invalid_zoom_behaves_like_unit_scale() {
        let base = NormPos::new(0.4, 0.4);
        let delta = Vector2::new(50.0, 0.0);
        let unit = apply_drag(base, delta, 1.0, bounds());
        assert_eq!(apply_drag(base, delta, 0.0, bounds()), unit);
        assert_eq!(apply_drag(base, delta, f64::NAN, bounds()), unit);
    }

    #[test]
    fn clamping_is_idempotent() {
        let inputs = [
            NormPos::new(-3.0, 7.0),
            NormPos::new(0.5, 0.5),
            NormPos::new(1.25, 0.3),
            NormPos::new(0.0, 1.0),
        ];
        for input in inputs {
            let once = clamp_normalized(input, bounds());
            let twice = clamp_normalized(once, bounds());
            assert!(close(once.px, twice.px) && close(once.py, twice.py), "{input:?}");
        }
    }

    #[test]
    fn degenerate_desk_centers_cards() {
        let tiny = DeskBounds {
            width: 40.0,
            height: 40.0,
            margin: 30.0,
            bottom_margin: 30.0,
        };
        let pos = clamp_normalized(NormPos::new(0.9, 0.1), tiny);
        assert_eq!(pos, NormPos::new(0.5, 0.5));
    }

    #[test]
    fn exit_positions_leave_the_desk_on_one_axis() {
        let pos = NormPos::new(0.4, 0.6);
        assert_eq!(exit_position(pos, Direction::Left), NormPos::new(-0.25, 0.6));
        assert_eq!(exit_position(pos, Direction::Right), NormPos::new(1.25, 0.6));
        assert_eq!(exit_position(pos, Direction::Up), NormPos::new(0.4, -0.25));
        assert_eq!(exit_position(pos, Direction::Down), NormPos::new(0.4, 1.25));
        for direction in Direction::ALL {
            assert!(!exit_position(pos, direction).is_on_desk());
        }
    }

    #[test]
    fn random_positions_stay_in_rect() {
        let rect = PlacementRect::default();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            assert!(rect.contains(random_position(&mut rng, rect)));
        }
    }

    #[test]
    fn swapped_placement_bounds_do_not_panic() {
        let swapped = PlacementRect {
            min_x: 0.8,
            max_x: 0.2,
            min_y: 0.6,
            max_y: 0.3,
        };
        let ordered = PlacementRect {
            min_x: 0.2,
            max_x: 0.8,
            min_y: 0.3,
            max_y: 0.6,
        };
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            assert!(ordered.contains(random_position(&mut rng, swapped)));
        }

        let broken = PlacementRect {
            min_x: f64::NAN,
            ..ordered
        };
        assert_eq!(random_position(&mut rng, broken).px, 0.5);
    }

    #[test]
    fn resized_ignores_invalid_sizes() {
        let resized = bounds().resized(0.0, 1200.0);
        assert_eq!(resized.width, 1000.0);
        assert_eq!(resized.height, 1200.0);
        assert_eq!(resized.margin, 30.0);
    }
}
