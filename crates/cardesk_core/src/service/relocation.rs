//! Flick-to-move relocation protocol.
//!
//! # Responsibility
//! - Decide on release whether a card stays or leaves its box.
//! - Carry out the deferred structural move once the exit animation ends.
//!
//! # Invariants
//! - The flick direction comes from the *predicted* translation, never the
//!   actual release translation.
//! - A completed move removes exactly one card from the source and appends
//!   exactly one to the destination; total card count is unchanged.
//! - A missing card or box makes the move a no-op with no partial mutation.

use crate::config::DeskConfig;
use crate::geometry::classifier::{boost, classify, Direction, Vector2};
use crate::geometry::placement::{exit_position, random_position, NormPos, PlacementRect};
use crate::model::card::CardId;
use crate::model::tree::{BoxPath, Tree};
use rand::Rng;

/// Why a release left the card in its box.
#[derive(Debug, Clone, PartialEq)]
pub enum NoMoveReason {
    /// The root exposes fewer than four directional slots.
    MissingSlots { available: usize },
    /// Predicted-vs-actual divergence below the flick threshold.
    WeakFlick { boost: f64 },
    /// The predicted translation has no dominant direction.
    Unclassified,
    /// The flick targets the box the card is already in.
    SameBox,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReleaseDecision {
    NoMove(NoMoveReason),
    Exit {
        direction: Direction,
        destination: BoxPath,
    },
}

/// Classifies a drag release as a settle or a flick toward a sibling slot.
pub fn plan_release(
    actual: Vector2,
    predicted: Vector2,
    tree: &Tree,
    source: &BoxPath,
    config: &DeskConfig,
) -> ReleaseDecision {
    if !tree.root.has_full_slots() {
        return ReleaseDecision::NoMove(NoMoveReason::MissingSlots {
            available: tree.sibling_slots(),
        });
    }

    let strength = boost(actual, predicted);
    if strength.is_nan() || strength < config.flick_threshold {
        return ReleaseDecision::NoMove(NoMoveReason::WeakFlick { boost: strength });
    }

    let Some(direction) = classify(predicted, config.hover_threshold) else {
        return ReleaseDecision::NoMove(NoMoveReason::Unclassified);
    };

    let destination = BoxPath::slot(direction.slot());
    if &destination == source {
        return ReleaseDecision::NoMove(NoMoveReason::SameBox);
    }
    ReleaseDecision::Exit {
        direction,
        destination,
    }
}

/// A card mid-exit, waiting for its structural move.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRelocation {
    pub card_id: CardId,
    pub source: BoxPath,
    pub destination: BoxPath,
    pub direction: Direction,
    /// Off-desk position the card is animating toward.
    pub exit: NormPos,
}

impl PendingRelocation {
    pub fn new(
        card_id: CardId,
        from: NormPos,
        source: BoxPath,
        destination: BoxPath,
        direction: Direction,
    ) -> Self {
        Self {
            card_id,
            source,
            destination,
            direction,
            exit: exit_position(from, direction),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RelocationOutcome {
    Moved { landed_at: NormPos },
    CardMissing,
    DestinationMissing,
}

/// Moves the pending card into its destination at a random landing spot.
pub fn complete_relocation<R: Rng + ?Sized>(
    tree: &mut Tree,
    pending: &PendingRelocation,
    rng: &mut R,
    landing: PlacementRect,
) -> RelocationOutcome {
    if tree.try_get(&pending.destination).is_none() {
        return RelocationOutcome::DestinationMissing;
    }
    let Some(mut card) = tree
        .try_get_mut(&pending.source)
        .and_then(|source| source.take_card(pending.card_id))
    else {
        return RelocationOutcome::CardMissing;
    };

    let landed_at = random_position(rng, landing);
    card.set_position(landed_at);
    match tree.try_get_mut(&pending.destination) {
        Some(destination) => {
            destination.cards.push(card);
            RelocationOutcome::Moved { landed_at }
        }
        // Only reachable if the destination sat inside the removed card, which
        // cards cannot contain; put the card back rather than lose it.
        None => {
            if let Some(source) = tree.try_get_mut(&pending.source) {
                source.cards.push(card);
            }
            RelocationOutcome::DestinationMissing
        }
    }
}
