//! Process-wide desk state driven by UI input events.
//!
//! # Responsibility
//! - Own the box tree, navigation, camera, drag and exit overlays.
//! - Run the drag → release → exit → relocate sequence.
//! - Route every tree change to the debounced persistence gateway.
//!
//! # Invariants
//! - Live drag positions stay in the overlay; the tree sees only the final
//!   position at release, so intermediate moves never schedule a save.
//! - At most one relocation is pending per card; re-dragging a card cancels it.
//! - Not-found ids make operations return `false`/`None`, never an error.
//! - `current` always holds a path that resolves in the tree.

use crate::config::DeskConfig;
use crate::geometry::classifier::{classify, Direction, Vector2};
use crate::geometry::placement::{apply_drag, random_position, DeskBounds, NormPos};
use crate::model::card::{Card, CardId};
use crate::model::card_box::CardBox;
use crate::model::tree::{BoxPath, Tree};
use crate::persist::gateway::{LoadOutcome, PersistError, PersistenceGateway, SaveStatus};
use crate::repo::snapshot_repo::SnapshotStore;
use crate::schedule::{Millis, TimerQueue};
use crate::service::relocation::{
    complete_relocation, plan_release, NoMoveReason, PendingRelocation, RelocationOutcome,
    ReleaseDecision,
};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Input validation failures surfaced to the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeskError {
    /// Card front text is blank after trim.
    BlankText,
    /// Box name is blank after trim.
    BlankName,
}

impl Display for DeskError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankText => write!(f, "card text must not be blank"),
            Self::BlankName => write!(f, "box name must not be blank"),
        }
    }
}

impl Error for DeskError {}

/// How the renderer should move a card to its reported position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    /// Frame-synchronous, no interpolation (active drag).
    Instant,
    /// Eased transition (settle, flip, exit).
    Eased,
}

/// Render-ready card state for the current box.
#[derive(Debug, Clone, PartialEq)]
pub struct CardView {
    pub id: CardId,
    pub front: String,
    pub back: String,
    pub showing_back: bool,
    pub position: NormPos,
    pub motion: Motion,
    pub dragging: bool,
    pub exiting: bool,
}

#[derive(Debug, Clone)]
struct DragState {
    card_id: CardId,
    source: BoxPath,
    base: NormPos,
    live: NormPos,
}

/// Result of a pointer release.
#[derive(Debug, Clone, PartialEq)]
pub enum ReleaseOutcome {
    /// No drag was active.
    NotDragging,
    /// The dragged card disappeared mid-drag.
    CardMissing,
    /// Card keeps its last live position in the same box.
    Settled {
        position: NormPos,
        reason: NoMoveReason,
    },
    /// Card is animating off-desk; the move fires after the exit duration.
    Exiting {
        direction: Direction,
        destination: BoxPath,
        fires_at: Millis,
    },
}

/// What one `tick` did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub relocated: Vec<CardId>,
    /// Relocations whose card or destination was gone when they fired.
    pub skipped: Vec<CardId>,
    pub save: Option<SaveStatus>,
}

pub struct DeskSession<S: SnapshotStore> {
    config: DeskConfig,
    tree: Tree,
    current: BoxPath,
    zoom: f64,
    desk: DeskBounds,
    drag: Option<DragState>,
    hover: Option<Direction>,
    exiting: HashMap<CardId, PendingRelocation>,
    relocations: TimerQueue<CardId>,
    flipped: HashSet<CardId>,
    gateway: PersistenceGateway<S>,
    rng: StdRng,
    revision: u64,
    load_outcome: LoadOutcome,
}

impl<S: SnapshotStore> DeskSession<S> {
    /// Loads the stored tree (or the default) and starts at the root box.
    pub fn open(store: S, config: DeskConfig, now: Millis) -> Self {
        Self::open_with_rng(store, config, now, StdRng::from_entropy())
    }

    /// Like [`DeskSession::open`] with a caller-chosen RNG for landing spots.
    pub fn open_with_rng(store: S, config: DeskConfig, now: Millis, rng: StdRng) -> Self {
        let mut gateway = PersistenceGateway::new(store, config.save_debounce_ms);
        let (tree, load_outcome) = gateway.load(now);
        info!(
            "event=session_open module=session status=ok outcome={:?} cards={}",
            load_outcome,
            tree.total_cards()
        );
        Self {
            desk: config.desk,
            config,
            tree,
            current: BoxPath::root(),
            zoom: 1.0,
            drag: None,
            hover: None,
            exiting: HashMap::new(),
            relocations: TimerQueue::new(),
            flipped: HashSet::new(),
            gateway,
            rng,
            revision: 0,
            load_outcome,
        }
    }

    pub fn config(&self) -> &DeskConfig {
        &self.config
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn gateway(&self) -> &PersistenceGateway<S> {
        &self.gateway
    }

    pub fn load_outcome(&self) -> &LoadOutcome {
        &self.load_outcome
    }

    /// Bumped on every visible change; the UI redraws when it moves.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn current_path(&self) -> &BoxPath {
        &self.current
    }

    pub fn current_box(&self) -> &CardBox {
        self.tree.get(&self.current)
    }

    /// Labels of the four directional targets, in slot order.
    pub fn child_names(&self) -> Vec<String> {
        self.tree
            .root
            .children
            .iter()
            .map(|child| child.name.clone())
            .collect()
    }

    /// Direction currently lit up by an active drag.
    pub fn hover_target(&self) -> Option<Direction> {
        self.hover
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn is_relocation_pending(&self, card_id: CardId) -> bool {
        self.relocations.is_pending(&card_id)
    }

    /// Earliest moment `tick` has work to do.
    pub fn next_deadline(&self) -> Option<Millis> {
        match (
            self.relocations.next_deadline(),
            self.gateway.pending_deadline(),
        ) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Cards of the current box with overlay positions applied.
    pub fn cards(&self) -> Vec<CardView> {
        self.current_box()
            .cards
            .iter()
            .map(|card| self.view_of(card))
            .collect()
    }

    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.desk = self.desk.resized(width, height);
        self.revision += 1;
    }

    pub fn set_zoom(&mut self, scale: f64) {
        self.zoom = self.config.clamp_zoom(scale);
        self.revision += 1;
    }

    /// Appends a single-sided card to the current box.
    pub fn add_card(&mut self, text: &str, now: Millis) -> Result<CardId, DeskError> {
        self.add_card_with_back(text, "", now)
    }

    /// Appends a card at a random landing spot of the current box.
    pub fn add_card_with_back(
        &mut self,
        front: &str,
        back: &str,
        now: Millis,
    ) -> Result<CardId, DeskError> {
        let front = normalize_text(front).ok_or(DeskError::BlankText)?;
        let position = random_position(&mut self.rng, self.config.placement);
        let card = Card::new(front, back.trim(), position);
        let card_id = card.id;

        let path = self.current.clone();
        let mut target = self.tree.get(&path).clone();
        target.cards.push(card);
        self.write_box(&path, target, now);
        info!(
            "event=card_add module=session status=ok box={} card={}",
            self.current, card_id
        );
        Ok(card_id)
    }

    /// Replaces both sides of a card in the current box.
    ///
    /// Returns `Ok(false)` when the card is not in the current box.
    pub fn edit_card(
        &mut self,
        card_id: CardId,
        front: &str,
        back: &str,
        now: Millis,
    ) -> Result<bool, DeskError> {
        let front = normalize_text(front).ok_or(DeskError::BlankText)?;
        let path = self.current.clone();
        let mut target = self.tree.get(&path).clone();
        let Some(card) = target.card_mut(card_id) else {
            return Ok(false);
        };
        card.front = front;
        card.back = back.trim().to_string();
        self.write_box(&path, target, now);
        Ok(true)
    }

    /// Toggles which side of a card is shown. Not persisted.
    pub fn flip_card(&mut self, card_id: CardId) -> bool {
        if self.current_box().card(card_id).is_none() {
            return false;
        }
        if !self.flipped.remove(&card_id) {
            self.flipped.insert(card_id);
        }
        self.revision += 1;
        true
    }

    /// Deletes a card from whichever box holds it.
    pub fn delete_card(&mut self, card_id: CardId, now: Millis) -> bool {
        let Some(path) = self.tree.locate_card(card_id) else {
            return false;
        };
        let mut target = self.tree.get(&path).clone();
        if target.take_card(card_id).is_none() {
            return false;
        }
        self.forget_card(card_id);
        self.write_box(&path, target, now);
        info!(
            "event=card_delete module=session status=ok box={} card={}",
            path, card_id
        );
        true
    }

    /// Renames the addressed box. Returns `Ok(false)` for an unresolvable path.
    pub fn rename_box(
        &mut self,
        path: &BoxPath,
        name: &str,
        now: Millis,
    ) -> Result<bool, DeskError> {
        let name = normalize_text(name).ok_or(DeskError::BlankName)?;
        let Some(existing) = self.tree.try_get(path) else {
            return Ok(false);
        };
        let mut target = existing.clone();
        target.name = name;
        self.write_box(path, target, now);
        Ok(true)
    }

    /// Opens a root child by directional slot; returns the slot on success.
    pub fn open_child(&mut self, slot: usize) -> Option<usize> {
        let path = BoxPath::slot(slot);
        self.tree.try_get(&path)?;
        self.cancel_drag();
        self.current = path;
        self.revision += 1;
        debug!("event=navigate module=session status=ok box={}", self.current);
        Some(slot)
    }

    pub fn navigate_root(&mut self) {
        self.cancel_drag();
        self.current = BoxPath::root();
        self.revision += 1;
        debug!("event=navigate module=session status=ok box=root");
    }

    /// Pointer-down on a card of the current box.
    ///
    /// Cancels a pending relocation of the same card, which snaps back to its
    /// last committed position.
    pub fn begin_drag(&mut self, card_id: CardId) -> bool {
        let Some(base) = self.current_box().card(card_id).map(Card::position) else {
            return false;
        };
        self.cancel_drag();
        if self.relocations.cancel(&card_id) {
            self.exiting.remove(&card_id);
            debug!(
                "event=relocation_cancel module=session status=ok card={}",
                card_id
            );
        }
        self.drag = Some(DragState {
            card_id,
            source: self.current.clone(),
            base,
            live: base,
        });
        self.revision += 1;
        true
    }

    /// Live pointer move; returns the lit-up target, if any.
    pub fn update_drag(&mut self, translation: Vector2) -> Option<Direction> {
        let drag = self.drag.as_mut()?;
        drag.live = apply_drag(drag.base, translation, self.zoom, self.desk);
        self.hover = classify(translation, self.config.hover_threshold);
        self.revision += 1;
        self.hover
    }

    /// Drops the active drag without committing its live position.
    pub fn cancel_drag(&mut self) {
        if self.drag.take().is_some() {
            self.hover = None;
            self.revision += 1;
        }
    }

    /// Pointer-up: commits the final position, then settles or starts an exit.
    pub fn end_drag(
        &mut self,
        translation: Vector2,
        predicted: Vector2,
        now: Millis,
    ) -> ReleaseOutcome {
        let Some(drag) = self.drag.take() else {
            return ReleaseOutcome::NotDragging;
        };
        self.hover = None;
        self.revision += 1;

        let position = apply_drag(drag.base, translation, self.zoom, self.desk);
        let Some(mut source) = self.tree.try_get(&drag.source).cloned() else {
            return ReleaseOutcome::CardMissing;
        };
        let Some(card) = source.card_mut(drag.card_id) else {
            return ReleaseOutcome::CardMissing;
        };
        if card.position() != position {
            card.set_position(position);
            self.write_box(&drag.source, source, now);
        }

        match plan_release(translation, predicted, &self.tree, &drag.source, &self.config) {
            ReleaseDecision::NoMove(reason) => {
                debug!(
                    "event=drag_release module=session status=settle card={} reason={:?}",
                    drag.card_id, reason
                );
                ReleaseOutcome::Settled { position, reason }
            }
            ReleaseDecision::Exit {
                direction,
                destination,
            } => {
                let fires_at = now.saturating_add(self.config.exit_duration_ms);
                let pending = PendingRelocation::new(
                    drag.card_id,
                    position,
                    drag.source,
                    destination.clone(),
                    direction,
                );
                self.exiting.insert(drag.card_id, pending);
                self.relocations.arm(drag.card_id, fires_at);
                info!(
                    "event=drag_release module=session status=exit card={} direction={} destination={}",
                    drag.card_id,
                    direction.as_str(),
                    destination
                );
                ReleaseOutcome::Exiting {
                    direction,
                    destination,
                    fires_at,
                }
            }
        }
    }

    /// Advances timers: completes due relocations, then fires a due save.
    pub fn tick(&mut self, now: Millis) -> TickReport {
        let mut report = TickReport::default();
        for card_id in self.relocations.take_due(now) {
            let Some(pending) = self.exiting.remove(&card_id) else {
                report.skipped.push(card_id);
                continue;
            };
            let outcome = complete_relocation(
                &mut self.tree,
                &pending,
                &mut self.rng,
                self.config.placement,
            );
            match outcome {
                RelocationOutcome::Moved { landed_at } => {
                    self.flipped.remove(&card_id);
                    self.mark_changed(now);
                    info!(
                        "event=relocation module=session status=ok card={} from={} to={} px={:.3} py={:.3}",
                        card_id, pending.source, pending.destination, landed_at.px, landed_at.py
                    );
                    report.relocated.push(card_id);
                }
                RelocationOutcome::CardMissing | RelocationOutcome::DestinationMissing => {
                    self.revision += 1;
                    debug!(
                        "event=relocation module=session status=skip card={} outcome={:?}",
                        card_id, outcome
                    );
                    report.skipped.push(card_id);
                }
            }
        }
        report.save = self.gateway.poll(now, &self.tree);
        report
    }

    /// Writes the current tree immediately.
    pub fn flush(&mut self) -> Result<(), PersistError> {
        self.gateway.flush(&self.tree)
    }

    /// Discards stored state and every pending timer, then restores the default tree.
    pub fn reset(&mut self, now: Millis) {
        self.drag = None;
        self.hover = None;
        self.exiting.clear();
        self.relocations.clear();
        self.flipped.clear();
        self.tree = Tree::default_tree();
        self.current = BoxPath::root();
        self.gateway.discard(now);
        self.revision += 1;
        info!("event=session_reset module=session status=ok");
    }

    fn view_of(&self, card: &Card) -> CardView {
        let dragged = self
            .drag
            .as_ref()
            .filter(|drag| drag.card_id == card.id)
            .map(|drag| drag.live);
        let exit = self.exiting.get(&card.id).map(|pending| pending.exit);
        let (position, motion) = match (dragged, exit) {
            (Some(live), _) => (live, Motion::Instant),
            (None, Some(exit)) => (exit, Motion::Eased),
            (None, None) => (card.position(), Motion::Eased),
        };
        CardView {
            id: card.id,
            front: card.front.clone(),
            back: card.back.clone(),
            showing_back: self.flipped.contains(&card.id),
            position,
            motion,
            dragging: dragged.is_some(),
            exiting: exit.is_some(),
        }
    }

    fn write_box(&mut self, path: &BoxPath, next: CardBox, now: Millis) {
        if self.tree.set(path, next) {
            self.mark_changed(now);
        }
    }

    fn mark_changed(&mut self, now: Millis) {
        self.revision += 1;
        self.gateway.schedule_save(now);
    }

    fn forget_card(&mut self, card_id: CardId) {
        self.relocations.cancel(&card_id);
        self.exiting.remove(&card_id);
        self.flipped.remove(&card_id);
        if self
            .drag
            .as_ref()
            .is_some_and(|drag| drag.card_id == card_id)
        {
            self.cancel_drag();
        }
    }
}

fn normalize_text(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
