//! Debounced snapshot gateway over a [`SnapshotStore`].
//!
//! # Responsibility
//! - Own the save debounce deadline.
//! - Encode the tree as a versioned JSON envelope at fire time.
//! - Decode snapshots, treating any mismatch as a first run.
//!
//! # Invariants
//! - Only the tree passed at fire time is written; nothing is captured when
//!   a save is scheduled.
//! - A failed write is logged and leaves the stored snapshot untouched.
//! - Load never fails; every problem degrades to the default tree.

use crate::model::card::CardId;
use crate::model::card_box::CardBox;
use crate::model::tree::Tree;
use crate::repo::snapshot_repo::{SnapshotStore, StoreError};
use crate::schedule::Millis;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Store key of the current snapshot schema.
pub const SNAPSHOT_KEY: &str = "desk_root_v2";
/// Envelope version written alongside the tree.
pub const SNAPSHOT_VERSION: u32 = 2;
/// Keys of retired schemas, removed on reset.
pub const LEGACY_SNAPSHOT_KEYS: &[&str] = &["desk_root_v1", "root_v1"];

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    version: u32,
    root: &'a CardBox,
}

#[derive(Deserialize)]
struct Envelope {
    version: u32,
    root: CardBox,
}

#[derive(Deserialize)]
struct VersionProbe {
    version: Option<u32>,
}

#[derive(Debug)]
pub enum PersistError {
    Encode(serde_json::Error),
    /// A card position is NaN or infinite and would not survive a round trip.
    NonFinitePosition(CardId),
    Store(StoreError),
}

impl Display for PersistError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Encode(err) => write!(f, "snapshot encode failed: {err}"),
            Self::NonFinitePosition(id) => write!(f, "card {id} has a non-finite position"),
            Self::Store(err) => write!(f, "snapshot write failed: {err}"),
        }
    }
}

impl Error for PersistError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Encode(err) => Some(err),
            Self::NonFinitePosition(_) => None,
            Self::Store(err) => Some(err),
        }
    }
}

impl From<StoreError> for PersistError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<serde_json::Error> for PersistError {
    fn from(value: serde_json::Error) -> Self {
        Self::Encode(value)
    }
}

/// Why `load` produced the default tree instead of a stored one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultReason {
    Missing,
    VersionMismatch { found: Option<u32> },
    Undecodable(String),
    StoreUnavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Restored,
    Defaulted(DefaultReason),
}

/// Result of one fired save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    Written,
    Failed,
}

pub struct PersistenceGateway<S: SnapshotStore> {
    store: S,
    debounce_ms: Millis,
    pending_due: Option<Millis>,
    writes: u64,
}

impl<S: SnapshotStore> PersistenceGateway<S> {
    pub fn new(store: S, debounce_ms: Millis) -> Self {
        Self {
            store,
            debounce_ms,
            pending_due: None,
            writes: 0,
        }
    }

    /// Loads the stored tree, or the default tree with an immediate save armed.
    pub fn load(&mut self, now: Millis) -> (Tree, LoadOutcome) {
        match self.read_snapshot() {
            Ok(tree) => {
                info!(
                    "event=snapshot_load module=persist status=ok key={} cards={}",
                    SNAPSHOT_KEY,
                    tree.total_cards()
                );
                (tree, LoadOutcome::Restored)
            }
            Err(reason) => {
                info!(
                    "event=snapshot_load module=persist status=default key={} reason={:?}",
                    SNAPSHOT_KEY, reason
                );
                self.schedule_immediate(now);
                (Tree::default_tree(), LoadOutcome::Defaulted(reason))
            }
        }
    }

    /// Restarts the debounce window; any earlier pending save is superseded.
    pub fn schedule_save(&mut self, now: Millis) {
        self.pending_due = Some(now.saturating_add(self.debounce_ms));
    }

    /// Arms a save that fires on the next poll.
    pub fn schedule_immediate(&mut self, now: Millis) {
        self.pending_due = Some(now);
    }

    pub fn pending_deadline(&self) -> Option<Millis> {
        self.pending_due
    }

    /// Writes `tree` if the debounce deadline has passed.
    pub fn poll(&mut self, now: Millis, tree: &Tree) -> Option<SaveStatus> {
        let due = self.pending_due?;
        if now < due {
            return None;
        }
        self.pending_due = None;
        match self.write(tree) {
            Ok(()) => Some(SaveStatus::Written),
            Err(err) => {
                error!(
                    "event=snapshot_save module=persist status=error key={} error={}",
                    SNAPSHOT_KEY, err
                );
                Some(SaveStatus::Failed)
            }
        }
    }

    /// Writes `tree` now, dropping any pending deadline.
    pub fn flush(&mut self, tree: &Tree) -> Result<(), PersistError> {
        self.pending_due = None;
        self.write(tree)
    }

    /// Deletes stored snapshots (current and legacy keys) and arms an immediate save.
    pub fn discard(&mut self, now: Millis) {
        for key in std::iter::once(SNAPSHOT_KEY).chain(LEGACY_SNAPSHOT_KEYS.iter().copied()) {
            if let Err(err) = self.store.delete(key) {
                warn!(
                    "event=snapshot_discard module=persist status=error key={} error={}",
                    key, err
                );
            }
        }
        self.schedule_immediate(now);
    }

    /// Successful writes since construction.
    pub fn writes(&self) -> u64 {
        self.writes
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn write(&mut self, tree: &Tree) -> Result<(), PersistError> {
        let encoded = encode_tree(tree)?;
        self.store.put(SNAPSHOT_KEY, &encoded)?;
        self.writes += 1;
        debug!(
            "event=snapshot_save module=persist status=ok key={} bytes={}",
            SNAPSHOT_KEY,
            encoded.len()
        );
        Ok(())
    }

    fn read_snapshot(&self) -> Result<Tree, DefaultReason> {
        let raw = self
            .store
            .get(SNAPSHOT_KEY)
            .map_err(|err| DefaultReason::StoreUnavailable(err.to_string()))?
            .ok_or(DefaultReason::Missing)?;
        decode_tree(&raw)
    }
}

/// Encodes a tree as the current snapshot envelope.
pub fn encode_tree(tree: &Tree) -> Result<String, PersistError> {
    ensure_finite(&tree.root)?;
    let envelope = EnvelopeRef {
        version: SNAPSHOT_VERSION,
        root: &tree.root,
    };
    Ok(serde_json::to_string(&envelope)?)
}

/// Decodes a snapshot envelope, rejecting other schema versions.
pub fn decode_tree(raw: &str) -> Result<Tree, DefaultReason> {
    let probe: VersionProbe = serde_json::from_str(raw)
        .map_err(|err| DefaultReason::Undecodable(err.to_string()))?;
    if probe.version != Some(SNAPSHOT_VERSION) {
        return Err(DefaultReason::VersionMismatch {
            found: probe.version,
        });
    }
    let envelope: Envelope =
        serde_json::from_str(raw).map_err(|err| DefaultReason::Undecodable(err.to_string()))?;
    debug_assert_eq!(envelope.version, SNAPSHOT_VERSION);
    Ok(Tree::new(envelope.root))
}

fn ensure_finite(node: &CardBox) -> Result<(), PersistError> {
    if let Some(card) = node
        .cards
        .iter()
        .find(|card| !card.px.is_finite() || !card.py.is_finite())
    {
        return Err(PersistError::NonFinitePosition(card.id));
    }
    node.children.iter().try_for_each(ensure_finite)
}

#[cfg(test)]
mod tests {
    use super::{
        decode_tree, encode_tree, DefaultReason, LoadOutcome, PersistError, PersistenceGateway,
        SaveStatus,
    };
    use crate::db::open_db_in_memory;
    use crate::model::tree::Tree;
    use crate::repo::snapshot_repo::SqliteSnapshotStore;

    fn gateway() -> PersistenceGateway<SqliteSnapshotStore> {
        let store = SqliteSnapshotStore::try_new(open_db_in_memory().unwrap()).unwrap();
        PersistenceGateway::new(store, 250)
    }

    #[test]
    fn defaulted_load_and_discard_fire_on_next_poll() {
        let mut gateway = gateway();
        let (tree, outcome) = gateway.load(40);
        assert_eq!(outcome, LoadOutcome::Defaulted(DefaultReason::Missing));
        assert_eq!(gateway.pending_deadline(), Some(40));

        gateway.schedule_save(50);
        assert_eq!(gateway.pending_deadline(), Some(300));
        gateway.discard(60);
        assert_eq!(gateway.pending_deadline(), Some(60));
        assert_eq!(gateway.poll(60, &tree), Some(SaveStatus::Written));
        assert_eq!(gateway.pending_deadline(), None);
        assert_eq!(gateway.writes(), 1);
    }

    #[test]
    fn envelope_round_trips_structure() {
        let mut tree = Tree::default_tree();
        tree.root.children[1].cards.push(tree.root.cards[0].clone());
        let decoded = decode_tree(&encode_tree(&tree).unwrap()).unwrap();
        assert_eq!(decoded, tree);
    }

    #[test]
    fn old_version_is_a_mismatch() {
        let raw = r#"{"version":1,"root":{"id":"x","name":"Old"}}"#;
        assert_eq!(
            decode_tree(raw).unwrap_err(),
            DefaultReason::VersionMismatch { found: Some(1) }
        );
    }

    #[test]
    fn unversioned_payload_is_a_mismatch() {
        let raw = r#"{"id":"00000000-0000-0000-0000-000000000000","name":"Legacy","cards":[]}"#;
        assert_eq!(
            decode_tree(raw).unwrap_err(),
            DefaultReason::VersionMismatch { found: None }
        );
    }

    #[test]
    fn garbage_is_undecodable() {
        assert!(matches!(
            decode_tree("not json").unwrap_err(),
            DefaultReason::Undecodable(_)
        ));
        assert!(matches!(
            decode_tree(r#"{"version":2,"root":{"name":3}}"#).unwrap_err(),
            DefaultReason::Undecodable(_)
        ));
    }

    #[test]
    fn non_finite_position_refuses_to_encode() {
        let mut tree = Tree::default_tree();
        tree.root.cards[2].px = f64::NAN;
        let id = tree.root.cards[2].id;
        assert!(matches!(
            encode_tree(&tree),
            Err(PersistError::NonFinitePosition(bad)) if bad == id
        ));
    }
}
