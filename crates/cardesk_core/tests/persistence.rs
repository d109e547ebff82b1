use cardesk_core::db::migrations::latest_version;
use cardesk_core::db::{open_db, open_db_in_memory, DbError};
use cardesk_core::persist::gateway::encode_tree;
use cardesk_core::{
    BoxPath, DefaultReason, DeskConfig, DeskSession, LoadOutcome, NoMoveReason, ReleaseOutcome,
    SaveStatus, SnapshotStore, SqliteSnapshotStore, StoreError, StoreResult, Tree, Vector2,
    SNAPSHOT_KEY,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rusqlite::Connection;
use std::cell::Cell;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

fn memory_store() -> SqliteSnapshotStore {
    SqliteSnapshotStore::try_new(open_db_in_memory().unwrap()).unwrap()
}

fn file_store(path: &Path) -> SqliteSnapshotStore {
    SqliteSnapshotStore::try_new(open_db(path).unwrap()).unwrap()
}

fn open<S: SnapshotStore>(store: S) -> DeskSession<S> {
    DeskSession::open_with_rng(store, DeskConfig::default(), 0, StdRng::seed_from_u64(3))
}

/// In-memory store whose writes can be switched to fail from outside the session.
#[derive(Default)]
struct FlakyStore {
    values: HashMap<String, String>,
    fail_writes: Rc<Cell<bool>>,
}

impl SnapshotStore for FlakyStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: &str) -> StoreResult<()> {
        if self.fail_writes.get() {
            return Err(StoreError::Db(DbError::Sqlite(rusqlite::Error::InvalidQuery)));
        }
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> StoreResult<()> {
        self.values.remove(key);
        Ok(())
    }
}

#[test]
fn first_run_uses_default_tree_and_saves_immediately() {
    let mut session = open(memory_store());
    assert_eq!(
        session.load_outcome(),
        &LoadOutcome::Defaulted(DefaultReason::Missing)
    );
    assert_eq!(session.next_deadline(), Some(0));

    let report = session.tick(0);
    assert_eq!(report.save, Some(SaveStatus::Written));
    assert_eq!(
        session.gateway().store().write_count(SNAPSHOT_KEY).unwrap(),
        1
    );
}

#[test]
fn burst_of_mutations_produces_one_write_with_final_state() {
    let mut session = open(memory_store());
    session.tick(0);

    for (index, now) in [10u64, 60, 120, 180, 240].into_iter().enumerate() {
        session.add_card(&format!("burst {index}"), now).unwrap();
    }
    assert!(session.tick(489).save.is_none());
    assert_eq!(session.tick(490).save, Some(SaveStatus::Written));
    assert!(session.tick(5_000).save.is_none());

    let store = session.gateway().store();
    assert_eq!(store.write_count(SNAPSHOT_KEY).unwrap(), 2);
    let raw = store.get(SNAPSHOT_KEY).unwrap().unwrap();
    assert!(raw.contains("burst 4"));
    assert_eq!(session.gateway().writes(), 2);
}

#[test]
fn snapshot_round_trips_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("desk.sqlite3");

    let expected = {
        let mut session = open(file_store(&path));
        session.open_child(1);
        session.add_card("kept in B", 10).unwrap();
        session.navigate_root();
        session
            .rename_box(&BoxPath::root(), "My desk", 20)
            .unwrap();
        session.flush().unwrap();
        session.tree().clone()
    };

    let reopened = open(file_store(&path));
    assert_eq!(reopened.load_outcome(), &LoadOutcome::Restored);
    assert_eq!(reopened.tree(), &expected);
    assert_eq!(reopened.tree().get(&BoxPath::slot(1)).cards[0].front, "kept in B");
}

#[test]
fn relocation_survives_reopen_via_debounced_save() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("desk.sqlite3");

    let card = {
        let mut session = open(file_store(&path));
        let card = session.tree().root.cards[0].id;
        session.begin_drag(card);
        session.end_drag(Vector2::new(0.0, -30.0), Vector2::new(0.0, -500.0), 1_000);
        session.tick(1_200);
        session.tick(1_450);
        card
    };

    let reopened = open(file_store(&path));
    assert_eq!(reopened.tree().locate_card(card), Some(BoxPath::slot(2)));
    assert_eq!(reopened.tree().total_cards(), 3);
}

#[test]
fn old_schema_snapshot_yields_default_tree() {
    let mut store = memory_store();
    store
        .put(
            SNAPSHOT_KEY,
            r#"{"version":1,"root":{"id":"legacy","name":"Old","cards":[{"id":"c","text":"hi","px":0.5,"py":0.5}]}}"#,
        )
        .unwrap();

    let session = open(store);
    assert_eq!(
        session.load_outcome(),
        &LoadOutcome::Defaulted(DefaultReason::VersionMismatch { found: Some(1) })
    );
    let tree = session.tree();
    assert_eq!(tree.root.name, "Workspace");
    assert_eq!(tree.root.cards.len(), 3);
    assert_eq!(session.child_names(), vec!["A", "B", "C", "D"]);
    assert_eq!(session.next_deadline(), Some(0));
}

#[test]
fn corrupt_snapshot_yields_default_tree() {
    let mut store = memory_store();
    store.put(SNAPSHOT_KEY, "{ not json").unwrap();
    let session = open(store);
    assert!(matches!(
        session.load_outcome(),
        LoadOutcome::Defaulted(DefaultReason::Undecodable(_))
    ));
    assert_eq!(session.tree().total_cards(), 3);
}

#[test]
fn failed_write_keeps_previous_snapshot() {
    let fail_writes = Rc::new(Cell::new(false));
    let mut session = open(FlakyStore {
        values: HashMap::new(),
        fail_writes: Rc::clone(&fail_writes),
    });
    assert_eq!(session.tick(0).save, Some(SaveStatus::Written));
    let before = session.gateway().store().values[SNAPSHOT_KEY].clone();

    fail_writes.set(true);
    session.add_card("never stored", 10).unwrap();
    assert_eq!(session.tick(260).save, Some(SaveStatus::Failed));
    assert_eq!(session.gateway().store().values[SNAPSHOT_KEY], before);
    assert_eq!(session.gateway().writes(), 1);

    fail_writes.set(false);
    assert!(session.flush().is_ok());
    assert!(session.gateway().store().values[SNAPSHOT_KEY].contains("never stored"));
}

#[test]
fn missing_slots_in_stored_tree_block_relocation() {
    let mut tree = Tree::default_tree();
    tree.root.children.truncate(3);
    let mut store = memory_store();
    store.put(SNAPSHOT_KEY, &encode_tree(&tree).unwrap()).unwrap();

    let mut session = open(store);
    assert_eq!(session.load_outcome(), &LoadOutcome::Restored);
    let card = session.tree().root.cards[0].id;
    session.begin_drag(card);
    let outcome = session.end_drag(Vector2::ZERO, Vector2::new(5_000.0, 0.0), 100);
    assert!(matches!(
        outcome,
        ReleaseOutcome::Settled {
            reason: NoMoveReason::MissingSlots { available: 3 },
            ..
        }
    ));
    session.tick(1_000);
    assert_eq!(session.tree().root.cards.len(), 3);
}

#[test]
fn reset_discards_stored_snapshot() {
    let mut session = open(memory_store());
    session.add_card("temporary", 0).unwrap();
    session.flush().unwrap();

    session.reset(100);
    assert_eq!(session.gateway().store().get(SNAPSHOT_KEY).unwrap(), None);
    assert_eq!(session.tick(100).save, Some(SaveStatus::Written));

    let raw = session.gateway().store().get(SNAPSHOT_KEY).unwrap().unwrap();
    assert!(!raw.contains("temporary"));
}

#[test]
fn newer_store_schema_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 99;").unwrap();
    drop(conn);

    match open_db(&path) {
        Err(DbError::SchemaTooNew { found, supported }) => {
            assert_eq!(found, 99);
            assert_eq!(supported, latest_version());
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("newer schema must be refused"),
    }
}

#[test]
fn reopening_store_file_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("desk.sqlite3");
    drop(file_store(&path));
    let store = file_store(&path);
    let version: u32 = store
        .connection()
        .query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(version, latest_version());
}
