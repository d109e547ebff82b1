//! FFI use-case API for the Flutter desk shell.
//!
//! # Responsibility
//! - Expose the desk session as sync, string-friendly calls via FRB.
//! - Own the one process-wide session and the monotonic clock feeding it.
//!
//! # Invariants
//! - Exported functions never panic across the FFI boundary.
//! - Every call that changes state runs `tick` first, so due relocations and
//!   saves land before the shell observes the result.
//! - Card ids cross the boundary as UUID strings.

use cardesk_core::db::open_db;
use cardesk_core::{
    core_version as core_version_inner, init_logging_from, ping as ping_inner, BoxPath, CardId,
    CardView, DeskConfig, DeskSession, Direction, Millis, Motion, ReleaseOutcome,
    SqliteSnapshotStore, Vector2,
};
use log::warn;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use std::time::Instant;
use uuid::Uuid;

const DESK_DB_FILE_NAME: &str = "cardesk.sqlite3";
const DESK_DB_PATH_ENV: &str = "CARDESK_DB_PATH";

type Session = DeskSession<SqliteSnapshotStore>;

static DESK: Mutex<Option<Session>> = Mutex::new(None);
static CLOCK_ORIGIN: OnceLock<Instant> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Starts rolling file logs once per process.
///
/// Returns an empty string on success and an error message otherwise.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_from(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Generic action envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeskActionResponse {
    pub ok: bool,
    /// Card id touched or created by the action, when there is one.
    pub card_id: Option<String>,
    pub message: String,
}

impl DeskActionResponse {
    fn success(message: impl Into<String>, card_id: Option<String>) -> Self {
        Self {
            ok: true,
            card_id,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            card_id: None,
            message: message.into(),
        }
    }
}

/// One card as the shell draws it.
#[derive(Debug, Clone, PartialEq)]
pub struct DeskCardItem {
    pub card_id: String,
    pub front: String,
    pub back: String,
    pub showing_back: bool,
    pub px: f64,
    pub py: f64,
    /// `false` while dragging: apply the position without animation.
    pub animate: bool,
    pub dragging: bool,
    pub exiting: bool,
}

/// Everything the shell needs to redraw the desk.
#[derive(Debug, Clone, PartialEq)]
pub struct DeskViewResponse {
    pub ok: bool,
    pub box_name: String,
    /// `None` at the root, otherwise the open child slot.
    pub open_slot: Option<u32>,
    /// Target labels in slot order: left, right, top, bottom.
    pub target_names: Vec<String>,
    pub hover_target: Option<String>,
    pub cards: Vec<DeskCardItem>,
    pub revision: u64,
    pub message: String,
}

/// Outcome of a pointer release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeskReleaseResponse {
    pub ok: bool,
    /// `settled`, `exiting`, `missing` or `idle`.
    pub outcome: String,
    pub direction: Option<String>,
    pub destination_slot: Option<u32>,
    pub message: String,
}

/// Opens (or reopens) the desk session.
///
/// `db_path` overrides `CARDESK_DB_PATH`; both fall back to the temp directory.
/// A previous session is flushed and closed before the store is read, so an
/// edit still inside its debounce window is part of what gets loaded.
#[flutter_rust_bridge::frb(sync)]
pub fn desk_open(db_path: Option<String>) -> DeskActionResponse {
    let mut slot = match DESK.lock() {
        Ok(slot) => slot,
        Err(_) => return DeskActionResponse::failure("desk_open failed: session lock poisoned"),
    };
    if let Some(mut previous) = slot.take() {
        previous.tick(now_ms());
        if let Err(err) = previous.flush() {
            warn!("event=desk_reopen module=ffi status=error error={err}");
        }
    }

    let path = resolve_db_path(db_path);
    let conn = match open_db(&path) {
        Ok(conn) => conn,
        Err(err) => return DeskActionResponse::failure(format!("desk_open failed: {err}")),
    };
    let store = match SqliteSnapshotStore::try_new(conn) {
        Ok(store) => store,
        Err(err) => return DeskActionResponse::failure(format!("desk_open failed: {err}")),
    };
    let session = DeskSession::open(store, DeskConfig::default(), now_ms());
    let message = format!("Desk opened ({:?}).", session.load_outcome());
    *slot = Some(session);
    DeskActionResponse::success(message, None)
}

/// Current box, targets, hover state and cards.
#[flutter_rust_bridge::frb(sync)]
pub fn desk_view() -> DeskViewResponse {
    with_session(|session| Ok(view_response(session))).unwrap_or_else(|message| {
        DeskViewResponse {
            ok: false,
            box_name: String::new(),
            open_slot: None,
            target_names: Vec::new(),
            hover_target: None,
            cards: Vec::new(),
            revision: 0,
            message,
        }
    })
}

/// Runs due relocations and saves; returns the new revision.
#[flutter_rust_bridge::frb(sync)]
pub fn desk_tick() -> u64 {
    with_session(|session| Ok(session.revision())).unwrap_or(0)
}

#[flutter_rust_bridge::frb(sync)]
pub fn desk_set_viewport(width: f64, height: f64, zoom: f64) -> DeskActionResponse {
    action(|session, _| {
        session.set_viewport(width, height);
        session.set_zoom(zoom);
        Ok(DeskActionResponse::success("Viewport updated.", None))
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn desk_begin_drag(card_id: String) -> DeskActionResponse {
    action(|session, _| {
        let id = parse_card_id(&card_id)?;
        if session.begin_drag(id) {
            Ok(DeskActionResponse::success("Drag started.", Some(card_id)))
        } else {
            Ok(DeskActionResponse::failure("Card not found in current box."))
        }
    })
}

/// Live pointer move; returns the lit-up target name, if any.
#[flutter_rust_bridge::frb(sync)]
pub fn desk_update_drag(dx: f64, dy: f64) -> Option<String> {
    with_session(|session| {
        Ok(session
            .update_drag(Vector2::new(dx, dy))
            .map(|direction| direction.as_str().to_string()))
    })
    .ok()
    .flatten()
}

#[flutter_rust_bridge::frb(sync)]
pub fn desk_cancel_drag() {
    run_or_warn("desk_cancel_drag", Session::cancel_drag);
}

/// Pointer-up with actual and momentum-predicted translations.
#[flutter_rust_bridge::frb(sync)]
pub fn desk_end_drag(dx: f64, dy: f64, predicted_dx: f64, predicted_dy: f64) -> DeskReleaseResponse {
    let result = with_session(|session| {
        let outcome = session.end_drag(
            Vector2::new(dx, dy),
            Vector2::new(predicted_dx, predicted_dy),
            now_ms(),
        );
        Ok(release_response(outcome))
    });
    result.unwrap_or_else(|message| DeskReleaseResponse {
        ok: false,
        outcome: "idle".to_string(),
        direction: None,
        destination_slot: None,
        message,
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn desk_add_card(front: String, back: String) -> DeskActionResponse {
    action(|session, now| {
        let id = session
            .add_card_with_back(&front, &back, now)
            .map_err(|err| err.to_string())?;
        Ok(DeskActionResponse::success(
            "Card created.",
            Some(id.to_string()),
        ))
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn desk_edit_card(card_id: String, front: String, back: String) -> DeskActionResponse {
    action(|session, now| {
        let id = parse_card_id(&card_id)?;
        match session.edit_card(id, &front, &back, now) {
            Ok(true) => Ok(DeskActionResponse::success("Card updated.", Some(card_id))),
            Ok(false) => Ok(DeskActionResponse::failure("Card not found in current box.")),
            Err(err) => Err(err.to_string()),
        }
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn desk_flip_card(card_id: String) -> DeskActionResponse {
    action(|session, _| {
        let id = parse_card_id(&card_id)?;
        if session.flip_card(id) {
            Ok(DeskActionResponse::success("Card flipped.", Some(card_id)))
        } else {
            Ok(DeskActionResponse::failure("Card not found in current box."))
        }
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn desk_delete_card(card_id: String) -> DeskActionResponse {
    action(|session, now| {
        let id = parse_card_id(&card_id)?;
        if session.delete_card(id, now) {
            Ok(DeskActionResponse::success("Card deleted.", Some(card_id)))
        } else {
            Ok(DeskActionResponse::failure("Card not found."))
        }
    })
}

/// Renames the open box (`slot=None` renames the root).
#[flutter_rust_bridge::frb(sync)]
pub fn desk_rename_box(slot: Option<u32>, name: String) -> DeskActionResponse {
    action(|session, now| {
        let path = slot.map_or_else(BoxPath::root, |slot| BoxPath::slot(slot as usize));
        match session.rename_box(&path, &name, now) {
            Ok(true) => Ok(DeskActionResponse::success("Box renamed.", None)),
            Ok(false) => Ok(DeskActionResponse::failure("Box not found.")),
            Err(err) => Err(err.to_string()),
        }
    })
}

/// Opens the child box behind a directional label; returns the slot opened.
#[flutter_rust_bridge::frb(sync)]
pub fn desk_open_child(slot: u32) -> Option<u32> {
    with_session(|session| Ok(session.open_child(slot as usize).map(|slot| slot as u32)))
        .ok()
        .flatten()
}

#[flutter_rust_bridge::frb(sync)]
pub fn desk_navigate_root() {
    run_or_warn("desk_navigate_root", Session::navigate_root);
}

/// Discards stored state and restores the default desk.
#[flutter_rust_bridge::frb(sync)]
pub fn desk_reset() -> DeskActionResponse {
    action(|session, now| {
        session.reset(now);
        Ok(DeskActionResponse::success("Desk reset.", None))
    })
}

/// Writes the current desk immediately (app backgrounding).
#[flutter_rust_bridge::frb(sync)]
pub fn desk_flush() -> DeskActionResponse {
    action(|session, _| {
        session
            .flush()
            .map_err(|err| format!("desk_flush failed: {err}"))?;
        Ok(DeskActionResponse::success("Desk saved.", None))
    })
}

fn action(
    f: impl FnOnce(&mut Session, Millis) -> Result<DeskActionResponse, String>,
) -> DeskActionResponse {
    with_session(|session| f(session, now_ms())).unwrap_or_else(DeskActionResponse::failure)
}

/// Runs a call with no result; a closed desk is logged instead of returned.
fn run_or_warn(event: &str, f: impl FnOnce(&mut Session)) {
    if let Err(err) = with_session(|session| {
        f(session);
        Ok(())
    }) {
        warn!("event={event} module=ffi status=skip error={err}");
    }
}

fn with_session<T>(f: impl FnOnce(&mut Session) -> Result<T, String>) -> Result<T, String> {
    let mut slot = DESK
        .lock()
        .map_err(|_| "session lock poisoned".to_string())?;
    let session = slot
        .as_mut()
        .ok_or_else(|| "desk is not open; call desk_open first".to_string())?;
    session.tick(now_ms());
    f(session)
}

fn now_ms() -> Millis {
    CLOCK_ORIGIN.get_or_init(Instant::now).elapsed().as_millis() as Millis
}

fn resolve_db_path(explicit: Option<String>) -> PathBuf {
    explicit
        .or_else(|| std::env::var(DESK_DB_PATH_ENV).ok())
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join(DESK_DB_FILE_NAME))
}

fn parse_card_id(raw: &str) -> Result<CardId, String> {
    Uuid::parse_str(raw.trim())
        .map(CardId)
        .map_err(|err| format!("invalid card id `{raw}`: {err}"))
}

fn view_response(session: &Session) -> DeskViewResponse {
    DeskViewResponse {
        ok: true,
        box_name: session.current_box().name.clone(),
        open_slot: session.current_path().top_slot().map(|slot| slot as u32),
        target_names: session.child_names(),
        hover_target: session.hover_target().map(|d| d.as_str().to_string()),
        cards: session.cards().into_iter().map(to_card_item).collect(),
        revision: session.revision(),
        message: String::new(),
    }
}

fn to_card_item(view: CardView) -> DeskCardItem {
    DeskCardItem {
        card_id: view.id.to_string(),
        front: view.front,
        back: view.back,
        showing_back: view.showing_back,
        px: view.position.px,
        py: view.position.py,
        animate: view.motion == Motion::Eased,
        dragging: view.dragging,
        exiting: view.exiting,
    }
}

fn release_response(outcome: ReleaseOutcome) -> DeskReleaseResponse {
    let (label, direction, destination_slot, message) = match outcome {
        ReleaseOutcome::NotDragging => ("idle", None, None, "No active drag.".to_string()),
        ReleaseOutcome::CardMissing => ("missing", None, None, "Card vanished.".to_string()),
        ReleaseOutcome::Settled { reason, .. } => {
            ("settled", None, None, format!("Card stays: {reason:?}"))
        }
        ReleaseOutcome::Exiting {
            direction,
            destination,
            ..
        } => (
            "exiting",
            Some(direction),
            destination.top_slot().map(|slot| slot as u32),
            "Card leaving.".to_string(),
        ),
    };
    DeskReleaseResponse {
        ok: true,
        outcome: label.to_string(),
        direction: direction.map(|d: Direction| d.as_str().to_string()),
        destination_slot,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        desk_add_card, desk_begin_drag, desk_cancel_drag, desk_delete_card, desk_end_drag,
        desk_flip_card, desk_navigate_root, desk_open, desk_open_child, desk_update_drag,
        desk_view, ping, parse_card_id, resolve_db_path,
    };
    use std::path::PathBuf;

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn explicit_db_path_wins() {
        assert_eq!(
            resolve_db_path(Some(" /tmp/x.sqlite3 ".to_string())),
            PathBuf::from("/tmp/x.sqlite3")
        );
    }

    #[test]
    fn malformed_card_id_is_rejected() {
        assert!(parse_card_id("not-a-uuid").is_err());
    }

    // One test drives the global session so parallel tests cannot interleave.
    #[test]
    fn desk_flow_through_ffi() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("ffi.sqlite3");
        let opened = desk_open(Some(db.to_string_lossy().into_owned()));
        assert!(opened.ok, "{}", opened.message);

        let view = desk_view();
        assert!(view.ok);
        assert_eq!(view.box_name, "Workspace");
        assert_eq!(view.target_names, vec!["A", "B", "C", "D"]);
        assert_eq!(view.cards.len(), 3);

        let created = desk_add_card("  hello ".to_string(), String::new());
        assert!(created.ok, "{}", created.message);
        let card_id = created.card_id.unwrap();
        assert!(desk_flip_card(card_id.clone()).ok);

        assert!(desk_begin_drag(card_id.clone()).ok);
        assert_eq!(desk_update_drag(150.0, 0.0).as_deref(), Some("right"));
        let dragging = desk_view();
        let item = dragging.cards.iter().find(|c| c.card_id == card_id).unwrap();
        assert!(!item.animate);
        assert_eq!(desk_view().hover_target.as_deref(), Some("right"));

        let released = desk_end_drag(150.0, 0.0, 150.0, 0.0);
        assert_eq!(released.outcome, "settled");

        let blank = desk_add_card("   ".to_string(), String::new());
        assert!(!blank.ok);

        assert_eq!(desk_open_child(2), Some(2));
        assert_eq!(desk_view().box_name, "C");
        assert_eq!(desk_open_child(9), None);
        desk_navigate_root();
        assert_eq!(desk_view().open_slot, None);

        assert!(desk_delete_card(card_id.clone()).ok);
        assert!(!desk_delete_card(card_id).ok);

        let first = desk_view().cards[0].card_id.clone();
        assert!(desk_begin_drag(first.clone()).ok);
        desk_update_drag(0.0, 200.0);
        desk_cancel_drag();
        let settled = desk_view();
        assert_eq!(settled.hover_target, None);
        assert!(settled.cards.iter().all(|card| !card.dragging));

        // Reopen while the add is still inside the save debounce window.
        let pending = desk_add_card("pending edit".to_string(), String::new());
        assert!(pending.ok, "{}", pending.message);
        let reopened = desk_open(Some(db.to_string_lossy().into_owned()));
        assert!(reopened.ok, "{}", reopened.message);
        assert!(reopened.message.contains("Restored"), "{}", reopened.message);
        let fronts: Vec<String> = desk_view().cards.into_iter().map(|c| c.front).collect();
        assert!(fronts.iter().any(|front| front == "pending edit"), "{fronts:?}");

        // The reloaded tree is what the next save writes, so a third open still sees it.
        assert!(super::desk_flush().ok);
        desk_open(Some(db.to_string_lossy().into_owned()));
        assert!(desk_view().cards.iter().any(|c| c.front == "pending edit"));
    }
}
