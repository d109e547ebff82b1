//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `cardesk_core` linkage without the mobile shell.
//! - Print a deterministic summary of a stored desk.
//!
//! Usage: `cardesk_cli [db_path]` (in-memory desk when omitted).

use cardesk_core::db::{open_db, open_db_in_memory};
use cardesk_core::{CardBox, DeskConfig, DeskSession, SqliteSnapshotStore};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("cardesk_core ping={}", cardesk_core::ping());
    println!("cardesk_core version={}", cardesk_core::core_version());

    let db_path = std::env::args().nth(1);
    let conn = match db_path.as_deref() {
        Some(path) => open_db(path),
        None => open_db_in_memory(),
    };
    let store = match conn.map_err(|err| err.to_string()).and_then(|conn| {
        SqliteSnapshotStore::try_new(conn).map_err(|err| err.to_string())
    }) {
        Ok(store) => store,
        Err(err) => {
            eprintln!("cardesk_cli: cannot open store: {err}");
            return ExitCode::FAILURE;
        }
    };

    let mut session = DeskSession::open(store, DeskConfig::default(), 0);
    println!("load={:?}", session.load_outcome());
    print_box(&session.tree().root, 0);

    if let Err(err) = session.flush() {
        eprintln!("cardesk_cli: save failed: {err}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn print_box(node: &CardBox, depth: usize) {
    let indent = "  ".repeat(depth);
    println!("{indent}[{}] cards={}", node.name, node.cards.len());
    for card in &node.cards {
        println!(
            "{indent}  - {:.3},{:.3} {}",
            card.px, card.py, card.front
        );
    }
    for child in &node.children {
        print_box(child, depth + 1);
    }
}
