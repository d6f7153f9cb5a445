// SPDX-License-Identifier: Apache-2.0

use chrono::{TimeZone, Utc};
use openstreets_raffle_core::{
    DrawResult, HistoryStore, JsonFileHistoryStore, WinnerHistory, WINNER_HISTORY_KEY,
};
use tempfile::tempdir;

fn result(email: &str) -> DrawResult {
    DrawResult {
        winner_email: email.to_string(),
        winner_name: Some("Robin".to_string()),
        winner_phone: None,
        winner_ticket_count: 4,
        participant_count: 2,
        total_ticket_count: 10,
        win_percentage: 40.0,
    }
}

#[test]
fn history_survives_reload_and_clear_removes_it() {
    let dir = tempdir().expect("tempdir");
    let store = JsonFileHistoryStore::new(dir.path());
    assert!(store
        .path()
        .ends_with(format!("{WINNER_HISTORY_KEY}.json")));
    assert!(store.load().expect("load empty").is_empty());

    let mut history = WinnerHistory::default();
    let t0 = Utc
        .with_ymd_and_hms(2026, 4, 12, 15, 0, 0)
        .single()
        .expect("time");
    history.record(&result("a@example.org"), t0);
    history.record(&result("b@example.org"), t0 + chrono::Duration::seconds(30));
    store.save(&history).expect("save");

    let reloaded = store.load().expect("reload");
    assert_eq!(reloaded, history);
    assert_eq!(reloaded.entries()[1].email, "b@example.org");

    store.clear().expect("clear");
    assert!(store.load().expect("load after clear").is_empty());
    store.clear().expect("clearing twice is fine");
}

#[test]
fn corrupt_history_file_loads_as_empty() {
    let dir = tempdir().expect("tempdir");
    let store = JsonFileHistoryStore::new(dir.path());
    std::fs::write(store.path(), b"{not json").expect("write garbage");
    assert!(store.load().expect("load").is_empty());
}

#[test]
fn stored_array_matches_record_format() {
    let dir = tempdir().expect("tempdir");
    let store = JsonFileHistoryStore::new(dir.path());
    let mut history = WinnerHistory::default();
    history.record(&result("a@example.org"), Utc::now());
    store.save(&history).expect("save");

    let raw: serde_json::Value =
        serde_json::from_slice(&std::fs::read(store.path()).expect("read")).expect("json");
    let first = &raw.as_array().expect("array")[0];
    for key in ["email", "name", "phone", "timestamp", "ticketCount", "winPercentage"] {
        assert!(first.get(key).is_some(), "missing {key}");
    }
}
