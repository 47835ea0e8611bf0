use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use rusqlite::{Connection, params};
use serde_json::json;

use chunkbar_core::{CardId, CardQueue, DeckId, RevlogId};
use chunkbar_host::{
    CardQueries, CollectionHost, ConfigStore, DeckQueries, Host, HostError, JsonConfigFile,
    RevlogQueries, SchedulerQueries,
};

const SECONDS_PER_DAY: i64 = 86_400;

fn scratch_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("chunkbar-collection-{}-{name}", std::process::id()))
}

fn write_collection(path: &PathBuf) {
    let _ = fs::remove_file(path);
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE col (id INTEGER PRIMARY KEY, crt INTEGER, conf TEXT, decks TEXT, dconf TEXT);
         CREATE TABLE cards (id INTEGER PRIMARY KEY, did INTEGER, queue INTEGER, due INTEGER);
         CREATE TABLE revlog (id INTEGER PRIMARY KEY, cid INTEGER, ease INTEGER, time INTEGER);",
    )
    .unwrap();

    // collection created two days ago, an hour past the rollover
    let crt = Utc::now().timestamp() - 2 * SECONDS_PER_DAY - 3_600;
    conn.execute(
        "INSERT INTO col (id, crt, conf, decks, dconf) VALUES (1, ?1, ?2, ?3, ?4)",
        params![
            crt,
            json!({ "curDeck": 1 }).to_string(),
            json!({
                "1": { "name": "Spanish", "conf": 1 },
                "2": { "name": "Spanish::Verbs", "conf": 1 },
                "3": { "name": "French", "conf": 1 },
            })
            .to_string(),
            json!({ "1": { "desiredRetention": 0.9 } }).to_string(),
        ],
    )
    .unwrap();

    for (id, did, queue, due) in [
        (10_i64, 1_i64, 0_i64, 0_i64),
        (11, 2, 1, 0),
        (12, 2, 3, 4),
        (13, 1, 2, 1),
        (14, 1, 2, 40),
        (15, 3, 2, 0),
        (16, 2, -3, 0),
    ] {
        conn.execute(
            "INSERT INTO cards (id, did, queue, due) VALUES (?1, ?2, ?3, ?4)",
            params![id, did, queue, due],
        )
        .unwrap();
    }

    for (id, cid, ease, time) in [
        (1_700_000_300_000_i64, 13_i64, 3_i64, 4_000_i64),
        (1_700_000_100_000, 13, 1, 12_000),
        (1_700_000_200_000, 11, 2, 7_000),
    ] {
        conn.execute(
            "INSERT INTO revlog (id, cid, ease, time) VALUES (?1, ?2, ?3, ?4)",
            params![id, cid, ease, time],
        )
        .unwrap();
    }
}

#[test]
fn exported_files_answer_the_full_query_surface() {
    let path = scratch_path("surface.anki2");
    write_collection(&path);
    let host = CollectionHost::open(&path).unwrap();

    assert_eq!(host.selected_deck(), Some(DeckId::new(1)));
    assert_eq!(host.deck_name(DeckId::new(2)).unwrap(), "Spanish::Verbs");
    assert_eq!(
        host.deck_and_children(DeckId::new(1)).unwrap(),
        vec![DeckId::new(1), DeckId::new(2)]
    );
    assert_eq!(host.desired_retention(DeckId::new(1)).unwrap(), Some(0.9));

    let counts = host.counts().unwrap();
    assert_eq!((counts.new, counts.learning, counts.review), (1, 2, 1));

    assert_eq!(
        host.queue_state(CardId::new(16)).unwrap(),
        CardQueue::ManuallyBuried
    );
    assert!(host.time_taken_millis(CardId::new(13)).is_err());

    let entries = host
        .entries_since(RevlogId::new(1_700_000_150_000))
        .unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].card_id, CardId::new(11));
    assert_eq!(entries[1].ease, 3);

    drop(host);
    let _ = fs::remove_file(path);
}

#[test]
fn missing_collections_fail_to_open() {
    let path = scratch_path("missing.anki2");
    let _ = fs::remove_file(&path);

    assert!(matches!(
        CollectionHost::open(&path),
        Err(HostError::Backend(_))
    ));
}

#[test]
fn collections_pair_with_a_file_config_store() {
    let collection_path = scratch_path("paired.anki2");
    write_collection(&collection_path);
    let config_path = scratch_path("paired-config.json");
    let _ = fs::remove_file(&config_path);

    let collection = CollectionHost::open(&collection_path).unwrap();
    let host = Host::with_collection(collection, Arc::new(JsonConfigFile::new(&config_path)));

    assert_eq!(host.config.load().unwrap(), json!({}));
    host.config.save(&json!({ "chunk_size": 15 })).unwrap();
    assert_eq!(host.config.load().unwrap()["chunk_size"], json!(15));

    assert_eq!(host.decks.selected_deck(), Some(DeckId::new(1)));
    let now = Utc::now();
    let cutoff = host.scheduler.day_cutoff();
    assert!(cutoff > now);
    assert!(cutoff <= now + chrono::Duration::days(1));

    let _ = fs::remove_file(collection_path);
    let _ = fs::remove_file(config_path);
}
