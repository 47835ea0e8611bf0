use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{Connection, OpenFlags, params};
use serde_json::Value;

use chunkbar_core::{CardId, CardQueue, DeckId, RevlogEntry, RevlogId};

use crate::queries::{
    CardQueries, DeckQueries, HostError, QueueCounts, RevlogQueries, SchedulerQueries,
};

//
// ─── COLLECTION HOST ──────────────────────────────────────────────────────────
//

const SECONDS_PER_DAY: i64 = 86_400;

/// Read-only view of a collection database (schema 11).
///
/// Deck metadata lives in JSON columns of the single `col` row; cards and
/// the review log are plain tables. The connection sits behind a mutex so
/// the adapter satisfies the `Send + Sync` query contracts.
pub struct CollectionHost {
    conn: Mutex<Connection>,
}

impl CollectionHost {
    /// Opens a collection file read-only.
    ///
    /// # Errors
    ///
    /// Returns `HostError::Backend` when the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, HostError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(backend)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    #[cfg(test)]
    fn open_memory() -> Self {
        let conn = Connection::open_in_memory().unwrap();
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // column is a fixed schema name, never caller input
    fn col_json(&self, column: &str) -> Result<Value, HostError> {
        let sql = format!("SELECT {column} FROM col WHERE id = 1");
        let text: String = self
            .conn()
            .query_row(&sql, [], |row| row.get(0))
            .map_err(backend)?;
        serde_json::from_str(&text).map_err(|err| HostError::Serialization(err.to_string()))
    }

    fn crt(&self) -> Result<i64, HostError> {
        self.conn()
            .query_row("SELECT crt FROM col WHERE id = 1", [], |row| row.get(0))
            .map_err(backend)
    }
}

fn backend(err: rusqlite::Error) -> HostError {
    HostError::Backend(err.to_string())
}

fn deck_field<'v>(decks: &'v Value, deck: DeckId, field: &str) -> Option<&'v Value> {
    decks.get(deck.value().to_string())?.get(field)
}

fn days_since(crt: i64, now: DateTime<Utc>) -> i64 {
    ((now.timestamp() - crt) / SECONDS_PER_DAY).max(0)
}

impl DeckQueries for CollectionHost {
    fn selected_deck(&self) -> Option<DeckId> {
        let conf = self.col_json("conf").ok()?;
        conf.get("curDeck").and_then(Value::as_i64).map(DeckId::new)
    }

    fn deck_name(&self, deck: DeckId) -> Result<String, HostError> {
        let decks = self.col_json("decks")?;
        deck_field(&decks, deck, "name")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or(HostError::NotFound)
    }

    fn deck_and_children(&self, deck: DeckId) -> Result<Vec<DeckId>, HostError> {
        let decks = self.col_json("decks")?;
        let base = deck_field(&decks, deck, "name")
            .and_then(Value::as_str)
            .ok_or(HostError::NotFound)?
            .to_owned();
        let prefix = format!("{base}::");

        let mut tree = Vec::new();
        if let Some(map) = decks.as_object() {
            for (id, entry) in map {
                let Some(name) = entry.get("name").and_then(Value::as_str) else {
                    continue;
                };
                if name != base && !name.starts_with(&prefix) {
                    continue;
                }
                if let Ok(parsed) = id.parse::<DeckId>() {
                    tree.push(parsed);
                }
            }
        }
        tree.sort_unstable();
        Ok(tree)
    }

    fn card_ids_in_tree(&self, deck: DeckId) -> Result<HashSet<CardId>, HostError> {
        let tree = self.deck_and_children(deck)?;
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT id FROM cards WHERE did = ?1")
            .map_err(backend)?;

        let mut ids = HashSet::new();
        for deck_id in tree {
            let rows = stmt
                .query_map(params![deck_id.value()], |row| row.get::<_, i64>(0))
                .map_err(backend)?;
            for row in rows {
                ids.insert(CardId::new(row.map_err(backend)?));
            }
        }
        Ok(ids)
    }

    fn desired_retention(&self, deck: DeckId) -> Result<Option<f64>, HostError> {
        let decks = self.col_json("decks")?;
        let Some(conf_id) = deck_field(&decks, deck, "conf").and_then(Value::as_i64) else {
            return Ok(None);
        };
        let dconf = self.col_json("dconf")?;
        let Some(preset) = dconf.get(conf_id.to_string()) else {
            return Ok(None);
        };
        let retention = preset
            .get("desiredRetention")
            .and_then(Value::as_f64)
            .or_else(|| {
                preset
                    .get("fsrs")
                    .and_then(|fsrs| fsrs.get("d"))
                    .and_then(Value::as_f64)
            });
        Ok(retention)
    }
}

impl SchedulerQueries for CollectionHost {
    /// Counter approximation over the selected deck's tree: every learning
    /// card counts and review cards count when due by today. The live
    /// scheduler also applies per-deck limits, which a closed file cannot
    /// reproduce.
    fn counts(&self) -> Result<QueueCounts, HostError> {
        let deck = self.selected_deck().ok_or(HostError::NotFound)?;
        let tree = self.deck_and_children(deck)?;
        let today = days_since(self.crt()?, Utc::now());

        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT queue, due FROM cards WHERE did = ?1")
            .map_err(backend)?;

        let mut counts = QueueCounts::default();
        for deck_id in tree {
            let rows = stmt
                .query_map(params![deck_id.value()], |row| {
                    Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
                })
                .map_err(backend)?;
            for row in rows {
                let (queue, due) = row.map_err(backend)?;
                match queue {
                    0 => counts.new += 1,
                    1 | 3 => counts.learning += 1,
                    2 if due <= today => counts.review += 1,
                    _ => {}
                }
            }
        }
        Ok(counts)
    }

    fn day_cutoff(&self) -> DateTime<Utc> {
        let now = Utc::now();
        let Ok(crt) = self.crt() else {
            return now;
        };
        let cutoff = crt + (days_since(crt, now) + 1) * SECONDS_PER_DAY;
        Utc.timestamp_opt(cutoff, 0).single().unwrap_or(now)
    }
}

impl CardQueries for CollectionHost {
    fn queue_state(&self, card: CardId) -> Result<CardQueue, HostError> {
        let code: i64 = self
            .conn()
            .query_row(
                "SELECT queue FROM cards WHERE id = ?1",
                params![card.value()],
                |row| row.get(0),
            )
            .map_err(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => HostError::NotFound,
                other => backend(other),
            })?;
        CardQueue::from_code(code)
            .ok_or_else(|| HostError::Backend(format!("unknown queue code {code}")))
    }

    /// Answer timing only exists in a live reviewer, never in the file.
    fn time_taken_millis(&self, _card: CardId) -> Result<u64, HostError> {
        Err(HostError::Backend(
            "review timing is only available in a live session".to_owned(),
        ))
    }
}

impl RevlogQueries for CollectionHost {
    fn entries_since(&self, cutoff: RevlogId) -> Result<Vec<RevlogEntry>, HostError> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT id, cid, ease, time FROM revlog WHERE id > ?1 ORDER BY id")
            .map_err(backend)?;
        let rows = stmt
            .query_map(params![cutoff.value()], |row| {
                Ok(RevlogEntry::new(
                    RevlogId::new(row.get(0)?),
                    CardId::new(row.get(1)?),
                    row.get(2)?,
                    row.get(3)?,
                ))
            })
            .map_err(backend)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(backend)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
