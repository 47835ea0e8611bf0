use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

use chunkbar_core::{CardId, CardQueue, DeckId, RevlogEntry, RevlogId};

use crate::collection::CollectionHost;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

/// Errors surfaced by host backends.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HostError {
    #[error("not found")]
    NotFound,

    #[error("backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── QUEUE COUNTS ─────────────────────────────────────────────────────────────
//

/// Remaining scheduler counters for the selected deck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueCounts {
    pub new: u32,
    pub learning: u32,
    pub review: u32,
}

impl QueueCounts {
    /// Every remaining card, with new cards counted once.
    #[must_use]
    pub fn total(self) -> u32 {
        self.new + self.learning + self.review
    }
}

//
// ─── QUERY CONTRACTS ──────────────────────────────────────────────────────────
//

/// Deck-scoped lookups.
pub trait DeckQueries: Send + Sync {
    /// The deck currently selected in the host UI, if any.
    fn selected_deck(&self) -> Option<DeckId>;

    /// Human-readable deck name.
    ///
    /// # Errors
    ///
    /// Returns `HostError::NotFound` for an unknown deck.
    fn deck_name(&self, deck: DeckId) -> Result<String, HostError>;

    /// The deck plus every descendant, resolved through the host's
    /// `parent::child` naming scheme, in id order.
    ///
    /// # Errors
    ///
    /// Returns `HostError::NotFound` for an unknown deck.
    fn deck_and_children(&self, deck: DeckId) -> Result<Vec<DeckId>, HostError>;

    /// Ids of every card in the deck and its descendants.
    ///
    /// # Errors
    ///
    /// Returns `HostError::NotFound` for an unknown deck.
    fn card_ids_in_tree(&self, deck: DeckId) -> Result<HashSet<CardId>, HostError>;

    /// The desired-retention target of the deck's scheduling preset, when
    /// one is configured.
    ///
    /// # Errors
    ///
    /// Returns `HostError::Backend` when the preset cannot be read.
    fn desired_retention(&self, deck: DeckId) -> Result<Option<f64>, HostError>;
}

/// Scheduler-level lookups.
pub trait SchedulerQueries: Send + Sync {
    /// Remaining new/learning/review counters for the selected deck.
    ///
    /// # Errors
    ///
    /// Returns `HostError::Backend` when the scheduler cannot be queried.
    fn counts(&self) -> Result<QueueCounts, HostError>;

    /// The next day-rollover boundary.
    fn day_cutoff(&self) -> DateTime<Utc>;
}

/// Card-scoped lookups.
pub trait CardQueries: Send + Sync {
    /// Live queue placement of a card.
    ///
    /// # Errors
    ///
    /// Returns `HostError::NotFound` for an unknown card.
    fn queue_state(&self, card: CardId) -> Result<CardQueue, HostError>;

    /// Capped duration of the card's most recent answer, in milliseconds.
    ///
    /// # Errors
    ///
    /// Returns an error when the host has no timing for the card; callers
    /// fall back to their own wall clock.
    fn time_taken_millis(&self, card: CardId) -> Result<u64, HostError>;
}

/// Review-log lookups.
pub trait RevlogQueries: Send + Sync {
    /// Entries with ids strictly greater than `cutoff`, ordered ascending.
    ///
    /// # Errors
    ///
    /// Returns `HostError::Backend` when the log cannot be read.
    fn entries_since(&self, cutoff: RevlogId) -> Result<Vec<RevlogEntry>, HostError>;
}

/// Persistence of the user configuration document.
pub trait ConfigStore: Send + Sync {
    /// The persisted user configuration.
    ///
    /// # Errors
    ///
    /// Returns `HostError::Serialization` for an unreadable document.
    fn load(&self) -> Result<Value, HostError>;

    /// Replaces the persisted user configuration.
    ///
    /// # Errors
    ///
    /// Returns `HostError::Backend` when the document cannot be written.
    fn save(&self, config: &Value) -> Result<(), HostError>;
}

//
// ─── IN-MEMORY HOST ───────────────────────────────────────────────────────────
//

#[derive(Debug, Clone)]
struct CardSeed {
    deck: DeckId,
    queue: CardQueue,
    taken_millis: Option<u64>,
}

#[derive(Default)]
struct HostState {
    selected_deck: Option<DeckId>,
    deck_names: HashMap<DeckId, String>,
    retention: HashMap<DeckId, f64>,
    cards: HashMap<CardId, CardSeed>,
    counts: QueueCounts,
    day_cutoff: Option<DateTime<Utc>>,
    revlog: Vec<RevlogEntry>,
    config: Value,
}

/// In-memory implementation of every query contract, for tests and
/// prototyping. Clones share state, mirroring a host process that all
/// queries go back to.
#[derive(Clone, Default)]
pub struct InMemoryHost {
    inner: Arc<Mutex<HostState>>,
}

impl InMemoryHost {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, HostState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn select_deck(&self, deck: Option<DeckId>) {
        self.state().selected_deck = deck;
    }

    pub fn add_deck(&self, deck: DeckId, name: &str) {
        self.state().deck_names.insert(deck, name.to_owned());
    }

    pub fn set_desired_retention(&self, deck: DeckId, retention: f64) {
        self.state().retention.insert(deck, retention);
    }

    pub fn add_card(&self, card: CardId, deck: DeckId, queue: CardQueue) {
        self.state().cards.insert(
            card,
            CardSeed {
                deck,
                queue,
                taken_millis: None,
            },
        );
    }

    pub fn set_queue_state(&self, card: CardId, queue: CardQueue) {
        if let Some(seed) = self.state().cards.get_mut(&card) {
            seed.queue = queue;
        }
    }

    pub fn set_time_taken(&self, card: CardId, millis: u64) {
        if let Some(seed) = self.state().cards.get_mut(&card) {
            seed.taken_millis = Some(millis);
        }
    }

    pub fn set_counts(&self, new: u32, learning: u32, review: u32) {
        self.state().counts = QueueCounts {
            new,
            learning,
            review,
        };
    }

    pub fn set_day_cutoff(&self, cutoff: DateTime<Utc>) {
        self.state().day_cutoff = Some(cutoff);
    }

    pub fn push_revlog(&self, entry: RevlogEntry) {
        self.state().revlog.push(entry);
    }

    pub fn set_config(&self, config: Value) {
        self.state().config = config;
    }

    /// Snapshot of the stored configuration document.
    #[must_use]
    pub fn config(&self) -> Value {
        self.state().config.clone()
    }
}

impl DeckQueries for InMemoryHost {
    fn selected_deck(&self) -> Option<DeckId> {
        self.state().selected_deck
    }

    fn deck_name(&self, deck: DeckId) -> Result<String, HostError> {
        self.state()
            .deck_names
            .get(&deck)
            .cloned()
            .ok_or(HostError::NotFound)
    }

    fn deck_and_children(&self, deck: DeckId) -> Result<Vec<DeckId>, HostError> {
        let state = self.state();
        let base = state.deck_names.get(&deck).ok_or(HostError::NotFound)?;
        let prefix = format!("{base}::");
        let mut tree: Vec<DeckId> = state
            .deck_names
            .iter()
            .filter(|&(_, name)| name == base || name.starts_with(&prefix))
            .map(|(&id, _)| id)
            .collect();
        tree.sort_unstable();
        Ok(tree)
    }

    fn card_ids_in_tree(&self, deck: DeckId) -> Result<HashSet<CardId>, HostError> {
        let tree: HashSet<DeckId> = self.deck_and_children(deck)?.into_iter().collect();
        let state = self.state();
        Ok(state
            .cards
            .iter()
            .filter(|&(_, seed)| tree.contains(&seed.deck))
            .map(|(&id, _)| id)
            .collect())
    }

    fn desired_retention(&self, deck: DeckId) -> Result<Option<f64>, HostError> {
        Ok(self.state().retention.get(&deck).copied())
    }
}

impl SchedulerQueries for InMemoryHost {
    fn counts(&self) -> Result<QueueCounts, HostError> {
        Ok(self.state().counts)
    }

    fn day_cutoff(&self) -> DateTime<Utc> {
        self.state().day_cutoff.unwrap_or_else(Utc::now)
    }
}

impl CardQueries for InMemoryHost {
    fn queue_state(&self, card: CardId) -> Result<CardQueue, HostError> {
        self.state()
            .cards
            .get(&card)
            .map(|seed| seed.queue)
            .ok_or(HostError::NotFound)
    }

    fn time_taken_millis(&self, card: CardId) -> Result<u64, HostError> {
        self.state()
            .cards
            .get(&card)
            .and_then(|seed| seed.taken_millis)
            .ok_or(HostError::NotFound)
    }
}

impl RevlogQueries for InMemoryHost {
    fn entries_since(&self, cutoff: RevlogId) -> Result<Vec<RevlogEntry>, HostError> {
        let mut entries: Vec<RevlogEntry> = self
            .state()
            .revlog
            .iter()
            .filter(|entry| entry.id > cutoff)
            .copied()
            .collect();
        entries.sort_by_key(|entry| entry.id);
        Ok(entries)
    }
}

impl ConfigStore for InMemoryHost {
    fn load(&self) -> Result<Value, HostError> {
        Ok(self.state().config.clone())
    }

    fn save(&self, config: &Value) -> Result<(), HostError> {
        self.state().config = config.clone();
        Ok(())
    }
}

//
// ─── HOST AGGREGATE ───────────────────────────────────────────────────────────
//

/// Aggregates the query surfaces behind trait objects so backends can be
/// swapped per concern.
#[derive(Clone)]
pub struct Host {
    pub decks: Arc<dyn DeckQueries>,
    pub scheduler: Arc<dyn SchedulerQueries>,
    pub cards: Arc<dyn CardQueries>,
    pub revlog: Arc<dyn RevlogQueries>,
    pub config: Arc<dyn ConfigStore>,
}

impl Host {
    /// Wires every surface to a fresh in-memory backend.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_memory(InMemoryHost::new())
    }

    /// Wires every surface to the given in-memory backend; callers keep
    /// their handle for seeding.
    #[must_use]
    pub fn from_memory(backend: InMemoryHost) -> Self {
        Self {
            decks: Arc::new(backend.clone()),
            scheduler: Arc::new(backend.clone()),
            cards: Arc::new(backend.clone()),
            revlog: Arc::new(backend.clone()),
            config: Arc::new(backend),
        }
    }

    /// Wires the query surfaces to a collection file, with configuration
    /// persisted through a separate store.
    #[must_use]
    pub fn with_collection(collection: CollectionHost, config: Arc<dyn ConfigStore>) -> Self {
        let collection = Arc::new(collection);
        Self {
            decks: collection.clone(),
            scheduler: collection.clone(),
            cards: collection.clone(),
            revlog: collection,
            config,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
