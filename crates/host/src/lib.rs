//! Host integration layer: the query contracts the review tracker consumes,
//! an in-memory backend for tests, a read-only adapter over collection
//! files, and a JSON-file configuration store.

#![forbid(unsafe_code)]

pub mod collection;
pub mod config_file;
pub mod queries;

pub use collection::CollectionHost;
pub use config_file::JsonConfigFile;
pub use queries::{
    CardQueries, ConfigStore, DeckQueries, Host, HostError, InMemoryHost, QueueCounts,
    RevlogQueries, SchedulerQueries,
};
