mod ids;
mod outcome;
mod queue;
mod revlog;

pub use ids::{CardId, DeckId, ParseIdError, RevlogId};
pub use outcome::{OutcomeCode, OutcomeError};
pub use queue::CardQueue;
pub use revlog::RevlogEntry;
