//! Local record storage and derived counters.

mod counter;
mod entity_store;

pub use counter::{CounterState, UnreadCounter};
pub use entity_store::EntityStore;
