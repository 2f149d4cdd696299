pub mod file;

pub use file::JsonFileStore;

use chrono::NaiveDate;

use crate::state::PersistedState;

/// Durable home of the [`PersistedState`] between runs.
pub trait StateStore: Send + Sync {
    /// Returns the stored state, or a fresh one for `today` when nothing was stored yet.
    fn load(&self, today: NaiveDate) -> anyhow::Result<PersistedState>;

    fn save(&self, state: &PersistedState) -> anyhow::Result<()>;
}
