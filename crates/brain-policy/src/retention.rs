// retention.rs — Audit row retention.
//
// Trims run opportunistically after each persisted decision rather than on
// a timer, so a quiet service never grows and a busy one trims constantly.
// Age-based trimming runs before row-count trimming so the row cap applies
// to what survives the age cut.

use chrono::{DateTime, Utc};

use brain_contracts::{PolicyStore, StoreError};

use crate::config::RetentionConfig;

/// Apply the configured retention limits to the store.
pub fn apply_retention(
    config: &RetentionConfig,
    store: &dyn PolicyStore,
    now: DateTime<Utc>,
) -> Result<(), StoreError> {
    if let Some(max_age_seconds) = config.max_age_seconds {
        store.trim_by_max_age(max_age_seconds, now)?;
    }
    if let Some(max_rows) = config.max_rows {
        store.trim_by_max_rows(max_rows)?;
    }
    Ok(())
}
