//! CLI command implementations.

pub mod assign;
pub mod node;
pub mod task;

use std::time::{SystemTime, UNIX_EPOCH};

/// Current Unix epoch in seconds.
pub(crate) fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
