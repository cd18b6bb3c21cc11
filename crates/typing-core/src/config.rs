//! Typing engine configuration.

use serde::{Deserialize, Serialize};

/// Default number of atomic content changes grouped into one undo batch.
pub const DEFAULT_UNDO_STEP: usize = 20;

/// Editor-wide settings consumed by the typing engine.
///
/// The struct is deserializable so a host application can load it from its
/// own configuration source; all fields have sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypingConfig {
    /// How many atomic content changes (typed or deleted characters) are
    /// grouped into a single undo step before the batch is rotated.
    pub undo_step: usize,
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self {
            undo_step: DEFAULT_UNDO_STEP,
        }
    }
}
