//! Capacity configuration
//!
//! All registries are fixed-capacity; the capacities live in one [`Limits`]
//! value instead of being scattered compile-time constants. Two presets
//! exist because two historical builds shipped with different table sizes.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SlotFsError};

/// Capacity set for every fixed-size table in the crate.
///
/// A logical database occupies two buffer slots (main file + journal), so
/// the connection-entry count is always `buffer_slots / 2` and is derived
/// rather than stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    /// Number of buffer registry slots (two per logical database).
    pub buffer_slots: usize,
    /// Maximum prepared statements held open per connection entry.
    pub max_statements: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            buffer_slots: 64,
            max_statements: 64,
        }
    }
}

impl Limits {
    /// Capacities of the compact historical build.
    pub const COMPACT: Limits = Limits {
        buffer_slots: 8,
        max_statements: 32,
    };

    /// Number of connection entry slots this capacity set allows.
    pub fn entry_slots(&self) -> usize {
        self.buffer_slots / 2
    }

    /// Check the capacity set for internal consistency.
    pub fn validate(&self) -> Result<()> {
        if self.buffer_slots == 0 || self.buffer_slots % 2 != 0 {
            return Err(SlotFsError::InvalidLimits(format!(
                "buffer_slots must be a positive even number, got {}",
                self.buffer_slots
            )));
        }
        if self.max_statements == 0 {
            return Err(SlotFsError::InvalidLimits(
                "max_statements must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Parse and validate a capacity set from a JSON document.
    pub fn from_json(json: &str) -> Result<Limits> {
        let limits: Limits = serde_json::from_str(json)?;
        limits.validate()?;
        Ok(limits)
    }
}
