//! Identity types for Tradefeed
//!
//! Identities are strongly typed wrappers around UUIDs so trader ids cannot be
//! mixed up with other string-ish values flowing through the engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

const TRADER_PREFIX: &str = "trd";

/// Unique identifier of a (synthetic) trader
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TraderId(pub Uuid);

impl TraderId {
    /// Create a new random ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parse from a string (with or without the `trd_` prefix)
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        let s = s
            .strip_prefix(TRADER_PREFIX)
            .and_then(|rest| rest.strip_prefix('_'))
            .unwrap_or(s);
        Ok(Self(Uuid::parse_str(s)?))
    }

    /// Get the inner UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TraderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TraderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", TRADER_PREFIX, self.0)
    }
}

impl From<Uuid> for TraderId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}
