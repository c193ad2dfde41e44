//! Cursor traversal direction.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Traversal order and duplicate-key policy, fixed when a cursor is opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Ascending, every record
    #[default]
    Next,
    /// Ascending, first record of each distinct key
    NextUnique,
    /// Descending, every record
    Prev,
    /// Descending, first record of each distinct key
    PrevUnique,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Next => "next",
            Direction::NextUnique => "nextunique",
            Direction::Prev => "prev",
            Direction::PrevUnique => "prevunique",
        }
    }

    /// True for `next` and `nextunique`.
    pub fn is_forward(&self) -> bool {
        matches!(self, Direction::Next | Direction::NextUnique)
    }

    /// True when duplicate keys are skipped.
    pub fn is_unique(&self) -> bool {
        matches!(self, Direction::NextUnique | Direction::PrevUnique)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "next" => Ok(Direction::Next),
            "nextunique" => Ok(Direction::NextUnique),
            "prev" => Ok(Direction::Prev),
            "prevunique" => Ok(Direction::PrevUnique),
            other => Err(StoreError::Type { reason: format!("'{}' is not a cursor direction", other) }),
        }
    }
}
