//! Sale status state machine.

use serde::{Deserialize, Serialize};

/// The status of a sale in its lifecycle.
///
/// ```text
/// Active ──cancel()──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SaleStatus {
    /// Sale is open; header and items may change.
    #[default]
    Active,

    /// Sale was cancelled (terminal state).
    Cancelled,
}

impl SaleStatus {
    /// Returns true if the header or items may still change.
    pub fn can_modify(&self) -> bool {
        matches!(self, SaleStatus::Active)
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SaleStatus::Cancelled)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Active => "Active",
            SaleStatus::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SaleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Active" => Ok(SaleStatus::Active),
            "Cancelled" => Ok(SaleStatus::Cancelled),
            other => Err(format!("unknown sale status: {other}")),
        }
    }
}
