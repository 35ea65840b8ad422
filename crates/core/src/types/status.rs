//! Order lifecycle status.

use serde::{Deserialize, Serialize};

/// Lifecycle status of an order.
///
/// ```text
/// pending ──postpone──▶ postponed ──postpone──▶ postponed
///    │                      │
///    └──────complete────────┴──▶ completed ──reactivate──▶ pending
/// ```
///
/// There is no terminal state: staff may move an order anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "sqlite", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlite", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Waiting to be delivered on its delivery date.
    #[default]
    Pending,
    /// Delivery date was moved away from the original one.
    Postponed,
    /// Delivered (manually or automatically once the date passed).
    Completed,
}

impl OrderStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [Self; 3] = [Self::Pending, Self::Postponed, Self::Completed];

    /// Returns true for statuses that still need work (pending or postponed).
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Postponed)
    }

    /// Storage / wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Postponed => "postponed",
            Self::Completed => "completed",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    /// Parses the English names and the Spanish names used by older backups.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" | "pendiente" => Ok(Self::Pending),
            "postponed" | "postergado" => Ok(Self::Postponed),
            "completed" | "completado" => Ok(Self::Completed),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}
