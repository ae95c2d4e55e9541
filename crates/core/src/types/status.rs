//! Order lifecycle status.

use serde::{Deserialize, Serialize};

/// Order lifecycle status.
///
/// Forward-monotonic: `Pending → Processing → Processed → Completed |
/// Cancelled`. Moving backwards (or between the terminal states) requires an
/// explicit admin override at the call site; see
/// [`OrderStatus::can_advance_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    /// Materialized by the queue-ingestion pipeline.
    Processed,
    Completed,
    Cancelled,
}

impl OrderStatus {
    const fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Processing => 1,
            Self::Processed => 2,
            Self::Completed | Self::Cancelled => 3,
        }
    }

    /// Whether a transition to `next` moves forward (or stays put).
    ///
    /// `Completed` and `Cancelled` are both terminal; switching between them
    /// counts as a backwards move.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        (self as u8) == (next as u8) || next.rank() > self.rank()
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Pending => "Pending",
            Self::Processing => "Processing",
            Self::Processed => "Processed",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        };
        f.write_str(label)
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Processing" => Ok(Self::Processing),
            "Processed" => Ok(Self::Processed),
            "Completed" => Ok(Self::Completed),
            "Cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}
