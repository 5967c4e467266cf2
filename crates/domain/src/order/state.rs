//! Order status machine.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The status of an order in its lifecycle.
///
/// State transitions (forward only):
/// ```text
/// Created ──► Paid ──► Ready
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Order is being composed, items and selections can be added.
    #[default]
    Created,

    /// Stock has been deducted and the order is awaiting preparation.
    Paid,

    /// Order has been prepared by staff (terminal state).
    Ready,
}

impl OrderStatus {
    /// Returns true if items and selections can be added in this status.
    pub fn can_modify(&self) -> bool {
        matches!(self, OrderStatus::Created)
    }

    /// Returns true if the order can be paid in this status.
    pub fn can_pay(&self) -> bool {
        matches!(self, OrderStatus::Created)
    }

    /// Returns true if the order can be marked ready in this status.
    pub fn can_mark_ready(&self) -> bool {
        matches!(self, OrderStatus::Paid)
    }

    /// Returns the lowercase status name.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "created",
            OrderStatus::Paid => "paid",
            OrderStatus::Ready => "ready",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when parsing an unknown status name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown order status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(OrderStatus::Created),
            "paid" => Ok(OrderStatus::Paid),
            "ready" => Ok(OrderStatus::Ready),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status_is_created() {
        assert_eq!(OrderStatus::default(), OrderStatus::Created);
    }

    #[test]
    fn test_transitions_are_forward_only() {
        assert!(OrderStatus::Created.can_modify());
        assert!(!OrderStatus::Paid.can_modify());
        assert!(!OrderStatus::Ready.can_modify());

        assert!(OrderStatus::Created.can_pay());
        assert!(!OrderStatus::Paid.can_pay());
        assert!(!OrderStatus::Ready.can_pay());

        assert!(!OrderStatus::Created.can_mark_ready());
        assert!(OrderStatus::Paid.can_mark_ready());
        assert!(!OrderStatus::Ready.can_mark_ready());
    }

    #[test]
    fn test_text_round_trip() {
        for status in [OrderStatus::Created, OrderStatus::Paid, OrderStatus::Ready] {
            assert_eq!(status.as_str().parse::<OrderStatus>(), Ok(status));
        }
        assert!("PAID".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_string(&OrderStatus::Paid).unwrap();
        assert_eq!(json, "\"paid\"");
        let back: OrderStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, OrderStatus::Paid);
    }
}
