//! Common inventory types shared across the platform

use serde::{Deserialize, Serialize};

/// How a supply category tracks its stock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingMode {
    /// Tracked only as an integer quantity; one representative barcode
    /// identifies the whole category
    Bulk,
    /// Every physical unit carries a unique barcode and its own lifecycle
    ItemTracked,
}

impl TrackingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackingMode::Bulk => "bulk",
            TrackingMode::ItemTracked => "item_tracked",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "bulk" => Some(TrackingMode::Bulk),
            "item_tracked" => Some(TrackingMode::ItemTracked),
            _ => None,
        }
    }
}

/// Lifecycle status of an individually tracked item
///
/// `Returned` is the only re-enterable state: a returned unit may be
/// distributed again, reusing the same record. `Used`, `Expired` and `Lost`
/// are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Distributed,
    Returned,
    Used,
    Expired,
    Lost,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Distributed => "distributed",
            ItemStatus::Returned => "returned",
            ItemStatus::Used => "used",
            ItemStatus::Expired => "expired",
            ItemStatus::Lost => "lost",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "distributed" => Some(ItemStatus::Distributed),
            "returned" => Some(ItemStatus::Returned),
            "used" => Some(ItemStatus::Used),
            "expired" => Some(ItemStatus::Expired),
            "lost" => Some(ItemStatus::Lost),
            _ => None,
        }
    }

    /// An existing item may only be distributed again from `Returned`
    pub fn can_distribute(&self) -> bool {
        matches!(self, ItemStatus::Returned)
    }

    /// Only a currently distributed item can be returned
    pub fn can_return(&self) -> bool {
        matches!(self, ItemStatus::Distributed)
    }

    /// Only a currently distributed item can be marked as used
    pub fn can_mark_used(&self) -> bool {
        matches!(self, ItemStatus::Distributed)
    }

    /// Whether any further transition is possible from this status
    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemStatus::Used | ItemStatus::Expired | ItemStatus::Lost)
    }

    /// Human-readable description of the current status, for error messages
    pub fn describe_en(&self) -> &'static str {
        match self {
            ItemStatus::Distributed => "already distributed",
            ItemStatus::Returned => "already returned",
            ItemStatus::Used => "already used",
            ItemStatus::Expired => "expired",
            ItemStatus::Lost => "lost",
        }
    }

    pub fn describe_vi(&self) -> &'static str {
        match self {
            ItemStatus::Distributed => "đã được phân phối",
            ItemStatus::Returned => "đã được trả lại",
            ItemStatus::Used => "đã được sử dụng",
            ItemStatus::Expired => "đã hết hạn",
            ItemStatus::Lost => "đã mất",
        }
    }
}

/// Actions recorded in the append-only history ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    Import,
    Distribute,
    Return,
    MarkUsed,
}

impl HistoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryAction::Import => "import",
            HistoryAction::Distribute => "distribute",
            HistoryAction::Return => "return",
            HistoryAction::MarkUsed => "mark_used",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "import" => Some(HistoryAction::Import),
            "distribute" => Some(HistoryAction::Distribute),
            "return" => Some(HistoryAction::Return),
            "mark_used" => Some(HistoryAction::MarkUsed),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            ItemStatus::Distributed,
            ItemStatus::Returned,
            ItemStatus::Used,
            ItemStatus::Expired,
            ItemStatus::Lost,
        ] {
            assert_eq!(ItemStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(ItemStatus::from_str("missing"), None);
    }

    #[test]
    fn test_only_returned_is_redistributable() {
        assert!(ItemStatus::Returned.can_distribute());
        assert!(!ItemStatus::Distributed.can_distribute());
        assert!(!ItemStatus::Used.can_distribute());
        assert!(!ItemStatus::Expired.can_distribute());
        assert!(!ItemStatus::Lost.can_distribute());
    }

    #[test]
    fn test_only_distributed_can_return_or_be_used() {
        assert!(ItemStatus::Distributed.can_return());
        assert!(ItemStatus::Distributed.can_mark_used());
        for status in [ItemStatus::Returned, ItemStatus::Used, ItemStatus::Expired, ItemStatus::Lost] {
            assert!(!status.can_return());
            assert!(!status.can_mark_used());
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(ItemStatus::Used.is_terminal());
        assert!(ItemStatus::Expired.is_terminal());
        assert!(ItemStatus::Lost.is_terminal());
        assert!(!ItemStatus::Distributed.is_terminal());
        assert!(!ItemStatus::Returned.is_terminal());
    }
}
