use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Decision state of a single requirement line.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, Default,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LineStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

/// Lifecycle of a requirement document. Closed state machine; transitions
/// are validated by the requirement service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RequirementStatus {
    Pending,
    PartiallyApproved,
    Approved,
    Rejected,
    Shipped,
    Delivered,
    Received,
}

impl RequirementStatus {
    /// Whether approval or rejection decisions are still accepted.
    pub fn is_decidable(self) -> bool {
        matches!(
            self,
            RequirementStatus::Pending | RequirementStatus::PartiallyApproved
        )
    }

    /// Whether a shipment can be raised against the requirement.
    pub fn is_shippable(self) -> bool {
        matches!(
            self,
            RequirementStatus::Approved | RequirementStatus::PartiallyApproved
        )
    }
}

/// One requested medicine within a requirement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequirementLine {
    pub medicine_id: Uuid,
    pub requested_quantity: i32,
    #[serde(default)]
    pub approved_quantity: i32,
    #[serde(default)]
    pub status: LineStatus,
}

impl RequirementLine {
    pub fn new(medicine_id: Uuid, requested_quantity: i32) -> Self {
        Self {
            medicine_id,
            requested_quantity,
            approved_quantity: 0,
            status: LineStatus::Pending,
        }
    }
}

/// Rolls line decisions up into an overall status.
pub fn rollup_status(lines: &[RequirementLine]) -> RequirementStatus {
    let total = lines.len();
    let pending = lines.iter().filter(|l| l.status == LineStatus::Pending).count();
    let approved = lines.iter().filter(|l| l.status == LineStatus::Approved).count();
    let rejected = lines.iter().filter(|l| l.status == LineStatus::Rejected).count();

    if pending > 0 {
        if approved > 0 {
            RequirementStatus::PartiallyApproved
        } else {
            RequirementStatus::Pending
        }
    } else if approved == 0 && rejected > 0 {
        RequirementStatus::Rejected
    } else if approved > 0 && rejected > 0 {
        RequirementStatus::PartiallyApproved
    } else if approved == total && total > 0 {
        RequirementStatus::Approved
    } else {
        RequirementStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn line(status: LineStatus) -> RequirementLine {
        RequirementLine {
            medicine_id: Uuid::new_v4(),
            requested_quantity: 10,
            approved_quantity: 0,
            status,
        }
    }

    #[test_case(&[LineStatus::Pending, LineStatus::Pending] => RequirementStatus::Pending)]
    #[test_case(&[LineStatus::Approved, LineStatus::Pending] => RequirementStatus::PartiallyApproved)]
    #[test_case(&[LineStatus::Rejected, LineStatus::Rejected] => RequirementStatus::Rejected)]
    #[test_case(&[LineStatus::Approved, LineStatus::Rejected] => RequirementStatus::PartiallyApproved)]
    #[test_case(&[LineStatus::Approved, LineStatus::Approved] => RequirementStatus::Approved)]
    #[test_case(&[LineStatus::Rejected, LineStatus::Pending] => RequirementStatus::Pending)]
    fn rollup(statuses: &[LineStatus]) -> RequirementStatus {
        let lines: Vec<_> = statuses.iter().copied().map(line).collect();
        rollup_status(&lines)
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            RequirementStatus::Pending,
            RequirementStatus::PartiallyApproved,
            RequirementStatus::Approved,
            RequirementStatus::Rejected,
            RequirementStatus::Shipped,
            RequirementStatus::Delivered,
            RequirementStatus::Received,
        ] {
            let parsed: RequirementStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn decidable_and_shippable_windows() {
        assert!(RequirementStatus::Pending.is_decidable());
        assert!(RequirementStatus::PartiallyApproved.is_decidable());
        assert!(!RequirementStatus::Shipped.is_decidable());
        assert!(RequirementStatus::Approved.is_shippable());
        assert!(!RequirementStatus::Rejected.is_shippable());
        assert!(!RequirementStatus::Received.is_shippable());
    }
}
