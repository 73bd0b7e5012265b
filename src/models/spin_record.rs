use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::PaymentInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpinStatus {
    Awarded,
    Claimed,
    Donated,
    Transferred,
}

impl SpinStatus {
    /// Status lifecycle is monotonic: awarded settles once, and only a claimed
    /// payout can still move on to transferred. Donations settle themselves.
    pub fn can_transition_to(self, next: SpinStatus) -> bool {
        use SpinStatus::*;
        matches!(
            (self, next),
            (Awarded, Claimed) | (Awarded, Donated) | (Awarded, Transferred) | (Claimed, Transferred)
        )
    }

    pub fn is_settled(self) -> bool {
        self != SpinStatus::Awarded
    }

    /// Whether an operator may still mark the payout as transferred.
    pub fn awaits_transfer(self) -> bool {
        self.can_transition_to(SpinStatus::Transferred)
    }
}

/// Durable result of one spin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpinRecord {
    pub id: String,
    pub user_id: String,
    pub prize_id: String,
    /// Prize name at the time of the draw
    #[serde(default)]
    pub prize_name: Option<String>,
    pub status: SpinStatus,
    #[serde(default)]
    pub payment_info: Option<PaymentInfo>,
    #[serde(default)]
    pub donation_amount: Option<f64>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_transitions_are_monotonic() {
        use SpinStatus::*;
        assert!(Awarded.can_transition_to(Claimed));
        assert!(Awarded.can_transition_to(Donated));
        assert!(Claimed.can_transition_to(Transferred));
        assert!(!Claimed.can_transition_to(Awarded));
        assert!(!Donated.can_transition_to(Transferred));
        assert!(!Transferred.can_transition_to(Transferred));
        assert!(!Donated.awaits_transfer());
        assert!(Claimed.awaits_transfer());
        assert!(!Awarded.is_settled());
    }

    #[test]
    fn test_deserialize_record_with_payment() {
        let record: SpinRecord = serde_json::from_value(json!({
            "id": "r-9",
            "userId": "u-1",
            "prizeId": "p-1",
            "status": "claimed",
            "paymentInfo": {"method": "promptpay", "promptpayNumber": "0812345678"},
            "createdAt": "2026-01-05T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(record.status, SpinStatus::Claimed);
        assert!(matches!(
            record.payment_info,
            Some(PaymentInfo::Promptpay { .. })
        ));
        assert_eq!(record.donation_amount, None);
    }
}
