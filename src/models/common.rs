use serde::{Deserialize, Serialize};

use super::{PaymentInfo, Prize, SpinRecord, User};
use crate::error::{AppError, AppResult};

/// Failure codes the service uses when the spin allowance or event window is exhausted.
pub const QUOTA_ERROR_CODES: [&str; 2] = ["NO_SPINS_REMAINING", "EVENT_CLOSED"];

/// Failure codes for a record whose status already moved past the requested change.
pub const STATE_CONFLICT_CODES: [&str; 2] = ["ALREADY_SETTLED", "INVALID_STATUS"];

/// Every call is a POST of one of these actions to the same endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(
    tag = "action",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ApiRequest {
    Spin {
        user_id: String,
    },
    GetPrizes,
    GetUser {
        user_id: String,
    },
    Claim {
        spin_record_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        payment_info: Option<PaymentInfo>,
        request_token: String,
    },
    Donate {
        spin_record_id: String,
        amount: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        payment_info: Option<PaymentInfo>,
        request_token: String,
    },
    MarkTransferred {
        spin_record_id: String,
    },
    GetHistory {
        user_id: String,
    },
    GetAllHistory,
    UpdatePrize {
        prize: Prize,
    },
}

impl ApiRequest {
    pub fn action(&self) -> &'static str {
        match self {
            ApiRequest::Spin { .. } => "spin",
            ApiRequest::GetPrizes => "getPrizes",
            ApiRequest::GetUser { .. } => "getUser",
            ApiRequest::Claim { .. } => "claim",
            ApiRequest::Donate { .. } => "donate",
            ApiRequest::MarkTransferred { .. } => "markTransferred",
            ApiRequest::GetHistory { .. } => "getHistory",
            ApiRequest::GetAllHistory => "getAllHistory",
            ApiRequest::UpdatePrize { .. } => "updatePrize",
        }
    }
}

/// Response envelope: `{success, error?, code?, ...payload}`.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(flatten)]
    pub body: T,
}

impl<T> ApiResponse<T> {
    pub fn into_result(self, action: &str) -> AppResult<T> {
        if self.success {
            return Ok(self.body);
        }
        let message = self
            .error
            .unwrap_or_else(|| format!("{action} request failed"));
        match self.code.as_deref() {
            Some(code) if QUOTA_ERROR_CODES.contains(&code) => Err(AppError::QuotaError(message)),
            Some(code) if STATE_CONFLICT_CODES.contains(&code) => {
                Err(AppError::StateViolation(message))
            }
            _ => Err(AppError::BackendError(message)),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpinPayload {
    #[serde(default)]
    pub prize: Option<Prize>,
    #[serde(default)]
    pub spins_remaining: Option<u32>,
    #[serde(default)]
    pub spin_record_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PrizesPayload {
    #[serde(default)]
    pub prizes: Vec<Prize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryPayload {
    #[serde(default)]
    pub history: Vec<SpinRecord>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserPayload {
    #[serde(default)]
    pub user: Option<User>,
}

/// Payload of calls that only acknowledge.
#[derive(Debug, Default, Deserialize)]
pub struct Ack {}

/// Successful spin as seen by the client.
#[derive(Debug, Clone, PartialEq)]
pub struct SpinResult {
    pub prize: Prize,
    pub spins_remaining: u32,
    pub spin_record_id: Option<String>,
}

impl TryFrom<SpinPayload> for SpinResult {
    type Error = AppError;

    fn try_from(payload: SpinPayload) -> AppResult<Self> {
        match (payload.prize, payload.spins_remaining) {
            (Some(prize), Some(spins_remaining)) => Ok(SpinResult {
                prize,
                spins_remaining,
                spin_record_id: payload.spin_record_id,
            }),
            _ => Err(AppError::BackendError(
                "Spin response is missing the prize or spins remaining".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_wire_format() {
        let req = ApiRequest::Donate {
            spin_record_id: "r-1".into(),
            amount: 20.0,
            payment_info: None,
            request_token: "tok".into(),
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"action": "donate", "spinRecordId": "r-1", "amount": 20.0, "requestToken": "tok"})
        );
        assert_eq!(
            serde_json::to_value(ApiRequest::GetPrizes).unwrap(),
            json!({"action": "getPrizes"})
        );
        assert_eq!(req.action(), "donate");
    }

    #[test]
    fn test_failure_classification() {
        let resp: ApiResponse<SpinPayload> = serde_json::from_value(json!({
            "success": false,
            "error": "No spins left",
            "code": "NO_SPINS_REMAINING"
        }))
        .unwrap();
        assert!(matches!(resp.into_result("spin"), Err(AppError::QuotaError(m)) if m == "No spins left"));

        let resp: ApiResponse<Ack> =
            serde_json::from_value(json!({"success": false})).unwrap();
        assert!(matches!(resp.into_result("claim"), Err(AppError::BackendError(m)) if m == "claim request failed"));
    }

    #[test]
    fn test_settled_record_conflict_is_not_retryable() {
        let resp: ApiResponse<Ack> = serde_json::from_value(json!({
            "success": false,
            "error": "Record already transferred",
            "code": "ALREADY_SETTLED"
        }))
        .unwrap();
        let err = resp.into_result("markTransferred").unwrap_err();
        assert!(matches!(err, AppError::StateViolation(ref m) if m == "Record already transferred"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_spin_payload_requires_prize() {
        let resp: ApiResponse<SpinPayload> =
            serde_json::from_value(json!({"success": true, "spinsRemaining": 2})).unwrap();
        let payload = resp.into_result("spin").unwrap();
        assert!(SpinResult::try_from(payload).is_err());
    }
}
