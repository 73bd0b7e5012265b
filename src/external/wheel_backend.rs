use crate::error::AppResult;
use crate::models::{PaymentInfo, Prize, SpinRecord, SpinResult, User};

/// Claim submission. `request_token` stays the same across retries of one settlement.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimRequest {
    pub spin_record_id: String,
    pub payment_info: Option<PaymentInfo>,
    pub request_token: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DonateRequest {
    pub spin_record_id: String,
    pub amount: f64,
    pub payment_info: Option<PaymentInfo>,
    pub request_token: String,
}

/// The prize service. Opaque, possibly slow and possibly failing; it is the only
/// authority on spin quotas and on which settlement of a record wins.
#[allow(async_fn_in_trait)]
pub trait WheelBackend {
    async fn spin(&self, user_id: &str) -> AppResult<SpinResult>;

    async fn get_prizes(&self) -> AppResult<Vec<Prize>>;

    async fn get_user(&self, user_id: &str) -> AppResult<User>;

    async fn claim(&self, request: &ClaimRequest) -> AppResult<()>;

    async fn donate(&self, request: &DonateRequest) -> AppResult<()>;

    async fn mark_transferred(&self, spin_record_id: &str) -> AppResult<()>;

    async fn get_history(&self, user_id: &str) -> AppResult<Vec<SpinRecord>>;

    async fn get_all_history(&self) -> AppResult<Vec<SpinRecord>>;

    async fn update_prize(&self, prize: &Prize) -> AppResult<()>;
}
