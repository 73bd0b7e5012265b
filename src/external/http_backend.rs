use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::{ClaimRequest, DonateRequest, WheelBackend};
use crate::config::ApiConfig;
use crate::error::{AppError, AppResult};
use crate::models::{
    Ack, ApiRequest, ApiResponse, HistoryPayload, Prize, PrizesPayload, SpinPayload, SpinRecord,
    SpinResult, User, UserPayload,
};

/// Speaks the single-endpoint action protocol over HTTPS.
#[derive(Clone)]
pub struct HttpWheelBackend {
    client: Client,
    config: ApiConfig,
}

impl HttpWheelBackend {
    pub fn new(config: ApiConfig) -> AppResult<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    async fn call<T: DeserializeOwned>(&self, request: &ApiRequest) -> AppResult<T> {
        let action = request.action();
        log::debug!("Calling wheel service action {action}");

        let mut builder = self.client.post(&self.config.base_url).json(request);
        if let ApiRequest::Claim { request_token, .. } | ApiRequest::Donate { request_token, .. } =
            request
        {
            builder = builder.header("Idempotency-Key", request_token);
        }
        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            log::error!("Wheel service {action} failed: HTTP {}: {error_text}", status.as_u16());
            return Err(AppError::BackendError(format!(
                "{action} failed with HTTP {}",
                status.as_u16()
            )));
        }

        let body: ApiResponse<T> = response.json().await?;
        body.into_result(action)
    }
}

impl WheelBackend for HttpWheelBackend {
    async fn spin(&self, user_id: &str) -> AppResult<SpinResult> {
        let payload: SpinPayload = self
            .call(&ApiRequest::Spin {
                user_id: user_id.to_string(),
            })
            .await?;
        payload.try_into()
    }

    async fn get_prizes(&self) -> AppResult<Vec<Prize>> {
        let payload: PrizesPayload = self.call(&ApiRequest::GetPrizes).await?;
        Ok(payload.prizes)
    }

    async fn get_user(&self, user_id: &str) -> AppResult<User> {
        let payload: UserPayload = self
            .call(&ApiRequest::GetUser {
                user_id: user_id.to_string(),
            })
            .await?;
        payload
            .user
            .ok_or_else(|| AppError::NotFound(format!("User {user_id} not found")))
    }

    async fn claim(&self, request: &ClaimRequest) -> AppResult<()> {
        let _: Ack = self
            .call(&ApiRequest::Claim {
                spin_record_id: request.spin_record_id.clone(),
                payment_info: request.payment_info.clone(),
                request_token: request.request_token.clone(),
            })
            .await?;
        Ok(())
    }

    async fn donate(&self, request: &DonateRequest) -> AppResult<()> {
        let _: Ack = self
            .call(&ApiRequest::Donate {
                spin_record_id: request.spin_record_id.clone(),
                amount: request.amount,
                payment_info: request.payment_info.clone(),
                request_token: request.request_token.clone(),
            })
            .await?;
        Ok(())
    }

    async fn mark_transferred(&self, spin_record_id: &str) -> AppResult<()> {
        let _: Ack = self
            .call(&ApiRequest::MarkTransferred {
                spin_record_id: spin_record_id.to_string(),
            })
            .await?;
        Ok(())
    }

    async fn get_history(&self, user_id: &str) -> AppResult<Vec<SpinRecord>> {
        let payload: HistoryPayload = self
            .call(&ApiRequest::GetHistory {
                user_id: user_id.to_string(),
            })
            .await?;
        Ok(payload.history)
    }

    async fn get_all_history(&self) -> AppResult<Vec<SpinRecord>> {
        let payload: HistoryPayload = self.call(&ApiRequest::GetAllHistory).await?;
        Ok(payload.history)
    }

    async fn update_prize(&self, prize: &Prize) -> AppResult<()> {
        let _: Ack = self
            .call(&ApiRequest::UpdatePrize {
                prize: prize.clone(),
            })
            .await?;
        Ok(())
    }
}
