use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Payout details attached to a money claim or a donation remainder claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum PaymentInfo {
    Promptpay {
        #[serde(rename = "promptpayNumber")]
        number: String,
    },
    Bank {
        #[serde(rename = "bankName")]
        bank_name: String,
        #[serde(rename = "accountNumber")]
        account_number: String,
    },
}

impl PaymentInfo {
    pub fn method(&self) -> PaymentMethod {
        match self {
            PaymentInfo::Promptpay { .. } => PaymentMethod::Promptpay,
            PaymentInfo::Bank { .. } => PaymentMethod::Bank,
        }
    }

    /// One-line description for lists and confirmations.
    pub fn describe(&self) -> String {
        match self {
            PaymentInfo::Promptpay { number } => format!("PromptPay {number}"),
            PaymentInfo::Bank {
                bank_name,
                account_number,
            } => format!("{bank_name} {account_number}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaymentMethod {
    #[default]
    Promptpay,
    Bank,
}

/// Raw payout form contents before validation.
#[derive(Debug, Clone, Default)]
pub struct PaymentDraft {
    pub method: PaymentMethod,
    pub promptpay_number: String,
    pub bank_name: Option<String>,
    pub account_number: String,
}

impl PaymentDraft {
    pub fn promptpay(number: impl Into<String>) -> Self {
        Self {
            method: PaymentMethod::Promptpay,
            promptpay_number: number.into(),
            ..Default::default()
        }
    }

    pub fn bank(bank_name: impl Into<String>, account_number: impl Into<String>) -> Self {
        Self {
            method: PaymentMethod::Bank,
            bank_name: Some(bank_name.into()),
            account_number: account_number.into(),
            ..Default::default()
        }
    }

    /// Validate the fields required by the selected method.
    pub fn validate(&self) -> AppResult<PaymentInfo> {
        match self.method {
            PaymentMethod::Promptpay => {
                let number = self.promptpay_number.trim();
                if number.is_empty() {
                    return Err(AppError::ValidationError(
                        "PromptPay number is required".into(),
                    ));
                }
                Ok(PaymentInfo::Promptpay {
                    number: number.to_string(),
                })
            }
            PaymentMethod::Bank => {
                let bank_name = self
                    .bank_name
                    .as_deref()
                    .map(str::trim)
                    .filter(|b| !b.is_empty())
                    .ok_or_else(|| AppError::ValidationError("Please select a bank".into()))?;
                let account_number = self.account_number.trim();
                if account_number.is_empty() {
                    return Err(AppError::ValidationError(
                        "Account number is required".into(),
                    ));
                }
                Ok(PaymentInfo::Bank {
                    bank_name: bank_name.to_string(),
                    account_number: account_number.to_string(),
                })
            }
        }
    }
}

/// Parse a donation amount typed by the user. Must be a positive finite number.
pub fn parse_donation_amount(input: &str) -> AppResult<f64> {
    let amount: f64 = input
        .trim()
        .parse()
        .map_err(|_| AppError::ValidationError("Donation amount must be a number".into()))?;
    if !amount.is_finite() || amount <= 0.0 {
        return Err(AppError::ValidationError(
            "Donation amount must be greater than zero".into(),
        ));
    }
    Ok(amount)
}
