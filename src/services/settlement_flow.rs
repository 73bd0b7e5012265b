//! Walks one awarded prize to a single terminal payout.
//!
//! ```text
//! Initial --claim (no money)----------------------------> Submitting -> Done
//! Initial --claim (money)--> PaymentForm(Claim) --submit--> Submitting -> Done
//! Initial --donate--> DonateAmount --confirm (no money)--> Submitting -> Done
//!                     DonateAmount --confirm (money)--> PaymentForm(DonateRemainder)
//! DonateAmount | PaymentForm --cancel--> Initial
//! ```
//!
//! A failed submission returns to the state it was submitted from.

use std::cell::RefCell;
use std::rc::Rc;

use crate::cache::{CacheKey, ResponseCache};
use crate::error::{AppError, AppResult};
use crate::external::{ClaimRequest, DonateRequest, WheelBackend};
use crate::models::{
    PaymentDraft, PaymentInfo, Prize, SpinRecord, SpinStatus, parse_donation_amount,
};
use crate::utils::new_request_token;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMode {
    Claim,
    DonateRemainder,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Settlement {
    Claimed,
    Donated { amount: f64 },
    /// Part donated, the rest paid out to the supplied account.
    DonatedWithRemainderClaim { amount: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SettlementState {
    Initial,
    DonateAmount,
    PaymentForm(PaymentMode),
    Submitting,
    Done(Settlement),
}

#[derive(Clone, PartialEq)]
enum Submission {
    Claim(Option<PaymentInfo>),
    Donate {
        amount: f64,
        payment_info: Option<PaymentInfo>,
    },
}

struct FlowState {
    state: SettlementState,
    donation_amount: Option<f64>,
    last_error: Option<String>,
    /// Stable across retries of `last_submission`, replaced for any other.
    request_token: String,
    last_submission: Option<Submission>,
}

pub struct SettlementFlow<B: WheelBackend> {
    backend: Rc<B>,
    cache: Rc<ResponseCache>,
    record_id: String,
    user_id: String,
    prize: Prize,
    inner: RefCell<FlowState>,
}

impl<B: WheelBackend> SettlementFlow<B> {
    /// Start settling `record`, which must still be awarded and must be for `prize`.
    pub fn new(
        backend: Rc<B>,
        cache: Rc<ResponseCache>,
        record: &SpinRecord,
        prize: Prize,
    ) -> AppResult<Self> {
        if record.prize_id != prize.id {
            return Err(AppError::PreconditionFailed(format!(
                "Record {} is for prize {}, not {}",
                record.id, record.prize_id, prize.id
            )));
        }
        if record.status != SpinStatus::Awarded {
            return Err(AppError::StateViolation(format!(
                "Record {} is already {:?}",
                record.id, record.status
            )));
        }
        Ok(Self {
            backend,
            cache,
            record_id: record.id.clone(),
            user_id: record.user_id.clone(),
            prize,
            inner: RefCell::new(FlowState {
                state: SettlementState::Initial,
                donation_amount: None,
                last_error: None,
                request_token: new_request_token(),
                last_submission: None,
            }),
        })
    }

    pub fn state(&self) -> SettlementState {
        self.inner.borrow().state.clone()
    }

    pub fn prize(&self) -> &Prize {
        &self.prize
    }

    pub fn record_id(&self) -> &str {
        &self.record_id
    }

    /// Token the next submission will carry.
    pub fn request_token(&self) -> String {
        self.inner.borrow().request_token.clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.inner.borrow().last_error.clone()
    }

    pub fn donation_amount(&self) -> Option<f64> {
        self.inner.borrow().donation_amount
    }

    /// Controls stay disabled while submitting and once settled.
    pub fn controls_enabled(&self) -> bool {
        !matches!(
            self.inner.borrow().state,
            SettlementState::Submitting | SettlementState::Done(_)
        )
    }

    /// Claim the prize. Money prizes first need payout details.
    pub async fn claim(&self) -> AppResult<SettlementState> {
        self.require_state(|s| *s == SettlementState::Initial, "claim")?;
        if self.prize.is_money {
            return Ok(self.move_to(SettlementState::PaymentForm(PaymentMode::Claim)));
        }
        self.submit(SettlementState::Initial, Submission::Claim(None))
            .await
    }

    pub fn donate(&self) -> AppResult<SettlementState> {
        self.require_state(|s| *s == SettlementState::Initial, "donate")?;
        if !self.prize.is_donatable {
            return Err(AppError::StateViolation(format!(
                "{} cannot be donated",
                self.prize.name
            )));
        }
        Ok(self.move_to(SettlementState::DonateAmount))
    }

    /// Confirm the typed donation amount. Invalid amounts never reach the service.
    pub async fn confirm_donation(&self, amount_input: &str) -> AppResult<SettlementState> {
        self.require_state(|s| *s == SettlementState::DonateAmount, "confirm a donation")?;
        let amount = match parse_donation_amount(amount_input) {
            Ok(amount) => amount,
            Err(e) => return Err(self.record_error(e)),
        };
        self.inner.borrow_mut().donation_amount = Some(amount);

        if self.prize.is_money {
            return Ok(self.move_to(SettlementState::PaymentForm(PaymentMode::DonateRemainder)));
        }
        self.submit(
            SettlementState::DonateAmount,
            Submission::Donate {
                amount,
                payment_info: None,
            },
        )
        .await
    }

    /// Submit the payout form for either a claim or a donation remainder.
    pub async fn submit_payment(&self, draft: &PaymentDraft) -> AppResult<SettlementState> {
        let current = self.require_state(
            |s| matches!(s, SettlementState::PaymentForm(_)),
            "submit payout details",
        )?;
        let mode = match current {
            SettlementState::PaymentForm(mode) => mode,
            other => {
                return Err(AppError::StateViolation(format!(
                    "Cannot submit payout details from {other:?}"
                )));
            }
        };
        let payment_info = match draft.validate() {
            Ok(info) => info,
            Err(e) => return Err(self.record_error(e)),
        };

        let submission = match mode {
            PaymentMode::Claim => Submission::Claim(Some(payment_info)),
            PaymentMode::DonateRemainder => {
                let amount = self.donation_amount().ok_or_else(|| {
                    AppError::StateViolation("Donation amount was not confirmed".into())
                })?;
                Submission::Donate {
                    amount,
                    payment_info: Some(payment_info),
                }
            }
        };
        self.submit(SettlementState::PaymentForm(mode), submission)
            .await
    }

    /// Back out of the donation or payout form.
    pub fn cancel(&self) -> AppResult<SettlementState> {
        let current = self.require_state(
            |s| {
                matches!(
                    s,
                    SettlementState::Initial
                        | SettlementState::DonateAmount
                        | SettlementState::PaymentForm(_)
                )
            },
            "cancel",
        )?;
        if current == SettlementState::Initial {
            return Ok(current);
        }
        {
            let mut inner = self.inner.borrow_mut();
            inner.donation_amount = None;
            inner.last_submission = None;
            inner.request_token = new_request_token();
        }
        Ok(self.move_to(SettlementState::Initial))
    }

    fn require_state(
        &self,
        allowed: impl Fn(&SettlementState) -> bool,
        action: &str,
    ) -> AppResult<SettlementState> {
        let state = self.state();
        match state {
            SettlementState::Submitting => {
                log::warn!("Record {}: {action} rejected while submitting", self.record_id);
                Err(AppError::Busy("A submission is already in progress".into()))
            }
            SettlementState::Done(_) => Err(AppError::StateViolation(format!(
                "Record {} is already settled",
                self.record_id
            ))),
            s if allowed(&s) => Ok(s),
            s => Err(AppError::StateViolation(format!("Cannot {action} from {s:?}"))),
        }
    }

    fn move_to(&self, next: SettlementState) -> SettlementState {
        let mut inner = self.inner.borrow_mut();
        inner.state = next.clone();
        inner.last_error = None;
        next
    }

    fn record_error(&self, error: AppError) -> AppError {
        self.inner.borrow_mut().last_error = Some(error.user_message());
        error
    }

    fn token_for(&self, submission: &Submission) -> String {
        let mut inner = self.inner.borrow_mut();
        if inner
            .last_submission
            .as_ref()
            .is_some_and(|last| last != submission)
        {
            inner.request_token = new_request_token();
        }
        inner.last_submission = Some(submission.clone());
        inner.request_token.clone()
    }

    fn invalidate_history(&self) {
        self.cache
            .invalidate(&CacheKey::History(self.user_id.clone()));
        self.cache.invalidate(&CacheKey::AllHistory);
    }

    async fn submit(
        &self,
        origin: SettlementState,
        submission: Submission,
    ) -> AppResult<SettlementState> {
        let request_token = self.token_for(&submission);
        let guard = SubmitGuard::lock(&self.inner, origin);

        let result = match &submission {
            Submission::Claim(payment_info) => {
                log::info!(
                    "Claiming record {} ({})",
                    self.record_id,
                    payment_info
                        .as_ref()
                        .map_or_else(|| "no payout".to_string(), PaymentInfo::describe)
                );
                self.backend
                    .claim(&ClaimRequest {
                        spin_record_id: self.record_id.clone(),
                        payment_info: payment_info.clone(),
                        request_token: request_token.clone(),
                    })
                    .await
            }
            Submission::Donate {
                amount,
                payment_info,
            } => {
                log::info!("Donating {amount} from record {}", self.record_id);
                self.backend
                    .donate(&DonateRequest {
                        spin_record_id: self.record_id.clone(),
                        amount: *amount,
                        payment_info: payment_info.clone(),
                        request_token: request_token.clone(),
                    })
                    .await
            }
        };

        match result {
            Ok(()) => {
                let settlement = match submission {
                    Submission::Claim(_) => Settlement::Claimed,
                    Submission::Donate {
                        amount,
                        payment_info: None,
                    } => Settlement::Donated { amount },
                    Submission::Donate { amount, .. } => {
                        Settlement::DonatedWithRemainderClaim { amount }
                    }
                };
                let done = SettlementState::Done(settlement);
                guard.finish(done.clone());
                self.invalidate_history();
                Ok(done)
            }
            Err(e) => {
                log::warn!("Settlement of record {} failed: {e}", self.record_id);
                drop(guard);
                if matches!(e, AppError::StateViolation(_)) {
                    // the service holds a newer status than our cached history
                    self.invalidate_history();
                }
                Err(self.record_error(e))
            }
        }
    }
}

/// Holds the flow in `Submitting`. Unless finished, dropping it restores the
/// state the submission started from.
struct SubmitGuard<'a> {
    inner: &'a RefCell<FlowState>,
    origin: Option<SettlementState>,
}

impl<'a> SubmitGuard<'a> {
    fn lock(inner: &'a RefCell<FlowState>, origin: SettlementState) -> Self {
        {
            let mut flow = inner.borrow_mut();
            flow.state = SettlementState::Submitting;
            flow.last_error = None;
        }
        Self {
            inner,
            origin: Some(origin),
        }
    }

    fn finish(mut self, done: SettlementState) {
        self.origin = None;
        self.inner.borrow_mut().state = done;
    }
}

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        if let Some(origin) = self.origin.take() {
            self.inner.borrow_mut().state = origin;
        }
    }
}
