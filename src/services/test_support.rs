//! In-memory stand-in for the prize service, recording every call.

use chrono::{TimeZone, Utc};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use crate::error::{AppError, AppResult};
use crate::external::{ClaimRequest, DonateRequest, WheelBackend};
use crate::models::{Prize, Role, SpinRecord, SpinResult, SpinStatus, UNLIMITED_QUANTITY, User};

#[derive(Default)]
pub struct FakeBackend {
    pub calls: RefCell<Vec<String>>,
    pub claims: RefCell<Vec<ClaimRequest>>,
    pub donations: RefCell<Vec<DonateRequest>>,
    pub prizes: RefCell<Vec<Prize>>,
    pub records: RefCell<Vec<SpinRecord>>,
    pub users: RefCell<Vec<User>>,
    spin_results: RefCell<VecDeque<AppResult<SpinResult>>>,
    failures: RefCell<HashMap<&'static str, VecDeque<AppError>>>,
    delay: Cell<Duration>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prizes(prizes: Vec<Prize>) -> Self {
        let backend = Self::new();
        *backend.prizes.borrow_mut() = prizes;
        backend
    }

    /// Every call sleeps this long before answering.
    pub fn set_delay(&self, delay: Duration) {
        self.delay.set(delay);
    }

    pub fn push_spin(&self, result: AppResult<SpinResult>) {
        self.spin_results.borrow_mut().push_back(result);
    }

    pub fn fail_next(&self, action: &'static str, error: AppError) {
        self.failures
            .borrow_mut()
            .entry(action)
            .or_default()
            .push_back(error);
    }

    pub fn call_count(&self, action: &str) -> usize {
        self.calls.borrow().iter().filter(|c| *c == action).count()
    }

    pub fn record_status(&self, id: &str) -> Option<SpinStatus> {
        self.records
            .borrow()
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.status)
    }

    async fn enter(&self, action: &'static str) -> AppResult<()> {
        self.calls.borrow_mut().push(action.to_string());
        let delay = self.delay.get();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let failure = self
            .failures
            .borrow_mut()
            .get_mut(action)
            .and_then(VecDeque::pop_front);
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn settle(&self, id: &str, next: SpinStatus) -> AppResult<()> {
        let mut records = self.records.borrow_mut();
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| AppError::BackendError(format!("Unknown record {id}")))?;
        if !record.status.can_transition_to(next) {
            return Err(AppError::StateViolation(format!(
                "Record {id} is already {:?}",
                record.status
            )));
        }
        record.status = next;
        Ok(())
    }
}

impl WheelBackend for FakeBackend {
    async fn spin(&self, _user_id: &str) -> AppResult<SpinResult> {
        self.enter("spin").await?;
        self.spin_results
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(AppError::BackendError("No spin scripted".into())))
    }

    async fn get_prizes(&self) -> AppResult<Vec<Prize>> {
        self.enter("getPrizes").await?;
        Ok(self.prizes.borrow().clone())
    }

    async fn get_user(&self, user_id: &str) -> AppResult<User> {
        self.enter("getUser").await?;
        self.users
            .borrow()
            .iter()
            .find(|u| u.id == user_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("User {user_id} not found")))
    }

    async fn claim(&self, request: &ClaimRequest) -> AppResult<()> {
        self.claims.borrow_mut().push(request.clone());
        self.enter("claim").await?;
        self.settle(&request.spin_record_id, SpinStatus::Claimed)
    }

    async fn donate(&self, request: &DonateRequest) -> AppResult<()> {
        self.donations.borrow_mut().push(request.clone());
        self.enter("donate").await?;
        self.settle(&request.spin_record_id, SpinStatus::Donated)
    }

    async fn mark_transferred(&self, spin_record_id: &str) -> AppResult<()> {
        self.enter("markTransferred").await?;
        self.settle(spin_record_id, SpinStatus::Transferred)
    }

    async fn get_history(&self, user_id: &str) -> AppResult<Vec<SpinRecord>> {
        self.enter("getHistory").await?;
        Ok(self
            .records
            .borrow()
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn get_all_history(&self) -> AppResult<Vec<SpinRecord>> {
        self.enter("getAllHistory").await?;
        Ok(self.records.borrow().clone())
    }

    async fn update_prize(&self, prize: &Prize) -> AppResult<()> {
        self.enter("updatePrize").await?;
        let mut prizes = self.prizes.borrow_mut();
        match prizes.iter_mut().find(|p| p.id == prize.id) {
            Some(existing) => *existing = prize.clone(),
            None => prizes.push(prize.clone()),
        }
        Ok(())
    }
}

pub fn prize(id: &str) -> Prize {
    Prize {
        id: id.to_string(),
        name: format!("Prize {id}"),
        description: String::new(),
        image_url: None,
        probability: 1.0,
        quantity: UNLIMITED_QUANTITY,
        color: "#ff0000".to_string(),
        is_active: true,
        is_donatable: false,
        is_money: false,
    }
}

pub fn money_prize(id: &str) -> Prize {
    Prize {
        is_money: true,
        is_donatable: true,
        ..prize(id)
    }
}

pub fn record(id: &str, user_id: &str, prize_id: &str, status: SpinStatus) -> SpinRecord {
    SpinRecord {
        id: id.to_string(),
        user_id: user_id.to_string(),
        prize_id: prize_id.to_string(),
        prize_name: Some(format!("Prize {prize_id}")),
        status,
        payment_info: None,
        donation_amount: None,
        created_at: Utc.with_ymd_and_hms(2026, 1, 5, 10, 0, 0).unwrap(),
    }
}

pub fn user(id: &str, spins_remaining: u32) -> User {
    User {
        id: id.to_string(),
        spins_remaining,
        role: Role::User,
    }
}

pub fn admin(id: &str) -> User {
    User {
        role: Role::Admin,
        ..user(id, 0)
    }
}

pub fn spin_result(prize: Prize, spins_remaining: u32, record_id: &str) -> SpinResult {
    SpinResult {
        prize,
        spins_remaining,
        spin_record_id: Some(record_id.to_string()),
    }
}
