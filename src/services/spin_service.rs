use std::cell::RefCell;
use std::rc::Rc;

use crate::cache::{CacheKey, ResponseCache};
use crate::error::{AppError, AppResult};
use crate::external::WheelBackend;
use crate::models::SpinResult;
use crate::utils::BusyFlag;

/// Last spin attempt as shown to the user.
#[derive(Debug, Clone, PartialEq)]
pub enum SpinOutcome {
    Won(SpinResult),
    Failed(String),
}

/// Issues at most one spin request at a time for this session.
pub struct SpinService<B: WheelBackend> {
    backend: Rc<B>,
    cache: Rc<ResponseCache>,
    busy: BusyFlag,
    last_outcome: RefCell<Option<SpinOutcome>>,
}

impl<B: WheelBackend> SpinService<B> {
    pub fn new(backend: Rc<B>, cache: Rc<ResponseCache>) -> Self {
        Self {
            backend,
            cache,
            busy: BusyFlag::new(),
            last_outcome: RefCell::new(None),
        }
    }

    pub fn is_spinning(&self) -> bool {
        self.busy.is_busy()
    }

    pub fn last_outcome(&self) -> Option<SpinOutcome> {
        self.last_outcome.borrow().clone()
    }

    /// Spin once for `user_id`.
    ///
    /// A call made while another is in flight is rejected here without
    /// reaching the service. Failures are not retried. The caller persists
    /// the returned spins-remaining.
    pub async fn request_spin(&self, user_id: &str) -> AppResult<SpinResult> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(AppError::ValidationError("User id is required".into()));
        }
        let Some(_guard) = self.busy.try_acquire() else {
            log::warn!("Spin rejected for {user_id}: a spin is already in flight");
            return Err(AppError::Busy("A spin is already in progress".into()));
        };

        match self.backend.spin(user_id).await {
            Ok(result) => {
                log::info!(
                    "User {user_id} won prize {} ({} spins left)",
                    result.prize.id,
                    result.spins_remaining
                );
                // the new record shows up in both history views
                self.cache
                    .invalidate(&CacheKey::History(user_id.to_string()));
                self.cache.invalidate(&CacheKey::AllHistory);
                *self.last_outcome.borrow_mut() = Some(SpinOutcome::Won(result.clone()));
                Ok(result)
            }
            Err(e) => {
                log::warn!("Spin failed for {user_id}: {e}");
                *self.last_outcome.borrow_mut() = Some(SpinOutcome::Failed(e.user_message()));
                Err(e)
            }
        }
    }
}
