use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use crate::cache::{CacheKey, ResponseCache};
use crate::error::{AppError, AppResult};
use crate::external::WheelBackend;
use crate::models::{Prize, SpinRecord};
use crate::services::CatalogService;
use crate::session::SessionContext;

/// Asks the operator before an irreversible action.
pub trait Confirmer {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F: Fn(&str) -> bool> Confirmer for F {
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewOutcome {
    Transferred,
    Declined,
}

/// Operator side: confirming payouts and editing prizes.
///
/// Terminal statuses seen locally disable the action, but only the service can
/// guarantee that a record is transferred once.
pub struct AdminReviewService<B: WheelBackend> {
    backend: Rc<B>,
    cache: Rc<ResponseCache>,
    catalog: Rc<CatalogService<B>>,
    session: Rc<SessionContext>,
    in_flight: RefCell<HashSet<String>>,
}

impl<B: WheelBackend> AdminReviewService<B> {
    pub fn new(
        backend: Rc<B>,
        cache: Rc<ResponseCache>,
        catalog: Rc<CatalogService<B>>,
        session: Rc<SessionContext>,
    ) -> Self {
        Self {
            backend,
            cache,
            catalog,
            session,
            in_flight: RefCell::new(HashSet::new()),
        }
    }

    /// Records whose payout still waits for a transfer.
    pub async fn pending_transfers(&self) -> AppResult<Vec<SpinRecord>> {
        self.require_admin()?;
        Ok(self
            .catalog
            .all_history()
            .await?
            .into_iter()
            .filter(|r| r.status.awaits_transfer())
            .collect())
    }

    /// Whether the transfer action should be offered for this record.
    pub fn can_mark_transferred(&self, record: &SpinRecord) -> bool {
        record.status.awaits_transfer() && !self.in_flight.borrow().contains(&record.id)
    }

    pub async fn mark_transferred(
        &self,
        spin_record_id: &str,
        confirmer: &impl Confirmer,
    ) -> AppResult<ReviewOutcome> {
        self.require_admin()?;
        if spin_record_id.trim().is_empty() {
            return Err(AppError::ValidationError("Spin record id is required".into()));
        }

        let record = self
            .catalog
            .all_history()
            .await?
            .into_iter()
            .find(|r| r.id == spin_record_id)
            .ok_or_else(|| AppError::NotFound(format!("Spin record {spin_record_id} not found")))?;
        if !record.status.awaits_transfer() {
            return Err(AppError::StateViolation(format!(
                "Record {spin_record_id} is {:?} and cannot be marked transferred",
                record.status
            )));
        }
        if self.in_flight.borrow().contains(spin_record_id) {
            return Err(AppError::Busy(format!(
                "Record {spin_record_id} is already being marked transferred"
            )));
        }

        let payout = record
            .payment_info
            .as_ref()
            .map_or_else(|| "no payout details".to_string(), |p| p.describe());
        let prompt = format!(
            "Mark {} for user {} ({payout}) as transferred? This cannot be undone.",
            record.prize_name.as_deref().unwrap_or(&record.prize_id),
            record.user_id
        );
        if !confirmer.confirm(&prompt) {
            log::info!("Transfer of record {spin_record_id} declined by operator");
            return Ok(ReviewOutcome::Declined);
        }

        let _lock = InFlight::lock(&self.in_flight, spin_record_id);
        match self.backend.mark_transferred(spin_record_id).await {
            Ok(()) => {
                log::info!("Record {spin_record_id} marked transferred");
                self.invalidate_history(&record.user_id);
                Ok(ReviewOutcome::Transferred)
            }
            Err(e @ AppError::StateViolation(_)) => {
                log::warn!("Service refused transfer of record {spin_record_id}: {e}");
                self.invalidate_history(&record.user_id);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    fn invalidate_history(&self, user_id: &str) {
        self.cache.invalidate(&CacheKey::AllHistory);
        self.cache
            .invalidate(&CacheKey::History(user_id.to_string()));
    }

    /// Push an edited prize and drop the cached prize list.
    pub async fn update_prize(&self, prize: &Prize) -> AppResult<()> {
        self.require_admin()?;
        if prize.id.trim().is_empty() || prize.name.trim().is_empty() {
            return Err(AppError::ValidationError("Prize id and name are required".into()));
        }
        if !prize.probability.is_finite() || prize.probability < 0.0 {
            return Err(AppError::ValidationError(
                "Probability must be a non-negative number".into(),
            ));
        }
        self.backend.update_prize(prize).await?;
        self.cache.invalidate(&CacheKey::Prizes);
        Ok(())
    }

    fn require_admin(&self) -> AppResult<()> {
        if self.session.is_admin() {
            Ok(())
        } else {
            Err(AppError::PermissionDenied)
        }
    }
}

struct InFlight<'a> {
    set: &'a RefCell<HashSet<String>>,
    id: String,
}

impl<'a> InFlight<'a> {
    fn lock(set: &'a RefCell<HashSet<String>>, id: &str) -> Self {
        set.borrow_mut().insert(id.to_string());
        Self {
            set,
            id: id.to_string(),
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set.borrow_mut().remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PaymentInfo, SpinStatus};
    use crate::services::test_support::*;
    use crate::session::{KeyValueStore, MemoryStore};
    use std::cell::Cell;
    use std::time::Duration;

    struct Fixture {
        backend: Rc<FakeBackend>,
        cache: Rc<ResponseCache>,
        review: AdminReviewService<FakeBackend>,
    }

    fn fixture(signed_in: crate::models::User) -> Fixture {
        let backend = Rc::new(FakeBackend::with_prizes(vec![money_prize("cash")]));
        let mut claimed = record("r1", "u1", "cash", SpinStatus::Claimed);
        claimed.payment_info = Some(PaymentInfo::Promptpay {
            number: "0812345678".into(),
        });
        backend.records.borrow_mut().extend([
            claimed,
            record("r2", "u1", "cash", SpinStatus::Donated),
            record("r3", "u2", "cash", SpinStatus::Transferred),
            record("r4", "u2", "cash", SpinStatus::Awarded),
        ]);
        let cache = Rc::new(ResponseCache::new());
        let catalog = Rc::new(CatalogService::new(backend.clone(), cache.clone()));
        let store: Rc<dyn KeyValueStore> = Rc::new(MemoryStore::new());
        let session = Rc::new(SessionContext::init(store).unwrap());
        session.sign_in(signed_in).unwrap();
        let review = AdminReviewService::new(backend.clone(), cache.clone(), catalog, session);
        Fixture {
            backend,
            cache,
            review,
        }
    }

    fn yes(_: &str) -> bool {
        true
    }

    #[tokio::test]
    async fn test_pending_transfers_skip_settled_records() {
        let f = fixture(admin("ops"));
        let pending = f.review.pending_transfers().await.unwrap();
        let ids: Vec<&str> = pending.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r1", "r4"]);
    }

    #[tokio::test]
    async fn test_mark_transferred_after_confirmation() {
        let f = fixture(admin("ops"));
        let prompts = RefCell::new(Vec::new());
        let confirmer = |p: &str| {
            prompts.borrow_mut().push(p.to_string());
            true
        };
        let outcome = f.review.mark_transferred("r1", &confirmer).await.unwrap();
        assert_eq!(outcome, ReviewOutcome::Transferred);
        assert_eq!(f.backend.record_status("r1"), Some(SpinStatus::Transferred));
        assert!(prompts.borrow()[0].contains("PromptPay 0812345678"));
        assert!(f.cache.get(&CacheKey::AllHistory).is_none());

        // fresh view now shows the record as terminal
        let err = f.review.mark_transferred("r1", &yes).await.unwrap_err();
        assert!(matches!(err, AppError::StateViolation(_)));
        assert_eq!(f.backend.call_count("markTransferred"), 1);
    }

    #[tokio::test]
    async fn test_terminal_records_are_rejected_without_network() {
        let f = fixture(admin("ops"));
        for id in ["r2", "r3"] {
            let err = f.review.mark_transferred(id, &yes).await.unwrap_err();
            assert!(matches!(err, AppError::StateViolation(_)));
        }
        assert_eq!(f.backend.call_count("markTransferred"), 0);
    }

    #[tokio::test]
    async fn test_declined_confirmation_makes_no_call() {
        let f = fixture(admin("ops"));
        let outcome = f
            .review
            .mark_transferred("r4", &|_: &str| false)
            .await
            .unwrap();
        assert_eq!(outcome, ReviewOutcome::Declined);
        assert_eq!(f.backend.call_count("markTransferred"), 0);
    }

    #[tokio::test]
    async fn test_service_rejection_is_not_assumed_success() {
        let f = fixture(admin("ops"));
        f.backend.fail_next(
            "markTransferred",
            AppError::StateViolation("Already transferred by another operator".into()),
        );
        let err = f.review.mark_transferred("r4", &yes).await.unwrap_err();
        assert!(matches!(err, AppError::StateViolation(_)));
        assert!(!err.is_retryable());
        assert!(f.cache.get(&CacheKey::AllHistory).is_none());
        assert_eq!(f.backend.record_status("r4"), Some(SpinStatus::Awarded));
    }

    #[tokio::test]
    async fn test_transient_failure_keeps_cached_history() {
        let f = fixture(admin("ops"));
        f.backend.fail_next(
            "markTransferred",
            AppError::BackendError("Sheet unavailable".into()),
        );
        let err = f.review.mark_transferred("r4", &yes).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(f.cache.get(&CacheKey::AllHistory).is_some());
        f.review.mark_transferred("r4", &yes).await.unwrap();
        assert_eq!(f.backend.record_status("r4"), Some(SpinStatus::Transferred));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_transfer_of_same_record_is_rejected() {
        let f = fixture(admin("ops"));
        f.review.pending_transfers().await.unwrap();
        f.backend.set_delay(Duration::from_millis(200));
        let asked = Cell::new(0);
        let confirmer = |_: &str| {
            asked.set(asked.get() + 1);
            true
        };

        let (first, second) = tokio::join!(f.review.mark_transferred("r4", &confirmer), async {
            tokio::task::yield_now().await;
            f.review.mark_transferred("r4", &confirmer).await
        });
        assert!(first.is_ok());
        assert!(matches!(second, Err(AppError::Busy(_))));
        assert_eq!(asked.get(), 1);
        assert_eq!(f.backend.call_count("markTransferred"), 1);
    }

    #[tokio::test]
    async fn test_non_admin_is_denied() {
        let f = fixture(user("u1", 1));
        assert!(matches!(
            f.review.mark_transferred("r1", &yes).await,
            Err(AppError::PermissionDenied)
        ));
        assert!(matches!(
            f.review.pending_transfers().await,
            Err(AppError::PermissionDenied)
        ));
    }

    #[tokio::test]
    async fn test_update_prize_invalidates_prize_list() {
        let f = fixture(admin("ops"));
        let catalog = CatalogService::new(f.backend.clone(), f.cache.clone());
        assert_eq!(catalog.prizes().await.unwrap().len(), 1);

        let mut edited = money_prize("cash");
        edited.name = "500 THB".into();
        f.review.update_prize(&edited).await.unwrap();
        assert!(f.cache.get(&CacheKey::Prizes).is_none());
        assert_eq!(catalog.prizes().await.unwrap()[0].name, "500 THB");

        edited.probability = f64::NAN;
        assert!(matches!(
            f.review.update_prize(&edited).await,
            Err(AppError::ValidationError(_))
        ));
    }
}
