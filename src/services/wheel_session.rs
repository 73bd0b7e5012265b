use std::rc::Rc;

use crate::cache::ResponseCache;
use crate::config::WheelConfig;
use crate::error::{AppError, AppResult};
use crate::external::WheelBackend;
use crate::models::{Prize, SpinRecord, SpinResult, User};
use crate::services::{
    AnimationOutcome, CatalogService, SettlementFlow, SpinService, WheelAnimator,
};
use crate::session::SessionContext;

/// Result of one turn of the wheel.
#[derive(Debug, Clone, PartialEq)]
pub struct SpinTurn {
    pub result: SpinResult,
    pub animation: AnimationOutcome,
}

/// One signed-in user's wheel: spin, animate, then settle.
pub struct WheelSession<B: WheelBackend> {
    backend: Rc<B>,
    cache: Rc<ResponseCache>,
    session: Rc<SessionContext>,
    catalog: Rc<CatalogService<B>>,
    spinner: SpinService<B>,
    animator: WheelAnimator,
}

impl<B: WheelBackend> WheelSession<B> {
    pub fn new(
        backend: Rc<B>,
        cache: Rc<ResponseCache>,
        session: Rc<SessionContext>,
        wheel: WheelConfig,
    ) -> Self {
        Self::with_animator(backend, cache, session, WheelAnimator::new(wheel))
    }

    pub fn with_animator(
        backend: Rc<B>,
        cache: Rc<ResponseCache>,
        session: Rc<SessionContext>,
        animator: WheelAnimator,
    ) -> Self {
        let catalog = Rc::new(CatalogService::new(backend.clone(), cache.clone()));
        let spinner = SpinService::new(backend.clone(), cache.clone());
        Self {
            backend,
            cache,
            session,
            catalog,
            spinner,
            animator,
        }
    }

    pub fn catalog(&self) -> Rc<CatalogService<B>> {
        self.catalog.clone()
    }

    pub fn spinner(&self) -> &SpinService<B> {
        &self.spinner
    }

    pub fn animator(&self) -> &WheelAnimator {
        &self.animator
    }

    /// Re-read the signed-in user from the service.
    pub async fn refresh_user(&self) -> AppResult<User> {
        let current = self.session.require_user()?;
        let user = self.backend.get_user(&current.id).await?;
        self.session.sign_in(user.clone())?;
        Ok(user)
    }

    /// Spin for the signed-in user and animate onto the awarded prize.
    ///
    /// Once the service has taken the spin, the result is always returned and
    /// `on_complete` gets the awarded prize, even when the wheel cannot show it.
    pub async fn spin<F>(&self, on_complete: F) -> AppResult<SpinTurn>
    where
        F: FnOnce(&Prize),
    {
        let user = self.session.require_user()?;
        if user.spins_remaining == 0 {
            return Err(AppError::QuotaError("No spins remaining".into()));
        }
        let mut segments = self.catalog.segments().await?;

        let result = self.spinner.request_spin(&user.id).await?;
        if let Err(e) = self.session.set_spins_remaining(result.spins_remaining) {
            log::warn!("Could not persist remaining spins: {e}");
        }

        if !segments.iter().any(|p| p.id == result.prize.id) {
            // prize list changed since it was cached
            match self.reload_segments().await {
                Ok(fresh) => segments = fresh,
                Err(e) => log::warn!("Could not reload prizes after spin: {e}"),
            }
        }

        let animation = match self
            .animator
            .spin_to(&result.prize, &segments, |_| {})
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                log::warn!("Showing prize {} without the wheel: {e}", result.prize.id);
                AnimationOutcome::Skipped(result.prize.clone())
            }
        };
        match &animation {
            AnimationOutcome::Completed(prize) | AnimationOutcome::Skipped(prize) => {
                on_complete(prize)
            }
            AnimationOutcome::Ignored => {}
        }
        Ok(SpinTurn { result, animation })
    }

    async fn reload_segments(&self) -> AppResult<Vec<Prize>> {
        self.catalog.refresh_prizes().await?;
        self.catalog.segments().await
    }

    /// Start settling one of the signed-in user's awarded records.
    pub async fn settlement(&self, spin_record_id: &str) -> AppResult<SettlementFlow<B>> {
        let user = self.session.require_user()?;
        let record = match self.find_record(&user.id, spin_record_id, false).await? {
            Some(record) => Some(record),
            None => self.find_record(&user.id, spin_record_id, true).await?,
        }
        .ok_or_else(|| AppError::NotFound(format!("Spin record {spin_record_id} not found")))?;

        let prize = match self.catalog.find_prize(&record.prize_id).await? {
            Some(prize) => prize,
            None => self
                .catalog
                .refresh_prizes()
                .await?
                .into_iter()
                .find(|p| p.id == record.prize_id)
                .ok_or_else(|| AppError::NotFound(format!("Prize {} not found", record.prize_id)))?,
        };
        SettlementFlow::new(self.backend.clone(), self.cache.clone(), &record, prize)
    }

    async fn find_record(
        &self,
        user_id: &str,
        spin_record_id: &str,
        refresh: bool,
    ) -> AppResult<Option<SpinRecord>> {
        let history = if refresh {
            self.catalog.refresh_history(user_id).await?
        } else {
            self.catalog.history(user_id).await?
        };
        Ok(history.into_iter().find(|r| r.id == spin_record_id))
    }
}
