use std::rc::Rc;

use crate::cache::{CacheKey, CachedResponse, ResponseCache};
use crate::error::AppResult;
use crate::external::WheelBackend;
use crate::models::{Prize, SpinRecord, visible_segments};

/// Cached read paths: prize list and spin history.
pub struct CatalogService<B: WheelBackend> {
    backend: Rc<B>,
    cache: Rc<ResponseCache>,
}

impl<B: WheelBackend> CatalogService<B> {
    pub fn new(backend: Rc<B>, cache: Rc<ResponseCache>) -> Self {
        Self { backend, cache }
    }

    /// Prize list, from cache when present.
    pub async fn prizes(&self) -> AppResult<Vec<Prize>> {
        if let Some(CachedResponse::Prizes(prizes)) = self.cache.get(&CacheKey::Prizes) {
            return Ok(prizes);
        }
        self.refresh_prizes().await
    }

    pub async fn refresh_prizes(&self) -> AppResult<Vec<Prize>> {
        let prizes = self.backend.get_prizes().await?;
        self.cache
            .set(CacheKey::Prizes, CachedResponse::Prizes(prizes.clone()));
        Ok(prizes)
    }

    /// Segments currently drawn on the wheel.
    pub async fn segments(&self) -> AppResult<Vec<Prize>> {
        Ok(visible_segments(&self.prizes().await?))
    }

    pub async fn find_prize(&self, prize_id: &str) -> AppResult<Option<Prize>> {
        Ok(self.prizes().await?.into_iter().find(|p| p.id == prize_id))
    }

    pub async fn history(&self, user_id: &str) -> AppResult<Vec<SpinRecord>> {
        let key = CacheKey::History(user_id.to_string());
        if let Some(CachedResponse::History(history)) = self.cache.get(&key) {
            return Ok(history);
        }
        self.refresh_history(user_id).await
    }

    pub async fn refresh_history(&self, user_id: &str) -> AppResult<Vec<SpinRecord>> {
        let history = self.backend.get_history(user_id).await?;
        self.cache.set(
            CacheKey::History(user_id.to_string()),
            CachedResponse::History(history.clone()),
        );
        Ok(history)
    }

    /// Every user's records, for the admin review.
    pub async fn all_history(&self) -> AppResult<Vec<SpinRecord>> {
        if let Some(CachedResponse::History(history)) = self.cache.get(&CacheKey::AllHistory) {
            return Ok(history);
        }
        self.refresh_all_history().await
    }

    pub async fn refresh_all_history(&self) -> AppResult<Vec<SpinRecord>> {
        let history = self.backend.get_all_history().await?;
        self.cache
            .set(CacheKey::AllHistory, CachedResponse::History(history.clone()));
        Ok(history)
    }
}
