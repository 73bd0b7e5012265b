//! Keyed memo of read results for one running client.
//!
//! Entries never expire on their own. A value stays valid until a mutation
//! that could have changed it invalidates the key explicitly.

use chrono::{DateTime, Utc};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::hash::Hash;

use crate::models::{Prize, SpinRecord};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Prizes,
    History(String),
    AllHistory,
}

impl CacheKey {
    pub fn is_history(&self) -> bool {
        matches!(self, CacheKey::History(_) | CacheKey::AllHistory)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CachedResponse {
    Prizes(Vec<Prize>),
    History(Vec<SpinRecord>),
}

#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    /// Monotonic insertion sequence; a refresh gets a new one
    pub sequence: u64,
    pub inserted_at: DateTime<Utc>,
}

/// Single-threaded cache. Readers never block and every mutation is synchronous.
pub struct ResponseCache<K = CacheKey, V = CachedResponse> {
    entries: RefCell<HashMap<K, CacheEntry<V>>>,
    next_sequence: Cell<u64>,
}

impl<K: Eq + Hash + Clone + std::fmt::Debug, V: Clone> ResponseCache<K, V> {
    pub fn new() -> Self {
        Self {
            entries: RefCell::new(HashMap::new()),
            next_sequence: Cell::new(0),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.entries.borrow().get(key).map(|e| e.value.clone())
    }

    pub fn entry(&self, key: &K) -> Option<CacheEntry<V>> {
        self.entries.borrow().get(key).cloned()
    }

    pub fn set(&self, key: K, value: V) {
        let sequence = self.next_sequence.get();
        self.next_sequence.set(sequence + 1);
        self.entries.borrow_mut().insert(
            key,
            CacheEntry {
                value,
                sequence,
                inserted_at: Utc::now(),
            },
        );
    }

    pub fn invalidate(&self, key: &K) {
        if self.entries.borrow_mut().remove(key).is_some() {
            log::debug!("Cache invalidated: {key:?}");
        }
    }

    /// Drop every key a mutation could have affected.
    pub fn invalidate_matching(&self, mut pred: impl FnMut(&K) -> bool) {
        self.entries.borrow_mut().retain(|k, _| {
            let hit = pred(k);
            if hit {
                log::debug!("Cache invalidated: {k:?}");
            }
            !hit
        });
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Eq + Hash + Clone + std::fmt::Debug, V: Clone> Default for ResponseCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
