use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

use super::KeyValueStore;
use crate::error::{AppError, AppResult};
use crate::models::User;

const SESSION_KEY: &str = "wheel.session";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub user: Option<User>,
}

/// Session of one running client, created at startup and passed explicitly
/// to whatever needs the signed-in user.
pub struct SessionContext {
    store: Rc<dyn KeyValueStore>,
    state: RefCell<SessionState>,
}

impl SessionContext {
    /// Load the persisted session, or start empty when there is none or it cannot be read.
    pub fn init(store: Rc<dyn KeyValueStore>) -> AppResult<Self> {
        let state = match store.get(SESSION_KEY)? {
            Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                log::warn!("Discarding unreadable session: {e}");
                SessionState::default()
            }),
            None => SessionState::default(),
        };
        Ok(Self {
            store,
            state: RefCell::new(state),
        })
    }

    /// Forget the user and wipe the backing store.
    pub fn teardown(&self) -> AppResult<()> {
        self.store.clear()?;
        *self.state.borrow_mut() = SessionState::default();
        Ok(())
    }

    pub fn user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    pub fn user_id(&self) -> Option<String> {
        self.state.borrow().user.as_ref().map(|u| u.id.clone())
    }

    pub fn require_user(&self) -> AppResult<User> {
        self.user()
            .ok_or_else(|| AppError::StateViolation("No user signed in".into()))
    }

    pub fn is_admin(&self) -> bool {
        self.state
            .borrow()
            .user
            .as_ref()
            .is_some_and(|u| u.is_admin())
    }

    pub fn sign_in(&self, user: User) -> AppResult<()> {
        self.state.borrow_mut().user = Some(user);
        self.persist()
    }

    /// Mirror the spins-remaining value returned by the service.
    pub fn set_spins_remaining(&self, spins_remaining: u32) -> AppResult<()> {
        {
            let mut state = self.state.borrow_mut();
            let user = state
                .user
                .as_mut()
                .ok_or_else(|| AppError::StateViolation("No user signed in".into()))?;
            user.spins_remaining = spins_remaining;
        }
        self.persist()
    }

    fn persist(&self) -> AppResult<()> {
        let raw = serde_json::to_string(&*self.state.borrow())?;
        self.store.set(SESSION_KEY, &raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::session::MemoryStore;

    fn user() -> User {
        User {
            id: "u-1".into(),
            spins_remaining: 3,
            role: Role::User,
        }
    }

    #[test]
    fn test_init_defaults_then_loads_persisted_user() {
        let store: Rc<dyn KeyValueStore> = Rc::new(MemoryStore::new());
        let session = SessionContext::init(store.clone()).unwrap();
        assert_eq!(session.user(), None);

        session.sign_in(user()).unwrap();
        session.set_spins_remaining(1).unwrap();

        let reloaded = SessionContext::init(store).unwrap();
        assert_eq!(reloaded.user().unwrap().spins_remaining, 1);
        assert!(!reloaded.is_admin());
    }

    #[test]
    fn test_teardown_clears_store() {
        let store: Rc<dyn KeyValueStore> = Rc::new(MemoryStore::new());
        let session = SessionContext::init(store.clone()).unwrap();
        session.sign_in(user()).unwrap();
        session.teardown().unwrap();
        assert_eq!(session.user_id(), None);
        assert_eq!(store.get(SESSION_KEY).unwrap(), None);
        assert!(session.set_spins_remaining(2).is_err());
    }

    #[test]
    fn test_unreadable_session_falls_back_to_default() {
        let store: Rc<dyn KeyValueStore> = Rc::new(MemoryStore::new());
        store.set(SESSION_KEY, "{broken").unwrap();
        let session = SessionContext::init(store).unwrap();
        assert_eq!(session.user(), None);
    }
}
