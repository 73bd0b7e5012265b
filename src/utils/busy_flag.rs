use std::cell::Cell;

/// Session-local lock for one outstanding action. The guard clears the flag when
/// dropped, so success, error, panic and a dropped future all release it.
#[derive(Debug, Default)]
pub struct BusyFlag {
    busy: Cell<bool>,
}

impl BusyFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.get()
    }

    pub fn try_acquire(&self) -> Option<BusyGuard<'_>> {
        if self.busy.replace(true) {
            return None;
        }
        Some(BusyGuard { flag: &self.busy })
    }
}

pub struct BusyGuard<'a> {
    flag: &'a Cell<bool>,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_fails_until_guard_dropped() {
        let flag = BusyFlag::new();
        let guard = flag.try_acquire();
        assert!(guard.is_some());
        assert!(flag.is_busy());
        assert!(flag.try_acquire().is_none());
        drop(guard);
        assert!(!flag.is_busy());
        assert!(flag.try_acquire().is_some());
    }

    #[test]
    fn test_flag_released_on_panic() {
        let flag = BusyFlag::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = flag.try_acquire();
            panic!("boom");
        }));
        assert!(result.is_err());
        assert!(!flag.is_busy());
    }
}
