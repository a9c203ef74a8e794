use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Process-wide "background must not scroll" toggle. Locked while any guard is alive.
#[derive(Debug, Clone, Default)]
pub struct ScrollLock {
    holders: Arc<AtomicUsize>,
}

impl ScrollLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self) -> ScrollGuard {
        self.holders.fetch_add(1, Ordering::SeqCst);
        ScrollGuard {
            holders: Arc::clone(&self.holders),
        }
    }

    pub fn is_locked(&self) -> bool {
        self.holders.load(Ordering::SeqCst) > 0
    }
}

/// Releases its hold on the [`ScrollLock`] when dropped.
#[derive(Debug)]
pub struct ScrollGuard {
    holders: Arc<AtomicUsize>,
}

impl Drop for ScrollGuard {
    fn drop(&mut self) {
        self.holders.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_follows_guard_lifetime() {
        let lock = ScrollLock::new();
        assert!(!lock.is_locked());
        let guard = lock.acquire();
        let shared = lock.clone();
        assert!(shared.is_locked());
        drop(guard);
        assert!(!shared.is_locked());
    }

    #[test]
    fn nested_guards_hold_until_last_drop() {
        let lock = ScrollLock::new();
        let a = lock.acquire();
        let b = lock.acquire();
        drop(a);
        assert!(lock.is_locked());
        drop(b);
        assert!(!lock.is_locked());
    }
}
