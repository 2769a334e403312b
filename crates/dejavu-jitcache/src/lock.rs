//! Shared latch that freezes compilation.

use std::{
    borrow::Cow, sync::atomic::{AtomicBool, Ordering}
};

/// Named on/off latch observed by static-mode caches.
///
/// Share one lock between every cache that should stop compiling at the same
/// moment, e.g. all kernel variants of a model once warmup is done:
///
/// ```
/// use std::sync::Arc;
/// use dejavu_jitcache::CacheLock;
///
/// let lock = Arc::new(CacheLock::new("serving"));
/// assert!(!lock.is_locked());
/// lock.lock();
/// assert!(lock.is_locked());
/// ```
#[derive(Debug)]
pub struct CacheLock {
    id: Cow<'static, str>,
    locked: AtomicBool,
}

impl CacheLock {
    pub fn new(id: impl Into<Cow<'static, str>>) -> Self {
        Self {
            id: id.into(),
            locked: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    pub fn lock(&self) {
        self.locked.store(true, Ordering::Release);
        tracing::debug!("JitCache lock '{}' is LOCKED.", self.id);
    }

    pub fn unlock(&self) {
        self.locked.store(false, Ordering::Release);
        tracing::debug!("JitCache lock '{}' is UNLOCKED.", self.id);
    }
}

impl Default for CacheLock {
    fn default() -> Self {
        Self::new("unknown")
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::CacheLock;

    #[test]
    fn lock_and_unlock_toggle_state() {
        let lock = CacheLock::new("warmup");
        assert_eq!(lock.id(), "warmup");
        assert!(!lock.is_locked());
        lock.lock();
        assert!(lock.is_locked());
        lock.lock();
        assert!(lock.is_locked());
        lock.unlock();
        assert!(!lock.is_locked());
    }

    #[test]
    fn default_id_is_unknown() {
        assert_eq!(CacheLock::default().id(), "unknown");
    }

    #[test]
    fn lock_is_visible_across_threads() {
        let lock = Arc::new(CacheLock::new(format!("shared-{}", 1)));
        let remote = Arc::clone(&lock);
        thread::spawn(move || remote.lock()).join().expect("locking thread panicked");
        assert!(lock.is_locked());
    }
}
