//! Crypto tokens.
//!
//! Every crypto task in flight holds a [`CryptoToken`]. When the entity
//! stops it returns one extra token; the completion event therefore fires
//! exactly when the last outstanding task has returned its token, which is
//! what lets `stop()` expose a reliable "all crypto finished" awaitable.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A manually reset event: set once, observed many times.
#[derive(Default)]
pub struct EventFlag {
    state: Mutex<bool>,
    cond: Condvar,
}

impl EventFlag {
    pub fn set(&self) {
        let mut state = self.state.lock();
        if !*state {
            *state = true;
            self.cond.notify_all();
        }
    }

    pub fn reset(&self) {
        *self.state.lock() = false;
    }

    pub fn is_set(&self) -> bool {
        *self.state.lock()
    }

    pub fn wait(&self) {
        let mut state = self.state.lock();
        while !*state {
            self.cond.wait(&mut state);
        }
    }

    /// Waits until the flag is set or the timeout elapses. Returns whether
    /// the flag is set.
    pub fn wait_for(&self, timeout: Duration) -> bool {
        let mut state = self.state.lock();
        if !*state {
            let _ = self.cond.wait_for(&mut state, timeout);
        }
        *state
    }
}

#[derive(Default)]
struct TokenInner {
    tokens: AtomicU32,
    flag: EventFlag,
}

impl TokenInner {
    fn return_token(&self) {
        let prev = self.tokens.fetch_sub(1, Ordering::Relaxed);
        // The counter only reaches zero-before-decrement once stop() has
        // returned the base token and every task token came back.
        debug_assert!(prev != u32::MAX, "crypto token returned twice");
        if prev == 0 {
            self.flag.set();
        }
    }
}

/// Shared token counter for one entity half.
#[derive(Clone, Default)]
pub struct CryptoTokenManager {
    inner: Arc<TokenInner>,
}

impl CryptoTokenManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> CryptoToken {
        self.inner.tokens.fetch_add(1, Ordering::Relaxed);
        CryptoToken {
            inner: self.inner.clone(),
        }
    }

    /// Returns the base token. Once every outstanding [`CryptoToken`] is
    /// dropped the awaitable becomes set.
    pub fn stop(&self) {
        self.inner.return_token();
    }

    pub fn awaitable(&self) -> &EventFlag {
        &self.inner.flag
    }
}

/// RAII guard held by an in-flight crypto task.
pub struct CryptoToken {
    inner: Arc<TokenInner>,
}

impl Drop for CryptoToken {
    fn drop(&mut self) {
        self.inner.return_token();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_with_no_outstanding_tokens_sets_flag() {
        let mngr = CryptoTokenManager::new();
        assert!(!mngr.awaitable().is_set());
        mngr.stop();
        assert!(mngr.awaitable().is_set());
    }

    #[test]
    fn flag_waits_for_last_token() {
        let mngr = CryptoTokenManager::new();
        let t1 = mngr.token();
        let t2 = mngr.token();
        mngr.stop();
        assert!(!mngr.awaitable().is_set());
        drop(t1);
        assert!(!mngr.awaitable().is_set());
        drop(t2);
        assert!(mngr.awaitable().is_set());
    }

    #[test]
    fn tokens_dropped_before_stop() {
        let mngr = CryptoTokenManager::new();
        drop(mngr.token());
        drop(mngr.token());
        assert!(!mngr.awaitable().is_set());
        mngr.stop();
        assert!(mngr.awaitable().is_set());
    }
}
