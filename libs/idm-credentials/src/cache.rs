//! Per-provider token slot.
//!
//! Readers load the current token without locking. A refresh is serialized
//! behind an async mutex so that callers racing past the threshold share a
//! single exchange: the first one in performs it, the others re-check the
//! slot after acquiring the lock and find the new token already stored.

use std::future::Future;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::AuthExchangeError;
use crate::token::CachedToken;

#[derive(Debug, Default)]
pub struct TokenCache {
    current: ArcSwapOption<CachedToken>,
    refresh: Mutex<()>,
}

impl TokenCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored token, fresh or not.
    #[must_use]
    pub fn current(&self) -> Option<Arc<CachedToken>> {
        self.current.load_full()
    }

    /// The stored token if it may still be handed out at `now`.
    #[must_use]
    pub fn fresh_at(&self, now: Instant) -> Option<Arc<CachedToken>> {
        self.current
            .load_full()
            .filter(|token| token.is_fresh_at(now))
    }

    /// Return the cached token, or run `refresh` once and store its result.
    ///
    /// On error nothing is stored and the previous token (if any) stays in
    /// the slot, but it is not returned.
    ///
    /// # Errors
    ///
    /// Propagates the error of `refresh`.
    pub async fn get_or_refresh<F, Fut>(
        &self,
        refresh: F,
    ) -> Result<Arc<CachedToken>, AuthExchangeError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CachedToken, AuthExchangeError>>,
    {
        if let Some(token) = self.fresh_at(Instant::now()) {
            return Ok(token);
        }

        let _guard = self.refresh.lock().await;
        if let Some(token) = self.fresh_at(Instant::now()) {
            return Ok(token);
        }

        let token = Arc::new(refresh().await?);
        self.current.store(Some(Arc::clone(&token)));
        Ok(token)
    }

    /// Drop the stored token. The next call exchanges again.
    pub fn invalidate(&self) {
        self.current.store(None);
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use secrecy::{ExposeSecret, SecretString};

    use super::*;
    use crate::token::RefreshPolicy;

    fn issue(value: &str, lifetime_secs: u64) -> CachedToken {
        CachedToken::new(
            SecretString::from(value.to_owned()),
            Duration::from_secs(lifetime_secs),
            RefreshPolicy::with_margin(Duration::from_secs(300)),
            Instant::now(),
        )
    }

    async fn counted(
        cache: &TokenCache,
        calls: &AtomicUsize,
    ) -> Result<Arc<CachedToken>, AuthExchangeError> {
        cache
            .get_or_refresh(move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(issue(&format!("tok-{n}"), 3600))
            })
            .await
    }

    #[tokio::test(start_paused = true)]
    async fn reuses_token_before_threshold() {
        let cache = TokenCache::new();
        let calls = AtomicUsize::new(0);

        let first = counted(&cache, &calls).await.unwrap();
        tokio::time::advance(Duration::from_secs(3299)).await;
        let second = counted(&cache, &calls).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.value().expose_secret(), first.value().expose_secret());
    }

    #[tokio::test(start_paused = true)]
    async fn refreshes_once_at_threshold() {
        let cache = TokenCache::new();
        let calls = AtomicUsize::new(0);

        counted(&cache, &calls).await.unwrap();
        tokio::time::advance(Duration::from_secs(3300)).await;
        let refreshed = counted(&cache, &calls).await.unwrap();
        let again = counted(&cache, &calls).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(refreshed.value().expose_secret(), "tok-2");
        assert_eq!(again.value().expose_secret(), "tok-2");
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_share_one_exchange() {
        let cache = TokenCache::new();
        let calls = AtomicUsize::new(0);

        let counter = &calls;
        let slow = move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(issue("shared", 3600))
        };

        let (a, b, c) = tokio::join!(
            cache.get_or_refresh(slow),
            cache.get_or_refresh(slow),
            cache.get_or_refresh(slow),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        for token in [a, b, c] {
            assert_eq!(token.unwrap().value().expose_secret(), "shared");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failed_refresh_is_not_cached() {
        let cache = TokenCache::new();

        let err = cache
            .get_or_refresh(|| async {
                Err(AuthExchangeError::Timeout {
                    provider: "service".to_owned(),
                })
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthExchangeError::Timeout { .. }));
        assert!(cache.current().is_none());

        let calls = AtomicUsize::new(0);
        counted(&cache, &calls).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_token_is_never_returned_after_failed_refresh() {
        let cache = TokenCache::new();
        let calls = AtomicUsize::new(0);
        counted(&cache, &calls).await.unwrap();
        tokio::time::advance(Duration::from_secs(3600)).await;

        let result = cache
            .get_or_refresh(|| async { Err(AuthExchangeError::Config("boom".to_owned())) })
            .await;

        assert!(result.is_err());
        assert!(cache.current().is_some());
        assert!(cache.fresh_at(Instant::now()).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn invalidate_forces_exchange() {
        let cache = TokenCache::new();
        let calls = AtomicUsize::new(0);

        counted(&cache, &calls).await.unwrap();
        cache.invalidate();
        counted(&cache, &calls).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
