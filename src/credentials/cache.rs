use crate::error::Result;
use crate::models::Credentials;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type Flight = Shared<BoxFuture<'static, Result<Arc<Credentials>>>>;

enum Slot {
    Ready(Arc<Credentials>),
    Pending { id: u64, flight: Flight },
}

/// Resolved credentials per profile for the lifetime of one resolver.
///
/// Entries never expire and are never replaced once populated. Concurrent
/// lookups of the same profile share a single in-flight resolution; a
/// failed resolution leaves no entry behind so the next lookup starts over.
#[derive(Default)]
pub struct ProfileCredentialsCache {
    slots: Mutex<HashMap<String, Slot>>,
    next_flight: AtomicU64,
}

impl ProfileCredentialsCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, profile: &str) -> Option<Arc<Credentials>> {
        match self.lock().get(profile) {
            Some(Slot::Ready(creds)) => Some(creds.clone()),
            _ => None,
        }
    }

    pub fn has(&self, profile: &str) -> bool {
        matches!(self.lock().get(profile), Some(Slot::Ready(_)))
    }

    /// Store credentials unless the profile already has some; returns the stored value
    #[cfg(test)]
    pub fn set(&self, profile: &str, creds: Arc<Credentials>) -> Arc<Credentials> {
        let mut slots = self.lock();
        if let Some(Slot::Ready(existing)) = slots.get(profile) {
            return existing.clone();
        }
        slots.insert(profile.to_string(), Slot::Ready(creds.clone()));
        creds
    }

    /// Return the cached credentials for `profile`, joining an in-flight
    /// resolution if there is one, or starting `resolve` otherwise.
    pub async fn get_or_resolve<F, Fut>(&self, profile: &str, resolve: F) -> Result<Arc<Credentials>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Credentials>> + Send + 'static,
    {
        if let Some(creds) = self.get(profile) {
            if creds.is_expired() {
                tracing::warn!(
                    "Cached credentials for profile '{}' have expired; reusing them for this run",
                    profile
                );
            }
            tracing::debug!("Credential cache hit for profile '{}'", profile);
            return Ok(creds);
        }

        let (id, flight) = {
            let mut slots = self.lock();
            match slots.get(profile) {
                // Settled between the lookup above and this lock
                Some(Slot::Ready(creds)) => return Ok(creds.clone()),
                Some(Slot::Pending { id, flight }) => {
                    tracing::debug!("Joining in-flight resolution for profile '{}'", profile);
                    (*id, flight.clone())
                }
                None => {
                    let id = self.next_flight.fetch_add(1, Ordering::Relaxed);
                    let flight = resolve().map(|r| r.map(Arc::new)).boxed().shared();
                    slots.insert(
                        profile.to_string(),
                        Slot::Pending {
                            id,
                            flight: flight.clone(),
                        },
                    );
                    (id, flight)
                }
            }
        };

        let outcome = flight.await;
        self.settle(profile, id, &outcome);
        outcome
    }

    /// Replace the pending slot of flight `id` with its outcome. A slot that
    /// already moved on (settled by another waiter, or a newer flight) is left alone.
    fn settle(&self, profile: &str, id: u64, outcome: &Result<Arc<Credentials>>) {
        let mut slots = self.lock();
        let owns_slot = matches!(
            slots.get(profile),
            Some(Slot::Pending { id: current, .. }) if *current == id
        );
        if !owns_slot {
            return;
        }

        match outcome {
            Ok(creds) => {
                slots.insert(profile.to_string(), Slot::Ready(creds.clone()));
            }
            Err(e) => {
                tracing::debug!("Resolution for profile '{}' failed, clearing: {}", profile, e);
                slots.remove(profile);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CredentialError;
    use chrono::{Duration, Utc};
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    fn creds(key: &str) -> Credentials {
        Credentials {
            access_key_id: key.to_string(),
            secret_access_key: "secret".to_string(),
            session_token: Some("token".to_string()),
            expiration: Some(Utc::now() + Duration::hours(1)),
        }
    }

    #[tokio::test]
    async fn test_second_lookup_returns_same_value() {
        let cache = ProfileCredentialsCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let resolve = |calls: Arc<AtomicUsize>| {
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(creds("AKIA1"))
            }
        };

        let first = cache.get_or_resolve("dev", resolve(calls.clone())).await.unwrap();
        let second = cache.get_or_resolve("dev", resolve(calls.clone())).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.has("dev"));
        assert!(Arc::ptr_eq(&cache.get("dev").unwrap(), &first));
    }

    #[tokio::test]
    async fn test_concurrent_lookups_share_one_resolution() {
        let cache = ProfileCredentialsCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Notify::new());

        let resolve = || {
            let calls = calls.clone();
            let gate = gate.clone();
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                gate.notified().await;
                Ok(creds("AKIA1"))
            }
        };

        let (a, b, _) = tokio::join!(
            cache.get_or_resolve("dev", resolve()),
            cache.get_or_resolve("dev", resolve()),
            async {
                tokio::task::yield_now().await;
                gate.notify_one();
            }
        );

        let (a, b) = (a.unwrap(), b.unwrap());
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_waiters_share_failure() {
        let cache = ProfileCredentialsCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Notify::new());

        let resolve = || {
            let calls = calls.clone();
            let gate = gate.clone();
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                gate.notified().await;
                Err(CredentialError::resolution("dev", "boom"))
            }
        };

        let (a, b, _) = tokio::join!(
            cache.get_or_resolve("dev", resolve()),
            cache.get_or_resolve("dev", resolve()),
            async {
                tokio::task::yield_now().await;
                gate.notify_one();
            }
        );

        assert!(matches!(a, Err(CredentialError::Resolution { .. })));
        assert!(matches!(b, Err(CredentialError::Resolution { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!cache.has("dev"));
    }

    #[tokio::test]
    async fn test_failure_allows_retry() {
        let cache = ProfileCredentialsCache::new();

        let failed = cache
            .get_or_resolve("dev", || async { Err(CredentialError::resolution("dev", "boom")) })
            .await;
        assert!(failed.is_err());
        assert!(!cache.has("dev"));
        assert!(cache.get("dev").is_none());

        let retried = cache
            .get_or_resolve("dev", || async { Ok(creds("AKIA2")) })
            .await
            .unwrap();
        assert_eq!(retried.access_key_id, "AKIA2");
    }

    #[tokio::test]
    async fn test_late_settle_of_failed_flight_keeps_newer_flight() {
        let cache = ProfileCredentialsCache::new();

        // Flight A fails; its first waiter settles and clears the slot
        let stale_id = cache.next_flight.fetch_add(1, Ordering::Relaxed);
        let stale: Flight = async { Err::<Arc<Credentials>, _>(CredentialError::resolution("dev", "boom")) }
            .boxed()
            .shared();
        cache.lock().insert(
            "dev".to_string(),
            Slot::Pending {
                id: stale_id,
                flight: stale.clone(),
            },
        );
        let stale_outcome = stale.await;
        cache.settle("dev", stale_id, &stale_outcome);
        assert!(cache.lock().get("dev").is_none());

        // Flight B starts and waits on the gate while A's other waiter settles late
        let gate = Arc::new(Notify::new());
        let (fresh, _) = tokio::join!(
            cache.get_or_resolve("dev", || {
                let gate = gate.clone();
                async move {
                    gate.notified().await;
                    Ok(creds("FRESH"))
                }
            }),
            async {
                tokio::task::yield_now().await;
                cache.settle("dev", stale_id, &stale_outcome);
                assert!(matches!(
                    cache.lock().get("dev"),
                    Some(Slot::Pending { id, .. }) if *id != stale_id
                ));
                gate.notify_one();
            }
        );

        let fresh = fresh.unwrap();
        assert_eq!(fresh.access_key_id, "FRESH");
        assert!(Arc::ptr_eq(&cache.get("dev").unwrap(), &fresh));
    }

    #[tokio::test]
    async fn test_profiles_are_independent() {
        let cache = ProfileCredentialsCache::new();
        let dev = cache.get_or_resolve("dev", || async { Ok(creds("DEV")) }).await.unwrap();
        let prod = cache.get_or_resolve("prod", || async { Ok(creds("PROD")) }).await.unwrap();
        assert_eq!(dev.access_key_id, "DEV");
        assert_eq!(prod.access_key_id, "PROD");
    }

    #[test]
    fn test_set_never_replaces() {
        let cache = ProfileCredentialsCache::new();
        assert!(!cache.has("dev"));

        let first = cache.set("dev", Arc::new(creds("FIRST")));
        let second = cache.set("dev", Arc::new(creds("SECOND")));

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.get("dev").unwrap().access_key_id, "FIRST");
    }

    #[tokio::test]
    async fn test_expired_entry_is_still_returned() {
        let cache = ProfileCredentialsCache::new();
        let stale = cache.set(
            "dev",
            Arc::new(Credentials {
                expiration: Some(Utc::now() - Duration::minutes(1)),
                ..creds("STALE")
            }),
        );

        let hit = cache
            .get_or_resolve("dev", || async { Ok(creds("FRESH")) })
            .await
            .unwrap();
        assert!(Arc::ptr_eq(&stale, &hit));
    }
}
