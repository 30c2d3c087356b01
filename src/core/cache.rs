use crate::core::clock::Clock;
use crate::core::currency::{CurrencyCode, RateTable};
use chrono::Duration;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Rate tables keyed by base currency, valid for a fixed TTL.
///
/// Expired entries are left in place and replaced by the next `put` for the
/// same base. Nothing sweeps them in the background.
#[derive(Clone)]
pub struct RateCache {
    inner: Arc<Mutex<HashMap<CurrencyCode, Arc<RateTable>>>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl RateCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            ttl,
            clock,
        }
    }

    /// Returns the entry for `base` if it is still fresh.
    pub async fn get(&self, base: &CurrencyCode) -> Option<Arc<RateTable>> {
        let cache = self.inner.lock().await;
        let Some(entry) = cache.get(base) else {
            debug!(base = %base, "Cache MISS");
            return None;
        };
        let age = self.clock.now().signed_duration_since(entry.fetched_at());
        if age < self.ttl {
            debug!(base = %base, "Cache HIT");
            Some(Arc::clone(entry))
        } else {
            debug!(base = %base, age_secs = age.num_seconds(), "Cache entry expired");
            None
        }
    }

    pub async fn put(&self, table: Arc<RateTable>) {
        let mut cache = self.inner.lock().await;
        debug!(base = %table.base(), "Cache PUT");
        cache.insert(table.base().clone(), table);
    }

    /// Whether any entry, fresh or expired, is stored for `base`.
    pub async fn contains(&self, base: &CurrencyCode) -> bool {
        self.inner.lock().await.contains_key(base)
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;
    use chrono::Utc;

    fn table(base: &str, clock: &ManualClock) -> Arc<RateTable> {
        Arc::new(RateTable::new(
            base.parse().unwrap(),
            vec![("EUR".to_string(), 0.85)],
            clock.now(),
        ))
    }

    #[tokio::test]
    async fn test_cache_get_put() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = RateCache::new(Duration::seconds(60), clock.clone());
        let usd: CurrencyCode = "USD".parse().unwrap();

        assert!(cache.get(&usd).await.is_none());
        assert!(cache.is_empty().await);

        cache.put(table("USD", &clock)).await;

        let cached = cache.get(&usd).await.unwrap();
        assert_eq!(cached.rate(&"EUR".parse().unwrap()), Some(0.85));
        assert!(cache.get(&"GBP".parse().unwrap()).await.is_none());
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_cache_ttl_expiration() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = RateCache::new(Duration::seconds(60), clock.clone());
        let usd: CurrencyCode = "USD".parse().unwrap();

        cache.put(table("USD", &clock)).await;

        clock.advance(Duration::seconds(59));
        assert!(cache.get(&usd).await.is_some());

        clock.advance(Duration::seconds(1));
        assert!(cache.get(&usd).await.is_none());

        // Expired entries linger until replaced
        assert!(cache.contains(&usd).await);

        cache.put(table("USD", &clock)).await;
        assert!(cache.get(&usd).await.is_some());
        assert_eq!(cache.len().await, 1);
    }
}
