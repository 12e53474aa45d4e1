use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use super::gateway::{AddressSuggester, GatewayError};

#[derive(Debug, Clone)]
struct CachedPlaces {
    stored_at: DateTime<Utc>,
    places: Vec<String>,
}

/// Time-bounded memo of autocomplete answers keyed by normalized query.
#[derive(Debug)]
pub struct SuggestionCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CachedPlaces>>,
}

impl SuggestionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn key(query: &str) -> String {
        query.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
    }

    pub fn get(&self, query: &str, now: DateTime<Utc>) -> Option<Vec<String>> {
        let mut entries = self.entries.lock().ok()?;
        let key = Self::key(query);
        let cached = entries
            .get(&key)
            .map(|cached| (now - cached.stored_at < self.ttl, cached.places.clone()));
        match cached {
            Some((true, places)) => Some(places),
            Some((false, _)) => {
                entries.remove(&key);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, query: &str, places: Vec<String>, now: DateTime<Utc>) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.retain(|_, cached| now - cached.stored_at < self.ttl);
            entries.insert(
                Self::key(query),
                CachedPlaces {
                    stored_at: now,
                    places,
                },
            );
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Puts a [`SuggestionCache`] in front of another suggester. Failures are not cached.
pub struct CachedSuggester {
    inner: Arc<dyn AddressSuggester>,
    cache: SuggestionCache,
}

impl CachedSuggester {
    pub fn new(inner: Arc<dyn AddressSuggester>, ttl: Duration) -> Self {
        Self {
            inner,
            cache: SuggestionCache::new(ttl),
        }
    }
}

#[async_trait]
impl AddressSuggester for CachedSuggester {
    async fn suggest(&self, query: &str) -> Result<Vec<String>, GatewayError> {
        if let Some(places) = self.cache.get(query, Utc::now()) {
            debug!(query, "address suggestions served from cache");
            return Ok(places);
        }

        let places = self.inner.suggest(query).await?;
        self.cache.put(query, places.clone(), Utc::now());
        Ok(places)
    }
}
