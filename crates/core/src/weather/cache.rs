//! Short-lived weather cache keyed by rounded coordinates
//!
//! Entries older than the TTL are never served: a stale entry is discarded
//! when its key is read, and every insert sweeps all expired entries so the
//! map only holds coordinates seen within the last TTL. Concurrent fetches
//! for the same key both write; the last writer wins.

use super::FireWeatherData;
use crate::core_types::CoordinateKey;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Default entry lifetime
pub const DEFAULT_WEATHER_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
struct CacheEntry {
    data: FireWeatherData,
    stored_at: Instant,
}

/// Coordinate-keyed TTL cache of fire-weather data
#[derive(Debug)]
pub struct WeatherCache {
    entries: RwLock<FxHashMap<CoordinateKey, CacheEntry>>,
    ttl: Duration,
}

impl WeatherCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(FxHashMap::default()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh entry for a key, evicting it if it has expired
    pub fn get(&self, key: CoordinateKey) -> Option<FireWeatherData> {
        {
            let entries = self.entries.read();
            match entries.get(&key) {
                Some(entry) if entry.stored_at.elapsed() < self.ttl => {
                    return Some(entry.data.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }

        let mut entries = self.entries.write();
        if entries
            .get(&key)
            .is_some_and(|entry| entry.stored_at.elapsed() >= self.ttl)
        {
            entries.remove(&key);
        }
        None
    }

    /// Store an entry, dropping every expired one first
    pub fn insert(&self, key: CoordinateKey, data: FireWeatherData) {
        let mut entries = self.entries.write();
        let ttl = self.ttl;
        entries.retain(|_, entry| entry.stored_at.elapsed() < ttl);
        entries.insert(
            key,
            CacheEntry {
                data,
                stored_at: Instant::now(),
            },
        );
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        let ttl = self.ttl;
        entries.retain(|_, entry| entry.stored_at.elapsed() < ttl);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl Default for WeatherCache {
    fn default() -> Self {
        Self::new(DEFAULT_WEATHER_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::Location;

    fn key() -> CoordinateKey {
        Location::new(-33.87, 151.21).unwrap().cache_key()
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_after_ttl() {
        let cache = WeatherCache::new(Duration::from_secs(300));
        cache.insert(key(), FireWeatherData::unavailable());
        assert!(cache.get(key()).is_some());

        tokio::time::advance(Duration::from_secs(299)).await;
        assert!(cache.get(key()).is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get(key()).is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_insert_sweeps_expired_coordinates() {
        let cache = WeatherCache::new(Duration::from_secs(300));
        for step in 0..200 {
            let location = Location::new(-40.0 + f64::from(step) * 0.1, 150.0).unwrap();
            cache.insert(location.cache_key(), FireWeatherData::unavailable());
        }
        assert_eq!(cache.len(), 200);

        tokio::time::advance(Duration::from_secs(3600)).await;
        cache.insert(key(), FireWeatherData::unavailable());
        assert_eq!(cache.len(), 1);
        assert!(cache.get(key()).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_keeps_fresh_entries() {
        let cache = WeatherCache::new(Duration::from_secs(300));
        let old = Location::new(10.0, 10.0).unwrap().cache_key();
        cache.insert(old, FireWeatherData::unavailable());

        tokio::time::advance(Duration::from_secs(200)).await;
        cache.insert(key(), FireWeatherData::unavailable());

        tokio::time::advance(Duration::from_secs(150)).await;
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(key()).is_some());
        assert!(cache.get(old).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_writer_wins() {
        let cache = WeatherCache::default();
        let mut first = FireWeatherData::unavailable();
        first.current.description = "first".into();
        let mut second = FireWeatherData::unavailable();
        second.current.description = "second".into();

        cache.insert(key(), first);
        cache.insert(key(), second);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(key()).unwrap().current.description, "second");
    }
}
