//! Synthesis Result Cache
//!
//! LRU cache of finished WAV buffers keyed by (text, language, speaker).
//! Repeated requests skip the model entirely.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use parking_lot::Mutex;

use zonos_tts_core::{AudioBuffer, ConditionRequest, LanguageTag, Result, SpeakerId};

/// Lookup and eviction counters, updated without taking the entry lock
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl CacheStats {
    fn lookup(&self, found: bool) {
        let counter = if found { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn evicted(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    /// Share of lookups served from the cache; 0.0 before the first lookup
    pub fn hit_rate(&self) -> f64 {
        let (hits, misses) = (self.hits(), self.misses());
        match hits + misses {
            0 => 0.0,
            total => hits as f64 / total as f64,
        }
    }

    fn snapshot(&self, entries: usize, capacity: usize) -> CacheSnapshot {
        CacheSnapshot {
            entries,
            capacity,
            hits: self.hits(),
            misses: self.misses(),
            evictions: self.evictions(),
            hit_rate: self.hit_rate(),
        }
    }
}

/// Point-in-time view of a cache for reporting
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheSnapshot {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub hit_rate: f64,
}

/// Identity of a synthesis result.
///
/// Two requests with equal keys produce interchangeable audio.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub text: String,
    pub language: LanguageTag,
    pub speaker: Option<SpeakerId>,
}

impl CacheKey {
    pub fn new(text: impl Into<String>, language: LanguageTag, speaker: Option<SpeakerId>) -> Self {
        Self {
            text: text.into(),
            language,
            speaker,
        }
    }

    pub fn for_request(request: &ConditionRequest) -> Self {
        Self::new(
            request.text.clone(),
            request.language.clone(),
            request.speaker_id().cloned(),
        )
    }
}

/// LRU Result Cache
///
/// Thread-safe. The lock is held only for lookups and inserts; computation
/// happens outside it, so concurrent misses on one key may both compute.
pub struct ResultCache {
    capacity: usize,
    entries: Mutex<LruCache<CacheKey, AudioBuffer>>,
    /// Cache statistics
    pub stats: CacheStats,
}

impl ResultCache {
    /// Create a new cache with given capacity (at least one entry)
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            capacity: capacity.get(),
            entries: Mutex::new(LruCache::new(capacity)),
            stats: CacheStats::default(),
        }
    }

    /// Look up a result, marking it most recently used
    pub fn get(&self, key: &CacheKey) -> Option<AudioBuffer> {
        let found = self.entries.lock().get(key).cloned();
        self.stats.lookup(found.is_some());
        found
    }

    /// Store a result, evicting the least recently used entry when full
    pub fn insert(&self, key: CacheKey, buffer: AudioBuffer) {
        let displaced = self.entries.lock().push(key.clone(), buffer);
        if let Some((old_key, _)) = displaced {
            if old_key != key {
                tracing::debug!(text_len = old_key.text.len(), "Evicted cached result");
                self.stats.evicted();
            }
        }
    }

    /// Return the cached result for `key`, computing and storing it on a miss.
    ///
    /// Failed computations are returned to the caller and not stored.
    pub fn get_or_compute<F>(&self, key: CacheKey, compute: F) -> Result<AudioBuffer>
    where
        F: FnOnce() -> Result<AudioBuffer>,
    {
        if let Some(buffer) = self.get(&key) {
            tracing::debug!(language = %key.language, "Cache hit");
            return Ok(buffer);
        }

        let buffer = compute()?;
        self.insert(key, buffer.clone());
        Ok(buffer)
    }

    /// Clear the cache
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Get current cache size
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Check if cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Get cache capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn snapshot(&self) -> CacheSnapshot {
        self.stats.snapshot(self.len(), self.capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc;
    use std::time::{Duration, Instant};
    use zonos_tts_core::Error;

    fn key(text: &str) -> CacheKey {
        CacheKey::new(text, LanguageTag::english(), None)
    }

    fn buffer(tag: u8) -> AudioBuffer {
        AudioBuffer::new(vec![tag; 4], 44100, 1, 0)
    }

    #[test]
    fn test_get_or_compute_is_idempotent() {
        let cache = ResultCache::new(4);
        let calls = AtomicUsize::new(0);
        let compute = || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(buffer(1))
        };

        let first = cache.get_or_compute(key("hello"), compute).unwrap();
        let second = cache
            .get_or_compute(key("hello"), || {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(buffer(2))
            })
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats.hits(), 1);
        assert_eq!(cache.stats.misses(), 1);
        assert!((cache.stats.hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_lru_eviction() {
        let cache = ResultCache::new(2);
        cache.insert(key("a"), buffer(1));
        cache.insert(key("b"), buffer(2));

        // touch "a" so "b" is least recently used
        assert!(cache.get(&key("a")).is_some());
        cache.insert(key("c"), buffer(3));

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&key("a")).is_some());
        assert!(cache.get(&key("b")).is_none());
        assert!(cache.get(&key("c")).is_some());
        assert_eq!(cache.stats.evictions(), 1);
    }

    #[test]
    fn test_capacity_plus_one_recomputes_oldest() {
        let cache = ResultCache::new(3);
        let calls = AtomicUsize::new(0);
        let run = |text: &str| {
            cache
                .get_or_compute(key(text), || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(buffer(0))
                })
                .unwrap()
        };

        for text in ["1", "2", "3", "4"] {
            run(text);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 4);

        run("1");
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_errors_are_not_cached() {
        let cache = ResultCache::new(2);
        let result = cache.get_or_compute(key("x"), || Err(Error::Validation("nope".into())));
        assert!(result.is_err());
        assert!(cache.is_empty());

        let ok = cache.get_or_compute(key("x"), || Ok(buffer(7))).unwrap();
        assert_eq!(ok, buffer(7));
    }

    #[test]
    fn test_key_includes_language_and_speaker() {
        let cache = ResultCache::new(8);
        cache.insert(key("hi"), buffer(1));

        let german = CacheKey::new("hi", LanguageTag::parse("de").unwrap(), None);
        assert!(cache.get(&german).is_none());

        let voiced = CacheKey::new("hi", LanguageTag::english(), Some(SpeakerId::from_bytes(b"voice")));
        assert!(cache.get(&voiced).is_none());
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let cache = ResultCache::new(0);
        assert_eq!(cache.capacity(), 1);
        cache.insert(key("a"), buffer(1));
        cache.insert(key("b"), buffer(2));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.snapshot().evictions, 1);
    }

    #[test]
    fn test_shared_across_threads() {
        let cache = ResultCache::new(8);
        let calls = AtomicUsize::new(0);
        let texts = ["a", "b", "c", "d", "e", "f"];

        std::thread::scope(|scope| {
            for worker in 0..8 {
                let (cache, calls) = (&cache, &calls);
                scope.spawn(move || {
                    for round in 0..50 {
                        let idx = (worker + round) % texts.len();
                        let got = cache
                            .get_or_compute(key(texts[idx]), || {
                                calls.fetch_add(1, Ordering::SeqCst);
                                Ok(buffer(idx as u8))
                            })
                            .unwrap();
                        // every buffer for a key is the one computed for it
                        assert_eq!(got, buffer(idx as u8));
                    }
                });
            }
        });

        assert_eq!(cache.len(), texts.len());
        assert!(cache.len() <= cache.capacity());
        let snapshot = cache.snapshot();
        assert_eq!(snapshot.hits + snapshot.misses, 8 * 50);
        assert_eq!(snapshot.evictions, 0);
        // duplicate in-flight computes are allowed, but each key settles
        assert!(calls.load(Ordering::SeqCst) >= texts.len());
        assert_eq!(calls.load(Ordering::SeqCst) as u64, snapshot.misses);
    }

    #[test]
    fn test_compute_runs_outside_the_lock() {
        let cache = ResultCache::new(4);
        cache.insert(key("ready"), buffer(1));

        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        std::thread::scope(|scope| {
            let cache = &cache;
            scope.spawn(move || {
                cache
                    .get_or_compute(key("slow"), || {
                        started_tx.send(()).unwrap();
                        release_rx.recv_timeout(Duration::from_secs(5)).unwrap();
                        Ok(buffer(2))
                    })
                    .unwrap();
            });

            started_rx.recv_timeout(Duration::from_secs(5)).unwrap();
            // the slow computation is still running
            let begun = Instant::now();
            assert_eq!(cache.get(&key("ready")), Some(buffer(1)));
            assert!(cache.get(&key("slow")).is_none());
            assert!(begun.elapsed() < Duration::from_secs(1));
            release_tx.send(()).unwrap();
        });

        assert_eq!(cache.get(&key("slow")), Some(buffer(2)));
    }
}
