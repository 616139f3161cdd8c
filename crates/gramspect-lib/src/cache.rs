//! Content-addressed result cache.
//!
//! Keys are SHA-256 over the request inputs, truncated to 128 bits and
//! hex-encoded. Each result kind lives in its own namespace with LRU
//! eviction and a per-entry TTL. Writers serialize on a mutex; values
//! are immutable snapshots (`Arc`ed compiled grammars, owned reports).

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use gramspect_core::CacheConfig;
use gramspect_core::reports::ParseReport;
use indexmap::IndexMap;
use sha2::{Digest, Sha256};

use crate::engine::CompiledGrammar;

/// SHA-256 over `parts` (NUL-separated), truncated to 128 bits, hex.
pub fn content_key(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            hasher.update([0u8]);
        }
        hasher.update(part.as_bytes());
    }
    let digest = hasher.finalize();
    digest[..16].iter().map(|b| format!("{b:02x}")).collect()
}

/// One LRU namespace.
struct Shelf<T> {
    entries: IndexMap<String, (T, Instant)>,
}

impl<T: Clone> Shelf<T> {
    fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    fn get(&mut self, key: &str, ttl: Duration) -> Option<T> {
        let (_, inserted) = self.entries.get(key)?;
        if inserted.elapsed() > ttl {
            self.entries.shift_remove(key);
            return None;
        }
        // Refresh LRU position: most recently used last.
        let entry = self.entries.shift_remove_entry(key)?;
        let value = entry.1.0.clone();
        self.entries.insert(entry.0, entry.1);
        Some(value)
    }

    fn put(&mut self, key: String, value: T, capacity: usize) {
        self.entries.insert(key, (value, Instant::now()));
        while self.entries.len() > capacity.max(1) {
            self.entries.shift_remove_index(0);
        }
    }
}

/// The engine's only shared mutable state.
pub struct Cache {
    config: CacheConfig,
    compiled: Mutex<Shelf<Arc<CompiledGrammar>>>,
    parses: Mutex<Shelf<ParseReport>>,
    analyses: Mutex<Shelf<serde_json::Value>>,
}

impl Cache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            compiled: Mutex::new(Shelf::new()),
            parses: Mutex::new(Shelf::new()),
            analyses: Mutex::new(Shelf::new()),
        }
    }

    fn ttl(&self) -> Duration {
        Duration::from_secs(self.config.ttl_seconds)
    }

    pub fn get_compiled(&self, key: &str) -> Option<Arc<CompiledGrammar>> {
        if !self.config.enabled {
            return None;
        }
        self.compiled.lock().ok()?.get(key, self.ttl())
    }

    pub fn put_compiled(&self, key: String, value: Arc<CompiledGrammar>) {
        if !self.config.enabled {
            return;
        }
        if let Ok(mut shelf) = self.compiled.lock() {
            shelf.put(key, value, self.config.max_size);
        }
    }

    pub fn get_parse(&self, key: &str) -> Option<ParseReport> {
        if !self.config.enabled {
            return None;
        }
        self.parses.lock().ok()?.get(key, self.ttl())
    }

    pub fn put_parse(&self, key: String, value: ParseReport) {
        if !self.config.enabled {
            return;
        }
        if let Ok(mut shelf) = self.parses.lock() {
            shelf.put(key, value, self.config.max_size);
        }
    }

    pub fn get_analysis<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        if !self.config.enabled {
            return None;
        }
        let value = self.analyses.lock().ok()?.get(key, self.ttl())?;
        serde_json::from_value(value).ok()
    }

    pub fn put_analysis<T: serde::Serialize>(&self, key: String, value: &T) {
        if !self.config.enabled {
            return;
        }
        let Ok(value) = serde_json::to_value(value) else {
            return;
        };
        if let Ok(mut shelf) = self.analyses.lock() {
            shelf.put(key, value, self.config.max_size);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_stable_and_128_bit() {
        let a = content_key(&["grammar X;", "expr"]);
        let b = content_key(&["grammar X;", "expr"]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 32); // 16 bytes hex-encoded
    }

    #[test]
    fn key_separates_parts() {
        // ("ab", "c") must not collide with ("a", "bc").
        assert_ne!(content_key(&["ab", "c"]), content_key(&["a", "bc"]));
    }

    #[test]
    fn lru_evicts_oldest() {
        let mut shelf: Shelf<u32> = Shelf::new();
        let ttl = Duration::from_secs(60);
        shelf.put("a".into(), 1, 2);
        shelf.put("b".into(), 2, 2);
        // Touch "a" so "b" becomes the eviction candidate.
        assert_eq!(shelf.get("a", ttl), Some(1));
        shelf.put("c".into(), 3, 2);
        assert_eq!(shelf.get("b", ttl), None);
        assert_eq!(shelf.get("a", ttl), Some(1));
        assert_eq!(shelf.get("c", ttl), Some(3));
    }

    #[test]
    fn ttl_expires_entries() {
        let mut shelf: Shelf<u32> = Shelf::new();
        shelf.put("k".into(), 7, 8);
        std::thread::sleep(Duration::from_millis(2));
        assert_eq!(shelf.get("k", Duration::ZERO), None);
    }

    #[test]
    fn disabled_cache_stores_nothing() {
        let cache = Cache::new(CacheConfig {
            enabled: false,
            ..CacheConfig::default()
        });
        cache.put_analysis("k".into(), &42u32);
        assert_eq!(cache.get_analysis::<u32>("k"), None);
    }
}
