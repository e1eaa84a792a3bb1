mod memory;
mod disk;
mod key;

pub use memory::MemoryCache;
pub use disk::DiskCache;
pub use key::CacheKey;

use tracing::warn;

use crate::config::CacheConfig;
use crate::error::Result;

/// Combined cache with memory and disk layers.
///
/// Values are whole translation batches, stored as JSON-encoded string
/// vectors; corrupt entries are treated as misses.
pub struct TranslationCache {
    memory: Option<MemoryCache>,
    disk: Option<DiskCache>,
}

impl TranslationCache {
    /// Create a new translation cache from configuration
    pub fn new(config: &CacheConfig) -> Result<Self> {
        let memory = if config.memory_enabled {
            Some(MemoryCache::new(
                config.memory_max_entries,
                config.memory_ttl_seconds,
            ))
        } else {
            None
        };

        let disk = if config.disk_enabled {
            let path = config
                .disk_path
                .clone()
                .unwrap_or_else(crate::util::translation_cache_path);
            Some(DiskCache::new(path)?)
        } else {
            None
        };

        Ok(Self { memory, disk })
    }

    /// A cache with both layers disabled.
    pub const fn disabled() -> Self {
        Self {
            memory: None,
            disk: None,
        }
    }

    /// Get a cached batch of translations.
    pub async fn get_batch(&self, key: &CacheKey) -> Option<Vec<String>> {
        let bytes = self.get(key).await?;
        match serde_json::from_slice(&bytes) {
            Ok(batch) => Some(batch),
            Err(e) => {
                warn!("Dropping corrupt cache entry {}: {}", key, e);
                None
            }
        }
    }

    /// Store a batch of translations.
    pub async fn insert_batch(&self, key: &CacheKey, batch: &[String]) {
        match serde_json::to_vec(batch) {
            Ok(bytes) => self.insert(key, bytes).await,
            Err(e) => warn!("Failed to encode cache entry {}: {}", key, e),
        }
    }

    async fn get(&self, key: &CacheKey) -> Option<Vec<u8>> {
        let key_str = key.to_string();

        // Try memory cache first
        if let Some(ref memory) = self.memory
            && let Some(value) = memory.get(&key_str).await
        {
            return Some(value);
        }

        // Try disk cache
        if let Some(ref disk) = self.disk
            && let Some(value) = disk.get(&key_str)
        {
            // Populate memory cache on disk hit
            if let Some(ref memory) = self.memory {
                memory.insert(key_str, value.clone()).await;
            }
            return Some(value);
        }

        None
    }

    async fn insert(&self, key: &CacheKey, value: Vec<u8>) {
        let key_str = key.to_string();

        // Store in memory cache
        if let Some(ref memory) = self.memory {
            memory.insert(key_str.clone(), value.clone()).await;
        }

        // Store in disk cache
        if let Some(ref disk) = self.disk {
            let _ = disk.insert(&key_str, &value);
        }
    }

    /// Check if a key exists in cache
    pub async fn contains(&self, key: &CacheKey) -> bool {
        self.get(key).await.is_some()
    }

    /// Clear all caches
    pub fn clear(&self) {
        if let Some(ref memory) = self.memory {
            memory.clear();
        }

        if let Some(ref disk) = self.disk {
            let _ = disk.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Lang;

    fn memory_only() -> TranslationCache {
        TranslationCache {
            memory: Some(MemoryCache::new(16, 0)),
            disk: None,
        }
    }

    fn batch_key(texts: &[String]) -> CacheKey {
        CacheKey::from_batch(texts, "mock", &Lang::new("en"), &Lang::new("ar"))
    }

    #[tokio::test]
    async fn test_batch_round_trip() {
        let cache = memory_only();
        let texts = vec!["first block".to_string(), "second block".to_string()];
        let key = batch_key(&texts);

        assert!(cache.get_batch(&key).await.is_none());

        let translations = vec!["الأولى".to_string(), "الثانية".to_string()];
        cache.insert_batch(&key, &translations).await;

        assert_eq!(cache.get_batch(&key).await, Some(translations));
    }

    #[tokio::test]
    async fn test_disabled_cache_never_hits() {
        let cache = TranslationCache::disabled();
        let texts = vec!["text".to_string()];
        let key = batch_key(&texts);

        cache.insert_batch(&key, &["x".to_string()]).await;
        assert!(cache.get_batch(&key).await.is_none());
    }
}
