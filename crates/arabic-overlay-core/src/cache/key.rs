use crate::config::Lang;

/// Cache key for translated batches.
///
/// Keys are opaque MD5 hashes of all relevant inputs, ensuring:
/// - Same texts + translator + language pair = same key
/// - Any change to inputs produces a different key
/// - Keys are fixed-length (32 hex chars) for consistent storage
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    hash: String,
}

impl CacheKey {
    /// Key for one translation batch.
    ///
    /// Null bytes separate the inputs so ("a", "bc") and ("ab", "c") can
    /// never collide.
    pub fn from_batch(
        texts: &[String],
        translator: &str,
        source_lang: &Lang,
        target_lang: &Lang,
    ) -> Self {
        let mut combined = String::new();
        for text in texts {
            combined.push_str(text);
            combined.push('\0');
        }
        combined.push_str(&translator.to_lowercase());
        combined.push('\0');
        combined.push_str(source_lang.as_str());
        combined.push('\0');
        combined.push_str(target_lang.as_str());

        Self {
            hash: format!("{:x}", md5::compute(combined.as_bytes())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.hash
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(texts: &[&str], translator: &str, src: &str, tgt: &str) -> CacheKey {
        let texts: Vec<String> = texts.iter().map(ToString::to_string).collect();
        CacheKey::from_batch(&texts, translator, &Lang::new(src), &Lang::new(tgt))
    }

    #[test]
    fn test_cache_key_is_fixed_length_hash() {
        let k = key(&["Hello world"], "mock", "en", "ar");
        assert_eq!(k.to_string().len(), 32);
        assert!(k.to_string().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_cache_key_same_inputs_same_key() {
        assert_eq!(key(&["a", "b"], "mock", "en", "ar"),
                   key(&["a", "b"], "mock", "en", "ar"));
    }

    #[test]
    fn test_cache_key_differs_by_content() {
        assert_ne!(key(&["Hello"], "mock", "en", "ar"),
                   key(&["World"], "mock", "en", "ar"));
    }

    #[test]
    fn test_cache_key_differs_by_split() {
        // Same concatenation, different batch boundaries
        assert_ne!(key(&["a", "bc"], "mock", "en", "ar"),
                   key(&["ab", "c"], "mock", "en", "ar"));
    }

    #[test]
    fn test_cache_key_differs_by_translator() {
        assert_ne!(key(&["Hello"], "mock", "en", "ar"),
                   key(&["Hello"], "openai", "en", "ar"));
    }

    #[test]
    fn test_cache_key_differs_by_language() {
        assert_ne!(key(&["Hello"], "mock", "en", "ar"),
                   key(&["Hello"], "mock", "en", "fa"));
        assert_ne!(key(&["Hello"], "mock", "en", "ar"),
                   key(&["Hello"], "mock", "auto", "ar"));
    }

    #[test]
    fn test_cache_key_case_insensitive_translator() {
        assert_eq!(key(&["Hello"], "mock", "en", "ar"),
                   key(&["Hello"], "MOCK", "en", "ar"));
    }
}
