/// The pathmap module maps catalog-reported file paths onto locally reachable
/// paths by prefix substitution. Albums share prefixes, so translations are
/// memoized behind a mutex.
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::warn;

/// Cap on memoized translations. The cache is cleared wholesale when it fills
/// up; translation is pure, so recomputation is always safe.
const CACHE_CAPACITY: usize = 4096;

pub struct PathTranslator {
    plex_prefix: String,
    host_prefix: String,
    host_separator: char,
    cache: Mutex<HashMap<String, PathBuf>>,
}

impl PathTranslator {
    pub fn new(plex_prefix: &str, host_prefix: &str) -> PathTranslator {
        let host_separator = if host_prefix.contains('\\') { '\\' } else { '/' };
        PathTranslator {
            plex_prefix: plex_prefix.to_string(),
            host_prefix: host_prefix.to_string(),
            host_separator,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the configured Plex prefix with the host prefix, converting
    /// separators in the remainder to the host prefix's style. A path that
    /// does not carry the expected prefix is returned unchanged; downstream
    /// existence checks turn it into a not-found outcome rather than a hard
    /// failure. Total and idempotent per input.
    pub fn translate(&self, plex_path: &str) -> PathBuf {
        {
            let cache = self.cache.lock().unwrap();
            if let Some(hit) = cache.get(plex_path) {
                return hit.clone();
            }
        }

        let translated = self.translate_uncached(plex_path);

        let mut cache = self.cache.lock().unwrap();
        if cache.len() >= CACHE_CAPACITY {
            cache.clear();
        }
        cache.insert(plex_path.to_string(), translated.clone());
        translated
    }

    fn translate_uncached(&self, plex_path: &str) -> PathBuf {
        let Some(remainder) = plex_path.strip_prefix(&self.plex_prefix) else {
            warn!("Path {plex_path} does not start with the configured Plex prefix {}", self.plex_prefix);
            return PathBuf::from(plex_path);
        };
        let remainder: String = remainder
            .chars()
            .map(|c| if c == '/' || c == '\\' { self.host_separator } else { c })
            .collect();
        PathBuf::from(format!("{}{}", self.host_prefix, remainder))
    }

    #[cfg(test)]
    pub fn cached_len(&self) -> usize {
        self.cache.lock().unwrap().len()
    }
}
