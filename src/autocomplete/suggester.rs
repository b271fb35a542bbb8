use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::autocomplete::trie::{Suggestion, Trie};
use crate::core::config::Settings;

/// Loads persisted tries on demand and serves prefix queries, falling
/// back to the global `all` trie when a subreddit has none of its own.
pub struct PrefixSuggester<'a> {
    settings: &'a Settings,
    cache: Mutex<HashMap<PathBuf, Arc<Trie>>>,
}

impl<'a> PrefixSuggester<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        PrefixSuggester { settings, cache: Mutex::new(HashMap::new()) }
    }

    pub fn suggest(&self, prefix: &str, subreddit: Option<&str>, top_k: Option<usize>) -> Vec<Suggestion> {
        let top_k = top_k.unwrap_or(self.settings.autocomplete.max_suggestions);
        let label = subreddit.map(|s| s.trim().to_lowercase()).unwrap_or_else(|| "all".to_string());

        let trie = self.load(&label).or_else(|| if label != "all" { self.load("all") } else { None });
        match trie {
            Some(trie) => trie.search(prefix, top_k),
            None => Vec::new(),
        }
    }

    fn load(&self, label: &str) -> Option<Arc<Trie>> {
        let path = self.settings.data_dir.join("autocomplete").join(format!("{label}.bin"));

        {
            let cache = self.cache.lock();
            if let Some(trie) = cache.get(&path) {
                return Some(trie.clone());
            }
        }

        if !path.exists() {
            return None;
        }

        let trie = Arc::new(Trie::load(&path).ok()?);
        let mut cache = self.cache.lock();
        let trie = cache.entry(path).or_insert(trie).clone();
        Some(trie)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_global_trie() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.data_dir = dir.path().to_path_buf();

        let mut trie = Trie::new();
        trie.insert("rust async", 5.0);
        trie.save(&dir.path().join("autocomplete").join("all.bin")).unwrap();

        let suggester = PrefixSuggester::new(&settings);
        let hits = suggester.suggest("rust", Some("nonexistent"), None);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn missing_trie_returns_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.data_dir = dir.path().to_path_buf();
        let suggester = PrefixSuggester::new(&settings);
        assert!(suggester.suggest("rust", None, None).is_empty());
    }
}
