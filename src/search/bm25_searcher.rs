use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use crate::analysis::preprocessor::{StandardPreprocessor, TextPreprocessor};
use crate::core::config::Settings;
use crate::core::types::{DocId, IndexType, ScoredDoc, TextProfile};
use crate::index::bm25::Bm25Index;
use crate::sharding::planner::ShardPlanner;
use crate::sharding::router::ShardRouter;
use crate::storage::connection::Database;
use crate::storage::index_version_store::IndexVersionStore;

/// Loads active BM25 indexes and ranks a query against them. Indexes are
/// cached in memory keyed by their file path, so repeated queries against
/// the same shard don't re-read and re-deserialize it from disk.
pub struct Bm25Searcher<'a> {
    db: &'a Database,
    settings: &'a Settings,
    preprocessor: StandardPreprocessor,
    cache: Mutex<HashMap<PathBuf, Arc<Bm25Index>>>,
}

impl<'a> Bm25Searcher<'a> {
    pub fn new(db: &'a Database, settings: &'a Settings) -> Self {
        Bm25Searcher { db, settings, preprocessor: StandardPreprocessor::default(), cache: Mutex::new(HashMap::new()) }
    }

    pub fn search(&self, query: &str, subreddit: Option<&str>, top_k: usize) -> Vec<ScoredDoc> {
        let tokens = self.preprocessor.preprocess(query, TextProfile::Query);
        if tokens.is_empty() {
            return Vec::new();
        }

        let planner = ShardPlanner::new(self.db, &self.settings.shard);
        let router = ShardRouter::new(self.db, planner);
        let shards = match router.resolve(subreddit, IndexType::Bm25) {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "bm25 shard resolution failed");
                return Vec::new();
            }
        };

        let mut all_hits = Vec::new();
        for shard_id in shards {
            let Some(index) = self.load(&shard_id) else { continue };
            for (doc_id, score) in index.score(&tokens, top_k) {
                all_hits.push(ScoredDoc { doc_id: DocId::new(doc_id), score, shard_id: shard_id.clone() });
            }
        }

        all_hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        all_hits.truncate(top_k);
        all_hits
    }

    fn load(&self, shard_id: &str) -> Option<Arc<Bm25Index>> {
        let versions = IndexVersionStore::new(self.db);
        let active = versions.get_active("bm25", shard_id).ok().flatten()?;
        let path = self.settings.data_dir.join(&active.file_path);

        {
            let cache = self.cache.lock();
            if let Some(idx) = cache.get(&path) {
                return Some(idx.clone());
            }
        }

        if !path.exists() {
            warn!(shard_id, path = %path.display(), "active bm25 index file missing");
            return None;
        }

        match Bm25Index::load(&path) {
            Ok(idx) => {
                let idx = Arc::new(idx);
                let mut cache = self.cache.lock();
                let idx = cache.entry(path).or_insert(idx).clone();
                Some(idx)
            }
            Err(e) => {
                warn!(shard_id, error = %e, "failed to load bm25 index");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::models::IndexVersionStatus;
    use std::collections::HashMap as Map;

    #[test]
    fn empty_query_returns_no_hits() {
        let db = Database::open_in_memory().unwrap();
        let settings = Settings::default();
        let searcher = Bm25Searcher::new(&db, &settings);
        assert!(searcher.search("   ", None, 10).is_empty());
    }

    #[test]
    fn searches_loaded_shard() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_in_memory().unwrap();
        let mut settings = Settings::default();
        settings.data_dir = dir.path().to_path_buf();

        let mut docs: Map<String, Vec<String>> = Map::new();
        docs.insert("p1".to_string(), vec!["rust".to_string(), "async".to_string()]);
        let mut idx = Bm25Index::new(1.2, 0.75);
        idx.build(&docs);
        let rel = PathBuf::from("indexes/bm25/shard_rust/v1/index.bin");
        idx.save(&dir.path().join(&rel)).unwrap();

        IndexVersionStore::new(&db)
            .insert("bm25", "shard_rust", 1, IndexVersionStatus::Active, 1, rel.to_str().unwrap())
            .unwrap();

        let searcher = Bm25Searcher::new(&db, &settings);
        let hits = searcher.search("rust", Some("rust"), 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].doc_id.as_str(), "p1");
    }
}
