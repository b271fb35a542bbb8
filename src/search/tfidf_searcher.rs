use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use crate::analysis::preprocessor::{StandardPreprocessor, TextPreprocessor};
use crate::core::config::Settings;
use crate::core::types::{DocId, IndexType, ScoredDoc, TextProfile};
use crate::index::tfidf::TfidfIndex;
use crate::sharding::planner::ShardPlanner;
use crate::sharding::router::ShardRouter;
use crate::storage::connection::Database;
use crate::storage::index_version_store::IndexVersionStore;

/// Mirrors `Bm25Searcher` but loads TF-IDF indexes and ranks by cosine
/// similarity rather than BM25.
pub struct TfidfSearcher<'a> {
    db: &'a Database,
    settings: &'a Settings,
    preprocessor: StandardPreprocessor,
    cache: Mutex<HashMap<PathBuf, Arc<TfidfIndex>>>,
}

impl<'a> TfidfSearcher<'a> {
    pub fn new(db: &'a Database, settings: &'a Settings) -> Self {
        TfidfSearcher {
            db,
            settings,
            preprocessor: StandardPreprocessor::default(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn search(&self, query: &str, subreddit: Option<&str>, top_k: usize) -> Vec<ScoredDoc> {
        let tokens = self.preprocessor.preprocess(query, TextProfile::Query);
        if tokens.is_empty() {
            return Vec::new();
        }

        let planner = ShardPlanner::new(self.db, &self.settings.shard);
        let router = ShardRouter::new(self.db, planner);
        let shards = match router.resolve(subreddit, IndexType::TfIdf) {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "tfidf shard resolution failed");
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

    fn load(&self, shard_id: &str) -> Option<Arc<TfidfIndex>> {
        let versions = IndexVersionStore::new(self.db);
        let active = versions.get_active("tfidf", shard_id).ok().flatten()?;
        let path = self.settings.data_dir.join(&active.file_path);

        {
            let cache = self.cache.lock();
            if let Some(idx) = cache.get(&path) {
                return Some(idx.clone());
            }
        }

        if !path.exists() {
            warn!(shard_id, path = %path.display(), "active tfidf index file missing");
            return None;
        }

        match TfidfIndex::load(&path) {
            Ok(idx) => {
                let idx = Arc::new(idx);
                let mut cache = self.cache.lock();
                let idx = cache.entry(path).or_insert(idx).clone();
                Some(idx)
            }
            Err(e) => {
                warn!(shard_id, error = %e, "failed to load tfidf index");
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
    fn searches_loaded_shard() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_in_memory().unwrap();
        let mut settings = Settings::default();
        settings.data_dir = dir.path().to_path_buf();

        let mut docs: Map<String, Vec<String>> = Map::new();
        docs.insert("p1".to_string(), vec!["rust".to_string(), "async".to_string()]);
        let idx = TfidfIndex::build(&docs);
        let rel = PathBuf::from("indexes/tfidf/shard_rust/v1/index.bin");
        idx.save(&dir.path().join(&rel)).unwrap();

        IndexVersionStore::new(&db)
            .insert("tfidf", "shard_rust", 1, IndexVersionStatus::Active, 1, rel.to_str().unwrap())
            .unwrap();

        let searcher = TfidfSearcher::new(&db, &settings);
        let hits = searcher.search("rust", Some("rust"), 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].doc_id.as_str(), "p1");
    }
}
