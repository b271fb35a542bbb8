use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use crate::analysis::preprocessor::{StandardPreprocessor, TextPreprocessor};
use crate::core::config::Settings;
use crate::core::types::{DocId, IndexType, ScoredDoc, TextProfile};
use crate::encoder::Encoder;
use crate::index::vector::VectorIndex;
use crate::sharding::planner::ShardPlanner;
use crate::sharding::router::ShardRouter;
use crate::storage::connection::Database;
use crate::storage::index_version_store::IndexVersionStore;

/// Encodes the query with the same embedding model used at build time,
/// then runs k-NN over each active shard's vector index.
pub struct VectorSearcher<'a> {
    db: &'a Database,
    settings: &'a Settings,
    encoder: &'a dyn Encoder,
    preprocessor: StandardPreprocessor,
    cache: Mutex<HashMap<PathBuf, Arc<VectorIndex>>>,
}

impl<'a> VectorSearcher<'a> {
    pub fn new(db: &'a Database, settings: &'a Settings, encoder: &'a dyn Encoder) -> Self {
        VectorSearcher {
            db,
            settings,
            encoder,
            preprocessor: StandardPreprocessor::default(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn search(&self, query: &str, subreddit: Option<&str>, top_k: usize) -> Vec<ScoredDoc> {
        if query.trim().is_empty() {
            return Vec::new();
        }

        let planner = ShardPlanner::new(self.db, &self.settings.shard);
        let router = ShardRouter::new(self.db, planner);
        let shards = match router.resolve(subreddit, IndexType::Vector) {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "vector shard resolution failed");
                return Vec::new();
            }
        };
        if shards.is_empty() {
            return Vec::new();
        }

        let tokens = self.preprocessor.preprocess(query, TextProfile::Query);
        let query_vec = self.encoder.encode(&[tokens]).into_iter().next().unwrap_or_default();

        let mut all_hits = Vec::new();
        for shard_id in shards {
            let Some(index) = self.load(&shard_id) else { continue };
            for (doc_id, score) in index.search(&query_vec, top_k) {
                all_hits.push(ScoredDoc { doc_id: DocId::new(doc_id), score, shard_id: shard_id.clone() });
            }
        }

        all_hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        all_hits.truncate(top_k);
        all_hits
    }

    fn load(&self, shard_id: &str) -> Option<Arc<VectorIndex>> {
        let versions = IndexVersionStore::new(self.db);
        let active = versions.get_active("vector", shard_id).ok().flatten()?;
        let path = self.settings.data_dir.join(&active.file_path);

        {
            let cache = self.cache.lock();
            if let Some(idx) = cache.get(&path) {
                return Some(idx.clone());
            }
        }

        if !path.exists() {
            warn!(shard_id, path = %path.display(), "active vector index file missing");
            return None;
        }

        match VectorIndex::load(&path) {
            Ok(idx) => {
                let idx = Arc::new(idx);
                let mut cache = self.cache.lock();
                let idx = cache.entry(path).or_insert(idx).clone();
                Some(idx)
            }
            Err(e) => {
                warn!(shard_id, error = %e, "failed to load vector index");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::HashingEncoder;
    use crate::storage::models::IndexVersionStatus;

    #[test]
    fn blank_query_returns_no_hits() {
        let db = Database::open_in_memory().unwrap();
        let settings = Settings::default();
        let encoder = HashingEncoder::new(16);
        let searcher = VectorSearcher::new(&db, &settings, &encoder);
        assert!(searcher.search("  ", None, 10).is_empty());
    }

    #[test]
    fn searches_loaded_shard() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_in_memory().unwrap();
        let mut settings = Settings::default();
        settings.data_dir = dir.path().to_path_buf();
        let encoder = HashingEncoder::new(16);

        let tokens = vec!["rust".to_string(), "async".to_string()];
        let embedding = encoder.encode(&[tokens]).remove(0);
        let idx = VectorIndex::build(vec!["p1".to_string()], vec![embedding]).unwrap();
        let rel = PathBuf::from("indexes/vector/shard_rust/v1/index.bin");
        idx.save(&dir.path().join(&rel)).unwrap();

        IndexVersionStore::new(&db)
            .insert("vector", "shard_rust", 1, IndexVersionStatus::Active, 1, rel.to_str().unwrap())
            .unwrap();

        let searcher = VectorSearcher::new(&db, &settings, &encoder);
        let hits = searcher.search("rust async", Some("rust"), 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].doc_id.as_str(), "p1");
    }
}
