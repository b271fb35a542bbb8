use std::path::PathBuf;

use tracing::info;

use crate::analysis::preprocessor::{StandardPreprocessor, TextPreprocessor};
use crate::build::BuildSummary;
use crate::core::config::Settings;
use crate::core::error::Result;
use crate::core::types::TextProfile;
use crate::encoder::Encoder;
use crate::index::vector::VectorIndex;
use crate::sharding::planner::ShardPlanner;
use crate::storage::connection::Database;
use crate::storage::index_version_store::IndexVersionStore;
use crate::storage::models::IndexVersionStatus;
use crate::storage::raw_store::RawPostStore;

/// Builds and activates vector indexes: encodes each post's title+body,
/// then stores the resulting embeddings in a flat k-NN index per shard.
pub struct VectorIndexBuilder<'a> {
    db: &'a Database,
    settings: &'a Settings,
    encoder: &'a dyn Encoder,
}

impl<'a> VectorIndexBuilder<'a> {
    pub fn new(db: &'a Database, settings: &'a Settings, encoder: &'a dyn Encoder) -> Self {
        VectorIndexBuilder { db, settings, encoder }
    }

    pub fn build_subreddit(&self, subreddit: &str) -> Result<BuildSummary> {
        let planner = ShardPlanner::new(self.db, &self.settings.shard);
        let shard_id = planner.get_shard_id(subreddit)?;
        self.build_shard(&shard_id, &[subreddit.trim().to_lowercase()])
    }

    pub fn build_shard(&self, shard_id: &str, subreddits: &[String]) -> Result<BuildSummary> {
        let raw = RawPostStore::new(self.db);
        let preprocessor = StandardPreprocessor::default();
        let mut doc_ids = Vec::new();
        let mut texts = Vec::new();
        for sub in subreddits {
            for post in raw.get_by_subreddit(&sub.trim().to_lowercase(), 100_000, 0)? {
                let full_text = format!("{} {}", post.title, post.body.unwrap_or_default());
                doc_ids.push(post.id);
                texts.push(preprocessor.preprocess(&full_text, TextProfile::Document));
            }
        }

        if doc_ids.is_empty() {
            return Ok(BuildSummary { shard_id: shard_id.to_string(), version: 0, doc_count: 0, file_path: None });
        }

        let embeddings = self.encoder.encode(&texts);
        let index = VectorIndex::build(doc_ids, embeddings)?;

        let versions = IndexVersionStore::new(self.db);
        let version = versions.get_latest_version_number("vector", shard_id)? + 1;
        let rel =
            PathBuf::from("indexes").join("vector").join(shard_id).join(format!("v{version}")).join("index.bin");
        index.save(&self.settings.data_dir.join(&rel))?;

        let rel_str = rel.to_string_lossy().replace('\\', "/");
        versions.insert(
            "vector",
            shard_id,
            version,
            IndexVersionStatus::Building,
            index.doc_count() as i64,
            &rel_str,
        )?;
        versions.activate("vector", shard_id, version)?;

        info!(shard_id, doc_count = index.doc_count(), version, "built vector index");
        Ok(BuildSummary {
            shard_id: shard_id.to_string(),
            version,
            doc_count: index.doc_count(),
            file_path: Some(rel_str),
        })
    }

    pub fn build_all(&self) -> Result<Vec<BuildSummary>> {
        let planner = ShardPlanner::new(self.db, &self.settings.shard);
        let mut plan = planner.load_plan()?;
        if plan.is_empty() {
            let subreddits = RawPostStore::new(self.db).get_subreddits()?;
            let mut counts = std::collections::HashMap::new();
            for sub in subreddits {
                counts.insert(sub, usize::MAX);
            }
            plan = planner.compute_plan(&counts);
        }

        plan.shard_ids().iter().map(|shard_id| self.build_shard(shard_id, &plan.subreddits_in(shard_id))).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::PostType;
    use crate::encoder::HashingEncoder;
    use crate::storage::models::RawPost;
    use chrono::Utc;

    fn raw(id: &str, sub: &str, title: &str) -> RawPost {
        RawPost {
            id: id.to_string(),
            subreddit: sub.to_string(),
            permalink: format!("/r/{sub}/{id}"),
            title: title.to_string(),
            body: None,
            author: None,
            score: 1,
            comment_count: 0,
            created_utc: 0,
            crawled_at: Utc::now(),
            raw_html: None,
            post_type: PostType::SelfPost,
        }
    }

    #[test]
    fn builds_and_activates_vector_index() {
        let db = Database::open_in_memory().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.data_dir = dir.path().to_path_buf();
        let encoder = HashingEncoder::new(32);

        RawPostStore::new(&db).insert(&raw("t3_1", "rust", "async runtimes compared")).unwrap();

        let builder = VectorIndexBuilder::new(&db, &settings, &encoder);
        let summary = builder.build_subreddit("rust").unwrap();
        assert_eq!(summary.version, 1);
        assert_eq!(summary.doc_count, 1);

        let active = IndexVersionStore::new(&db).get_active("vector", "shard_rust").unwrap();
        assert!(active.is_some());
    }
}
