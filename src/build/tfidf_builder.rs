use std::path::PathBuf;

use tracing::info;

use crate::build::{collect_documents, BuildSummary};
use crate::core::config::Settings;
use crate::core::error::Result;
use crate::index::tfidf::TfidfIndex;
use crate::sharding::planner::ShardPlanner;
use crate::storage::connection::Database;
use crate::storage::index_version_store::IndexVersionStore;
use crate::storage::models::IndexVersionStatus;
use crate::storage::raw_store::RawPostStore;

/// Builds and activates TF-IDF indexes per shard, mirroring
/// `Bm25IndexBuilder` but shard-aware: several small subreddits can land
/// in the same grouped shard.
pub struct TfidfIndexBuilder<'a> {
    db: &'a Database,
    settings: &'a Settings,
}

impl<'a> TfidfIndexBuilder<'a> {
    pub fn new(db: &'a Database, settings: &'a Settings) -> Self {
        TfidfIndexBuilder { db, settings }
    }

    pub fn build_subreddit(&self, subreddit: &str) -> Result<BuildSummary> {
        let planner = ShardPlanner::new(self.db, &self.settings.shard);
        let shard_id = planner.get_shard_id(subreddit)?;
        self.build_shard(&shard_id, &[subreddit.trim().to_lowercase()])
    }

    pub fn build_shard(&self, shard_id: &str, subreddits: &[String]) -> Result<BuildSummary> {
        let documents = collect_documents(self.db, subreddits)?;
        if documents.is_empty() {
            return Ok(BuildSummary { shard_id: shard_id.to_string(), version: 0, doc_count: 0, file_path: None });
        }

        let index = TfidfIndex::build(&documents);

        let versions = IndexVersionStore::new(self.db);
        let version = versions.get_latest_version_number("tfidf", shard_id)? + 1;
        let rel = PathBuf::from("indexes").join("tfidf").join(shard_id).join(format!("v{version}")).join("index.bin");
        index.save(&self.settings.data_dir.join(&rel))?;

        let rel_str = rel.to_string_lossy().replace('\\', "/");
        versions.insert("tfidf", shard_id, version, IndexVersionStatus::Building, index.doc_count() as i64, &rel_str)?;
        versions.activate("tfidf", shard_id, version)?;

        info!(shard_id, doc_count = index.doc_count(), version, "built tfidf index");
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
    use crate::storage::models::{ProcessedPost, RawPost};
    use crate::storage::processed_store::ProcessedPostStore;
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
    fn build_subreddit_activates_a_version() {
        let db = Database::open_in_memory().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.data_dir = dir.path().to_path_buf();

        RawPostStore::new(&db).insert(&raw("t3_1", "rust", "async runtimes")).unwrap();
        ProcessedPostStore::new(&db)
            .upsert(&ProcessedPost::new("t3_1".to_string(), vec!["async".to_string()], vec![], 1))
            .unwrap();

        let builder = TfidfIndexBuilder::new(&db, &settings);
        let summary = builder.build_subreddit("rust").unwrap();
        assert_eq!(summary.version, 1);
        assert_eq!(summary.doc_count, 1);
    }
}
