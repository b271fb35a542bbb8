use crate::core::error::Result;
use crate::core::types::IndexType;
use crate::sharding::planner::ShardPlanner;
use crate::storage::connection::Database;
use crate::storage::index_version_store::IndexVersionStore;

/// Resolves a search request (optional subreddit filter + index type)
/// into the set of shard_ids the searcher should scan.
pub struct ShardRouter<'a> {
    db: &'a Database,
    planner: ShardPlanner<'a>,
}

impl<'a> ShardRouter<'a> {
    pub fn new(db: &'a Database, planner: ShardPlanner<'a>) -> Self {
        ShardRouter { db, planner }
    }

    /// With a subreddit filter, resolve its shard assignment and confirm
    /// an active index exists there, falling back to the legacy dedicated
    /// shard name if the plan's assignment doesn't have one. Without a
    /// filter, return every active shard for `index_type`.
    pub fn resolve(&self, subreddit: Option<&str>, index_type: IndexType) -> Result<Vec<String>> {
        let versions = IndexVersionStore::new(self.db);

        let Some(subreddit) = subreddit else {
            let all_active = versions.get_all_active()?;
            let mut ids: Vec<String> = all_active
                .into_iter()
                .filter(|v| v.index_type == index_type.as_str())
                .map(|v| v.shard_id)
                .collect();
            ids.sort();
            ids.dedup();
            return Ok(ids);
        };

        let shard_id = self.planner.get_shard_id(subreddit)?;
        if versions.get_active(index_type.as_str(), &shard_id)?.is_some() {
            return Ok(vec![shard_id]);
        }

        let legacy = format!("shard_{}", subreddit.trim().to_lowercase());
        if legacy != shard_id && versions.get_active(index_type.as_str(), &legacy)?.is_some() {
            return Ok(vec![legacy]);
        }

        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ShardSettings;
    use crate::storage::models::IndexVersionStatus;

    fn shard_settings() -> ShardSettings {
        ShardSettings { dedicated_shard_threshold: 500, grouped_shard_id: "shard_misc".to_string() }
    }

    #[test]
    fn resolves_subreddit_to_its_active_shard() {
        let db = Database::open_in_memory().unwrap();
        let settings = shard_settings();
        let planner = ShardPlanner::new(&db, &settings);
        planner
            .save_plan(&planner.compute_plan(&[("rust".to_string(), 1200usize)].into_iter().collect()))
            .unwrap();

        IndexVersionStore::new(&db)
            .insert("bm25", "shard_rust", 1, IndexVersionStatus::Active, 10, "data/indexes/bm25/shard_rust/v1")
            .unwrap();

        let router = ShardRouter::new(&db, ShardPlanner::new(&db, &settings));
        assert_eq!(router.resolve(Some("rust"), IndexType::Bm25).unwrap(), vec!["shard_rust".to_string()]);
    }

    #[test]
    fn no_subreddit_returns_all_active_shards_of_type() {
        let db = Database::open_in_memory().unwrap();
        let settings = shard_settings();
        IndexVersionStore::new(&db)
            .insert("bm25", "shard_rust", 1, IndexVersionStatus::Active, 10, "p1")
            .unwrap();
        IndexVersionStore::new(&db)
            .insert("bm25", "shard_misc", 1, IndexVersionStatus::Active, 4, "p2")
            .unwrap();
        IndexVersionStore::new(&db)
            .insert("vector", "shard_rust", 1, IndexVersionStatus::Active, 10, "p3")
            .unwrap();

        let router = ShardRouter::new(&db, ShardPlanner::new(&db, &settings));
        let shards = router.resolve(None, IndexType::Bm25).unwrap();
        assert_eq!(shards, vec!["shard_misc".to_string(), "shard_rust".to_string()]);
    }

    #[test]
    fn unresolved_subreddit_with_no_active_index_returns_empty() {
        let db = Database::open_in_memory().unwrap();
        let settings = shard_settings();
        let router = ShardRouter::new(&db, ShardPlanner::new(&db, &settings));
        assert!(router.resolve(Some("neversheenbefore"), IndexType::Bm25).unwrap().is_empty());
    }
}
