use std::collections::HashMap;

use crate::core::config::ShardSettings;
use crate::core::error::Result;
use crate::storage::connection::Database;
use crate::storage::models::ShardAssignment;
use crate::storage::shard_store::ShardAssignmentStore;

/// A subreddit -> shard_id mapping, plus the reverse lookups the builder
/// and router need.
#[derive(Debug, Clone, Default)]
pub struct ShardPlan {
    assignments: HashMap<String, String>,
}

impl ShardPlan {
    pub fn new(assignments: HashMap<String, String>) -> Self {
        ShardPlan { assignments }
    }

    /// Shard for `subreddit`, falling back to its legacy dedicated name
    /// (`shard_<sub>`) if no assignment is on record.
    pub fn shard_for(&self, subreddit: &str) -> String {
        let sub = subreddit.trim().to_lowercase();
        self.assignments.get(&sub).cloned().unwrap_or_else(|| format!("shard_{sub}"))
    }

    pub fn subreddits_in(&self, shard_id: &str) -> Vec<String> {
        let mut subs: Vec<String> =
            self.assignments.iter().filter(|(_, sid)| sid.as_str() == shard_id).map(|(s, _)| s.clone()).collect();
        subs.sort();
        subs
    }

    pub fn shard_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.assignments.values().cloned().collect();
        ids.sort();
        ids.dedup();
        ids
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

/// Decides which shard each subreddit belongs to and persists the
/// decision so the builder, searcher, and router agree on it across
/// process restarts.
pub struct ShardPlanner<'a> {
    db: &'a Database,
    settings: &'a ShardSettings,
}

impl<'a> ShardPlanner<'a> {
    pub fn new(db: &'a Database, settings: &'a ShardSettings) -> Self {
        ShardPlanner { db, settings }
    }

    /// Subreddits at or above `dedicated_shard_threshold` documents get
    /// their own shard; everything else is grouped into
    /// `grouped_shard_id` so small subreddits don't each spawn a tiny
    /// index file.
    pub fn compute_plan(&self, subreddit_doc_counts: &HashMap<String, usize>) -> ShardPlan {
        let mut assignments = HashMap::new();
        for (sub, &count) in subreddit_doc_counts {
            let sub = sub.trim().to_lowercase();
            let shard_id = if count >= self.settings.dedicated_shard_threshold {
                format!("shard_{sub}")
            } else {
                self.settings.grouped_shard_id.clone()
            };
            assignments.insert(sub, shard_id);
        }
        ShardPlan::new(assignments)
    }

    pub fn save_plan(&self, plan: &ShardPlan) -> Result<()> {
        let store = ShardAssignmentStore::new(self.db);
        let rows: Vec<ShardAssignment> = plan
            .assignments
            .iter()
            .map(|(sub, shard_id)| ShardAssignment { subreddit: sub.clone(), shard_id: shard_id.clone() })
            .collect();
        store.upsert_many(&rows)
    }

    pub fn load_plan(&self) -> Result<ShardPlan> {
        let store = ShardAssignmentStore::new(self.db);
        let rows = store.get_all()?;
        let assignments = rows.into_iter().map(|a| (a.subreddit, a.shard_id)).collect();
        Ok(ShardPlan::new(assignments))
    }

    pub fn get_shard_id(&self, subreddit: &str) -> Result<String> {
        let sub = subreddit.trim().to_lowercase();
        let store = ShardAssignmentStore::new(self.db);
        match store.get(&sub)? {
            Some(shard_id) => Ok(shard_id),
            None => Ok(format!("shard_{sub}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn big_subreddit_gets_dedicated_shard() {
        let settings = ShardSettings { dedicated_shard_threshold: 500, grouped_shard_id: "shard_misc".to_string() };
        let db = Database::open_in_memory().unwrap();
        let planner = ShardPlanner::new(&db, &settings);

        let mut counts = HashMap::new();
        counts.insert("rust".to_string(), 1200);
        counts.insert("tinysub".to_string(), 3);

        let plan = planner.compute_plan(&counts);
        assert_eq!(plan.shard_for("rust"), "shard_rust");
        assert_eq!(plan.shard_for("tinysub"), "shard_misc");
    }

    #[test]
    fn plan_round_trips_through_storage() {
        let settings = ShardSettings { dedicated_shard_threshold: 500, grouped_shard_id: "shard_misc".to_string() };
        let db = Database::open_in_memory().unwrap();
        let planner = ShardPlanner::new(&db, &settings);

        let mut counts = HashMap::new();
        counts.insert("rust".to_string(), 1200);
        let plan = planner.compute_plan(&counts);
        planner.save_plan(&plan).unwrap();

        let loaded = planner.load_plan().unwrap();
        assert_eq!(loaded.shard_for("rust"), "shard_rust");
        assert_eq!(planner.get_shard_id("rust").unwrap(), "shard_rust");
        assert_eq!(planner.get_shard_id("unknownsub").unwrap(), "shard_unknownsub");
    }
}
