pub mod bm25_builder;
pub mod tfidf_builder;
pub mod vector_builder;

use std::collections::HashMap;

use crate::storage::connection::Database;
use crate::storage::processed_store::ProcessedPostStore;

/// Summary returned by every builder for one shard, regardless of index
/// type. `version == 0` means the shard had no documents to index.
#[derive(Debug, Clone)]
pub struct BuildSummary {
    pub shard_id: String,
    pub version: i64,
    pub doc_count: usize,
    pub file_path: Option<String>,
}

fn collect_documents(db: &Database, subreddits: &[String]) -> crate::core::error::Result<HashMap<String, Vec<String>>> {
    let store = ProcessedPostStore::new(db);
    let mut documents = HashMap::new();
    for sub in subreddits {
        for post in store.get_all_for_subreddit(&sub.trim().to_lowercase())? {
            documents.insert(post.id, post.all_tokens);
        }
    }
    Ok(documents)
}
