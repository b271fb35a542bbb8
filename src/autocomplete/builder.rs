use std::path::PathBuf;

use chrono::Utc;
use tracing::info;

use crate::autocomplete::trie::Trie;
use crate::core::config::{AutocompleteSettings, Settings};
use crate::core::error::Result;
use crate::storage::connection::Database;
use crate::storage::raw_store::RawPostStore;

const SECS_PER_DAY: i64 = 86_400;

pub struct BuildSummary {
    pub label: String,
    pub term_count: usize,
    pub file_path: PathBuf,
}

/// Builds a weighted prefix trie from raw post titles: each unique
/// lowercased title is an entry scored by Reddit score (boosted for
/// recent posts), and individual words long enough to be useful get
/// their own entry for partial-title matching.
pub struct AutocompleteBuilder<'a> {
    db: &'a Database,
    settings: &'a AutocompleteSettings,
    data_dir: &'a std::path::Path,
}

impl<'a> AutocompleteBuilder<'a> {
    pub fn new(db: &'a Database, settings: &'a Settings) -> Self {
        AutocompleteBuilder { db, settings: &settings.autocomplete, data_dir: &settings.data_dir }
    }

    pub fn build(&self, subreddit: Option<&str>) -> Result<BuildSummary> {
        let store = RawPostStore::new(self.db);
        let posts = match subreddit {
            Some(sub) => store.get_by_subreddit(&sub.trim().to_lowercase(), 100_000, 0)?,
            None => {
                let mut all = Vec::new();
                for sub in store.get_subreddits()? {
                    all.extend(store.get_by_subreddit(&sub, 100_000, 0)?);
                }
                all
            }
        };

        let mut trie = Trie::new();
        let now = Utc::now().timestamp();
        let recency_cutoff = now - self.settings.recency_days * SECS_PER_DAY;

        for post in &posts {
            let title = post.title.trim().to_lowercase();
            if title.is_empty() {
                continue;
            }
            let mut score = post.score.max(1) as f32;
            if post.created_utc >= recency_cutoff {
                score *= self.settings.recency_multiplier;
            }
            trie.insert(&title, score);
        }

        for post in &posts {
            let base = post.score.max(1) as f32 * 0.5;
            for word in post.title.trim().to_lowercase().split_whitespace() {
                if word.len() >= self.settings.min_word_length {
                    trie.insert(word, base);
                }
            }
        }

        let label = subreddit.map(|s| s.trim().to_lowercase()).unwrap_or_else(|| "all".to_string());
        let rel = PathBuf::from("autocomplete").join(format!("{label}.bin"));
        let abs = self.data_dir.join(&rel);
        trie.save(&abs)?;

        info!(label = %label, term_count = trie.size(), "built autocomplete trie");
        Ok(BuildSummary { label, term_count: trie.size(), file_path: rel })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::PostType;
    use crate::storage::models::RawPost;
    use chrono::Utc as ChronoUtc;

    fn post(id: &str, sub: &str, title: &str, score: i64) -> RawPost {
        RawPost {
            id: id.to_string(),
            subreddit: sub.to_string(),
            permalink: format!("/r/{sub}/{id}"),
            title: title.to_string(),
            body: None,
            author: None,
            score,
            comment_count: 0,
            created_utc: 0,
            crawled_at: ChronoUtc::now(),
            raw_html: None,
            post_type: PostType::SelfPost,
        }
    }

    #[test]
    fn builds_trie_from_titles_and_words() {
        let db = Database::open_in_memory().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.data_dir = dir.path().to_path_buf();

        RawPostStore::new(&db).insert(&post("t3_1", "rust", "Rust async runtimes compared", 42)).unwrap();

        let builder = AutocompleteBuilder::new(&db, &settings);
        let summary = builder.build(Some("rust")).unwrap();
        assert!(summary.term_count > 1);

        let loaded = Trie::load(&dir.path().join(&summary.file_path)).unwrap();
        assert!(!loaded.search("rust", 5).is_empty());
    }
}
