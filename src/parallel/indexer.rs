use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::info;

use crate::analysis::preprocessor::TextPreprocessor;
use crate::core::types::TextProfile;
use crate::storage::models::{ProcessedPost, RawPost};

/// Runs the raw-post-to-tokens pipeline across a rayon thread pool instead
/// of one post at a time, so a large backlog of crawled posts can be
/// tokenized without blocking the job worker that queued the batch.
pub struct ParallelPreprocessor {
    batch_size: usize,
    progress: Arc<AtomicUsize>,
}

impl ParallelPreprocessor {
    pub fn new(workers: usize) -> Self {
        rayon::ThreadPoolBuilder::new().num_threads(workers.max(1)).build_global().ok();
        ParallelPreprocessor { batch_size: 500, progress: Arc::new(AtomicUsize::new(0)) }
    }

    pub fn progress(&self) -> usize {
        self.progress.load(Ordering::Relaxed)
    }

    /// Tokenizes every post's title and body independently, in parallel,
    /// using `pipeline_version` to stamp the resulting rows.
    pub fn process_batch(
        &self,
        preprocessor: &(dyn TextPreprocessor + Sync),
        posts: &[RawPost],
        pipeline_version: i64,
    ) -> Vec<ProcessedPost> {
        self.progress.store(0, Ordering::Relaxed);
        let total = posts.len();

        posts
            .par_chunks(self.batch_size)
            .flat_map(|chunk| {
                chunk
                    .par_iter()
                    .map(|post| {
                        let title_tokens = preprocessor.preprocess(&post.title, TextProfile::Document);
                        let body_tokens = post
                            .body
                            .as_deref()
                            .map(|b| preprocessor.preprocess(b, TextProfile::Document))
                            .unwrap_or_default();

                        let done = self.progress.fetch_add(1, Ordering::Relaxed) + 1;
                        if done % 1000 == 0 {
                            info!(done, total, "preprocessing progress");
                        }

                        ProcessedPost::new(post.id.clone(), title_tokens, body_tokens, pipeline_version)
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::preprocessor::StandardPreprocessor;
    use crate::core::types::PostType;
    use chrono::Utc;

    fn raw(id: &str, title: &str, body: Option<&str>) -> RawPost {
        RawPost {
            id: id.to_string(),
            subreddit: "rust".to_string(),
            permalink: format!("/r/rust/{id}"),
            title: title.to_string(),
            body: body.map(str::to_string),
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
    fn tokenizes_every_post_in_the_batch() {
        let preprocessor = StandardPreprocessor::default();
        let posts = vec![
            raw("t3_1", "async runtimes compared", Some("tokio and smol")),
            raw("t3_2", "borrow checker tips", None),
        ];

        let parallel = ParallelPreprocessor::new(2);
        let processed = parallel.process_batch(&preprocessor, &posts, 1);

        assert_eq!(processed.len(), 2);
        assert!(processed.iter().find(|p| p.id == "t3_1").unwrap().token_count > 0);
        assert_eq!(parallel.progress(), 2);
    }

    #[test]
    fn empty_batch_produces_no_rows() {
        let preprocessor = StandardPreprocessor::default();
        let parallel = ParallelPreprocessor::new(2);
        assert!(parallel.process_batch(&preprocessor, &[], 1).is_empty());
    }
}
