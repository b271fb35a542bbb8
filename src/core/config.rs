use std::path::PathBuf;

/// Top-level settings tree. One value is built per process (see
/// `Settings::load`) and passed by reference; nothing here is global
/// mutable state.
#[derive(Debug, Clone)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub storage: StorageSettings,
    pub bm25: Bm25Settings,
    pub shard: ShardSettings,
    pub job: JobSettings,
    pub autocomplete: AutocompleteSettings,
    pub rate_limit: RateLimitSettings,
    pub search: SearchSettings,
}

impl Settings {
    /// Load settings for a data root, applying defaults for anything not
    /// overridden by environment variables.
    pub fn load(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Settings {
            storage: StorageSettings::default(),
            bm25: Bm25Settings::default(),
            shard: ShardSettings::default(),
            job: JobSettings::default(),
            autocomplete: AutocompleteSettings::default(),
            rate_limit: RateLimitSettings::default(),
            search: SearchSettings::default(),
            data_dir,
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("db").join("redisearch.db")
    }

    pub fn indexes_dir(&self) -> PathBuf {
        self.data_dir.join("indexes")
    }

    pub fn autocomplete_dir(&self) -> PathBuf {
        self.data_dir.join("autocomplete")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings::load(PathBuf::from("./data"))
    }
}

#[derive(Debug, Clone)]
pub struct StorageSettings {
    pub busy_timeout_ms: u32,
    pub reader_pool_size: usize,
}

impl Default for StorageSettings {
    fn default() -> Self {
        StorageSettings {
            busy_timeout_ms: 5_000,
            reader_pool_size: 4,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Bm25Settings {
    pub k1: f32,
    pub b: f32,
}

impl Default for Bm25Settings {
    fn default() -> Self {
        Bm25Settings { k1: 1.2, b: 0.75 }
    }
}

#[derive(Debug, Clone)]
pub struct ShardSettings {
    /// Subreddits with at least this many documents get their own shard;
    /// everything else lands in `grouped_shard_id`.
    pub dedicated_shard_threshold: usize,
    pub grouped_shard_id: String,
}

impl Default for ShardSettings {
    fn default() -> Self {
        ShardSettings {
            dedicated_shard_threshold: 500,
            grouped_shard_id: "shard_misc".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JobSettings {
    pub worker_count: usize,
    pub poll_interval_ms: u64,
    pub stale_age_secs: i64,
    pub max_retries: u32,
    pub completed_retention_secs: i64,
}

impl Default for JobSettings {
    fn default() -> Self {
        JobSettings {
            worker_count: 3,
            poll_interval_ms: 250,
            stale_age_secs: 900,
            max_retries: 3,
            completed_retention_secs: 7 * 24 * 3600,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AutocompleteSettings {
    pub max_suggestions: usize,
    pub min_prefix_len: usize,
    pub min_token_length: usize,
    pub max_token_length: usize,
    /// Posts newer than this many days get their score boosted by
    /// `recency_multiplier` when building the trie.
    pub recency_days: i64,
    pub recency_multiplier: f32,
    /// Minimum word length for individual title words to get their own
    /// trie entry (in addition to the full title).
    pub min_word_length: usize,
}

impl Default for AutocompleteSettings {
    fn default() -> Self {
        AutocompleteSettings {
            max_suggestions: 10,
            min_prefix_len: 1,
            min_token_length: 1,
            max_token_length: 64,
            recency_days: 1,
            recency_multiplier: 1.5,
            min_word_length: 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RateLimitSettings {
    pub capacity: u32,
    pub refill_per_sec: f64,
    pub stale_after_secs: i64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        RateLimitSettings {
            capacity: 60,
            refill_per_sec: 1.0,
            stale_after_secs: 3600,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub default_page_size: usize,
    pub max_page_size: usize,
    pub min_token_length: usize,
    pub max_token_length: usize,
    pub hybrid_weights: (f32, f32, f32),
    pub rrf_k: f32,
}

impl Default for SearchSettings {
    fn default() -> Self {
        SearchSettings {
            default_page_size: 20,
            max_page_size: 100,
            min_token_length: 2,
            max_token_length: 40,
            hybrid_weights: (0.7, 0.15, 0.15),
            rrf_k: 60.0,
        }
    }
}
