use std::sync::Arc;

use clap::{Parser, Subcommand};
use redisearch::api::pagination::Page;
use redisearch::autocomplete::builder::AutocompleteBuilder;
use redisearch::autocomplete::suggester::PrefixSuggester;
use redisearch::build::bm25_builder::Bm25IndexBuilder;
use redisearch::build::tfidf_builder::TfidfIndexBuilder;
use redisearch::build::vector_builder::VectorIndexBuilder;
use redisearch::core::config::Settings;
use redisearch::encoder::{Encoder, HashingEncoder};
use redisearch::jobs::pool::WorkerPool;
use redisearch::jobs::worker::JobHandler;
use redisearch::search::bm25_searcher::Bm25Searcher;
use redisearch::search::fusion;
use redisearch::search::tfidf_searcher::TfidfSearcher;
use redisearch::search::vector_searcher::VectorSearcher;
use redisearch::storage::connection::Database;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "redisearch-admin", about = "Operate a redisearch data directory")]
struct Cli {
    #[arg(long, default_value = "./data")]
    data_dir: std::path::PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build and activate one index type for a subreddit, or all subreddits.
    Build {
        #[arg(value_enum)]
        index_type: IndexTypeArg,
        #[arg(long)]
        subreddit: Option<String>,
    },
    /// Build or rebuild the autocomplete trie for a subreddit, or the global one.
    BuildAutocomplete {
        #[arg(long)]
        subreddit: Option<String>,
    },
    /// Run an ad hoc query against one scoring backend, or all three fused together.
    Query {
        query: String,
        #[arg(long)]
        subreddit: Option<String>,
        #[arg(long, default_value_t = 10)]
        top_k: usize,
        #[arg(long, value_enum)]
        backend: Option<BackendArg>,
    },
    /// Prefix suggestions from the autocomplete trie.
    Suggest {
        prefix: String,
        #[arg(long)]
        subreddit: Option<String>,
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Enqueue a job without running a worker pool.
    Enqueue {
        #[command(subcommand)]
        job: EnqueueJob,
    },
    /// Run the worker pool in the foreground, polling for queued jobs.
    Work {
        #[arg(long)]
        stop_after_idle_secs: Option<u64>,
    },
}

#[derive(Subcommand)]
enum EnqueueJob {
    Crawl { subreddit: String, #[arg(long, default_value_t = 1)] max_pages: i64 },
    Preprocess { #[arg(long)] subreddit: Option<String> },
    BuildIndex { #[arg(value_enum)] index_type: IndexTypeArg, #[arg(long)] subreddit: Option<String> },
    Rebuild,
}

#[derive(Clone, clap::ValueEnum)]
enum IndexTypeArg {
    Bm25,
    Tfidf,
    Vector,
}

#[derive(Clone, clap::ValueEnum)]
enum BackendArg {
    Bm25,
    Tfidf,
    Vector,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(&cli.data_dir);
    let _log_guard = redisearch::core::logging::init(&settings.logs_dir())?;

    let db = Database::open(&settings.db_path(), settings.storage.busy_timeout_ms, settings.storage.reader_pool_size)?;
    let encoder = HashingEncoder::default();

    match cli.command {
        Command::Build { index_type, subreddit } => run_build(&db, &settings, index_type, subreddit.as_deref(), &encoder)?,
        Command::BuildAutocomplete { subreddit } => {
            let builder = AutocompleteBuilder::new(&db, &settings);
            let summary = builder.build(subreddit.as_deref())?;
            println!("built autocomplete trie '{}': {} terms -> {}", summary.label, summary.term_count, summary.file_path.display());
        }
        Command::Query { query, subreddit, top_k, backend } => run_query(&db, &settings, &encoder, &query, subreddit.as_deref(), top_k, backend)?,
        Command::Suggest { prefix, subreddit, top_k } => {
            let suggester = PrefixSuggester::new(&settings);
            let hits = suggester.suggest(&prefix, subreddit.as_deref(), top_k);
            let page = Page::from_results(&hits, 0, top_k.unwrap_or(settings.autocomplete.max_suggestions));
            for s in &page.items {
                println!("{:>6.2}  {}", s.score, s.term);
            }
        }
        Command::Enqueue { job } => run_enqueue(Arc::new(db), settings, job)?,
        Command::Work { stop_after_idle_secs } => run_worker(Arc::new(db), settings, stop_after_idle_secs)?,
    }

    Ok(())
}

fn run_build(
    db: &Database,
    settings: &Settings,
    index_type: IndexTypeArg,
    subreddit: Option<&str>,
    encoder: &dyn Encoder,
) -> anyhow::Result<()> {
    let summaries = match (index_type, subreddit) {
        (IndexTypeArg::Bm25, Some(sub)) => vec![Bm25IndexBuilder::new(db, settings).build_subreddit(sub)?],
        (IndexTypeArg::Bm25, None) => Bm25IndexBuilder::new(db, settings).build_all()?,
        (IndexTypeArg::Tfidf, Some(sub)) => vec![TfidfIndexBuilder::new(db, settings).build_subreddit(sub)?],
        (IndexTypeArg::Tfidf, None) => TfidfIndexBuilder::new(db, settings).build_all()?,
        (IndexTypeArg::Vector, Some(sub)) => vec![VectorIndexBuilder::new(db, settings, encoder).build_subreddit(sub)?],
        (IndexTypeArg::Vector, None) => VectorIndexBuilder::new(db, settings, encoder).build_all()?,
    };

    for s in summaries {
        println!("shard {}: v{} ({} docs)", s.shard_id, s.version, s.doc_count);
    }
    Ok(())
}

fn run_query(
    db: &Database,
    settings: &Settings,
    encoder: &dyn Encoder,
    query: &str,
    subreddit: Option<&str>,
    top_k: usize,
    backend: Option<BackendArg>,
) -> anyhow::Result<()> {
    match backend {
        Some(BackendArg::Bm25) => {
            for hit in Bm25Searcher::new(db, settings).search(query, subreddit, top_k) {
                println!("{:>8.4}  {}  ({})", hit.score, hit.doc_id, hit.shard_id);
            }
        }
        Some(BackendArg::Tfidf) => {
            for hit in TfidfSearcher::new(db, settings).search(query, subreddit, top_k) {
                println!("{:>8.4}  {}  ({})", hit.score, hit.doc_id, hit.shard_id);
            }
        }
        Some(BackendArg::Vector) => {
            for hit in VectorSearcher::new(db, settings, encoder).search(query, subreddit, top_k) {
                println!("{:>8.4}  {}  ({})", hit.score, hit.doc_id, hit.shard_id);
            }
        }
        None => {
            let bm25 = Bm25Searcher::new(db, settings).search(query, subreddit, top_k * 3);
            let tfidf = TfidfSearcher::new(db, settings).search(query, subreddit, top_k * 3);
            let vector = VectorSearcher::new(db, settings, encoder).search(query, subreddit, top_k * 3);
            let fused = fusion::linear_combination(&bm25, &tfidf, &vector, settings.search.hybrid_weights, top_k);
            for hit in fused {
                println!(
                    "{:>8.4}  {}  ({})  bm25={:.3} tfidf={:.3} vector={:.3}",
                    hit.score, hit.doc_id, hit.shard_id, hit.bm25_score, hit.tfidf_score, hit.vector_score
                );
            }
        }
    }
    Ok(())
}

fn run_enqueue(db: Arc<Database>, settings: Settings, job: EnqueueJob) -> anyhow::Result<()> {
    let pool = WorkerPool::new(db, settings.job.clone());
    let id = match job {
        EnqueueJob::Crawl { subreddit, max_pages } => pool.enqueue_crawl(&subreddit, max_pages, 0)?,
        EnqueueJob::Preprocess { subreddit } => pool.enqueue_preprocess(subreddit.as_deref(), 0)?,
        EnqueueJob::BuildIndex { index_type, subreddit } => {
            let type_str = match index_type {
                IndexTypeArg::Bm25 => "bm25",
                IndexTypeArg::Tfidf => "tfidf",
                IndexTypeArg::Vector => "vector",
            };
            pool.enqueue_build_index(type_str, subreddit.as_deref(), 0)?
        }
        EnqueueJob::Rebuild => pool.enqueue_rebuild(0)?,
    };
    println!("enqueued job #{id}");
    Ok(())
}

fn run_worker(db: Arc<Database>, settings: Settings, stop_after_idle_secs: Option<u64>) -> anyhow::Result<()> {
    let mut pool = WorkerPool::new(db.clone(), settings.job.clone());

    let build_db = db.clone();
    let build_settings = settings.clone();
    let handler: JobHandler = Arc::new(move |payload| {
        let index_type = payload.get("index_type").and_then(|v| v.as_str()).unwrap_or("bm25");
        let subreddit = payload.get("subreddit").and_then(|v| v.as_str()).filter(|s| *s != "all");
        let encoder = HashingEncoder::default();
        match index_type {
            "bm25" => match subreddit {
                Some(sub) => Bm25IndexBuilder::new(&build_db, &build_settings).build_subreddit(sub).map(|_| ()),
                None => Bm25IndexBuilder::new(&build_db, &build_settings).build_all().map(|_| ()),
            },
            "tfidf" => match subreddit {
                Some(sub) => TfidfIndexBuilder::new(&build_db, &build_settings).build_subreddit(sub).map(|_| ()),
                None => TfidfIndexBuilder::new(&build_db, &build_settings).build_all().map(|_| ()),
            },
            "vector" => match subreddit {
                Some(sub) => VectorIndexBuilder::new(&build_db, &build_settings, &encoder).build_subreddit(sub).map(|_| ()),
                None => VectorIndexBuilder::new(&build_db, &build_settings, &encoder).build_all().map(|_| ()),
            },
            other => Err(redisearch::core::error::Error::InvalidInput(format!("unknown index type '{other}'"))),
        }
    });
    pool.register("build_index", handler);

    pool.start();
    println!("worker pool running with {} workers, Ctrl-C to stop", pool.worker_count());

    let idle_limit = stop_after_idle_secs.map(Duration::from_secs);
    let mut idle_since = std::time::Instant::now();
    loop {
        std::thread::sleep(Duration::from_millis(500));
        if let Some(limit) = idle_limit {
            if pool.recover_stale(settings.job.stale_age_secs)? == 0 {
                if idle_since.elapsed() >= limit {
                    break;
                }
            } else {
                idle_since = std::time::Instant::now();
            }
        }
    }

    pool.stop();
    Ok(())
}
