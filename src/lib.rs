pub mod analysis;
pub mod api;
pub mod autocomplete;
pub mod build;
pub mod core;
pub mod encoder;
pub mod index;
pub mod jobs;
pub mod parallel;
pub mod scoring;
pub mod search;
pub mod sharding;
pub mod storage;

//
// ┌────────────────────────────────────────────────────────────────────────────────────────────┐
// │                              REDISEARCH CRATE ARCHITECTURE                                  │
// └────────────────────────────────────────────────────────────────────────────────────────────┘
//
// ┌──────────────────────────────────────── CORE LAYER ──────────────────────────────────────────┐
// │                                                                                               │
// │  ┌─────────────────────┐  ┌──────────────────────────┐  ┌───────────────────────────────┐  │
// │  │ struct Settings     │  │ enum IndexType           │  │ struct DocId                   │  │
// │  │ • data_dir          │  │ • Bm25 / TfIdf / Vector   │  │ • newtype over String          │  │
// │  │ • bm25: Bm25Settings│  └──────────────────────────┘  └───────────────────────────────┘  │
// │  │ • shard: ShardSet.  │  ┌──────────────────────────┐                                      │
// │  │ • autocomplete: ..  │  │ enum TextProfile         │  ┌───────────────────────────────┐  │
// │  │ • jobs: JobSettings │  │ • Document/Query/Autocpl │  │ enum Error (thiserror)         │  │
// │  └─────────────────────┘  └──────────────────────────┘  │ • Io / Sqlite / IndexCorrupt   │  │
// │                                                          │ • NotFound / InvalidConfig     │  │
// │                                                          └───────────────────────────────┘  │
// └───────────────────────────────────────────────────────────────────────────────────────────────┘
//
// ┌───────────────────────────────────────── STORAGE LAYER ─────────────────────────────────────┐
// │                                                                                               │
// │  ┌────────────────────────────────────────────────────────────────────────────────────┐     │
// │  │                              struct Database                                        │     │
// │  │  writer: Mutex<Connection>   read_pool: Mutex<Vec<Connection>>   path: PathBuf      │     │
// │  └────────────────────────────────────────────────────────────────────────────────────┘     │
// │                                                                                               │
// │  ┌──────────────────┐  ┌───────────────────────┐  ┌─────────────────────────────────┐      │
// │  │ RawPostStore     │  │ ProcessedPostStore    │  │ IndexVersionStore               │      │
// │  │ • insert/get_*   │  │ • upsert/get_*         │  │ • insert/activate/get_active    │      │
// │  └──────────────────┘  └───────────────────────┘  │ • building→active→stale         │      │
// │  ┌──────────────────┐  ┌───────────────────────┐  └─────────────────────────────────┘      │
// │  │ ShardAssignment  │  │ JobStore               │                                            │
// │  │ Store            │  │ • claim_next (txn)     │                                            │
// │  └──────────────────┘  │ • complete/fail/retry  │                                            │
// │                        └───────────────────────┘                                            │
// └───────────────────────────────────────────────────────────────────────────────────────────────┘
//
// ┌────────────────────────────────────────── ANALYSIS LAYER ───────────────────────────────────┐
// │                                                                                               │
// │  ┌────────────────────────┐  ┌──────────────────────┐  ┌─────────────────────┐            │
// │  │ struct Analyzer        │  │ struct Token         │  │ trait Tokenizer     │            │
// │  │ • tokenizer            │  │ • text / position    │  │ • StandardTokenizer │            │
// │  │ • filters: Vec<Box>    │  └──────────────────────┘  └─────────────────────┘            │
// │  └────────────────────────┘                                                                 │
// │  ┌────────────────────────┐  ┌──────────────────────┐  ┌─────────────────────┐            │
// │  │ trait TextPreprocessor │  │ LowercaseFilter       │  │ StopwordFilter      │            │
// │  │ • StandardPreprocessor │  │ StemmerFilter         │  │                     │            │
// │  └────────────────────────┘  └──────────────────────┘  └─────────────────────┘            │
// └───────────────────────────────────────────────────────────────────────────────────────────────┘
//
// ┌─────────────────────────────────────────── INDEX LAYER ─────────────────────────────────────┐
// │                                                                                               │
// │  ┌─────────────────────┐  ┌──────────────────────┐  ┌────────────────────────────┐        │
// │  │ struct Bm25Index    │  │ struct TfidfIndex    │  │ struct VectorIndex         │        │
// │  │ • postings: Map     │  │ • vocabulary: Map     │  │ • dim / doc_ids / vectors  │        │
// │  │ • doc_lengths       │  │ • idf / matrix        │  │ • flat inner-product scan │        │
// │  │ • avg_doc_len       │  └──────────────────────┘  └────────────────────────────┘        │
// │  └─────────────────────┘                                                                    │
// │  every index type shares the same length-prefixed bincode save/load convention             │
// └───────────────────────────────────────────────────────────────────────────────────────────────┘
//
// ┌───────────────────────────────── SHARDING / SEARCH LAYER ───────────────────────────────────┐
// │                                                                                               │
// │  ┌─────────────────────┐  ┌──────────────────────┐  ┌────────────────────────────┐        │
// │  │ ShardPlanner        │  │ ShardRouter          │  │ Bm25Searcher / TfidfSearcher│       │
// │  │ • compute_plan()    │  │ • resolve() → shards │  │ VectorSearcher              │       │
// │  │ • dedicated vs      │  └──────────────────────┘  │ • file-path-keyed cache     │        │
// │  │   grouped shard     │                            └────────────────────────────┘        │
// │  └─────────────────────┘  ┌──────────────────────┐                                          │
// │                           │ fusion::linear_combi │  ┌────────────────────────────┐        │
// │                           │ nation / reciprocal_  │  │ struct FusedHit            │        │
// │                           │ rank_fusion           │  └────────────────────────────┘        │
// │                           └──────────────────────┘                                          │
// └───────────────────────────────────────────────────────────────────────────────────────────────┘
//
// ┌──────────────────────────────── AUTOCOMPLETE / JOBS / BUILD ────────────────────────────────┐
// │                                                                                               │
// │  ┌─────────────────────┐  ┌──────────────────────┐  ┌────────────────────────────┐        │
// │  │ Trie                │  │ Worker / WorkerPool  │  │ Bm25IndexBuilder           │        │
// │  │ • weighted prefix    │  │ • poll/claim/dispatch│  │ TfidfIndexBuilder          │        │
// │  │   search             │  │   job queue          │  │ VectorIndexBuilder         │        │
// │  └─────────────────────┘  └──────────────────────┘  └────────────────────────────┘        │
// └───────────────────────────────────────────────────────────────────────────────────────────────┘
//
// ┌──────────────────────────────────────── RELATIONSHIPS ──────────────────────────────────────┐
// │                                                                                               │
// │  Database ──feeds──> RawPostStore/ProcessedPostStore ──consumed_by──> build::*Builder        │
// │                                                                              │               │
// │  ShardPlanner ──assigns──> ShardAssignmentStore <──resolved_by── ShardRouter                │
// │                                                                              │               │
// │  build::*Builder ──writes──> index/*Index ──registered_in──> IndexVersionStore              │
// │                                                                              │               │
// │  search::*Searcher ──routes_via──> ShardRouter ──loads──> index/*Index                       │
// │       │                                                                                      │
// │       └──feeds──> search::fusion ──produces──> Vec<FusedHit>                                 │
// │                                                                                               │
// │  jobs::WorkerPool ──claims──> storage::JobStore ──dispatches_to──> build::*Builder           │
// │                                                                                               │
// │  parallel::ParallelPreprocessor ──tokenizes──> RawPost ──stored_via──> ProcessedPostStore     │
// └───────────────────────────────────────────────────────────────────────────────────────────────┘
//
