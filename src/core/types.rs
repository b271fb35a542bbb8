use serde::{Deserialize, Serialize};

/// Opaque post identifier as assigned by the crawler, e.g. `t3_abc123`.
/// Kept as a thin newtype over `String` rather than a bare alias so the
/// storage and index layers can't accidentally mix it up with a subreddit
/// name or a shard id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocId(pub String);

impl DocId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        DocId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for DocId {
    fn from(id: String) -> Self {
        DocId(id)
    }
}

impl From<&str> for DocId {
    fn from(id: &str) -> Self {
        DocId(id.to_string())
    }
}

impl std::fmt::Display for DocId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The two post shapes the crawler can hand us.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostType {
    SelfPost,
    Link,
}

/// What a search result is ranked by; used to pick the fusion weight and
/// to label rows in `index_versions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexType {
    Bm25,
    TfIdf,
    Vector,
}

impl IndexType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexType::Bm25 => "bm25",
            IndexType::TfIdf => "tfidf",
            IndexType::Vector => "vector",
        }
    }
}

impl std::str::FromStr for IndexType {
    type Err = crate::core::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bm25" => Ok(IndexType::Bm25),
            "tfidf" => Ok(IndexType::TfIdf),
            "vector" => Ok(IndexType::Vector),
            other => Err(crate::core::error::Error::InvalidInput(format!(
                "unknown index type '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for IndexType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Profile a piece of text is being preprocessed for; changes which filters
/// in the analysis pipeline run (see `analysis::preprocessor`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextProfile {
    Document,
    Query,
    Autocomplete,
}

/// A single ranked hit returned by any of the searchers, before fusion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredDoc {
    pub doc_id: DocId,
    pub score: f32,
    pub shard_id: String,
}
