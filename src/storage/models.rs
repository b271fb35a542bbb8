use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::types::PostType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPost {
    pub id: String,
    pub subreddit: String,
    pub permalink: String,
    pub title: String,
    pub body: Option<String>,
    pub author: Option<String>,
    pub score: i64,
    pub comment_count: i64,
    pub created_utc: i64,
    pub crawled_at: DateTime<Utc>,
    pub raw_html: Option<Vec<u8>>,
    pub post_type: PostType,
}

impl RawPost {
    pub fn post_type_str(&self) -> &'static str {
        match self.post_type {
            PostType::SelfPost => "self",
            PostType::Link => "link",
        }
    }
}

pub fn parse_post_type(s: &str) -> PostType {
    match s {
        "link" => PostType::Link,
        _ => PostType::SelfPost,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedPost {
    pub id: String,
    pub title_tokens: Vec<String>,
    pub body_tokens: Vec<String>,
    pub all_tokens: Vec<String>,
    pub token_count: usize,
    pub pipeline_version: i64,
    pub processed_at: DateTime<Utc>,
}

impl ProcessedPost {
    pub fn new(id: String, title_tokens: Vec<String>, body_tokens: Vec<String>, pipeline_version: i64) -> Self {
        let mut all_tokens = title_tokens.clone();
        all_tokens.extend(body_tokens.clone());
        let token_count = all_tokens.len();
        ProcessedPost {
            id,
            title_tokens,
            body_tokens,
            all_tokens,
            token_count,
            pipeline_version,
            processed_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexVersionStatus {
    Building,
    Active,
    Stale,
}

impl IndexVersionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexVersionStatus::Building => "building",
            IndexVersionStatus::Active => "active",
            IndexVersionStatus::Stale => "stale",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "active" => IndexVersionStatus::Active,
            "stale" => IndexVersionStatus::Stale,
            _ => IndexVersionStatus::Building,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexVersion {
    pub id: i64,
    pub index_type: String,
    pub shard_id: String,
    pub version: i64,
    pub status: IndexVersionStatus,
    pub doc_count: i64,
    pub file_path: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "running" => JobStatus::Running,
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            _ => JobStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: i64,
    pub job_type: String,
    pub status: JobStatus,
    pub payload: String,
    pub priority: i64,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub retries: i64,
}

impl Job {
    pub fn payload_json(&self) -> crate::core::error::Result<serde_json::Value> {
        Ok(serde_json::from_str(&self.payload)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShardAssignment {
    pub subreddit: String,
    pub shard_id: String,
}
