use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{Error, Result};
use crate::scoring::scorer::{BM25Scorer, DocStats, Scorer, TermStats};

/// In-memory postings, built from a batch of `{doc_id -> tokens}` and
/// scored with Okapi BM25. The on-disk representation is a bincode record
/// with a 4-byte little-endian length prefix, matching the length-prefixed
/// record convention used elsewhere in the storage layer.
pub struct Bm25Index {
    pub k1: f32,
    pub b: f32,
    postings: HashMap<String, HashMap<String, u32>>,
    doc_lengths: HashMap<String, usize>,
    doc_count: usize,
    avg_doc_len: f32,
}

#[derive(Serialize, Deserialize)]
struct Bm25IndexFile {
    k1: f32,
    b: f32,
    postings: Vec<(String, Vec<(String, u32)>)>,
    doc_lengths: Vec<(String, usize)>,
    doc_count: usize,
    avg_doc_len: f32,
}

impl Bm25Index {
    pub fn new(k1: f32, b: f32) -> Self {
        Bm25Index {
            k1,
            b,
            postings: HashMap::new(),
            doc_lengths: HashMap::new(),
            doc_count: 0,
            avg_doc_len: 0.0,
        }
    }

    pub fn doc_count(&self) -> usize {
        self.doc_count
    }

    /// Build postings and corpus stats from a `{doc_id -> tokens}` batch.
    /// Tokens are assumed already canonicalised by the preprocessor.
    pub fn build(&mut self, documents: &HashMap<String, Vec<String>>) {
        self.postings.clear();
        self.doc_lengths.clear();

        let mut total_len = 0usize;
        for (doc_id, tokens) in documents {
            self.doc_lengths.insert(doc_id.clone(), tokens.len());
            total_len += tokens.len();

            let mut term_freq: HashMap<&str, u32> = HashMap::new();
            for token in tokens {
                *term_freq.entry(token.as_str()).or_insert(0) += 1;
            }

            for (term, tf) in term_freq {
                self.postings
                    .entry(term.to_string())
                    .or_default()
                    .insert(doc_id.clone(), tf);
            }
        }

        self.doc_count = self.doc_lengths.len();
        self.avg_doc_len = if self.doc_count > 0 {
            total_len as f32 / self.doc_count as f32
        } else {
            0.0
        };
    }

    /// Score `query_tokens` against every posting they touch and return the
    /// top `top_k` documents by descending score.
    pub fn score(&self, query_tokens: &[String], top_k: usize) -> Vec<(String, f32)> {
        if query_tokens.is_empty() || self.doc_count == 0 {
            return Vec::new();
        }

        let scorer = BM25Scorer { k1: self.k1, b: self.b };
        let stats = DocStats {
            doc_length: 0,
            avg_doc_length: self.avg_doc_len,
            total_docs: self.doc_count,
        };

        let mut scores: HashMap<&str, f32> = HashMap::new();
        for term in query_tokens {
            let Some(posting) = self.postings.get(term) else {
                continue;
            };
            let doc_freq = posting.len() as u32;

            for (doc_id, &tf) in posting {
                let doc_len = *self.doc_lengths.get(doc_id).unwrap_or(&0);
                let per_doc_stats = DocStats { doc_length: doc_len, ..stats };
                let contrib = scorer.score(&TermStats { tf, doc_freq }, &per_doc_stats);
                *scores.entry(doc_id.as_str()).or_insert(0.0) += contrib;
            }
        }

        let mut ranked: Vec<(String, f32)> = scores.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(top_k);
        ranked
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = Bm25IndexFile {
            k1: self.k1,
            b: self.b,
            postings: self
                .postings
                .iter()
                .map(|(term, docs)| (term.clone(), docs.iter().map(|(d, tf)| (d.clone(), *tf)).collect()))
                .collect(),
            doc_lengths: self.doc_lengths.iter().map(|(d, l)| (d.clone(), *l)).collect(),
            doc_count: self.doc_count,
            avg_doc_len: self.avg_doc_len,
        };

        let bytes = bincode::serialize(&file)?;
        let mut out = std::fs::File::create(path)?;
        out.write_all(&(bytes.len() as u32).to_le_bytes())?;
        out.write_all(&bytes)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let mut f = std::fs::File::open(path)?;
        let mut len_buf = [0u8; 4];
        f.read_exact(&mut len_buf)
            .map_err(|e| Error::IndexCorrupt(format!("truncated bm25 index header: {e}")))?;
        let len = u32::from_le_bytes(len_buf) as usize;

        let mut buf = vec![0u8; len];
        f.read_exact(&mut buf)
            .map_err(|e| Error::IndexCorrupt(format!("truncated bm25 index body: {e}")))?;

        let file: Bm25IndexFile = bincode::deserialize(&buf)
            .map_err(|e| Error::IndexCorrupt(format!("malformed bm25 index: {e}")))?;

        Ok(Bm25Index {
            k1: file.k1,
            b: file.b,
            postings: file
                .postings
                .into_iter()
                .map(|(term, docs)| (term, docs.into_iter().collect()))
                .collect(),
            doc_lengths: file.doc_lengths.into_iter().collect(),
            doc_count: file.doc_count,
            avg_doc_len: file.avg_doc_len,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> HashMap<String, Vec<String>> {
        let mut docs = HashMap::new();
        docs.insert("a".to_string(), vec!["cat".into(), "sat".into(), "mat".into()]);
        docs.insert("b".to_string(), vec!["cat".into(), "dog".into()]);
        docs.insert("c".to_string(), vec!["dog".into(), "dog".into(), "run".into()]);
        docs
    }

    #[test]
    fn build_computes_doc_count_and_avg_len() {
        let mut idx = Bm25Index::new(1.2, 0.75);
        idx.build(&sample());
        assert_eq!(idx.doc_count(), 3);
        assert!((idx.avg_doc_len - (3.0 + 2.0 + 3.0) / 3.0).abs() < 1e-6);
    }

    #[test]
    fn score_ranks_exact_match_highest() {
        let mut idx = Bm25Index::new(1.2, 0.75);
        idx.build(&sample());
        let ranked = idx.score(&["cat".to_string()], 10);
        assert_eq!(ranked.len(), 2);
        assert!(ranked.iter().all(|(_, s)| *s > 0.0));
    }

    #[test]
    fn round_trips_through_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("v1").join("index.bin");

        let mut idx = Bm25Index::new(1.2, 0.75);
        idx.build(&sample());
        idx.save(&path).unwrap();

        let loaded = Bm25Index::load(&path).unwrap();
        assert_eq!(loaded.doc_count(), idx.doc_count());
        assert_eq!(loaded.score(&["dog".to_string()], 10), idx.score(&["dog".to_string()], 10));
    }

    #[test]
    fn empty_query_returns_no_hits() {
        let mut idx = Bm25Index::new(1.2, 0.75);
        idx.build(&sample());
        assert!(idx.score(&[], 10).is_empty());
    }
}
