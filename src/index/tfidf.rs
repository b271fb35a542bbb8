use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{Error, Result};

/// Dense TF-IDF index: vocabulary, per-term IDF, and an L2-normalised
/// doc-term matrix so cosine similarity reduces to a dot product.
pub struct TfidfIndex {
    doc_ids: Vec<String>,
    vocabulary: HashMap<String, usize>,
    idf: Vec<f32>,
    matrix: Vec<Vec<f32>>,
}

#[derive(Serialize, Deserialize)]
struct TfidfIndexFile {
    doc_ids: Vec<String>,
    vocabulary: Vec<(String, usize)>,
    idf: Vec<f32>,
    matrix: Vec<Vec<f32>>,
}

impl TfidfIndex {
    pub fn empty() -> Self {
        TfidfIndex {
            doc_ids: Vec::new(),
            vocabulary: HashMap::new(),
            idf: Vec::new(),
            matrix: Vec::new(),
        }
    }

    pub fn doc_count(&self) -> usize {
        self.doc_ids.len()
    }

    /// Build the vocabulary, smoothed IDF vector (`1 + ln((N+1)/(df+1))`),
    /// and an L2-normalised term-frequency matrix from a `{doc_id ->
    /// tokens}` batch.
    pub fn build(documents: &HashMap<String, Vec<String>>) -> Self {
        if documents.is_empty() {
            return TfidfIndex::empty();
        }

        let doc_ids: Vec<String> = documents.keys().cloned().collect();

        let mut vocabulary: HashMap<String, usize> = HashMap::new();
        for tokens in documents.values() {
            for tok in tokens {
                let next = vocabulary.len();
                vocabulary.entry(tok.clone()).or_insert(next);
            }
        }

        let vocab_size = vocabulary.len();
        let n = doc_ids.len();

        let mut doc_freq = vec![0u32; vocab_size];
        let mut raw_tf: Vec<Vec<f32>> = Vec::with_capacity(n);

        for doc_id in &doc_ids {
            let tokens = &documents[doc_id];
            let mut row = vec![0f32; vocab_size];
            for tok in tokens {
                if let Some(&col) = vocabulary.get(tok) {
                    row[col] += 1.0;
                }
            }
            for (col, count) in row.iter().enumerate() {
                if *count > 0.0 {
                    doc_freq[col] += 1;
                }
            }
            raw_tf.push(row);
        }

        let idf: Vec<f32> = doc_freq
            .iter()
            .map(|&df| 1.0 + ((n as f32 + 1.0) / (df as f32 + 1.0)).ln())
            .collect();

        let matrix: Vec<Vec<f32>> = raw_tf
            .into_iter()
            .map(|row| {
                let mut weighted: Vec<f32> = row.iter().zip(&idf).map(|(tf, idf)| tf * idf).collect();
                l2_normalize(&mut weighted);
                weighted
            })
            .collect();

        TfidfIndex { doc_ids, vocabulary, idf, matrix }
    }

    /// Cosine similarity of the query against every document's vector;
    /// since both are L2-normalised this is a dot product. Hits with
    /// similarity <= 0 are dropped.
    pub fn score(&self, query_tokens: &[String], top_k: usize) -> Vec<(String, f32)> {
        if query_tokens.is_empty() || self.doc_ids.is_empty() {
            return Vec::new();
        }

        let mut query_row = vec![0f32; self.vocabulary.len()];
        for tok in query_tokens {
            if let Some(&col) = self.vocabulary.get(tok) {
                query_row[col] += 1.0;
            }
        }
        for (v, idf) in query_row.iter_mut().zip(&self.idf) {
            *v *= idf;
        }
        l2_normalize(&mut query_row);

        let mut scored: Vec<(String, f32)> = self
            .doc_ids
            .iter()
            .zip(&self.matrix)
            .map(|(doc_id, row)| (doc_id.clone(), dot(&query_row, row)))
            .filter(|(_, sim)| *sim > 0.0)
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        scored
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = TfidfIndexFile {
            doc_ids: self.doc_ids.clone(),
            vocabulary: self.vocabulary.iter().map(|(t, c)| (t.clone(), *c)).collect(),
            idf: self.idf.clone(),
            matrix: self.matrix.clone(),
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
            .map_err(|e| Error::IndexCorrupt(format!("truncated tfidf index header: {e}")))?;
        let len = u32::from_le_bytes(len_buf) as usize;
        let mut buf = vec![0u8; len];
        f.read_exact(&mut buf)
            .map_err(|e| Error::IndexCorrupt(format!("truncated tfidf index body: {e}")))?;
        let file: TfidfIndexFile =
            bincode::deserialize(&buf).map_err(|e| Error::IndexCorrupt(format!("malformed tfidf index: {e}")))?;

        if file.matrix.len() != file.doc_ids.len() {
            return Err(Error::IndexCorrupt("tfidf matrix row count does not match doc_ids".to_string()));
        }

        Ok(TfidfIndex {
            doc_ids: file.doc_ids,
            vocabulary: file.vocabulary.into_iter().collect(),
            idf: file.idf,
            matrix: file.matrix,
        })
    }
}

fn l2_normalize(row: &mut [f32]) {
    let norm = row.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in row.iter_mut() {
            *v /= norm;
        }
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> HashMap<String, Vec<String>> {
        let mut docs = HashMap::new();
        docs.insert("a".to_string(), vec!["cat".into(), "sat".into()]);
        docs.insert("b".to_string(), vec!["dog".into(), "run".into()]);
        docs
    }

    #[test]
    fn build_on_empty_input_is_empty() {
        let idx = TfidfIndex::build(&HashMap::new());
        assert_eq!(idx.doc_count(), 0);
        assert!(idx.score(&["cat".to_string()], 5).is_empty());
    }

    #[test]
    fn exact_term_match_scores_above_zero() {
        let idx = TfidfIndex::build(&sample());
        let results = idx.score(&["cat".to_string()], 5);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, "a");
        assert!(results[0].1 > 0.0);
    }

    #[test]
    fn round_trips_through_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("v1").join("index.bin");
        let idx = TfidfIndex::build(&sample());
        idx.save(&path).unwrap();
        let loaded = TfidfIndex::load(&path).unwrap();
        assert_eq!(loaded.doc_count(), idx.doc_count());
    }
}
