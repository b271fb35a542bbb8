use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{Error, Result};

/// Flat inner-product nearest-neighbour index over L2-normalised float32
/// embeddings. Normalising rows turns cosine similarity into a dot
/// product, so search is a single linear scan over `vectors`.
#[derive(Debug)]
pub struct VectorIndex {
    dim: usize,
    doc_ids: Vec<String>,
    vectors: Vec<Vec<f32>>,
}

#[derive(Serialize, Deserialize)]
struct VectorIndexFile {
    dim: usize,
    doc_ids: Vec<String>,
    vectors: Vec<Vec<f32>>,
}

impl VectorIndex {
    pub fn empty(dim: usize) -> Self {
        VectorIndex { dim, doc_ids: Vec::new(), vectors: Vec::new() }
    }

    pub fn doc_count(&self) -> usize {
        self.doc_ids.len()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Build the index from pre-computed embeddings. Rows are L2-normalised
    /// in place before storage so `score` reduces to a dot product.
    ///
    /// `doc_ids.len()` must equal `embeddings.len()`; a mismatch is a
    /// caller bug, not a data condition, and returns `IndexCorrupt`.
    pub fn build(doc_ids: Vec<String>, mut embeddings: Vec<Vec<f32>>) -> Result<Self> {
        if doc_ids.len() != embeddings.len() {
            return Err(Error::IndexCorrupt(format!(
                "vector build: {} doc_ids but {} embeddings",
                doc_ids.len(),
                embeddings.len()
            )));
        }
        if doc_ids.is_empty() {
            return Ok(VectorIndex::empty(0));
        }

        let dim = embeddings[0].len();
        for row in embeddings.iter() {
            if row.len() != dim {
                return Err(Error::IndexCorrupt("vector build: ragged embedding rows".to_string()));
            }
        }

        for row in embeddings.iter_mut() {
            l2_normalize(row);
        }

        Ok(VectorIndex { dim, doc_ids, vectors: embeddings })
    }

    /// Find the `top_k` closest documents to `query_embedding` by inner
    /// product over normalised vectors, descending.
    pub fn search(&self, query_embedding: &[f32], top_k: usize) -> Vec<(String, f32)> {
        if self.doc_ids.is_empty() || query_embedding.is_empty() {
            return Vec::new();
        }

        let mut query = query_embedding.to_vec();
        l2_normalize(&mut query);

        let mut scored: Vec<(String, f32)> = self
            .doc_ids
            .iter()
            .zip(&self.vectors)
            .map(|(doc_id, row)| (doc_id.clone(), dot(&query, row)))
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k.min(self.doc_ids.len()));
        scored
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = VectorIndexFile { dim: self.dim, doc_ids: self.doc_ids.clone(), vectors: self.vectors.clone() };
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
            .map_err(|e| Error::IndexCorrupt(format!("truncated vector index header: {e}")))?;
        let len = u32::from_le_bytes(len_buf) as usize;
        let mut buf = vec![0u8; len];
        f.read_exact(&mut buf)
            .map_err(|e| Error::IndexCorrupt(format!("truncated vector index body: {e}")))?;
        let file: VectorIndexFile =
            bincode::deserialize(&buf).map_err(|e| Error::IndexCorrupt(format!("malformed vector index: {e}")))?;

        if file.vectors.len() != file.doc_ids.len() {
            return Err(Error::IndexCorrupt("vector index row count does not match doc_ids".to_string()));
        }
        for row in &file.vectors {
            if row.len() != file.dim {
                return Err(Error::IndexCorrupt("vector index row width does not match declared dim".to_string()));
            }
        }

        Ok(VectorIndex { dim: file.dim, doc_ids: file.doc_ids, vectors: file.vectors })
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

    fn sample() -> VectorIndex {
        let doc_ids = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let vectors = vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.7, 0.7]];
        VectorIndex::build(doc_ids, vectors).unwrap()
    }

    #[test]
    fn build_rejects_mismatched_lengths() {
        let err = VectorIndex::build(vec!["a".to_string()], vec![]).unwrap_err();
        assert!(matches!(err, Error::IndexCorrupt(_)));
    }

    #[test]
    fn search_ranks_closest_direction_first() {
        let idx = sample();
        let results = idx.search(&[1.0, 0.0], 2);
        assert_eq!(results[0].0, "a");
        assert!(results[0].1 > results[1].1);
    }

    #[test]
    fn round_trips_through_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("v1").join("index.bin");
        let idx = sample();
        idx.save(&path).unwrap();
        let loaded = VectorIndex::load(&path).unwrap();
        assert_eq!(loaded.doc_count(), idx.doc_count());
        assert_eq!(loaded.dim(), idx.dim());
    }
}
