use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Turns token streams into fixed-width dense vectors for the vector
/// index. Production deployments plug in a real sentence-embedding
/// model here; this crate ships a deterministic hashing embedder so
/// builds and tests don't depend on downloading model weights.
pub trait Encoder: Send + Sync {
    fn dim(&self) -> usize;
    fn encode(&self, texts: &[Vec<String>]) -> Vec<Vec<f32>>;
}

/// Hashes each token into one of `dim` buckets and accumulates a signed
/// count, producing a stable bag-of-words-style embedding without any
/// external model. Two documents with the same token multiset always
/// encode to the same vector.
pub struct HashingEncoder {
    dim: usize,
}

impl HashingEncoder {
    pub fn new(dim: usize) -> Self {
        HashingEncoder { dim }
    }
}

impl Default for HashingEncoder {
    fn default() -> Self {
        HashingEncoder { dim: 384 }
    }
}

impl Encoder for HashingEncoder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn encode(&self, texts: &[Vec<String>]) -> Vec<Vec<f32>> {
        texts
            .iter()
            .map(|tokens| {
                let mut row = vec![0f32; self.dim];
                for token in tokens {
                    let mut hasher = DefaultHasher::new();
                    token.hash(&mut hasher);
                    let h = hasher.finish();
                    let bucket = (h % self.dim as u64) as usize;
                    let sign = if (h >> 63) & 1 == 0 { 1.0 } else { -1.0 };
                    row[bucket] += sign;
                }
                row
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_token_sets_encode_identically() {
        let encoder = HashingEncoder::new(32);
        let a = vec!["cat".to_string(), "sat".to_string()];
        let b = vec!["cat".to_string(), "sat".to_string()];
        let rows = encoder.encode(&[a, b]);
        assert_eq!(rows[0], rows[1]);
    }

    #[test]
    fn different_token_sets_usually_differ() {
        let encoder = HashingEncoder::new(32);
        let rows = encoder.encode(&[vec!["cat".to_string()], vec!["airplane".to_string()]]);
        assert_ne!(rows[0], rows[1]);
    }
}
