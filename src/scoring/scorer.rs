/// Term-level statistics a scorer needs: how many times the term occurs
/// in the document (`tf`), and how many documents in the collection
/// contain it (`doc_freq`).
#[derive(Debug, Clone, Copy)]
pub struct TermStats {
    pub tf: u32,
    pub doc_freq: u32,
}

/// Collection-wide statistics a scorer needs.
#[derive(Debug, Clone, Copy)]
pub struct DocStats {
    pub doc_length: usize,
    pub avg_doc_length: f32,
    pub total_docs: usize,
}

pub trait Scorer: Send + Sync {
    fn idf(&self, term: &TermStats, stats: &DocStats) -> f32;
    fn score(&self, term: &TermStats, stats: &DocStats) -> f32;
    fn name(&self) -> &str;
}

/// TF-IDF scorer using the smoothed sklearn-style IDF:
/// `1 + ln((N+1) / (df+1))`, with raw (unnormalized) term frequency — the
/// index itself L2-normalizes the resulting row vector.
pub struct TfIdfScorer;

impl Scorer for TfIdfScorer {
    fn idf(&self, term: &TermStats, stats: &DocStats) -> f32 {
        1.0 + ((stats.total_docs as f32 + 1.0) / (term.doc_freq as f32 + 1.0)).ln()
    }

    fn score(&self, term: &TermStats, stats: &DocStats) -> f32 {
        term.tf as f32 * self.idf(term, stats)
    }

    fn name(&self) -> &str {
        "tfidf"
    }
}

/// Okapi BM25 scorer: `k1` controls term-frequency saturation, `b`
/// controls document-length normalization strength.
pub struct BM25Scorer {
    pub k1: f32,
    pub b: f32,
}

impl Default for BM25Scorer {
    fn default() -> Self {
        BM25Scorer { k1: 1.2, b: 0.75 }
    }
}

impl Scorer for BM25Scorer {
    fn idf(&self, term: &TermStats, stats: &DocStats) -> f32 {
        let n = stats.total_docs as f32;
        let df = term.doc_freq as f32;
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }

    fn score(&self, term: &TermStats, stats: &DocStats) -> f32 {
        let tf = term.tf as f32;
        let norm = if stats.avg_doc_length > 0.0 {
            (1.0 - self.b) + self.b * (stats.doc_length as f32 / stats.avg_doc_length)
        } else {
            1.0
        };
        self.idf(term, stats) * tf * (self.k1 + 1.0) / (tf + self.k1 * norm)
    }

    fn name(&self) -> &str {
        "bm25"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bm25_idf_is_non_negative_for_common_terms() {
        let scorer = BM25Scorer::default();
        let stats = DocStats { doc_length: 10, avg_doc_length: 10.0, total_docs: 100 };
        let term = TermStats { tf: 3, doc_freq: 50 };
        assert!(scorer.idf(&term, &stats) >= 0.0);
    }

    #[test]
    fn tfidf_idf_is_positive() {
        let scorer = TfIdfScorer;
        let stats = DocStats { doc_length: 10, avg_doc_length: 10.0, total_docs: 100 };
        let term = TermStats { tf: 1, doc_freq: 10 };
        assert!(scorer.idf(&term, &stats) > 0.0);
    }
}
