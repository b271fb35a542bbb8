use std::collections::HashMap;

use crate::core::types::ScoredDoc;

/// A fused hit carrying both the combined score and the per-source
/// contributions it was built from, for explainability.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedHit {
    pub doc_id: String,
    pub score: f32,
    pub shard_id: String,
    pub bm25_score: f32,
    pub tfidf_score: f32,
    pub vector_score: f32,
}

fn min_max_normalize(hits: &[ScoredDoc]) -> HashMap<&str, f32> {
    if hits.is_empty() {
        return HashMap::new();
    }
    let lo = hits.iter().map(|h| h.score).fold(f32::INFINITY, f32::min);
    let hi = hits.iter().map(|h| h.score).fold(f32::NEG_INFINITY, f32::max);
    let span = hi - lo;
    hits.iter()
        .map(|h| (h.doc_id.as_str(), if span == 0.0 { 1.0 } else { (h.score - lo) / span }))
        .collect()
}

fn shard_map(sources: &[&[ScoredDoc]]) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for hits in sources {
        for h in *hits {
            map.entry(h.doc_id.as_str().to_string()).or_insert_with(|| h.shard_id.clone());
        }
    }
    map
}

/// Weighted linear combination of min-max normalised scores from up to
/// three ranked sources. Missing sources contribute 0 for every
/// document, matching the "unscored = absent from that retriever" rule.
pub fn linear_combination(
    bm25_hits: &[ScoredDoc],
    tfidf_hits: &[ScoredDoc],
    vector_hits: &[ScoredDoc],
    weights: (f32, f32, f32),
    top_k: usize,
) -> Vec<FusedHit> {
    let bm25_norm = min_max_normalize(bm25_hits);
    let tfidf_norm = min_max_normalize(tfidf_hits);
    let vector_norm = min_max_normalize(vector_hits);
    let shards = shard_map(&[bm25_hits, tfidf_hits, vector_hits]);

    let mut ids: Vec<&str> = bm25_norm.keys().chain(tfidf_norm.keys()).chain(vector_norm.keys()).copied().collect();
    ids.sort();
    ids.dedup();

    let (wb, wt, wv) = weights;
    let mut merged: Vec<FusedHit> = ids
        .into_iter()
        .map(|doc_id| {
            let b = *bm25_norm.get(doc_id).unwrap_or(&0.0);
            let t = *tfidf_norm.get(doc_id).unwrap_or(&0.0);
            let v = *vector_norm.get(doc_id).unwrap_or(&0.0);
            FusedHit {
                doc_id: doc_id.to_string(),
                score: b * wb + t * wt + v * wv,
                shard_id: shards.get(doc_id).cloned().unwrap_or_default(),
                bm25_score: b,
                tfidf_score: t,
                vector_score: v,
            }
        })
        .collect();

    merged.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    merged.truncate(top_k);
    merged
}

/// Reciprocal Rank Fusion across any number of already-ranked lists:
/// `score(d) = Σ 1 / (k + rank_i(d))`. Rank-based, so no score
/// normalisation is needed across sources of different scales.
pub fn reciprocal_rank_fusion(ranked_lists: &[&[ScoredDoc]], k: f32, top_k: usize) -> Vec<FusedHit> {
    let mut scores: HashMap<String, f32> = HashMap::new();
    let mut shards: HashMap<String, String> = HashMap::new();

    for ranked in ranked_lists {
        for (i, hit) in ranked.iter().enumerate() {
            let rank = (i + 1) as f32;
            *scores.entry(hit.doc_id.as_str().to_string()).or_insert(0.0) += 1.0 / (k + rank);
            shards.entry(hit.doc_id.as_str().to_string()).or_insert_with(|| hit.shard_id.clone());
        }
    }

    let mut merged: Vec<FusedHit> = scores
        .into_iter()
        .map(|(doc_id, score)| FusedHit {
            shard_id: shards.get(&doc_id).cloned().unwrap_or_default(),
            doc_id,
            score,
            bm25_score: 0.0,
            tfidf_score: 0.0,
            vector_score: 0.0,
        })
        .collect();

    merged.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    merged.truncate(top_k);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::DocId;

    fn hit(id: &str, score: f32, shard: &str) -> ScoredDoc {
        ScoredDoc { doc_id: DocId::new(id), score, shard_id: shard.to_string() }
    }

    #[test]
    fn linear_combination_favors_document_strong_in_weighted_source() {
        let bm25 = vec![hit("a", 10.0, "s1"), hit("b", 1.0, "s1")];
        let vector = vec![hit("b", 0.9, "s1"), hit("a", 0.1, "s1")];
        let fused = linear_combination(&bm25, &[], &vector, (0.7, 0.15, 0.15), 10);
        assert_eq!(fused[0].doc_id, "a");
    }

    #[test]
    fn rrf_rewards_documents_ranked_highly_in_multiple_lists() {
        let list_a = vec![hit("a", 5.0, "s1"), hit("b", 4.0, "s1")];
        let list_b = vec![hit("a", 0.9, "s1"), hit("c", 0.8, "s1")];
        let fused = reciprocal_rank_fusion(&[&list_a, &list_b], 60.0, 10);
        assert_eq!(fused[0].doc_id, "a");
    }

    #[test]
    fn empty_sources_produce_no_hits() {
        let fused = linear_combination(&[], &[], &[], (0.7, 0.15, 0.15), 10);
        assert!(fused.is_empty());
    }
}
