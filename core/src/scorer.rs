//! Cosine-similarity ranking against a persisted index.
//!
//! The scorer never touches documents outside the posting lists of the query
//! terms: a document sharing no term with the query has a zero dot product
//! and is simply absent from the accumulator.

use crate::aggregator::SealedIndex;
use crate::config::{ScoringOptions, TIMEOUT_CHECK_INTERVAL};
use crate::error::{IndexError, Result};
use crate::index::PostingStore;
use crate::normalizer::Normalizer;
use crate::weighting::{idf, tf, DocumentVector, WeightedIndex};
use crate::DocId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Instant;

/// Query-time view: raw postings (with max frequencies) plus document lengths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchIndex {
    store: PostingStore,
    lengths: BTreeMap<DocId, f64>,
    num_docs: usize,
}

impl SearchIndex {
    /// N is the number of documents with a persisted length.
    pub fn from_parts(store: PostingStore, lengths: BTreeMap<DocId, f64>) -> Self {
        let num_docs = lengths.len();
        Self { store, lengths, num_docs }
    }

    pub fn from_weighted(sealed: &SealedIndex, weighted: &WeightedIndex) -> Self {
        Self {
            store: sealed.store().clone(),
            lengths: weighted.lengths(),
            num_docs: sealed.num_docs(),
        }
    }

    pub fn num_docs(&self) -> usize {
        self.num_docs
    }

    pub fn num_terms(&self) -> usize {
        self.store.num_terms()
    }

    pub fn store(&self) -> &PostingStore {
        &self.store
    }

    pub fn document_length(&self, doc_id: DocId) -> Option<f64> {
        self.lengths.get(&doc_id).copied()
    }

    /// `None` for terms outside the vocabulary.
    pub fn idf(&self, term: &str) -> Option<f64> {
        self.store.get(term).map(|list| idf(self.num_docs, list.document_frequency()))
    }

    /// Rebuild one document's weight vector from the postings. Scans the
    /// whole vocabulary, so meant for inspection rather than scoring.
    pub fn document_vector(&self, doc_id: DocId) -> Option<DocumentVector> {
        let length = self.document_length(doc_id)?;
        let max = self.store.max_frequency(doc_id)?;
        let weights = self
            .store
            .iter()
            .filter_map(|(term, list)| {
                let freq = list.frequency(doc_id)?;
                Some((term.to_string(), tf(freq, max) * idf(self.num_docs, list.document_frequency())))
            })
            .collect();
        Some(DocumentVector { length, weights })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredDoc {
    pub doc_id: DocId,
    pub score: f64,
}

impl fmt::Display for ScoredDoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} : {}", self.doc_id, self.score)
    }
}

/// Descending score, then ascending doc id.
fn rank_order(a: &ScoredDoc, b: &ScoredDoc) -> Ordering {
    b.score.total_cmp(&a.score).then_with(|| a.doc_id.cmp(&b.doc_id))
}

/// The `k` best hits in rank order.
pub fn top_k(mut hits: Vec<ScoredDoc>, k: usize) -> Vec<ScoredDoc> {
    if k == 0 {
        return Vec::new();
    }
    if hits.len() > k {
        hits.select_nth_unstable_by(k - 1, rank_order);
        hits.truncate(k);
    }
    hits.sort_unstable_by(rank_order);
    hits
}

/// Weighted query terms. Terms missing from the vocabulary are already dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryVector {
    pub weights: BTreeMap<String, f64>,
    /// Sum of squared weights.
    pub length_sq: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Ranking {
    pub hits: Vec<ScoredDoc>,
    /// Candidates with a positive score before the top-k cut.
    pub total_hits: usize,
}

pub struct QueryScorer<'a> {
    index: &'a SearchIndex,
    normalizer: &'a Normalizer,
}

impl<'a> QueryScorer<'a> {
    pub fn new(index: &'a SearchIndex, normalizer: &'a Normalizer) -> Self {
        Self { index, normalizer }
    }

    pub fn query_vector(&self, query: &str) -> QueryVector {
        let mut counts: BTreeMap<String, u32> = BTreeMap::new();
        for term in self.normalizer.terms(query) {
            *counts.entry(term).or_insert(0) += 1;
        }
        let Some(max) = counts.values().copied().max() else {
            return QueryVector::default();
        };

        let mut vector = QueryVector::default();
        for (term, count) in counts {
            let Some(term_idf) = self.index.idf(&term) else {
                continue;
            };
            let w = tf(count, max) * term_idf;
            vector.length_sq += w * w;
            vector.weights.insert(term, w);
        }
        vector
    }

    pub fn search(&self, query: &str, options: &ScoringOptions) -> Result<Ranking> {
        let vector = self.query_vector(query);
        if vector.length_sq == 0.0 {
            tracing::debug!(query, "no query term carries weight");
            return Ok(Ranking::default());
        }

        let started = Instant::now();
        let mut touched = 0usize;
        let mut dots: HashMap<DocId, f64> = HashMap::new();
        let store = self.index.store();
        for (term, q_weight) in &vector.weights {
            let (Some(list), Some(term_idf)) = (store.get(term), self.index.idf(term)) else {
                continue;
            };
            for (doc_id, freq) in list.iter() {
                let max = store.max_frequency(doc_id).unwrap_or(freq);
                *dots.entry(doc_id).or_insert(0.0) += q_weight * tf(freq, max) * term_idf;
                touched += 1;
                if touched % TIMEOUT_CHECK_INTERVAL == 0 {
                    if let Some(limit) = options.timeout {
                        if started.elapsed() > limit {
                            return Err(IndexError::QueryTimeout { touched });
                        }
                    }
                }
            }
        }

        let query_length = vector.length_sq.sqrt();
        let hits: Vec<ScoredDoc> = dots
            .into_iter()
            .filter_map(|(doc_id, dot)| {
                let length = self.index.document_length(doc_id)?;
                if length <= 0.0 || dot <= 0.0 {
                    return None;
                }
                let score = dot / (query_length * length);
                score.is_finite().then_some(ScoredDoc { doc_id, score })
            })
            .collect();

        let total_hits = hits.len();
        let hits = top_k(hits, options.top_k);
        tracing::debug!(query, touched, total_hits, returned = hits.len(), "query scored");
        Ok(Ranking { hits, total_hits })
    }
}
