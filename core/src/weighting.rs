//! TF-IDF weights and document vector lengths over a sealed index.
//!
//! Pass one computes IDF per term, pass two transposes the term-major store
//! into per-document weight vectors and takes their Euclidean norms. Both
//! passes run in parallel; sums are always taken in term order so the
//! output is bit-for-bit reproducible.

use crate::aggregator::SealedIndex;
use crate::error::{IndexError, Result};
use crate::DocId;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `log2(N / df)`.
pub fn idf(num_docs: usize, document_frequency: u32) -> f64 {
    (num_docs as f64 / document_frequency as f64).log2()
}

/// Raw frequency normalized by the document's most frequent term.
pub fn tf(raw_frequency: u32, max_frequency: u32) -> f64 {
    raw_frequency as f64 / max_frequency as f64
}

/// Weights of one document, keyed by term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentVector {
    pub length: f64,
    /// (term, weight) pairs in lexicographic term order.
    pub weights: Vec<(String, f64)>,
}

impl DocumentVector {
    pub fn from_weights(weights: Vec<(String, f64)>) -> Self {
        let length = weights.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        Self { length, weights }
    }

    pub fn weight(&self, term: &str) -> Option<f64> {
        self.weights
            .binary_search_by(|(t, _)| t.as_str().cmp(term))
            .ok()
            .map(|i| self.weights[i].1)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightedIndex {
    pub num_docs: usize,
    pub documents: BTreeMap<DocId, DocumentVector>,
}

impl WeightedIndex {
    pub fn get(&self, doc_id: DocId) -> Option<&DocumentVector> {
        self.documents.get(&doc_id)
    }

    pub fn lengths(&self) -> BTreeMap<DocId, f64> {
        self.documents.iter().map(|(d, v)| (*d, v.length)).collect()
    }
}

impl SealedIndex {
    pub fn idf(&self, term: &str) -> Option<f64> {
        self.store().get(term).map(|list| idf(self.num_docs(), list.document_frequency()))
    }

    /// Pass one: IDF of every term.
    pub fn idfs(&self) -> BTreeMap<&str, f64> {
        let n = self.num_docs();
        self.store()
            .iter()
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(|(term, list)| (term, idf(n, list.document_frequency())))
            .collect()
    }

    /// Pass two: per-document weight vectors and lengths.
    pub fn weigh(&self) -> Result<WeightedIndex> {
        let idfs = self.idfs();
        let store = self.store();

        let per_term: Vec<(&str, Vec<(DocId, f64)>)> = store
            .iter()
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(|(term, list)| -> Result<(&str, Vec<(DocId, f64)>)> {
                let term_idf = idfs.get(term).copied().unwrap_or(0.0);
                let weights = list
                    .iter()
                    .map(|(doc_id, freq)| {
                        let max = store.max_frequency(doc_id).unwrap_or(freq);
                        let w = tf(freq, max) * term_idf;
                        if w.is_finite() {
                            Ok((doc_id, w))
                        } else {
                            Err(IndexError::NonFiniteWeight { doc_id, term: term.to_string() })
                        }
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok((term, weights))
            })
            .collect::<Result<Vec<_>>>()?;

        // Transpose in term order so every document's pairs come out sorted.
        let mut by_doc: BTreeMap<DocId, Vec<(String, f64)>> = BTreeMap::new();
        for (term, weights) in per_term {
            for (doc_id, w) in weights {
                by_doc.entry(doc_id).or_default().push((term.to_string(), w));
            }
        }

        let documents: BTreeMap<DocId, DocumentVector> = by_doc
            .into_par_iter()
            .map(|(doc_id, weights)| (doc_id, DocumentVector::from_weights(weights)))
            .collect();
        if let Some((doc_id, v)) = documents.iter().find(|(_, v)| !v.length.is_finite()) {
            let term = v.weights.first().map(|(t, _)| t.clone()).unwrap_or_default();
            return Err(IndexError::NonFiniteWeight { doc_id: *doc_id, term });
        }

        let zero = documents.values().filter(|v| v.length == 0.0).count();
        tracing::info!(num_docs = documents.len(), zero_length = zero, "weights computed");
        Ok(WeightedIndex { num_docs: self.num_docs(), documents })
    }
}
