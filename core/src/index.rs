//! Term-major posting store built during the map stage.
//!
//! A store owns, per term, the raw frequency of that term in every document
//! it occurs in, plus the per-document maximum raw frequency. Stores built
//! from disjoint document sets are combined with [`PostingStore::merge`].

use crate::error::{IndexError, Result};
use serde::{Deserialize, Serialize};
use std::collections::btree_map::{self, BTreeMap};

pub type DocId = u32;

/// doc_id -> highest raw frequency of any term in that document.
pub type MaxFrequencyTable = BTreeMap<DocId, u32>;

/// Documents containing one term, with the raw occurrence count in each.
///
/// The document frequency is the number of entries, so it cannot drift from
/// the frequency map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingList {
    frequencies: BTreeMap<DocId, u32>,
}

impl PostingList {
    pub fn document_frequency(&self) -> u32 {
        self.frequencies.len() as u32
    }

    pub fn frequency(&self, doc_id: DocId) -> Option<u32> {
        self.frequencies.get(&doc_id).copied()
    }

    /// (doc_id, raw frequency) pairs in ascending doc_id order.
    pub fn iter(&self) -> impl Iterator<Item = (DocId, u32)> + '_ {
        self.frequencies.iter().map(|(d, f)| (*d, *f))
    }

    fn increment(&mut self, doc_id: DocId) -> u32 {
        let count = self.frequencies.entry(doc_id).or_insert(0);
        *count += 1;
        *count
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingStore {
    postings: BTreeMap<String, PostingList>,
    max_frequencies: MaxFrequencyTable,
}

impl PostingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one occurrence of `term` in `doc_id`. Returns the updated raw frequency.
    pub fn post(&mut self, term: &str, doc_id: DocId) -> u32 {
        let count = match self.postings.get_mut(term) {
            Some(list) => list.increment(doc_id),
            None => self.postings.entry(term.to_owned()).or_default().increment(doc_id),
        };
        let max = self.max_frequencies.entry(doc_id).or_insert(0);
        if *max < count {
            *max = count;
        }
        count
    }

    /// Combine two stores built from disjoint document sets.
    ///
    /// Posting lists are unioned per term; frequencies are never added across
    /// stores. The result does not depend on argument order or on how the
    /// corpus was split, which is what lets shards be folded in any order.
    pub fn merge(mut self, mut other: PostingStore) -> Result<PostingStore> {
        if self.max_frequencies.len() < other.max_frequencies.len() {
            std::mem::swap(&mut self, &mut other);
        }
        self.merge_max_frequencies(std::mem::take(&mut other.max_frequencies))?;
        for (term, list) in other.postings {
            match self.postings.entry(term) {
                btree_map::Entry::Vacant(slot) => {
                    slot.insert(list);
                }
                btree_map::Entry::Occupied(mut slot) => {
                    slot.get_mut().frequencies.extend(list.frequencies);
                }
            }
        }
        Ok(self)
    }

    /// Disjoint union of max-frequency tables. Fails without modifying `self`
    /// if any document appears in both.
    pub fn merge_max_frequencies(&mut self, other: MaxFrequencyTable) -> Result<()> {
        if let Some(doc_id) = other.keys().find(|d| self.max_frequencies.contains_key(d)) {
            return Err(IndexError::OverlappingShards { doc_id: *doc_id });
        }
        self.max_frequencies.extend(other);
        Ok(())
    }

    /// Restore one persisted (term, doc) entry. Used when reading posting files back.
    pub(crate) fn insert_posting(&mut self, term: &str, doc_id: DocId, frequency: u32, max_frequency: u32) {
        self.postings
            .entry(term.to_owned())
            .or_default()
            .frequencies
            .insert(doc_id, frequency);
        let max = self.max_frequencies.entry(doc_id).or_insert(0);
        *max = (*max).max(max_frequency);
    }

    pub fn get(&self, term: &str) -> Option<&PostingList> {
        self.postings.get(term)
    }

    /// Terms in lexicographic order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PostingList)> + '_ {
        self.postings.iter().map(|(t, l)| (t.as_str(), l))
    }

    pub fn max_frequency(&self, doc_id: DocId) -> Option<u32> {
        self.max_frequencies.get(&doc_id).copied()
    }

    pub fn max_frequencies(&self) -> &MaxFrequencyTable {
        &self.max_frequencies
    }

    pub fn num_terms(&self) -> usize {
        self.postings.len()
    }

    /// Distinct documents that received at least one posting.
    pub fn num_docs(&self) -> usize {
        self.max_frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_of(docs: &[(DocId, &[&str])]) -> PostingStore {
        let mut store = PostingStore::new();
        for (doc_id, terms) in docs {
            for term in terms.iter() {
                store.post(term, *doc_id);
            }
        }
        store
    }

    #[test]
    fn post_counts_occurrences_and_documents() {
        let store = store_of(&[(1, &["cat", "cat", "sat"]), (2, &["cat"])]);
        let cat = store.get("cat").unwrap();
        assert_eq!(cat.document_frequency(), 2);
        assert_eq!(cat.frequency(1), Some(2));
        assert_eq!(cat.frequency(2), Some(1));
        assert_eq!(store.get("sat").unwrap().document_frequency(), 1);
        assert_eq!(store.num_docs(), 2);
    }

    #[test]
    fn post_tracks_max_frequency_per_document() {
        let store = store_of(&[(7, &["aaa", "bbb", "bbb", "ccc", "bbb", "aaa"])]);
        assert_eq!(store.max_frequency(7), Some(3));
        for (_, list) in store.iter() {
            for (doc, freq) in list.iter() {
                assert!(freq <= store.max_frequency(doc).unwrap());
            }
        }
    }

    #[test]
    fn document_frequency_matches_entries_after_many_posts() {
        let mut store = PostingStore::new();
        for i in 0..200u32 {
            let term = format!("term{}", i % 7);
            store.post(&term, i % 13);
        }
        for (_, list) in store.iter() {
            assert_eq!(list.document_frequency() as usize, list.iter().count());
        }
    }

    #[test]
    fn merge_is_order_independent() {
        let a = store_of(&[(1, &["cat", "sat"]), (4, &["cat"])]);
        let b = store_of(&[(2, &["cat", "ate", "ate"])]);
        let c = store_of(&[(3, &["dog", "bark"])]);
        let whole = store_of(&[
            (1, &["cat", "sat"]),
            (4, &["cat"]),
            (2, &["cat", "ate", "ate"]),
            (3, &["dog", "bark"]),
        ]);

        let abc = a.clone().merge(b.clone()).unwrap().merge(c.clone()).unwrap();
        let cba = c.clone().merge(b.clone().merge(a.clone()).unwrap()).unwrap();
        let bca = b.merge(c).unwrap().merge(a).unwrap();
        assert_eq!(abc, whole);
        assert_eq!(cba, whole);
        assert_eq!(bca, whole);
        assert_eq!(whole.get("cat").unwrap().document_frequency(), 3);
    }

    #[test]
    fn merge_with_empty_is_identity() {
        let a = store_of(&[(1, &["cat", "sat"])]);
        assert_eq!(a.clone().merge(PostingStore::new()).unwrap(), a);
        assert_eq!(PostingStore::new().merge(a.clone()).unwrap(), a);
    }

    #[test]
    fn merge_rejects_shared_documents() {
        let a = store_of(&[(1, &["cat"])]);
        let b = store_of(&[(1, &["dog"])]);
        match a.merge(b) {
            Err(IndexError::OverlappingShards { doc_id }) => assert_eq!(doc_id, 1),
            other => panic!("expected overlap error, got {other:?}"),
        }
    }
}
