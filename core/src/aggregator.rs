//! Reduce stage: shards report their posting stores, `seal` folds them into
//! one global store once every shard is in.
//!
//! Corpus size and document frequencies are whole-corpus statistics, so
//! [`SealedIndex`] is only obtainable through [`CorpusAggregator::seal`].

use crate::error::{IndexError, Result};
use crate::index::PostingStore;
use parking_lot::Mutex;
use rayon::prelude::*;

/// Output of the map stage for one shard.
#[derive(Debug, Clone, Default)]
pub struct ShardIndex {
    pub shard: usize,
    pub store: PostingStore,
    pub records: usize,
}

pub struct CorpusAggregator {
    slots: Mutex<Vec<Option<ShardIndex>>>,
}

impl CorpusAggregator {
    pub fn new(expected_shards: usize) -> Self {
        Self { slots: Mutex::new((0..expected_shards).map(|_| None).collect()) }
    }

    pub fn expected(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn reported(&self) -> usize {
        self.slots.lock().iter().filter(|s| s.is_some()).count()
    }

    /// Accept a shard's output. Callable from any thread.
    pub fn report(&self, shard: ShardIndex) -> Result<()> {
        let mut slots = self.slots.lock();
        let expected = slots.len();
        match slots.get_mut(shard.shard) {
            Some(slot @ None) => {
                tracing::debug!(
                    shard = shard.shard,
                    records = shard.records,
                    terms = shard.store.num_terms(),
                    "shard reported"
                );
                *slot = Some(shard);
                Ok(())
            }
            Some(Some(_)) => Err(IndexError::DuplicateShard { shard: shard.shard }),
            None => Err(IndexError::UnknownShard { shard: shard.shard, expected }),
        }
    }

    /// Barrier: fold every shard into the global store and fix N.
    pub fn seal(self) -> Result<SealedIndex> {
        let slots = self.slots.into_inner();
        let expected = slots.len();
        let shards: Vec<ShardIndex> = slots.into_iter().flatten().collect();
        if shards.len() != expected {
            return Err(IndexError::IncompleteCorpus { expected, reported: shards.len() });
        }
        let records: usize = shards.iter().map(|s| s.records).sum();
        let store = shards
            .into_par_iter()
            .map(|s| Ok::<_, IndexError>(s.store))
            .try_reduce(PostingStore::new, PostingStore::merge)?;
        let sealed = SealedIndex::new(store);
        tracing::info!(
            shards = expected,
            records,
            num_docs = sealed.num_docs(),
            num_terms = sealed.store().num_terms(),
            "corpus sealed"
        );
        Ok(sealed)
    }
}

/// Global posting store with a final corpus size. Read-only from here on.
#[derive(Debug, Clone, PartialEq)]
pub struct SealedIndex {
    store: PostingStore,
    num_docs: usize,
}

impl SealedIndex {
    fn new(store: PostingStore) -> Self {
        let num_docs = store.num_docs();
        Self { store, num_docs }
    }

    /// N: distinct documents across every shard.
    pub fn num_docs(&self) -> usize {
        self.num_docs
    }

    pub fn store(&self) -> &PostingStore {
        &self.store
    }

    pub fn into_store(self) -> PostingStore {
        self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shard(shard: usize, docs: &[(u32, &str)]) -> ShardIndex {
        let mut store = PostingStore::new();
        for (doc, text) in docs {
            for term in text.split_whitespace() {
                store.post(term, *doc);
            }
        }
        ShardIndex { shard, store, records: docs.len() }
    }

    #[test]
    fn seal_requires_every_shard() {
        let agg = CorpusAggregator::new(3);
        agg.report(shard(0, &[(1, "cat sat")])).unwrap();
        agg.report(shard(2, &[(3, "dog bark")])).unwrap();
        match agg.seal() {
            Err(IndexError::IncompleteCorpus { expected, reported }) => {
                assert_eq!((expected, reported), (3, 2));
            }
            other => panic!("expected incomplete corpus, got {other:?}"),
        }
    }

    #[test]
    fn seal_counts_distinct_documents() {
        let agg = CorpusAggregator::new(2);
        agg.report(shard(1, &[(2, "cat ate")])).unwrap();
        agg.report(shard(0, &[(1, "cat sat"), (3, "dog bark")])).unwrap();
        let sealed = agg.seal().unwrap();
        assert_eq!(sealed.num_docs(), 3);
        assert_eq!(sealed.store().get("cat").unwrap().document_frequency(), 2);
    }

    #[test]
    fn rejects_duplicate_and_unknown_shards() {
        let agg = CorpusAggregator::new(1);
        agg.report(shard(0, &[(1, "cat")])).unwrap();
        assert!(matches!(
            agg.report(shard(0, &[(2, "dog")])),
            Err(IndexError::DuplicateShard { shard: 0 })
        ));
        assert!(matches!(
            agg.report(shard(5, &[(3, "owl")])),
            Err(IndexError::UnknownShard { shard: 5, expected: 1 })
        ));
        assert_eq!(agg.reported(), 1);
    }

    #[test]
    fn reports_from_many_threads() {
        let agg = CorpusAggregator::new(16);
        (0..16usize).into_par_iter().for_each(|i| {
            let doc = i as u32;
            agg.report(shard(i, &[(doc, "common rare")])).unwrap();
        });
        let sealed = agg.seal().unwrap();
        assert_eq!(sealed.num_docs(), 16);
        assert_eq!(sealed.store().get("common").unwrap().document_frequency(), 16);
    }
}
