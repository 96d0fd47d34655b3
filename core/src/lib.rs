//! Vector-space retrieval: a term-document inverted index with TF-IDF
//! weighting and cosine-similarity ranking.
//!
//! Build: [`pipeline::build`] parses and shards a corpus, posts each shard
//! into a [`PostingStore`], and seals them through the
//! [`aggregator::CorpusAggregator`]. [`SealedIndex::weigh`] then produces
//! the persisted weights. Query: [`scorer::QueryScorer`] over a
//! [`scorer::SearchIndex`].

pub mod aggregator;
pub mod config;
pub mod error;
pub mod index;
pub mod normalizer;
pub mod persist;
pub mod pipeline;
pub mod scorer;
pub mod tokenizer;
pub mod weighting;

pub use aggregator::SealedIndex;
pub use error::{IndexError, Result};
pub use index::{DocId, MaxFrequencyTable, PostingList, PostingStore};
