//! In-process map/reduce over a corpus.
//!
//! Records are routed to shards by `doc_id % shards`, so a document always
//! lands in exactly one shard even if it spans several lines. Each shard is
//! posted on its own rayon task and reported to a [`CorpusAggregator`];
//! sealing is the barrier before any weighting.

use crate::aggregator::{CorpusAggregator, SealedIndex, ShardIndex};
use crate::config::DEFAULT_SHARDS;
use crate::error::Result;
use crate::index::PostingStore;
use crate::normalizer::Normalizer;
use crate::tokenizer::{parse_record, Record};
use rayon::prelude::*;
use std::io;

#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    pub shards: usize,
    /// Abort on the first unparseable record instead of skipping it.
    pub strict: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self { shards: DEFAULT_SHARDS, strict: false }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub shards: usize,
    pub records: usize,
    pub rejected: usize,
}

/// Map stage for one shard.
pub fn map_shard(shard: usize, records: &[Record], normalizer: &Normalizer) -> ShardIndex {
    let mut store = PostingStore::new();
    for record in records {
        for term in normalizer.terms(&record.body) {
            store.post(&term, record.doc_id);
        }
    }
    ShardIndex { shard, store, records: records.len() }
}

/// Route parsed records to shards. Blank lines are ignored.
pub fn partition<I>(lines: I, options: &PipelineOptions) -> Result<(Vec<Vec<Record>>, usize)>
where
    I: IntoIterator<Item = io::Result<String>>,
{
    let shards = options.shards.max(1);
    let mut buckets: Vec<Vec<Record>> = (0..shards).map(|_| Vec::new()).collect();
    let mut rejected = 0usize;
    for (lineno, line) in lines.into_iter().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match parse_record(&line) {
            Ok(record) => {
                let shard = record.doc_id as usize % shards;
                buckets[shard].push(record);
            }
            Err(e) if !options.strict => {
                tracing::warn!(line = lineno + 1, error = %e, "skipping record");
                rejected += 1;
            }
            Err(e) => return Err(e),
        }
    }
    Ok((buckets, rejected))
}

/// Parse, shard, post and seal a whole corpus.
pub fn build<I>(lines: I, normalizer: &Normalizer, options: &PipelineOptions) -> Result<(SealedIndex, BuildReport)>
where
    I: IntoIterator<Item = io::Result<String>>,
{
    let (buckets, rejected) = partition(lines, options)?;
    let shards = buckets.len();
    let records: usize = buckets.iter().map(Vec::len).sum();
    tracing::info!(shards, records, rejected, "corpus partitioned");

    let aggregator = CorpusAggregator::new(shards);
    buckets
        .par_iter()
        .enumerate()
        .try_for_each(|(shard, batch)| aggregator.report(map_shard(shard, batch, normalizer)))?;
    let sealed = aggregator.seal()?;
    Ok((sealed, BuildReport { shards, records, rejected }))
}

/// Convenience for in-memory corpora.
pub fn build_from_str(corpus: &str, normalizer: &Normalizer, options: &PipelineOptions) -> Result<(SealedIndex, BuildReport)> {
    build(corpus.lines().map(|l| Ok(l.to_string())), normalizer, options)
}
