//! Error types for index construction and query scoring.

use crate::DocId;
use std::io;

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid document id {input:?}")]
    InvalidDocumentId { input: String },

    #[error("malformed record: {0:?}")]
    MalformedRecord(String),

    #[error("incomplete corpus: {reported} of {expected} shards reported")]
    IncompleteCorpus { expected: usize, reported: usize },

    #[error("shard {shard} reported twice")]
    DuplicateShard { shard: usize },

    #[error("shard {shard} is out of range for {expected} expected shards")]
    UnknownShard { shard: usize, expected: usize },

    #[error("document {doc_id} was posted by more than one shard")]
    OverlappingShards { doc_id: DocId },

    #[error("non-finite weight for term {term:?} in document {doc_id}")]
    NonFiniteWeight { doc_id: DocId, term: String },

    #[error("query timed out after touching {touched} postings")]
    QueryTimeout { touched: usize },

    #[error("parse error on line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("bincode error: {0}")]
    Bincode(#[from] bincode::Error),
}

pub type Result<T> = std::result::Result<T, IndexError>;
