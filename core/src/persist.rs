//! On-disk index layout.
//!
//! ```text
//! <root>/postings.txt   <term> <df> (<doc_id> <max_freq> <raw_freq>)+
//! <root>/weights.txt    <doc_id> <length> (<term> <weight>)+
//! <root>/meta.json      corpus size, vocabulary size, build time, format version
//! <root>/snapshot.bin   bincode of the query-time SearchIndex
//! ```
//!
//! Text files are written in sorted order (terms lexicographic, documents
//! ascending) so two builds of the same corpus are byte-identical.

use crate::aggregator::SealedIndex;
use crate::config::INDEX_FORMAT_VERSION;
use crate::error::{IndexError, Result};
use crate::index::PostingStore;
use crate::scorer::SearchIndex;
use crate::weighting::{DocumentVector, WeightedIndex};
use crate::DocId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::{create_dir_all, File};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::str::{FromStr, SplitWhitespace};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: usize,
    pub num_terms: usize,
    pub created_at: String,
    pub version: u32,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn postings(&self) -> PathBuf { self.root.join("postings.txt") }
    pub fn weights(&self) -> PathBuf { self.root.join("weights.txt") }
    pub fn meta(&self) -> PathBuf { self.root.join("meta.json") }
    pub fn snapshot(&self) -> PathBuf { self.root.join("snapshot.bin") }
}

fn parse_error(line: usize, reason: impl Into<String>) -> IndexError {
    IndexError::Parse { line, reason: reason.into() }
}

fn next_field<T: FromStr>(fields: &mut SplitWhitespace<'_>, line: usize, what: &str) -> Result<T> {
    let raw = fields.next().ok_or_else(|| parse_error(line, format!("missing {what}")))?;
    raw.parse().map_err(|_| parse_error(line, format!("bad {what} {raw:?}")))
}

pub fn write_postings<W: Write>(mut w: W, store: &PostingStore) -> Result<()> {
    for (term, list) in store.iter() {
        write!(w, "{} {}", term, list.document_frequency())?;
        for (doc_id, freq) in list.iter() {
            let max = store.max_frequency(doc_id).unwrap_or(freq);
            write!(w, " {doc_id} {max} {freq}")?;
        }
        writeln!(w)?;
    }
    w.flush()?;
    Ok(())
}

pub fn read_postings<R: BufRead>(r: R) -> Result<PostingStore> {
    let mut store = PostingStore::new();
    let mut max_seen: HashMap<DocId, u32> = HashMap::new();
    for (i, line) in r.lines().enumerate() {
        let line = line?;
        let lineno = i + 1;
        let mut fields = line.split_whitespace();
        let Some(term) = fields.next() else { continue };
        let df: u32 = next_field(&mut fields, lineno, "document frequency")?;
        let mut entries = 0u32;
        while fields.clone().next().is_some() {
            let doc_id: DocId = next_field(&mut fields, lineno, "doc id")?;
            let max: u32 = next_field(&mut fields, lineno, "max frequency")?;
            let freq: u32 = next_field(&mut fields, lineno, "frequency")?;
            if freq == 0 || freq > max {
                return Err(parse_error(lineno, format!("frequency {freq} outside 1..={max} for doc {doc_id}")));
            }
            if *max_seen.entry(doc_id).or_insert(max) != max {
                return Err(parse_error(lineno, format!("inconsistent max frequency for doc {doc_id}")));
            }
            store.insert_posting(term, doc_id, freq, max);
            entries += 1;
        }
        if entries != df {
            return Err(parse_error(lineno, format!("term {term:?} lists {entries} documents, header says {df}")));
        }
    }
    Ok(store)
}

pub fn write_weights<W: Write>(mut w: W, weighted: &WeightedIndex) -> Result<()> {
    for (doc_id, vector) in &weighted.documents {
        if !vector.length.is_finite() {
            let term = vector.weights.first().map(|(t, _)| t.clone()).unwrap_or_default();
            return Err(IndexError::NonFiniteWeight { doc_id: *doc_id, term });
        }
        write!(w, "{} {}", doc_id, vector.length)?;
        for (term, weight) in &vector.weights {
            if !weight.is_finite() {
                return Err(IndexError::NonFiniteWeight { doc_id: *doc_id, term: term.clone() });
            }
            write!(w, " {term} {weight}")?;
        }
        writeln!(w)?;
    }
    w.flush()?;
    Ok(())
}

pub fn read_weights<R: BufRead>(r: R) -> Result<WeightedIndex> {
    let mut documents = BTreeMap::new();
    for (i, line) in r.lines().enumerate() {
        let line = line?;
        let lineno = i + 1;
        let mut fields = line.split_whitespace();
        let Some(raw_id) = fields.next() else { continue };
        let doc_id: DocId = raw_id
            .parse()
            .map_err(|_| IndexError::InvalidDocumentId { input: raw_id.to_string() })?;
        let length: f64 = next_field(&mut fields, lineno, "length")?;
        let mut weights = Vec::new();
        while let Some(term) = fields.next() {
            let weight: f64 = next_field(&mut fields, lineno, "weight")?;
            weights.push((term.to_string(), weight));
        }
        if !length.is_finite() || weights.iter().any(|(_, w)| !w.is_finite()) {
            return Err(parse_error(lineno, format!("non-finite value for doc {doc_id}")));
        }
        weights.sort_by(|a, b| a.0.cmp(&b.0));
        documents.insert(doc_id, DocumentVector { length, weights });
    }
    Ok(WeightedIndex { num_docs: documents.len(), documents })
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta())?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}

pub fn save_snapshot(paths: &IndexPaths, index: &SearchIndex) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = BufWriter::new(File::create(paths.snapshot())?);
    bincode::serialize_into(&mut f, index)?;
    f.flush()?;
    Ok(())
}

pub fn load_snapshot(paths: &IndexPaths) -> Result<SearchIndex> {
    let f = BufReader::new(File::open(paths.snapshot())?);
    let index = bincode::deserialize_from(f)?;
    Ok(index)
}

/// Write every artifact of a finished build.
pub fn save_index(paths: &IndexPaths, sealed: &SealedIndex, weighted: &WeightedIndex) -> Result<MetaFile> {
    create_dir_all(&paths.root)?;
    write_postings(BufWriter::new(File::create(paths.postings())?), sealed.store())?;
    write_weights(BufWriter::new(File::create(paths.weights())?), weighted)?;
    save_snapshot(paths, &SearchIndex::from_weighted(sealed, weighted))?;
    let meta = MetaFile {
        num_docs: sealed.num_docs(),
        num_terms: sealed.store().num_terms(),
        created_at: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default(),
        version: INDEX_FORMAT_VERSION,
    };
    save_meta(paths, &meta)?;
    Ok(meta)
}

/// Query-time index from the two text artifacts.
pub fn load_text_index<P: AsRef<Path>, Q: AsRef<Path>>(postings: P, weights: Q) -> Result<SearchIndex> {
    let store = read_postings(BufReader::new(File::open(postings)?))?;
    let weighted = read_weights(BufReader::new(File::open(weights)?))?;
    Ok(SearchIndex::from_parts(store, weighted.lengths()))
}

/// Prefer the binary snapshot, fall back to the text files.
pub fn load_search_index(paths: &IndexPaths) -> Result<SearchIndex> {
    if paths.snapshot().is_file() {
        return load_snapshot(paths);
    }
    load_text_index(paths.postings(), paths.weights())
}
