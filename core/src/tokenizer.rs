use crate::error::{IndexError, Result};
use crate::DocId;
use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref MARKUP: Regex = Regex::new(r"<[^>]*>").expect("valid regex");
    static ref WORD: Regex = Regex::new(r"\p{L}+").expect("valid regex");
}

/// One corpus line after markup removal: `<tag> <doc_id> <body...>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub doc_id: DocId,
    pub body: String,
}

pub fn parse_doc_id(field: &str) -> Result<DocId> {
    field
        .parse::<DocId>()
        .map_err(|_| IndexError::InvalidDocumentId { input: field.to_string() })
}

/// Parse a raw corpus line. The leading identifier tag is discarded.
pub fn parse_record(line: &str) -> Result<Record> {
    let stripped = MARKUP.replace_all(line, " ");
    let mut fields = stripped.split_whitespace();
    if fields.next().is_none() {
        return Err(IndexError::MalformedRecord(line.to_string()));
    }
    let id_field = fields
        .next()
        .ok_or_else(|| IndexError::InvalidDocumentId { input: line.to_string() })?;
    let doc_id = parse_doc_id(id_field)?;
    let body = fields.collect::<Vec<_>>().join(" ");
    Ok(Record { doc_id, body })
}

/// Split text into lower-cased surface tokens: maximal runs of letters after
/// NFKC normalization. Digits and punctuation separate tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    WORD.find_iter(&normalized).map(|m| m.as_str().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tagged_record() {
        let r = parse_record("<DOC>cranfield 12 <TITLE>Flow past a plate</TITLE>").unwrap();
        assert_eq!(r.doc_id, 12);
        assert_eq!(r.body, "Flow past a plate");
    }

    #[test]
    fn markup_does_not_glue_words() {
        let r = parse_record("tag 3 boundary<br>layer").unwrap();
        assert_eq!(tokenize(&r.body), vec!["boundary", "layer"]);
    }

    #[test]
    fn rejects_bad_doc_ids() {
        for line in ["tag -4 text", "tag abc text", "tag"] {
            match parse_record(line) {
                Err(IndexError::InvalidDocumentId { .. }) => {}
                other => panic!("{line:?}: expected invalid id, got {other:?}"),
            }
        }
        assert!(matches!(parse_record("   "), Err(IndexError::MalformedRecord(_))));
    }

    #[test]
    fn splits_on_digits_and_punctuation() {
        let t = tokenize("Mach-2 flow,at 30deg; SUPERSONIC");
        assert_eq!(t, vec!["mach", "flow", "at", "deg", "supersonic"]);
    }
}
