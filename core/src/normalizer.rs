//! Surface token -> index term.
//!
//! The same [`Normalizer`] must be used to build an index and to query it,
//! otherwise query terms will not line up with the vocabulary.

use crate::config::MIN_TERM_LEN;
use crate::error::Result;
use crate::tokenizer::tokenize;
use rust_stemmers::{Algorithm, Stemmer};
use std::borrow::Cow;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Stemming capability. Implementations must be pure.
pub trait Stem: Send + Sync {
    fn stem<'a>(&self, token: &'a str) -> Cow<'a, str>;
}

impl Stem for Stemmer {
    fn stem<'a>(&self, token: &'a str) -> Cow<'a, str> {
        Stemmer::stem(self, token)
    }
}

const ENGLISH: &[&str] = &[
    "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are", "as", "at",
    "be", "because", "been", "before", "being", "below", "between", "both", "but", "by",
    "can", "cannot", "could", "did", "do", "does", "doing", "down", "during",
    "each", "few", "for", "from", "further", "had", "has", "have", "having",
    "he", "her", "here", "hers", "herself", "him", "himself", "his", "how",
    "if", "in", "into", "is", "it", "its", "itself", "me", "more", "most", "my", "myself",
    "no", "nor", "not", "of", "off", "on", "once", "only", "or", "other", "ought",
    "our", "ours", "ourselves", "out", "over", "own", "same", "she", "should", "so", "some", "such",
    "than", "that", "the", "their", "theirs", "them", "themselves", "then", "there", "these",
    "they", "this", "those", "through", "to", "too", "under", "until", "up", "very",
    "was", "we", "were", "what", "when", "where", "which", "while", "who", "whom", "why",
    "with", "would", "you", "your", "yours", "yourself", "yourselves",
];

#[derive(Debug, Clone, Default)]
pub struct StopWords {
    words: HashSet<String>,
}

impl StopWords {
    /// Built-in English list, used when no stop-word file is supplied.
    pub fn english() -> Self {
        ENGLISH.iter().copied().collect()
    }

    /// One word per line; surrounding whitespace and blank lines are ignored.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut words = HashSet::new();
        for line in reader.lines() {
            let line = line?;
            let word = line.trim();
            if !word.is_empty() {
                words.insert(word.to_lowercase());
            }
        }
        Ok(Self { words })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_reader(BufReader::new(File::open(path)?))
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl<'a> FromIterator<&'a str> for StopWords {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self { words: iter.into_iter().map(str::to_string).collect() }
    }
}

pub struct Normalizer {
    stemmer: Box<dyn Stem>,
    stop_words: StopWords,
}

impl Normalizer {
    pub fn new(stemmer: Box<dyn Stem>, stop_words: StopWords) -> Self {
        Self { stemmer, stop_words }
    }

    /// English Snowball stemmer with the given stop words.
    pub fn english(stop_words: StopWords) -> Self {
        Self::new(Box::new(Stemmer::create(Algorithm::English)), stop_words)
    }

    /// `None` if the token is a stop word, stems to a stop word, or stems to
    /// fewer than [`MIN_TERM_LEN`] characters.
    pub fn normalize(&self, token: &str) -> Option<String> {
        if self.stop_words.contains(token) {
            return None;
        }
        let stem = self.stemmer.stem(token);
        if stem.chars().count() < MIN_TERM_LEN || self.stop_words.contains(&stem) {
            return None;
        }
        Some(stem.into_owned())
    }

    /// Tokenize and normalize free text, keeping order and repeats.
    pub fn terms(&self, text: &str) -> Vec<String> {
        tokenize(text).iter().filter_map(|t| self.normalize(t)).collect()
    }

    pub fn stop_words(&self) -> &StopWords {
        &self.stop_words
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Identity;

    impl Stem for Identity {
        fn stem<'a>(&self, token: &'a str) -> Cow<'a, str> {
            Cow::Borrowed(token)
        }
    }

    #[test]
    fn drops_short_and_stop_terms() {
        let n = Normalizer::new(Box::new(Identity), ["the"].into_iter().collect());
        assert_eq!(n.normalize("the"), None);
        assert_eq!(n.normalize("at"), None);
        assert_eq!(n.normalize("cat").as_deref(), Some("cat"));
        assert_eq!(n.terms("The cat sat on a mat"), vec!["cat", "sat", "mat"]);
    }

    #[test]
    fn stems_with_english_snowball() {
        let n = Normalizer::english(StopWords::default());
        assert_eq!(n.normalize("dogs").as_deref(), Some("dog"));
        assert_eq!(n.normalize("running").as_deref(), Some("run"));
    }

    #[test]
    fn checks_surface_token_against_stop_words() {
        // "because" stems to "becaus", which is not itself in the list
        let n = Normalizer::english(StopWords::english());
        assert_eq!(n.normalize("because"), None);
        assert_eq!(n.terms("because the wings flutter"), vec!["wing", "flutter"]);
    }

    #[test]
    fn loads_stop_words_from_lines() {
        let words = StopWords::from_reader("the\n  And \n\nof\n".as_bytes()).unwrap();
        assert_eq!(words.len(), 3);
        assert!(words.contains("and"));
        assert!(!words.contains(""));
    }
}
