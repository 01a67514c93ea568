//! Text utilities shared by the heuristics, the consistency comparator and
//! policy matching.
//!
//! Everything here is plain token work: lowercase, whitespace splitting and
//! stopword filtering. No stemming or embeddings.

use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};
use std::collections::{BTreeSet, HashSet};

lazy_static! {
    /// Function words dropped before comparing responses.
    static ref STOPWORDS: HashSet<&'static str> = {
        let words = [
            // Articles
            "a", "an", "the",
            // Copulas
            "is", "are", "was", "were", "be", "been",
            // Prepositions
            "to", "of", "in", "on", "at", "for", "with",
            // Conjunctions
            "and", "or", "but",
        ];
        words.into_iter().collect()
    };

    static ref SENTENCE_BOUNDARY: Regex = Regex::new(r"[.!?]+").unwrap();
}

/// Collapse runs of whitespace into single spaces and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercase and collapse whitespace.
pub fn normalize(text: &str) -> String {
    collapse_whitespace(text).to_lowercase()
}

/// Number of whitespace-separated tokens.
pub fn token_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Split text into trimmed, non-empty sentences on `.`, `!` and `?`.
pub fn sentences(text: &str) -> Vec<&str> {
    SENTENCE_BOUNDARY
        .split(text)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Lowercased whitespace tokens with stopwords removed.
///
/// Punctuation is kept attached to tokens, so "rates." and "rates" are
/// different terms.
pub fn terms(text: &str) -> BTreeSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .filter(|w| !STOPWORDS.contains(w))
        .map(str::to_string)
        .collect()
}

/// Jaccard similarity of two term sets. `None` when either set is empty.
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> Option<f64> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    Some(intersection as f64 / union as f64)
}

/// A whole-word, case-insensitive phrase, compiled once.
///
/// Any run of whitespace matches between the words of the phrase.
#[derive(Debug, Clone)]
pub struct Phrase {
    text: String,
    regex: Regex,
}

impl Phrase {
    pub fn new(phrase: &str) -> Result<Self, regex::Error> {
        let words: Vec<String> = phrase.split_whitespace().map(regex::escape).collect();
        let pattern = format!(r"\b{}\b", words.join(r"\s+"));
        let regex = RegexBuilder::new(&pattern).case_insensitive(true).build()?;
        Ok(Self {
            text: collapse_whitespace(phrase),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    pub fn is_match(&self, haystack: &str) -> bool {
        self.regex.is_match(haystack)
    }
}
