//! Claim extraction.
//!
//! Every sentence that reads as a statement of fact becomes a claim.
//! Sentences with opinion markers are skipped.

use lazy_static::lazy_static;
use regex::Regex;

use crate::text;
use crate::types::{Claim, ClaimType};

/// Sentences shorter than this (in characters) are not claims.
pub const MIN_CLAIM_CHARS: usize = 10;

lazy_static! {
    static ref OPINION: Regex =
        Regex::new(r"(?i)\b(think|believe|feel|opinion|prefer|should|might|could)").unwrap();

    static ref CURRENCY: Regex = Regex::new(r"\$\d[\d,]*(\.\d+)?").unwrap();

    static ref PERCENTAGE: Regex = Regex::new(r"\d[\d,]*(\.\d+)?\s*%").unwrap();

    static ref NUMBER: Regex = Regex::new(r"\d").unwrap();

    static ref DATE: Regex = Regex::new(
        r"(?i)\b(\d{4}-\d{2}-\d{2}|\d{1,2}/\d{1,2}/\d{4}|\d{1,2}-\d{1,2}-\d{4}|(january|february|march|april|may|june|july|august|september|october|november|december)\s+\d{1,2},?\s+\d{4})\b"
    )
    .unwrap();

    static ref REGULATORY: Regex = Regex::new(r"(?i)\b(regulations?|laws?|acts?|rules?)\b").unwrap();

    static ref SOURCING: Regex =
        Regex::new(r"(?i)(according to|data|research|study|report|statistics)").unwrap();
}

/// Extract claims from a response, in sentence order.
pub fn extract_claims(response: &str) -> Vec<Claim> {
    let cleaned = text::collapse_whitespace(response);

    text::sentences(&cleaned)
        .into_iter()
        .filter(|s| s.chars().count() >= MIN_CLAIM_CHARS)
        .filter(|s| !OPINION.is_match(s))
        .map(|s| {
            Claim::new(s)
                .with_type(classify(s))
                .with_confidence(confidence(s))
        })
        .collect()
}

/// Classify a sentence by the strongest cue it carries.
pub fn classify(sentence: &str) -> ClaimType {
    if CURRENCY.is_match(sentence) {
        ClaimType::Financial
    } else if PERCENTAGE.is_match(sentence) {
        ClaimType::Statistical
    } else if DATE.is_match(sentence) {
        ClaimType::Temporal
    } else if NUMBER.is_match(sentence) {
        ClaimType::Numerical
    } else if REGULATORY.is_match(sentence) {
        ClaimType::Regulatory
    } else {
        ClaimType::Factual
    }
}

/// Specific claims (numbers, dates, cited sources) get higher confidence.
fn confidence(sentence: &str) -> f64 {
    let mut confidence: f64 = 0.5;
    if NUMBER.is_match(sentence) {
        confidence += 0.2;
    }
    if DATE.is_match(sentence) {
        confidence += 0.1;
    }
    if SOURCING.is_match(sentence) {
        confidence += 0.1;
    }
    confidence.min(1.0)
}
