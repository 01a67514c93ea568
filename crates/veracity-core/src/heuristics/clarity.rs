//! Response clarity heuristic.

use lazy_static::lazy_static;
use regex::Regex;

use crate::text;

/// Responses with fewer words than this get the baseline score.
const MIN_WORDS: usize = 5;

/// Score given to very short responses.
pub const SHORT_RESPONSE_CLARITY: f64 = 0.8;

lazy_static! {
    static ref HEDGE: Regex = Regex::new(
        r"(?i)\b(maybe|perhaps|possibly|probably|might|could be|i think|not sure|it seems|arguably|sort of|kind of|i guess)\b"
    )
    .unwrap();

    static ref SHOUTED_WORD: Regex = Regex::new(r"\b[A-Z]{5,}\b").unwrap();
}

/// Clarity of a response in [0, 1].
///
/// Starts from 1.0 and subtracts for sentences that are too short or too
/// long on average, for hedging, and for shouting.
pub fn clarity_score(response: &str) -> f64 {
    let words = text::token_count(response);
    if words < MIN_WORDS {
        return SHORT_RESPONSE_CLARITY;
    }

    let mut score = 1.0;

    let sentences = text::sentences(response);
    let sentence_count = sentences.len().max(1);
    let average = words as f64 / sentence_count as f64;
    if average < 5.0 {
        score -= 0.1;
    } else if average > 45.0 {
        score -= 0.3;
    } else if average > 30.0 {
        score -= 0.2;
    }

    let hedges = HEDGE.find_iter(response).count();
    let hedge_density = hedges as f64 / words as f64;
    score -= (hedge_density * 4.0).min(0.4);

    let shouted = SHOUTED_WORD.find_iter(response).count();
    if shouted >= 3 || shouted as f64 / words as f64 > 0.2 {
        score -= 0.1;
    }

    score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_response_baseline() {
        assert_eq!(clarity_score("yes"), 0.8);
        assert_eq!(clarity_score("can you help me?"), 0.8);
    }

    #[test]
    fn test_clear_response() {
        let score = clarity_score(
            "Your refund was issued today. It will reach your card within seven business days.",
        );
        assert_eq!(score, 1.0);
    }

    #[test]
    fn test_hedged_response_scores_lower() {
        let score = clarity_score(
            "Maybe the rate is higher, perhaps lower. It seems it could be either, I guess.",
        );
        assert!(score < 0.8, "score was {}", score);
    }

    #[test]
    fn test_run_on_sentence() {
        let long = vec!["word"; 50].join(" ");
        assert!((clarity_score(&long) - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_shouting() {
        let score = clarity_score("PLEASE READ THIS NOTICE about your account balance today");
        assert!((score - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_bounded() {
        let worst = vec!["MAYBE"; 40].join(" ");
        let score = clarity_score(&worst);
        assert!((0.0..=1.0).contains(&score));
    }
}
