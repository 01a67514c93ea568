//! Consistency comparator.
//!
//! Compares a new response with earlier responses given in the same context
//! using term-set overlap. Scarce history is never punished: with little to
//! compare against the comparator returns a lenient default instead.

use crate::text;

/// Scores how similar a response is to prior responses.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsistencyComparator;

impl ConsistencyComparator {
    /// Returned when there is no history at all.
    pub const NO_HISTORY: f64 = 0.9;

    /// Returned when there is exactly one prior response.
    pub const SINGLE_PRIOR: f64 = 0.8;

    /// Returned when nothing can be meaningfully compared.
    pub const INCONCLUSIVE: f64 = 0.7;

    /// Below this, low overlap is read as a different kind of query.
    pub const DIFFERENT_QUERY_THRESHOLD: f64 = 0.2;

    /// Floor applied to very low similarity when history is plentiful.
    pub const DIFFERENT_QUERY_FLOOR: f64 = 0.4;

    /// Priors needed before very low similarity is taken at face value.
    pub const MIN_PRIORS_FOR_PENALTY: usize = 3;

    /// Responses below this many tokens count as short.
    const SHORT_TOKENS: usize = 3;

    pub fn new() -> Self {
        Self
    }

    /// Similarity of `response` to `history`, in [0, 1].
    pub fn compare<S: AsRef<str>>(&self, response: &str, history: &[S]) -> f64 {
        match history.len() {
            0 => return Self::NO_HISTORY,
            1 => return Self::SINGLE_PRIOR,
            _ => {}
        }

        let all_short = std::iter::once(response)
            .chain(history.iter().map(AsRef::as_ref))
            .all(|r| text::token_count(r) < Self::SHORT_TOKENS);
        if all_short {
            return Self::INCONCLUSIVE;
        }

        let current = text::terms(response);
        let similarities: Vec<f64> = history
            .iter()
            .filter_map(|prior| text::jaccard(&current, &text::terms(prior.as_ref())))
            .collect();

        if similarities.is_empty() {
            return Self::INCONCLUSIVE;
        }

        let score = similarities.iter().sum::<f64>() / similarities.len() as f64;

        let score = if score < Self::DIFFERENT_QUERY_THRESHOLD {
            if history.len() < Self::MIN_PRIORS_FOR_PENALTY {
                Self::INCONCLUSIVE
            } else {
                score.max(Self::DIFFERENT_QUERY_FLOOR)
            }
        } else {
            score
        };

        tracing::debug!(priors = history.len(), score, "Compared response with history");
        score.clamp(0.0, 1.0)
    }
}
