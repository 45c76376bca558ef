use serde::{Deserialize, Serialize};

use crate::counter::CoOccurrenceCount;
use crate::error::{CollocationError, Result};
use crate::reference::ReferenceModel;

/// Pseudo-count used for words missing from the reference, so that their
/// reference probability is `1 / total_reference_tokens`.
pub const REFERENCE_FLOOR_COUNT: u64 = 1;

/// How the observed/expected ratio is reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelevanceScale {
    /// `log2(p_obs / p_ref)`
    #[default]
    Log2,
    /// The plain disproportion `p_obs / p_ref`
    Ratio,
}

/// A collocate candidate with its observed count and derived relevance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    token: String,
    raw_count: u64,
    relevance: f64,
}

impl ScoredCandidate {
    pub(crate) fn new(token: String, raw_count: u64, relevance: f64) -> Self {
        Self {
            token,
            raw_count,
            relevance,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn raw_count(&self) -> u64 {
        self.raw_count
    }

    pub fn relevance(&self) -> f64 {
        self.relevance
    }
}

/// Scores window counts against reference frequencies (a PMI variant).
///
/// With probabilities taken as frequency proportions,
/// `p(x|y) / p(x) = p(y|x) / p(y)`, so one log-ratio of the observed window
/// share over the reference share covers both directions.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollocationScorer {
    scale: RelevanceScale,
}

impl CollocationScorer {
    pub fn new(scale: RelevanceScale) -> Self {
        Self { scale }
    }

    /// Score every observed candidate, normalizing by the window total and
    /// the reference total.
    pub fn score(
        &self,
        counts: &CoOccurrenceCount,
        reference: &ReferenceModel,
    ) -> Result<Vec<ScoredCandidate>> {
        self.score_with_totals(counts, reference, counts.total(), reference.total())
    }

    /// Score with caller-supplied normalization totals. Output order is
    /// unspecified; only tokens with a positive count are scored.
    pub fn score_with_totals(
        &self,
        counts: &CoOccurrenceCount,
        reference: &ReferenceModel,
        total_window_tokens: u64,
        total_reference_tokens: u64,
    ) -> Result<Vec<ScoredCandidate>> {
        if total_reference_tokens == 0 {
            return Err(CollocationError::DegenerateReference);
        }
        if total_window_tokens == 0 {
            return Ok(Vec::new());
        }

        let window_total = total_window_tokens as f64;
        let reference_total = total_reference_tokens as f64;

        let scored = counts
            .iter()
            .filter(|(_, count)| *count > 0)
            .map(|(token, count)| {
                let p_obs = count as f64 / window_total;
                let ref_count = reference
                    .get(token)
                    .filter(|&c| c > 0)
                    .unwrap_or(REFERENCE_FLOOR_COUNT);
                let p_ref = ref_count as f64 / reference_total;

                ScoredCandidate::new(token.to_string(), count, self.relevance(p_obs, p_ref))
            })
            .collect();

        Ok(scored)
    }

    fn relevance(&self, p_obs: f64, p_ref: f64) -> f64 {
        let ratio = p_obs / p_ref;
        match self.scale {
            RelevanceScale::Log2 => ratio.log2(),
            RelevanceScale::Ratio => ratio,
        }
    }
}
