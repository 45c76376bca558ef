use serde::{Deserialize, Serialize};

use crate::error::{CollocationError, Result};
use crate::ranking::RankedResult;
use crate::scoring::ScoredCandidate;

/// Which column of the ranked table drives the visual weight.
///
/// Negative relevance counts as 0 under `Relevance`, so every share stays
/// within [0, 1] when the total is the sum over the weighted entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightBasis {
    #[default]
    RawCount,
    Relevance,
}

/// Default stretch: `2^(10x)`
pub fn exponential_stretch(x: f64) -> f64 {
    (10.0 * x).exp2()
}

/// Maps ranked collocates to word-cloud weights.
///
/// Each value is divided by the total (the sum over the weighted entries
/// unless the caller fixes it) and passed through `stretch`.
pub struct CloudWeighting<F = fn(f64) -> f64> {
    basis: WeightBasis,
    top: Option<usize>,
    total: Option<f64>,
    stretch: F,
}

impl CloudWeighting {
    pub fn new() -> Self {
        Self {
            basis: WeightBasis::default(),
            top: None,
            total: None,
            stretch: exponential_stretch,
        }
    }
}

impl Default for CloudWeighting {
    fn default() -> Self {
        Self::new()
    }
}

impl<F> CloudWeighting<F>
where
    F: Fn(f64) -> f64,
{
    /// Replace the stretch function. It should be monotonically increasing on [0, 1].
    pub fn with_stretch<G>(self, stretch: G) -> CloudWeighting<G>
    where
        G: Fn(f64) -> f64,
    {
        CloudWeighting {
            basis: self.basis,
            top: self.top,
            total: self.total,
            stretch,
        }
    }

    pub fn with_basis(mut self, basis: WeightBasis) -> Self {
        self.basis = basis;
        self
    }

    /// Only weight the first `top` entries of the ranked order
    pub fn with_top(mut self, top: usize) -> Self {
        self.top = Some(top);
        self
    }

    pub fn with_total(mut self, total: f64) -> Self {
        self.total = Some(total);
        self
    }

    pub fn weight(&self, result: &RankedResult) -> Result<CloudWeights> {
        let take = self.top.unwrap_or(result.len());
        let entries: Vec<&ScoredCandidate> = result.iter().take(take).collect();
        if entries.is_empty() {
            return Ok(CloudWeights::default());
        }

        let value = |c: &ScoredCandidate| match self.basis {
            WeightBasis::RawCount => c.raw_count() as f64,
            WeightBasis::Relevance => c.relevance().max(0.0),
        };

        let total = self
            .total
            .unwrap_or_else(|| entries.iter().map(|c| value(*c)).sum());
        if !(total.is_finite() && total > 0.0) {
            return Err(CollocationError::DegenerateWeights(total));
        }

        let weights = entries
            .into_iter()
            .map(|c| CloudWeight {
                token: c.token().to_string(),
                weight: (self.stretch)(value(c) / total),
            })
            .collect();

        Ok(CloudWeights { weights })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudWeight {
    pub token: String,
    pub weight: f64,
}

/// Token weights in ranked order, ready for a word-cloud renderer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CloudWeights {
    weights: Vec<CloudWeight>,
}

impl CloudWeights {
    pub fn get(&self, token: &str) -> Option<f64> {
        self.weights.iter().find(|w| w.token == token).map(|w| w.weight)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CloudWeight> {
        self.weights.iter()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}
