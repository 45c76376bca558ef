use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::error::{CollocationError, Result};
use crate::scoring::ScoredCandidate;

/// Thresholds and truncation applied to scored candidates
#[derive(Debug, Clone, Copy)]
pub struct RankFilter {
    min_relevance: f64,
    min_raw_count: u64,
    max_results: usize,
}

impl RankFilter {
    pub fn new(min_relevance: f64, min_raw_count: u64, max_results: usize) -> Result<Self> {
        if min_relevance.is_nan() {
            return Err(CollocationError::InvalidThreshold(
                "minimum relevance is not a number".to_string(),
            ));
        }
        Ok(Self {
            min_relevance,
            min_raw_count,
            max_results,
        })
    }

    /// Keep candidates strictly above both thresholds, sort them and cut the
    /// list at `max_results`.
    pub fn filter(&self, candidates: Vec<ScoredCandidate>) -> RankedResult {
        let mut survivors: Vec<ScoredCandidate> = candidates
            .into_iter()
            .filter(|c| c.relevance() > self.min_relevance && c.raw_count() > self.min_raw_count)
            .collect();

        survivors.sort_by(compare_ranked);
        survivors.truncate(self.max_results);

        RankedResult { entries: survivors }
    }
}

/// Descending relevance, then descending raw count, then token order.
fn compare_ranked(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    b.relevance()
        .total_cmp(&a.relevance())
        .then_with(|| b.raw_count().cmp(&a.raw_count()))
        .then_with(|| a.token().cmp(b.token()))
}

/// Ranked, thresholded collocates. Immutable once produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    entries: Vec<ScoredCandidate>,
}

impl RankedResult {
    pub fn entries(&self) -> &[ScoredCandidate] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ScoredCandidate> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_raw_count(&self) -> u64 {
        self.entries.iter().map(ScoredCandidate::raw_count).sum()
    }
}

impl<'a> IntoIterator for &'a RankedResult {
    type Item = &'a ScoredCandidate;
    type IntoIter = std::slice::Iter<'a, ScoredCandidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(token: &str, raw_count: u64, relevance: f64) -> ScoredCandidate {
        ScoredCandidate::new(token.to_string(), raw_count, relevance)
    }

    #[test]
    fn test_strict_thresholds() -> Result<()> {
        let filter = RankFilter::new(10.0, 5, 20)?;
        let result = filter.filter(vec![
            candidate("below", 6, 9.9),
            candidate("equal", 6, 10.0),
            candidate("above", 6, 10.1),
            candidate("rare", 5, 50.0),
        ]);

        let tokens: Vec<&str> = result.iter().map(ScoredCandidate::token).collect();
        assert_eq!(tokens, vec!["above"]);
        Ok(())
    }

    #[test]
    fn test_sort_and_tie_break() -> Result<()> {
        let filter = RankFilter::new(0.0, 0, 10)?;
        let result = filter.filter(vec![
            candidate("c", 3, 2.0),
            candidate("b", 3, 2.0),
            candidate("a", 7, 2.0),
            candidate("z", 1, 5.0),
        ]);

        let tokens: Vec<&str> = result.iter().map(ScoredCandidate::token).collect();
        assert_eq!(tokens, vec!["z", "a", "b", "c"]);
        Ok(())
    }

    #[test]
    fn test_truncates_to_max_results() -> Result<()> {
        let filter = RankFilter::new(0.0, 0, 2)?;
        let result = filter.filter((1..=5).map(|i| candidate(&i.to_string(), 1, i as f64)).collect());

        assert_eq!(result.len(), 2);
        assert_eq!(result.entries()[0].token(), "5");
        assert_eq!(result.entries()[1].token(), "4");
        Ok(())
    }

    #[test]
    fn test_nothing_survives() -> Result<()> {
        let result = RankFilter::new(100.0, 0, 10)?.filter(vec![candidate("a", 10, 1.0)]);
        assert!(result.is_empty());
        Ok(())
    }

    #[test]
    fn test_nan_threshold_rejected() {
        assert!(matches!(
            RankFilter::new(f64::NAN, 0, 1),
            Err(CollocationError::InvalidThreshold(_))
        ));
    }

    #[test]
    fn test_filter_is_idempotent() -> Result<()> {
        let input = vec![candidate("a", 9, 3.5), candidate("b", 9, 3.5), candidate("c", 2, 7.0)];
        let filter = RankFilter::new(1.0, 1, 3)?;
        assert_eq!(filter.filter(input.clone()), filter.filter(input));
        Ok(())
    }
}
