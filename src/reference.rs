use serde::Serialize;
use std::collections::HashMap;

use crate::cache::Fingerprint;
use crate::document::Corpus;
use crate::error::{CollocationError, Result};

/// Background word frequencies from a reference corpus.
///
/// Counts are raw and non-negative. Probabilities are taken against a
/// corpus-wide `total`, which is at least the sum of the counts and may be
/// larger when the list was truncated to the most frequent words.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceModel {
    counts: HashMap<String, u64>,
    total: u64,
}

impl ReferenceModel {
    /// Build from raw counts; the total is their sum. Repeated tokens add up.
    pub fn from_counts<I>(counts: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, u64)>,
    {
        Self::with_total(counts, 0)
    }

    /// Build from raw counts with an explicit total token count. A total
    /// below the sum of the counts is raised to that sum.
    ///
    /// Fails with `DegenerateReference` when the total is zero or the counts
    /// do not fit in a `u64`.
    pub fn with_total<I>(counts: I, total: u64) -> Result<Self>
    where
        I: IntoIterator<Item = (String, u64)>,
    {
        let mut merged: HashMap<String, u64> = HashMap::new();
        let mut sum: u64 = 0;
        for (token, count) in counts {
            let entry = merged.entry(token).or_insert(0);
            *entry = entry
                .checked_add(count)
                .ok_or(CollocationError::DegenerateReference)?;
            sum = sum
                .checked_add(count)
                .ok_or(CollocationError::DegenerateReference)?;
        }

        let total = total.max(sum);
        if total == 0 {
            return Err(CollocationError::DegenerateReference);
        }
        Ok(Self {
            counts: merged,
            total,
        })
    }

    /// Token frequencies of an already tokenized corpus.
    pub fn from_corpus(corpus: &Corpus) -> Result<Self> {
        let mut counts: HashMap<String, u64> = HashMap::new();
        for doc in &corpus.documents {
            for token in &doc.tokens {
                *counts.entry(token.clone()).or_insert(0) += 1;
            }
        }
        Self::from_counts(counts)
    }

    /// Keep only the `limit` most frequent words (ties by token). The total
    /// is unchanged so the remaining probabilities stay comparable.
    pub fn truncate(mut self, limit: usize) -> Self {
        if self.counts.len() <= limit {
            return self;
        }
        let mut entries: Vec<(String, u64)> = self.counts.into_iter().collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        entries.truncate(limit);
        self.counts = entries.into_iter().collect();
        self
    }

    pub fn get(&self, token: &str) -> Option<u64> {
        self.counts.get(token).copied()
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Vocabulary size
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(token, &count)| (token.as_str(), count))
    }

    /// Stable identity of the model content, used as a cache key component.
    pub fn fingerprint(&self) -> u64 {
        let mut entries: Vec<(&String, &u64)> = self.counts.iter().collect();
        entries.sort_unstable();

        let mut fingerprint = Fingerprint::new();
        fingerprint.write_u64(self.total);
        for (token, count) in entries {
            fingerprint.write_str(token);
            fingerprint.write_u64(*count);
        }
        fingerprint.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    fn counts(pairs: &[(&str, u64)]) -> Vec<(String, u64)> {
        pairs.iter().map(|(t, c)| (t.to_string(), *c)).collect()
    }

    #[test]
    fn test_total_is_sum_of_counts() -> Result<()> {
        let model = ReferenceModel::from_counts(counts(&[("a", 3), ("b", 7)]))?;
        assert_eq!(model.total(), 10);
        assert_eq!(model.get("b"), Some(7));
        assert_eq!(model.get("c"), None);
        Ok(())
    }

    #[test]
    fn test_zero_total_is_degenerate() {
        let err = ReferenceModel::from_counts(Vec::new()).unwrap_err();
        assert!(matches!(err, CollocationError::DegenerateReference));

        let err = ReferenceModel::from_counts(counts(&[("a", 0)])).unwrap_err();
        assert!(matches!(err, CollocationError::DegenerateReference));
    }

    #[test]
    fn test_total_below_sum_is_raised() -> Result<()> {
        let map: HashMap<String, u64> = counts(&[("a", 5)]).into_iter().collect();
        assert_eq!(ReferenceModel::with_total(map.clone(), 4)?.total(), 5);
        assert_eq!(ReferenceModel::with_total(map, 50)?.total(), 50);
        Ok(())
    }

    #[test]
    fn test_truncate_keeps_total() -> Result<()> {
        let model = ReferenceModel::from_counts(counts(&[("a", 5), ("b", 3), ("c", 3), ("d", 1)]))?
            .truncate(2);
        assert_eq!(model.len(), 2);
        assert_eq!(model.total(), 12);
        assert_eq!(model.get("a"), Some(5));
        assert_eq!(model.get("b"), Some(3));
        assert_eq!(model.get("c"), None);
        Ok(())
    }

    #[test]
    fn test_from_corpus() -> Result<()> {
        let corpus = Corpus::new(vec![Document::new(
            "1".to_string(),
            vec!["x".to_string(), "y".to_string(), "x".to_string()],
        )]);
        let model = ReferenceModel::from_corpus(&corpus)?;
        assert_eq!(model.get("x"), Some(2));
        assert_eq!(model.total(), 3);
        Ok(())
    }

    #[test]
    fn test_repeated_tokens_add_up() -> Result<()> {
        let model = ReferenceModel::from_counts(counts(&[("a", 2), ("b", 1), ("a", 3)]))?;
        assert_eq!(model.get("a"), Some(5));
        assert_eq!(model.total(), 6);
        Ok(())
    }

    #[test]
    fn test_count_overflow_is_degenerate() {
        let err = ReferenceModel::from_counts(counts(&[("a", u64::MAX), ("b", 1)])).unwrap_err();
        assert!(matches!(err, CollocationError::DegenerateReference));

        let err = ReferenceModel::from_counts(counts(&[("a", u64::MAX), ("a", 1)])).unwrap_err();
        assert!(matches!(err, CollocationError::DegenerateReference));

        let model = ReferenceModel::from_counts(counts(&[("a", u64::MAX)])).unwrap();
        assert_eq!(model.total(), u64::MAX);
    }

    #[test]
    fn test_fingerprint_is_content_based() -> Result<()> {
        let a = ReferenceModel::from_counts(counts(&[("a", 1), ("b", 2)]))?;
        let b = ReferenceModel::from_counts(counts(&[("a", 1), ("b", 3)]))?;
        let c = ReferenceModel::with_total(counts(&[("a", 1), ("b", 2)]), 100)?;
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_eq!(a.fingerprint(), a.clone().fingerprint());
        Ok(())
    }

    #[test]
    fn test_fingerprint_ignores_insertion_order() -> Result<()> {
        let a = ReferenceModel::from_counts(counts(&[("a", 1), ("b", 2)]))?;
        let b = ReferenceModel::from_counts(counts(&[("b", 2), ("a", 1)]))?;
        assert_eq!(a.fingerprint(), b.fingerprint());
        Ok(())
    }
}
