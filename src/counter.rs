use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::document::{Corpus, Document};

/// Co-occurrence counts of every neighbor of a target word, aggregated over
/// a whole corpus. The target itself is never a key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoOccurrenceCount {
    counts: HashMap<String, u64>,
    occurrences: u64,
}

impl CoOccurrenceCount {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count for a candidate, 0 if it was never seen in a window
    pub fn get(&self, token: &str) -> u64 {
        self.counts.get(token).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(token, &count)| (token.as_str(), count))
    }

    /// Number of distinct candidates
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// How many times the target occurred in the corpus
    pub fn occurrences(&self) -> u64 {
        self.occurrences
    }

    /// Sum of all counts: the number of tokens observed inside windows.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Additive merge; folds the smaller map into the larger one.
    fn merge(self, other: CoOccurrenceCount) -> CoOccurrenceCount {
        let (mut into, from) = if self.counts.len() >= other.counts.len() {
            (self, other)
        } else {
            (other, self)
        };
        for (token, count) in from.counts {
            *into.counts.entry(token).or_insert(0) += count;
        }
        into.occurrences += from.occurrences;
        into
    }
}

impl FromIterator<(String, u64)> for CoOccurrenceCount {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        let mut counts = HashMap::new();
        for (token, count) in iter {
            *counts.entry(token).or_insert(0) += count;
        }
        Self {
            counts,
            occurrences: 0,
        }
    }
}

/// Counts neighbors within `before` tokens preceding and `after` tokens
/// following each occurrence of a target word.
///
/// Windows are clipped at document boundaries. A neighbor is counted once
/// per window position it fills, so duplicates inside one window and
/// overlapping windows both add up. Neighbors equal to the target are skipped.
#[derive(Debug, Clone, Copy)]
pub struct WindowCounter {
    before: usize,
    after: usize,
}

impl WindowCounter {
    pub fn new(before: usize, after: usize) -> Self {
        Self { before, after }
    }

    /// Count over the whole corpus. Documents are processed in parallel and
    /// the per-partition maps are summed.
    pub fn count(&self, corpus: &Corpus, target: &str) -> CoOccurrenceCount {
        corpus
            .documents
            .par_iter()
            .fold(CoOccurrenceCount::new, |mut acc, doc| {
                self.count_document(doc, target, &mut acc);
                acc
            })
            .reduce(CoOccurrenceCount::new, CoOccurrenceCount::merge)
    }

    fn count_document(&self, doc: &Document, target: &str, acc: &mut CoOccurrenceCount) {
        let tokens = &doc.tokens;
        for (pos, token) in tokens.iter().enumerate() {
            if token != target {
                continue;
            }
            acc.occurrences += 1;

            let start = pos.saturating_sub(self.before);
            let end = (pos + self.after + 1).min(tokens.len());
            for neighbor in tokens[start..pos].iter().chain(&tokens[pos + 1..end]) {
                if neighbor == target {
                    continue;
                }
                *acc.counts.entry(neighbor.clone()).or_insert(0) += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, tokens: &[&str]) -> Document {
        Document::new(id.to_string(), tokens.iter().map(|t| t.to_string()).collect())
    }

    fn sample_corpus() -> Corpus {
        Corpus::new(vec![doc("1", &["a", "b", "c", "a", "d"]), doc("2", &["a", "e", "a"])])
    }

    #[test]
    fn test_count_with_unit_window() {
        let counts = WindowCounter::new(1, 1).count(&sample_corpus(), "a");

        assert_eq!(counts.len(), 4);
        assert_eq!(counts.get("b"), 1);
        assert_eq!(counts.get("c"), 1);
        assert_eq!(counts.get("d"), 1);
        assert_eq!(counts.get("e"), 2);
        assert_eq!(counts.occurrences(), 4);
        assert_eq!(counts.total(), 5);
    }

    #[test]
    fn test_target_never_counted() {
        let counts = WindowCounter::new(5, 5).count(&sample_corpus(), "a");
        assert_eq!(counts.get("a"), 0);
        assert!(counts.iter().all(|(token, _)| token != "a"));
    }

    #[test]
    fn test_window_does_not_cross_documents() {
        let corpus = Corpus::new(vec![doc("1", &["x", "y"]), doc("2", &["a", "z"])]);
        let counts = WindowCounter::new(3, 0).count(&corpus, "a");
        assert!(counts.is_empty());
        assert_eq!(counts.occurrences(), 1);
    }

    #[test]
    fn test_duplicate_neighbors_count_twice() {
        let corpus = Corpus::new(vec![doc("1", &["b", "b", "a", "c"])]);
        let counts = WindowCounter::new(2, 0).count(&corpus, "a");
        assert_eq!(counts.get("b"), 2);
        assert_eq!(counts.get("c"), 0);
    }

    #[test]
    fn test_zero_window_is_empty() {
        let counts = WindowCounter::new(0, 0).count(&sample_corpus(), "a");
        assert!(counts.is_empty());
        assert_eq!(counts.occurrences(), 4);
    }

    #[test]
    fn test_missing_target_is_empty() {
        let counts = WindowCounter::new(2, 2).count(&sample_corpus(), "zzz");
        assert!(counts.is_empty());
        assert_eq!(counts.occurrences(), 0);
    }

    #[test]
    fn test_parallel_count_matches_sequential_sum() {
        let documents: Vec<Document> = (0..64)
            .map(|i| doc(&i.to_string(), &["q", "a", "r", "a", "q"]))
            .collect();
        let counts = WindowCounter::new(1, 1).count(&Corpus::new(documents), "a");
        assert_eq!(counts.get("q"), 128);
        assert_eq!(counts.get("r"), 128);
        assert_eq!(counts.occurrences(), 128);
    }
}
