use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::cache::{CachedScores, QueryKey, ResultCache};
use crate::cloud::{CloudWeighting, CloudWeights, WeightBasis};
use crate::counter::WindowCounter;
use crate::document::Corpus;
use crate::error::{CollocationError, Result};
use crate::provider::{CorpusFilter, CorpusProvider, REFERENCE_LIMIT};
use crate::ranking::{RankFilter, RankedResult};
use crate::reference::ReferenceModel;
use crate::scoring::{CollocationScorer, RelevanceScale};
use crate::tokenizer::Tokenizer;

/// Query parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollocationParams {
    pub target: String,
    /// Words before the target
    pub before: usize,
    /// Words after the target
    pub after: usize,
    pub min_relevance: f64,
    pub min_raw_count: u64,
    /// Maximum number of collocates shown
    pub head: usize,
    pub scale: RelevanceScale,
    pub cloud_basis: WeightBasis,
}

impl Default for CollocationParams {
    fn default() -> Self {
        Self {
            target: String::new(),
            before: 5,
            after: 5,
            min_relevance: 3.0,
            min_raw_count: 5,
            head: 20,
            scale: RelevanceScale::Log2,
            cloud_basis: WeightBasis::RawCount,
        }
    }
}

impl CollocationParams {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ..Default::default()
        }
    }
}

/// Parameters as they arrive from outer surfaces, where numbers are signed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ParamsInput {
    pub target: String,
    pub before: Option<i64>,
    pub after: Option<i64>,
    pub min_relevance: Option<f64>,
    pub min_raw_count: Option<i64>,
    pub head: Option<i64>,
    pub scale: Option<RelevanceScale>,
    pub cloud_basis: Option<WeightBasis>,
}

fn non_negative(name: &str, value: i64) -> Result<u64> {
    u64::try_from(value)
        .map_err(|_| CollocationError::InvalidThreshold(format!("{} must be non-negative, got {}", name, value)))
}

impl TryFrom<ParamsInput> for CollocationParams {
    type Error = CollocationError;

    fn try_from(input: ParamsInput) -> Result<Self> {
        let defaults = CollocationParams::default();

        let before = match input.before {
            Some(v) => non_negative("before", v)? as usize,
            None => defaults.before,
        };
        let after = match input.after {
            Some(v) => non_negative("after", v)? as usize,
            None => defaults.after,
        };
        let head = match input.head {
            Some(v) => non_negative("head", v)? as usize,
            None => defaults.head,
        };
        // a negative raw-count threshold admits every observed candidate
        let min_raw_count = input
            .min_raw_count
            .map_or(defaults.min_raw_count, |v| v.max(0) as u64);

        let min_relevance = input.min_relevance.unwrap_or(defaults.min_relevance);
        if !min_relevance.is_finite() {
            return Err(CollocationError::InvalidThreshold(format!(
                "min_relevance must be finite, got {}",
                min_relevance
            )));
        }

        Ok(Self {
            target: input.target,
            before,
            after,
            min_relevance,
            min_raw_count,
            head,
            scale: input.scale.unwrap_or(defaults.scale),
            cloud_basis: input.cloud_basis.unwrap_or(defaults.cloud_basis),
        })
    }
}

/// Outcome of one collocation query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollocationReport {
    /// Normalized target word
    pub target: String,
    pub corpus_size: usize,
    /// Occurrences of the target in the corpus; 0 means the word was not found
    pub occurrences: u64,
    pub collocations: RankedResult,
    pub cloud: CloudWeights,
}

impl CollocationReport {
    pub fn is_empty(&self) -> bool {
        self.collocations.is_empty()
    }
}

/// Main collocation engine
pub struct CollocationEngine {
    tokenizer: Tokenizer,
    cache: Option<Arc<dyn ResultCache>>,
}

impl CollocationEngine {
    pub fn new() -> Self {
        Self {
            tokenizer: Tokenizer::new(),
            cache: None,
        }
    }

    /// The tokenizer must match the normalization of the corpus and reference
    pub fn with_tokenizer(mut self, tokenizer: Tokenizer) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn ResultCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// Normalize the target with the engine's tokenizer; it must be one word.
    pub fn normalize_target(&self, target: &str) -> Result<String> {
        if target.trim().is_empty() {
            return Err(CollocationError::EmptyTarget);
        }
        let mut tokens = self.tokenizer.analyze(target);
        match tokens.len() {
            0 => Err(CollocationError::EmptyTarget),
            1 => Ok(tokens.remove(0)),
            _ => Err(CollocationError::InvalidTarget(target.to_string())),
        }
    }

    /// Run the pipeline over a materialized corpus and reference.
    pub fn collocations(
        &self,
        corpus: &Corpus,
        reference: &ReferenceModel,
        params: &CollocationParams,
    ) -> Result<CollocationReport> {
        let target = self.normalize_target(&params.target)?;
        let filter = RankFilter::new(params.min_relevance, params.min_raw_count, params.head)?;

        let scores = self.cached_scores(corpus, reference, &target, params)?;

        let collocations = filter.filter(scores.candidates);
        let cloud = CloudWeighting::new()
            .with_basis(params.cloud_basis)
            .weight(&collocations)?;

        info!(
            "{} collocates for '{}' in {} documents",
            collocations.len(),
            target,
            corpus.len()
        );

        Ok(CollocationReport {
            target,
            corpus_size: corpus.len(),
            occurrences: scores.occurrences,
            collocations,
            cloud,
        })
    }

    /// Count and score, or take both from the cache. Fingerprints are only
    /// computed when a cache is set.
    fn cached_scores(
        &self,
        corpus: &Corpus,
        reference: &ReferenceModel,
        target: &str,
        params: &CollocationParams,
    ) -> Result<CachedScores> {
        let compute = || -> Result<CachedScores> {
            let counts = WindowCounter::new(params.before, params.after).count(corpus, target);
            debug!(
                "'{}' occurs {} times with {} distinct neighbors",
                target,
                counts.occurrences(),
                counts.len()
            );
            Ok(CachedScores {
                occurrences: counts.occurrences(),
                candidates: CollocationScorer::new(params.scale).score(&counts, reference)?,
            })
        };

        let Some(cache) = &self.cache else {
            return compute();
        };

        let key = query_key(target, params, corpus, reference);
        if let Some(hit) = cache.get(&key)? {
            debug!("cache hit for '{}'", target);
            return Ok(hit);
        }
        let scores = compute()?;
        cache.put(key, scores.clone())?;
        Ok(scores)
    }

    /// Fetch a corpus and a matching reference from the provider, then run
    /// the pipeline. The reference covers the corpus's dominant document
    /// type and year span.
    pub fn run(
        &self,
        provider: &dyn CorpusProvider,
        filter: &CorpusFilter,
        params: &CollocationParams,
    ) -> Result<(Corpus, CollocationReport)> {
        // reject a bad target before any fetch
        self.normalize_target(&params.target)?;

        let corpus = provider.fetch_corpus(filter)?;
        let years = corpus.year_range().unwrap_or_else(|| filter.years());
        let doctype = corpus.dominant_doctype().or(filter.doctype);
        debug!(
            "fetched {} documents, reference {:?} {}-{}",
            corpus.len(),
            doctype,
            years.from,
            years.to
        );

        let reference = provider.fetch_reference(doctype, years, REFERENCE_LIMIT)?;
        let report = self.collocations(&corpus, &reference, params)?;
        Ok((corpus, report))
    }
}

fn query_key(
    target: &str,
    params: &CollocationParams,
    corpus: &Corpus,
    reference: &ReferenceModel,
) -> QueryKey {
    QueryKey {
        target: target.to_string(),
        before: params.before,
        after: params.after,
        scale: params.scale,
        corpus: corpus.fingerprint(),
        reference: reference.fingerprint(),
    }
}

impl Default for CollocationEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::document::{DocType, Document};
    use crate::provider::MemoryProvider;
    use crate::scoring::ScoredCandidate;

    fn doc(id: &str, tokens: &[&str]) -> Document {
        Document::new(id.to_string(), tokens.iter().map(|t| t.to_string()).collect())
    }

    fn sample_corpus() -> Corpus {
        Corpus::new(vec![doc("1", &["a", "b", "c", "a", "d"]), doc("2", &["a", "e", "a"])])
    }

    fn reference() -> ReferenceModel {
        ReferenceModel::from_counts(
            [("a", 100), ("b", 50), ("c", 10), ("d", 1), ("e", 5), ("f", 834)]
                .iter()
                .map(|(t, c)| (t.to_string(), *c as u64)),
        )
        .unwrap()
    }

    fn open_params(target: &str) -> CollocationParams {
        CollocationParams {
            target: target.to_string(),
            before: 1,
            after: 1,
            min_relevance: f64::NEG_INFINITY,
            min_raw_count: 0,
            ..Default::default()
        }
    }

    #[test]
    fn test_pipeline_end_to_end() -> Result<()> {
        let engine = CollocationEngine::new();
        let report = engine.collocations(&sample_corpus(), &reference(), &open_params("A"))?;

        assert_eq!(report.target, "a");
        assert_eq!(report.occurrences, 4);
        assert_eq!(report.corpus_size, 2);
        // d is rarest in the reference, so it ranks first
        let tokens: Vec<&str> = report.collocations.iter().map(ScoredCandidate::token).collect();
        assert_eq!(tokens, vec!["d", "e", "c", "b"]);
        assert_eq!(report.cloud.len(), 4);
        Ok(())
    }

    #[test]
    fn test_absent_target_is_empty_report() -> Result<()> {
        let report = CollocationEngine::new().collocations(&sample_corpus(), &reference(), &open_params("zzz"))?;
        assert!(report.is_empty());
        assert_eq!(report.occurrences, 0);
        assert!(report.cloud.is_empty());
        Ok(())
    }

    #[test]
    fn test_target_validation() {
        let engine = CollocationEngine::new();
        let err = engine
            .collocations(&sample_corpus(), &reference(), &open_params("   "))
            .unwrap_err();
        assert!(matches!(err, CollocationError::EmptyTarget));

        let err = engine
            .collocations(&sample_corpus(), &reference(), &open_params("two words"))
            .unwrap_err();
        assert!(matches!(err, CollocationError::InvalidTarget(_)));
    }

    #[test]
    fn test_rerun_is_identical() -> Result<()> {
        let engine = CollocationEngine::new();
        let first = engine.collocations(&sample_corpus(), &reference(), &open_params("a"))?;
        let second = engine.collocations(&sample_corpus(), &reference(), &open_params("a"))?;
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn test_cache_is_used_and_thresholds_apply_after_it() -> Result<()> {
        let cache = Arc::new(MemoryCache::new());
        let engine = CollocationEngine::new().with_cache(cache.clone());

        let full = engine.collocations(&sample_corpus(), &reference(), &open_params("a"))?;
        assert_eq!(cache.len(), 1);

        let strict = CollocationParams {
            min_raw_count: 1,
            ..open_params("a")
        };
        let filtered = engine.collocations(&sample_corpus(), &reference(), &strict)?;
        assert_eq!(cache.len(), 1);
        assert_eq!(full.collocations.len(), 4);
        assert_eq!(filtered.collocations.len(), 1);
        assert_eq!(filtered.collocations.entries()[0].token(), "e");
        Ok(())
    }

    #[test]
    fn test_cache_hit_skips_counting() -> Result<()> {
        let corpus = sample_corpus();
        let reference = reference();
        let params = open_params("a");

        // seeded under the real key with values counting could never produce
        let cache = Arc::new(MemoryCache::new());
        cache.put(
            query_key("a", &params, &corpus, &reference),
            CachedScores {
                occurrences: 99,
                candidates: vec![ScoredCandidate::new("zz".to_string(), 7, 9.0)],
            },
        )?;

        let report = CollocationEngine::new()
            .with_cache(cache)
            .collocations(&corpus, &reference, &params)?;
        assert_eq!(report.occurrences, 99);
        let tokens: Vec<&str> = report.collocations.iter().map(ScoredCandidate::token).collect();
        assert_eq!(tokens, vec!["zz"]);
        Ok(())
    }

    #[test]
    fn test_cache_miss_stores_occurrences() -> Result<()> {
        let corpus = sample_corpus();
        let reference = reference();
        let params = open_params("a");
        let cache = Arc::new(MemoryCache::new());

        CollocationEngine::new()
            .with_cache(cache.clone())
            .collocations(&corpus, &reference, &params)?;
        let stored = cache
            .get(&query_key("a", &params, &corpus, &reference))?
            .unwrap();
        assert_eq!(stored.occurrences, 4);
        assert_eq!(stored.candidates.len(), 4);
        Ok(())
    }

    #[test]
    fn test_mixed_case_library_finds_target() -> Result<()> {
        let json = r#"[{"id": "1", "year": 2000, "doctype": "digavis", "tokens": ["Ny", "Vaksine", "mot", "Smitte"]}]"#;
        let provider = MemoryProvider::from_reader(json.as_bytes(), Tokenizer::new())?;
        let filter = CorpusFilter {
            doctype: Some(DocType::Newspaper),
            ..Default::default()
        };

        let (corpus, report) = CollocationEngine::new().run(&provider, &filter, &open_params("Vaksine"))?;
        assert_eq!(corpus.len(), 1);
        assert_eq!(report.target, "vaksine");
        assert_eq!(report.occurrences, 1);
        assert_eq!(report.collocations.len(), 2);
        Ok(())
    }

    #[test]
    fn test_params_input_validation() {
        let input = ParamsInput {
            target: "a".to_string(),
            before: Some(-1),
            ..Default::default()
        };
        assert!(matches!(
            CollocationParams::try_from(input),
            Err(CollocationError::InvalidThreshold(_))
        ));

        let input = ParamsInput {
            head: Some(-3),
            ..Default::default()
        };
        assert!(CollocationParams::try_from(input).is_err());

        let input = ParamsInput {
            target: "a".to_string(),
            after: Some(2),
            ..Default::default()
        };
        let params = CollocationParams::try_from(input).unwrap();
        assert_eq!(params.after, 2);
        assert_eq!(params.before, 5);
        assert_eq!(params.head, 20);
    }

    #[test]
    fn test_run_against_provider() -> Result<()> {
        let tokenizer = Tokenizer::new();
        let mut library = Vec::new();
        for i in 0..10 {
            library.push(
                Document::from_text(format!("b{}", i), "mye smitte og vaksine mot smitte hver dag", &tokenizer)
                    .with_year(2021)
                    .with_doctype(DocType::Newspaper),
            );
            library.push(
                Document::from_text(format!("r{}", i), "en dag med sol og regn og vind", &tokenizer)
                    .with_year(2021)
                    .with_doctype(DocType::Newspaper),
            );
        }
        let provider = MemoryProvider::new(library);
        let filter = CorpusFilter {
            doctype: Some(DocType::Newspaper),
            from_year: 2020,
            to_year: 2022,
            fulltext: Some("vaksine".to_string()),
            ..Default::default()
        };
        let params = CollocationParams {
            target: "vaksine".to_string(),
            before: 2,
            after: 2,
            min_relevance: 0.0,
            min_raw_count: 5,
            ..Default::default()
        };

        let (corpus, report) = CollocationEngine::new().run(&provider, &filter, &params)?;
        assert_eq!(corpus.len(), 10);
        assert_eq!(report.occurrences, 10);
        let tokens: Vec<&str> = report.collocations.iter().map(ScoredCandidate::token).collect();
        assert!(tokens.contains(&"smitte"));
        assert!(!tokens.contains(&"dag"));
        Ok(())
    }

    #[test]
    fn test_run_rejects_blank_target_before_fetch() {
        let provider = MemoryProvider::new(Vec::new());
        let err = CollocationEngine::new()
            .run(&provider, &CorpusFilter::default(), &CollocationParams::default())
            .unwrap_err();
        assert!(matches!(err, CollocationError::EmptyTarget));
    }
}
