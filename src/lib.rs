//! Statistical collocations: words that co-occur with a target word more
//! often than a reference corpus predicts.
//!
//! Pipeline: [`WindowCounter`] → [`CollocationScorer`] (against a
//! [`ReferenceModel`]) → [`RankFilter`] → [`CloudWeighting`], wired together by
//! [`CollocationEngine`].

pub mod api;
pub mod cache;
pub mod cloud;
pub mod counter;
pub mod document;
pub mod engine;
pub mod error;
pub mod export;
pub mod provider;
pub mod ranking;
pub mod reference;
pub mod scoring;
pub mod storage;
pub mod tokenizer;

// Re-export commonly used types
pub use cache::{CachedScores, MemoryCache, QueryKey, ResultCache};
pub use cloud::{exponential_stretch, CloudWeighting, CloudWeights, WeightBasis};
pub use counter::{CoOccurrenceCount, WindowCounter};
pub use document::{Corpus, DocType, Document, YearRange};
pub use engine::{CollocationEngine, CollocationParams, CollocationReport, ParamsInput};
pub use provider::{CorpusFilter, CorpusProvider, MemoryProvider};
pub use ranking::{RankFilter, RankedResult};
pub use reference::ReferenceModel;
pub use scoring::{CollocationScorer, RelevanceScale, ScoredCandidate};
pub use storage::SledCache;
pub use tokenizer::Tokenizer;

// Re-export error types
pub use error::{CollocationError, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
