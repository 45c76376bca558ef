use serde::{Deserialize, Serialize};
use std::io::Read;

use crate::document::{Corpus, DocType, Document, YearRange};
use crate::error::{CollocationError, Result};
use crate::reference::ReferenceModel;
use crate::tokenizer::Tokenizer;

/// Number of words shipped with a reference frequency list
pub const REFERENCE_LIMIT: usize = 50_000;

/// Criteria for drawing a corpus sample from the library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusFilter {
    /// `None` means all document types
    pub doctype: Option<DocType>,
    pub from_year: i32,
    pub to_year: i32,
    /// Sample size
    pub limit: usize,
    /// Words the document text must contain, e.g. `jakt AND fiske`
    pub fulltext: Option<String>,
    /// Metadata query, free words or `key:value` pairs, e.g. `title:fisk`
    pub freetext: Option<String>,
    pub seed: u64,
}

impl Default for CorpusFilter {
    fn default() -> Self {
        Self {
            doctype: Some(DocType::Book),
            from_year: 1990,
            to_year: 2020,
            limit: 5000,
            fulltext: None,
            freetext: None,
            seed: 0,
        }
    }
}

impl CorpusFilter {
    pub fn years(&self) -> YearRange {
        YearRange::new(self.from_year, self.to_year)
    }
}

/// Source of corpora and reference frequencies.
///
/// Failures are fatal to the query; the pipeline never retries.
pub trait CorpusProvider: Send + Sync {
    fn fetch_corpus(&self, filter: &CorpusFilter) -> Result<Corpus>;

    fn fetch_reference(
        &self,
        doctype: Option<DocType>,
        years: YearRange,
        limit: usize,
    ) -> Result<ReferenceModel>;
}

/// Provider over an in-memory document library.
pub struct MemoryProvider {
    library: Vec<Document>,
    tokenizer: Tokenizer,
}

impl MemoryProvider {
    pub fn new(library: Vec<Document>) -> Self {
        Self {
            library,
            tokenizer: Tokenizer::new(),
        }
    }

    pub fn with_tokenizer(mut self, tokenizer: Tokenizer) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    /// Load a JSON array of documents. Their tokens are normalized with
    /// `tokenizer`, which is also used for fulltext queries.
    pub fn from_reader<R: Read>(reader: R, tokenizer: Tokenizer) -> Result<Self> {
        let library: Vec<Document> = serde_json::from_reader(reader)
            .map_err(|e| CollocationError::Provider(anyhow::Error::new(e).context("invalid document library")))?;
        let library = library
            .into_iter()
            .map(|doc| doc.normalized(&tokenizer))
            .collect();
        Ok(Self { library, tokenizer })
    }

    pub fn len(&self) -> usize {
        self.library.len()
    }

    pub fn is_empty(&self) -> bool {
        self.library.is_empty()
    }

    fn in_scope(doc: &Document, doctype: Option<DocType>, years: YearRange) -> bool {
        let type_ok = doctype.map_or(true, |t| doc.doctype == Some(t));
        let year_ok = doc.year.map_or(false, |y| years.contains(y));
        type_ok && year_ok
    }

    fn matches_fulltext(&self, doc: &Document, query: &str) -> bool {
        let any = query.split_whitespace().any(|w| w == "OR");
        let words: Vec<String> = query
            .split_whitespace()
            .filter(|w| *w != "AND" && *w != "OR")
            .flat_map(|w| self.tokenizer.analyze(w))
            .collect();
        if words.is_empty() {
            return true;
        }

        let contains = |word: &String| doc.tokens.iter().any(|t| t == word);
        if any {
            words.iter().any(contains)
        } else {
            words.iter().all(contains)
        }
    }

    fn matches_freetext(doc: &Document, query: &str) -> bool {
        let title = doc.title.as_deref().unwrap_or("").to_lowercase();
        query
            .split_whitespace()
            .filter(|term| *term != "AND")
            .all(|term| {
                let term = term.to_lowercase();
                match term.split_once(':') {
                    Some(("title", value)) => title.contains(value),
                    Some(("doctype", value)) => doc.doctype.map_or(false, |t| t.as_str() == value),
                    Some(("year", value)) => doc.year.map_or(false, |y| y.to_string() == value),
                    Some(("urn", value)) | Some(("id", value)) => doc.id.to_lowercase() == value,
                    _ => title.contains(&term) || doc.id.to_lowercase().contains(&term),
                }
            })
    }
}

impl CorpusProvider for MemoryProvider {
    fn fetch_corpus(&self, filter: &CorpusFilter) -> Result<Corpus> {
        let years = filter.years();
        let matching: Vec<Document> = self
            .library
            .iter()
            .filter(|doc| Self::in_scope(doc, filter.doctype, years))
            .filter(|doc| {
                filter
                    .fulltext
                    .as_deref()
                    .map_or(true, |q| self.matches_fulltext(doc, q))
            })
            .filter(|doc| {
                filter
                    .freetext
                    .as_deref()
                    .map_or(true, |q| Self::matches_freetext(doc, q))
            })
            .cloned()
            .collect();

        tracing::debug!(
            "{} of {} library documents match the filter",
            matching.len(),
            self.library.len()
        );

        Ok(Corpus::new(matching).sample(filter.limit, filter.seed))
    }

    fn fetch_reference(
        &self,
        doctype: Option<DocType>,
        years: YearRange,
        limit: usize,
    ) -> Result<ReferenceModel> {
        let scope = Corpus::new(
            self.library
                .iter()
                .filter(|doc| Self::in_scope(doc, doctype, years))
                .cloned()
                .collect(),
        );
        Ok(ReferenceModel::from_corpus(&scope)?.truncate(limit))
    }
}
