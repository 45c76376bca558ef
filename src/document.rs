use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::cache::Fingerprint;
use crate::tokenizer::Tokenizer;

/// Document types offered by the digital library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocType {
    #[serde(rename = "digavis")]
    Newspaper,
    #[serde(rename = "digibok")]
    Book,
    #[serde(rename = "digitidsskrift")]
    Journal,
    #[serde(rename = "digistorting")]
    Parliament,
}

impl DocType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocType::Newspaper => "digavis",
            DocType::Book => "digibok",
            DocType::Journal => "digitidsskrift",
            DocType::Parliament => "digistorting",
        }
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "digavis" => Ok(DocType::Newspaper),
            "digibok" => Ok(DocType::Book),
            "digitidsskrift" => Ok(DocType::Journal),
            "digistorting" => Ok(DocType::Parliament),
            other => Err(format!("unknown document type '{}'", other)),
        }
    }
}

/// Inclusive span of publication years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct YearRange {
    pub from: i32,
    pub to: i32,
}

impl YearRange {
    pub fn new(from: i32, to: i32) -> Self {
        Self { from, to }
    }

    pub fn contains(&self, year: i32) -> bool {
        self.from <= year && year <= self.to
    }
}

/// A tokenized document. Owned by the corpus provider; the pipeline only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub doctype: Option<DocType>,
    #[serde(default)]
    pub title: Option<String>,
    pub tokens: Vec<String>,
}

impl Document {
    pub fn new(id: String, tokens: Vec<String>) -> Self {
        Self {
            id,
            year: None,
            doctype: None,
            title: None,
            tokens,
        }
    }

    /// Build a document by running raw text through the tokenizer
    pub fn from_text(id: String, text: &str, tokenizer: &Tokenizer) -> Self {
        Self::new(id, tokenizer.analyze(text))
    }

    /// Re-normalize tokens that arrived already split, e.g. from a JSON library
    pub fn normalized(mut self, tokenizer: &Tokenizer) -> Self {
        self.tokens = tokenizer.normalize_tokens(&self.tokens);
        self
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_doctype(mut self, doctype: DocType) -> Self {
        self.doctype = Some(doctype);
        self
    }

    pub fn with_title(mut self, title: String) -> Self {
        self.title = Some(title);
        self
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// An unordered set of documents. Order carries no meaning for scoring.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Corpus {
    pub documents: Vec<Document>,
}

impl Corpus {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn total_tokens(&self) -> usize {
        self.documents.iter().map(Document::len).sum()
    }

    /// Draw `n` documents. Keeps everything when `n >= len`; otherwise the
    /// selection is a deterministic function of `seed` and the document ids,
    /// and the survivors keep their original relative order.
    pub fn sample(&self, n: usize, seed: u64) -> Corpus {
        if n >= self.documents.len() {
            return self.clone();
        }

        let mut keyed: Vec<(u64, usize)> = self
            .documents
            .iter()
            .enumerate()
            .map(|(i, doc)| {
                let mut hasher = DefaultHasher::new();
                seed.hash(&mut hasher);
                doc.id.hash(&mut hasher);
                i.hash(&mut hasher);
                (hasher.finish(), i)
            })
            .collect();
        keyed.sort_unstable();

        let mut picked: Vec<usize> = keyed.into_iter().take(n).map(|(_, i)| i).collect();
        picked.sort_unstable();

        Corpus::new(picked.into_iter().map(|i| self.documents[i].clone()).collect())
    }

    /// Year span covered by the corpus, widened by one year downwards when
    /// all documents share a single year. `None` if no document has a year.
    pub fn year_range(&self) -> Option<YearRange> {
        let years = self.documents.iter().filter_map(|d| d.year);
        let (min, max) = years.fold(None, |acc: Option<(i32, i32)>, y| match acc {
            None => Some((y, y)),
            Some((lo, hi)) => Some((lo.min(y), hi.max(y))),
        })?;

        if max == min {
            Some(YearRange::new(min - 1, max))
        } else {
            Some(YearRange::new(min, max))
        }
    }

    /// Most frequent document type; ties go to the type seen first.
    pub fn dominant_doctype(&self) -> Option<DocType> {
        let mut counts: HashMap<DocType, (usize, usize)> = HashMap::new();
        for (i, doctype) in self.documents.iter().filter_map(|d| d.doctype).enumerate() {
            let entry = counts.entry(doctype).or_insert((0, i));
            entry.0 += 1;
        }

        counts
            .into_iter()
            .max_by(|(_, (ca, fa)), (_, (cb, fb))| ca.cmp(cb).then(fb.cmp(fa)))
            .map(|(doctype, _)| doctype)
    }

    /// Stable identity of the corpus content, used as a cache key component.
    pub fn fingerprint(&self) -> u64 {
        let mut fingerprint = Fingerprint::new();
        for doc in &self.documents {
            fingerprint.write_str(&doc.id);
            fingerprint.write_u64(doc.tokens.len() as u64);
            for token in &doc.tokens {
                fingerprint.write_str(token);
            }
        }
        fingerprint.finish()
    }
}

impl From<Vec<Document>> for Corpus {
    fn from(documents: Vec<Document>) -> Self {
        Self::new(documents)
    }
}
