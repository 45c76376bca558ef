use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::document::{Corpus, Document};
use crate::error::{CollocationError, Result};
use crate::ranking::RankedResult;
use crate::scoring::ScoredCandidate;

/// One row of the collocation table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollocationRow {
    pub collocate: String,
    pub raw_frequency: u64,
    pub relevance: f64,
}

impl From<&ScoredCandidate> for CollocationRow {
    fn from(candidate: &ScoredCandidate) -> Self {
        Self {
            collocate: candidate.token().to_string(),
            raw_frequency: candidate.raw_count(),
            relevance: candidate.relevance(),
        }
    }
}

/// One row of the corpus definition table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusRow {
    pub id: String,
    pub year: Option<i32>,
    pub doctype: Option<String>,
    pub title: Option<String>,
    pub tokens: usize,
}

impl From<&Document> for CorpusRow {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            year: doc.year,
            doctype: doc.doctype.map(|t| t.as_str().to_string()),
            title: doc.title.clone(),
            tokens: doc.len(),
        }
    }
}

pub fn collocation_rows(result: &RankedResult) -> Vec<CollocationRow> {
    result.iter().map(CollocationRow::from).collect()
}

pub fn corpus_rows(corpus: &Corpus) -> Vec<CorpusRow> {
    corpus.documents.iter().map(CorpusRow::from).collect()
}

fn export_err(err: anyhow::Error) -> CollocationError {
    CollocationError::Export(err)
}

fn write_csv<W: Write, T: Serialize>(writer: W, rows: &[T], headers: &[&str]) -> Result<()> {
    let mut csv = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    // written explicitly so an empty table still carries its header
    csv.write_record(headers)
        .context("Failed to write CSV header")
        .map_err(export_err)?;
    for row in rows {
        csv.serialize(row)
            .context("Failed to write CSV row")
            .map_err(export_err)?;
    }
    csv.flush().context("Failed to flush CSV").map_err(export_err)?;
    Ok(())
}

/// Write the collocation table as CSV: `collocate,raw_frequency,relevance`
pub fn write_collocations_csv<W: Write>(writer: W, result: &RankedResult) -> Result<()> {
    write_csv(
        writer,
        &collocation_rows(result),
        &["collocate", "raw_frequency", "relevance"],
    )
}

/// Write the corpus table as CSV: `id,year,doctype,title,tokens`
pub fn write_corpus_csv<W: Write>(writer: W, corpus: &Corpus) -> Result<()> {
    write_csv(
        writer,
        &corpus_rows(corpus),
        &["id", "year", "doctype", "title", "tokens"],
    )
}

pub fn write_collocations_json<W: Write>(writer: W, result: &RankedResult) -> Result<()> {
    serde_json::to_writer_pretty(writer, &collocation_rows(result))
        .context("Failed to write JSON table")
        .map_err(export_err)
}
