use std::sync::Arc;

use collocations::export::write_collocations_csv;
use collocations::{
    CloudWeighting, CollocationEngine, CollocationParams, CorpusFilter, DocType, Document,
    MemoryCache, MemoryProvider, RelevanceScale, Tokenizer,
};

fn main() -> anyhow::Result<()> {
    println!("=== Collocations Basic Usage Example ===\n");

    let tokenizer = Tokenizer::new();

    // A small library standing in for the digital-library service
    let texts = [
        (1998, DocType::Newspaper, "Ny vaksine mot influensa gir bedre vern mot smitte i vinter."),
        (1999, DocType::Newspaper, "Helsemyndighetene anbefaler vaksine til eldre før influensa sesongen."),
        (2001, DocType::Newspaper, "Været i helgen blir kaldt med snø i fjellet og regn ved kysten."),
        (2003, DocType::Newspaper, "Vaksine og smitte var tema da ministeren besøkte sykehuset."),
        (2004, DocType::Newspaper, "Fotballaget vant kampen i helgen etter et sent mål."),
        (2005, DocType::Book, "Historien om vaksine forteller om kopper og smitte gjennom hundreår."),
    ];
    let library: Vec<Document> = texts
        .iter()
        .enumerate()
        .map(|(i, (year, doctype, text))| {
            Document::from_text(format!("doc{}", i + 1), text, &tokenizer)
                .with_year(*year)
                .with_doctype(*doctype)
        })
        .collect();
    let provider = MemoryProvider::new(library);
    println!("✓ Loaded {} documents\n", provider.len());

    let engine = CollocationEngine::new().with_cache(Arc::new(MemoryCache::new()));

    // Example 1: Collocations of 'vaksine' in newspapers
    println!("--- Example 1: Collocations for 'vaksine' ---");
    let filter = CorpusFilter {
        doctype: Some(DocType::Newspaper),
        from_year: 1990,
        to_year: 2010,
        ..Default::default()
    };
    let params = CollocationParams {
        target: "vaksine".to_string(),
        min_relevance: 0.0,
        min_raw_count: 0,
        ..Default::default()
    };
    let (corpus, report) = engine.run(&provider, &filter, &params)?;

    println!(
        "Corpus: {} documents, 'vaksine' found {} times",
        corpus.len(),
        report.occurrences
    );
    for (i, candidate) in report.collocations.iter().enumerate() {
        println!(
            "{}. {} (raw {}, relevance {:.3})",
            i + 1,
            candidate.token(),
            candidate.raw_count(),
            candidate.relevance()
        );
    }

    // Example 2: Ratio scale instead of log2
    println!("\n--- Example 2: Plain disproportion ratio ---");
    let ratio_params = CollocationParams {
        scale: RelevanceScale::Ratio,
        min_relevance: 1.0,
        ..params.clone()
    };
    let (_, report) = engine.run(&provider, &filter, &ratio_params)?;
    for candidate in report.collocations.iter().take(5) {
        println!("  {} x{:.2}", candidate.token(), candidate.relevance());
    }

    // Example 3: Word cloud weights with a gentler stretch
    println!("\n--- Example 3: Word cloud weights ---");
    let weights = CloudWeighting::new()
        .with_stretch(|x| 1.0 + 9.0 * x)
        .with_top(5)
        .weight(&report.collocations)?;
    for weight in weights.iter() {
        println!("  {:<16} {:.2}", weight.token, weight.weight);
    }

    // Example 4: A word that is not in the corpus
    println!("\n--- Example 4: Missing word ---");
    let missing = CollocationParams {
        target: "ekorn".to_string(),
        ..params.clone()
    };
    let (_, report) = engine.run(&provider, &filter, &missing)?;
    println!("'ekorn' found {} times, {} collocates", report.occurrences, report.collocations.len());

    // Example 5: Export the table
    println!("\n--- Example 5: CSV export ---");
    let (_, report) = engine.run(&provider, &filter, &params)?;
    let mut out = Vec::new();
    write_collocations_csv(&mut out, &report.collocations)?;
    print!("{}", String::from_utf8(out)?);

    println!("\n=== Example Complete ===");

    Ok(())
}
