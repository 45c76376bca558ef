use rust_stemmers::{Algorithm, Stemmer};
use std::collections::{HashMap, HashSet};
use unicode_segmentation::UnicodeSegmentation;

lazy_static::lazy_static! {
    static ref STOPWORDS: HashSet<&'static str> = {
        [
            // Norwegian (bokmål and nynorsk function words)
            "alle", "at", "av", "bare", "begge", "ble", "blei", "bli", "blir", "blitt",
            "både", "da", "de", "deg", "dei", "deim", "deira", "deires", "dem", "den",
            "denne", "der", "dere", "deres", "det", "dette", "di", "din", "disse", "ditt",
            "du", "dykk", "dykkar", "då", "eg", "ein", "eit", "eitt", "eller", "elles",
            "en", "enn", "er", "et", "ett", "etter", "for", "fordi", "fra", "før", "ha",
            "hadde", "han", "hans", "har", "hennar", "henne", "hennes", "her", "hjå",
            "ho", "hoe", "honom", "hoss", "hossen", "hun", "hva", "hvem", "hver", "hvilke",
            "hvilken", "hvis", "hvor", "hvordan", "hvorfor", "i", "ikke", "ikkje", "ingen",
            "ingi", "inkje", "inn", "inni", "ja", "jeg", "kan", "kom", "korleis", "korso",
            "kun", "kunne", "kva", "kvar", "kvarhelst", "kven", "kvi", "kvifor", "man",
            "mange", "me", "med", "medan", "meg", "meget", "mellom", "men", "mi", "min",
            "mine", "mitt", "mot", "mykje", "ned", "no", "noe", "noen", "noka", "noko",
            "nokon", "nokor", "nokre", "nå", "når", "og", "også", "om", "opp", "oss",
            "over", "på", "samme", "seg", "selv", "si", "sia", "sidan", "siden", "sin",
            "sine", "sitt", "sjøl", "skal", "skulle", "slik", "so", "som", "somme",
            "somt", "så", "sånn", "til", "um", "upp", "ut", "uten", "var", "vart",
            "varte", "ved", "vere", "verte", "vi", "vil", "ville", "vore", "vors",
            "vort", "vår", "være", "vært", "å",
            // English
            "a", "about", "above", "after", "again", "against", "all", "am", "an", "and",
            "any", "are", "as", "be", "because", "been", "before", "being", "below",
            "between", "both", "but", "by", "could", "did", "do", "does", "doing", "down",
            "during", "each", "few", "from", "further", "had", "has", "have", "having",
            "he", "hers", "herself", "him", "himself", "his", "how", "if", "into", "is",
            "it", "its", "itself", "me", "more", "most", "my", "myself", "nor", "not",
            "of", "off", "on", "once", "only", "or", "other", "our", "ours", "ourselves",
            "out", "own", "same", "she", "should", "some", "such", "than", "that", "the",
            "their", "theirs", "them", "themselves", "then", "there", "these", "they",
            "this", "those", "through", "to", "too", "under", "until", "up", "very",
            "was", "we", "were", "what", "when", "where", "which", "while", "who", "whom",
            "why", "with", "would", "you", "your", "yours", "yourself", "yourselves",
        ]
        .iter()
        .copied()
        .collect()
    };
}

/// Turns raw text into normalized tokens.
///
/// Words are split on Unicode word boundaries and lowercased; diacritics are
/// kept. Stopword removal and stemming are opt-in and, when enabled, must be
/// applied identically to corpus, reference and target.
pub struct Tokenizer {
    stemmer: Option<Stemmer>,
    remove_stopwords: bool,
}

impl Tokenizer {
    pub fn new() -> Self {
        Self {
            stemmer: None,
            remove_stopwords: false,
        }
    }

    pub fn with_stemmer(mut self, algorithm: Algorithm) -> Self {
        self.stemmer = Some(Stemmer::create(algorithm));
        self
    }

    pub fn with_stopwords(mut self, remove: bool) -> Self {
        self.remove_stopwords = remove;
        self
    }

    pub fn is_stopword(token: &str) -> bool {
        STOPWORDS.contains(token)
    }

    /// Split text into words
    fn tokenize<'a>(&self, text: &'a str) -> Vec<&'a str> {
        text.unicode_words().collect()
    }

    /// Convert tokens to lowercase
    fn lowercase_filter(&self, tokens: Vec<&str>) -> Vec<String> {
        tokens.into_iter().map(str::to_lowercase).collect()
    }

    /// Remove stopwords
    fn stopword_filter(&self, tokens: Vec<String>) -> Vec<String> {
        if !self.remove_stopwords {
            return tokens;
        }
        tokens
            .into_iter()
            .filter(|t| !Self::is_stopword(t))
            .collect()
    }

    /// Apply stemming
    fn stemmer_filter(&self, tokens: Vec<String>) -> Vec<String> {
        match &self.stemmer {
            Some(stemmer) => tokens
                .into_iter()
                .map(|t| stemmer.stem(&t).into_owned())
                .collect(),
            None => tokens,
        }
    }

    /// Full analysis pipeline
    pub fn analyze(&self, text: &str) -> Vec<String> {
        let tokens = self.tokenize(text);
        let tokens = self.lowercase_filter(tokens);
        let tokens = self.stopword_filter(tokens);
        self.stemmer_filter(tokens)
    }

    /// Normalize an already tokenized sequence (e.g. tokens shipped by a
    /// corpus provider) with the same policy as `analyze`.
    pub fn normalize_tokens<I, S>(&self, tokens: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tokens = tokens
            .into_iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        let tokens = self.stopword_filter(tokens);
        self.stemmer_filter(tokens)
    }

    /// Analyze and count term frequencies
    pub fn analyze_with_frequencies(&self, text: &str) -> HashMap<String, u64> {
        let mut frequencies = HashMap::new();
        for token in self.analyze(text) {
            *frequencies.entry(token).or_insert(0) += 1;
        }
        frequencies
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}
