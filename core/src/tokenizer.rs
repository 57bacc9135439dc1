use lazy_static::lazy_static;
use regex::{Matches, Regex};
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    // Maximal runs of letters and digits. Law codes like "CCM89" stay one token.
    // Combining marks continue a run, so decomposed "e\u{301}" folds with its base.
    static ref RE: Regex = Regex::new(r"[\p{L}\p{N}][\p{L}\p{N}\p{M}]*").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
}

pub const DEFAULT_MIN_TOKEN_LENGTH: usize = 2;

/// English function words, written the way the tokenizer emits them
/// (contractions split at the apostrophe, so only the bare stems appear).
pub const ENGLISH_STOPWORDS: &[&str] = &[
    "about","above","after","again","against","all","am","an","and","any","are","as","at",
    "be","because","been","before","being","below","between","both","but","by",
    "can","cannot","could",
    "did","do","does","doing","down","during",
    "each","few","for","from","further",
    "had","has","have","having","he","her","here","hers","herself","him","himself","his","how",
    "if","in","into","is","it","its","itself",
    "me","more","most","my","myself",
    "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
    "same","she","should","so","some","such",
    "than","that","the","their","theirs","them","themselves","then","there","these","they","this","those","through","to","too",
    "under","until","up","very",
    "was","we","were","what","when","where","which","while","who","whom","why","with","would",
    "you","your","yours","yourself","yourselves",
];

/// Which tokens are dropped as noise. Defaults to none: mixed-case identifiers
/// such as "OD94" or "F99" are meaningful in API docs.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stopwords {
    #[default]
    None,
    English,
    Custom(BTreeSet<String>),
}

/// Settings that decide the term form. They travel inside a built index so
/// queries are tokenized exactly like the documents were.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizerConfig {
    pub min_token_length: usize,
    pub stopwords: Stopwords,
    /// English suffix stripping. Off by default.
    pub stem: bool,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self { min_token_length: DEFAULT_MIN_TOKEN_LENGTH, stopwords: Stopwords::None, stem: false }
    }
}

/// A term plus where it came from. `start..end` is a byte range into the
/// original (un-normalized) text, used for snippet highlighting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub term: String,
    pub position: u32,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tokenizer {
    config: TokenizerConfig,
    stopwords: HashSet<String>,
}

impl Default for Tokenizer {
    fn default() -> Self { Self::new(TokenizerConfig::default()) }
}

impl Tokenizer {
    pub fn new(config: TokenizerConfig) -> Self {
        let stopwords = match &config.stopwords {
            Stopwords::None => HashSet::new(),
            Stopwords::English => ENGLISH_STOPWORDS.iter().map(|w| w.to_string()).collect(),
            Stopwords::Custom(words) => words.iter().map(|w| fold(w)).collect(),
        };
        Self { config, stopwords }
    }

    pub fn config(&self) -> &TokenizerConfig { &self.config }

    /// Lazily split `text` into terms. Positions count every alphanumeric run,
    /// including the ones that get filtered, so gaps mark dropped words.
    pub fn tokenize<'t, 'a>(&'t self, text: &'a str) -> Tokens<'t, 'a> {
        let re: &'static Regex = &RE;
        Tokens { tokenizer: self, matches: re.find_iter(text), position: 0 }
    }

    /// Distinct terms of `text` in first-seen order.
    pub fn terms(&self, text: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        self.tokenize(text)
            .filter_map(|tok| seen.insert(tok.term.clone()).then_some(tok.term))
            .collect()
    }

    fn normalize(&self, raw: &str) -> Option<String> {
        let folded = fold(raw);
        if folded.chars().count() < self.config.min_token_length { return None; }
        if self.stopwords.contains(&folded) { return None; }
        if self.config.stem {
            return Some(STEMMER.stem(&folded).into_owned());
        }
        Some(folded)
    }
}

fn fold(raw: &str) -> String { raw.nfkc().collect::<String>().to_lowercase() }

pub struct Tokens<'t, 'a> {
    tokenizer: &'t Tokenizer,
    matches: Matches<'static, 'a>,
    position: u32,
}

impl Iterator for Tokens<'_, '_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        for mat in self.matches.by_ref() {
            let position = self.position;
            self.position += 1;
            if let Some(term) = self.tokenizer.normalize(mat.as_str()) {
                return Some(Token { term, position, start: mat.start(), end: mat.end() });
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(tokenizer: &Tokenizer, text: &str) -> Vec<String> {
        tokenizer.tokenize(text).map(|t| t.term).collect()
    }

    #[test]
    fn basic_tokenize() {
        let t = Tokenizer::default();
        assert_eq!(words(&t, "Clayton, Cardelli and Mathis (1989)"), vec!["clayton", "cardelli", "and", "mathis", "1989"]);
    }

    #[test]
    fn alphanumeric_runs_stay_whole() {
        let t = Tokenizer::default();
        assert_eq!(words(&t, "CCM89(Rv=3.1)"), vec!["ccm89", "rv"]);
        assert_eq!(words(&t, "G03_SMCBar"), vec!["g03", "smcbar"]);
    }

    #[test]
    fn positions_skip_filtered_tokens() {
        let t = Tokenizer::default();
        let toks: Vec<Token> = t.tokenize("a dust law").collect();
        assert_eq!(toks.len(), 2);
        assert_eq!(toks[0].position, 1);
        assert_eq!(toks[1].position, 2);
        assert_eq!(&"a dust law"[toks[0].start..toks[0].end], "dust");
    }

    #[test]
    fn restartable() {
        let t = Tokenizer::default();
        let text = "O'Donnell (1994) dust law";
        let first: Vec<Token> = t.tokenize(text).collect();
        let second: Vec<Token> = t.tokenize(text).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn custom_stopwords_are_folded() {
        let mut words_set = BTreeSet::new();
        words_set.insert("Julia".to_string());
        let t = Tokenizer::new(TokenizerConfig { stopwords: Stopwords::Custom(words_set), ..Default::default() });
        assert_eq!(words(&t, "julia> using DustExtinction"), vec!["using", "dustextinction"]);
    }

    #[test]
    fn decomposed_text_folds_to_composed_terms() {
        let t = Tokenizer::default();
        let text = "nai\u{308}ve cafe\u{301}";
        let toks: Vec<Token> = t.tokenize(text).collect();
        assert_eq!(toks.iter().map(|t| t.term.as_str()).collect::<Vec<_>>(), vec!["naïve", "café"]);
        assert_eq!(&text[toks[1].start..toks[1].end], "cafe\u{301}");
        assert_eq!(t.terms("naïve café"), t.terms(text));
    }

    #[test]
    fn stemming_is_opt_in() {
        let plain = Tokenizer::default();
        let stemmed = Tokenizer::new(TokenizerConfig { stem: true, ..Default::default() });
        assert_eq!(words(&plain, "laws"), vec!["laws"]);
        assert_eq!(words(&stemmed, "laws"), vec!["law"]);
    }
}
