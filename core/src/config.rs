use crate::builder::IndexBuilder;
use crate::error::ConfigError;
use crate::query::{NegativeTopK, SearchOptions, DEFAULT_TOP_K};
use crate::ranking::{RankingModel, DEFAULT_LENGTH_NORMALIZATION, DEFAULT_TITLE_WEIGHT};
use crate::snippet::DEFAULT_SNIPPET_WINDOW;
use crate::tokenizer::{Stopwords, TokenizerConfig, DEFAULT_MIN_TOKEN_LENGTH};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Every recognised option, as written in a TOML config file.
///
/// ```toml
/// min_token_length = 2
/// stopwords = "english"
/// title_weight = 3.0
/// group_by_page = true
/// snippet_window = 160
/// top_k_default = 10
/// negative_top_k = "reject"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub min_token_length: usize,
    pub stopwords: Stopwords,
    pub stem: bool,
    pub title_weight: f32,
    pub length_normalization: f32,
    pub group_by_page: bool,
    pub snippet_window: usize,
    pub top_k_default: usize,
    pub negative_top_k: NegativeTopK,
    /// Build workers; 0 picks one per core.
    pub threads: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_token_length: DEFAULT_MIN_TOKEN_LENGTH,
            stopwords: Stopwords::None,
            stem: false,
            title_weight: DEFAULT_TITLE_WEIGHT,
            length_normalization: DEFAULT_LENGTH_NORMALIZATION,
            group_by_page: false,
            snippet_window: DEFAULT_SNIPPET_WINDOW,
            top_k_default: DEFAULT_TOP_K,
            negative_top_k: NegativeTopK::Empty,
            threads: 0,
        }
    }
}

impl Config {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| -> Result<(), ConfigError> { Err(ConfigError::Invalid(msg.to_string())) };
        if self.min_token_length == 0 {
            return invalid("min_token_length must be at least 1");
        }
        if !self.title_weight.is_finite() || self.title_weight <= 0.0 {
            return invalid("title_weight must be a positive number");
        }
        if !(0.0..=1.0).contains(&self.length_normalization) {
            return invalid("length_normalization must be between 0 and 1");
        }
        if self.snippet_window == 0 {
            return invalid("snippet_window must be at least 1");
        }
        if self.top_k_default == 0 {
            return invalid("top_k_default must be at least 1");
        }
        Ok(())
    }

    pub fn tokenizer_config(&self) -> TokenizerConfig {
        TokenizerConfig { min_token_length: self.min_token_length, stopwords: self.stopwords.clone(), stem: self.stem }
    }

    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            ranking: RankingModel { title_weight: self.title_weight, length_normalization: self.length_normalization },
            group_by_page: self.group_by_page,
            snippet_window: self.snippet_window,
            top_k_default: self.top_k_default,
            negative_top_k: self.negative_top_k,
        }
    }

    pub fn builder(&self) -> IndexBuilder {
        IndexBuilder::new(self.tokenizer_config()).with_threads(self.threads)
    }
}
