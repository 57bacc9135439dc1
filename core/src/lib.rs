//! Full-text search over static documentation sites.
//!
//! Corpus records go through the [`tokenizer`] into an [`InvertedIndex`]
//! ([`builder`]), which is persisted ([`persist`]) and later answered by a
//! [`SearchEngine`] ([`query`]) using the [`ranking`] model.

pub mod builder;
pub mod config;
pub mod document;
pub mod error;
pub mod handle;
pub mod index;
pub mod persist;
pub mod query;
pub mod ranking;
pub mod snippet;
pub mod tokenizer;

pub use builder::IndexBuilder;
pub use config::Config;
pub use document::{Category, Document};
pub use error::{ConfigError, CorpusError, IndexFormatError, QueryError};
pub use handle::IndexHandle;
pub use index::{DocId, DocMeta, InvertedIndex, Posting, TermId};
pub use query::{parse_top_k, NegativeTopK, SearchEngine, SearchHit, SearchOptions};
pub use ranking::{RankingModel, Score};
pub use snippet::Snippet;
pub use tokenizer::{Stopwords, Token, Tokenizer, TokenizerConfig};
