//! Relevance scoring.
//!
//! A term contributes `(title_weight * title_tf + text_tf) * idf / norm` where
//! `idf = ln(1 + N / df)` and `norm = 1 - b + b * len / avg_len` is the BM25
//! length factor. Contributions are summed over the distinct query terms the
//! document contains.
//!
//! Coordination is applied as an ordering, not a multiplier: a document that
//! matches more distinct query terms always ranks above one that matches fewer,
//! and the summed score only orders documents with equal coverage.

use crate::index::{DocId, InvertedIndex, Posting};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

pub const DEFAULT_TITLE_WEIGHT: f32 = 3.0;
pub const DEFAULT_LENGTH_NORMALIZATION: f32 = 0.75;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankingModel {
    pub title_weight: f32,
    /// BM25 `b`: 0 disables length normalization, 1 normalizes fully.
    pub length_normalization: f32,
}

impl Default for RankingModel {
    fn default() -> Self {
        Self { title_weight: DEFAULT_TITLE_WEIGHT, length_normalization: DEFAULT_LENGTH_NORMALIZATION }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Score {
    pub value: f32,
    /// Distinct query terms found in the document.
    pub matched_terms: usize,
}

impl Score {
    pub fn is_match(&self) -> bool { self.matched_terms > 0 }
}

/// A query term resolved against one index: its postings and idf, looked up once per query.
#[derive(Debug, Clone, Copy)]
pub struct QueryTerm<'a> {
    pub term: &'a str,
    pub postings: &'a [Posting],
    pub idf: f32,
}

impl<'a> QueryTerm<'a> {
    pub fn posting(&self, doc_id: DocId) -> Option<&'a Posting> {
        let postings = self.postings;
        postings.binary_search_by_key(&doc_id, |p| p.doc_id).ok().map(|i| &postings[i])
    }
}

/// Resolve `terms` against `index`, dropping the ones it has never seen.
pub fn weigh<'a>(index: &'a InvertedIndex, terms: &'a [String]) -> Vec<QueryTerm<'a>> {
    terms
        .iter()
        .filter_map(|term| {
            let postings = index.postings(term)?;
            Some(QueryTerm { term, postings, idf: idf(index.num_docs(), postings.len() as u32) })
        })
        .collect()
}

pub fn idf(num_docs: usize, doc_freq: u32) -> f32 {
    if doc_freq == 0 { return 0.0; }
    (1.0 + num_docs as f32 / doc_freq as f32).ln()
}

impl RankingModel {
    pub fn length_norm(&self, doc_len: u32, avg_doc_len: f32) -> f32 {
        if avg_doc_len <= 0.0 { return 1.0; }
        let b = self.length_normalization;
        (1.0 - b + b * doc_len as f32 / avg_doc_len).max(f32::EPSILON)
    }

    pub fn term_score(&self, posting: &Posting, idf: f32, norm: f32) -> f32 {
        let weighted_tf = self.title_weight * posting.title_tf() as f32 + posting.text_tf() as f32;
        weighted_tf * idf / norm
    }

    /// Score `doc_id` against the weighted, de-duplicated query terms.
    pub fn score(&self, index: &InvertedIndex, terms: &[QueryTerm<'_>], doc_id: DocId) -> Score {
        let Some(doc) = index.doc(doc_id) else { return Score::default() };
        let norm = self.length_norm(doc.length, index.avg_doc_len());
        let mut score = Score::default();
        for term in terms {
            if let Some(posting) = term.posting(doc_id) {
                score.value += self.term_score(posting, term.idf, norm);
                score.matched_terms += 1;
            }
        }
        score
    }
}

/// Result order: more matched terms, then higher score, then earlier in the corpus.
pub fn rank_order(a: &(DocId, Score), b: &(DocId, Score)) -> Ordering {
    b.1.matched_terms
        .cmp(&a.1.matched_terms)
        .then_with(|| b.1.value.total_cmp(&a.1.value))
        .then_with(|| a.0.cmp(&b.0))
}
