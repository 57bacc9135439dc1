use crate::document::Category;
use crate::error::QueryError;
use crate::index::{DocId, InvertedIndex};
use crate::ranking::{self, rank_order, RankingModel, Score};
use crate::snippet::{self, Snippet, DEFAULT_SNIPPET_WINDOW};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

pub const DEFAULT_TOP_K: usize = 10;

/// What a negative `top_k` means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegativeTopK {
    /// Treated like zero: no results.
    #[default]
    Empty,
    /// Rejected with [`QueryError::InvalidTopK`].
    Reject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOptions {
    pub ranking: RankingModel,
    /// Keep only the best-ranked hit per page.
    pub group_by_page: bool,
    /// Snippet length in characters.
    pub snippet_window: usize,
    pub top_k_default: usize,
    pub negative_top_k: NegativeTopK,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            ranking: RankingModel::default(),
            group_by_page: false,
            snippet_window: DEFAULT_SNIPPET_WINDOW,
            top_k_default: DEFAULT_TOP_K,
            negative_top_k: NegativeTopK::Empty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub location: String,
    pub page: String,
    pub title: String,
    pub category: Category,
    pub score: f32,
    pub matched_terms: usize,
    /// Location of the owning page record, for anchored hits.
    pub parent: Option<String>,
    pub snippet: Snippet,
}

/// Parse a user-supplied `top_k`.
pub fn parse_top_k(raw: &str) -> Result<i64, QueryError> {
    raw.trim().parse::<i64>().map_err(|_| QueryError::MalformedTopK(raw.to_string()))
}

/// Runs queries against one index snapshot. Cheap to create per request.
#[derive(Debug, Clone)]
pub struct SearchEngine {
    index: Arc<InvertedIndex>,
    options: SearchOptions,
}

impl SearchEngine {
    pub fn new(index: Arc<InvertedIndex>, options: SearchOptions) -> Self { Self { index, options } }

    pub fn index(&self) -> &Arc<InvertedIndex> { &self.index }
    pub fn options(&self) -> &SearchOptions { &self.options }

    /// OR-semantics search. Empty queries and unknown terms yield no hits.
    pub fn search(&self, query: &str, top_k: i64) -> Result<Vec<SearchHit>, QueryError> {
        self.run(query, top_k, None)
    }

    pub fn search_default(&self, query: &str) -> Result<Vec<SearchHit>, QueryError> {
        self.run(query, self.options.top_k_default as i64, None)
    }

    /// Like [`search`](Self::search), but gives up with
    /// [`QueryError::Cancelled`] once `cancel` is set.
    pub fn search_with_cancel(&self, query: &str, top_k: i64, cancel: &AtomicBool) -> Result<Vec<SearchHit>, QueryError> {
        self.run(query, top_k, Some(cancel))
    }

    fn run(&self, query: &str, top_k: i64, cancel: Option<&AtomicBool>) -> Result<Vec<SearchHit>, QueryError> {
        let start = Instant::now();
        let k = match top_k {
            k if k > 0 => usize::try_from(k).unwrap_or(usize::MAX),
            0 => return Ok(Vec::new()),
            k => match self.options.negative_top_k {
                NegativeTopK::Empty => return Ok(Vec::new()),
                NegativeTopK::Reject => return Err(QueryError::InvalidTopK(k)),
            },
        };

        let index = &*self.index;
        let words = index.tokenizer().terms(query);
        let terms = ranking::weigh(index, &words);
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let candidates: BTreeSet<DocId> = terms
            .iter()
            .flat_map(|t| t.postings.iter().map(|p| p.doc_id))
            .collect();

        let model = &self.options.ranking;
        let mut scored: Vec<(DocId, Score)> = Vec::with_capacity(candidates.len());
        for doc_id in candidates.iter().copied() {
            if cancel.is_some_and(|c| c.load(Ordering::Relaxed)) {
                return Err(QueryError::Cancelled);
            }
            let score = model.score(index, &terms, doc_id);
            if score.is_match() {
                scored.push((doc_id, score));
            }
        }
        scored.sort_by(rank_order);

        if self.options.group_by_page {
            let mut pages = HashSet::new();
            scored.retain(|(doc_id, _)| index.doc(*doc_id).is_some_and(|d| pages.insert(d.page.as_str())));
        }
        scored.truncate(k);

        let term_set: HashSet<&str> = terms.iter().map(|t| t.term).collect();
        let hits: Vec<SearchHit> = scored
            .into_iter()
            .filter_map(|(doc_id, score)| {
                let doc = index.doc(doc_id)?;
                Some(SearchHit {
                    doc_id,
                    location: doc.location.clone(),
                    page: doc.page.clone(),
                    title: doc.title.clone(),
                    category: doc.category.clone(),
                    score: score.value,
                    matched_terms: score.matched_terms,
                    parent: doc.parent.and_then(|p| index.doc(p)).map(|p| p.location.clone()),
                    snippet: snippet::extract(index.tokenizer(), &doc.title, &doc.text, &term_set, self.options.snippet_window),
                })
            })
            .collect();

        tracing::debug!(
            query,
            terms = terms.len(),
            candidates = candidates.len(),
            hits = hits.len(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "search"
        );
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::IndexBuilder;
    use crate::document::Document;

    fn engine(docs: &[Document], options: SearchOptions) -> SearchEngine {
        SearchEngine::new(Arc::new(IndexBuilder::default().build(docs).unwrap()), options)
    }

    #[test]
    fn parse_top_k_rejects_non_integers() {
        assert_eq!(parse_top_k("5"), Ok(5));
        assert_eq!(parse_top_k(" -2 "), Ok(-2));
        assert_eq!(parse_top_k("five"), Err(QueryError::MalformedTopK("five".into())));
        assert_eq!(parse_top_k("2.5"), Err(QueryError::MalformedTopK("2.5".into())));
    }

    #[test]
    fn negative_top_k_policy() {
        let docs = vec![Document::page("a", "p", "Dust", "dust law")];
        let lenient = engine(&docs, SearchOptions::default());
        assert_eq!(lenient.search("dust", -1), Ok(Vec::new()));

        let strict = engine(&docs, SearchOptions { negative_top_k: NegativeTopK::Reject, ..Default::default() });
        assert_eq!(strict.search("dust", -1), Err(QueryError::InvalidTopK(-1)));
        assert_eq!(strict.search("dust", 0), Ok(Vec::new()));
    }

    #[test]
    fn cancellation_stops_scoring() {
        let docs = vec![Document::page("a", "p", "Dust", "dust law")];
        let e = engine(&docs, SearchOptions::default());
        let cancel = AtomicBool::new(true);
        assert_eq!(e.search_with_cancel("dust", 5, &cancel), Err(QueryError::Cancelled));
        cancel.store(false, Ordering::Relaxed);
        assert_eq!(e.search_with_cancel("dust", 5, &cancel).unwrap().len(), 1);
    }

    #[test]
    fn anchored_hits_name_their_page() {
        let docs = vec![
            Document::page("color_laws/", "Color Laws", "Color Laws", "Empirical laws."),
            Document::section("color_laws/#Usage", "Color Laws", "Usage"),
        ];
        let hits = engine(&docs, SearchOptions::default()).search("usage", 5).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].parent.as_deref(), Some("color_laws/"));
        assert_eq!(hits[0].snippet.to_string(), "<em>Usage</em>");
    }
}
