use crate::document::Category;
use crate::error::IndexFormatError;
use crate::tokenizer::{Tokenizer, TokenizerConfig};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

pub type TermId = u32;
pub type DocId = u32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocMeta {
    pub location: String,
    pub page: String,
    pub title: String,
    pub category: Category,
    /// Kept for snippet extraction.
    pub text: String,
    /// Indexed tokens across title and text.
    pub length: u32,
    /// For anchored records: the nearest preceding `page` record of the same page.
    pub parent: Option<DocId>,
}

/// Occurrences of one term in one document, split by field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub title_positions: Vec<u32>,
    pub text_positions: Vec<u32>,
}

impl Posting {
    pub fn title_tf(&self) -> u32 { self.title_positions.len() as u32 }
    pub fn text_tf(&self) -> u32 { self.text_positions.len() as u32 }
}

/// Query-time index. Immutable once built; a new corpus means a new instance.
#[derive(Debug, Clone, PartialEq)]
pub struct InvertedIndex {
    tokenizer: Tokenizer,
    /// Sorted; a term's id is its rank in this list.
    terms: Vec<String>,
    dictionary: HashMap<String, TermId>,
    postings: Vec<Vec<Posting>>, // postings sorted by doc_id
    docs: Vec<DocMeta>,
    avg_doc_len: f32,
}

/// The stored shape of an index. Everything else is derived on assembly.
#[derive(Debug, Deserialize)]
pub(crate) struct IndexParts {
    pub tokenizer: TokenizerConfig,
    pub terms: Vec<String>,
    pub postings: Vec<Vec<Posting>>,
    pub docs: Vec<DocMeta>,
}

/// Borrowed twin of [`IndexParts`]; field order must match.
#[derive(Serialize)]
pub(crate) struct IndexPartsRef<'a> {
    pub tokenizer: &'a TokenizerConfig,
    pub terms: &'a [String],
    pub postings: &'a [Vec<Posting>],
    pub docs: &'a [DocMeta],
}

impl InvertedIndex {
    pub fn empty(config: TokenizerConfig) -> Self {
        Self::assemble(config, Vec::new(), Vec::new(), Vec::new())
    }

    /// Builder-side assembly: the caller guarantees the invariants.
    pub(crate) fn assemble(config: TokenizerConfig, terms: Vec<String>, postings: Vec<Vec<Posting>>, docs: Vec<DocMeta>) -> Self {
        let dictionary = terms.iter().enumerate().map(|(i, t)| (t.clone(), i as TermId)).collect();
        let total: u64 = docs.iter().map(|d| d.length as u64).sum();
        let avg_doc_len = if docs.is_empty() { 0.0 } else { total as f32 / docs.len() as f32 };
        Self { tokenizer: Tokenizer::new(config), terms, dictionary, postings, docs, avg_doc_len }
    }

    /// Loader-side assembly: checks every invariant a query relies on.
    pub(crate) fn from_parts(parts: IndexParts) -> Result<Self, IndexFormatError> {
        let IndexParts { tokenizer, terms, postings, docs } = parts;
        let bad = |msg: String| -> Result<Self, IndexFormatError> { Err(IndexFormatError::Inconsistent(msg)) };

        if terms.len() != postings.len() {
            return bad(format!("{} terms but {} posting lists", terms.len(), postings.len()));
        }
        if terms.windows(2).any(|w| w[0] >= w[1]) {
            return bad("term list is not strictly sorted".into());
        }
        let num_docs = docs.len();
        let mut lengths = vec![0u64; num_docs];
        for (term, list) in terms.iter().zip(&postings) {
            if list.is_empty() {
                return bad(format!("term {term:?} has no postings"));
            }
            let mut prev: Option<DocId> = None;
            for p in list {
                if p.doc_id as usize >= num_docs {
                    return bad(format!("term {term:?} points at missing document {}", p.doc_id));
                }
                if prev.is_some_and(|d| d >= p.doc_id) {
                    return bad(format!("postings for {term:?} are not sorted by document"));
                }
                if p.title_positions.is_empty() && p.text_positions.is_empty() {
                    return bad(format!("empty posting for {term:?}"));
                }
                lengths[p.doc_id as usize] += (p.title_positions.len() + p.text_positions.len()) as u64;
                prev = Some(p.doc_id);
            }
        }
        let mut locations = HashSet::with_capacity(num_docs);
        for (id, doc) in docs.iter().enumerate() {
            if !locations.insert(doc.location.as_str()) {
                return bad(format!("document {id} repeats location {:?}", doc.location));
            }
            if lengths[id] != doc.length as u64 {
                return bad(format!("document {id} length {} does not match its postings ({})", doc.length, lengths[id]));
            }
            if let Some(parent) = doc.parent {
                let ok = (parent as usize) < id
                    && docs[parent as usize].category.is_page()
                    && docs[parent as usize].page == doc.page;
                if !ok || doc.category.is_page() {
                    return bad(format!("document {id} has an invalid parent {parent}"));
                }
            }
        }
        Ok(Self::assemble(tokenizer, terms, postings, docs))
    }

    pub(crate) fn as_parts(&self) -> IndexPartsRef<'_> {
        IndexPartsRef { tokenizer: self.tokenizer.config(), terms: &self.terms, postings: &self.postings, docs: &self.docs }
    }

    pub fn tokenizer(&self) -> &Tokenizer { &self.tokenizer }
    pub fn num_docs(&self) -> usize { self.docs.len() }
    pub fn num_terms(&self) -> usize { self.terms.len() }
    pub fn is_empty(&self) -> bool { self.docs.is_empty() }
    pub fn avg_doc_len(&self) -> f32 { self.avg_doc_len }
    pub fn docs(&self) -> &[DocMeta] { &self.docs }
    pub fn doc(&self, id: DocId) -> Option<&DocMeta> { self.docs.get(id as usize) }

    pub fn term_id(&self, term: &str) -> Option<TermId> { self.dictionary.get(term).copied() }

    pub fn postings(&self, term: &str) -> Option<&[Posting]> {
        self.term_id(term).map(|tid| self.postings[tid as usize].as_slice())
    }

    pub fn doc_freq(&self, term: &str) -> u32 {
        self.postings(term).map_or(0, |p| p.len() as u32)
    }

    /// The posting of `term` in `doc_id`, if the document contains it.
    pub fn posting(&self, term: &str, doc_id: DocId) -> Option<&Posting> {
        let list = self.postings(term)?;
        list.binary_search_by_key(&doc_id, |p| p.doc_id).ok().map(|i| &list[i])
    }

    /// Terms in sorted order alongside their postings.
    pub fn terms(&self) -> impl Iterator<Item = (&str, &[Posting])> {
        self.terms.iter().map(String::as_str).zip(self.postings.iter().map(Vec::as_slice))
    }
}
