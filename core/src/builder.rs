use crate::document::Document;
use crate::error::CorpusError;
use crate::index::{DocId, DocMeta, InvertedIndex, Posting};
use crate::tokenizer::{Tokenizer, TokenizerConfig};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

const DEFAULT_SHARD_SIZE: usize = 256;

/// Turns an ordered batch of documents into an [`InvertedIndex`].
///
/// Documents are tokenized in shards on a rayon pool; each shard builds its
/// own term map and the maps are merged once at the end. Shards cover
/// disjoint, ascending id ranges, and every merged list is re-sorted by
/// document id, so the result does not depend on shard size or thread count.
#[derive(Debug, Clone)]
pub struct IndexBuilder {
    tokenizer: Tokenizer,
    threads: usize,
    shard_size: usize,
}

impl Default for IndexBuilder {
    fn default() -> Self { Self::new(TokenizerConfig::default()) }
}

/// Term map for one shard of documents.
#[derive(Default)]
struct Shard {
    postings: HashMap<String, Vec<Posting>>,
    lengths: Vec<u32>,
}

impl IndexBuilder {
    pub fn new(config: TokenizerConfig) -> Self {
        Self { tokenizer: Tokenizer::new(config), threads: 0, shard_size: DEFAULT_SHARD_SIZE }
    }

    /// Worker count for the accumulate phase; 0 uses rayon's global pool.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_shard_size(mut self, shard_size: usize) -> Self {
        self.shard_size = shard_size.max(1);
        self
    }

    pub fn build(&self, documents: &[Document]) -> Result<InvertedIndex, CorpusError> {
        let start = Instant::now();
        validate(documents)?;
        let parents = page_parents(documents);

        let shards = if self.threads > 0 {
            match rayon::ThreadPoolBuilder::new().num_threads(self.threads).build() {
                Ok(pool) => pool.install(|| self.accumulate(documents)),
                Err(err) => {
                    tracing::warn!(%err, threads = self.threads, "falling back to the global thread pool");
                    self.accumulate(documents)
                }
            }
        } else {
            self.accumulate(documents)
        };

        let mut merged: BTreeMap<String, Vec<Posting>> = BTreeMap::new();
        let mut lengths = Vec::with_capacity(documents.len());
        for shard in shards {
            for (term, plist) in shard.postings {
                merged.entry(term).or_default().extend(plist);
            }
            lengths.extend(shard.lengths);
        }
        let (terms, mut postings): (Vec<String>, Vec<Vec<Posting>>) = merged.into_iter().unzip();
        for plist in postings.iter_mut() {
            plist.sort_by_key(|p| p.doc_id);
        }

        let docs: Vec<DocMeta> = documents
            .iter()
            .zip(lengths)
            .zip(parents)
            .map(|((doc, length), parent)| DocMeta {
                location: doc.location.clone(),
                page: doc.page.clone(),
                title: doc.title.clone(),
                category: doc.category.clone(),
                text: doc.text.clone(),
                length,
                parent,
            })
            .collect();

        let index = InvertedIndex::assemble(self.tokenizer.config().clone(), terms, postings, docs);
        tracing::info!(
            num_docs = index.num_docs(),
            num_terms = index.num_terms(),
            avg_doc_len = index.avg_doc_len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "index built"
        );
        Ok(index)
    }

    fn accumulate(&self, documents: &[Document]) -> Vec<Shard> {
        documents
            .par_chunks(self.shard_size)
            .enumerate()
            .map(|(n, chunk)| {
                let base = (n * self.shard_size) as DocId;
                let mut shard = Shard::default();
                for (offset, doc) in chunk.iter().enumerate() {
                    shard.lengths.push(self.ingest(base + offset as DocId, doc, &mut shard.postings));
                }
                shard
            })
            .collect()
    }

    /// Tokenize one document into `postings`; returns its indexed length.
    fn ingest(&self, doc_id: DocId, doc: &Document, postings: &mut HashMap<String, Vec<Posting>>) -> u32 {
        let mut per_doc: HashMap<String, Posting> = HashMap::new();
        let mut length = 0u32;
        for tok in self.tokenizer.tokenize(&doc.title) {
            length += 1;
            per_doc.entry(tok.term).or_insert_with(|| empty_posting(doc_id)).title_positions.push(tok.position);
        }
        for tok in self.tokenizer.tokenize(&doc.text) {
            length += 1;
            per_doc.entry(tok.term).or_insert_with(|| empty_posting(doc_id)).text_positions.push(tok.position);
        }
        for (term, posting) in per_doc {
            postings.entry(term).or_default().push(posting);
        }
        length
    }
}

fn empty_posting(doc_id: DocId) -> Posting {
    Posting { doc_id, title_positions: Vec::new(), text_positions: Vec::new() }
}

fn validate(documents: &[Document]) -> Result<(), CorpusError> {
    if documents.len() > DocId::MAX as usize {
        return Err(CorpusError::Malformed { index: DocId::MAX as usize, reason: "corpus too large".into() });
    }
    let mut seen: HashMap<&str, usize> = HashMap::with_capacity(documents.len());
    for (index, doc) in documents.iter().enumerate() {
        if doc.page.trim().is_empty() {
            return Err(CorpusError::Malformed { index, reason: "empty page".into() });
        }
        if doc.category.is_page() && doc.title.trim().is_empty() && doc.text.trim().is_empty() {
            return Err(CorpusError::Malformed { index, reason: "page record with neither title nor text".into() });
        }
        if let Some(&first) = seen.get(doc.location.as_str()) {
            return Err(CorpusError::DuplicateLocation { location: doc.location.clone(), first, second: index });
        }
        seen.insert(&doc.location, index);
    }
    Ok(())
}

/// For every anchored record, the most recent earlier `page` record with the same `page`.
fn page_parents(documents: &[Document]) -> Vec<Option<DocId>> {
    let mut last_page: HashMap<&str, DocId> = HashMap::new();
    documents
        .iter()
        .enumerate()
        .map(|(id, doc)| {
            if doc.category.is_page() {
                last_page.insert(&doc.page, id as DocId);
                None
            } else {
                last_page.get(doc.page.as_str()).copied()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Category;

    fn corpus() -> Vec<Document> {
        vec![
            Document::page("color_laws/", "Color Laws", "Color Laws", "The following empirical laws model reddening."),
            Document::section("color_laws/#Usage", "Color Laws", "Usage"),
            Document::page("dust_maps/", "Dust Maps", "Dust Maps", "Dust maps give reddening along a line of sight."),
            Document::new("color_laws/#DustExtinction.CCM89", "Color Laws", "DustExtinction.CCM89", "type", "Clayton, Cardelli and Mathis (1989) dust law."),
            Document::section("dust_maps/#SFD98", "Dust Maps", "SFD98"),
            Document::section("api/#orphan", "API", "Orphan"),
        ]
    }

    #[test]
    fn empty_corpus_builds_empty_index() {
        let index = IndexBuilder::default().build(&[]).unwrap();
        assert!(index.is_empty());
        assert_eq!(index.num_terms(), 0);
        assert_eq!(index.avg_doc_len(), 0.0);
    }

    #[test]
    fn duplicate_location_is_reported() {
        let docs = vec![
            Document::page("p1#ccm89", "p1", "CCM89", "dust law"),
            Document::page("p1#ccm89", "p1", "OD94", "dust law"),
        ];
        match IndexBuilder::default().build(&docs) {
            Err(CorpusError::DuplicateLocation { location, first, second }) => {
                assert_eq!(location, "p1#ccm89");
                assert_eq!((first, second), (0, 1));
            }
            other => panic!("expected duplicate location error, got {other:?}"),
        }
    }

    #[test]
    fn empty_page_field_is_malformed() {
        let docs = vec![Document::page("a", "", "A", "text")];
        assert!(matches!(IndexBuilder::default().build(&docs), Err(CorpusError::Malformed { index: 0, .. })));
    }

    #[test]
    fn anchored_records_attach_to_preceding_page() {
        let index = IndexBuilder::default().build(&corpus()).unwrap();
        let parents: Vec<Option<DocId>> = index.docs().iter().map(|d| d.parent).collect();
        assert_eq!(parents, vec![None, Some(0), None, Some(0), Some(2), None]);
        assert_eq!(index.doc(3).unwrap().category, Category::Other("type".into()));
    }

    #[test]
    fn parent_is_most_recent_page_record() {
        let docs = vec![
            Document::page("a/", "A", "A", "first block"),
            Document::page("a/#2", "A", "A", "second block"),
            Document::section("a/#s", "A", "S"),
        ];
        let index = IndexBuilder::default().build(&docs).unwrap();
        assert_eq!(index.doc(2).unwrap().parent, Some(1));
    }

    #[test]
    fn postings_record_fields_and_positions() {
        let docs = vec![Document::page("p1#ccm89", "p1", "CCM89 law", "Clayton Cardelli Mathis dust law")];
        let index = IndexBuilder::default().build(&docs).unwrap();
        let law = index.posting("law", 0).unwrap();
        assert_eq!(law.title_positions, vec![1]);
        assert_eq!(law.text_positions, vec![4]);
        assert_eq!(index.doc(0).unwrap().length, 7);
    }

    #[test]
    fn sharding_does_not_change_the_index() {
        let docs = corpus();
        let single = IndexBuilder::default().with_shard_size(usize::MAX).build(&docs).unwrap();
        let sharded = IndexBuilder::default().with_shard_size(1).with_threads(3).build(&docs).unwrap();
        assert_eq!(single, sharded);
    }
}
