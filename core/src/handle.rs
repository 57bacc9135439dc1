use crate::builder::IndexBuilder;
use crate::document::Document;
use crate::error::{CorpusError, IndexFormatError};
use crate::index::InvertedIndex;
use crate::persist::{load_index, IndexPaths};
use parking_lot::RwLock;
use std::sync::Arc;

/// Owns the index that queries currently run against.
///
/// Readers take an `Arc` snapshot and keep it for the whole query, so a swap
/// never shows up half-way through one. Replacements are staged completely
/// before the swap; a failed rebuild or reload leaves the current index alone.
#[derive(Debug)]
pub struct IndexHandle {
    current: RwLock<Arc<InvertedIndex>>,
}

impl IndexHandle {
    pub fn new(index: InvertedIndex) -> Self {
        Self { current: RwLock::new(Arc::new(index)) }
    }

    pub fn current(&self) -> Arc<InvertedIndex> { self.current.read().clone() }

    /// Swap in `index`, returning the one it replaced.
    pub fn replace(&self, index: InvertedIndex) -> Arc<InvertedIndex> {
        let num_docs = index.num_docs();
        let prev = std::mem::replace(&mut *self.current.write(), Arc::new(index));
        tracing::info!(num_docs, previous_docs = prev.num_docs(), "index swapped");
        prev
    }

    pub fn rebuild(&self, builder: &IndexBuilder, documents: &[Document]) -> Result<Arc<InvertedIndex>, CorpusError> {
        let staged = builder.build(documents)?;
        Ok(self.replace(staged))
    }

    pub fn reload(&self, paths: &IndexPaths) -> Result<Arc<InvertedIndex>, IndexFormatError> {
        let staged = load_index(paths)?;
        Ok(self.replace(staged))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::TokenizerConfig;

    #[test]
    fn snapshots_survive_a_swap() {
        let handle = IndexHandle::new(InvertedIndex::empty(TokenizerConfig::default()));
        let before = handle.current();

        let docs = vec![Document::page("p1#ccm89", "p1", "CCM89", "Clayton Cardelli Mathis dust law")];
        handle.rebuild(&IndexBuilder::default(), &docs).unwrap();

        assert!(before.is_empty());
        assert_eq!(handle.current().num_docs(), 1);
    }

    #[test]
    fn failed_rebuild_keeps_current_index() {
        let docs = vec![Document::page("a", "p", "A", "dust")];
        let handle = IndexHandle::new(IndexBuilder::default().build(&docs).unwrap());

        let broken = vec![Document::page("a", "p", "A", "dust"), Document::page("a", "p", "B", "law")];
        assert!(handle.rebuild(&IndexBuilder::default(), &broken).is_err());
        assert_eq!(handle.current().num_docs(), 1);
        assert!(handle.current().postings("law").is_none());
    }

    #[test]
    fn failed_reload_keeps_current_index() {
        let dir = tempfile::tempdir().unwrap();
        let docs = vec![Document::page("a", "p", "A", "dust")];
        let handle = IndexHandle::new(IndexBuilder::default().build(&docs).unwrap());
        assert!(handle.reload(&IndexPaths::new(dir.path())).is_err());
        assert_eq!(handle.current().num_docs(), 1);
    }
}
