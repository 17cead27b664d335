//! Writable in-memory collection

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use roaring::RoaringBitmap;
use tracing::{debug, warn};

use super::{Collection, TransactionFlag};
use crate::config::CollectionSettings;
use crate::document::{Document, DocumentRecord, DocumentSource, TermEntry};
use crate::error::CuttleError;
use crate::postlist::{Bm25Weight, PostList, TermPostList, TermPosting};
use crate::termlist::{AllTermsEntry, AllTermsList, PositionList, TermList, TermListEntry};
use crate::types::{DocCount, DocId, DocLength, TermCount, ValueNo};
use crate::Result;

/// Documents plus the inverted index built from them
#[derive(Clone, Debug, Default)]
struct MemoryStore {
    documents: BTreeMap<DocId, DocumentRecord>,
    /// Term to (docid to wdf)
    postings: BTreeMap<String, BTreeMap<DocId, TermCount>>,
    live: RoaringBitmap,
    total_length: u64,
    last_docid: DocId,
}

impl MemoryStore {
    fn record(&self, did: DocId) -> Result<&DocumentRecord> {
        self.documents.get(&did).ok_or(CuttleError::DocNotFound(did))
    }

    fn insert(&mut self, did: DocId, record: DocumentRecord) {
        self.remove(did);

        for (term, entry) in &record.terms {
            self.postings
                .entry(term.clone())
                .or_default()
                .insert(did, entry.wdf);
        }
        self.total_length += record.length();
        self.live.insert(did);
        self.last_docid = self.last_docid.max(did);
        self.documents.insert(did, record);
    }

    fn remove(&mut self, did: DocId) -> Option<DocumentRecord> {
        let record = self.documents.remove(&did)?;
        for term in record.terms.keys() {
            if let Some(docs) = self.postings.get_mut(term) {
                docs.remove(&did);
                if docs.is_empty() {
                    self.postings.remove(term);
                }
            }
        }
        self.total_length -= record.length();
        self.live.remove(did);
        Some(record)
    }

    fn doc_count(&self) -> DocCount {
        self.live.len() as DocCount
    }

    /// Roll back to `backup`; docids handed out since it was taken stay used
    fn restore(&mut self, backup: MemoryStore) {
        let last_docid = self.last_docid;
        *self = backup;
        self.last_docid = self.last_docid.max(last_docid);
    }
}

/// Prefetched documents kept before `request_document` stops buffering
const MAX_PREFETCHED: usize = 1024;

/// Shared store; lazy document handles hold a weak reference to it
#[derive(Debug, Default)]
struct StoreCell {
    inner: RwLock<MemoryStore>,
}

impl DocumentSource for StoreCell {
    fn fetch_data(&self, did: DocId) -> Result<String> {
        Ok(self.inner.read().record(did)?.data.clone())
    }

    fn fetch_values(&self, did: DocId) -> Result<BTreeMap<ValueNo, String>> {
        Ok(self.inner.read().record(did)?.values.clone())
    }

    fn fetch_terms(&self, did: DocId) -> Result<BTreeMap<String, TermEntry>> {
        Ok(self.inner.read().record(did)?.terms.clone())
    }
}

/// Writable collection held entirely in memory.
///
/// Lazy document opens skip the existence check unless
/// `CollectionSettings::validate_lazy_opens` is set; a lazily opened handle
/// for a missing document reads every value as empty.
pub struct InMemoryCollection {
    store: Arc<StoreCell>,
    settings: CollectionSettings,
    transaction: TransactionFlag,
    /// Store contents when the open transaction began
    backup: Mutex<Option<MemoryStore>>,
    prefetched: Mutex<HashMap<DocId, Document>>,
    revision: AtomicU64,
}

impl Default for InMemoryCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCollection {
    pub fn new() -> Self {
        Self::with_settings(CollectionSettings::default())
    }

    pub fn with_settings(settings: CollectionSettings) -> Self {
        Self {
            store: Arc::new(StoreCell::default()),
            settings,
            transaction: TransactionFlag::new(),
            backup: Mutex::new(None),
            prefetched: Mutex::new(HashMap::new()),
            revision: AtomicU64::new(0),
        }
    }

    pub fn settings(&self) -> &CollectionSettings {
        &self.settings
    }

    /// Number of flushes so far
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Relaxed)
    }

    pub fn in_transaction(&self) -> bool {
        self.transaction.is_open()
    }

    fn source(&self) -> Weak<dyn DocumentSource> {
        let weak: Weak<StoreCell> = Arc::downgrade(&self.store);
        weak
    }

    fn exists(&self, did: DocId) -> bool {
        self.store.inner.read().live.contains(did)
    }
}

impl Collection for InMemoryCollection {
    fn doc_count(&self) -> DocCount {
        self.store.inner.read().doc_count()
    }

    fn last_docid(&self) -> DocId {
        self.store.inner.read().last_docid
    }

    fn average_doc_length(&self) -> f64 {
        let store = self.store.inner.read();
        match store.doc_count() {
            0 => 0.0,
            n => store.total_length as f64 / n as f64,
        }
    }

    fn doc_length(&self, did: DocId) -> Result<DocLength> {
        Ok(self.store.inner.read().record(did)?.length())
    }

    fn term_frequency(&self, term: &str) -> DocCount {
        self.store
            .inner
            .read()
            .postings
            .get(term)
            .map_or(0, |docs| docs.len() as DocCount)
    }

    fn collection_frequency(&self, term: &str) -> TermCount {
        self.store
            .inner
            .read()
            .postings
            .get(term)
            .map_or(0, |docs| docs.values().sum())
    }

    fn term_exists(&self, term: &str) -> bool {
        self.store
            .inner
            .read()
            .postings
            .get(term)
            .is_some_and(|docs| !docs.is_empty())
    }

    fn do_open_posting_list(&self, term: &str) -> Result<Box<dyn PostList>> {
        let store = self.store.inner.read();
        let docs = match store.postings.get(term) {
            Some(docs) => docs,
            None => return Ok(Box::new(crate::postlist::EmptyPostList::new())),
        };

        let mut postings = Vec::with_capacity(docs.len());
        for (&did, &wdf) in docs {
            postings.push(TermPosting {
                did,
                wdf,
                doc_length: store.record(did)?.length(),
            });
        }

        let doc_count = store.doc_count();
        let avg_length = match doc_count {
            0 => 0.0,
            n => store.total_length as f64 / n as f64,
        };
        let weight = Bm25Weight::new(
            self.settings.weighting,
            doc_count,
            postings.len() as DocCount,
            avg_length,
        );
        debug!(term, termfreq = postings.len(), "opened term posting list");
        Ok(Box::new(TermPostList::new(term, postings, weight)))
    }

    fn open_document(&self, did: DocId, lazy: bool) -> Result<Document> {
        if did == 0 {
            return Err(CuttleError::DocNotFound(did));
        }
        if (!lazy || self.settings.validate_lazy_opens) && !self.exists(did) {
            return Err(CuttleError::DocNotFound(did));
        }
        Ok(Document::lazy(did, self.source()))
    }

    fn open_term_list(&self, did: DocId) -> Result<TermList> {
        let store = self.store.inner.read();
        let entries = store
            .record(did)?
            .terms
            .iter()
            .map(|(term, entry)| TermListEntry {
                term: term.clone(),
                wdf: entry.wdf,
                positions_len: entry.positions.len() as TermCount,
            })
            .collect();
        Ok(TermList::new(entries))
    }

    fn open_position_list(&self, did: DocId, term: &str) -> Result<PositionList> {
        let store = self.store.inner.read();
        let positions = store
            .record(did)?
            .terms
            .get(term)
            .map(|entry| entry.positions.clone())
            .unwrap_or_default();
        Ok(PositionList::new(positions))
    }

    fn open_all_terms(&self) -> Result<AllTermsList> {
        let store = self.store.inner.read();
        let entries = store
            .postings
            .iter()
            .map(|(term, docs)| AllTermsEntry {
                term: term.clone(),
                termfreq: docs.len() as DocCount,
                collection_freq: docs.values().sum(),
            })
            .collect();
        Ok(AllTermsList::new(entries))
    }

    fn flush(&self) -> Result<()> {
        let revision = self.revision.fetch_add(1, Ordering::Relaxed) + 1;
        self.prefetched.lock().clear();
        debug!(revision, "flushed in-memory collection");
        Ok(())
    }

    fn begin_transaction(&self) -> Result<()> {
        self.transaction.begin()?;
        self.flush()?;
        *self.backup.lock() = Some(self.store.inner.read().clone());
        Ok(())
    }

    fn commit_transaction(&self) -> Result<()> {
        self.transaction.commit()?;
        self.backup.lock().take();
        self.flush()
    }

    fn cancel_transaction(&self) -> Result<()> {
        self.transaction.cancel()?;
        if let Some(backup) = self.backup.lock().take() {
            self.store.inner.write().restore(backup);
        }
        self.prefetched.lock().clear();
        Ok(())
    }

    fn add_document(&self, doc: &Document) -> Result<DocId> {
        // Materialise before locking: `doc` may read through to this store
        let record = doc.to_record()?;
        let mut store = self.store.inner.write();
        let did = store.last_docid.checked_add(1).ok_or_else(|| {
            CuttleError::InvalidOperation("docid space exhausted".to_string())
        })?;
        store.insert(did, record);
        Ok(did)
    }

    fn delete_document(&self, did: DocId) -> Result<()> {
        let removed = self.store.inner.write().remove(did);
        if removed.is_none() {
            return Err(CuttleError::DocNotFound(did));
        }
        self.prefetched.lock().remove(&did);
        Ok(())
    }

    fn replace_document(&self, did: DocId, doc: &Document) -> Result<()> {
        if did == 0 {
            return Err(CuttleError::InvalidArgument(
                "docid 0 is reserved".to_string(),
            ));
        }
        let record = doc.to_record()?;
        self.store.inner.write().insert(did, record);
        self.prefetched.lock().remove(&did);
        Ok(())
    }

    fn request_document(&self, did: DocId) {
        let record = match self.store.inner.read().documents.get(&did) {
            Some(record) => record.clone(),
            None => return,
        };
        let mut prefetched = self.prefetched.lock();
        if prefetched.len() >= MAX_PREFETCHED && !prefetched.contains_key(&did) {
            // collect_document falls back to a strict open
            debug!(did, "prefetch buffer full");
            return;
        }
        prefetched.insert(did, Document::from_record(did, record));
    }

    fn collect_document(&self, did: DocId) -> Result<Document> {
        if let Some(doc) = self.prefetched.lock().remove(&did) {
            return Ok(doc);
        }
        self.open_document(did, false)
    }

    fn description(&self) -> String {
        format!(
            "InMemoryCollection(docs={}, last_docid={})",
            self.doc_count(),
            self.last_docid()
        )
    }
}

impl Drop for InMemoryCollection {
    fn drop(&mut self) {
        if self.transaction.force_clear() {
            warn!("in-memory collection dropped with a transaction open; rolling back");
            if let Some(backup) = self.backup.lock().take() {
                self.store.inner.write().restore(backup);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with_value(slot: ValueNo, value: &str) -> Document {
        let mut doc = Document::new();
        doc.add_value(slot, value).unwrap();
        doc
    }

    fn text_doc(words: &[&str]) -> Document {
        let mut doc = Document::new();
        for (pos, word) in words.iter().enumerate() {
            doc.add_posting(*word, pos as u32 + 1, 1).unwrap();
        }
        doc
    }

    #[test]
    fn test_add_assigns_dense_docids() {
        let coll = InMemoryCollection::new();
        assert_eq!(coll.add_document(&Document::new()).unwrap(), 1);
        assert_eq!(coll.add_document(&Document::new()).unwrap(), 2);
        assert_eq!(coll.doc_count(), 2);
        assert_eq!(coll.last_docid(), 2);
    }

    #[test]
    fn test_docids_not_reused_after_delete() {
        let coll = InMemoryCollection::new();
        coll.add_document(&Document::new()).unwrap();
        coll.add_document(&Document::new()).unwrap();
        coll.delete_document(2).unwrap();
        assert_eq!(coll.doc_count(), 1);
        assert_eq!(coll.last_docid(), 2);
        assert_eq!(coll.add_document(&Document::new()).unwrap(), 3);
    }

    #[test]
    fn test_statistics() {
        let coll = InMemoryCollection::new();
        coll.add_document(&text_doc(&["rust", "fast", "rust"])).unwrap();
        coll.add_document(&text_doc(&["python"])).unwrap();

        assert_eq!(coll.term_frequency("rust"), 1);
        assert_eq!(coll.collection_frequency("rust"), 2);
        assert!(coll.term_exists("python"));
        assert!(!coll.term_exists("java"));
        assert_eq!(coll.term_frequency("java"), 0);
        assert_eq!(coll.doc_length(1).unwrap(), 3);
        assert_eq!(coll.average_doc_length(), 2.0);
        assert!(coll.doc_length(9).unwrap_err().is_not_found());
    }

    #[test]
    fn test_term_exists_agrees_with_frequency_after_delete() {
        let coll = InMemoryCollection::new();
        coll.add_document(&text_doc(&["only"])).unwrap();
        coll.delete_document(1).unwrap();
        assert!(!coll.term_exists("only"));
        assert_eq!(coll.term_frequency("only"), 0);
        assert!(coll.open_posting_list("only").unwrap().at_end());
    }

    #[test]
    fn test_open_document_lazy_and_strict() {
        let coll = InMemoryCollection::new();
        coll.add_document(&doc_with_value(0, "x")).unwrap();

        assert!(coll.open_document(1, false).is_ok());
        assert!(coll.open_document(2, false).unwrap_err().is_not_found());

        // Lazy open skips the existence check; the missing doc reads empty
        let ghost = coll.open_document(2, true).unwrap();
        assert_eq!(ghost.value(0), "");

        let strict = InMemoryCollection::with_settings(
            CollectionSettings::default().with_validate_lazy_opens(true),
        );
        strict.add_document(&doc_with_value(0, "x")).unwrap();
        assert!(strict.open_document(2, true).unwrap_err().is_not_found());
    }

    #[test]
    fn test_lazy_handle_sees_replacement_until_forced() {
        let coll = InMemoryCollection::new();
        coll.add_document(&doc_with_value(0, "old")).unwrap();

        let doc = coll.open_document(1, false).unwrap();
        coll.replace_document(1, &doc_with_value(0, "new")).unwrap();
        assert_eq!(doc.value(0), "new");

        let forced = coll.open_document(1, false).unwrap();
        forced.serialise().unwrap();
        coll.replace_document(1, &doc_with_value(0, "newer")).unwrap();
        assert_eq!(forced.value(0), "new");
    }

    #[test]
    fn test_term_and_position_lists() {
        let coll = InMemoryCollection::new();
        coll.add_document(&text_doc(&["b", "a", "b"])).unwrap();

        let terms: Vec<(String, TermCount)> = coll
            .open_term_list(1)
            .unwrap()
            .map(|e| (e.term, e.wdf))
            .collect();
        assert_eq!(terms, vec![("a".to_string(), 1), ("b".to_string(), 2)]);

        let positions: Vec<u32> = coll.open_position_list(1, "b").unwrap().collect();
        assert_eq!(positions, vec![1, 3]);
        assert!(coll.open_position_list(1, "zzz").unwrap().is_empty());
        assert!(coll.open_position_list(5, "b").unwrap_err().is_not_found());
        assert!(coll.open_term_list(5).unwrap_err().is_not_found());

        let all: Vec<String> = coll.open_all_terms().unwrap().map(|e| e.term).collect();
        assert_eq!(all, vec!["a", "b"]);
    }

    #[test]
    fn test_transaction_cancel_restores() {
        let coll = InMemoryCollection::new();
        coll.add_document(&doc_with_value(0, "kept")).unwrap();

        coll.begin_transaction().unwrap();
        coll.add_document(&doc_with_value(0, "dropped")).unwrap();
        coll.delete_document(1).unwrap();
        assert_eq!(coll.doc_count(), 1);
        coll.cancel_transaction().unwrap();

        assert_eq!(coll.doc_count(), 1);
        assert_eq!(coll.open_document(1, false).unwrap().value(0), "kept");
        assert!(coll.open_document(2, false).is_err());
    }

    #[test]
    fn test_cancel_keeps_docids_used() {
        let coll = InMemoryCollection::new();
        coll.add_document(&doc_with_value(0, "kept")).unwrap();

        coll.begin_transaction().unwrap();
        assert_eq!(coll.add_document(&doc_with_value(0, "dropped")).unwrap(), 2);
        coll.cancel_transaction().unwrap();

        assert_eq!(coll.last_docid(), 2);
        assert_eq!(coll.add_document(&doc_with_value(0, "next")).unwrap(), 3);
        assert!(coll.open_document(2, false).unwrap_err().is_not_found());
    }

    #[test]
    fn test_drop_rollback_keeps_docids_used() {
        let coll = InMemoryCollection::new();
        coll.begin_transaction().unwrap();
        coll.add_document(&Document::new()).unwrap();
        coll.add_document(&Document::new()).unwrap();

        let store = coll.store.clone();
        drop(coll);
        let store = store.inner.read();
        assert_eq!(store.doc_count(), 0);
        assert_eq!(store.last_docid, 2);
    }

    #[test]
    fn test_transaction_commit_keeps_changes() {
        let coll = InMemoryCollection::new();
        let before = coll.revision();
        coll.begin_transaction().unwrap();
        assert!(coll.in_transaction());
        coll.add_document(&Document::new()).unwrap();
        coll.commit_transaction().unwrap();
        assert!(!coll.in_transaction());
        assert_eq!(coll.doc_count(), 1);
        assert!(coll.revision() > before);
    }

    #[test]
    fn test_transaction_misuse_is_program_error() {
        let coll = InMemoryCollection::new();
        assert!(coll.commit_transaction().unwrap_err().is_program_error());
        assert!(coll.cancel_transaction().unwrap_err().is_program_error());

        coll.begin_transaction().unwrap();
        assert!(coll.begin_transaction().unwrap_err().is_program_error());
        coll.commit_transaction().unwrap();
    }

    #[test]
    fn test_drop_with_open_transaction_does_not_panic() {
        let coll = InMemoryCollection::new();
        coll.begin_transaction().unwrap();
        coll.add_document(&Document::new()).unwrap();
        drop(coll);
    }

    #[test]
    fn test_prefetch() {
        let coll = InMemoryCollection::new();
        coll.add_document(&doc_with_value(0, "v")).unwrap();

        coll.request_document(1);
        coll.request_document(7);
        let doc = coll.collect_document(1).unwrap();
        assert!(!doc.is_lazy());
        assert_eq!(doc.value(0), "v");

        // Not prefetched: falls back to a validating open
        assert!(coll.collect_document(7).unwrap_err().is_not_found());
        assert_eq!(coll.collect_document(1).unwrap().docid(), 1);
    }

    #[test]
    fn test_uncollected_prefetches_are_released() {
        let coll = InMemoryCollection::new();
        coll.add_document(&doc_with_value(0, "v")).unwrap();
        coll.add_document(&doc_with_value(0, "w")).unwrap();

        coll.request_document(1);
        coll.request_document(2);
        assert_eq!(coll.prefetched.lock().len(), 2);
        coll.flush().unwrap();
        assert!(coll.prefetched.lock().is_empty());

        coll.begin_transaction().unwrap();
        coll.request_document(1);
        coll.commit_transaction().unwrap();
        assert!(coll.prefetched.lock().is_empty());
        assert_eq!(coll.collect_document(1).unwrap().value(0), "v");
    }

    #[test]
    fn test_prefetch_buffer_is_capped() {
        let coll = InMemoryCollection::new();
        for _ in 0..MAX_PREFETCHED + 10 {
            coll.add_document(&doc_with_value(0, "v")).unwrap();
        }
        for did in 1..=(MAX_PREFETCHED as DocId + 10) {
            coll.request_document(did);
        }
        assert_eq!(coll.prefetched.lock().len(), MAX_PREFETCHED);

        // Past the cap, collection still works through a strict open
        let last = MAX_PREFETCHED as DocId + 10;
        assert_eq!(coll.collect_document(last).unwrap().value(0), "v");
    }

    #[test]
    fn test_replace_document_rejects_zero() {
        let coll = InMemoryCollection::new();
        assert!(matches!(
            coll.replace_document(0, &Document::new()),
            Err(CuttleError::InvalidArgument(_))
        ));
    }
}
