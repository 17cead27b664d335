//! Collection wrapper that records calls into an `EventLog`

use std::sync::Arc;

use super::events::{OperationResult, OperationType};
use super::history::EventLog;
use crate::collection::Collection;
use crate::document::Document;
use crate::postlist::PostList;
use crate::termlist::{AllTermsList, PositionList, TermList};
use crate::types::{DocCount, DocId, DocLength, TermCount};
use crate::Result;

/// Delegates every call to `inner`, logging document opens, posting list
/// opens, mutations and transaction calls.
pub struct RecordingCollection {
    inner: Arc<dyn Collection>,
    log: EventLog,
}

impl RecordingCollection {
    pub fn new(inner: Arc<dyn Collection>) -> Self {
        Self {
            inner,
            log: EventLog::new(),
        }
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn inner(&self) -> &Arc<dyn Collection> {
        &self.inner
    }

    fn record<T>(
        &self,
        op_type: OperationType,
        did: DocId,
        call: impl FnOnce() -> Result<T>,
    ) -> Result<T> {
        let op_id = self.log.record_invoke(op_type);
        let result = call();
        let outcome = match &result {
            Ok(_) => OperationResult::Success,
            Err(err) if err.is_not_found() => OperationResult::NotFound { did },
            Err(err) => OperationResult::Error {
                message: err.to_string(),
            },
        };
        self.log.record_return(op_id, outcome);
        result
    }
}

impl Collection for RecordingCollection {
    fn doc_count(&self) -> DocCount {
        self.inner.doc_count()
    }

    fn last_docid(&self) -> DocId {
        self.inner.last_docid()
    }

    fn average_doc_length(&self) -> f64 {
        self.inner.average_doc_length()
    }

    fn doc_length(&self, did: DocId) -> Result<DocLength> {
        self.inner.doc_length(did)
    }

    fn term_frequency(&self, term: &str) -> DocCount {
        self.inner.term_frequency(term)
    }

    fn collection_frequency(&self, term: &str) -> TermCount {
        self.inner.collection_frequency(term)
    }

    fn term_exists(&self, term: &str) -> bool {
        self.inner.term_exists(term)
    }

    fn do_open_posting_list(&self, term: &str) -> Result<Box<dyn PostList>> {
        self.inner.do_open_posting_list(term)
    }

    fn open_posting_list(&self, term: &str) -> Result<Box<dyn PostList>> {
        let op_type = OperationType::OpenPostingList {
            term: term.to_string(),
        };
        self.record(op_type, 0, || self.inner.open_posting_list(term))
    }

    fn open_document(&self, did: DocId, lazy: bool) -> Result<Document> {
        let op_type = OperationType::OpenDocument { did, lazy };
        self.record(op_type, did, || self.inner.open_document(did, lazy))
    }

    fn open_term_list(&self, did: DocId) -> Result<TermList> {
        self.inner.open_term_list(did)
    }

    fn open_position_list(&self, did: DocId, term: &str) -> Result<PositionList> {
        self.inner.open_position_list(did, term)
    }

    fn open_all_terms(&self) -> Result<AllTermsList> {
        self.inner.open_all_terms()
    }

    fn reopen(&self) -> Result<()> {
        self.inner.reopen()
    }

    fn keep_alive(&self) -> Result<()> {
        self.inner.keep_alive()
    }

    fn flush(&self) -> Result<()> {
        self.inner.flush()
    }

    fn begin_transaction(&self) -> Result<()> {
        self.record(OperationType::BeginTransaction, 0, || {
            self.inner.begin_transaction()
        })
    }

    fn commit_transaction(&self) -> Result<()> {
        self.record(OperationType::CommitTransaction, 0, || {
            self.inner.commit_transaction()
        })
    }

    fn cancel_transaction(&self) -> Result<()> {
        self.record(OperationType::CancelTransaction, 0, || {
            self.inner.cancel_transaction()
        })
    }

    fn add_document(&self, doc: &Document) -> Result<DocId> {
        let op_id = self.log.record_invoke(OperationType::AddDocument);
        let result = self.inner.add_document(doc);
        let outcome = match &result {
            Ok(did) => OperationResult::DocumentAdded { did: *did },
            Err(err) => OperationResult::Error {
                message: err.to_string(),
            },
        };
        self.log.record_return(op_id, outcome);
        result
    }

    fn delete_document(&self, did: DocId) -> Result<()> {
        self.record(OperationType::DeleteDocument { did }, did, || {
            self.inner.delete_document(did)
        })
    }

    fn replace_document(&self, did: DocId, doc: &Document) -> Result<()> {
        self.record(OperationType::ReplaceDocument { did }, did, || {
            self.inner.replace_document(did, doc)
        })
    }

    fn request_document(&self, did: DocId) {
        self.inner.request_document(did)
    }

    fn collect_document(&self, did: DocId) -> Result<Document> {
        self.inner.collect_document(did)
    }

    fn description(&self) -> String {
        format!("Recording({})", self.inner.description())
    }
}
