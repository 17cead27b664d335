//! Collection accessor: the backend abstraction posting lists evaluate against
//!
//! A `Collection` reports statistics, opens documents and term-level lists,
//! and owns the single-writer transaction lifecycle. Read-only backends only
//! implement the query half; every mutation entry point has a default that
//! returns `CuttleError::Unsupported`.

mod memory;
mod transaction;

pub use memory::InMemoryCollection;
pub use transaction::TransactionFlag;

use tracing::debug;

use crate::document::Document;
use crate::error::CuttleError;
use crate::postlist::{EmptyPostList, PostList};
use crate::termlist::{AllTermsList, PositionList, TermList};
use crate::types::{DocCount, DocId, DocLength, TermCount};
use crate::Result;

/// Trait for accessing one document collection
pub trait Collection: Send + Sync {
    /// Number of live documents
    fn doc_count(&self) -> DocCount;

    /// Highest docid ever assigned; 0 for a collection that never held a document
    fn last_docid(&self) -> DocId;

    /// Mean document length over live documents
    fn average_doc_length(&self) -> f64;

    /// Length of a document: the sum of its terms' wdf
    fn doc_length(&self, did: DocId) -> Result<DocLength>;

    /// Number of documents indexed by `term`. May overestimate, never underestimates.
    fn term_frequency(&self, term: &str) -> DocCount;

    /// Sum of `term`'s wdf over all documents
    fn collection_frequency(&self, term: &str) -> TermCount;

    /// Whether `term` indexes any document.
    ///
    /// Normally equivalent to `term_frequency(term) != 0`, but may be more up
    /// to date than a cached frequency.
    fn term_exists(&self, term: &str) -> bool;

    /// Open the posting list of a term known to exist
    fn do_open_posting_list(&self, term: &str) -> Result<Box<dyn PostList>>;

    /// Open the posting list of a term.
    ///
    /// An absent term yields an empty list rather than an error, so a term
    /// missing from one collection looks the same as anywhere else.
    fn open_posting_list(&self, term: &str) -> Result<Box<dyn PostList>> {
        if !self.term_exists(term) {
            debug!(term, "term not in collection, using empty posting list");
            return Ok(Box::new(EmptyPostList::new()));
        }
        self.do_open_posting_list(term)
    }

    /// Open a document.
    ///
    /// With `lazy` set the backend may skip the existence check and defer
    /// loading every field; use it only where the caller validates what it
    /// reads. Without it, a missing document fails with `DocNotFound`.
    fn open_document(&self, did: DocId, lazy: bool) -> Result<Document>;

    fn open_term_list(&self, did: DocId) -> Result<TermList>;

    fn open_position_list(&self, did: DocId, term: &str) -> Result<PositionList>;

    fn open_all_terms(&self) -> Result<AllTermsList>;

    /// Move to the latest committed revision
    fn reopen(&self) -> Result<()> {
        Ok(())
    }

    /// Stop a remote connection from timing out
    fn keep_alive(&self) -> Result<()> {
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        Err(CuttleError::Unsupported("flush"))
    }

    fn begin_transaction(&self) -> Result<()> {
        Err(CuttleError::Unsupported("begin_transaction"))
    }

    fn commit_transaction(&self) -> Result<()> {
        Err(CuttleError::Unsupported("commit_transaction"))
    }

    fn cancel_transaction(&self) -> Result<()> {
        Err(CuttleError::Unsupported("cancel_transaction"))
    }

    fn add_document(&self, _doc: &Document) -> Result<DocId> {
        Err(CuttleError::Unsupported("add_document"))
    }

    fn delete_document(&self, _did: DocId) -> Result<()> {
        Err(CuttleError::Unsupported("delete_document"))
    }

    fn replace_document(&self, _did: DocId, _doc: &Document) -> Result<()> {
        Err(CuttleError::Unsupported("replace_document"))
    }

    /// Hint that `collect_document(did)` will follow. May be a no-op.
    fn request_document(&self, _did: DocId) {}

    /// Collect a document requested with `request_document`, or open it now
    fn collect_document(&self, did: DocId) -> Result<Document> {
        self.open_document(did, false)
    }

    fn description(&self) -> String;
}
