//! Reference-counted, lazily populated document handle
//!
//! Documents obtained from a collection are loaded lazily: each of data,
//! values and terms is fetched from the collection on first use. Until a
//! field has been fetched the handle observes whatever the collection holds
//! at that moment, so a document edited through the same collection before
//! being read shows the new version. `serialise` (or `materialise`) forces
//! every field and detaches the handle from its collection.
//!
//! Cloning a `Document` is cheap and the clones share state.

mod record;

pub use record::{DocumentRecord, TermEntry, RECORD_VERSION};

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::trace;

use crate::error::CuttleError;
use crate::termlist::{TermList, TermListEntry};
use crate::types::{DocId, TermCount, TermPos, ValueNo, NO_DOCUMENT};
use crate::Result;

/// Backend side of lazy document loading
pub trait DocumentSource: Send + Sync {
    fn fetch_data(&self, did: DocId) -> Result<String>;

    fn fetch_values(&self, did: DocId) -> Result<BTreeMap<ValueNo, String>>;

    fn fetch_terms(&self, did: DocId) -> Result<BTreeMap<String, TermEntry>>;
}

struct DocumentState {
    did: DocId,
    source: Option<Weak<dyn DocumentSource>>,
    data: Option<String>,
    values: Option<BTreeMap<ValueNo, String>>,
    terms: Option<BTreeMap<String, TermEntry>>,
}

impl DocumentState {
    fn source(&self) -> Result<Arc<dyn DocumentSource>> {
        self.source
            .as_ref()
            .and_then(Weak::upgrade)
            .ok_or_else(|| {
                CuttleError::Backend(format!(
                    "collection backing document {} has been closed",
                    self.did
                ))
            })
    }

    fn need_data(&mut self) -> Result<&mut String> {
        if self.data.is_none() {
            let data = self.source()?.fetch_data(self.did)?;
            self.data = Some(data);
        }
        Ok(self.data.get_or_insert_with(String::new))
    }

    fn need_values(&mut self) -> Result<&mut BTreeMap<ValueNo, String>> {
        if self.values.is_none() {
            let values = self.source()?.fetch_values(self.did)?;
            self.values = Some(values);
        }
        Ok(self.values.get_or_insert_with(BTreeMap::new))
    }

    fn need_terms(&mut self) -> Result<&mut BTreeMap<String, TermEntry>> {
        if self.terms.is_none() {
            let terms = self.source()?.fetch_terms(self.did)?;
            self.terms = Some(terms);
        }
        Ok(self.terms.get_or_insert_with(BTreeMap::new))
    }

    fn materialise(&mut self) -> Result<()> {
        self.need_data()?;
        self.need_values()?;
        self.need_terms()?;
        self.source = None;
        Ok(())
    }
}

/// A document: opaque data, numbered values, and terms with positions
#[derive(Clone)]
pub struct Document {
    internal: Arc<Mutex<DocumentState>>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a new empty document, not bound to any collection
    pub fn new() -> Self {
        Self::from_record(NO_DOCUMENT, DocumentRecord::default())
    }

    /// Create a fully loaded handle
    pub fn from_record(did: DocId, record: DocumentRecord) -> Self {
        Self {
            internal: Arc::new(Mutex::new(DocumentState {
                did,
                source: None,
                data: Some(record.data),
                values: Some(record.values),
                terms: Some(record.terms),
            })),
        }
    }

    /// Create a handle whose fields are fetched from `source` on first use
    pub fn lazy(did: DocId, source: Weak<dyn DocumentSource>) -> Self {
        Self {
            internal: Arc::new(Mutex::new(DocumentState {
                did,
                source: Some(source),
                data: None,
                values: None,
                terms: None,
            })),
        }
    }

    /// Document id in the collection it came from, or 0
    pub fn docid(&self) -> DocId {
        self.internal.lock().did
    }

    /// Get a value by slot number.
    ///
    /// Returns an empty string if the slot holds no value or the values
    /// cannot be fetched.
    pub fn value(&self, slot: ValueNo) -> String {
        let mut state = self.internal.lock();
        let did = state.did;
        match state.need_values() {
            Ok(values) => values.get(&slot).cloned().unwrap_or_default(),
            Err(err) => {
                trace!(did, slot, error = %err, "values unavailable, reading as empty");
                String::new()
            }
        }
    }

    /// Set a value, replacing any existing one. An empty value removes the slot.
    pub fn add_value(&mut self, slot: ValueNo, value: impl Into<String>) -> Result<()> {
        let value = value.into();
        let mut state = self.internal.lock();
        let values = state.need_values()?;
        if value.is_empty() {
            values.remove(&slot);
        } else {
            values.insert(slot, value);
        }
        Ok(())
    }

    pub fn remove_value(&mut self, slot: ValueNo) -> Result<()> {
        self.internal.lock().need_values()?.remove(&slot);
        Ok(())
    }

    pub fn clear_values(&mut self) {
        self.internal.lock().values = Some(BTreeMap::new());
    }

    /// All non-empty values in slot order
    pub fn values(&self) -> Result<Vec<(ValueNo, String)>> {
        let mut state = self.internal.lock();
        Ok(state
            .need_values()?
            .iter()
            .map(|(slot, value)| (*slot, value.clone()))
            .collect())
    }

    pub fn values_count(&self) -> Result<usize> {
        Ok(self.internal.lock().need_values()?.len())
    }

    /// Get the stored data.
    ///
    /// Potentially expensive; never call this on a per-candidate path inside
    /// a posting list. Put anything a filter needs into a value instead.
    pub fn data(&self) -> Result<String> {
        Ok(self.internal.lock().need_data()?.clone())
    }

    pub fn set_data(&mut self, data: impl Into<String>) {
        self.internal.lock().data = Some(data.into());
    }

    /// Add a term without positional information
    pub fn add_term(&mut self, term: impl Into<String>, wdfinc: TermCount) -> Result<()> {
        let term = term.into();
        let mut state = self.internal.lock();
        let entry = state.need_terms()?.entry(term).or_default();
        entry.wdf = entry.wdf.saturating_add(wdfinc);
        Ok(())
    }

    /// Add a term with wdf 0, for boolean filtering
    pub fn add_boolean_term(&mut self, term: impl Into<String>) -> Result<()> {
        self.add_term(term, 0)
    }

    /// Add an occurrence of a term at a position.
    ///
    /// A position already recorded for the term is not duplicated, but the
    /// wdf is still increased by `wdfinc`.
    pub fn add_posting(
        &mut self,
        term: impl Into<String>,
        pos: TermPos,
        wdfinc: TermCount,
    ) -> Result<()> {
        let term = term.into();
        let mut state = self.internal.lock();
        let entry = state.need_terms()?.entry(term).or_default();
        entry.insert_position(pos);
        entry.wdf = entry.wdf.saturating_add(wdfinc);
        Ok(())
    }

    /// Remove a term and all its postings
    pub fn remove_term(&mut self, term: &str) -> Result<()> {
        let mut state = self.internal.lock();
        let did = state.did;
        if state.need_terms()?.remove(term).is_none() {
            return Err(CuttleError::InvalidArgument(format!(
                "term '{}' is not in document {}",
                term, did
            )));
        }
        Ok(())
    }

    /// Remove one posting of a term; the wdf is decreased by `wdfdec`, floored at 0.
    ///
    /// The term keeps indexing the document even when its last position is
    /// removed; use `remove_term` to drop it entirely.
    pub fn remove_posting(&mut self, term: &str, pos: TermPos, wdfdec: TermCount) -> Result<()> {
        let mut state = self.internal.lock();
        let did = state.did;
        let entry = state.need_terms()?.get_mut(term).ok_or_else(|| {
            CuttleError::InvalidArgument(format!("term '{}' is not in document {}", term, did))
        })?;
        if !entry.remove_position(pos) {
            return Err(CuttleError::InvalidArgument(format!(
                "term '{}' has no posting at position {} in document {}",
                term, pos, did
            )));
        }
        entry.wdf = entry.wdf.saturating_sub(wdfdec);
        Ok(())
    }

    pub fn clear_terms(&mut self) {
        self.internal.lock().terms = Some(BTreeMap::new());
    }

    /// Number of distinct terms indexing this document
    pub fn termlist_count(&self) -> Result<usize> {
        Ok(self.internal.lock().need_terms()?.len())
    }

    pub fn termlist(&self) -> Result<TermList> {
        let mut state = self.internal.lock();
        let entries = state
            .need_terms()?
            .iter()
            .map(|(term, entry)| TermListEntry {
                term: term.clone(),
                wdf: entry.wdf,
                positions_len: entry.positions.len() as TermCount,
            })
            .collect();
        Ok(TermList::new(entries))
    }

    /// Force every field to load and detach from the source collection
    pub fn materialise(&self) -> Result<()> {
        self.internal.lock().materialise()
    }

    /// Snapshot of every field, forcing a full load
    pub fn to_record(&self) -> Result<DocumentRecord> {
        let mut state = self.internal.lock();
        state.materialise()?;
        Ok(DocumentRecord {
            data: state.data.clone().unwrap_or_default(),
            values: state.values.clone().unwrap_or_default(),
            terms: state.terms.clone().unwrap_or_default(),
        })
    }

    /// Serialise into the document wire form.
    ///
    /// Forces every lazily loaded field, so later changes to the source
    /// collection are no longer observed through this handle.
    pub fn serialise(&self) -> Result<Vec<u8>> {
        self.to_record()?.encode()
    }

    /// Rebuild a document from the output of `serialise`
    pub fn unserialise(data: &[u8]) -> Result<Self> {
        let record = DocumentRecord::decode(data)?;
        Ok(Self::from_record(NO_DOCUMENT, record))
    }

    /// Whether the handle still reads through to a collection
    pub fn is_lazy(&self) -> bool {
        self.internal.lock().source.is_some()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.internal.lock();
        f.debug_struct("Document")
            .field("did", &state.did)
            .field("lazy", &state.source.is_some())
            .field("data_loaded", &state.data.is_some())
            .field("values_loaded", &state.values.is_some())
            .field("terms_loaded", &state.terms.is_some())
            .finish()
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.internal.lock();
        write!(f, "Document(docid={}", state.did)?;
        if let Some(data) = &state.data {
            write!(f, ", data={:?}", data)?;
        }
        write!(f, ")")
    }
}
