//! Posting list filtering documents by a stored value
//!
//! There is no index over value slots, so the list walks docids one by one
//! and reads the slot from each document. Gaps left by deleted documents are
//! skipped silently; a missing document is never an evaluation failure.

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use super::{CheckOutcome, PostList, Replacement};
use crate::collection::Collection;
use crate::error::CuttleError;
use crate::types::{DocCount, DocId, DocLength, ValueNo, Weight};
use crate::Result;

/// Matches documents whose value in `slot` lies in `[low, high]`, compared
/// byte-wise. Contributes no weight.
pub struct ValueRangePostList {
    /// `None` once the list has reached its end
    collection: Option<Arc<dyn Collection>>,
    current: DocId,
    last_docid: DocId,
    db_size: DocCount,
    slot: ValueNo,
    low: String,
    high: String,
    paranoid: bool,
}

impl ValueRangePostList {
    pub fn new(
        collection: Arc<dyn Collection>,
        slot: ValueNo,
        low: impl Into<String>,
        high: impl Into<String>,
    ) -> Self {
        let last_docid = collection.last_docid();
        let db_size = collection.doc_count();
        Self {
            collection: Some(collection),
            current: 0,
            last_docid,
            db_size,
            slot,
            low: low.into(),
            high: high.into(),
            paranoid: false,
        }
    }

    /// Verify on each advance that the collection's last docid has not moved
    pub fn with_paranoid_checks(mut self, enabled: bool) -> Self {
        self.paranoid = enabled;
        self
    }

    pub fn slot(&self) -> ValueNo {
        self.slot
    }

    fn in_range(&self, value: &str) -> bool {
        value >= self.low.as_str() && value <= self.high.as_str()
    }

    fn verify_last_docid(&self, collection: &dyn Collection) -> Result<()> {
        if self.paranoid && collection.last_docid() != self.last_docid {
            return Err(CuttleError::Corrupt(format!(
                "last docid changed from {} to {} during iteration",
                self.last_docid,
                collection.last_docid()
            )));
        }
        Ok(())
    }

    /// Test one candidate; absent documents never match
    fn matches(&self, collection: &dyn Collection, did: DocId) -> Result<bool> {
        let doc = match collection.open_document(did, true) {
            Ok(doc) => doc,
            Err(err) if err.is_not_found() => {
                trace!(did, "skipping missing document");
                return Ok(false);
            }
            Err(err) => return Err(err),
        };

        let value = doc.value(self.slot);
        if !self.in_range(&value) {
            return Ok(false);
        }
        if value.is_empty() {
            // An empty value may just mean the lazy open found no document
            match collection.open_document(did, false) {
                Ok(_) => {}
                Err(err) if err.is_not_found() => {
                    trace!(did, "empty value from missing document");
                    return Ok(false);
                }
                Err(err) => return Err(err),
            }
        }
        Ok(true)
    }
}

impl PostList for ValueRangePostList {
    fn termfreq_min(&self) -> DocCount {
        0
    }

    fn termfreq_est(&self) -> DocCount {
        // Selectivity of the range is unknown without an index on the slot
        self.db_size / 2
    }

    fn termfreq_max(&self) -> DocCount {
        self.db_size
    }

    fn max_weight(&self) -> Weight {
        0.0
    }

    fn docid(&self) -> DocId {
        assert!(self.current != 0, "ValueRangePostList read before first advance");
        assert!(self.collection.is_some(), "ValueRangePostList read after end");
        self.current
    }

    fn weight(&self) -> Weight {
        0.0
    }

    fn doc_length(&self) -> DocLength {
        0
    }

    fn recalc_max_weight(&mut self) -> Weight {
        0.0
    }

    fn advance(&mut self, _w_min: Weight) -> Result<Replacement> {
        let Some(collection) = self.collection.clone() else {
            return Ok(None);
        };
        self.verify_last_docid(collection.as_ref())?;

        while self.current < self.last_docid {
            self.current += 1;
            if self.matches(collection.as_ref(), self.current)? {
                return Ok(None);
            }
        }
        self.collection = None;
        Ok(None)
    }

    fn skip_to(&mut self, did: DocId, w_min: Weight) -> Result<Replacement> {
        if self.at_end() || did <= self.current {
            return Ok(None);
        }
        self.current = did - 1;
        self.advance(w_min)
    }

    fn check(&mut self, did: DocId, _w_min: Weight) -> Result<CheckOutcome> {
        let Some(collection) = self.collection.clone() else {
            return Ok(CheckOutcome::valid(None));
        };
        if did <= self.current {
            return Ok(CheckOutcome::valid(None));
        }
        self.verify_last_docid(collection.as_ref())?;
        if did > self.last_docid {
            self.collection = None;
            return Ok(CheckOutcome::valid(None));
        }

        self.current = did;
        if self.matches(collection.as_ref(), did)? {
            Ok(CheckOutcome::valid(None))
        } else {
            Ok(CheckOutcome::unknown())
        }
    }

    fn at_end(&self) -> bool {
        self.collection.is_none()
    }

    fn description(&self) -> String {
        format!("ValueRangePostList({}, {}, {})", self.slot, self.low, self.high)
    }
}

impl fmt::Debug for ValueRangePostList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueRangePostList")
            .field("slot", &self.slot)
            .field("low", &self.low)
            .field("high", &self.high)
            .field("current", &self.current)
            .field("last_docid", &self.last_docid)
            .field("at_end", &self.at_end())
            .finish()
    }
}
