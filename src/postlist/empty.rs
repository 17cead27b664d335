//! Posting list which matches nothing

use super::{PostList, Replacement};
use crate::types::{DocCount, DocId, DocLength, Weight};
use crate::Result;

/// Posting list for a term absent from the collection.
///
/// Returned instead of an error so that evaluation over several collections
/// treats a term missing from one of them like any other list.
#[derive(Clone, Debug, Default)]
pub struct EmptyPostList;

impl EmptyPostList {
    pub fn new() -> Self {
        Self
    }
}

impl PostList for EmptyPostList {
    fn termfreq_min(&self) -> DocCount {
        0
    }

    fn termfreq_est(&self) -> DocCount {
        0
    }

    fn termfreq_max(&self) -> DocCount {
        0
    }

    fn max_weight(&self) -> Weight {
        0.0
    }

    fn docid(&self) -> DocId {
        panic!("EmptyPostList::docid() called: the list is always at end");
    }

    fn weight(&self) -> Weight {
        panic!("EmptyPostList::weight() called: the list is always at end");
    }

    fn doc_length(&self) -> DocLength {
        panic!("EmptyPostList::doc_length() called: the list is always at end");
    }

    fn recalc_max_weight(&mut self) -> Weight {
        0.0
    }

    fn advance(&mut self, _w_min: Weight) -> Result<Replacement> {
        Ok(None)
    }

    fn skip_to(&mut self, _did: DocId, _w_min: Weight) -> Result<Replacement> {
        Ok(None)
    }

    fn at_end(&self) -> bool {
        true
    }

    fn description(&self) -> String {
        "EmptyPostList".to_string()
    }
}
