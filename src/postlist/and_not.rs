//! Set difference of two posting lists

use std::mem;

use super::{
    advance_handling_prune, estimate_base, skip_to_handling_prune, EmptyPostList, PostList,
    Replacement,
};
use crate::types::{DocCount, DocId, DocLength, Weight};
use crate::Result;

/// Matches documents of `left` that are not in `right`. Only `left`
/// contributes weight.
#[derive(Debug)]
pub struct AndNotPostList {
    left: Box<dyn PostList>,
    right: Box<dyn PostList>,
    did: DocId,
    db_size: DocCount,
}

impl AndNotPostList {
    pub fn new(left: Box<dyn PostList>, right: Box<dyn PostList>, db_size: DocCount) -> Self {
        Self {
            left,
            right,
            did: 0,
            db_size,
        }
    }

    /// Step `left` past every document `right` excludes
    fn find_next(&mut self, w_min: Weight) -> Result<Replacement> {
        loop {
            if self.left.at_end() {
                return Ok(None);
            }
            let did = self.left.docid();
            if !self.right.at_end() {
                // The excluded side never contributes weight
                skip_to_handling_prune(&mut self.right, did, 0.0)?;
            }
            if self.right.at_end() {
                self.did = did;
                let left = mem::replace(&mut self.left, Box::new(EmptyPostList::new()));
                return Ok(Some(left));
            }
            if self.right.docid() != did {
                self.did = did;
                return Ok(None);
            }
            advance_handling_prune(&mut self.left, w_min)?;
        }
    }
}

impl PostList for AndNotPostList {
    fn termfreq_min(&self) -> DocCount {
        self.left
            .termfreq_min()
            .saturating_sub(self.right.termfreq_max())
    }

    fn termfreq_est(&self) -> DocCount {
        let base = estimate_base(self.db_size);
        let kept = 1.0 - self.right.termfreq_est() as f64 / base;
        let est = self.left.termfreq_est() as f64 * kept.max(0.0);
        (est.round() as DocCount).clamp(self.termfreq_min(), self.termfreq_max())
    }

    fn termfreq_max(&self) -> DocCount {
        self.left.termfreq_max()
    }

    fn max_weight(&self) -> Weight {
        self.left.max_weight()
    }

    fn docid(&self) -> DocId {
        assert!(self.did != 0, "AndNotPostList read before first advance");
        assert!(!self.at_end(), "AndNotPostList read after end");
        self.did
    }

    fn weight(&self) -> Weight {
        self.left.weight()
    }

    fn doc_length(&self) -> DocLength {
        self.left.doc_length()
    }

    fn recalc_max_weight(&mut self) -> Weight {
        self.left.recalc_max_weight()
    }

    fn advance(&mut self, w_min: Weight) -> Result<Replacement> {
        advance_handling_prune(&mut self.left, w_min)?;
        self.find_next(w_min)
    }

    fn skip_to(&mut self, did: DocId, w_min: Weight) -> Result<Replacement> {
        if did <= self.did {
            return Ok(None);
        }
        skip_to_handling_prune(&mut self.left, did, w_min)?;
        self.find_next(w_min)
    }

    fn at_end(&self) -> bool {
        self.left.at_end()
    }

    fn description(&self) -> String {
        format!("({} AND_NOT {})", self.left.description(), self.right.description())
    }
}
