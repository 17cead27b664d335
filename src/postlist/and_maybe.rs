//! Required list with an optional list that only adds weight

use std::mem;

use tracing::debug;

use super::{
    advance_handling_prune, skip_to_handling_prune, AndPostList, EmptyPostList, PostList,
    Replacement,
};
use crate::types::{DocCount, DocId, DocLength, Weight};
use crate::Result;

/// Matches exactly the documents of `required`. Where `optional` also
/// matches, its weight is added.
#[derive(Debug)]
pub struct AndMaybePostList {
    required: Box<dyn PostList>,
    optional: Box<dyn PostList>,
    req_max: Weight,
    opt_max: Weight,
    did: DocId,
    db_size: DocCount,
}

impl AndMaybePostList {
    pub fn new(required: Box<dyn PostList>, optional: Box<dyn PostList>, db_size: DocCount) -> Self {
        let req_max = required.max_weight();
        let opt_max = optional.max_weight();
        Self {
            required,
            optional,
            req_max,
            opt_max,
            did: 0,
            db_size,
        }
    }

    fn take(pl: &mut Box<dyn PostList>) -> Box<dyn PostList> {
        mem::replace(pl, Box::new(EmptyPostList::new()))
    }

    /// Bring the optional side up to the required side's docid
    fn sync_optional(&mut self, w_min: Weight) -> Result<Replacement> {
        if self.required.at_end() {
            return Ok(None);
        }
        self.did = self.required.docid();

        if !self.optional.at_end()
            && skip_to_handling_prune(&mut self.optional, self.did, w_min - self.req_max)?
        {
            self.opt_max = self.optional.max_weight();
        }
        if self.optional.at_end() {
            return Ok(Some(Self::take(&mut self.required)));
        }
        Ok(None)
    }

    /// A document needs both sides to reach `w_min`: become an AND
    fn into_and(&mut self, target: DocId, w_min: Weight) -> Result<Replacement> {
        let required = Self::take(&mut self.required);
        let optional = Self::take(&mut self.optional);
        let mut replacement: Box<dyn PostList> =
            Box::new(AndPostList::new(vec![required, optional], self.db_size));
        debug!(w_min, new = %replacement.description(), "rewriting AND_MAYBE");

        skip_to_handling_prune(&mut replacement, target, w_min)?;
        Ok(Some(replacement))
    }
}

impl PostList for AndMaybePostList {
    fn termfreq_min(&self) -> DocCount {
        self.required.termfreq_min()
    }

    fn termfreq_est(&self) -> DocCount {
        self.required.termfreq_est()
    }

    fn termfreq_max(&self) -> DocCount {
        self.required.termfreq_max()
    }

    fn max_weight(&self) -> Weight {
        self.req_max + self.opt_max
    }

    fn docid(&self) -> DocId {
        assert!(self.did != 0, "AndMaybePostList read before first advance");
        assert!(!self.at_end(), "AndMaybePostList read after end");
        self.did
    }

    fn weight(&self) -> Weight {
        let mut weight = self.required.weight();
        if !self.optional.at_end() && self.optional.docid() == self.did {
            weight += self.optional.weight();
        }
        weight
    }

    fn doc_length(&self) -> DocLength {
        self.required.doc_length()
    }

    fn recalc_max_weight(&mut self) -> Weight {
        self.req_max = self.required.recalc_max_weight();
        self.opt_max = self.optional.recalc_max_weight();
        self.req_max + self.opt_max
    }

    fn advance(&mut self, w_min: Weight) -> Result<Replacement> {
        if w_min > self.req_max {
            return self.into_and(self.did + 1, w_min);
        }
        if advance_handling_prune(&mut self.required, w_min - self.opt_max)? {
            self.req_max = self.required.max_weight();
        }
        self.sync_optional(w_min)
    }

    fn skip_to(&mut self, did: DocId, w_min: Weight) -> Result<Replacement> {
        if did <= self.did {
            return Ok(None);
        }
        if w_min > self.req_max {
            return self.into_and(did, w_min);
        }
        if skip_to_handling_prune(&mut self.required, did, w_min - self.opt_max)? {
            self.req_max = self.required.max_weight();
        }
        self.sync_optional(w_min)
    }

    fn at_end(&self) -> bool {
        self.required.at_end()
    }

    fn description(&self) -> String {
        format!(
            "({} AND_MAYBE {})",
            self.required.description(),
            self.optional.description()
        )
    }
}
