//! Disjunction of two posting lists

use std::mem;

use tracing::debug;

use super::{
    advance_handling_prune, estimate_base, skip_to_handling_prune, AndMaybePostList, AndPostList,
    EmptyPostList, PostList, Replacement,
};
use crate::types::{DocCount, DocId, DocLength, Weight};
use crate::Result;

/// Matches documents in either child; weight is the sum of the weights of
/// the children positioned on the current document.
///
/// Once one side is exhausted the list hands back the other side as its
/// replacement. When the weight threshold rises above what one side can
/// contribute alone, it rewrites itself into an AND or AND_MAYBE.
#[derive(Debug)]
pub struct OrPostList {
    l: Box<dyn PostList>,
    r: Box<dyn PostList>,
    lmax: Weight,
    rmax: Weight,
    did: DocId,
    db_size: DocCount,
}

impl OrPostList {
    pub fn new(l: Box<dyn PostList>, r: Box<dyn PostList>, db_size: DocCount) -> Self {
        let lmax = l.max_weight();
        let rmax = r.max_weight();
        Self {
            l,
            r,
            lmax,
            rmax,
            did: 0,
            db_size,
        }
    }

    fn on_current(pl: &dyn PostList, did: DocId) -> bool {
        !pl.at_end() && pl.docid() == did
    }

    fn take(pl: &mut Box<dyn PostList>) -> Box<dyn PostList> {
        mem::replace(pl, Box::new(EmptyPostList::new()))
    }

    fn advance_l(&mut self, w_min: Weight) -> Result<()> {
        if advance_handling_prune(&mut self.l, w_min - self.rmax)? {
            self.lmax = self.l.max_weight();
        }
        Ok(())
    }

    fn advance_r(&mut self, w_min: Weight) -> Result<()> {
        if advance_handling_prune(&mut self.r, w_min - self.lmax)? {
            self.rmax = self.r.max_weight();
        }
        Ok(())
    }

    /// Either hand over the surviving side or settle on the lower head
    fn settle(&mut self) -> Replacement {
        if self.l.at_end() {
            return Some(Self::take(&mut self.r));
        }
        if self.r.at_end() {
            return Some(Self::take(&mut self.l));
        }
        self.did = self.l.docid().min(self.r.docid());
        None
    }

    /// Rewrite into a stricter operator positioned at the first match >= `target`
    fn rewrite(&mut self, target: DocId, w_min: Weight) -> Result<Replacement> {
        let l = Self::take(&mut self.l);
        let r = Self::take(&mut self.r);

        let mut replacement: Box<dyn PostList> = if w_min > self.lmax && w_min > self.rmax {
            Box::new(AndPostList::new(vec![l, r], self.db_size))
        } else if w_min > self.lmax {
            // Documents only in `l` cannot reach the threshold
            Box::new(AndMaybePostList::new(r, l, self.db_size))
        } else {
            Box::new(AndMaybePostList::new(l, r, self.db_size))
        };
        debug!(w_min, new = %replacement.description(), "rewriting OR");

        skip_to_handling_prune(&mut replacement, target, w_min)?;
        Ok(Some(replacement))
    }
}

impl PostList for OrPostList {
    fn termfreq_min(&self) -> DocCount {
        self.l.termfreq_min().max(self.r.termfreq_min())
    }

    fn termfreq_est(&self) -> DocCount {
        // Assumes the children are independent
        let base = estimate_base(self.db_size);
        let l = self.l.termfreq_est() as f64 / base;
        let r = self.r.termfreq_est() as f64 / base;
        let est = base * (1.0 - (1.0 - l) * (1.0 - r));
        (est.round() as DocCount).clamp(self.termfreq_min(), self.termfreq_max())
    }

    fn termfreq_max(&self) -> DocCount {
        let sum = self.l.termfreq_max().saturating_add(self.r.termfreq_max());
        sum.min(self.db_size).max(self.termfreq_min())
    }

    fn max_weight(&self) -> Weight {
        self.lmax + self.rmax
    }

    fn docid(&self) -> DocId {
        assert!(self.did != 0, "OrPostList read before first advance");
        assert!(!self.at_end(), "OrPostList read after end");
        self.did
    }

    fn weight(&self) -> Weight {
        let mut weight = 0.0;
        if Self::on_current(self.l.as_ref(), self.did) {
            weight += self.l.weight();
        }
        if Self::on_current(self.r.as_ref(), self.did) {
            weight += self.r.weight();
        }
        weight
    }

    fn doc_length(&self) -> DocLength {
        if Self::on_current(self.l.as_ref(), self.did) {
            self.l.doc_length()
        } else {
            self.r.doc_length()
        }
    }

    fn recalc_max_weight(&mut self) -> Weight {
        self.lmax = self.l.recalc_max_weight();
        self.rmax = self.r.recalc_max_weight();
        self.lmax + self.rmax
    }

    fn advance(&mut self, w_min: Weight) -> Result<Replacement> {
        if w_min > self.lmax.min(self.rmax) {
            return self.rewrite(self.did + 1, w_min);
        }

        if self.did == 0 {
            self.advance_l(w_min)?;
            self.advance_r(w_min)?;
        } else {
            if Self::on_current(self.l.as_ref(), self.did) {
                self.advance_l(w_min)?;
            }
            if Self::on_current(self.r.as_ref(), self.did) {
                self.advance_r(w_min)?;
            }
        }
        Ok(self.settle())
    }

    fn skip_to(&mut self, did: DocId, w_min: Weight) -> Result<Replacement> {
        if did <= self.did {
            return Ok(None);
        }
        if w_min > self.lmax.min(self.rmax) {
            return self.rewrite(did, w_min);
        }

        if skip_to_handling_prune(&mut self.l, did, w_min - self.rmax)? {
            self.lmax = self.l.max_weight();
        }
        if skip_to_handling_prune(&mut self.r, did, w_min - self.lmax)? {
            self.rmax = self.r.max_weight();
        }
        Ok(self.settle())
    }

    fn at_end(&self) -> bool {
        self.l.at_end() && self.r.at_end()
    }

    fn description(&self) -> String {
        format!("({} OR {})", self.l.description(), self.r.description())
    }
}
