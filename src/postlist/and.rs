//! Conjunction of any number of posting lists

use tracing::debug;

use super::{advance_handling_prune, estimate_base, skip_to_handling_prune, PostList, Replacement};
use crate::types::{DocCount, DocId, DocLength, Weight};
use crate::Result;

/// Matches documents present in every child; weight is the sum of the
/// children's weights.
///
/// Children are ordered by ascending estimated frequency when the list is
/// built, so the rarest child leads and the others are only probed at the
/// lead's candidates.
#[derive(Debug)]
pub struct AndPostList {
    children: Vec<Box<dyn PostList>>,
    max_weights: Vec<Weight>,
    max_total: Weight,
    did: DocId,
    db_size: DocCount,
    ended: bool,
}

impl AndPostList {
    pub fn new(mut children: Vec<Box<dyn PostList>>, db_size: DocCount) -> Self {
        assert!(!children.is_empty(), "AndPostList needs at least one child");
        children.sort_by_key(|child| child.termfreq_est());

        let max_weights: Vec<Weight> = children.iter().map(|c| c.max_weight()).collect();
        let max_total = max_weights.iter().sum();
        Self {
            children,
            max_weights,
            max_total,
            did: 0,
            db_size,
            ended: false,
        }
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Weight child `i` must reach for the whole conjunction to reach `w_min`
    fn child_min(&self, i: usize, w_min: Weight) -> Weight {
        w_min - (self.max_total - self.max_weights[i])
    }

    fn replaced(&mut self, i: usize) {
        self.max_weights[i] = self.children[i].max_weight();
        self.max_total = self.max_weights.iter().sum();
    }

    fn advance_child(&mut self, i: usize, w_min: Weight) -> Result<()> {
        let w = self.child_min(i, w_min);
        if advance_handling_prune(&mut self.children[i], w)? {
            self.replaced(i);
        }
        Ok(())
    }

    fn skip_child(&mut self, i: usize, did: DocId, w_min: Weight) -> Result<()> {
        let w = self.child_min(i, w_min);
        if skip_to_handling_prune(&mut self.children[i], did, w)? {
            self.replaced(i);
        }
        Ok(())
    }

    fn check_child(&mut self, i: usize, did: DocId, w_min: Weight) -> Result<bool> {
        let w = self.child_min(i, w_min);
        let outcome = self.children[i].check(did, w)?;
        if let Some(child) = outcome.replacement {
            debug!(old = %self.children[i].description(), new = %child.description(), "and child replaced");
            self.children[i] = child;
            self.replaced(i);
        }
        Ok(outcome.valid)
    }

    /// Move the lead forward until every child agrees on its docid
    fn find_next_match(&mut self, w_min: Weight) -> Result<()> {
        'lead: loop {
            if self.children[0].at_end() {
                self.ended = true;
                return Ok(());
            }
            let candidate = self.children[0].docid();

            for i in 1..self.children.len() {
                if !self.check_child(i, candidate, w_min)? {
                    self.advance_child(0, w_min)?;
                    continue 'lead;
                }
                if self.children[i].at_end() {
                    self.ended = true;
                    return Ok(());
                }
                let did = self.children[i].docid();
                if did != candidate {
                    self.skip_child(0, did, w_min)?;
                    continue 'lead;
                }
            }

            self.did = candidate;
            return Ok(());
        }
    }
}

impl PostList for AndPostList {
    fn termfreq_min(&self) -> DocCount {
        let sum: u64 = self.children.iter().map(|c| c.termfreq_min() as u64).sum();
        let overlap = (self.children.len() as u64 - 1) * self.db_size as u64;
        (sum.saturating_sub(overlap) as DocCount).min(self.termfreq_max())
    }

    fn termfreq_est(&self) -> DocCount {
        // Assumes the children are independent
        let base = estimate_base(self.db_size);
        let est = self
            .children
            .iter()
            .fold(base, |acc, c| acc * (c.termfreq_est() as f64 / base));
        (est.round() as DocCount).clamp(self.termfreq_min(), self.termfreq_max())
    }

    fn termfreq_max(&self) -> DocCount {
        self.children
            .iter()
            .map(|c| c.termfreq_max())
            .min()
            .unwrap_or(0)
    }

    fn max_weight(&self) -> Weight {
        self.max_total
    }

    fn docid(&self) -> DocId {
        assert!(self.did != 0, "AndPostList read before first advance");
        assert!(!self.ended, "AndPostList read after end");
        self.did
    }

    fn weight(&self) -> Weight {
        self.children.iter().map(|c| c.weight()).sum()
    }

    fn doc_length(&self) -> DocLength {
        self.children[0].doc_length()
    }

    fn recalc_max_weight(&mut self) -> Weight {
        for (child, max) in self.children.iter_mut().zip(self.max_weights.iter_mut()) {
            *max = child.recalc_max_weight();
        }
        self.max_total = self.max_weights.iter().sum();
        self.max_total
    }

    fn advance(&mut self, w_min: Weight) -> Result<Replacement> {
        if self.ended {
            return Ok(None);
        }
        if w_min > self.max_total {
            self.ended = true;
            return Ok(None);
        }
        self.advance_child(0, w_min)?;
        self.find_next_match(w_min)?;
        Ok(None)
    }

    fn skip_to(&mut self, did: DocId, w_min: Weight) -> Result<Replacement> {
        if self.ended || did <= self.did {
            return Ok(None);
        }
        if w_min > self.max_total {
            self.ended = true;
            return Ok(None);
        }
        self.skip_child(0, did, w_min)?;
        self.find_next_match(w_min)?;
        Ok(None)
    }

    fn at_end(&self) -> bool {
        self.ended
    }

    fn description(&self) -> String {
        let parts: Vec<String> = self.children.iter().map(|c| c.description()).collect();
        format!("({})", parts.join(" AND "))
    }
}
