//! Posting lists: the iteration protocol every matching primitive implements
//!
//! A posting list is a cursor over the documents matching some predicate, in
//! ascending docid order. Leaves test raw collection data (term postings,
//! value ranges); combinators own child lists and merge them.
//!
//! The cursor starts before the first candidate. `advance`, `skip_to` and
//! `check` move it forward; once `at_end` is true it stays true. Any of the
//! advancement methods may hand back a replacement list, which the caller
//! must use in place of the list it called; combinators use this to rewrite
//! themselves into cheaper shapes once the weight threshold rises.

mod and;
mod and_maybe;
mod and_not;
mod empty;
mod or;
mod term;
mod value_range;
mod weight;

pub use and::AndPostList;
pub use and_maybe::AndMaybePostList;
pub use and_not::AndNotPostList;
pub use empty::EmptyPostList;
pub use or::OrPostList;
pub use term::{TermPosting, TermPostList};
pub use value_range::ValueRangePostList;
pub use weight::Bm25Weight;

use std::fmt::Debug;

use crate::types::{DocCount, DocId, DocLength, Weight};
use crate::Result;

/// List to use in place of the one that was called
pub type Replacement = Option<Box<dyn PostList>>;

/// Outcome of `PostList::check`
#[derive(Debug)]
pub struct CheckOutcome {
    pub replacement: Replacement,
    /// True when the list is known to be at a matching entry (or at the end).
    /// False when the cursor sits on the target without a verdict; the
    /// caller must `advance` before reading the cursor.
    pub valid: bool,
}

impl CheckOutcome {
    pub fn valid(replacement: Replacement) -> Self {
        Self {
            replacement,
            valid: true,
        }
    }

    pub fn unknown() -> Self {
        Self {
            replacement: None,
            valid: false,
        }
    }
}

/// Core trait for all posting lists
pub trait PostList: Send + Debug {
    /// Lower bound on the number of documents this list yields
    fn termfreq_min(&self) -> DocCount;

    /// Best estimate of the number of documents this list yields
    fn termfreq_est(&self) -> DocCount;

    /// Upper bound on the number of documents this list yields
    fn termfreq_max(&self) -> DocCount;

    /// Upper bound on any weight this list can return
    fn max_weight(&self) -> Weight;

    /// Current docid.
    ///
    /// # Panics
    ///
    /// Before the first advance or after reaching the end.
    fn docid(&self) -> DocId;

    /// Weight of the current document
    fn weight(&self) -> Weight;

    /// Length of the current document
    fn doc_length(&self) -> DocLength;

    /// Recompute `max_weight` after the tree below has been restructured
    fn recalc_max_weight(&mut self) -> Weight;

    /// Move to the next document whose weight could reach `w_min`
    fn advance(&mut self, w_min: Weight) -> Result<Replacement>;

    /// Move to the first document >= `did` whose weight could reach `w_min`.
    ///
    /// No-op when `did` is not after the current position.
    fn skip_to(&mut self, did: DocId, w_min: Weight) -> Result<Replacement>;

    /// Cheaper, possibly imprecise `skip_to`.
    ///
    /// The default is exact: `skip_to` and report the result as valid.
    fn check(&mut self, did: DocId, w_min: Weight) -> Result<CheckOutcome> {
        let replacement = self.skip_to(did, w_min)?;
        Ok(CheckOutcome::valid(replacement))
    }

    /// True once every candidate has been exhausted; permanent
    fn at_end(&self) -> bool;

    /// Human readable description of the list and its children
    fn description(&self) -> String;
}

/// Advance `pl`, swapping in any replacement it returns
pub fn advance_handling_prune(pl: &mut Box<dyn PostList>, w_min: Weight) -> Result<bool> {
    let replacement = pl.advance(w_min)?;
    Ok(install(pl, replacement))
}

/// `skip_to` on `pl`, swapping in any replacement it returns
pub fn skip_to_handling_prune(
    pl: &mut Box<dyn PostList>,
    did: DocId,
    w_min: Weight,
) -> Result<bool> {
    let replacement = pl.skip_to(did, w_min)?;
    Ok(install(pl, replacement))
}

/// `check` on `pl`, swapping in any replacement. Returns the validity flag.
pub fn check_handling_prune(pl: &mut Box<dyn PostList>, did: DocId, w_min: Weight) -> Result<bool> {
    let outcome = pl.check(did, w_min)?;
    install(pl, outcome.replacement);
    Ok(outcome.valid)
}

fn install(pl: &mut Box<dyn PostList>, replacement: Replacement) -> bool {
    match replacement {
        Some(new_pl) => {
            tracing::debug!(old = %pl.description(), new = %new_pl.description(), "posting list replaced");
            *pl = new_pl;
            true
        }
        None => false,
    }
}

/// Database size used by combinator estimates; never zero so ratios stay finite
pub(crate) fn estimate_base(db_size: DocCount) -> f64 {
    db_size.max(1) as f64
}
