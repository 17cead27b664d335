//! Leaf posting list over the documents indexed by one term

use super::{Bm25Weight, PostList, Replacement};
use crate::types::{DocCount, DocId, DocLength, TermCount, Weight};
use crate::Result;

/// One posting: a document containing the term
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TermPosting {
    pub did: DocId,
    pub wdf: TermCount,
    pub doc_length: DocLength,
}

/// Posting list for a single term, weighted with BM25.
///
/// The postings are captured when the list is opened, sorted by docid.
#[derive(Debug)]
pub struct TermPostList {
    term: String,
    postings: Vec<TermPosting>,
    /// Index of the current posting; `None` before the first advance
    pos: Option<usize>,
    weight: Bm25Weight,
    max_weight: Weight,
}

impl TermPostList {
    pub fn new(term: impl Into<String>, mut postings: Vec<TermPosting>, weight: Bm25Weight) -> Self {
        postings.sort_by_key(|p| p.did);
        postings.dedup_by_key(|p| p.did);

        let wdf_max = postings.iter().map(|p| p.wdf).max().unwrap_or(0);
        let min_length = postings.iter().map(|p| p.doc_length).min().unwrap_or(0);
        let max_weight = weight.max_weight(wdf_max, min_length);

        Self {
            term: term.into(),
            postings,
            pos: None,
            weight,
            max_weight,
        }
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    /// Within-document frequency of the term in the current document
    pub fn wdf(&self) -> TermCount {
        self.current().wdf
    }

    fn current(&self) -> &TermPosting {
        let pos = self.pos.expect("TermPostList read before first advance");
        assert!(pos < self.postings.len(), "TermPostList read after end");
        &self.postings[pos]
    }
}

impl PostList for TermPostList {
    fn termfreq_min(&self) -> DocCount {
        self.postings.len() as DocCount
    }

    fn termfreq_est(&self) -> DocCount {
        self.postings.len() as DocCount
    }

    fn termfreq_max(&self) -> DocCount {
        self.postings.len() as DocCount
    }

    fn max_weight(&self) -> Weight {
        self.max_weight
    }

    fn docid(&self) -> DocId {
        self.current().did
    }

    fn weight(&self) -> Weight {
        let posting = self.current();
        self.weight.weight(posting.wdf, posting.doc_length)
    }

    fn doc_length(&self) -> DocLength {
        self.current().doc_length
    }

    fn recalc_max_weight(&mut self) -> Weight {
        self.max_weight
    }

    fn advance(&mut self, _w_min: Weight) -> Result<Replacement> {
        let next = self.pos.map_or(0, |p| p + 1);
        self.pos = Some(next.min(self.postings.len()));
        Ok(None)
    }

    fn skip_to(&mut self, did: DocId, _w_min: Weight) -> Result<Replacement> {
        let start = match self.pos {
            Some(p) if p >= self.postings.len() => return Ok(None),
            Some(p) if did <= self.postings[p].did => return Ok(None),
            Some(p) => p,
            None => 0,
        };
        let offset = self.postings[start..].partition_point(|p| p.did < did);
        self.pos = Some(start + offset);
        Ok(None)
    }

    fn at_end(&self) -> bool {
        self.pos.is_some_and(|p| p >= self.postings.len())
            || (self.pos.is_none() && self.postings.is_empty())
    }

    fn description(&self) -> String {
        format!("TermPostList({})", self.term)
    }
}
