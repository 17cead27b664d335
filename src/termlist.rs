//! Owned enumeration lists handed out by collections and documents

use crate::types::{DocCount, TermCount, TermPos};

/// One term of a document's term list
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TermListEntry {
    pub term: String,
    pub wdf: TermCount,
    /// Number of recorded positions
    pub positions_len: TermCount,
}

/// Terms indexing one document, in ascending term order
#[derive(Debug, Default)]
pub struct TermList {
    entries: std::vec::IntoIter<TermListEntry>,
}

impl TermList {
    pub fn new(mut entries: Vec<TermListEntry>) -> Self {
        entries.sort_by(|a, b| a.term.cmp(&b.term));
        Self {
            entries: entries.into_iter(),
        }
    }

    /// Remaining entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.len() == 0
    }
}

impl Iterator for TermList {
    type Item = TermListEntry;

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

/// Positions of one term within one document, ascending
#[derive(Debug, Default)]
pub struct PositionList {
    positions: Vec<TermPos>,
    cursor: usize,
}

impl PositionList {
    pub fn new(positions: Vec<TermPos>) -> Self {
        debug_assert!(positions.windows(2).all(|w| w[0] < w[1]));
        Self {
            positions,
            cursor: 0,
        }
    }

    /// Total number of positions, independent of iteration progress
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Advance to the first position >= `pos` and return it
    pub fn skip_to(&mut self, pos: TermPos) -> Option<TermPos> {
        let remaining = &self.positions[self.cursor..];
        self.cursor += remaining.partition_point(|&p| p < pos);
        self.next()
    }
}

impl Iterator for PositionList {
    type Item = TermPos;

    fn next(&mut self) -> Option<Self::Item> {
        let pos = self.positions.get(self.cursor).copied()?;
        self.cursor += 1;
        Some(pos)
    }
}

/// One entry of a collection-wide term enumeration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AllTermsEntry {
    pub term: String,
    pub termfreq: DocCount,
    pub collection_freq: TermCount,
}

/// Every term in a collection, in ascending term order
#[derive(Debug, Default)]
pub struct AllTermsList {
    entries: std::vec::IntoIter<AllTermsEntry>,
}

impl AllTermsList {
    pub fn new(mut entries: Vec<AllTermsEntry>) -> Self {
        entries.sort_by(|a, b| a.term.cmp(&b.term));
        Self {
            entries: entries.into_iter(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.len() == 0
    }
}

impl Iterator for AllTermsList {
    type Item = AllTermsEntry;

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}
