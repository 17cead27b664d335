//! Scalar types shared by collections, documents and posting lists

/// Document identifier within one collection. Zero means "no document".
pub type DocId = u32;

/// Number of documents
pub type DocCount = u32;

/// Within-document or collection-wide occurrence count
pub type TermCount = u32;

/// Term position within a document
pub type TermPos = u32;

/// Value slot number
pub type ValueNo = u32;

/// Sum of wdf over a document's terms
pub type DocLength = u64;

/// Ranking weight
pub type Weight = f64;

/// Reserved "no document" identifier
pub const NO_DOCUMENT: DocId = 0;
