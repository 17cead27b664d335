//! BM25 term weighting

use crate::config::Bm25Params;
use crate::types::{DocCount, DocLength, TermCount, Weight};

/// BM25 weight of one term, with collection statistics captured up front
#[derive(Clone, Debug)]
pub struct Bm25Weight {
    params: Bm25Params,
    idf: f64,
    avg_length: f64,
}

impl Bm25Weight {
    pub fn new(params: Bm25Params, doc_count: DocCount, termfreq: DocCount, avg_length: f64) -> Self {
        // IDF = ln(1 + (N - n + 0.5) / (n + 0.5))
        let n = doc_count as f64;
        let df = (termfreq as f64).min(n);
        let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();
        Self {
            params,
            idf,
            avg_length,
        }
    }

    pub fn idf(&self) -> f64 {
        self.idf
    }

    /// Score = IDF * (wdf * (k1 + 1)) / (wdf + k1 * (1 - b + b * (dl / avgdl)))
    pub fn weight(&self, wdf: TermCount, doc_length: DocLength) -> Weight {
        if wdf == 0 {
            return 0.0;
        }
        let tf = wdf as f64;
        let k1 = self.params.k1;
        let b = self.params.b;
        let norm = if self.avg_length > 0.0 {
            1.0 - b + b * (doc_length as f64 / self.avg_length)
        } else {
            1.0
        };
        self.idf * (tf * (k1 + 1.0)) / (tf + k1 * norm)
    }

    /// Upper bound over documents with wdf <= `wdf_max` and length >= `min_length`.
    ///
    /// The score grows with wdf and shrinks with document length.
    pub fn max_weight(&self, wdf_max: TermCount, min_length: DocLength) -> Weight {
        self.weight(wdf_max, min_length)
    }
}
