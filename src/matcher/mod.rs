//! Top-k evaluation of a query against one collection
//!
//! The matcher builds the posting list tree once, then drives the root with
//! a rising weight threshold: once `first + max_items` candidates are held,
//! only documents that could beat the worst of them are interesting, and
//! the tree is told so through `w_min`. Subtrees that can no longer reach
//! the threshold rewrite themselves into cheaper operators.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::Instant;

use ordered_float::OrderedFloat;
use tracing::{debug, info, warn};

use crate::collection::Collection;
use crate::config::MatcherConfig;
use crate::metrics::MatcherMetrics;
use crate::postlist::{advance_handling_prune, PostList};
use crate::query::Query;
use crate::types::{DocCount, DocId, Weight};
use crate::Result;

/// One ranked result
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Match {
    pub did: DocId,
    pub weight: Weight,
}

/// A page of ranked results plus match-count bounds
#[derive(Clone, Debug, Default)]
pub struct MatchSet {
    /// Rank of the first entry in `matches`
    pub first: usize,
    /// Descending weight, ties broken by ascending docid
    pub matches: Vec<Match>,
    pub matches_lower_bound: DocCount,
    pub matches_estimated: DocCount,
    pub matches_upper_bound: DocCount,
    /// Highest weight of any document seen
    pub max_attained: Weight,
    /// Upper bound on the weight of any document
    pub max_possible: Weight,
}

impl MatchSet {
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Match> {
        self.matches.iter()
    }

    pub fn docids(&self) -> Vec<DocId> {
        self.matches.iter().map(|m| m.did).collect()
    }
}

/// Ordering key: greater is better
type Rank = (OrderedFloat<Weight>, Reverse<DocId>);

struct MatchRun {
    mset: MatchSet,
    seen: u64,
    rewrites: u64,
}

/// Evaluates queries against one collection
pub struct Matcher {
    collection: Arc<dyn Collection>,
    config: MatcherConfig,
    metrics: MatcherMetrics,
}

impl Matcher {
    pub fn new(collection: Arc<dyn Collection>, config: MatcherConfig) -> Self {
        Self {
            collection,
            config,
            metrics: MatcherMetrics::default(),
        }
    }

    /// Record into an existing set of metrics
    pub fn with_metrics(mut self, metrics: MatcherMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &MatcherMetrics {
        &self.metrics
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Ranked matches `first .. first + max_items` for `query`
    #[tracing::instrument(skip(self, query), fields(query = %query))]
    pub fn get_mset(&self, query: &Query, first: usize, max_items: usize) -> Result<MatchSet> {
        let start = Instant::now();
        match self.run(query, first, max_items) {
            Ok(run) => {
                let elapsed = start.elapsed();
                self.metrics
                    .record_query(run.seen, run.rewrites, elapsed.as_secs_f64());
                info!(
                    returned = run.mset.len(),
                    seen = run.seen,
                    estimated = run.mset.matches_estimated,
                    elapsed_us = elapsed.as_micros() as u64,
                    "query evaluated"
                );
                Ok(run.mset)
            }
            Err(err) => {
                self.metrics.record_error();
                warn!(error = %err, "query aborted");
                Err(err)
            }
        }
    }

    /// Every matching docid in increasing order, without ranking
    pub fn collect_docids(&self, query: &Query) -> Result<Vec<DocId>> {
        let mut root = query.build(&self.collection, &self.config)?;
        let mut docids = Vec::new();
        loop {
            advance_handling_prune(&mut root, 0.0)?;
            if root.at_end() {
                break;
            }
            docids.push(root.docid());
        }
        Ok(docids)
    }

    fn run(&self, query: &Query, first: usize, max_items: usize) -> Result<MatchRun> {
        let mut root: Box<dyn PostList> = query.build(&self.collection, &self.config)?;
        debug!(tree = %root.description(), "built posting list tree");

        let max_possible = root.recalc_max_weight();
        let tf_min = root.termfreq_min();
        let tf_est = root.termfreq_est();
        let tf_max = root.termfreq_max();

        let wanted = first.saturating_add(max_items);
        let check_at_least = wanted.max(self.config.check_at_least as usize) as u64;

        let mut heap: BinaryHeap<Reverse<Rank>> = BinaryHeap::with_capacity(wanted + 1);
        let mut w_min: Weight = 0.0;
        let mut pruned = false;
        let mut exhausted = false;
        let mut seen = 0u64;
        let mut rewrites = 0u64;
        let mut max_attained: Weight = 0.0;

        if check_at_least > 0 {
            loop {
                if w_min > 0.0 {
                    pruned = true;
                }
                if advance_handling_prune(&mut root, w_min)? {
                    rewrites += 1;
                    if root.recalc_max_weight() < w_min {
                        break;
                    }
                }
                if root.at_end() {
                    exhausted = true;
                    break;
                }

                let did = root.docid();
                let weight = root.weight();
                seen += 1;
                max_attained = max_attained.max(weight);

                if wanted > 0 {
                    let rank: Rank = (OrderedFloat(weight), Reverse(did));
                    if heap.len() < wanted {
                        heap.push(Reverse(rank));
                    } else if heap.peek().is_some_and(|Reverse(worst)| rank > *worst) {
                        heap.pop();
                        heap.push(Reverse(rank));
                    }
                }

                if heap.len() == wanted && seen >= check_at_least {
                    w_min = heap.peek().map_or(0.0, |Reverse((w, _))| w.0);
                    if root.max_weight() < w_min {
                        break;
                    }
                }
            }
        }

        let (lower, estimated, upper) = if exhausted && !pruned {
            let seen = seen as DocCount;
            (seen, seen, seen)
        } else {
            let seen = seen.min(DocCount::MAX as u64) as DocCount;
            let lower = tf_min.max(seen);
            let upper = tf_max.max(lower);
            (lower, tf_est.clamp(lower, upper), upper)
        };

        let mut ranked: Vec<Rank> = heap.into_iter().map(|Reverse(rank)| rank).collect();
        ranked.sort_unstable_by(|a, b| b.cmp(a));
        let matches = ranked
            .into_iter()
            .skip(first)
            .take(max_items)
            .map(|(weight, Reverse(did))| Match {
                did,
                weight: weight.0,
            })
            .collect();

        Ok(MatchRun {
            mset: MatchSet {
                first,
                matches,
                matches_lower_bound: lower,
                matches_estimated: estimated,
                matches_upper_bound: upper,
                max_attained,
                max_possible,
            },
            seen,
            rewrites,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::InMemoryCollection;
    use crate::document::Document;

    fn matcher(docs: &[&[(&str, u32)]]) -> Matcher {
        let coll = InMemoryCollection::new();
        for terms in docs {
            let mut doc = Document::new();
            for (term, wdf) in *terms {
                doc.add_term(*term, *wdf).unwrap();
            }
            coll.add_document(&doc).unwrap();
        }
        Matcher::new(Arc::new(coll), MatcherConfig::default())
    }

    #[test]
    fn test_ranks_by_weight() {
        let m = matcher(&[
            &[("rust", 1), ("filler", 5)],
            &[("rust", 4), ("filler", 1)],
            &[("python", 1)],
            &[("rust", 2), ("filler", 1)],
        ]);
        let mset = m.get_mset(&Query::term("rust"), 0, 10).unwrap();
        assert_eq!(mset.docids(), vec![2, 4, 1]);
        assert_eq!(mset.matches_estimated, 3);
        assert_eq!(mset.matches_lower_bound, 3);
        assert_eq!(mset.matches_upper_bound, 3);
        assert!(mset.max_attained <= mset.max_possible);
        assert_eq!(mset.max_attained, mset.matches[0].weight);
    }

    #[test]
    fn test_paging() {
        let m = matcher(&[&[("a", 1)], &[("a", 3)], &[("a", 2)], &[("a", 4)]]);
        let page = m.get_mset(&Query::term("a"), 1, 2).unwrap();
        assert_eq!(page.first, 1);
        assert_eq!(page.docids(), vec![2, 3]);

        let past_end = m.get_mset(&Query::term("a"), 10, 2).unwrap();
        assert!(past_end.is_empty());
    }

    #[test]
    fn test_equal_weights_break_ties_by_docid() {
        let m = matcher(&[&[("a", 1)], &[("a", 1)], &[("a", 1)]]);
        let mset = m.get_mset(&Query::term("a"), 0, 2).unwrap();
        assert_eq!(mset.docids(), vec![1, 2]);
    }

    #[test]
    fn test_zero_items_only_estimates() {
        let m = matcher(&[&[("a", 1)], &[("a", 1)]]);
        let mset = m.get_mset(&Query::term("a"), 0, 0).unwrap();
        assert!(mset.is_empty());
        assert_eq!(mset.matches_estimated, 2);
        assert_eq!(m.metrics().matches_total.get(), 0.0);
    }

    #[test]
    fn test_collect_docids() {
        let m = matcher(&[&[("a", 1)], &[("b", 1)], &[("a", 1), ("b", 1)]]);
        let query = Query::Or(vec![Query::term("a"), Query::term("b")]);
        assert_eq!(m.collect_docids(&query).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_metrics_recorded() {
        let m = matcher(&[&[("a", 1)], &[("a", 2)]]);
        m.get_mset(&Query::term("a"), 0, 10).unwrap();
        assert_eq!(m.metrics().queries_total.get(), 1.0);
        assert_eq!(m.metrics().matches_total.get(), 2.0);
    }
}
