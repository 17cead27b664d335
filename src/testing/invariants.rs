//! Invariant checking for posting lists
//!
//! A posting list is driven through a script of operations and every step
//! is captured in a `PostListTrace`. Invariants then check the trace as a
//! whole, so one run verifies cursor order, bound consistency and weight
//! bounds together.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::postlist::{advance_handling_prune, skip_to_handling_prune, PostList};
use crate::types::{DocCount, DocId, Weight};
use crate::Result;

/// One call made on a posting list
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Op {
    Advance(Weight),
    SkipTo(DocId, Weight),
    Check(DocId, Weight),
}

/// State of the list after one operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub op: Op,
    pub at_end: bool,
    /// Set when `check` left the cursor without a verdict
    pub unverified: bool,
    pub replaced: bool,
    /// Current docid; None at the end or when unverified
    pub docid: Option<DocId>,
    pub weight: Option<Weight>,
    pub max_weight: Weight,
    pub termfreq_min: DocCount,
    pub termfreq_est: DocCount,
    pub termfreq_max: DocCount,
}

/// Every step of one scripted run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostListTrace {
    pub description: String,
    pub steps: Vec<Step>,
}

impl PostListTrace {
    /// Docids the list stood on, in order
    pub fn docids(&self) -> Vec<DocId> {
        self.steps.iter().filter_map(|s| s.docid).collect()
    }
}

/// Drive `pl` through `ops`, installing any replacements it returns
pub fn trace_postlist(mut pl: Box<dyn PostList>, ops: &[Op]) -> Result<PostListTrace> {
    let description = pl.description();
    let mut steps = Vec::with_capacity(ops.len());

    for &op in ops {
        let (replaced, valid) = match op {
            Op::Advance(w_min) => (advance_handling_prune(&mut pl, w_min)?, true),
            Op::SkipTo(did, w_min) => (skip_to_handling_prune(&mut pl, did, w_min)?, true),
            Op::Check(did, w_min) => {
                let outcome = pl.check(did, w_min)?;
                let replaced = outcome.replacement.is_some();
                if let Some(new_pl) = outcome.replacement {
                    pl = new_pl;
                }
                (replaced, outcome.valid)
            }
        };

        let at_end = pl.at_end();
        let readable = !at_end && valid;
        steps.push(Step {
            op,
            at_end,
            unverified: !valid,
            replaced,
            docid: readable.then(|| pl.docid()),
            weight: readable.then(|| pl.weight()),
            max_weight: pl.max_weight(),
            termfreq_min: pl.termfreq_min(),
            termfreq_est: pl.termfreq_est(),
            termfreq_max: pl.termfreq_max(),
        });
    }

    Ok(PostListTrace { description, steps })
}

/// Advance until the end, at most `limit` times
pub fn advance_script(limit: usize) -> Vec<Op> {
    vec![Op::Advance(0.0); limit]
}

/// A violation of an invariant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    pub invariant: String,
    pub description: String,
    pub violating_steps: Vec<usize>, // Indices into the trace
    pub context: HashMap<String, String>,
}

impl Violation {
    fn at(invariant: &dyn Invariant, trace: &PostListTrace, step: usize, description: String) -> Self {
        let mut context = HashMap::new();
        context.insert("postlist".to_string(), trace.description.clone());
        context.insert("op".to_string(), format!("{:?}", trace.steps[step].op));
        Self {
            invariant: invariant.name().to_string(),
            description,
            violating_steps: vec![step],
            context,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "INVARIANT VIOLATION: {}", self.invariant)?;
        writeln!(f, "  Description: {}", self.description)?;
        writeln!(f, "  Violating steps: {:?}", self.violating_steps)?;
        if !self.context.is_empty() {
            writeln!(f, "  Context:")?;
            for (key, value) in &self.context {
                writeln!(f, "    {}: {}", key, value)?;
            }
        }
        Ok(())
    }
}

/// Trait for invariant checkers
pub trait Invariant: Send + Sync {
    fn name(&self) -> &str;

    fn check(&self, trace: &PostListTrace) -> std::result::Result<(), Violation>;

    fn description(&self) -> &str {
        "No description provided"
    }
}

/// Check all invariants and return violations
pub fn check_all_invariants(
    trace: &PostListTrace,
    invariants: &[Box<dyn Invariant>],
) -> Vec<Violation> {
    invariants
        .iter()
        .filter_map(|invariant| invariant.check(trace).err())
        .collect()
}

/// Trace `pl` through `ops` and check it against the default invariants
pub fn check_postlist(pl: Box<dyn PostList>, ops: &[Op]) -> Result<Vec<Violation>> {
    let trace = trace_postlist(pl, ops)?;
    Ok(check_all_invariants(&trace, &default_invariants()))
}

pub fn default_invariants() -> Vec<Box<dyn Invariant>> {
    vec![
        Box::new(MonotonicCursor),
        Box::new(TerminalIsPermanent),
        Box::new(BoundsOrdered),
        Box::new(TermfreqMaxNonIncreasing),
        Box::new(WeightWithinMaxWeight),
        Box::new(SkipLandsAtOrAfterTarget),
    ]
}

// ============================================================================
// POSTING LIST INVARIANTS
// ============================================================================

/// The current docid never decreases
pub struct MonotonicCursor;

impl Invariant for MonotonicCursor {
    fn name(&self) -> &str {
        "MonotonicCursor"
    }

    fn description(&self) -> &str {
        "advance, skip_to and check never move the cursor backwards"
    }

    fn check(&self, trace: &PostListTrace) -> std::result::Result<(), Violation> {
        let mut last: DocId = 0;
        for (idx, step) in trace.steps.iter().enumerate() {
            if let Some(did) = step.docid {
                if did < last {
                    return Err(Violation::at(
                        self,
                        trace,
                        idx,
                        format!("cursor moved back from {} to {}", last, did),
                    ));
                }
                last = did;
            }
        }
        Ok(())
    }
}

/// Once at the end, always at the end
pub struct TerminalIsPermanent;

impl Invariant for TerminalIsPermanent {
    fn name(&self) -> &str {
        "TerminalIsPermanent"
    }

    fn description(&self) -> &str {
        "at_end stays true once reached"
    }

    fn check(&self, trace: &PostListTrace) -> std::result::Result<(), Violation> {
        if let Some(first_end) = trace.steps.iter().position(|s| s.at_end) {
            if let Some(offset) = trace.steps[first_end..].iter().position(|s| !s.at_end) {
                let idx = first_end + offset;
                return Err(Violation::at(
                    self,
                    trace,
                    idx,
                    format!("list left the end state reached at step {}", first_end),
                ));
            }
        }
        Ok(())
    }
}

/// termfreq_min <= termfreq_est <= termfreq_max at every step
pub struct BoundsOrdered;

impl Invariant for BoundsOrdered {
    fn name(&self) -> &str {
        "BoundsOrdered"
    }

    fn check(&self, trace: &PostListTrace) -> std::result::Result<(), Violation> {
        for (idx, step) in trace.steps.iter().enumerate() {
            if step.termfreq_min > step.termfreq_est || step.termfreq_est > step.termfreq_max {
                return Err(Violation::at(
                    self,
                    trace,
                    idx,
                    format!(
                        "bounds out of order: min {} est {} max {}",
                        step.termfreq_min, step.termfreq_est, step.termfreq_max
                    ),
                ));
            }
        }
        Ok(())
    }
}

/// termfreq_max never grows as the list advances
pub struct TermfreqMaxNonIncreasing;

impl Invariant for TermfreqMaxNonIncreasing {
    fn name(&self) -> &str {
        "TermfreqMaxNonIncreasing"
    }

    fn check(&self, trace: &PostListTrace) -> std::result::Result<(), Violation> {
        for (idx, pair) in trace.steps.windows(2).enumerate() {
            if pair[1].termfreq_max > pair[0].termfreq_max {
                return Err(Violation::at(
                    self,
                    trace,
                    idx + 1,
                    format!(
                        "termfreq_max grew from {} to {}",
                        pair[0].termfreq_max, pair[1].termfreq_max
                    ),
                ));
            }
        }
        Ok(())
    }
}

/// No document outweighs the list's max_weight
pub struct WeightWithinMaxWeight;

impl Invariant for WeightWithinMaxWeight {
    fn name(&self) -> &str {
        "WeightWithinMaxWeight"
    }

    fn check(&self, trace: &PostListTrace) -> std::result::Result<(), Violation> {
        for (idx, step) in trace.steps.iter().enumerate() {
            if let Some(weight) = step.weight {
                if weight > step.max_weight + 1e-9 {
                    return Err(Violation::at(
                        self,
                        trace,
                        idx,
                        format!("weight {} exceeds max_weight {}", weight, step.max_weight),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// skip_to and a valid check land on or after their target
pub struct SkipLandsAtOrAfterTarget;

impl Invariant for SkipLandsAtOrAfterTarget {
    fn name(&self) -> &str {
        "SkipLandsAtOrAfterTarget"
    }

    fn check(&self, trace: &PostListTrace) -> std::result::Result<(), Violation> {
        for (idx, step) in trace.steps.iter().enumerate() {
            let target = match step.op {
                Op::SkipTo(did, _) | Op::Check(did, _) => did,
                Op::Advance(_) => continue,
            };
            if let Some(did) = step.docid {
                if did < target {
                    return Err(Violation::at(
                        self,
                        trace,
                        idx,
                        format!("landed on {} before target {}", did, target),
                    ));
                }
            }
        }
        Ok(())
    }
}
