//! Testing infrastructure for correctness verification
//!
//! This module provides:
//! - Call capture for collections (`RecordingCollection`, `EventLog`)
//! - Scripted posting list traces
//! - Invariant checking over those traces
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use cuttle::testing::prelude::*;
//!
//! let trace = trace_postlist(postlist, &advance_script(100))?;
//! let violations = check_all_invariants(&trace, &default_invariants());
//! assert!(violations.is_empty());
//! ```
//!
//! # Invariants
//!
//! - **MonotonicCursor**: the current docid never decreases
//! - **TerminalIsPermanent**: a list at its end stays there
//! - **BoundsOrdered**: termfreq_min <= termfreq_est <= termfreq_max
//! - **TermfreqMaxNonIncreasing**: termfreq_max only shrinks
//! - **WeightWithinMaxWeight**: weights stay under max_weight
//! - **SkipLandsAtOrAfterTarget**: skip_to never stops short

pub mod events;
pub mod history;
pub mod invariants;
pub mod recording;

pub use events::{Event, OperationId, OperationResult, OperationType};
pub use history::EventLog;
pub use invariants::{
    advance_script, check_all_invariants, check_postlist, default_invariants, trace_postlist,
    BoundsOrdered, Invariant, MonotonicCursor, Op, PostListTrace, SkipLandsAtOrAfterTarget, Step,
    TermfreqMaxNonIncreasing, TerminalIsPermanent, Violation, WeightWithinMaxWeight,
};
pub use recording::RecordingCollection;

/// Prelude for easy imports
pub mod prelude {
    pub use super::events::*;
    pub use super::history::EventLog;
    pub use super::invariants::{
        advance_script, check_all_invariants, check_postlist, default_invariants, trace_postlist,
        Invariant, Op, PostListTrace, Violation,
    };
    pub use super::recording::RecordingCollection;
}
