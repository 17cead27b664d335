//! Query trees and their translation into posting lists
//!
//! A `Query` is a plain, serialisable description of what to match. It is
//! turned into a tree of posting lists against one collection with
//! [`Query::build`].
//!
//! # Example
//!
//! ```json
//! {
//!   "and": [
//!     { "term": { "term": "rust" } },
//!     { "value_range": { "slot": 0, "low": "2020", "high": "2024" } }
//!   ]
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::collection::Collection;
use crate::config::MatcherConfig;
use crate::postlist::{
    AndMaybePostList, AndNotPostList, AndPostList, EmptyPostList, OrPostList, PostList,
    ValueRangePostList,
};
use crate::types::{DocCount, ValueNo};
use crate::Result;

/// A query over one collection
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Query {
    /// Documents indexed by `term`
    Term { term: String },
    /// Documents whose value in `slot` lies in `[low, high]`
    ValueRange {
        slot: ValueNo,
        low: String,
        high: String,
    },
    /// Documents matching every subquery
    And(Vec<Query>),
    /// Documents matching any subquery
    Or(Vec<Query>),
    /// Documents matching `required`, with extra weight where `optional` matches
    AndMaybe {
        required: Box<Query>,
        optional: Box<Query>,
    },
    /// Documents matching `left` but not `right`
    AndNot { left: Box<Query>, right: Box<Query> },
    MatchNothing,
}

impl Query {
    pub fn term(term: impl Into<String>) -> Self {
        Query::Term { term: term.into() }
    }

    pub fn value_range(slot: ValueNo, low: impl Into<String>, high: impl Into<String>) -> Self {
        Query::ValueRange {
            slot,
            low: low.into(),
            high: high.into(),
        }
    }

    pub fn and_maybe(required: Query, optional: Query) -> Self {
        Query::AndMaybe {
            required: Box::new(required),
            optional: Box::new(optional),
        }
    }

    pub fn and_not(left: Query, right: Query) -> Self {
        Query::AndNot {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Build the posting list tree for this query
    pub fn build(
        &self,
        collection: &Arc<dyn Collection>,
        config: &MatcherConfig,
    ) -> Result<Box<dyn PostList>> {
        let db_size = collection.doc_count();
        match self {
            Query::Term { term } => collection.open_posting_list(term),
            Query::ValueRange { slot, low, high } => Ok(Box::new(
                ValueRangePostList::new(Arc::clone(collection), *slot, low.as_str(), high.as_str())
                    .with_paranoid_checks(config.paranoid_checks),
            )),
            Query::And(subqueries) => {
                let mut children = build_all(subqueries, collection, config)?;
                match children.len() {
                    0 => Ok(Box::new(EmptyPostList::new())),
                    1 => Ok(children.remove(0)),
                    _ => Ok(Box::new(AndPostList::new(children, db_size))),
                }
            }
            Query::Or(subqueries) => {
                let children = build_all(subqueries, collection, config)?;
                Ok(balanced_or(children, db_size))
            }
            Query::AndMaybe { required, optional } => Ok(Box::new(AndMaybePostList::new(
                required.build(collection, config)?,
                optional.build(collection, config)?,
                db_size,
            ))),
            Query::AndNot { left, right } => Ok(Box::new(AndNotPostList::new(
                left.build(collection, config)?,
                right.build(collection, config)?,
                db_size,
            ))),
            Query::MatchNothing => Ok(Box::new(EmptyPostList::new())),
        }
    }
}

fn build_all(
    subqueries: &[Query],
    collection: &Arc<dyn Collection>,
    config: &MatcherConfig,
) -> Result<Vec<Box<dyn PostList>>> {
    subqueries
        .iter()
        .map(|q| q.build(collection, config))
        .collect()
}

/// Fold any number of lists into a balanced tree of binary ORs
fn balanced_or(mut children: Vec<Box<dyn PostList>>, db_size: DocCount) -> Box<dyn PostList> {
    match children.len() {
        0 => Box::new(EmptyPostList::new()),
        1 => children.remove(0),
        n => {
            let right = children.split_off(n / 2);
            Box::new(OrPostList::new(
                balanced_or(children, db_size),
                balanced_or(right, db_size),
                db_size,
            ))
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, op: &str, subqueries: &[Query]) -> fmt::Result {
            write!(f, "(")?;
            for (i, q) in subqueries.iter().enumerate() {
                if i > 0 {
                    write!(f, " {} ", op)?;
                }
                write!(f, "{}", q)?;
            }
            write!(f, ")")
        }

        match self {
            Query::Term { term } => write!(f, "{}", term),
            Query::ValueRange { slot, low, high } => write!(f, "VALUE_RANGE {} {} {}", slot, low, high),
            Query::And(subqueries) => join(f, "AND", subqueries),
            Query::Or(subqueries) => join(f, "OR", subqueries),
            Query::AndMaybe { required, optional } => write!(f, "({} AND_MAYBE {})", required, optional),
            Query::AndNot { left, right } => write!(f, "({} AND_NOT {})", left, right),
            Query::MatchNothing => write!(f, "<nothing>"),
        }
    }
}
