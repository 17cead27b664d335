//! Query evaluation core: posting lists, documents and the collection
//! accessor they read through.

pub mod collection;
pub mod config;
pub mod document;
pub mod error;
pub mod matcher;
pub mod metrics;
pub mod postlist;
pub mod query;
pub mod termlist;
pub mod testing;
pub mod types;

pub use collection::{Collection, InMemoryCollection};
pub use config::{Bm25Params, CollectionSettings, MatcherConfig};
pub use document::{Document, DocumentSource};
pub use error::{CuttleError, Result};
pub use matcher::{Match, MatchSet, Matcher};
pub use metrics::MatcherMetrics;
pub use postlist::{CheckOutcome, PostList, Replacement, ValueRangePostList};
pub use query::Query;
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
