use serde::{Deserialize, Serialize};

/// BM25 weighting parameters
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bm25Params {
    pub k1: f64,
    pub b: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.2, b: 0.75 }
    }
}

/// Settings for the in-memory collection
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CollectionSettings {
    /// Ignore the lazy flag and validate existence on every document open
    pub validate_lazy_opens: bool,
    pub weighting: Bm25Params,
}

impl CollectionSettings {
    pub fn with_validate_lazy_opens(mut self, validate: bool) -> Self {
        self.validate_lazy_opens = validate;
        self
    }

    pub fn with_weighting(mut self, weighting: Bm25Params) -> Self {
        self.weighting = weighting;
        self
    }
}

/// Matcher configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// Re-validate collection statistics on every posting list call.
    /// Costs a collection round trip per call; enabled in debug builds.
    pub paranoid_checks: bool,
    /// Keep counting matches past the requested page until at least this
    /// many documents have been seen
    pub check_at_least: u32,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            paranoid_checks: cfg!(debug_assertions),
            check_at_least: 0,
        }
    }
}

impl MatcherConfig {
    pub fn with_paranoid_checks(mut self, enabled: bool) -> Self {
        self.paranoid_checks = enabled;
        self
    }

    pub fn with_check_at_least(mut self, count: u32) -> Self {
        self.check_at_least = count;
        self
    }
}
