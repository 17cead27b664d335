use prometheus::{Counter, Histogram, HistogramOpts, Opts, Registry};
use std::sync::Arc;

/// Prometheus metrics for query evaluation
#[derive(Clone)]
pub struct MatcherMetrics {
    // Counters
    pub queries_total: Counter,
    pub matches_total: Counter,
    pub postlist_rewrites: Counter,
    pub query_errors: Counter,

    // Histograms
    pub match_latency: Histogram,

    registry: Arc<Registry>,
}

impl MatcherMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let queries_total = Counter::with_opts(Opts::new(
            "cuttle_queries_total",
            "Total number of queries evaluated",
        ))?;
        registry.register(Box::new(queries_total.clone()))?;

        let matches_total = Counter::with_opts(Opts::new(
            "cuttle_matches_total",
            "Total number of matching documents seen by the matcher",
        ))?;
        registry.register(Box::new(matches_total.clone()))?;

        let postlist_rewrites = Counter::with_opts(Opts::new(
            "cuttle_postlist_rewrites_total",
            "Number of times the root posting list replaced itself",
        ))?;
        registry.register(Box::new(postlist_rewrites.clone()))?;

        let query_errors = Counter::with_opts(Opts::new(
            "cuttle_query_errors_total",
            "Number of queries aborted by a backend error",
        ))?;
        registry.register(Box::new(query_errors.clone()))?;

        let match_latency = Histogram::with_opts(
            HistogramOpts::new("cuttle_match_latency_seconds", "Query evaluation latency")
                .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        )?;
        registry.register(Box::new(match_latency.clone()))?;

        Ok(Self {
            queries_total,
            matches_total,
            postlist_rewrites,
            query_errors,
            match_latency,
            registry: Arc::new(registry),
        })
    }

    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Record a completed query
    pub fn record_query(&self, matches_seen: u64, rewrites: u64, duration_secs: f64) {
        self.queries_total.inc();
        self.matches_total.inc_by(matches_seen as f64);
        self.postlist_rewrites.inc_by(rewrites as f64);
        self.match_latency.observe(duration_secs);
    }

    pub fn record_error(&self) {
        self.queries_total.inc();
        self.query_errors.inc();
    }
}

impl Default for MatcherMetrics {
    fn default() -> Self {
        Self::new().expect("metric names are statically valid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_query() {
        let metrics = MatcherMetrics::new().unwrap();
        metrics.record_query(12, 2, 0.003);
        metrics.record_query(3, 0, 0.001);
        metrics.record_error();

        assert_eq!(metrics.queries_total.get(), 3.0);
        assert_eq!(metrics.matches_total.get(), 15.0);
        assert_eq!(metrics.postlist_rewrites.get(), 2.0);
        assert_eq!(metrics.query_errors.get(), 1.0);
        assert_eq!(metrics.match_latency.get_sample_count(), 2);
    }

    #[test]
    fn test_registry_gathers_all_families() {
        let metrics = MatcherMetrics::default();
        let names: Vec<String> = metrics
            .registry()
            .gather()
            .iter()
            .map(|family| family.get_name().to_string())
            .collect();
        assert!(names.contains(&"cuttle_queries_total".to_string()));
        assert!(names.contains(&"cuttle_match_latency_seconds".to_string()));
    }
}
