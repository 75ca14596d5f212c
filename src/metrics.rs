use prometheus::{IntCounter, Registry};

pub struct Metrics {
    registry: Registry,

    // Asset cache metrics
    pub cache_hits: IntCounter,
    pub cache_misses: IntCounter,
    pub network_fetches: IntCounter,
    pub network_failures: IntCounter,
    pub fallback_responses: IntCounter,
    pub cache_generations_deleted: IntCounter,

    // Question cache metrics
    pub downloads_total: IntCounter,
    pub downloads_failed: IntCounter,
    pub syncs_total: IntCounter,
    pub syncs_failed: IntCounter,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

fn counter(name: &str, help: &str) -> IntCounter {
    IntCounter::new(name, help).expect("metric creation failed")
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let cache_hits = counter(
            "trivia_offline_cache_hits_total",
            "Requests served from a named cache",
        );
        let cache_misses = counter(
            "trivia_offline_cache_misses_total",
            "Requests not found in any current cache",
        );
        let network_fetches = counter(
            "trivia_offline_network_fetches_total",
            "Network fetches issued by the asset cache controller",
        );
        let network_failures = counter(
            "trivia_offline_network_failures_total",
            "Network fetches that failed",
        );
        let fallback_responses = counter(
            "trivia_offline_fallback_responses_total",
            "Failed fetches answered with the cached fallback page or an error response",
        );
        let cache_generations_deleted = counter(
            "trivia_offline_cache_generations_deleted_total",
            "Stale cache generations removed on activation",
        );

        let downloads_total = counter(
            "trivia_offline_downloads_total",
            "Question set downloads attempted",
        );
        let downloads_failed = counter(
            "trivia_offline_downloads_failed_total",
            "Question set downloads that failed",
        );
        let syncs_total = counter(
            "trivia_offline_syncs_total",
            "Background resynchronizations requested, including skipped ones",
        );
        let syncs_failed = counter(
            "trivia_offline_syncs_failed_total",
            "Background resynchronizations whose download failed",
        );

        for metric in [
            &cache_hits,
            &cache_misses,
            &network_fetches,
            &network_failures,
            &fallback_responses,
            &cache_generations_deleted,
            &downloads_total,
            &downloads_failed,
            &syncs_total,
            &syncs_failed,
        ] {
            registry
                .register(Box::new(metric.clone()))
                .expect("metric registration failed");
        }

        Self {
            registry,
            cache_hits,
            cache_misses,
            network_fetches,
            network_failures,
            fallback_responses,
            cache_generations_deleted,
            downloads_total,
            downloads_failed,
            syncs_total,
            syncs_failed,
        }
    }

    pub fn record_cache_lookup(&self, hit: bool) {
        if hit {
            self.cache_hits.inc();
        } else {
            self.cache_misses.inc();
        }
    }

    pub fn record_network_fetch(&self, success: bool) {
        self.network_fetches.inc();
        if !success {
            self.network_failures.inc();
        }
    }

    pub fn record_fallback_response(&self) {
        self.fallback_responses.inc();
    }

    pub fn record_generations_deleted(&self, count: usize) {
        self.cache_generations_deleted.inc_by(count as u64);
    }

    pub fn record_download(&self, success: bool) {
        self.downloads_total.inc();
        if !success {
            self.downloads_failed.inc();
        }
    }

    pub fn record_sync_started(&self) {
        self.syncs_total.inc();
    }

    pub fn record_sync_failed(&self) {
        self.syncs_failed.inc();
    }

    pub fn gather_metrics(&self) -> Vec<prometheus::proto::MetricFamily> {
        self.registry.gather()
    }

    /// Text exposition format, for the CLI `status --metrics` output
    pub fn encode_text(&self) -> String {
        use prometheus::Encoder;

        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::new();
        if encoder.encode(&self.gather_metrics(), &mut buffer).is_err() {
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}
