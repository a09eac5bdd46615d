// src/metrics/collector.rs
use anyhow::Result;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::Instant;

pub struct MetricsRegistry {
    registry: Registry,
    collector: Arc<MetricsCollector>,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let collector = Arc::new(MetricsCollector::new(&registry)?);

        Ok(Self {
            registry,
            collector,
        })
    }

    pub fn collector(&self) -> Arc<MetricsCollector> {
        self.collector.clone()
    }

    pub fn gather(&self) -> Vec<u8> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        if encoder.encode(&metric_families, &mut buffer).is_err() {
            buffer.clear();
        }
        buffer
    }
}

pub struct MetricsCollector {
    // Discovery metrics
    pub discovery_cycles_total: IntCounter,
    pub live_backends: IntGauge,
    pub registry_version: IntGauge,

    // Forwarding metrics
    pub forward_requests_total: IntCounterVec,
    pub forward_duration_seconds: HistogramVec,
}

impl MetricsCollector {
    pub fn new(registry: &Registry) -> Result<Self> {
        let discovery_cycles_total = IntCounter::with_opts(Opts::new(
            "gateway_discovery_cycles_total",
            "Completed discovery cycles",
        ))?;
        let live_backends = IntGauge::with_opts(Opts::new(
            "gateway_live_backends",
            "Backends currently in the registry",
        ))?;
        let registry_version = IntGauge::with_opts(Opts::new(
            "gateway_registry_version",
            "Version of the current registry snapshot",
        ))?;
        let forward_requests_total = IntCounterVec::new(
            Opts::new(
                "gateway_forward_requests_total",
                "Forwarded operations by outcome",
            ),
            &["operation", "outcome"],
        )?;
        let forward_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "gateway_forward_duration_seconds",
                "Forwarded operation latency",
            ),
            &["operation"],
        )?;

        registry.register(Box::new(discovery_cycles_total.clone()))?;
        registry.register(Box::new(live_backends.clone()))?;
        registry.register(Box::new(registry_version.clone()))?;
        registry.register(Box::new(forward_requests_total.clone()))?;
        registry.register(Box::new(forward_duration_seconds.clone()))?;

        Ok(Self {
            discovery_cycles_total,
            live_backends,
            registry_version,
            forward_requests_total,
            forward_duration_seconds,
        })
    }

    pub fn record_discovery_cycle(&self, live: usize, version: u64) {
        self.discovery_cycles_total.inc();
        self.live_backends.set(live as i64);
        self.registry_version.set(version as i64);
    }

    pub fn record_forward(&self, operation: &str, start: Instant, ok: bool) {
        let outcome = if ok { "success" } else { "failure" };
        self.forward_requests_total
            .with_label_values(&[operation, outcome])
            .inc();
        self.forward_duration_seconds
            .with_label_values(&[operation])
            .observe(start.elapsed().as_secs_f64());
    }
}
