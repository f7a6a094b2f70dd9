//! Prometheus registry for the service
//!
//! Owns its own `Registry` rather than prometheus' default global one, so each
//! `AppState` carries exactly the collectors it registered.

use crate::error::Result;
use crate::pool::PoolStats;
use prometheus::{
    Gauge, Histogram, HistogramOpts, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};
use std::time::{Duration, Instant};

const HEALTH_CHECK_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Outcome label for `health_checks_total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthOutcome {
    AdminPresent,
    AdminMissing,
    DatabaseUnreachable,
}

impl HealthOutcome {
    pub fn as_label(&self) -> &'static str {
        match self {
            HealthOutcome::AdminPresent => "admin_present",
            HealthOutcome::AdminMissing => "admin_missing",
            HealthOutcome::DatabaseUnreachable => "database_unreachable",
        }
    }
}

pub struct Metrics {
    registry: Registry,
    http_requests_total: IntCounterVec,
    health_checks_total: IntCounterVec,
    health_check_duration_seconds: Histogram,
    pool_max_size: IntGauge,
    pool_size: IntGauge,
    pool_available: IntGauge,
    uptime_seconds: Gauge,
    started_at: Instant,
}

impl Metrics {
    pub fn new(namespace: &str) -> Result<Self> {
        let registry = Registry::new();

        // process_* metrics (cpu, memory, fds, start time); procfs only exists on Linux
        #[cfg(target_os = "linux")]
        registry.register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        ))?;

        let http_requests_total = IntCounterVec::new(
            Opts::new(
                format!("{}_http_requests_total", namespace),
                "Total HTTP requests by route and status code",
            ),
            &["route", "status"],
        )?;
        registry.register(Box::new(http_requests_total.clone()))?;

        let health_checks_total = IntCounterVec::new(
            Opts::new(
                format!("{}_health_checks_total", namespace),
                "Total health checks by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(health_checks_total.clone()))?;

        let health_check_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                format!("{}_health_check_duration_seconds", namespace),
                "Time spent acquiring a connection and running the admin query",
            )
            .buckets(HEALTH_CHECK_BUCKETS.to_vec()),
        )?;
        registry.register(Box::new(health_check_duration_seconds.clone()))?;

        let pool_max_size = IntGauge::new(
            format!("{}_pool_max_size", namespace),
            "Configured maximum number of pooled connections",
        )?;
        registry.register(Box::new(pool_max_size.clone()))?;

        let pool_size = IntGauge::new(
            format!("{}_pool_size", namespace),
            "Connections currently held by the pool",
        )?;
        registry.register(Box::new(pool_size.clone()))?;

        let pool_available = IntGauge::new(
            format!("{}_pool_available", namespace),
            "Idle connections ready to be leased",
        )?;
        registry.register(Box::new(pool_available.clone()))?;

        let uptime_seconds = Gauge::new(
            format!("{}_uptime_seconds", namespace),
            "Seconds since the service started",
        )?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        let build_info = IntGaugeVec::new(
            Opts::new(format!("{}_build_info", namespace), "Build information"),
            &["version"],
        )?;
        build_info
            .with_label_values(&[env!("CARGO_PKG_VERSION")])
            .set(1);
        registry.register(Box::new(build_info))?;

        Ok(Self {
            registry,
            http_requests_total,
            health_checks_total,
            health_check_duration_seconds,
            pool_max_size,
            pool_size,
            pool_available,
            uptime_seconds,
            started_at: Instant::now(),
        })
    }

    pub fn observe_request(&self, route: &str, status: u16) {
        let status = status.to_string();
        self.http_requests_total
            .with_label_values(&[route, status.as_str()])
            .inc();
    }

    pub fn observe_health_check(&self, outcome: HealthOutcome, elapsed: Duration) {
        self.health_checks_total
            .with_label_values(&[outcome.as_label()])
            .inc();
        self.health_check_duration_seconds
            .observe(elapsed.as_secs_f64());
    }

    pub fn record_pool(&self, stats: PoolStats) {
        self.pool_max_size.set(stats.max_size as i64);
        self.pool_size.set(stats.size as i64);
        self.pool_available.set(stats.available as i64);
    }

    /// Gather every collector and encode in the text exposition format.
    pub fn render(&self) -> Result<String> {
        self.uptime_seconds
            .set(self.started_at.elapsed().as_secs_f64());

        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        Ok(encoder.encode_to_string(&metric_families)?)
    }

    pub fn content_type(&self) -> &'static str {
        prometheus::TEXT_FORMAT
    }
}
