//! db-healthcheck
//!
//! HTTP health check backed by a PostgreSQL connection pool. `GET /` reports
//! whether the database answers and whether an admin user exists;
//! `GET /metrics` exposes Prometheus metrics.

pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod pool;
