use crate::api::AppState;
use crate::error::{Result, ServiceError};
use crate::metrics::HealthOutcome;
use crate::pool::ConnectionPool;
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, error};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    pub database: bool,
    #[serde(rename = "userAdmin")]
    pub user_admin: bool,
}

impl HealthStatus {
    pub fn reachable(user_admin: bool) -> Self {
        Self {
            database: true,
            user_admin,
        }
    }

    pub fn unreachable() -> Self {
        Self {
            database: false,
            user_admin: false,
        }
    }
}

/// Lease a connection, look for an admin user, give the connection back.
///
/// The lease lives only inside the timed block, so it is released before this
/// returns on every path: success, query error, or the timeout dropping the
/// in-flight future.
pub async fn check_database(pool: &dyn ConnectionPool, timeout: Duration) -> Result<HealthStatus> {
    let lease_and_query = async {
        let conn = pool.acquire().await?;
        let role = conn.first_admin_role().await?;
        Ok::<_, ServiceError>(role)
    };

    let role = tokio::time::timeout(timeout, lease_and_query)
        .await
        .map_err(|_| ServiceError::Timeout { after: timeout })??;

    Ok(HealthStatus::reachable(role.as_deref() == Some("admin")))
}

pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthStatus>) {
    let started = Instant::now();
    let result = check_database(state.pool.as_ref(), state.healthcheck_timeout).await;
    let elapsed = started.elapsed();

    match result {
        Ok(status) => {
            let outcome = if status.user_admin {
                HealthOutcome::AdminPresent
            } else {
                HealthOutcome::AdminMissing
            };
            state.metrics.observe_health_check(outcome, elapsed);
            debug!("Health check ok in {:?}: {:?}", elapsed, status);

            (StatusCode::OK, Json(status))
        }
        Err(e) => {
            state
                .metrics
                .observe_health_check(HealthOutcome::DatabaseUnreachable, elapsed);
            error!("Health check failed to query the database: {}", e);

            (StatusCode::INTERNAL_SERVER_ERROR, Json(HealthStatus::unreachable()))
        }
    }
}
