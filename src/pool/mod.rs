//! Connection pool seam
//!
//! The health check only needs two things from a pool: lend a connection and
//! report its occupancy. `PostgresPool` backs this with deadpool-postgres; the
//! lease returned by `acquire` goes back to the pool when it is dropped.

#[cfg(test)]
pub(crate) mod fake;
mod manager;

use crate::error::Result;
use async_trait::async_trait;

pub use manager::PostgresPool;

/// Query run on every health check.
pub const ADMIN_QUERY: &str = "SELECT * FROM users WHERE role = 'admin'";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub max_size: usize,
    pub size: usize,
    pub available: usize,
}

#[async_trait]
pub trait ConnectionPool: Send + Sync {
    /// Lease a connection. Dropping the returned value releases it.
    async fn acquire(&self) -> Result<Box<dyn PooledConnection>>;

    fn stats(&self) -> PoolStats;
}

#[async_trait]
pub trait PooledConnection: Send + Sync {
    /// Run [`ADMIN_QUERY`] and return the `role` of the first row, if any.
    async fn first_admin_role(&self) -> Result<Option<String>>;
}
