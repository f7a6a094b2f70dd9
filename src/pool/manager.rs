use super::{ConnectionPool, PoolStats, PooledConnection, ADMIN_QUERY};
use crate::config::Config;
use crate::error::Result;
use async_trait::async_trait;
use deadpool_postgres::{Config as PoolConfig, Object, Pool, Runtime};
use tokio_postgres::NoTls;
use tracing::{debug, info, warn};

pub struct PostgresPool {
    pool: Pool,
}

impl PostgresPool {
    /// Build the pool. Connections are opened lazily, so this succeeds even
    /// when the database is down.
    pub fn new(config: &Config) -> Result<Self> {
        let mut cfg = PoolConfig::new();
        cfg.url = Some(config.database_url.clone());

        cfg.pool = Some(deadpool_postgres::PoolConfig {
            max_size: config.pool_max_size as usize,
            timeouts: deadpool_postgres::Timeouts {
                wait: Some(config.pool_acquire_timeout),
                create: Some(config.pool_acquire_timeout),
                recycle: Some(config.pool_acquire_timeout),
            },
            ..Default::default()
        });

        let pool = cfg.create_pool(Some(Runtime::Tokio1), NoTls)?;

        info!(
            "Connection pool configured for {} (max_size={})",
            config.redacted_database_url(),
            config.pool_max_size
        );

        Ok(Self { pool })
    }

    /// Open one connection and ping it. Failure is logged, never fatal: the
    /// health endpoint reports it instead.
    pub async fn warm_up(&self) {
        let client = match self.pool.get().await {
            Ok(client) => client,
            Err(e) => {
                warn!("Database not reachable at startup: {}", e);
                return;
            }
        };

        match client.execute("SELECT 1", &[]).await {
            Ok(_) => info!("Connected to PostgreSQL"),
            Err(e) => warn!("Database ping failed at startup: {}", e),
        }
    }
}

#[async_trait]
impl ConnectionPool for PostgresPool {
    async fn acquire(&self) -> Result<Box<dyn PooledConnection>> {
        let client = self.pool.get().await?;
        debug!("Acquired pooled connection");
        Ok(Box::new(client))
    }

    fn stats(&self) -> PoolStats {
        let status = self.pool.status();
        PoolStats {
            max_size: status.max_size,
            size: status.size,
            available: status.available,
        }
    }
}

#[async_trait]
impl PooledConnection for Object {
    async fn first_admin_role(&self) -> Result<Option<String>> {
        let rows = self.query(ADMIN_QUERY, &[]).await?;

        // A missing or non-text role column reads as "no role"
        Ok(rows
            .first()
            .and_then(|row| row.try_get::<_, Option<String>>("role").ok())
            .flatten())
    }
}
