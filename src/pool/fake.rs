//! In-memory pool that counts leases, for handler and router tests.

use super::{ConnectionPool, PoolStats, PooledConnection};
use crate::error::{Result, ServiceError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum Behavior {
    /// Query succeeds; the first row carries this role (`None` = no rows).
    FirstRole(Option<String>),
    /// Acquisition fails, as when the database is down.
    Unreachable,
    /// Acquisition succeeds, the query errors.
    QueryFails,
    /// Acquisition succeeds, the query never completes.
    QueryHangs,
    /// Acquisition never completes.
    AcquireHangs,
}

#[derive(Clone)]
pub struct FakePool {
    behavior: Behavior,
    acquired: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
}

impl FakePool {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            acquired: Arc::new(AtomicUsize::new(0)),
            released: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_admin() -> Self {
        Self::new(Behavior::FirstRole(Some("admin".to_string())))
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectionPool for FakePool {
    async fn acquire(&self) -> Result<Box<dyn PooledConnection>> {
        match &self.behavior {
            Behavior::Unreachable => Err(ServiceError::ConnectionFailed {
                cause: "connection refused".to_string(),
            }),
            Behavior::AcquireHangs => std::future::pending().await,
            behavior => {
                self.acquired.fetch_add(1, Ordering::SeqCst);
                Ok(Box::new(FakeConnection {
                    behavior: behavior.clone(),
                    released: self.released.clone(),
                }))
            }
        }
    }

    fn stats(&self) -> PoolStats {
        let in_use = self.acquired() - self.released();
        PoolStats {
            max_size: 4,
            size: in_use,
            available: 0,
        }
    }
}

struct FakeConnection {
    behavior: Behavior,
    released: Arc<AtomicUsize>,
}

#[async_trait]
impl PooledConnection for FakeConnection {
    async fn first_admin_role(&self) -> Result<Option<String>> {
        match &self.behavior {
            Behavior::FirstRole(role) => Ok(role.clone()),
            Behavior::QueryFails => Err(ServiceError::QueryFailed {
                cause: "relation \"users\" does not exist".to_string(),
            }),
            Behavior::QueryHangs => std::future::pending().await,
            Behavior::Unreachable | Behavior::AcquireHangs => {
                unreachable!("no connection is handed out for this behavior")
            }
        }
    }
}

impl Drop for FakeConnection {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}
