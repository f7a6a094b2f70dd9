use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub pool_max_size: u32,
    pub pool_acquire_timeout: Duration,
    pub healthcheck_timeout: Duration,
    pub metrics_namespace: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_source(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// `from_env` passes the process environment; tests pass a map.
    pub fn from_source<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        // DATABASE_URL wins over the individual POSTGRES_* parts
        let database_url = match lookup("DATABASE_URL") {
            Some(url) => url,
            None => {
                let db_host = var("POSTGRES_HOST", "localhost");
                let db_port = var("POSTGRES_PORT", "5432");
                let db_user = var("POSTGRES_USER", "postgres");
                let db_password = var("POSTGRES_PASSWORD", "");
                let db_name = var("POSTGRES_DB", "postgres");

                // URL-encode credentials to handle special characters
                format!(
                    "postgres://{}:{}@{}:{}/{}",
                    urlencoding::encode(&db_user),
                    urlencoding::encode(&db_password),
                    db_host,
                    db_port,
                    db_name
                )
            }
        };

        let host = var("HOST", "0.0.0.0");
        let port = parse_or(&lookup, "PORT", DEFAULT_PORT);
        let pool_max_size = parse_or(&lookup, "POOL_MAX_SIZE", 10u32);
        let pool_acquire_timeout_secs = parse_or(&lookup, "POOL_ACQUIRE_TIMEOUT_SECS", 5u64);
        let healthcheck_timeout_secs = parse_or(&lookup, "HEALTHCHECK_TIMEOUT_SECS", 10u64);

        if pool_max_size == 0 {
            anyhow::bail!("POOL_MAX_SIZE must be at least 1");
        }
        if pool_acquire_timeout_secs == 0 {
            anyhow::bail!("POOL_ACQUIRE_TIMEOUT_SECS must be at least 1");
        }
        if healthcheck_timeout_secs == 0 {
            anyhow::bail!("HEALTHCHECK_TIMEOUT_SECS must be at least 1");
        }

        let metrics_namespace = var("METRICS_NAMESPACE", "healthcheck");

        Ok(Config {
            database_url,
            host,
            port,
            pool_max_size,
            pool_acquire_timeout: Duration::from_secs(pool_acquire_timeout_secs),
            healthcheck_timeout: Duration::from_secs(healthcheck_timeout_secs),
            metrics_namespace,
        })
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().map_err(|e| anyhow::anyhow!("Invalid socket address {}: {}", addr, e))
    }

    /// Database URL with the password masked, for logging.
    pub fn redacted_database_url(&self) -> String {
        let Some(scheme_end) = self.database_url.find("://") else {
            return self.database_url.clone();
        };
        let rest = &self.database_url[scheme_end + 3..];
        let Some(at) = rest.rfind('@') else {
            return self.database_url.clone();
        };

        let userinfo = &rest[..at];
        match userinfo.split_once(':') {
            Some((user, _)) => format!(
                "{}{}:***{}",
                &self.database_url[..scheme_end + 3],
                user,
                &rest[at..]
            ),
            None => self.database_url.clone(),
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Copy + std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Invalid value {:?} for {}, using default {}", raw, key, default);
            default
        }),
        None => default,
    }
}
