//! Worker process configuration: the shared [`CoreConfig`] plus the
//! job-loop tuning knobs that have no meaning outside this process.

use anyhow::{Context, Result};
use eventline_core::config::CoreConfig;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub core: CoreConfig,

    /// How long to sleep before re-polling an empty queue.
    pub poll_interval_secs: u64,
    /// Jobs are marked `failed` (not rescheduled) once `retry_count`
    /// reaches this ceiling.
    pub max_retry_count: i32,
    /// Maximum jobs claimed per fetch / kept in flight at once.
    pub batch_size: i64,
    /// How often to log a queue-depth status line.
    pub status_log_interval_secs: u64,
    /// How often the rejected-event janitorial sweep runs (§4.7).
    pub janitor_interval_secs: u64,
    /// Rejected events older than this are swept (§4.7: 30 days).
    pub rejected_event_retention_days: i64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let core = CoreConfig::from_env()?;
        Ok(Self {
            core,
            poll_interval_secs: env::var("WORKER_POLL_INTERVAL_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("WORKER_POLL_INTERVAL_SECS must be a valid integer")?,
            max_retry_count: env::var("WORKER_MAX_RETRY_COUNT")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .context("WORKER_MAX_RETRY_COUNT must be a valid integer")?,
            batch_size: env::var("WORKER_BATCH_SIZE")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("WORKER_BATCH_SIZE must be a valid integer")?,
            status_log_interval_secs: env::var("WORKER_STATUS_LOG_INTERVAL_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .context("WORKER_STATUS_LOG_INTERVAL_SECS must be a valid integer")?,
            janitor_interval_secs: env::var("WORKER_JANITOR_INTERVAL_SECS")
                .unwrap_or_else(|_| "3600".to_string())
                .parse()
                .context("WORKER_JANITOR_INTERVAL_SECS must be a valid integer")?,
            rejected_event_retention_days: env::var("WORKER_REJECTED_EVENT_RETENTION_DAYS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .context("WORKER_REJECTED_EVENT_RETENTION_DAYS must be a valid integer")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn from_env_applies_documented_defaults() {
        for key in ["DATABASE_URL", "SECRET_KEY"] {
            unsafe { std::env::remove_var(key) };
        }
        unsafe {
            std::env::set_var("DATABASE_URL", "postgres://test");
            std::env::set_var("SECRET_KEY", "test-secret");
        }
        let config = Config::from_env().unwrap();
        assert_eq!(config.poll_interval_secs, 10);
        assert_eq!(config.max_retry_count, 5);
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.janitor_interval_secs, 3600);
        assert_eq!(config.rejected_event_retention_days, 30);
    }
}
