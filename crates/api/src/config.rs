//! Server configuration from environment variables.

use anyhow::{Context, Result};
use eventline_core::config::CoreConfig;
use std::env;

/// API process configuration: the shared [`CoreConfig`] plus the HTTP
/// listener settings that have no meaning outside this process.
#[derive(Debug, Clone)]
pub struct Config {
    pub core: CoreConfig,
    pub host: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let core = CoreConfig::from_env()?;
        Ok(Self {
            core,
            host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("failed to parse API_PORT as u16")?,
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
        for key in ["DATABASE_URL", "SECRET_KEY", "API_HOST", "API_PORT"] {
            unsafe { std::env::remove_var(key) };
        }
        unsafe {
            std::env::set_var("DATABASE_URL", "postgres://test");
            std::env::set_var("SECRET_KEY", "test-secret");
        }
        let config = Config::from_env().unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
    }
}
