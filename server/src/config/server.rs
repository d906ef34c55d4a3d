//! Server process configuration

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub database_url: String,
    /// Address granted ADMIN at startup so the role registry is never empty
    pub bootstrap_admin: Option<String>,
}

impl ServerConfig {
    /// Load from environment.
    ///
    /// Environment variables:
    /// - `BIND_ADDR` (default "127.0.0.1:8080")
    /// - `DATABASE_URL` (default "peerlock.db")
    /// - `BOOTSTRAP_ADMIN_ADDRESS` (optional, 0x-prefixed EVM address)
    pub fn from_env() -> Result<Self> {
        let bind_addr =
            std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());

        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "peerlock.db".to_string());

        let bootstrap_admin = std::env::var("BOOTSTRAP_ADMIN_ADDRESS")
            .ok()
            .filter(|s| !s.is_empty())
            .map(|addr| {
                crate::validation::normalize_address(&addr)
                    .map_err(|e| anyhow::anyhow!("BOOTSTRAP_ADMIN_ADDRESS invalid: {e}"))
            })
            .transpose()
            .context("Failed to parse BOOTSTRAP_ADMIN_ADDRESS")?;

        Ok(Self {
            bind_addr,
            database_url,
            bootstrap_admin,
        })
    }
}
