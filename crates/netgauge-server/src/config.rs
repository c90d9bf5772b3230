use std::net::SocketAddr;

use anyhow::Context;
use netgauge_core::SizeLimits;

pub const HOST_VAR: &str = "NETGAUGE_HOST";
pub const PORT_VAR: &str = "NETGAUGE_PORT";

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub limits: SizeLimits,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup(HOST_VAR).unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = lookup(PORT_VAR)
            .unwrap_or_else(|| "3000".into())
            .parse()
            .with_context(|| format!("{} must be a port number", PORT_VAR))?;
        let limits = SizeLimits::from_lookup(&lookup);

        Ok(Self { host, port, limits })
    }

    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", self.host, self.port))
    }
}
