//! Network reachability gate.

use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use url::Url;

use crate::app::{MurmurError, Result};
use crate::config::Config;

#[async_trait]
pub trait Connectivity {
    async fn is_connected(&self) -> bool;
}

/// Treats the network as available when a TCP connection to the probe
/// address succeeds within the timeout.
pub struct TcpProbe {
    addr: String,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let addr = match &config.connectivity.probe_addr {
            Some(addr) => addr.clone(),
            None => Self::addr_for(&config.api.base_url)?,
        };
        Ok(Self::new(
            addr,
            Duration::from_millis(config.connectivity.timeout_ms),
        ))
    }

    /// `host:port` for a URL, using the scheme's default port.
    fn addr_for(base_url: &str) -> Result<String> {
        let url = Url::parse(base_url)?;
        let host = url
            .host_str()
            .ok_or_else(|| MurmurError::Config(format!("No host in {}", base_url)))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| MurmurError::Config(format!("No port for {}", base_url)))?;
        Ok(format!("{}:{}", host, port))
    }
}

#[async_trait]
impl Connectivity for TcpProbe {
    async fn is_connected(&self) -> bool {
        match tokio::time::timeout(self.timeout, TcpStream::connect(&self.addr)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                tracing::debug!("Connectivity probe to {} failed: {}", self.addr, e);
                false
            }
            Err(_) => {
                tracing::debug!("Connectivity probe to {} timed out", self.addr);
                false
            }
        }
    }
}
