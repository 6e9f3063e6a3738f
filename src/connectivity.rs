//! Internet reachability: decides whether the remote backend is worth trying.

use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;

pub const DEFAULT_HOST: &str = "vision.googleapis.com:443";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn is_online(&self) -> bool;
}

/// Online if a TCP connection to `host` opens within `timeout`.
pub struct TcpProbe {
    host: String,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(host: impl Into<String>, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            timeout,
        }
    }
}

#[async_trait]
impl ConnectivityProbe for TcpProbe {
    async fn is_online(&self) -> bool {
        match tokio::time::timeout(self.timeout, TcpStream::connect(&self.host)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                log::info!("[NET] {} unreachable: {}", self.host, e);
                false
            }
            Err(_) => {
                log::info!("[NET] {} timed out after {:?}", self.host, self.timeout);
                false
            }
        }
    }
}
