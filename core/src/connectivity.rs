//! Fail-fast connectivity checks run before every remote call.

use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use url::{Host, Url};

use crate::error::ApiError;

/// Decides whether a network path to the service exists.
pub trait ConnectivityCheck {
    fn ensure_connectivity(&self) -> Result<(), ApiError>;
}

/// Probes connectivity by opening (and immediately closing) a TCP connection.
#[derive(Debug, Clone)]
pub struct TcpConnectivityProbe {
    host: String,
    port: u16,
    timeout: Duration,
}

impl TcpConnectivityProbe {
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
        }
    }

    /// Probe the host and port named by an `http://` or `https://` URL.
    pub fn for_url(url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let parsed = Url::parse(url)
            .map_err(|e| ApiError::Validation(format!("invalid URL {url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiError::Validation(format!("unsupported URL scheme: {url}")));
        }
        let host = match parsed.host() {
            Some(Host::Domain(domain)) => domain.to_string(),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Ipv6(addr)) => addr.to_string(),
            None => return Err(ApiError::Validation(format!("missing host in URL: {url}"))),
        };
        let port = parsed
            .port_or_known_default()
            .ok_or_else(|| ApiError::Validation(format!("missing port in URL: {url}")))?;
        Ok(Self::new(host, port, timeout))
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl ConnectivityCheck for TcpConnectivityProbe {
    fn ensure_connectivity(&self) -> Result<(), ApiError> {
        let addrs = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| ApiError::NoConnectivity(format!("cannot resolve {}: {e}", self.host)))?;
        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.timeout) {
                Ok(_) => return Ok(()),
                Err(e) => last_err = Some(e),
            }
        }
        let reason = last_err
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no addresses resolved".to_string());
        tracing::warn!(host = %self.host, port = self.port, %reason, "connectivity probe failed");
        Err(ApiError::NoConnectivity(format!(
            "{}:{} is not reachable: {reason}",
            self.host, self.port
        )))
    }
}

/// Skips the check. For hosts that do their own network monitoring.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysOnline;

impl ConnectivityCheck for AlwaysOnline {
    fn ensure_connectivity(&self) -> Result<(), ApiError> {
        Ok(())
    }
}
