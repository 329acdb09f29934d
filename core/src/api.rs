//! I/O-driving facade over `SwiftCloudClient`.
//!
//! # Design
//! Every public operation runs the same ordered steps: local validation,
//! connectivity check, token acquisition, request construction, transport,
//! status classification, decoding. Validation comes first so that invalid
//! input never causes network traffic, not even the connectivity probe.
//!
//! The token lives in a `TokenCache` shared by all calls on one `CloudApi`.
//! A 401 response drops the cached token so the next call acquires a fresh
//! one; the failing call itself is not retried.

use std::time::Duration;

use crate::auth::{AuthToken, EnvTokenProvider, TokenCache, TokenProvider};
use crate::client::SwiftCloudClient;
use crate::config::CloudConfig;
use crate::connectivity::{ConnectivityCheck, TcpConnectivityProbe};
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::{HttpTransport, UreqTransport};
use crate::types::{
    ArrivalRates, FixedTimeSchedule, Intersection, OptimizationParams, OptimizedSchedule,
    PhaseDiagram,
};

/// Client for the optimization service that performs its own I/O.
pub struct CloudApi<T = UreqTransport> {
    client: SwiftCloudClient,
    transport: T,
    connectivity: Box<dyn ConnectivityCheck + Send + Sync>,
    tokens: Box<dyn TokenProvider + Send + Sync>,
    cache: TokenCache,
}

impl CloudApi<UreqTransport> {
    /// Build a client from `CloudConfig::default()`, with credentials from
    /// the `SWIFT_CLOUD_API_TOKEN` environment variable and a TCP probe
    /// against the service host.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::with_config(CloudConfig::default(), EnvTokenProvider::default())
    }

    pub fn with_config(
        config: CloudConfig,
        tokens: impl TokenProvider + Send + Sync + 'static,
    ) -> Result<Self, ApiError> {
        let timeout = Duration::from_millis(config.connect_timeout_ms);
        let probe = TcpConnectivityProbe::for_url(&config.base_url, timeout)?;
        Ok(Self::new(
            &config,
            UreqTransport::new(timeout),
            probe,
            tokens,
        ))
    }
}

impl<T: HttpTransport> CloudApi<T> {
    pub fn new(
        config: &CloudConfig,
        transport: T,
        connectivity: impl ConnectivityCheck + Send + Sync + 'static,
        tokens: impl TokenProvider + Send + Sync + 'static,
    ) -> Self {
        Self {
            client: SwiftCloudClient::from_config(config),
            transport,
            connectivity: Box::new(connectivity),
            tokens: Box::new(tokens),
            cache: TokenCache::new(),
        }
    }

    pub fn client(&self) -> &SwiftCloudClient {
        &self.client
    }

    /// Drop the cached token; the next call acquires a new one.
    pub fn invalidate_token(&self) {
        self.cache.invalidate();
    }

    pub fn has_cached_token(&self) -> bool {
        self.cache.is_cached()
    }

    /// Optimize a fixed-time schedule for `intersection`.
    ///
    /// `arrival_rates` must hold one rate (PCE/h) per traffic light of every
    /// signal group; otherwise `ApiError::Validation` is returned and no
    /// request is sent.
    pub fn optimize_fts(
        &self,
        intersection: &Intersection,
        arrival_rates: &ArrivalRates,
        params: &OptimizationParams,
    ) -> Result<OptimizedSchedule, ApiError> {
        arrival_rates.validate_for(intersection)?;
        let token = self.prepare()?;
        let request =
            self.client
                .build_optimize_fts(token.as_str(), intersection, arrival_rates, params)?;
        let response = self.send(&request)?;
        let result = self.client.parse_optimize_fts(response)?;
        tracing::info!(
            objective = %params.objective,
            objective_value = result.objective_value,
            period = result.fixed_time_schedule.period,
            "received optimized fixed-time schedule"
        );
        Ok(result)
    }

    /// Compute the phase diagram of `schedule` on `intersection`.
    pub fn phase_diagram(
        &self,
        intersection: &Intersection,
        schedule: &FixedTimeSchedule,
    ) -> Result<PhaseDiagram, ApiError> {
        let token = self.prepare()?;
        let request = self
            .client
            .build_phase_diagram(token.as_str(), intersection, schedule)?;
        let response = self.send(&request)?;
        self.client.parse_phase_diagram(response)
    }

    /// Pre-call gates, in order: connectivity, then authentication.
    fn prepare(&self) -> Result<AuthToken, ApiError> {
        self.connectivity.ensure_connectivity()?;
        self.cache.get_or_acquire(self.tokens.as_ref())
    }

    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        tracing::debug!(method = request.method.as_str(), path = %request.path, "calling cloud service");
        let response = self.transport.execute(request).map_err(|e| {
            tracing::warn!(path = %request.path, error = %e, "cloud service unreachable");
            ApiError::ServiceUnreachable(e.to_string())
        })?;
        tracing::debug!(status = response.status, "cloud service responded");
        if response.status == 401 {
            tracing::debug!("credentials rejected, dropping cached token");
            self.cache.invalidate();
        }
        Ok(response)
    }
}
