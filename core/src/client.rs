//! Stateless HTTP request builder and response parser for the optimization
//! service.
//!
//! # Design
//! `SwiftCloudClient` holds only the base URL and the passthrough request tag.
//! Each operation is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`. The
//! bearer token is an argument, not state: obtaining it is the job of
//! `CloudApi`. Precondition checks run inside `build_*`, so an invalid input
//! never yields a request.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::{CloudConfig, RequestTag};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::status::check_status;
use crate::types::{
    ArrivalRates, FixedTimeSchedule, GreenYellowInterval, Intersection, Objective,
    OptimizationParams, OptimizedSchedule, PhaseDiagram,
};

pub const FTS_OPTIMIZATION_PATH: &str = "/fts-optimization";
pub const PHASE_DIAGRAM_PATH: &str = "/phase-diagram-computation";

#[derive(Serialize)]
struct FtsOptimizationBody<'a> {
    intersection: &'a Intersection,
    arrival_rates: &'a ArrivalRates,
    min_period_duration: f64,
    max_period_duration: f64,
    objective: Objective,
    #[serde(flatten)]
    tag: Option<&'a RequestTag>,
}

#[derive(Serialize)]
struct PhaseDiagramBody<'a> {
    intersection: &'a Intersection,
    greenyellow_intervals: &'a BTreeMap<String, Vec<GreenYellowInterval>>,
    period: f64,
}

#[derive(Deserialize)]
struct FtsOptimizationOutput {
    fixed_time_schedule: FixedTimeSchedule,
    phase_diagram: PhaseDiagram,
    obj_value: f64,
}

#[derive(Deserialize)]
struct PhaseDiagramOutput {
    phase_diagram: PhaseDiagram,
}

/// Synchronous, stateless client for the optimization service.
///
/// Builds `HttpRequest` values and parses `HttpResponse` values without
/// touching the network.
#[derive(Debug, Clone)]
pub struct SwiftCloudClient {
    base_url: String,
    request_tag: Option<RequestTag>,
}

impl SwiftCloudClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            request_tag: None,
        }
    }

    pub fn from_config(config: &CloudConfig) -> Self {
        Self::new(&config.base_url).with_request_tag(config.request_tag.clone())
    }

    pub fn with_request_tag(mut self, tag: Option<RequestTag>) -> Self {
        self.request_tag = tag;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_optimize_fts(
        &self,
        token: &str,
        intersection: &Intersection,
        arrival_rates: &ArrivalRates,
        params: &OptimizationParams,
    ) -> Result<HttpRequest, ApiError> {
        arrival_rates.validate_for(intersection)?;
        let body = FtsOptimizationBody {
            intersection,
            arrival_rates,
            min_period_duration: params.min_period_duration,
            max_period_duration: params.max_period_duration,
            objective: params.objective,
            tag: self.request_tag.as_ref(),
        };
        self.post(FTS_OPTIMIZATION_PATH, token, &body)
    }

    pub fn build_phase_diagram(
        &self,
        token: &str,
        intersection: &Intersection,
        schedule: &FixedTimeSchedule,
    ) -> Result<HttpRequest, ApiError> {
        let body = PhaseDiagramBody {
            intersection,
            greenyellow_intervals: &schedule.greenyellow_intervals,
            period: schedule.period,
        };
        self.post(PHASE_DIAGRAM_PATH, token, &body)
    }

    pub fn parse_optimize_fts(&self, response: HttpResponse) -> Result<OptimizedSchedule, ApiError> {
        check_status(&response)?;
        let output: FtsOptimizationOutput = serde_json::from_str(&response.body)
            .map_err(|e| ApiError::Deserialization(e.to_string()))?;
        Ok(OptimizedSchedule {
            fixed_time_schedule: output.fixed_time_schedule,
            phase_diagram: output.phase_diagram,
            objective_value: output.obj_value,
        })
    }

    pub fn parse_phase_diagram(&self, response: HttpResponse) -> Result<PhaseDiagram, ApiError> {
        check_status(&response)?;
        let output: PhaseDiagramOutput = serde_json::from_str(&response.body)
            .map_err(|e| ApiError::Deserialization(e.to_string()))?;
        Ok(output.phase_diagram)
    }

    fn post<B: Serialize>(&self, path: &str, token: &str, body: &B) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(body).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(HttpRequest {
            method: HttpMethod::Post,
            path: format!("{}{path}", self.base_url),
            headers: vec![
                ("content-type".to_string(), "application/json".to_string()),
                ("authorization".to_string(), format!("Bearer {token}")),
            ],
            body: Some(body),
        })
    }
}
