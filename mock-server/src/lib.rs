//! In-process stand-in for the optimization service.
//!
//! Serves both POST endpoints with deterministic toy results, enforces the
//! bearer token and the accepted API version, and counts the requests it
//! receives so tests can assert that no call was made.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;

pub const DEFAULT_TOKEN: &str = "test-token";
pub const ACCEPTED_VERSION: &str = "0.7.0.alpha";

/// Period the toy optimizer aims for before clamping to the requested bounds.
const PREFERRED_PERIOD: f64 = 60.0;

#[derive(Clone, Debug)]
pub struct MockConfig {
    /// Bearer token the server accepts.
    pub token: String,
    /// When set, every POST is answered with this status unless the request
    /// carries its own `x-mock-status`.
    pub forced_status: Option<u16>,
    /// Requests carrying a different `version` field get a 426.
    pub accepted_version: String,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            token: DEFAULT_TOKEN.to_string(),
            forced_status: None,
            accepted_version: ACCEPTED_VERSION.to_string(),
        }
    }
}

#[derive(Clone)]
struct AppState {
    config: Arc<MockConfig>,
    requests: Arc<AtomicUsize>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SignalGroup {
    pub id: String,
    pub traffic_lights: Vec<serde_json::Value>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Intersection {
    pub signalgroups: Vec<SignalGroup>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct FtsOptimizationRequest {
    pub intersection: Intersection,
    pub arrival_rates: BTreeMap<String, Vec<f64>>,
    pub min_period_duration: f64,
    pub max_period_duration: f64,
    pub objective: String,
    pub version: Option<String>,
    pub request_id: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Interval {
    pub start_greenyellow: f64,
    pub end_greenyellow: f64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PhaseDiagramRequest {
    pub intersection: Intersection,
    pub greenyellow_intervals: BTreeMap<String, Vec<Interval>>,
    pub period: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GreenYellowPhase {
    pub signalgroup_id: String,
    pub interval_index: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Phase {
    pub greenyellow_phases: Vec<GreenYellowPhase>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PhaseDiagram {
    pub phases: Vec<Phase>,
}

pub fn app() -> Router {
    app_with(MockConfig::default())
}

pub fn app_with(config: MockConfig) -> Router {
    let state = AppState {
        config: Arc::new(config),
        requests: Arc::new(AtomicUsize::new(0)),
    };
    Router::new()
        .route("/fts-optimization", post(optimize_fts))
        .route("/phase-diagram-computation", post(compute_phase_diagram))
        .route("/requests", get(request_count))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with(listener, MockConfig::default()).await
}

pub async fn run_with(listener: TcpListener, config: MockConfig) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(config)).await
}

fn error(status: StatusCode, body: serde_json::Value) -> Response {
    (status, Json(body)).into_response()
}

/// Per-request status override; takes precedence over `MockConfig::forced_status`.
pub const STATUS_OVERRIDE_HEADER: &str = "x-mock-status";

/// Shared front matter of every POST: count it, then enforce the forced
/// status and the bearer token.
fn admit(state: &AppState, headers: &HeaderMap) -> Result<(), Response> {
    state.requests.fetch_add(1, Ordering::SeqCst);

    let overridden = headers
        .get(STATUS_OVERRIDE_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u16>().ok());
    if let Some(code) = overridden.or(state.config.forced_status) {
        let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        tracing::info!(%status, "answering with forced status");
        return Err(match code {
            400 => error(status, json!({"detail": "forced bad request"})),
            426 => error(status, json!({"msg": "forced upgrade"})),
            _ => status.into_response(),
        });
    }

    let expected = format!("Bearer {}", state.config.token);
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == expected);
    if !authorized {
        tracing::info!("rejecting request without valid bearer token");
        return Err(StatusCode::UNAUTHORIZED.into_response());
    }
    Ok(())
}

fn parse_body<T: for<'de> Deserialize<'de>>(body: &str) -> Result<T, Response> {
    serde_json::from_str(body)
        .map_err(|e| error(StatusCode::BAD_REQUEST, json!({"detail": e.to_string()})))
}

async fn optimize_fts(State(state): State<AppState>, headers: HeaderMap, body: String) -> Response {
    if let Err(response) = admit(&state, &headers) {
        return response;
    }
    let request: FtsOptimizationRequest = match parse_body(&body) {
        Ok(r) => r,
        Err(response) => return response,
    };
    tracing::info!(request_id = ?request.request_id, objective = %request.objective, "fts optimization");

    if let Some(version) = &request.version {
        if *version != state.config.accepted_version {
            return error(
                StatusCode::UPGRADE_REQUIRED,
                json!({"msg": format!(
                    "version {version} is no longer supported; use {}",
                    state.config.accepted_version
                )}),
            );
        }
    }
    if request.min_period_duration > request.max_period_duration {
        return error(
            StatusCode::BAD_REQUEST,
            json!({"detail": "min_period_duration exceeds max_period_duration"}),
        );
    }
    for group in &request.intersection.signalgroups {
        let count = request.arrival_rates.get(&group.id).map(Vec::len);
        if count != Some(group.traffic_lights.len()) {
            return error(
                StatusCode::BAD_REQUEST,
                json!({"detail": format!("arrival rates do not match signalgroup {}", group.id)}),
            );
        }
    }

    let period = PREFERRED_PERIOD.clamp(request.min_period_duration, request.max_period_duration);
    let schedule = round_robin_schedule(&request.intersection, period);
    let obj_value = match request.objective.as_str() {
        "min_delay" => request.arrival_rates.values().flatten().sum::<f64>() / 100.0,
        "min_period" => period,
        "max_capacity" => 1.0,
        other => {
            return error(
                StatusCode::BAD_REQUEST,
                json!({"detail": format!("unknown objective {other}")}),
            )
        }
    };
    let phase_diagram = sequential_phases(&schedule);

    Json(json!({
        "fixed_time_schedule": {"greenyellow_intervals": schedule, "period": period},
        "phase_diagram": phase_diagram,
        "obj_value": obj_value,
    }))
    .into_response()
}

async fn compute_phase_diagram(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    if let Err(response) = admit(&state, &headers) {
        return response;
    }
    let request: PhaseDiagramRequest = match parse_body(&body) {
        Ok(r) => r,
        Err(response) => return response,
    };
    tracing::info!(period = request.period, "phase diagram computation");

    for group in &request.intersection.signalgroups {
        if !request.greenyellow_intervals.contains_key(&group.id) {
            return error(
                StatusCode::BAD_REQUEST,
                json!({"detail": format!("no greenyellow interval for signalgroup {}", group.id)}),
            );
        }
    }
    Json(json!({"phase_diagram": sequential_phases(&request.greenyellow_intervals)})).into_response()
}

async fn request_count(State(state): State<AppState>) -> Json<usize> {
    Json(state.requests.load(Ordering::SeqCst))
}

/// Give every signal group one equal slot of the period, in intersection
/// order, keeping 20% of each slot as clearance.
fn round_robin_schedule(intersection: &Intersection, period: f64) -> BTreeMap<String, Vec<Interval>> {
    let n = intersection.signalgroups.len().max(1) as f64;
    let slot = period / n;
    intersection
        .signalgroups
        .iter()
        .enumerate()
        .map(|(i, group)| {
            let start = i as f64 * slot;
            let interval = Interval {
                start_greenyellow: start,
                end_greenyellow: start + slot - slot / 5.0,
            };
            (group.id.clone(), vec![interval])
        })
        .collect()
}

/// One phase per distinct start time, ordered by start.
fn sequential_phases(intervals: &BTreeMap<String, Vec<Interval>>) -> PhaseDiagram {
    let mut starts: Vec<(f64, GreenYellowPhase)> = intervals
        .iter()
        .flat_map(|(id, list)| {
            list.iter().enumerate().map(move |(index, interval)| {
                (
                    interval.start_greenyellow,
                    GreenYellowPhase {
                        signalgroup_id: id.clone(),
                        interval_index: index,
                    },
                )
            })
        })
        .collect();
    starts.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut phases: Vec<(f64, Phase)> = Vec::new();
    for (start, gy) in starts {
        match phases.last_mut() {
            Some((s, phase)) if *s == start => phase.greenyellow_phases.push(gy),
            _ => phases.push((
                start,
                Phase {
                    greenyellow_phases: vec![gy],
                },
            )),
        }
    }
    PhaseDiagram {
        phases: phases.into_iter().map(|(_, p)| p).collect(),
    }
}
