//! Domain DTOs exchanged with the optimization service.
//!
//! # Design
//! These types mirror the cloud service's JSON schema. The client only relies
//! on a few structural facts (signal-group ids and traffic-light counts); the
//! remaining intersection relations are passed through untouched, so the
//! server stays the authority on their meaning. Maps are `BTreeMap` so that
//! serialized bodies have a stable key order.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// A single traffic light (lane) controlled by a signal group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrafficLight {
    /// Saturation flow in personal car equivalents per hour.
    pub capacity: f64,
    /// Lost time in seconds when the light turns green.
    pub lost_time: f64,
}

/// A group of traffic lights that always show the same state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignalGroup {
    pub id: String,
    pub traffic_lights: Vec<TrafficLight>,
    pub min_greenyellow: f64,
    pub max_greenyellow: f64,
    pub min_red: f64,
    pub max_red: f64,
}

/// Two signal groups that may not be green at the same time, with the
/// clearance (setup) times between them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Conflict {
    pub id1: String,
    pub id2: String,
    pub setup12: f64,
    pub setup21: f64,
}

/// An intersection: its signal groups and the relations between them.
///
/// Relations other than conflicts are kept as raw JSON.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Intersection {
    pub signalgroups: Vec<SignalGroup>,
    #[serde(default)]
    pub conflicts: Vec<Conflict>,
    #[serde(default)]
    pub sync_starts: Vec<serde_json::Value>,
    #[serde(default)]
    pub offsets: Vec<serde_json::Value>,
    #[serde(default)]
    pub greenyellow_leads: Vec<serde_json::Value>,
}

impl Intersection {
    pub fn new(signalgroups: Vec<SignalGroup>, conflicts: Vec<Conflict>) -> Self {
        Self {
            signalgroups,
            conflicts,
            sync_starts: Vec::new(),
            offsets: Vec::new(),
            greenyellow_leads: Vec::new(),
        }
    }

    pub fn to_json(&self) -> Result<serde_json::Value, ApiError> {
        serde_json::to_value(self).map_err(|e| ApiError::Serialization(e.to_string()))
    }
}

/// Arrival rates per signal group, one rate (PCE/h) per traffic light.
///
/// Serialized as a plain JSON object keyed by signal-group id.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct ArrivalRates {
    pub id_to_arrival_rates: BTreeMap<String, Vec<f64>>,
}

impl ArrivalRates {
    pub fn new(id_to_arrival_rates: BTreeMap<String, Vec<f64>>) -> Self {
        Self { id_to_arrival_rates }
    }

    pub fn to_json(&self) -> Result<serde_json::Value, ApiError> {
        serde_json::to_value(self).map_err(|e| ApiError::Serialization(e.to_string()))
    }

    /// Check that every signal group of `intersection` has exactly one
    /// arrival rate per traffic light.
    pub fn validate_for(&self, intersection: &Intersection) -> Result<(), ApiError> {
        for signalgroup in &intersection.signalgroups {
            let rates = self.id_to_arrival_rates.get(&signalgroup.id).ok_or_else(|| {
                ApiError::Validation(format!(
                    "arrival rate(s) must be specified for signalgroup {}",
                    signalgroup.id
                ))
            })?;
            if rates.len() != signalgroup.traffic_lights.len() {
                return Err(ApiError::Validation(format!(
                    "arrival rate(s) must be specified for all traffic lights of signalgroup {} \
                     (expected {}, got {})",
                    signalgroup.id,
                    signalgroup.traffic_lights.len(),
                    rates.len()
                )));
            }
        }
        Ok(())
    }
}

impl<K: Into<String>> FromIterator<(K, Vec<f64>)> for ArrivalRates {
    fn from_iter<I: IntoIterator<Item = (K, Vec<f64>)>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// One green-yellow interval of a signal group within the period.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GreenYellowInterval {
    pub start_greenyellow: f64,
    pub end_greenyellow: f64,
}

/// A periodically repeating schedule of green-yellow intervals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FixedTimeSchedule {
    pub greenyellow_intervals: BTreeMap<String, Vec<GreenYellowInterval>>,
    pub period: f64,
}

impl FixedTimeSchedule {
    pub fn to_json(&self) -> Result<serde_json::Value, ApiError> {
        serde_json::to_value(self).map_err(|e| ApiError::Serialization(e.to_string()))
    }

    pub fn from_json(value: serde_json::Value) -> Result<Self, ApiError> {
        serde_json::from_value(value).map_err(|e| ApiError::Deserialization(e.to_string()))
    }
}

/// Reference to the `interval_index`-th green-yellow interval of a signal
/// group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GreenYellowPhase {
    pub signalgroup_id: String,
    pub interval_index: usize,
}

/// Green-yellow intervals that start together.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Phase {
    pub greenyellow_phases: Vec<GreenYellowPhase>,
}

/// The order in which signal groups receive their green-yellow intervals.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PhaseDiagram {
    pub phases: Vec<Phase>,
}

impl PhaseDiagram {
    pub fn from_json(value: serde_json::Value) -> Result<Self, ApiError> {
        serde_json::from_value(value).map_err(|e| ApiError::Deserialization(e.to_string()))
    }
}

/// Key performance indicator the optimizer targets.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    /// Minimize the delay experienced by road users.
    #[default]
    MinDelay,
    /// Smallest period for which every traffic light is stable.
    MinPeriod,
    /// Largest proportional increase in traffic the schedule can absorb.
    MaxCapacity,
}

impl Objective {
    pub fn as_str(&self) -> &'static str {
        match self {
            Objective::MinDelay => "min_delay",
            Objective::MinPeriod => "min_period",
            Objective::MaxCapacity => "max_capacity",
        }
    }
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tunables for a schedule optimization request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimizationParams {
    /// Lower bound on the period, in seconds.
    pub min_period_duration: f64,
    /// Upper bound on the period, in seconds.
    pub max_period_duration: f64,
    pub objective: Objective,
}

impl Default for OptimizationParams {
    fn default() -> Self {
        Self {
            min_period_duration: 0.0,
            max_period_duration: 180.0,
            objective: Objective::MinDelay,
        }
    }
}

/// Result of a schedule optimization.
///
/// `objective_value` is the minimized delay, the minimized period in
/// seconds, or the capacity headroom fraction (1.0 means the intersection is
/// at the verge of stability), depending on the requested `Objective`.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizedSchedule {
    pub fixed_time_schedule: FixedTimeSchedule,
    pub phase_diagram: PhaseDiagram,
    pub objective_value: f64,
}
