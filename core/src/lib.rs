//! Client core for the swift-mobility traffic-signal optimization service.
//!
//! # Overview
//! Serializes intersections and arrival rates to JSON, posts them to the
//! cloud optimizer with a bearer token, maps status codes to typed errors and
//! decodes fixed-time schedules and phase diagrams from the response. The
//! optimization itself happens server-side.
//!
//! # Design
//! - `SwiftCloudClient` is stateless: `build_*` produces an `HttpRequest`,
//!   `parse_*` consumes an `HttpResponse`. It never touches the network.
//! - `CloudApi` drives the I/O: connectivity check, token acquisition,
//!   transport, then hands the response back to the stateless client.
//! - `status::check_status` is the single place where status codes become
//!   errors.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod http;
pub mod status;
pub mod transport;
pub mod types;

pub use api::CloudApi;
pub use auth::{AuthToken, EnvTokenProvider, StaticTokenProvider, TokenCache, TokenProvider};
pub use client::SwiftCloudClient;
pub use config::{CloudConfig, RequestTag};
pub use connectivity::{AlwaysOnline, ConnectivityCheck, TcpConnectivityProbe};
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use status::check_status;
pub use transport::{HttpTransport, TransportError, UreqTransport};
pub use types::{
    ArrivalRates, Conflict, FixedTimeSchedule, GreenYellowInterval, GreenYellowPhase,
    Intersection, Objective, OptimizationParams, OptimizedSchedule, Phase, PhaseDiagram,
    SignalGroup, TrafficLight,
};
