//! End-to-end tests against the live mock server.
//!
//! # Design
//! Each test starts its own mock server on a random port, then drives
//! `CloudApi` over real HTTP with the ureq transport. Validates that request
//! building, status classification and response decoding agree with the
//! server's schema.

use std::collections::BTreeMap;
use std::net::SocketAddr;

use mock_server::{MockConfig, DEFAULT_TOKEN};
use swift_cloud_core::{
    AlwaysOnline, ApiError, ArrivalRates, CloudApi, CloudConfig, Conflict, FixedTimeSchedule,
    Intersection, Objective, OptimizationParams, RequestTag, SignalGroup, StaticTokenProvider,
    TrafficLight, UreqTransport,
};

/// Start a mock server on a random port and return its address.
fn start_server(config: MockConfig) -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run_with(listener, config).await
        })
        .unwrap();
    });

    addr
}

fn api(addr: SocketAddr, token: &str, tag: Option<RequestTag>) -> CloudApi {
    let config = CloudConfig::default()
        .with_base_url(format!("http://{addr}"))
        .with_request_tag(tag);
    CloudApi::new(
        &config,
        UreqTransport::default(),
        AlwaysOnline,
        StaticTokenProvider::new(token),
    )
}

/// Number of POSTs the mock server has received so far.
fn request_count(addr: SocketAddr) -> u64 {
    let mut response = ureq::get(&format!("http://{addr}/requests")).call().unwrap();
    response.body_mut().read_to_string().unwrap().trim().parse().unwrap()
}

fn group(id: &str, lights: usize) -> SignalGroup {
    SignalGroup {
        id: id.to_string(),
        traffic_lights: vec![
            TrafficLight {
                capacity: 1800.0,
                lost_time: 2.0,
            };
            lights
        ],
        min_greenyellow: 10.0,
        max_greenyellow: 100.0,
        min_red: 10.0,
        max_red: 100.0,
    }
}

fn intersection() -> Intersection {
    Intersection::new(
        vec![group("A", 1), group("B", 2)],
        vec![Conflict {
            id1: "A".to_string(),
            id2: "B".to_string(),
            setup12: 2.0,
            setup21: 3.0,
        }],
    )
}

fn rates() -> ArrivalRates {
    ArrivalRates::new(BTreeMap::from([
        ("A".to_string(), vec![300.0]),
        ("B".to_string(), vec![150.0, 200.0]),
    ]))
}

#[test]
fn optimize_then_recompute_phase_diagram() {
    let addr = start_server(MockConfig::default());
    let api = api(addr, DEFAULT_TOKEN, Some(RequestTag::default()));

    // Step 1: optimize with default bounds and objective.
    let result = api
        .optimize_fts(&intersection(), &rates(), &OptimizationParams::default())
        .unwrap();
    assert_eq!(result.objective_value, 6.5);
    assert_eq!(result.fixed_time_schedule.period, 60.0);
    assert_eq!(result.fixed_time_schedule.greenyellow_intervals.len(), 2);
    assert_eq!(result.phase_diagram.phases.len(), 2);

    // Step 2: the phase diagram of the returned schedule matches the one
    // that came with it.
    let diagram = api
        .phase_diagram(&intersection(), &result.fixed_time_schedule)
        .unwrap();
    assert_eq!(diagram, result.phase_diagram);

    assert_eq!(request_count(addr), 2);
}

#[test]
fn min_period_objective_is_forwarded() {
    let addr = start_server(MockConfig::default());
    let api = api(addr, DEFAULT_TOKEN, None);
    let params = OptimizationParams {
        min_period_duration: 75.0,
        objective: Objective::MinPeriod,
        ..OptimizationParams::default()
    };
    let result = api.optimize_fts(&intersection(), &rates(), &params).unwrap();
    assert_eq!(result.fixed_time_schedule.period, 75.0);
    assert_eq!(result.objective_value, 75.0);
}

#[test]
fn invalid_arrival_rates_issue_no_request() {
    let addr = start_server(MockConfig::default());
    let api = api(addr, DEFAULT_TOKEN, None);
    let rates = ArrivalRates::new(BTreeMap::from([("A".to_string(), vec![300.0])]));

    let err = api
        .optimize_fts(&intersection(), &rates, &OptimizationParams::default())
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
    assert_eq!(request_count(addr), 0);
}

#[test]
fn wrong_token_is_unauthorized_and_clears_cache() {
    let addr = start_server(MockConfig::default());
    let api = api(addr, "not-the-token", None);

    let err = api
        .optimize_fts(&intersection(), &rates(), &OptimizationParams::default())
        .unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized(_)), "{err:?}");
    assert!(!api.has_cached_token());
}

#[test]
fn forced_statuses_map_to_errors() {
    let cases: [(u16, fn(&ApiError) -> bool); 5] = [
        (400, |e| matches!(e, ApiError::BadRequest(msg) if msg.contains("forced bad request"))),
        (402, |e| matches!(e, ApiError::Unauthorized(msg) if msg.contains("credits"))),
        (403, |e| matches!(e, ApiError::Unauthorized(_))),
        (504, |e| matches!(e, ApiError::Timeout)),
        (500, |e| matches!(e, ApiError::UnknownService { status: 500, .. })),
    ];
    for (status, expected) in cases {
        let addr = start_server(MockConfig {
            forced_status: Some(status),
            ..MockConfig::default()
        });
        let api = api(addr, DEFAULT_TOKEN, None);
        let err = api
            .optimize_fts(&intersection(), &rates(), &OptimizationParams::default())
            .unwrap_err();
        assert!(expected(&err), "status {status}: unexpected {err:?}");
    }
}

#[test]
fn rejected_version_reports_server_message() {
    let addr = start_server(MockConfig::default());
    let tag = RequestTag {
        version: "0.6.0".to_string(),
        request_id: "abc".to_string(),
    };
    let api = api(addr, DEFAULT_TOKEN, Some(tag));

    let err = api
        .optimize_fts(&intersection(), &rates(), &OptimizationParams::default())
        .unwrap_err();
    match err {
        ApiError::Unauthorized(msg) => assert!(msg.contains("0.6.0 is no longer supported"), "{msg}"),
        other => panic!("expected Unauthorized, got {other:?}"),
    }
}

#[test]
fn closed_port_is_service_unreachable() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let api = api(addr, DEFAULT_TOKEN, None);
    let schedule = FixedTimeSchedule {
        greenyellow_intervals: BTreeMap::new(),
        period: 60.0,
    };

    let err = api.phase_diagram(&intersection(), &schedule).unwrap_err();
    assert!(matches!(err, ApiError::ServiceUnreachable(_)), "{err:?}");
}

#[test]
fn tcp_probe_gates_calls_to_a_dead_host() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let config = CloudConfig::default()
        .with_base_url(format!("http://{addr}"))
        .with_connect_timeout_ms(500);
    let api = CloudApi::with_config(config, StaticTokenProvider::new(DEFAULT_TOKEN)).unwrap();

    let err = api
        .optimize_fts(&intersection(), &rates(), &OptimizationParams::default())
        .unwrap_err();
    assert!(matches!(err, ApiError::NoConnectivity(_)), "{err:?}");
    assert!(!api.has_cached_token());
}
