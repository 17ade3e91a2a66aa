//! Integration tests for the health check battery: retry/timeout conversion,
//! degraded thresholds, partial dependency traversal, and deterministic
//! comprehensive aggregation.

mod common;

use common::*;
use std::collections::HashMap;
use std::time::Duration;

use envflow_core::config::{ApiEndpoint, ProcessTarget, Topology};
use envflow_core::health::{HealthChecker, HealthStatus, ProcessState, ResourceUsage};

fn agent_main_topology() -> Topology {
    Topology {
        database_target: Some("postgres://localhost/envflow".to_string()),
        api_endpoints: vec![ApiEndpoint {
            name: "portal".to_string(),
            url: "http://localhost:8080/health".to_string(),
        }],
        processes: vec![
            ProcessTarget {
                component: "agent".to_string(),
                identifier: "agent-container".to_string(),
            },
            ProcessTarget {
                component: "main".to_string(),
                identifier: "main-container".to_string(),
            },
        ],
        resource_targets: vec!["memory".to_string()],
        dependencies: HashMap::from([("agent".to_string(), vec!["main".to_string()])]),
    }
}

#[tokio::test]
async fn test_database_timeout_yields_unhealthy_with_timeout_message() {
    // Scaled-down version of the 5s-delay-against-2s-timeout scenario.
    let mut builder = CheckerBuilder::new(Topology::default());
    builder.database = MockDatabase {
        behavior: DbBehavior::Hang(Duration::from_millis(100)),
    };
    let checker = builder.build();

    let result = checker
        .check_database_connectivity("postgres://localhost/envflow")
        .await;

    assert_eq!(result.status, HealthStatus::Unhealthy);
    assert!(
        result.message.contains("timeout"),
        "expected timeout in message, got: {}",
        result.message
    );
}

#[tokio::test]
async fn test_database_error_becomes_result_never_panic() {
    let mut builder = CheckerBuilder::new(Topology::default());
    builder.database = MockDatabase {
        behavior: DbBehavior::Fail("connection refused".to_string()),
    };
    let checker = builder.build();

    let result = checker.check_database_connectivity("postgres://x").await;
    assert_eq!(result.status, HealthStatus::Unhealthy);
    assert!(result.message.contains("connection refused"));
}

#[tokio::test]
async fn test_slow_api_success_is_degraded() {
    let mut builder = CheckerBuilder::new(Topology::default());
    builder.http.behaviors.insert(
        "http://localhost:8080/health".to_string(),
        HttpBehavior::Respond {
            status: 200,
            latency: Duration::from_millis(80),
        },
    );
    let checker = builder.build();

    // fast_config sets the degraded threshold at 50ms.
    let result = checker
        .check_api_endpoint("portal", "http://localhost:8080/health")
        .await;
    assert_eq!(result.status, HealthStatus::Degraded);
    assert!(result.message.contains("threshold"));
}

#[tokio::test]
async fn test_api_error_status_is_unhealthy() {
    let mut builder = CheckerBuilder::new(Topology::default());
    builder.http.behaviors.insert(
        "http://localhost:8080/health".to_string(),
        HttpBehavior::Respond {
            status: 503,
            latency: Duration::from_millis(2),
        },
    );
    let checker = builder.build();

    let result = checker
        .check_api_endpoint("portal", "http://localhost:8080/health")
        .await;
    assert_eq!(result.status, HealthStatus::Unhealthy);
    assert!(result.message.contains("503"));
}

#[tokio::test]
async fn test_restart_looping_process_is_degraded() {
    let mut builder = CheckerBuilder::new(Topology::default());
    builder.processes = MockProcesses::with(&[(
        "agent-container",
        ProcessState::RestartLooping { restarts: 5 },
    )]);
    let checker = builder.build();

    let result = checker
        .check_process_liveness("agent", "agent-container")
        .await;
    assert_eq!(result.status, HealthStatus::Degraded);
    assert!(result.message.contains("restart-looping"));
}

#[tokio::test]
async fn test_absent_process_is_unhealthy() {
    let checker = CheckerBuilder::new(Topology::default()).build();
    let result = checker.check_process_liveness("agent", "ghost").await;
    assert_eq!(result.status, HealthStatus::Unhealthy);
    assert!(result.message.contains("not found"));
}

#[tokio::test]
async fn test_dependency_traversal_stops_at_first_unreachable() {
    // agent depends on main and cache (declared order); main depends on
    // postgres. cache is stopped, so traversal must report main (reachable)
    // and cache (unreachable), then halt before ever visiting postgres.
    let topology = Topology {
        processes: vec![
            ProcessTarget {
                component: "agent".to_string(),
                identifier: "agent-c".to_string(),
            },
            ProcessTarget {
                component: "main".to_string(),
                identifier: "main-c".to_string(),
            },
            ProcessTarget {
                component: "cache".to_string(),
                identifier: "cache-c".to_string(),
            },
            ProcessTarget {
                component: "postgres".to_string(),
                identifier: "postgres-c".to_string(),
            },
        ],
        dependencies: HashMap::from([
            (
                "agent".to_string(),
                vec!["main".to_string(), "cache".to_string()],
            ),
            ("main".to_string(), vec!["postgres".to_string()]),
        ]),
        ..Topology::default()
    };
    let mut builder = CheckerBuilder::new(topology);
    builder.processes = MockProcesses::with(&[
        ("main-c", ProcessState::Running),
        ("cache-c", ProcessState::Stopped),
        ("postgres-c", ProcessState::Running),
    ]);
    let checker = builder.build();

    let results = checker.check_service_interdependencies("agent").await;

    let names: Vec<_> = results.iter().map(|r| r.check_name.as_str()).collect();
    assert_eq!(names, vec!["dependency:agent->main", "dependency:agent->cache"]);
    assert_eq!(results[0].status, HealthStatus::Healthy);
    assert_eq!(results[1].status, HealthStatus::Unhealthy);
}

#[tokio::test]
async fn test_comprehensive_aggregate_is_worst_individual() {
    let mut builder = CheckerBuilder::new(agent_main_topology());
    builder.database = MockDatabase {
        behavior: DbBehavior::Healthy(Duration::from_millis(2)),
    };
    builder.http.behaviors.insert(
        "http://localhost:8080/health".to_string(),
        HttpBehavior::Respond {
            status: 200,
            latency: Duration::from_millis(2),
        },
    );
    builder.processes = MockProcesses::with(&[
        ("agent-container", ProcessState::Running),
        ("main-container", ProcessState::Stopped),
    ]);
    builder.resources.behaviors.insert(
        "memory".to_string(),
        ResourceBehavior::Usage(ResourceUsage::new("memory", 100.0, Some(1000.0), "MB")),
    );
    let checker = builder.build();

    let results = checker.comprehensive_check(None).await;
    assert_eq!(
        HealthChecker::aggregate_status(&results),
        HealthStatus::Unhealthy
    );
    assert_eq!(
        results.get("process:main").unwrap().status,
        HealthStatus::Unhealthy
    );
    assert_eq!(
        results.get("database").unwrap().status,
        HealthStatus::Healthy
    );
}

#[tokio::test]
async fn test_comprehensive_all_healthy() {
    let mut builder = CheckerBuilder::new(agent_main_topology());
    builder.database = MockDatabase {
        behavior: DbBehavior::Healthy(Duration::from_millis(2)),
    };
    builder.http.behaviors.insert(
        "http://localhost:8080/health".to_string(),
        HttpBehavior::Respond {
            status: 200,
            latency: Duration::from_millis(2),
        },
    );
    builder.processes = MockProcesses::with(&[
        ("agent-container", ProcessState::Running),
        ("main-container", ProcessState::Running),
    ]);
    builder.resources.behaviors.insert(
        "memory".to_string(),
        ResourceBehavior::Usage(ResourceUsage::new("memory", 100.0, Some(1000.0), "MB")),
    );
    let checker = builder.build();

    let results = checker.comprehensive_check(None).await;
    assert_eq!(
        HealthChecker::aggregate_status(&results),
        HealthStatus::Healthy
    );
}

#[tokio::test]
async fn test_comprehensive_scope_filters_by_component() {
    let mut builder = CheckerBuilder::new(agent_main_topology());
    builder.database = MockDatabase {
        behavior: DbBehavior::Healthy(Duration::from_millis(2)),
    };
    builder.http.behaviors.insert(
        "http://localhost:8080/health".to_string(),
        HttpBehavior::Respond {
            status: 200,
            latency: Duration::from_millis(2),
        },
    );
    builder.processes = MockProcesses::with(&[
        ("agent-container", ProcessState::Running),
        ("main-container", ProcessState::Running),
    ]);
    builder.resources.behaviors.insert(
        "memory".to_string(),
        ResourceBehavior::Usage(ResourceUsage::new("memory", 100.0, Some(1000.0), "MB")),
    );
    let checker = builder.build();

    let results = checker.comprehensive_check(Some("agent")).await;
    assert!(results.contains_key("process:agent"));
    assert!(!results.contains_key("process:main"));
    // Shared infrastructure stays in scope.
    assert!(results.contains_key("database"));
    // agent's dependency on main is still checked.
    assert!(results.contains_key("dependency:agent->main"));
}

#[tokio::test]
async fn test_comprehensive_iteration_order_is_stable() {
    let mut builder = CheckerBuilder::new(agent_main_topology());
    builder.database = MockDatabase {
        behavior: DbBehavior::Healthy(Duration::from_millis(2)),
    };
    builder.processes = MockProcesses::with(&[
        ("agent-container", ProcessState::Running),
        ("main-container", ProcessState::Running),
    ]);
    let checker = builder.build();

    let first: Vec<String> = checker
        .comprehensive_check(None)
        .await
        .keys()
        .cloned()
        .collect();
    let second: Vec<String> = checker
        .comprehensive_check(None)
        .await
        .keys()
        .cloned()
        .collect();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_overcommitted_resource_is_degraded() {
    let mut builder = CheckerBuilder::new(Topology::default());
    builder.resources.behaviors.insert(
        "memory".to_string(),
        ResourceBehavior::Usage(ResourceUsage::new("memory", 1200.0, Some(1000.0), "MB")),
    );
    let checker = builder.build();

    let results = checker.check_resource_usage(&["memory".to_string()]).await;
    assert_eq!(results[0].status, HealthStatus::Degraded);
    assert!(results[0].message.contains("overcommitted"));
    assert!(results[0].details.is_some());
}

#[tokio::test]
async fn test_unreadable_resource_is_unknown_and_call_survives() {
    let mut builder = CheckerBuilder::new(Topology::default());
    builder.resources.behaviors.insert(
        "memory".to_string(),
        ResourceBehavior::Usage(ResourceUsage::new("memory", 10.0, Some(100.0), "MB")),
    );
    builder.resources.behaviors.insert(
        "disk".to_string(),
        ResourceBehavior::Unreadable("permission denied".to_string()),
    );
    let checker = builder.build();

    let results = checker
        .check_resource_usage(&["memory".to_string(), "disk".to_string()])
        .await;
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].status, HealthStatus::Healthy);
    assert_eq!(results[1].status, HealthStatus::Unknown);
    assert!(results[1].message.contains("permission denied"));
}
