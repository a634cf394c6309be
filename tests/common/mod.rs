#![allow(dead_code)]

use netplan::{CaseData, NetworkPlanner, PlannerConfig, SolverBackend, SolverConfig};

pub const EPS: f64 = 1e-6;

pub fn microlp_planner() -> NetworkPlanner {
    planner_with(PlannerConfig::default())
}

pub fn planner_with(config: PlannerConfig) -> NetworkPlanner {
    let config = PlannerConfig {
        solver: SolverConfig::default().with_backend(SolverBackend::MicroLp),
        ..config
    };
    NetworkPlanner::new(config).expect("valid planner config")
}

/// One existing cell that must be upgraded to carry its lot
pub fn scenario_a() -> CaseData {
    CaseData::new("A")
        .existing_site("s1")
        .cell("s1", "4G", "c1", 10.0, 20.0)
        .demand("lot1", "4G", 15.0)
        .covers("s1", "4G", "c1", "lot1")
}

/// Greenfield: site, node and cell all have to be built
pub fn scenario_b() -> CaseData {
    CaseData::new("B")
        .potential_site("p1")
        .cell("p1", "4G", "c1", 0.0, 30.0)
        .demand("lot1", "4G", 12.0)
        .covers("p1", "4G", "c1", "lot1")
}

/// Two potential cells on one node where either alone would do
pub fn scenario_c() -> CaseData {
    CaseData::new("C")
        .potential_site("p1")
        .cell("p1", "4G", "c1", 0.0, 30.0)
        .cell("p1", "4G", "c2", 0.0, 30.0)
        .demand("lot1", "4G", 12.0)
        .covers("p1", "4G", "c1", "lot1")
        .covers("p1", "4G", "c2", "lot1")
}

/// Existing and potential sites, several nodes, shared lots
pub fn mixed_case() -> CaseData {
    CaseData::new("mixed")
        .existing_site("s1")
        .potential_site("p1")
        .cell("s1", "4G", "c1", 10.0, 20.0)
        .cell("s1", "4G", "c2", 8.0, 12.0)
        .cell("s1", "4G", "c3", 0.0, 15.0)
        .cell("s1", "5G", "c1", 0.0, 40.0)
        .cell("p1", "4G", "c1", 0.0, 30.0)
        .cell("p1", "4G", "c2", 0.0, 30.0)
        .demand("lot1", "4G", 25.0)
        .demand("lot2", "4G", 14.0)
        .demand("lot1", "5G", 6.0)
        .covers("s1", "4G", "c1", "lot1")
        .covers("s1", "4G", "c2", "lot1")
        .covers("s1", "4G", "c2", "lot2")
        .covers("s1", "4G", "c3", "lot2")
        .covers("p1", "4G", "c1", "lot2")
        .covers("p1", "4G", "c2", "lot2")
        .covers("s1", "5G", "c1", "lot1")
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() <= EPS * expected.abs().max(1.0),
        "expected {expected}, got {actual}"
    );
}
