mod common;

use common::*;
use netplan::domain::{CellKey, CoverageKey, NodeKey};
use netplan::{derive, validate_plan, CostParameters, PlannerConfig, SolutionStatus, ValidationFailure};

#[test]
fn scenario_a_upgrades_existing_cell() {
    let outcome = microlp_planner().plan_case(&scenario_a()).unwrap();
    assert_eq!(outcome.status, SolutionStatus::Optimal);
    assert!(outcome.is_accepted());

    let plan = outcome.plan.as_ref().unwrap();
    let cell = CellKey::new("s1", "4G", "c1");
    assert!(plan.upgraded_cells.contains(&cell));
    assert!(plan.new_sites.is_empty() && plan.new_nodes.is_empty() && plan.new_cells.is_empty());

    let capacity = plan.final_capacity[&cell];
    assert!(capacity >= 15.0 - EPS && capacity <= 20.0 + EPS, "{capacity}");
    assert_close(plan.traffic[&CoverageKey::new("s1", "4G", "c1", "lot1")], 15.0);

    let costs = CostParameters::default();
    assert_close(outcome.performance.objective_value.unwrap(), costs.capex_upgrade_cell);
    assert_eq!(outcome.performance.gap, Some(0.0));
}

#[test]
fn scenario_b_builds_full_hierarchy() {
    let outcome = microlp_planner().plan_case(&scenario_b()).unwrap();
    assert_eq!(outcome.status, SolutionStatus::Optimal);
    assert!(outcome.is_accepted());

    let plan = outcome.plan.as_ref().unwrap();
    let cell = CellKey::new("p1", "4G", "c1");
    assert!(plan.new_sites.contains("p1"));
    assert!(plan.new_nodes.contains(&NodeKey::new("p1", "4G")));
    assert!(plan.new_cells.contains(&cell));

    let capacity = plan.final_capacity[&cell];
    assert!(capacity >= 12.0 - EPS && capacity <= 30.0 + EPS, "{capacity}");

    let costs = CostParameters::default();
    let expected = costs.capex_new_site
        + costs.opex_site
        + costs.capex_new_node
        + costs.opex_node
        + costs.capex_new_cell;
    assert_close(outcome.performance.objective_value.unwrap(), expected);
}

#[test]
fn scenario_c_builds_all_or_none() {
    let outcome = microlp_planner().plan_case(&scenario_c()).unwrap();
    assert_eq!(outcome.status, SolutionStatus::Optimal);
    assert!(outcome.is_accepted());

    let plan = outcome.plan.as_ref().unwrap();
    let c1 = CellKey::new("p1", "4G", "c1");
    let c2 = CellKey::new("p1", "4G", "c2");
    assert_eq!(plan.new_cells.contains(&c1), plan.new_cells.contains(&c2));
    assert!(plan.new_cells.contains(&c1));

    let costs = CostParameters::default();
    let expected =
        costs.site_cost() + costs.node_cost() + 2.0 * costs.cell_cost();
    assert_close(outcome.performance.objective_value.unwrap(), expected);
}

#[test]
fn scenario_c_rejects_partial_build() {
    let case = scenario_c();
    let outcome = microlp_planner().plan_case(&case).unwrap();
    let mut plan = outcome.plan.unwrap();

    let c2 = CellKey::new("p1", "4G", "c2");
    plan.new_cells.remove(&c2);
    plan.final_capacity.insert(c2.clone(), 0.0);
    let edge = CoverageKey::new("p1", "4G", "c2", "lot1");
    let moved = plan.traffic.insert(edge, 0.0).unwrap_or(0.0);
    *plan
        .traffic
        .get_mut(&CoverageKey::new("p1", "4G", "c1", "lot1"))
        .unwrap() += moved;

    let data = derive(&case).unwrap();
    let report = validate_plan(&data, &plan, EPS);
    assert!(!report.passed());
    assert!(report
        .failures
        .contains(&ValidationFailure::PartialBuild(NodeKey::new("p1", "4G"))));
}

#[test]
fn scaled_model_reports_unscaled_plan() {
    let planner = planner_with(PlannerConfig {
        scale_factor: 1_000.0,
        ..PlannerConfig::default()
    });
    let outcome = planner.plan_case(&scenario_a()).unwrap();
    assert!(outcome.is_accepted());

    let plan = outcome.plan.unwrap();
    let capacity = plan.final_capacity[&CellKey::new("s1", "4G", "c1")];
    assert!(capacity >= 15.0 - EPS && capacity <= 20.0 + EPS, "{capacity}");
    assert_close(plan.traffic[&CoverageKey::new("s1", "4G", "c1", "lot1")], 15.0);
}

#[test]
fn insufficient_maximum_is_infeasible() {
    let case = scenario_a().demand("lot2", "4G", 10.0).covers("s1", "4G", "c1", "lot2");
    let outcome = microlp_planner().plan_case(&case).unwrap();
    assert_eq!(outcome.status, SolutionStatus::Infeasible);
    assert!(outcome.plan.is_none());
    assert!(outcome.validation.is_none());
    assert!(!outcome.performance.is_proven_optimal());
}
