//! Plan-level properties checked directly against the derived case data,
//! without going through `validate_plan`.

mod common;

use common::*;
use netplan::domain::{CellKey, CoverageKey};
use netplan::{derive, DerivedData, NetworkPlan, SolutionStatus};

fn solved_mixed() -> (DerivedData, NetworkPlan) {
    let case = mixed_case();
    let outcome = microlp_planner().plan_case(&case).unwrap();
    assert_eq!(outcome.status, SolutionStatus::Optimal);
    assert!(outcome.is_accepted(), "{:?}", outcome.validation);
    (derive(&case).unwrap(), outcome.plan.unwrap())
}

#[test]
fn hierarchy_holds() {
    let (data, plan) = solved_mixed();
    for cell in &plan.new_cells {
        let node = cell.node_key();
        if !data.is_existing_node(&node) {
            assert!(plan.new_nodes.contains(&node), "{cell} built without its node");
        }
    }
    for node in &plan.new_nodes {
        if data.is_potential_site(&node.site) {
            assert!(plan.new_sites.contains(&node.site), "{node} built without its site");
        }
    }
}

#[test]
fn capacity_bounds_hold() {
    let (data, plan) = solved_mixed();
    for cell in data.cells() {
        let capacity = plan.final_capacity[cell];
        let max = data.max_capacity_of(cell).unwrap();
        assert!(capacity <= max + EPS * max.max(1.0), "{cell}: {capacity} > {max}");
        if data.is_existing_cell(cell) {
            let initial = data.initial_capacity_of(cell);
            assert!(capacity >= initial - EPS * initial.max(1.0), "{cell}: {capacity} < {initial}");
        }
    }
}

#[test]
fn demand_is_met_exactly() {
    let (data, plan) = solved_mixed();
    for (lot_node, &demand) in &data.demand {
        let served: f64 = data
            .covering_cells(lot_node)
            .iter()
            .map(|(site, cell)| {
                plan.traffic[&CoverageKey::new(
                    site.clone(),
                    lot_node.node.clone(),
                    cell.clone(),
                    lot_node.lot.clone(),
                )]
            })
            .sum();
        assert_close(served, demand);
    }
}

#[test]
fn traffic_fits_capacity() {
    let (data, plan) = solved_mixed();
    for cell in data.cells() {
        let traffic = plan.traffic_of_cell(cell);
        let capacity = plan.final_capacity[cell];
        assert!(traffic <= capacity + EPS * capacity.max(1.0), "{cell}: {traffic} > {capacity}");
    }
}

#[test]
fn decisions_are_uniform_per_node() {
    let (data, plan) = solved_mixed();
    for cells in data.cells_at_node.values() {
        let built: Vec<bool> = cells
            .iter()
            .filter(|cell| !data.is_existing_cell(cell))
            .map(|cell| plan.new_cells.contains(cell))
            .collect();
        assert!(built.windows(2).all(|pair| pair[0] == pair[1]), "{cells:?}");

        let upgraded: Vec<bool> = cells
            .iter()
            .filter(|cell| data.is_existing_cell(cell))
            .map(|cell| plan.upgraded_cells.contains(cell))
            .collect();
        assert!(upgraded.windows(2).all(|pair| pair[0] == pair[1]), "{cells:?}");
    }
}

#[test]
fn decisions_only_touch_eligible_elements() {
    let (data, plan) = solved_mixed();
    assert!(plan.new_sites.iter().all(|site| data.is_potential_site(site)));
    assert!(plan.new_nodes.iter().all(|node| data.potential_nodes.contains(node)));
    assert!(plan.new_cells.iter().all(|cell| data.potential_cells.contains(cell)));
    assert!(plan.upgraded_cells.iter().all(|cell| data.existing_cells.contains(cell)));
    assert!(plan.traffic.keys().all(|edge| data.coverage.contains(edge)));
}

#[test]
fn new_technology_node_is_built_at_existing_site() {
    let (_, plan) = solved_mixed();
    assert!(plan.new_cells.contains(&CellKey::new("s1", "5G", "c1")));
    assert!(plan.new_nodes.contains(&netplan::domain::NodeKey::new("s1", "5G")));
    assert!(!plan.new_sites.contains("s1"));
}
