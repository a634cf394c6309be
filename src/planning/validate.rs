//! Independent feasibility check of an extracted plan.
//!
//! Re-derives every capacity, demand, hierarchy and uniformity condition from
//! the case data and the plan alone. Solver status plays no part, so a plan
//! that slipped through on solver tolerances or a formulation bug is reported
//! here rather than trusted.

use super::derive::DerivedData;
use super::extract::NetworkPlan;
use crate::domain::{CellKey, LotNodeKey, NodeKey};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

/// Default epsilon absorbing floating-point round-off
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// One violated condition, with the offending key and magnitudes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ValidationFailure {
    /// Traffic carried by a cell exceeds its final capacity
    CapacityExceeded {
        cell: CellKey,
        traffic: f64,
        capacity: f64,
    },
    /// An existing cell ended below its initial capacity
    BelowInitialCapacity {
        cell: CellKey,
        final_capacity: f64,
        initial: f64,
    },
    /// Final capacity above what the build/upgrade decisions allow
    CapacityAboveLimit {
        cell: CellKey,
        final_capacity: f64,
        limit: f64,
    },
    MissingCapacity(CellKey),
    DemandMismatch {
        lot_node: LotNodeKey,
        served: f64,
        demand: f64,
    },
    /// New cell on a node that neither exists nor is built
    CellWithoutNode(CellKey),
    /// New node on a site that neither exists nor is built
    NodeWithoutSite(NodeKey),
    /// Only some potential cells of a node were built
    PartialBuild(NodeKey),
    /// Only some existing cells of a node were upgraded
    PartialUpgrade(NodeKey),
    /// A decision or traffic entry on an element it cannot apply to
    UnknownElement { kind: &'static str, key: String },
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationFailure::CapacityExceeded {
                cell,
                traffic,
                capacity,
            } => write!(
                f,
                "cell ({}) carries {} over a capacity of {}",
                cell, traffic, capacity
            ),
            ValidationFailure::BelowInitialCapacity {
                cell,
                final_capacity,
                initial,
            } => write!(
                f,
                "cell ({}) final capacity {} below initial {}",
                cell, final_capacity, initial
            ),
            ValidationFailure::CapacityAboveLimit {
                cell,
                final_capacity,
                limit,
            } => write!(
                f,
                "cell ({}) final capacity {} above its limit {}",
                cell, final_capacity, limit
            ),
            ValidationFailure::MissingCapacity(cell) => {
                write!(f, "cell ({}) has no final capacity", cell)
            }
            ValidationFailure::DemandMismatch {
                lot_node,
                served,
                demand,
            } => write!(
                f,
                "lot ({}) served {} against a demand of {}",
                lot_node, served, demand
            ),
            ValidationFailure::CellWithoutNode(cell) => {
                write!(f, "cell ({}) built on a node that is not built", cell)
            }
            ValidationFailure::NodeWithoutSite(node) => {
                write!(f, "node ({}) built on a site that is not built", node)
            }
            ValidationFailure::PartialBuild(node) => {
                write!(f, "only some potential cells of node ({}) built", node)
            }
            ValidationFailure::PartialUpgrade(node) => {
                write!(f, "only some existing cells of node ({}) upgraded", node)
            }
            ValidationFailure::UnknownElement { kind, key } => {
                write!(f, "{} decision on unknown element ({})", kind, key)
            }
        }
    }
}

/// Result of validating one plan
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub case_id: String,
    pub failures: Vec<ValidationFailure>,
    pub cells_checked: usize,
    pub lot_nodes_checked: usize,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

fn within(value: f64, reference: f64, tolerance: f64) -> f64 {
    value + tolerance * reference.abs().max(1.0)
}

/// Check `plan` against the case it was solved for
pub fn validate_plan(data: &DerivedData, plan: &NetworkPlan, tolerance: f64) -> ValidationReport {
    let mut failures = Vec::new();

    check_membership(data, plan, &mut failures);
    check_capacities(data, plan, tolerance, &mut failures);
    check_demand(data, plan, tolerance, &mut failures);
    check_hierarchy(data, plan, &mut failures);
    check_uniformity(data, plan, &mut failures);

    let report = ValidationReport {
        case_id: data.case_id.clone(),
        failures,
        cells_checked: data.num_cells(),
        lot_nodes_checked: data.demand.len(),
    };
    if report.passed() {
        debug!(case = %data.case_id, cells = report.cells_checked, "plan validated");
    } else {
        warn!(
            case = %data.case_id,
            failures = report.failures.len(),
            first = %report.failures[0],
            "plan failed validation"
        );
    }
    report
}

fn check_membership(data: &DerivedData, plan: &NetworkPlan, failures: &mut Vec<ValidationFailure>) {
    for site in &plan.new_sites {
        if !data.is_potential_site(site) {
            failures.push(ValidationFailure::UnknownElement {
                kind: "build_site",
                key: site.clone(),
            });
        }
    }
    for node in &plan.new_nodes {
        if !data.potential_nodes.contains(node) {
            failures.push(ValidationFailure::UnknownElement {
                kind: "build_node",
                key: node.to_string(),
            });
        }
    }
    for cell in &plan.new_cells {
        if !data.potential_cells.contains(cell) {
            failures.push(ValidationFailure::UnknownElement {
                kind: "build_cell",
                key: cell.to_string(),
            });
        }
    }
    for cell in &plan.upgraded_cells {
        if !data.existing_cells.contains(cell) {
            failures.push(ValidationFailure::UnknownElement {
                kind: "upgrade_cell",
                key: cell.to_string(),
            });
        }
    }
    for (edge, &value) in &plan.traffic {
        if value != 0.0 && !data.coverage.contains(edge) {
            failures.push(ValidationFailure::UnknownElement {
                kind: "traffic",
                key: edge.to_string(),
            });
        }
    }
}

fn check_capacities(
    data: &DerivedData,
    plan: &NetworkPlan,
    tolerance: f64,
    failures: &mut Vec<ValidationFailure>,
) {
    let mut carried: BTreeMap<CellKey, f64> = BTreeMap::new();
    for (edge, &value) in &plan.traffic {
        *carried.entry(edge.cell_key()).or_default() += value;
    }

    for cell in data.cells() {
        let Some(&capacity) = plan.final_capacity.get(cell) else {
            failures.push(ValidationFailure::MissingCapacity(cell.clone()));
            continue;
        };

        let traffic = carried.get(cell).copied().unwrap_or(0.0);
        if traffic > within(capacity, capacity, tolerance) {
            failures.push(ValidationFailure::CapacityExceeded {
                cell: cell.clone(),
                traffic,
                capacity,
            });
        }

        let initial = data.initial_capacity_of(cell);
        let max = data.max_capacity_of(cell).unwrap_or(0.0);
        let limit = if data.is_existing_cell(cell) {
            if capacity < within(initial, initial, -tolerance) {
                failures.push(ValidationFailure::BelowInitialCapacity {
                    cell: cell.clone(),
                    final_capacity: capacity,
                    initial,
                });
            }
            if plan.upgraded_cells.contains(cell) {
                max
            } else {
                initial
            }
        } else if plan.new_cells.contains(cell) {
            max
        } else {
            0.0
        };
        if capacity > within(limit, limit, tolerance) {
            failures.push(ValidationFailure::CapacityAboveLimit {
                cell: cell.clone(),
                final_capacity: capacity,
                limit,
            });
        }
    }
}

fn check_demand(
    data: &DerivedData,
    plan: &NetworkPlan,
    tolerance: f64,
    failures: &mut Vec<ValidationFailure>,
) {
    let mut served: BTreeMap<LotNodeKey, f64> = BTreeMap::new();
    for (edge, &value) in &plan.traffic {
        *served.entry(edge.lot_node()).or_default() += value;
    }

    for (lot_node, &demand) in &data.demand {
        let served = served.get(lot_node).copied().unwrap_or(0.0);
        if (served - demand).abs() > tolerance * demand.abs().max(1.0) {
            failures.push(ValidationFailure::DemandMismatch {
                lot_node: lot_node.clone(),
                served,
                demand,
            });
        }
    }
}

fn check_hierarchy(data: &DerivedData, plan: &NetworkPlan, failures: &mut Vec<ValidationFailure>) {
    for cell in &plan.new_cells {
        let node = cell.node_key();
        if !data.is_existing_node(&node) && !plan.new_nodes.contains(&node) {
            failures.push(ValidationFailure::CellWithoutNode(cell.clone()));
        }
    }
    for node in &plan.new_nodes {
        if !data.is_existing_site(&node.site) && !plan.new_sites.contains(&node.site) {
            failures.push(ValidationFailure::NodeWithoutSite(node.clone()));
        }
    }
}

fn check_uniformity(data: &DerivedData, plan: &NetworkPlan, failures: &mut Vec<ValidationFailure>) {
    for (node, cells) in &data.cells_at_node {
        let (existing, potential): (Vec<&CellKey>, Vec<&CellKey>) =
            cells.iter().partition(|cell| data.is_existing_cell(cell));

        let built = potential
            .iter()
            .filter(|cell| plan.new_cells.contains(**cell))
            .count();
        if built != 0 && built != potential.len() {
            failures.push(ValidationFailure::PartialBuild(node.clone()));
        }

        let upgraded = existing
            .iter()
            .filter(|cell| plan.upgraded_cells.contains(**cell))
            .count();
        if upgraded != 0 && upgraded != existing.len() {
            failures.push(ValidationFailure::PartialUpgrade(node.clone()));
        }
    }
}
