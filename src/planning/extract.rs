//! Reading a solver assignment back into planning terms.

use super::builder::PlanningModel;
use super::error::ExtractionError;
use crate::domain::{CellKey, CoverageKey, NodeKey, Solution, SolutionStatus, VarId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::time::Duration;

/// A binary variable counts as selected above this value
const BINARY_THRESHOLD: f64 = 0.5;

/// Expansion plan extracted from a solved model, in unscaled units
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkPlan {
    pub new_sites: BTreeSet<String>,
    pub new_nodes: BTreeSet<NodeKey>,
    pub new_cells: BTreeSet<CellKey>,
    pub upgraded_cells: BTreeSet<CellKey>,
    /// Resulting capacity of every cell
    pub final_capacity: BTreeMap<CellKey, f64>,
    /// Traffic routed over every coverage edge
    pub traffic: BTreeMap<CoverageKey, f64>,
}

impl NetworkPlan {
    /// Coverage edges that actually carry traffic
    pub fn active_traffic(&self) -> impl Iterator<Item = (&CoverageKey, f64)> {
        self.traffic
            .iter()
            .filter(|(_, &value)| value > 0.0)
            .map(|(key, &value)| (key, value))
    }

    /// Sum of traffic a cell carries across the lots it covers
    pub fn traffic_of_cell(&self, cell: &CellKey) -> f64 {
        self.traffic
            .iter()
            .filter(|(edge, _)| {
                edge.site == cell.site && edge.node == cell.node && edge.cell == cell.cell
            })
            .map(|(_, value)| value)
            .sum()
    }

    pub fn total_final_capacity(&self) -> f64 {
        self.final_capacity.values().sum()
    }

    /// Format a human-readable summary
    pub fn summary(&self) -> String {
        let mut s = String::new();
        let _ = writeln!(s, "Network Plan\n{}", "=".repeat(40));
        let _ = writeln!(s, "New sites: {}", self.new_sites.len());
        for site in &self.new_sites {
            let _ = writeln!(s, "  {}", site);
        }
        let _ = writeln!(s, "New nodes: {}", self.new_nodes.len());
        for node in &self.new_nodes {
            let _ = writeln!(s, "  {}", node);
        }
        let _ = writeln!(s, "New cells: {}", self.new_cells.len());
        for cell in &self.new_cells {
            let _ = writeln!(s, "  {}", cell);
        }
        let _ = writeln!(s, "Upgraded cells: {}", self.upgraded_cells.len());
        for cell in &self.upgraded_cells {
            let _ = writeln!(s, "  {}", cell);
        }
        let _ = writeln!(s, "Total final capacity: {:.3}", self.total_final_capacity());
        let _ = writeln!(s, "Active traffic edges: {}", self.active_traffic().count());
        s
    }
}

/// Outcome metrics of one case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub case_id: String,
    pub status: SolutionStatus,
    pub objective_value: Option<f64>,
    pub gap: Option<f64>,
    pub build_time: Duration,
    pub solve_time: Duration,
}

impl PerformanceRecord {
    pub fn is_proven_optimal(&self) -> bool {
        self.status == SolutionStatus::Optimal
    }
}

// Callers check the assignment length against the model first
fn value_of(solution: &Solution, var: VarId) -> f64 {
    solution.variable_values[var.index()]
}

fn selected(solution: &Solution, var: VarId) -> bool {
    value_of(solution, var) > BINARY_THRESHOLD
}

/// Convert raw variable values into a [`NetworkPlan`], undoing the scale factor.
///
/// Returns `Ok(None)` when the solve produced no assignment, and an error when
/// the assignment does not hold exactly one value per model variable.
pub fn extract_plan(
    planning: &PlanningModel,
    solution: &Solution,
) -> Result<Option<NetworkPlan>, ExtractionError> {
    if !solution.status.has_assignment() {
        return Ok(None);
    }
    let expected = planning.model.num_variables();
    let actual = solution.variable_values.len();
    if actual != expected {
        return Err(ExtractionError::AssignmentLength { expected, actual });
    }
    let vars = &planning.vars;
    let scale = planning.scale_factor;

    let new_sites = vars
        .build_site
        .iter()
        .filter(|(_, &var)| selected(solution, var))
        .map(|(site, _)| site.clone())
        .collect();
    let new_nodes = vars
        .build_node
        .iter()
        .filter(|(_, &var)| selected(solution, var))
        .map(|(key, _)| key.clone())
        .collect();
    let new_cells = vars
        .build_cell
        .iter()
        .filter(|(_, &var)| selected(solution, var))
        .map(|(key, _)| key.clone())
        .collect();
    let upgraded_cells = vars
        .upgrade_cell
        .iter()
        .filter(|(_, &var)| selected(solution, var))
        .map(|(key, _)| key.clone())
        .collect();
    let final_capacity = vars
        .final_capacity
        .iter()
        .map(|(key, &var)| (key.clone(), value_of(solution, var) / scale))
        .collect();
    let traffic = vars
        .traffic
        .iter()
        .map(|(key, &var)| (key.clone(), value_of(solution, var) / scale))
        .collect();

    Ok(Some(NetworkPlan {
        new_sites,
        new_nodes,
        new_cells,
        upgraded_cells,
        final_capacity,
        traffic,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CaseData, CostParameters};
    use crate::planning::builder::ModelBuilder;
    use crate::planning::derive::derive;

    fn planning(scale: f64) -> PlanningModel {
        let case = CaseData::new("extract")
            .existing_site("s1")
            .potential_site("p1")
            .cell("s1", "4G", "c1", 10.0, 20.0)
            .cell("p1", "4G", "c1", 0.0, 30.0)
            .demand("lot1", "4G", 25.0)
            .covers("s1", "4G", "c1", "lot1")
            .covers("p1", "4G", "c1", "lot1");
        let data = derive(&case).unwrap();
        ModelBuilder::new(&data, CostParameters::default())
            .with_scale_factor(scale)
            .build()
            .unwrap()
    }

    fn assignment(planning: &PlanningModel, values: &[(VarId, f64)]) -> Solution {
        let mut raw = vec![0.0; planning.model.num_variables()];
        for &(var, value) in values {
            raw[var.index()] = value;
        }
        Solution::optimal(0.0, raw)
    }

    #[test]
    fn reads_binaries_with_threshold() {
        let planning = planning(1.0);
        let vars = &planning.vars;
        let solution = assignment(
            &planning,
            &[
                (vars.build_site["p1"], 0.999_999),
                (vars.build_node[&NodeKey::new("p1", "4G")], 1.0),
                (vars.build_cell[&CellKey::new("p1", "4G", "c1")], 0.6),
                (vars.upgrade_cell[&CellKey::new("s1", "4G", "c1")], 1e-7),
            ],
        );

        let plan = extract_plan(&planning, &solution).unwrap().unwrap();
        assert!(plan.new_sites.contains("p1"));
        assert!(plan.new_nodes.contains(&NodeKey::new("p1", "4G")));
        assert!(plan.new_cells.contains(&CellKey::new("p1", "4G", "c1")));
        assert!(plan.upgraded_cells.is_empty());
    }

    #[test]
    fn undoes_scale_factor() {
        let planning = planning(1_000.0);
        let vars = &planning.vars;
        let cell = CellKey::new("p1", "4G", "c1");
        let edge = CoverageKey::new("p1", "4G", "c1", "lot1");
        let solution = assignment(
            &planning,
            &[(vars.final_capacity[&cell], 30_000.0), (vars.traffic[&edge], 15_000.0)],
        );

        let plan = extract_plan(&planning, &solution).unwrap().unwrap();
        assert_eq!(plan.final_capacity[&cell], 30.0);
        assert_eq!(plan.traffic[&edge], 15.0);
        assert_eq!(plan.traffic_of_cell(&cell), 15.0);
        assert_eq!(plan.final_capacity.len(), 2);
        assert_eq!(plan.traffic.len(), 2);
        assert_eq!(plan.active_traffic().count(), 1);
    }

    #[test]
    fn no_plan_without_assignment() {
        let planning = planning(1.0);
        let solution = Solution::new(SolutionStatus::Infeasible, "infeasible");
        assert_eq!(extract_plan(&planning, &solution), Ok(None));
    }

    #[test]
    fn rejects_short_assignment() {
        let planning = planning(1.0);
        let expected = planning.model.num_variables();
        let solution = Solution::optimal(0.0, vec![1.0; expected - 1]);
        assert_eq!(
            extract_plan(&planning, &solution),
            Err(ExtractionError::AssignmentLength {
                expected,
                actual: expected - 1,
            })
        );
    }

    #[test]
    fn summary_lists_decisions() {
        let planning = planning(1.0);
        let vars = &planning.vars;
        let solution = assignment(
            &planning,
            &[
                (vars.build_site["p1"], 1.0),
                (vars.build_node[&NodeKey::new("p1", "4G")], 1.0),
                (vars.build_cell[&CellKey::new("p1", "4G", "c1")], 1.0),
                (vars.final_capacity[&CellKey::new("p1", "4G", "c1")], 25.0),
                (vars.final_capacity[&CellKey::new("s1", "4G", "c1")], 10.0),
                (vars.traffic[&CoverageKey::new("p1", "4G", "c1", "lot1")], 25.0),
            ],
        );

        let summary = extract_plan(&planning, &solution).unwrap().unwrap().summary();
        assert!(summary.contains("New sites: 1\n  p1\n"));
        assert!(summary.contains("New cells: 1\n  p1,4G,c1\n"));
        assert!(summary.contains("Upgraded cells: 0\n"));
        assert!(summary.contains("Total final capacity: 35.000"));
        assert!(summary.contains("Active traffic edges: 1"));
    }
}
