//! MILP formulation of the capacity-expansion problem.
//!
//! ```text
//! minimize   (capex_site + opex_site)·Σ build_site
//!          + (capex_node + opex_node)·Σ build_node
//!          +  capex_cell            ·Σ build_cell
//!          +  capex_upgrade         ·Σ upgrade_cell
//!
//! subject to (k = scale factor, applied to every capacity and demand)
//!   final[c] ≥ k·init[c]                                 existing c
//!   final[c] ≤ k·init[c]·(1-upgrade[c]) + k·max[c]·upgrade[c]   existing c
//!   final[c] ≤ k·max[c]·build_cell[c]                    potential c
//!   build_cell[s,n,c] ≤ build_node[s,n]                  potential c at potential (s,n)
//!   build_node[s,n] ≤ build_site[s]                      potential (s,n) at potential s
//!   Σ_{s,c} final[s,n,c] ≥ k·Σ_l demand[l,n]             every node n
//!   Σ_{(s,c) covering (l,n)} final[s,n,c] ≥ k·demand[l,n]
//!   Σ_{l covered by c} traffic[c,l] ≤ final[c]           every cell
//!   Σ_{(s,c) covering (l,n)} traffic[s,n,c,l] = k·demand[l,n]
//!   build_cell equal across the potential cells of a (s,n)
//!   upgrade_cell equal across the existing cells of a (s,n)
//! ```
//!
//! Every variable a constraint references is looked up through the
//! [`VariableIndex`]; a missing entry is a [`FormulationError`], never a
//! skipped term.

use super::derive::DerivedData;
use super::error::FormulationError;
use crate::domain::{
    CellKey, Constraint, CostParameters, CoverageKey, LinearExpr, MilpModel, NodeKey,
    ObjectiveFunction, SolverConfig, VarId, Variable,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// The constraint families of the planning model, in build order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ConstraintFamily {
    MinCellCapacity,
    MaxCapacityExistingCells,
    MaxCapacityNewCells,
    NewCellIfNodeExists,
    NewNodeIfSiteExists,
    EnoughGlobalCapacity,
    EnoughCapacityPerLot,
    MaxTrafficOfCell,
    DemandFulfilment,
    UniformNewCells,
    UniformUpgrades,
}

impl ConstraintFamily {
    pub const ALL: [ConstraintFamily; 11] = [
        ConstraintFamily::MinCellCapacity,
        ConstraintFamily::MaxCapacityExistingCells,
        ConstraintFamily::MaxCapacityNewCells,
        ConstraintFamily::NewCellIfNodeExists,
        ConstraintFamily::NewNodeIfSiteExists,
        ConstraintFamily::EnoughGlobalCapacity,
        ConstraintFamily::EnoughCapacityPerLot,
        ConstraintFamily::MaxTrafficOfCell,
        ConstraintFamily::DemandFulfilment,
        ConstraintFamily::UniformNewCells,
        ConstraintFamily::UniformUpgrades,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ConstraintFamily::MinCellCapacity => "MinCellCapacity",
            ConstraintFamily::MaxCapacityExistingCells => "MaxCapacityExistingCells",
            ConstraintFamily::MaxCapacityNewCells => "MaxCapacityNewCells",
            ConstraintFamily::NewCellIfNodeExists => "NewCellIfNodeExists",
            ConstraintFamily::NewNodeIfSiteExists => "NewNodeIfSiteExists",
            ConstraintFamily::EnoughGlobalCapacity => "EnoughGlobalCapacity",
            ConstraintFamily::EnoughCapacityPerLot => "EnoughCapacityPerLot",
            ConstraintFamily::MaxTrafficOfCell => "MaxTrafficOfCell",
            ConstraintFamily::DemandFulfilment => "DemandFulfilment",
            ConstraintFamily::UniformNewCells => "UniformNewCells",
            ConstraintFamily::UniformUpgrades => "UniformUpgrades",
        }
    }
}

impl fmt::Display for ConstraintFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Composite key → variable id, one map per variable family
#[derive(Debug, Clone, Default)]
pub struct VariableIndex {
    pub build_site: BTreeMap<String, VarId>,
    pub build_node: BTreeMap<NodeKey, VarId>,
    pub build_cell: BTreeMap<CellKey, VarId>,
    pub upgrade_cell: BTreeMap<CellKey, VarId>,
    pub final_capacity: BTreeMap<CellKey, VarId>,
    pub traffic: BTreeMap<CoverageKey, VarId>,
}

impl VariableIndex {
    pub fn len(&self) -> usize {
        self.build_site.len()
            + self.build_node.len()
            + self.build_cell.len()
            + self.upgrade_cell.len()
            + self.final_capacity.len()
            + self.traffic.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Size of the generated model
#[derive(Debug, Clone, Default, Serialize)]
pub struct FormulationStats {
    pub build_site_vars: usize,
    pub build_node_vars: usize,
    pub build_cell_vars: usize,
    pub upgrade_cell_vars: usize,
    pub final_capacity_vars: usize,
    pub traffic_vars: usize,
    pub constraints: BTreeMap<ConstraintFamily, usize>,
    pub build_time: Duration,
}

impl FormulationStats {
    pub fn num_binary_vars(&self) -> usize {
        self.build_site_vars + self.build_node_vars + self.build_cell_vars + self.upgrade_cell_vars
    }

    pub fn num_variables(&self) -> usize {
        self.num_binary_vars() + self.final_capacity_vars + self.traffic_vars
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.values().sum()
    }
}

/// The assembled MILP together with the lookups needed to read a solution back
#[derive(Debug, Clone)]
pub struct PlanningModel {
    pub model: MilpModel,
    pub vars: VariableIndex,
    pub families: BTreeMap<ConstraintFamily, Range<usize>>,
    pub scale_factor: f64,
    pub stats: FormulationStats,
}

impl PlanningModel {
    /// Constraints of one family, in the order they were generated
    pub fn constraints_of(&self, family: ConstraintFamily) -> &[Constraint] {
        self.families
            .get(&family)
            .map(|range| &self.model.constraints[range.clone()])
            .unwrap_or(&[])
    }
}

/// Builds a [`PlanningModel`] from derived data; one builder per case
pub struct ModelBuilder<'a> {
    data: &'a DerivedData,
    costs: CostParameters,
    scale: f64,
    model: MilpModel,
    vars: VariableIndex,
    families: BTreeMap<ConstraintFamily, Range<usize>>,
}

impl<'a> ModelBuilder<'a> {
    pub fn new(data: &'a DerivedData, costs: CostParameters) -> Self {
        Self {
            data,
            costs,
            scale: 1.0,
            model: MilpModel::new(format!("network_planning_{}", data.case_id)),
            vars: VariableIndex::default(),
            families: BTreeMap::new(),
        }
    }

    /// Multiplier applied to every capacity and demand constant.
    ///
    /// Anything but a finite positive factor makes [`build`](Self::build) fail.
    pub fn with_scale_factor(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_solver_config(mut self, config: SolverConfig) -> Self {
        self.model.solver_config = config;
        self
    }

    pub fn build(mut self) -> Result<PlanningModel, FormulationError> {
        let start = Instant::now();
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(FormulationError::InvalidScaleFactor(self.scale));
        }

        self.declare_variables()?;
        self.set_objective();

        self.add_family(ConstraintFamily::MinCellCapacity, Self::min_cell_capacity)?;
        self.add_family(
            ConstraintFamily::MaxCapacityExistingCells,
            Self::max_capacity_existing_cells,
        )?;
        self.add_family(
            ConstraintFamily::MaxCapacityNewCells,
            Self::max_capacity_new_cells,
        )?;
        self.add_family(
            ConstraintFamily::NewCellIfNodeExists,
            Self::new_cell_if_node_exists,
        )?;
        self.add_family(
            ConstraintFamily::NewNodeIfSiteExists,
            Self::new_node_if_site_exists,
        )?;
        self.add_family(
            ConstraintFamily::EnoughGlobalCapacity,
            Self::enough_global_capacity,
        )?;
        self.add_family(
            ConstraintFamily::EnoughCapacityPerLot,
            Self::enough_capacity_per_lot,
        )?;
        self.add_family(ConstraintFamily::MaxTrafficOfCell, Self::max_traffic_of_cell)?;
        self.add_family(ConstraintFamily::DemandFulfilment, Self::demand_fulfilment)?;
        self.add_family(ConstraintFamily::UniformNewCells, Self::uniform_new_cells)?;
        self.add_family(ConstraintFamily::UniformUpgrades, Self::uniform_upgrades)?;

        let stats = FormulationStats {
            build_site_vars: self.vars.build_site.len(),
            build_node_vars: self.vars.build_node.len(),
            build_cell_vars: self.vars.build_cell.len(),
            upgrade_cell_vars: self.vars.upgrade_cell.len(),
            final_capacity_vars: self.vars.final_capacity.len(),
            traffic_vars: self.vars.traffic.len(),
            constraints: self
                .families
                .iter()
                .map(|(family, range)| (*family, range.len()))
                .collect(),
            build_time: start.elapsed(),
        };

        info!(
            case = %self.data.case_id,
            variables = stats.num_variables(),
            binaries = stats.num_binary_vars(),
            constraints = stats.num_constraints(),
            elapsed = ?stats.build_time,
            "model built"
        );

        Ok(PlanningModel {
            model: self.model,
            vars: self.vars,
            families: self.families,
            scale_factor: self.scale,
            stats,
        })
    }

    fn scaled(&self, value: f64) -> f64 {
        value * self.scale
    }

    fn add_family(
        &mut self,
        family: ConstraintFamily,
        generate: fn(&mut Self) -> Result<(), FormulationError>,
    ) -> Result<(), FormulationError> {
        let start = self.model.constraints.len();
        generate(self)?;
        let end = self.model.constraints.len();
        debug!(family = family.name(), count = end - start, "constraint family built");
        self.families.insert(family, start..end);
        Ok(())
    }

    fn push(&mut self, family: ConstraintFamily, key: impl fmt::Display, constraint: Constraint) {
        self.model
            .add_constraint(constraint.with_name(format!("{}[{}]", family.name(), key)));
    }

    fn declare_variables(&mut self) -> Result<(), FormulationError> {
        let data = self.data;

        for site in &data.potential_sites {
            let id = self
                .model
                .add_variable(Variable::binary(format!("build_site[{}]", site)));
            self.vars.build_site.insert(site.clone(), id);
        }
        for key in &data.potential_nodes {
            let id = self
                .model
                .add_variable(Variable::binary(format!("build_node[{}]", key)));
            self.vars.build_node.insert(key.clone(), id);
        }
        for key in &data.potential_cells {
            let id = self
                .model
                .add_variable(Variable::binary(format!("build_cell[{}]", key)));
            self.vars.build_cell.insert(key.clone(), id);
        }
        for key in &data.existing_cells {
            let id = self
                .model
                .add_variable(Variable::binary(format!("upgrade_cell[{}]", key)));
            self.vars.upgrade_cell.insert(key.clone(), id);
        }
        for key in data.cells() {
            let id = self
                .model
                .add_variable(Variable::continuous(format!("final_capacity[{}]", key)));
            self.vars.final_capacity.insert(key.clone(), id);
        }
        for edge in &data.coverage {
            if !self.vars.final_capacity.contains_key(&edge.cell_key()) {
                return Err(FormulationError::MissingVariable {
                    family: "traffic",
                    key: edge.to_string(),
                });
            }
            let id = self
                .model
                .add_variable(Variable::continuous(format!("traffic[{}]", edge)));
            self.vars.traffic.insert(edge.clone(), id);
        }
        Ok(())
    }

    fn set_objective(&mut self) {
        let costs = self.costs;
        let mut objective = LinearExpr::new();
        for &id in self.vars.build_site.values() {
            objective.add_term(id, costs.site_cost());
        }
        for &id in self.vars.build_node.values() {
            objective.add_term(id, costs.node_cost());
        }
        for &id in self.vars.build_cell.values() {
            objective.add_term(id, costs.cell_cost());
        }
        for &id in self.vars.upgrade_cell.values() {
            objective.add_term(id, costs.upgrade_cost());
        }
        self.model.set_objective(ObjectiveFunction::minimize(objective));
    }

    fn final_capacity(
        &self,
        family: ConstraintFamily,
        key: &CellKey,
    ) -> Result<VarId, FormulationError> {
        self.vars
            .final_capacity
            .get(key)
            .copied()
            .ok_or_else(|| missing_variable(family, key))
    }

    fn build_cell(&self, family: ConstraintFamily, key: &CellKey) -> Result<VarId, FormulationError> {
        self.vars
            .build_cell
            .get(key)
            .copied()
            .ok_or_else(|| missing_variable(family, key))
    }

    fn upgrade_cell(
        &self,
        family: ConstraintFamily,
        key: &CellKey,
    ) -> Result<VarId, FormulationError> {
        self.vars
            .upgrade_cell
            .get(key)
            .copied()
            .ok_or_else(|| missing_variable(family, key))
    }

    fn traffic(&self, family: ConstraintFamily, key: &CoverageKey) -> Result<VarId, FormulationError> {
        self.vars
            .traffic
            .get(key)
            .copied()
            .ok_or_else(|| missing_variable(family, key))
    }

    fn max_capacity(&self, family: ConstraintFamily, key: &CellKey) -> Result<f64, FormulationError> {
        self.data
            .max_capacity_of(key)
            .ok_or_else(|| FormulationError::MissingParameter {
                family: family.name(),
                key: key.to_string(),
            })
    }

    fn min_cell_capacity(&mut self) -> Result<(), FormulationError> {
        let family = ConstraintFamily::MinCellCapacity;
        let data = self.data;
        for key in &data.existing_cells {
            let capacity = self.final_capacity(family, key)?;
            let initial = self.scaled(data.initial_capacity_of(key));
            let expr = LinearExpr::new().term(capacity, 1.0);
            self.push(family, key, Constraint::geq(expr, initial));
        }
        Ok(())
    }

    // final ≤ init·(1-u) + max·u  ⇔  final - (max-init)·u ≤ init
    fn max_capacity_existing_cells(&mut self) -> Result<(), FormulationError> {
        let family = ConstraintFamily::MaxCapacityExistingCells;
        let data = self.data;
        for key in &data.existing_cells {
            let capacity = self.final_capacity(family, key)?;
            let upgrade = self.upgrade_cell(family, key)?;
            let initial = self.scaled(data.initial_capacity_of(key));
            let max = self.scaled(self.max_capacity(family, key)?);
            let expr = LinearExpr::new()
                .term(capacity, 1.0)
                .term(upgrade, -(max - initial));
            self.push(family, key, Constraint::leq(expr, initial));
        }
        Ok(())
    }

    fn max_capacity_new_cells(&mut self) -> Result<(), FormulationError> {
        let family = ConstraintFamily::MaxCapacityNewCells;
        let data = self.data;
        for key in &data.potential_cells {
            let capacity = self.final_capacity(family, key)?;
            let build = self.build_cell(family, key)?;
            let max = self.scaled(self.max_capacity(family, key)?);
            let expr = LinearExpr::new().term(capacity, 1.0).term(build, -max);
            self.push(family, key, Constraint::leq(expr, 0.0));
        }
        Ok(())
    }

    fn new_cell_if_node_exists(&mut self) -> Result<(), FormulationError> {
        let family = ConstraintFamily::NewCellIfNodeExists;
        let data = self.data;
        for key in &data.potential_cells {
            let node_key = key.node_key();
            if data.is_existing_node(&node_key) {
                continue;
            }
            let node = self
                .vars
                .build_node
                .get(&node_key)
                .copied()
                .ok_or_else(|| missing_variable(family, &node_key))?;
            let cell = self.build_cell(family, key)?;
            let expr = LinearExpr::new().term(cell, 1.0).term(node, -1.0);
            self.push(family, key, Constraint::leq(expr, 0.0));
        }
        Ok(())
    }

    fn new_node_if_site_exists(&mut self) -> Result<(), FormulationError> {
        let family = ConstraintFamily::NewNodeIfSiteExists;
        let data = self.data;
        for key in &data.potential_nodes {
            if data.is_existing_site(&key.site) {
                continue;
            }
            let site = self
                .vars
                .build_site
                .get(&key.site)
                .copied()
                .ok_or_else(|| missing_variable(family, &key.site))?;
            let node = self
                .vars
                .build_node
                .get(key)
                .copied()
                .ok_or_else(|| missing_variable(family, key))?;
            let expr = LinearExpr::new().term(node, 1.0).term(site, -1.0);
            self.push(family, key, Constraint::leq(expr, 0.0));
        }
        Ok(())
    }

    fn enough_global_capacity(&mut self) -> Result<(), FormulationError> {
        let family = ConstraintFamily::EnoughGlobalCapacity;
        let data = self.data;
        let mut per_node: BTreeMap<&str, LinearExpr> = BTreeMap::new();
        for (node_key, cells) in &data.cells_at_node {
            let expr = per_node.entry(node_key.node.as_str()).or_default();
            for key in cells {
                expr.add_term(self.final_capacity(family, key)?, 1.0);
            }
        }
        for node in &data.nodes {
            let demand = self.scaled(data.total_demand_for_node(node));
            match per_node.remove(node.as_str()) {
                Some(expr) => self.push(family, node, Constraint::geq(expr, demand)),
                None if demand > 0.0 => {
                    return Err(FormulationError::MissingVariable {
                        family: family.name(),
                        key: format!("any cell of node {}", node),
                    })
                }
                None => {}
            }
        }
        Ok(())
    }

    fn enough_capacity_per_lot(&mut self) -> Result<(), FormulationError> {
        let family = ConstraintFamily::EnoughCapacityPerLot;
        let data = self.data;
        for (lot_node, &demand) in &data.demand {
            let covering = data.covering_cells(lot_node);
            if covering.is_empty() {
                if demand > 0.0 {
                    let key = format!("any cell covering {}", lot_node);
                    return Err(missing_variable(family, &key));
                }
                continue;
            }
            let mut expr = LinearExpr::new();
            for (site, cell) in covering {
                let key = CellKey::new(site.clone(), lot_node.node.clone(), cell.clone());
                expr.add_term(self.final_capacity(family, &key)?, 1.0);
            }
            let demand = self.scaled(demand);
            self.push(family, lot_node, Constraint::geq(expr, demand));
        }
        Ok(())
    }

    fn max_traffic_of_cell(&mut self) -> Result<(), FormulationError> {
        let family = ConstraintFamily::MaxTrafficOfCell;
        let data = self.data;
        for key in data.cells() {
            let mut expr = LinearExpr::new();
            for lot in data.covered_lots(key) {
                let edge = CoverageKey::new(
                    key.site.clone(),
                    key.node.clone(),
                    key.cell.clone(),
                    lot.clone(),
                );
                expr.add_term(self.traffic(family, &edge)?, 1.0);
            }
            expr.add_term(self.final_capacity(family, key)?, -1.0);
            self.push(family, key, Constraint::leq(expr, 0.0));
        }
        Ok(())
    }

    fn demand_fulfilment(&mut self) -> Result<(), FormulationError> {
        let family = ConstraintFamily::DemandFulfilment;
        let data = self.data;
        for (lot_node, &demand) in &data.demand {
            let covering = data.covering_cells(lot_node);
            if covering.is_empty() {
                if demand > 0.0 {
                    let key = format!("any cell covering {}", lot_node);
                    return Err(missing_variable(family, &key));
                }
                continue;
            }
            let mut expr = LinearExpr::new();
            for (site, cell) in covering {
                let edge = CoverageKey::new(
                    site.clone(),
                    lot_node.node.clone(),
                    cell.clone(),
                    lot_node.lot.clone(),
                );
                expr.add_term(self.traffic(family, &edge)?, 1.0);
            }
            let demand = self.scaled(demand);
            self.push(family, lot_node, Constraint::eq(expr, demand));
        }
        Ok(())
    }

    // Pairwise equality follows from tying every cell to the first one
    fn uniform_new_cells(&mut self) -> Result<(), FormulationError> {
        let family = ConstraintFamily::UniformNewCells;
        let data = self.data;
        for cells in data.cells_at_node.values() {
            let mut potential = cells.iter().filter(|key| !data.is_existing_cell(key));
            let Some(first) = potential.next() else {
                continue;
            };
            let anchor = self.build_cell(family, first)?;
            for key in potential {
                let other = self.build_cell(family, key)?;
                let expr = LinearExpr::new().term(anchor, 1.0).term(other, -1.0);
                self.push(family, key, Constraint::eq(expr, 0.0));
            }
        }
        Ok(())
    }

    fn uniform_upgrades(&mut self) -> Result<(), FormulationError> {
        let family = ConstraintFamily::UniformUpgrades;
        let data = self.data;
        for cells in data.cells_at_node.values() {
            let mut existing = cells.iter().filter(|key| data.is_existing_cell(key));
            let Some(first) = existing.next() else {
                continue;
            };
            let anchor = self.upgrade_cell(family, first)?;
            for key in existing {
                let other = self.upgrade_cell(family, key)?;
                let expr = LinearExpr::new().term(anchor, 1.0).term(other, -1.0);
                self.push(family, key, Constraint::eq(expr, 0.0));
            }
        }
        Ok(())
    }
}

fn missing_variable(family: ConstraintFamily, key: &impl fmt::Display) -> FormulationError {
    FormulationError::MissingVariable {
        family: family.name(),
        key: key.to_string(),
    }
}
