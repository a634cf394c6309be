use serde::{Deserialize, Serialize};

/// Per-unit capital and operating costs of the expansion decisions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostParameters {
    pub capex_new_site: f64,
    pub capex_new_node: f64,
    pub capex_new_cell: f64,
    pub capex_upgrade_cell: f64,
    pub opex_site: f64,
    pub opex_node: f64,
}

impl Default for CostParameters {
    fn default() -> Self {
        Self {
            capex_new_site: 28_855.0,
            capex_new_node: 36_770.0,
            capex_new_cell: 11_737.0,
            capex_upgrade_cell: 5_868.0,
            opex_site: 1_960.0,
            opex_node: 0.0,
        }
    }
}

impl CostParameters {
    /// Objective coefficient of building a potential site
    pub fn site_cost(&self) -> f64 {
        self.capex_new_site + self.opex_site
    }

    /// Objective coefficient of building a potential node
    pub fn node_cost(&self) -> f64 {
        self.capex_new_node + self.opex_node
    }

    pub fn cell_cost(&self) -> f64 {
        self.capex_new_cell
    }

    pub fn upgrade_cost(&self) -> f64 {
        self.capex_upgrade_cell
    }

    pub fn validate(&self) -> Result<(), String> {
        let fields = [
            ("capex_new_site", self.capex_new_site),
            ("capex_new_node", self.capex_new_node),
            ("capex_new_cell", self.capex_new_cell),
            ("capex_upgrade_cell", self.capex_upgrade_cell),
            ("opex_site", self.opex_site),
            ("opex_node", self.opex_node),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{} must be a non-negative number, got {}", name, value));
            }
        }
        Ok(())
    }
}
