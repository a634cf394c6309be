use super::value_objects::{ConstraintType, SolutionStatus, SolverBackend, VariableType};
use serde::{Deserialize, Serialize};

/// Position of a variable in [`MilpModel::variables`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub usize);

impl VarId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Decision variable in a MILP
#[derive(Debug, Clone)]
pub struct Variable {
    pub variable_type: VariableType,
    pub lower_bound: f64,
    pub upper_bound: Option<f64>,
    pub name: String,
}

impl Variable {
    /// Non-negative continuous variable
    pub fn continuous(name: impl Into<String>) -> Self {
        Self {
            variable_type: VariableType::Continuous,
            lower_bound: 0.0,
            upper_bound: None,
            name: name.into(),
        }
    }

    pub fn binary(name: impl Into<String>) -> Self {
        Self {
            variable_type: VariableType::Binary,
            lower_bound: 0.0,
            upper_bound: Some(1.0),
            name: name.into(),
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self.variable_type, VariableType::Binary)
    }
}

/// Sparse linear expression `Σ coeff·x`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    pub terms: Vec<(VarId, f64)>,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn term(mut self, var: VarId, coeff: f64) -> Self {
        self.add_term(var, coeff);
        self
    }

    pub fn add_term(&mut self, var: VarId, coeff: f64) {
        self.terms.push((var, coeff));
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Value of the expression under an assignment indexed by [`VarId`]
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|(var, coeff)| coeff * values.get(var.index()).copied().unwrap_or(0.0))
            .sum()
    }

    pub fn coefficient_of(&self, var: VarId) -> f64 {
        self.terms
            .iter()
            .filter(|(v, _)| *v == var)
            .map(|(_, c)| c)
            .sum()
    }
}

/// Objective function; the planning model always minimizes
#[derive(Debug, Clone, Default)]
pub struct ObjectiveFunction {
    pub expression: LinearExpr,
}

impl ObjectiveFunction {
    pub fn minimize(expression: LinearExpr) -> Self {
        Self { expression }
    }
}

/// Linear constraint `expression <op> bound`
#[derive(Debug, Clone)]
pub struct Constraint {
    pub constraint_type: ConstraintType,
    pub expression: LinearExpr,
    pub bound: f64,
    pub name: String,
}

impl Constraint {
    pub fn new(constraint_type: ConstraintType, expression: LinearExpr, bound: f64) -> Self {
        Self {
            constraint_type,
            expression,
            bound,
            name: String::new(),
        }
    }

    pub fn leq(expression: LinearExpr, bound: f64) -> Self {
        Self::new(ConstraintType::LessThanOrEqual, expression, bound)
    }

    pub fn geq(expression: LinearExpr, bound: f64) -> Self {
        Self::new(ConstraintType::GreaterThanOrEqual, expression, bound)
    }

    pub fn eq(expression: LinearExpr, bound: f64) -> Self {
        Self::new(ConstraintType::Equal, expression, bound)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Whether `values` satisfies the constraint up to `tolerance`
    pub fn is_satisfied_by(&self, values: &[f64], tolerance: f64) -> bool {
        let lhs = self.expression.evaluate(values);
        match self.constraint_type {
            ConstraintType::LessThanOrEqual => lhs <= self.bound + tolerance,
            ConstraintType::GreaterThanOrEqual => lhs >= self.bound - tolerance,
            ConstraintType::Equal => (lhs - self.bound).abs() <= tolerance,
        }
    }
}

/// Configuration for the solver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub backend: SolverBackend,
    /// Wall-clock limit in seconds
    pub time_limit: Option<f64>,
    /// Relative MIP gap at which the solver may stop
    pub gap_tolerance: Option<f64>,
    pub verbose: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            backend: SolverBackend::Auto,
            time_limit: None,
            gap_tolerance: None,
            verbose: false,
        }
    }
}

impl SolverConfig {
    pub fn with_backend(mut self, backend: SolverBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_time_limit(mut self, seconds: f64) -> Self {
        self.time_limit = Some(seconds);
        self
    }

    pub fn with_gap_tolerance(mut self, gap: f64) -> Self {
        self.gap_tolerance = Some(gap);
        self
    }

    /// Check the limits are usable by a solver
    pub fn validate(&self) -> Result<(), String> {
        if let Some(limit) = self.time_limit {
            if !limit.is_finite() || limit <= 0.0 {
                return Err(format!("time_limit must be positive seconds, got {}", limit));
            }
        }
        if let Some(gap) = self.gap_tolerance {
            if !(0.0..1.0).contains(&gap) {
                return Err(format!("mip gap must lie in [0, 1), got {}", gap));
            }
        }
        Ok(())
    }
}

/// Complete mixed-integer linear program (always a minimization)
#[derive(Debug, Clone, Default)]
pub struct MilpModel {
    pub name: String,
    pub objective: ObjectiveFunction,
    pub constraints: Vec<Constraint>,
    pub variables: Vec<Variable>,
    pub solver_config: SolverConfig,
}

impl MilpModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn add_variable(&mut self, variable: Variable) -> VarId {
        self.variables.push(variable);
        VarId(self.variables.len() - 1)
    }

    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    pub fn set_objective(&mut self, objective: ObjectiveFunction) {
        self.objective = objective;
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_integer_variables(&self) -> usize {
        self.variables.iter().filter(|v| v.is_integer()).count()
    }

    /// Objective value under an assignment
    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.objective.expression.evaluate(values)
    }
}

/// Statistics about the solve process
#[derive(Debug, Clone, Default)]
pub struct SolverStatistics {
    pub solve_time_ms: f64,
    pub num_variables: u32,
    pub num_constraints: u32,
    pub num_binary_vars: u32,
}

/// Raw result of a solve: status plus, for usable statuses, one value per variable
#[derive(Debug, Clone)]
pub struct Solution {
    pub status: SolutionStatus,
    pub objective_value: Option<f64>,
    pub gap: Option<f64>,
    pub variable_values: Vec<f64>,
    pub message: String,
    pub statistics: SolverStatistics,
}

impl Solution {
    pub fn new(status: SolutionStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            objective_value: None,
            gap: None,
            variable_values: Vec::new(),
            message: message.into(),
            statistics: SolverStatistics::default(),
        }
    }

    pub fn optimal(value: f64, variable_values: Vec<f64>) -> Self {
        Self {
            status: SolutionStatus::Optimal,
            objective_value: Some(value),
            gap: Some(0.0),
            variable_values,
            message: "Optimal solution found".to_string(),
            statistics: SolverStatistics::default(),
        }
    }

    /// Incumbent returned when the time limit cut the search short
    pub fn time_limited(value: f64, gap: Option<f64>, variable_values: Vec<f64>) -> Self {
        Self {
            status: SolutionStatus::FeasibleTimeLimit,
            objective_value: Some(value),
            gap,
            variable_values,
            message: "Time limit reached with a feasible incumbent".to_string(),
            statistics: SolverStatistics::default(),
        }
    }

    pub fn with_statistics(mut self, statistics: SolverStatistics) -> Self {
        self.statistics = statistics;
        self
    }

    pub fn is_optimal(&self) -> bool {
        self.status == SolutionStatus::Optimal
    }

    pub fn is_feasible(&self) -> bool {
        self.status.has_assignment()
    }

    pub fn value(&self, var: VarId) -> Option<f64> {
        self.variable_values.get(var.index()).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraint_satisfaction_respects_tolerance() {
        let expr = LinearExpr::new().term(VarId(0), 1.0).term(VarId(1), -2.0);
        let values = [5.0, 2.0];

        assert!(Constraint::leq(expr.clone(), 1.0).is_satisfied_by(&values, 0.0));
        assert!(!Constraint::leq(expr.clone(), 0.5).is_satisfied_by(&values, 0.1));
        assert!(Constraint::eq(expr.clone(), 1.0 + 1e-9).is_satisfied_by(&values, 1e-6));
        assert!(!Constraint::geq(expr, 2.0).is_satisfied_by(&values, 1e-6));
    }

    #[test]
    fn solver_config_rejects_bad_limits() {
        assert!(SolverConfig::default().validate().is_ok());
        assert!(SolverConfig::default().with_time_limit(0.0).validate().is_err());
        assert!(SolverConfig::default().with_gap_tolerance(1.0).validate().is_err());
        assert!(SolverConfig::default()
            .with_time_limit(30.0)
            .with_gap_tolerance(0.01)
            .validate()
            .is_ok());
    }
}
