// Domain service interface for solving the assembled MILP
// Any backend honouring this contract can be swapped in without touching the formulation

use super::models::{MilpModel, Solution};

/// Error types for the solver service
#[derive(Debug, thiserror::Error)]
pub enum SolverError {
    #[error("Invalid problem: {0}")]
    InvalidProblem(String),

    #[error("Solver not available: {0}")]
    SolverNotAvailable(String),

    #[error("Solver execution failed: {0}")]
    ExecutionFailed(String),
}

pub type Result<T> = std::result::Result<T, SolverError>;

/// Domain service interface for MILP solvers
///
/// The planning core only relies on this contract: a terminal status and, for
/// `Optimal`/`FeasibleTimeLimit`, one value per declared variable.
pub trait SolverService: Send + Sync {
    /// Solve a model using its embedded [`SolverConfig`](super::models::SolverConfig)
    fn solve(&self, problem: &MilpModel) -> Result<Solution>;

    /// Validate a model without solving it
    fn validate(&self, problem: &MilpModel) -> Result<()> {
        let mut errors = Vec::new();
        let num_vars = problem.num_variables();

        for (var, _) in &problem.objective.expression.terms {
            if var.index() >= num_vars {
                errors.push(format!("Objective references unknown variable {}", var.index()));
            }
        }

        for (i, constraint) in problem.constraints.iter().enumerate() {
            if !constraint.bound.is_finite() {
                errors.push(format!(
                    "Constraint {} '{}' has a non-finite bound",
                    i, constraint.name
                ));
            }
            for (var, coeff) in &constraint.expression.terms {
                if var.index() >= num_vars {
                    errors.push(format!(
                        "Constraint {} '{}' references unknown variable {}",
                        i,
                        constraint.name,
                        var.index()
                    ));
                }
                if !coeff.is_finite() {
                    errors.push(format!(
                        "Constraint {} '{}' has a non-finite coefficient",
                        i, constraint.name
                    ));
                }
            }
        }

        for (i, var) in problem.variables.iter().enumerate() {
            if let Some(upper) = var.upper_bound {
                if var.lower_bound > upper {
                    errors.push(format!(
                        "Variable {} '{}' has lower bound ({}) > upper bound ({})",
                        i, var.name, var.lower_bound, upper
                    ));
                }
            }
        }

        if let Err(e) = problem.solver_config.validate() {
            errors.push(e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SolverError::InvalidProblem(errors.join("; ")))
        }
    }

    /// Get the name of this solver backend
    fn name(&self) -> &str;

    /// Whether the backend honours `time_limit` and `gap_tolerance`
    fn supports_limits(&self) -> bool;
}
