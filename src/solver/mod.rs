// Solver adapters: concrete implementations of SolverService

#[cfg(feature = "coin_cbc")]
pub mod coin_cbc_solver;
pub mod factory;
mod good_lp_model;
#[cfg(feature = "highs")]
pub mod highs_solver;
pub mod microlp_solver;

#[cfg(feature = "coin_cbc")]
pub use coin_cbc_solver::CoinCbcSolver;
pub use factory::SolverFactory;
#[cfg(feature = "highs")]
pub use highs_solver::HighsSolver;
pub use microlp_solver::MicroLpSolver;

use crate::domain::{MilpModel, SolverStatistics};

/// Row feasibility tolerance used when judging a time-limited incumbent
const INCUMBENT_TOLERANCE: f64 = 1e-6;

/// Whether an incumbent returned on time limit satisfies every row and bound
#[cfg_attr(not(any(feature = "coin_cbc", feature = "highs")), allow(dead_code))]
pub(crate) fn incumbent_is_feasible(problem: &MilpModel, values: &[f64]) -> bool {
    if values.len() != problem.num_variables() {
        return false;
    }
    let bounds_ok = problem.variables.iter().zip(values).all(|(var, &value)| {
        value >= var.lower_bound - INCUMBENT_TOLERANCE
            && var
                .upper_bound
                .map_or(true, |upper| value <= upper + INCUMBENT_TOLERANCE)
    });
    bounds_ok
        && problem
            .constraints
            .iter()
            .all(|c| c.is_satisfied_by(values, INCUMBENT_TOLERANCE * c.bound.abs().max(1.0)))
}

pub(crate) fn statistics(problem: &MilpModel, solve_time_ms: f64) -> SolverStatistics {
    SolverStatistics {
        solve_time_ms,
        num_variables: problem.num_variables() as u32,
        num_constraints: problem.constraints.len() as u32,
        num_binary_vars: problem.num_integer_variables() as u32,
    }
}
