// microlp adapter: pure-Rust simplex with branch and bound, always compiled in.
// It has no time or gap controls, so every successful solve is proven optimal.

use super::good_lp_model::translate;
use crate::domain::{
    models::{MilpModel, Solution as DomainSolution},
    solver_service::{Result, SolverError, SolverService},
    value_objects::SolutionStatus as DomainSolutionStatus,
};
use good_lp::{solvers::microlp::microlp, ResolutionError, Solution as GoodLpSolutionTrait, SolverModel};
use std::time::Instant;
use tracing::debug;

pub struct MicroLpSolver;

impl MicroLpSolver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MicroLpSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SolverService for MicroLpSolver {
    fn solve(&self, problem: &MilpModel) -> Result<DomainSolution> {
        self.validate(problem)?;

        if problem.solver_config.time_limit.is_some() || problem.solver_config.gap_tolerance.is_some() {
            debug!("microlp ignores time_limit and gap_tolerance");
        }

        let start_time = Instant::now();
        let model = translate(problem);

        let mut lp_model = model.vars.minimise(model.objective).using(microlp);
        for constraint in model.constraints {
            lp_model = lp_model.with(constraint);
        }

        let solution_result = lp_model.solve();
        let statistics = super::statistics(problem, start_time.elapsed().as_secs_f64() * 1000.0);

        match solution_result {
            Ok(sol) => {
                let variable_values: Vec<f64> =
                    model.columns.iter().map(|&var| sol.value(var)).collect();
                let objective = problem.objective_value(&variable_values);

                let mut solution = DomainSolution::optimal(objective, variable_values)
                    .with_statistics(statistics);
                solution.message = format!("Optimal solution found for '{}'", problem.name);
                Ok(solution)
            }
            Err(ResolutionError::Infeasible) => Ok(DomainSolution::new(
                DomainSolutionStatus::Infeasible,
                "Problem is infeasible: no solution satisfies all constraints",
            )
            .with_statistics(statistics)),
            Err(ResolutionError::Unbounded) => Ok(DomainSolution::new(
                DomainSolutionStatus::Unbounded,
                "Problem is unbounded: objective can be improved infinitely",
            )
            .with_statistics(statistics)),
            Err(e) => Err(SolverError::ExecutionFailed(format!("{:?}", e))),
        }
    }

    fn name(&self) -> &str {
        "microlp"
    }

    fn supports_limits(&self) -> bool {
        false
    }
}
