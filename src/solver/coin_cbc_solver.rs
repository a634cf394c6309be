// COIN-OR CBC adapter through good_lp. Needs the native Cbc library at link time.

use super::good_lp_model::translate;
use super::incumbent_is_feasible;
use crate::domain::{
    models::{MilpModel, Solution as DomainSolution},
    solver_service::{Result, SolverError, SolverService},
    value_objects::SolutionStatus as DomainSolutionStatus,
};
use good_lp::{solvers::coin_cbc::coin_cbc, ResolutionError, Solution as GoodLpSolutionTrait, SolverModel};
use std::time::Instant;
use tracing::{debug, warn};

pub struct CoinCbcSolver;

impl CoinCbcSolver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CoinCbcSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SolverService for CoinCbcSolver {
    fn solve(&self, problem: &MilpModel) -> Result<DomainSolution> {
        self.validate(problem)?;

        let start_time = Instant::now();
        let model = translate(problem);
        let config = &problem.solver_config;

        let mut lp_model = model.vars.minimise(model.objective).using(coin_cbc);
        if let Some(limit) = config.time_limit {
            lp_model.set_parameter("seconds", &limit.to_string());
        }
        if let Some(gap) = config.gap_tolerance {
            lp_model.set_parameter("ratioGap", &gap.to_string());
        }
        lp_model.set_parameter("log", if config.verbose { "1" } else { "0" });
        for constraint in model.constraints {
            lp_model = lp_model.with(constraint);
        }

        let solution_result = lp_model.solve();
        let elapsed = start_time.elapsed();
        let statistics = super::statistics(problem, elapsed.as_secs_f64() * 1000.0);
        let hit_time_limit = config
            .time_limit
            .map_or(false, |limit| elapsed.as_secs_f64() >= limit);

        match solution_result {
            Ok(sol) => {
                let variable_values: Vec<f64> =
                    model.columns.iter().map(|&var| sol.value(var)).collect();
                let objective = problem.objective_value(&variable_values);

                if !hit_time_limit {
                    let mut solution = DomainSolution::optimal(objective, variable_values)
                        .with_statistics(statistics);
                    solution.message = format!("Optimal solution found for '{}'", problem.name);
                    return Ok(solution);
                }
                if incumbent_is_feasible(problem, &variable_values) {
                    debug!(objective, "CBC stopped on time limit with an incumbent");
                    Ok(DomainSolution::time_limited(objective, None, variable_values)
                        .with_statistics(statistics))
                } else {
                    warn!("CBC stopped on time limit without a feasible incumbent");
                    Ok(DomainSolution::new(
                        DomainSolutionStatus::Error,
                        "Time limit reached without a feasible solution",
                    )
                    .with_statistics(statistics))
                }
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
            Err(ResolutionError::Other(reason)) if hit_time_limit => {
                warn!(reason, "CBC stopped on time limit without a feasible incumbent");
                Ok(DomainSolution::new(
                    DomainSolutionStatus::Error,
                    "Time limit reached without a feasible solution",
                )
                .with_statistics(statistics))
            }
            Err(e) => Err(SolverError::ExecutionFailed(format!("{:?}", e))),
        }
    }

    fn name(&self) -> &str {
        "COIN-OR CBC"
    }

    fn supports_limits(&self) -> bool {
        true
    }
}
