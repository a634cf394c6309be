// HiGHS adapter: translates the domain MILP straight into a HiGHS row problem

use super::incumbent_is_feasible;
use crate::domain::{
    models::{MilpModel, Solution as DomainSolution},
    solver_service::{Result, SolverError, SolverService},
    value_objects::{ConstraintType, SolutionStatus as DomainSolutionStatus, VariableType},
};
use highs::{HighsModelStatus, RowProblem, Sense};
use std::time::Instant;
use tracing::{debug, warn};

pub struct HighsSolver;

/// HiGHS reports an infinite gap while it has no dual bound
fn reported_gap(raw: f64) -> Option<f64> {
    Some(raw).filter(|gap| gap.is_finite() && *gap >= 0.0)
}

impl HighsSolver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HighsSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SolverService for HighsSolver {
    fn solve(&self, problem: &MilpModel) -> Result<DomainSolution> {
        self.validate(problem)?;

        let start_time = Instant::now();
        let config = &problem.solver_config;

        let mut objective = vec![0.0; problem.num_variables()];
        for &(var, coeff) in &problem.objective.expression.terms {
            objective[var.index()] += coeff;
        }

        let mut pb = RowProblem::default();
        let columns: Vec<_> = problem
            .variables
            .iter()
            .zip(&objective)
            .map(|(var_def, &obj_coeff)| {
                let lower = var_def.lower_bound;
                let upper = var_def.upper_bound.unwrap_or(f64::INFINITY);
                match var_def.variable_type {
                    VariableType::Binary => pb.add_integer_column(obj_coeff, 0.0..=1.0),
                    VariableType::Continuous => pb.add_column(obj_coeff, lower..=upper),
                }
            })
            .collect();

        for constraint in &problem.constraints {
            let terms: Vec<_> = constraint
                .expression
                .terms
                .iter()
                .filter(|(_, coeff)| *coeff != 0.0)
                .map(|&(var, coeff)| (columns[var.index()], coeff))
                .collect();

            match constraint.constraint_type {
                ConstraintType::LessThanOrEqual => pb.add_row(..=constraint.bound, &terms),
                ConstraintType::Equal => pb.add_row(constraint.bound..=constraint.bound, &terms),
                ConstraintType::GreaterThanOrEqual => pb.add_row(constraint.bound.., &terms),
            }
        }

        let mut model = pb.optimise(Sense::Minimise);
        model.set_option("output_flag", config.verbose);
        if let Some(limit) = config.time_limit {
            model.set_option("time_limit", limit);
        }
        if let Some(gap) = config.gap_tolerance {
            model.set_option("mip_rel_gap", gap);
        }

        let solved = model.solve();
        let statistics = super::statistics(problem, start_time.elapsed().as_secs_f64() * 1000.0);

        match solved.status() {
            HighsModelStatus::Optimal | HighsModelStatus::ModelEmpty => {
                let variable_values = solved.get_solution().columns().to_vec();
                let value = problem.objective_value(&variable_values);

                let mut solution = DomainSolution::optimal(value, variable_values)
                    .with_statistics(statistics);
                solution.message = format!("Optimal solution found for '{}'", problem.name);
                Ok(solution)
            }
            HighsModelStatus::ReachedTimeLimit => {
                let variable_values = solved.get_solution().columns().to_vec();
                if incumbent_is_feasible(problem, &variable_values) {
                    let value = problem.objective_value(&variable_values);
                    let gap = reported_gap(solved.mip_gap());
                    debug!(objective = value, gap, "HiGHS stopped on time limit with an incumbent");
                    Ok(DomainSolution::time_limited(value, gap, variable_values)
                        .with_statistics(statistics))
                } else {
                    warn!("HiGHS stopped on time limit without a feasible incumbent");
                    Ok(DomainSolution::new(
                        DomainSolutionStatus::Error,
                        "Time limit reached without a feasible solution",
                    )
                    .with_statistics(statistics))
                }
            }
            HighsModelStatus::Infeasible => Ok(DomainSolution::new(
                DomainSolutionStatus::Infeasible,
                "Problem is infeasible: no solution satisfies all constraints",
            )
            .with_statistics(statistics)),
            HighsModelStatus::Unbounded | HighsModelStatus::UnboundedOrInfeasible => {
                Ok(DomainSolution::new(
                    DomainSolutionStatus::Unbounded,
                    "Problem is unbounded: objective can be improved infinitely",
                )
                .with_statistics(statistics))
            }
            status => Err(SolverError::ExecutionFailed(format!(
                "HiGHS solver returned status: {:?}",
                status
            ))),
        }
    }

    fn name(&self) -> &str {
        "HiGHS"
    }

    fn supports_limits(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Constraint, LinearExpr, ObjectiveFunction, Variable};

    #[test]
    fn time_limit_gap_is_kept_when_bounded() {
        assert_eq!(reported_gap(0.125), Some(0.125));
        assert_eq!(reported_gap(0.0), Some(0.0));
        assert_eq!(reported_gap(f64::INFINITY), None);
        assert_eq!(reported_gap(f64::NAN), None);
    }

    #[test]
    fn solves_small_mip() {
        let mut model = MilpModel::new("small");
        let a = model.add_variable(Variable::binary("a"));
        let b = model.add_variable(Variable::binary("b"));
        model.set_objective(ObjectiveFunction::minimize(
            LinearExpr::new().term(a, 3.0).term(b, 2.0),
        ));
        model.add_constraint(Constraint::geq(LinearExpr::new().term(a, 1.0).term(b, 1.0), 1.0));

        let solution = HighsSolver::new().solve(&model).unwrap();
        assert!(solution.is_optimal());
        assert!((solution.objective_value.unwrap() - 2.0).abs() < 1e-6);
        assert_eq!(solution.gap, Some(0.0));
    }
}
