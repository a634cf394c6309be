// Translation of the domain MILP into good_lp terms, shared by the good_lp backends

use crate::domain::{ConstraintType, MilpModel, VariableType};
use good_lp::{variable, variables, Expression, ProblemVariables, Variable as GoodLpVariable};

pub(crate) struct GoodLpModel {
    pub vars: ProblemVariables,
    pub columns: Vec<GoodLpVariable>,
    pub objective: Expression,
    pub constraints: Vec<good_lp::Constraint>,
}

pub(crate) fn translate(problem: &MilpModel) -> GoodLpModel {
    let mut vars = variables!();
    let mut columns: Vec<GoodLpVariable> = Vec::with_capacity(problem.num_variables());

    for var_def in &problem.variables {
        let lower = var_def.lower_bound;
        let upper = var_def.upper_bound.unwrap_or(f64::INFINITY);

        let var = match var_def.variable_type {
            VariableType::Binary => vars.add(variable().binary()),
            VariableType::Continuous => vars.add(variable().min(lower).max(upper)),
        };
        columns.push(var);
    }

    let mut objective: Expression = 0.into();
    for &(var, coeff) in &problem.objective.expression.terms {
        if coeff != 0.0 {
            objective += coeff * columns[var.index()];
        }
    }

    let constraints = problem
        .constraints
        .iter()
        .map(|constraint| {
            let mut lhs: Expression = 0.into();
            for &(var, coeff) in &constraint.expression.terms {
                if coeff != 0.0 {
                    lhs += coeff * columns[var.index()];
                }
            }
            match constraint.constraint_type {
                ConstraintType::LessThanOrEqual => lhs.leq(constraint.bound),
                ConstraintType::Equal => lhs.eq(constraint.bound),
                ConstraintType::GreaterThanOrEqual => lhs.geq(constraint.bound),
            }
        })
        .collect();

    GoodLpModel {
        vars,
        columns,
        objective,
        constraints,
    }
}
