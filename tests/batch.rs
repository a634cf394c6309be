mod common;

use common::*;
use netplan::domain::{MilpModel, Solution, SolverService};
use netplan::{MicroLpSolver, PlanningError, SolutionStatus, SolverError};
use std::sync::Arc;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failing_cases_do_not_abort_siblings() {
    let broken = scenario_a().demand("lot9", "4G", 4.0);
    let infeasible = scenario_b().demand("lot2", "4G", 40.0).covers("p1", "4G", "c1", "lot2");
    let cases = vec![scenario_a(), broken, scenario_b(), infeasible, scenario_c()];

    let results = microlp_planner().plan_batch(cases).await;
    assert_eq!(results.len(), 5);

    let a = results[0].as_ref().unwrap();
    assert_eq!(a.case_id, "A");
    assert!(a.is_accepted());

    assert!(matches!(results[1], Err(PlanningError::Derivation(_))));

    let b = results[2].as_ref().unwrap();
    assert_eq!(b.case_id, "B");
    assert!(b.is_accepted());

    let infeasible = results[3].as_ref().unwrap();
    assert_eq!(infeasible.status, SolutionStatus::Infeasible);
    assert!(infeasible.plan.is_none());

    assert!(results[4].as_ref().unwrap().is_accepted());
}

#[tokio::test]
async fn empty_batch_yields_nothing() {
    assert!(microlp_planner().plan_batch(Vec::new()).await.is_empty());
}

/// Solves to optimality but reports the result as cut short by the time limit
struct TruncatingSolver;

impl SolverService for TruncatingSolver {
    fn solve(&self, problem: &MilpModel) -> Result<Solution, SolverError> {
        let solved = MicroLpSolver::new().solve(problem)?;
        let value = solved.objective_value.unwrap_or_default();
        Ok(Solution::time_limited(value, Some(0.05), solved.variable_values))
    }

    fn name(&self) -> &str {
        "truncating"
    }

    fn supports_limits(&self) -> bool {
        true
    }
}

#[test]
fn time_limited_plan_is_kept_and_labelled() {
    let planner = microlp_planner().with_solver(Arc::new(TruncatingSolver));
    let outcome = planner.plan_case(&scenario_b()).unwrap();

    assert_eq!(outcome.status, SolutionStatus::FeasibleTimeLimit);
    assert_eq!(outcome.solver, "truncating");
    assert!(!outcome.performance.is_proven_optimal());
    assert_eq!(outcome.performance.gap, Some(0.05));
    assert!(outcome.plan.is_some());
    assert!(outcome.is_accepted());
}

/// Always fails inside the solver call
struct BrokenSolver;

impl SolverService for BrokenSolver {
    fn solve(&self, _problem: &MilpModel) -> Result<Solution, SolverError> {
        Err(SolverError::ExecutionFailed("backend crashed".to_string()))
    }

    fn name(&self) -> &str {
        "broken"
    }

    fn supports_limits(&self) -> bool {
        false
    }
}

#[tokio::test]
async fn solver_failure_is_reported_per_case() {
    let planner = microlp_planner().with_solver(Arc::new(BrokenSolver));
    let results = planner.plan_batch(vec![scenario_a(), scenario_b()]).await;
    assert!(results
        .iter()
        .all(|r| matches!(r, Err(PlanningError::Solver(SolverError::ExecutionFailed(_))))));
}
