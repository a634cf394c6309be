//! Case orchestration: derive, build, solve, extract and validate one case,
//! or many independent cases concurrently.

use crate::domain::{CaseData, CostParameters, SolutionStatus, SolverConfig, SolverService};
use crate::planning::{
    derive, extract_plan, validate_plan, DerivedData, FormulationStats, ModelBuilder, NetworkPlan,
    PerformanceRecord, PlanningError, PlanningModel, ValidationReport, DEFAULT_TOLERANCE,
};
use crate::planning::error::Result;
use crate::solver::SolverFactory;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Everything that parameterises a planning run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub costs: CostParameters,
    pub solver: SolverConfig,
    /// Multiplier applied to capacities and demand inside the model
    pub scale_factor: f64,
    /// Relative epsilon used by post-solve validation
    pub validation_tolerance: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            costs: CostParameters::default(),
            solver: SolverConfig::default(),
            scale_factor: 1.0,
            validation_tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl PlannerConfig {
    pub fn validate(&self) -> Result<()> {
        self.costs.validate().map_err(PlanningError::Config)?;
        self.solver.validate().map_err(PlanningError::Config)?;
        if !self.scale_factor.is_finite() || self.scale_factor <= 0.0 {
            return Err(PlanningError::Config(format!(
                "scale_factor must be positive, got {}",
                self.scale_factor
            )));
        }
        if !self.validation_tolerance.is_finite() || self.validation_tolerance < 0.0 {
            return Err(PlanningError::Config(format!(
                "validation_tolerance must be non-negative, got {}",
                self.validation_tolerance
            )));
        }
        Ok(())
    }
}

/// Terminal result of one case
///
/// Infeasible, unbounded and solver-error statuses land here with no plan;
/// only aborted cases surface as [`PlanningError`].
#[derive(Debug, Clone, Serialize)]
pub struct CaseOutcome {
    pub case_id: String,
    pub status: SolutionStatus,
    pub solver: String,
    pub message: String,
    pub plan: Option<NetworkPlan>,
    pub validation: Option<ValidationReport>,
    pub performance: PerformanceRecord,
    pub formulation: FormulationStats,
}

impl CaseOutcome {
    /// A plan exists and survived validation
    pub fn is_accepted(&self) -> bool {
        self.validation.as_ref().map_or(false, ValidationReport::passed)
    }
}

/// Plans cases with a fixed configuration; cheap to clone into workers
#[derive(Clone)]
pub struct NetworkPlanner {
    config: PlannerConfig,
    solver: Option<Arc<dyn SolverService>>,
}

impl NetworkPlanner {
    pub fn new(config: PlannerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            solver: None,
        })
    }

    /// Use `solver` for every case instead of resolving the configured backend
    pub fn with_solver(mut self, solver: Arc<dyn SolverService>) -> Self {
        self.solver = Some(solver);
        self
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    fn solver(&self) -> Result<Arc<dyn SolverService>> {
        match &self.solver {
            Some(solver) => Ok(Arc::clone(solver)),
            None => Ok(SolverFactory::create_from_backend(self.config.solver.backend)?),
        }
    }

    fn formulate(&self, case: &CaseData) -> Result<(DerivedData, PlanningModel)> {
        let data = derive(case)?;
        let planning = ModelBuilder::new(&data, self.config.costs)
            .with_scale_factor(self.config.scale_factor)
            .with_solver_config(self.config.solver.clone())
            .build()?;
        Ok((data, planning))
    }

    /// Derive and build without solving
    pub fn describe_formulation(&self, case: &CaseData) -> Result<FormulationStats> {
        let (_, planning) = self.formulate(case)?;
        Ok(planning.stats)
    }

    /// Plan one case end to end
    pub fn plan_case(&self, case: &CaseData) -> Result<CaseOutcome> {
        let solver = self.solver()?;

        let build_start = Instant::now();
        let (data, planning) = self.formulate(case)?;
        let build_time = build_start.elapsed();

        info!(case = %case.case_id, solver = solver.name(), "solving");
        let solve_start = Instant::now();
        let solution = solver.solve(&planning.model)?;
        let solve_time = solve_start.elapsed();

        let plan = extract_plan(&planning, &solution)?;
        let validation = plan
            .as_ref()
            .map(|plan| validate_plan(&data, plan, self.config.validation_tolerance));

        match solution.status {
            SolutionStatus::Optimal => info!(
                case = %case.case_id,
                objective = solution.objective_value,
                ?solve_time,
                "optimal plan found"
            ),
            status => warn!(
                case = %case.case_id,
                %status,
                gap = solution.gap,
                message = %solution.message,
                "case finished without a proven optimum"
            ),
        }

        Ok(CaseOutcome {
            case_id: case.case_id.clone(),
            status: solution.status,
            solver: solver.name().to_string(),
            message: solution.message,
            plan,
            validation,
            performance: PerformanceRecord {
                case_id: case.case_id.clone(),
                status: solution.status,
                objective_value: solution.objective_value,
                gap: solution.gap,
                build_time,
                solve_time,
            },
            formulation: planning.stats,
        })
    }

    /// Plan independent cases concurrently on the blocking pool
    ///
    /// Results come back in input order; a failing case never affects its siblings.
    pub async fn plan_batch(&self, cases: Vec<CaseData>) -> Vec<Result<CaseOutcome>> {
        info!(cases = cases.len(), "planning batch");
        let tasks = cases.into_iter().map(|case| {
            let planner = self.clone();
            tokio::task::spawn_blocking(move || planner.plan_case(&case))
        });

        join_all(tasks)
            .await
            .into_iter()
            .map(|joined| {
                joined
                    .map_err(|e| PlanningError::Worker(e.to_string()))
                    .and_then(|outcome| outcome)
            })
            .collect()
    }
}
