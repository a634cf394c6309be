// Domain layer: topology relations, costs, the generic MILP model and solver contract
pub mod domain;

// Planning core: derivation, formulation, extraction and validation
pub mod planning;

// Application layer: case orchestration and the gRPC surface
pub mod application;

// Infrastructure layer: External concerns (gRPC, server)
#[cfg(feature = "server")]
pub mod infrastructure;

// Solver adapters: Concrete implementations of SolverService
pub mod solver;

// Re-export commonly used types
pub use domain::{
    CaseData, CostParameters, MilpModel, Solution, SolutionStatus, SolverBackend, SolverConfig,
    SolverError, SolverService,
};

pub use planning::{
    derive, extract_plan, validate_plan, ConstraintFamily, DerivationError, DerivedData,
    ExtractionError, FormulationError, ModelBuilder, NetworkPlan, PerformanceRecord, PlanningError, PlanningModel,
    ValidationFailure, ValidationReport,
};

pub use application::{CaseOutcome, NetworkPlanner, PlannerConfig};

#[cfg(feature = "server")]
pub use application::GrpcNetworkPlannerService;

#[cfg(feature = "server")]
pub use infrastructure::{start_server, ServerConfig};

pub use solver::{MicroLpSolver, SolverFactory};

#[cfg(feature = "coin_cbc")]
pub use solver::CoinCbcSolver;

#[cfg(feature = "highs")]
pub use solver::HighsSolver;
