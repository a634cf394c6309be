use crate::domain::{
    models::MilpModel,
    solver_service::{Result, SolverError, SolverService},
    value_objects::SolverBackend,
};
use crate::solver::MicroLpSolver;
use std::sync::Arc;

/// Factory for creating solver instances based on configuration
pub struct SolverFactory;

impl SolverFactory {
    /// Create the solver named by the model's configuration
    pub fn create_solver(problem: &MilpModel) -> Result<Arc<dyn SolverService>> {
        Self::create_from_backend(problem.solver_config.backend)
    }

    /// Create a solver for a specific backend
    ///
    /// Backends not compiled into this build yield [`SolverError::SolverNotAvailable`].
    pub fn create_from_backend(backend: SolverBackend) -> Result<Arc<dyn SolverService>> {
        match backend {
            SolverBackend::Auto => Ok(Self::default_solver()),
            SolverBackend::MicroLp => Ok(Arc::new(MicroLpSolver::new())),
            SolverBackend::CoinCbc => coin_cbc(),
            SolverBackend::Highs => highs(),
        }
    }

    /// HiGHS when compiled in, otherwise microlp
    pub fn default_solver() -> Arc<dyn SolverService> {
        highs().unwrap_or_else(|_| Arc::new(MicroLpSolver::new()))
    }

    /// Backends usable in this build, in preference order
    pub fn available_backends() -> Vec<SolverBackend> {
        [SolverBackend::Highs, SolverBackend::CoinCbc, SolverBackend::MicroLp]
            .into_iter()
            .filter(|&backend| Self::create_from_backend(backend).is_ok())
            .collect()
    }
}

#[cfg(feature = "highs")]
fn highs() -> Result<Arc<dyn SolverService>> {
    Ok(Arc::new(crate::solver::HighsSolver::new()))
}

#[cfg(not(feature = "highs"))]
fn highs() -> Result<Arc<dyn SolverService>> {
    Err(SolverError::SolverNotAvailable(
        "HiGHS (build with the `highs` feature)".to_string(),
    ))
}

#[cfg(feature = "coin_cbc")]
fn coin_cbc() -> Result<Arc<dyn SolverService>> {
    Ok(Arc::new(crate::solver::CoinCbcSolver::new()))
}

#[cfg(not(feature = "coin_cbc"))]
fn coin_cbc() -> Result<Arc<dyn SolverService>> {
    Err(SolverError::SolverNotAvailable(
        "COIN-OR CBC (build with the `coin_cbc` feature)".to_string(),
    ))
}
