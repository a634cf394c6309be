use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status};
use tracing::{info, warn};

use super::mappers::{self, netplan};
use super::planner::{NetworkPlanner, PlannerConfig};
use crate::solver::SolverFactory;

/// gRPC service implementation
pub struct GrpcNetworkPlannerService {
    defaults: PlannerConfig,
}

impl GrpcNetworkPlannerService {
    /// `defaults` fill in whatever a request leaves unset
    pub fn new(defaults: PlannerConfig) -> Self {
        Self { defaults }
    }

    fn planner(
        &self,
        options: Option<netplan::PlannerOptions>,
    ) -> Result<NetworkPlanner, Status> {
        let config = mappers::proto_to_config(options, &self.defaults).map_err(|e| *e)?;
        NetworkPlanner::new(config).map_err(mappers::planning_error_to_status)
    }
}

impl Default for GrpcNetworkPlannerService {
    fn default() -> Self {
        Self::new(PlannerConfig::default())
    }
}

#[tonic::async_trait]
impl netplan::network_planner_server::NetworkPlanner for GrpcNetworkPlannerService {
    type PlanBatchStream = ReceiverStream<Result<netplan::PlanResult, Status>>;

    async fn plan_case(
        &self,
        request: Request<netplan::PlanRequest>,
    ) -> Result<Response<netplan::PlanResult>, Status> {
        let request = request.into_inner();
        let case = request
            .case_data
            .map(mappers::proto_to_case)
            .ok_or_else(|| Status::invalid_argument("case_data is required"))?;
        let planner = self.planner(request.options)?;

        info!(case = %case.case_id, "PlanCase");
        let outcome = tokio::task::spawn_blocking(move || planner.plan_case(&case))
            .await
            .map_err(|e| Status::internal(format!("case worker failed: {}", e)))?
            .map_err(mappers::planning_error_to_status)?;

        Ok(Response::new(mappers::outcome_to_proto(outcome)))
    }

    async fn plan_batch(
        &self,
        request: Request<netplan::BatchRequest>,
    ) -> Result<Response<Self::PlanBatchStream>, Status> {
        let request = request.into_inner();
        let planner = self.planner(request.options)?;
        let cases: Vec<_> = request
            .cases
            .into_iter()
            .map(mappers::proto_to_case)
            .collect();

        info!(cases = cases.len(), "PlanBatch");
        let (tx, rx) = mpsc::channel(cases.len().max(1));

        for case in cases {
            let planner = planner.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                let case_id = case.case_id.clone();
                let result = tokio::task::spawn_blocking(move || planner.plan_case(&case))
                    .await
                    .map_err(|e| crate::planning::PlanningError::Worker(e.to_string()))
                    .and_then(|outcome| outcome);

                let message = match result {
                    Ok(outcome) => mappers::outcome_to_proto(outcome),
                    Err(e) => {
                        warn!(case = %case_id, error = %e, "case aborted");
                        mappers::error_to_proto(case_id, &e)
                    }
                };
                // Receiver gone means the client hung up; nothing left to report to.
                let _ = tx.send(Ok(message)).await;
            });
        }

        Ok(Response::new(ReceiverStream::new(rx)))
    }

    async fn describe_formulation(
        &self,
        request: Request<netplan::PlanRequest>,
    ) -> Result<Response<netplan::FormulationSummary>, Status> {
        let request = request.into_inner();
        let case = request
            .case_data
            .map(mappers::proto_to_case)
            .ok_or_else(|| Status::invalid_argument("case_data is required"))?;
        let planner = self.planner(request.options)?;

        let stats = planner
            .describe_formulation(&case)
            .map_err(mappers::planning_error_to_status)?;

        Ok(Response::new(mappers::stats_to_proto(case.case_id, stats)))
    }

    async fn get_available_solvers(
        &self,
        _request: Request<netplan::Empty>,
    ) -> Result<Response<netplan::AvailableSolvers>, Status> {
        let solvers = SolverFactory::available_backends()
            .into_iter()
            .filter_map(|backend| SolverFactory::create_from_backend(backend).ok())
            .map(|solver| netplan::SolverInfo {
                name: solver.name().to_string(),
                supports_limits: solver.supports_limits(),
                capabilities: capabilities(solver.supports_limits()),
            })
            .collect();

        Ok(Response::new(netplan::AvailableSolvers { solvers }))
    }
}

fn capabilities(supports_limits: bool) -> Vec<String> {
    let mut capabilities = vec![
        "Mixed-Integer Programming".to_string(),
        "Branch and Bound".to_string(),
    ];
    if supports_limits {
        capabilities.push("Time Limit".to_string());
        capabilities.push("Relative MIP Gap".to_string());
    }
    capabilities
}
