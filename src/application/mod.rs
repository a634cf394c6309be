// Application layer: case orchestration and the gRPC surface

#[cfg(feature = "server")]
pub mod grpc_service;
#[cfg(feature = "server")]
pub mod mappers;
pub mod planner;

#[cfg(feature = "server")]
pub use grpc_service::GrpcNetworkPlannerService;
pub use planner::{CaseOutcome, NetworkPlanner, PlannerConfig};
