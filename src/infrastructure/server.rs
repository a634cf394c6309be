// Infrastructure: Server setup and configuration

use std::net::SocketAddr;
use tonic::transport::Server;
use tracing::info;

use crate::application::mappers::netplan::network_planner_server::NetworkPlannerServer;
use crate::application::{GrpcNetworkPlannerService, PlannerConfig};
use crate::solver::SolverFactory;

pub struct ServerConfig {
    pub address: SocketAddr,
    /// Defaults applied to requests that leave options unset
    pub planner: PlannerConfig,
}

impl ServerConfig {
    pub fn new(address: SocketAddr, planner: PlannerConfig) -> Self {
        Self { address, planner }
    }
}

pub async fn start_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    config.planner.validate()?;
    let service = GrpcNetworkPlannerService::new(config.planner);

    print_banner(&config.address);

    Server::builder()
        .add_service(NetworkPlannerServer::new(service))
        .serve(config.address)
        .await?;

    Ok(())
}

fn print_banner(address: &SocketAddr) {
    let backends: Vec<String> = SolverFactory::available_backends()
        .iter()
        .map(ToString::to_string)
        .collect();
    info!(%address, backends = %backends.join(", "), "netplan server listening");
}
