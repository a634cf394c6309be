use netplan::{start_server, PlannerConfig, ServerConfig};
use tracing::info;

const DEFAULT_ADDR: &str = "0.0.0.0:50051";

fn load_config() -> Result<PlannerConfig, Box<dyn std::error::Error>> {
    match std::env::var("NETPLAN_CONFIG") {
        Ok(path) => {
            let raw = std::fs::read_to_string(&path)
                .map_err(|e| format!("reading config '{}': {}", path, e))?;
            let config: PlannerConfig = serde_json::from_str(&raw)
                .map_err(|e| format!("parsing config '{}': {}", path, e))?;
            info!(%path, "loaded planner configuration");
            Ok(config)
        }
        Err(_) => Ok(PlannerConfig::default()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // RUST_LOG overrides the INFO default
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("netplan-server v{}", env!("CARGO_PKG_VERSION"));

    let address = std::env::var("NETPLAN_ADDR")
        .unwrap_or_else(|_| DEFAULT_ADDR.to_string())
        .parse()?;
    let planner = load_config()?;

    start_server(ServerConfig::new(address, planner)).await?;

    Ok(())
}
